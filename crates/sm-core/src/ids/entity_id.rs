use serde::{Deserialize, Serialize};

use super::id_macro::impl_id;

/// Identifier of the owning catalog entity (product or category).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(String);

impl_id!(EntityId);
