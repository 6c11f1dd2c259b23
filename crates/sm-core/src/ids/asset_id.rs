use serde::{Deserialize, Serialize};

use super::id_macro::impl_id;

/// Server-assigned identifier of a persisted media asset.
///
/// Only the remote catalog service ever mints these; a locally added asset
/// has no `AssetId` until a submission confirms it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(String);

impl_id!(AssetId);
