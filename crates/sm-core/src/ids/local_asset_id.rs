use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::id_macro::impl_id;

/// Stable local identity of a slot in the image collection.
///
/// Two pending adds with byte-identical payloads are still distinct slots;
/// this id is what tells them apart, and what a preview completion is keyed
/// by so a stale completion can never land on the wrong slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalAssetId(String);

impl LocalAssetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for LocalAssetId {
    fn default() -> Self {
        Self::new()
    }
}

impl_id!(LocalAssetId);
