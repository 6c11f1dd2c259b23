//! Last server-confirmed state of the asset collection.

use serde::{Deserialize, Serialize};

use crate::ids::AssetId;

/// A persisted asset as the server last reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedAsset {
    pub id: AssetId,
    pub url: String,
}

/// The last confirmed server state, in server order.
///
/// Read by the diff computation, written exactly once per successful
/// submission (replaced wholesale with the server's authoritative response).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineSnapshot {
    assets: Vec<PersistedAsset>,
}

impl BaselineSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(assets: Vec<PersistedAsset>) -> Self {
        Self { assets }
    }

    pub fn assets(&self) -> &[PersistedAsset] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.assets.iter().any(|asset| &asset.id == id)
    }
}
