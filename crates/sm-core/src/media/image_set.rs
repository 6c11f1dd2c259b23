//! The mutable client-side model of the image collection.
//!
//! Mixes already-persisted assets with locally-added files, and tracks
//! locally-marked deletions of persisted assets separately from the visible
//! sequence.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{AssetId, LocalAssetId};
use crate::media::asset::{ImageAsset, PreviewRef};
use crate::media::baseline::BaselineSnapshot;
use crate::media::payload::ImagePayload;
use crate::media::validation::{CountPolicy, ValidationError};

/// Errors from direct edits of the collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageSetError {
    #[error("collection already holds the maximum of {max} images")]
    CapacityExceeded { max: usize },

    #[error("index {index} is out of bounds for a collection of {len}")]
    InvalidIndex { index: usize, len: usize },

    #[error(transparent)]
    Rejected(#[from] ValidationError),
}

/// Ordered sequence of image slots plus the set of persisted identifiers
/// removed locally but not yet confirmed deleted remotely.
///
/// Slot order is a contiguous `0..n-1` permutation by construction; the
/// slot at index 0 is the primary asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalImageSet {
    assets: Vec<ImageAsset>,
    pending_deletions: BTreeSet<AssetId>,
}

impl LocalImageSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Materialize the collection from the last confirmed server state.
    pub fn from_baseline(baseline: &BaselineSnapshot) -> Self {
        Self {
            assets: baseline
                .assets()
                .iter()
                .map(|asset| ImageAsset::persisted(asset.id.clone(), asset.url.clone()))
                .collect(),
            pending_deletions: BTreeSet::new(),
        }
    }

    pub fn assets(&self) -> &[ImageAsset] {
        &self.assets
    }

    /// Length of the current visible sequence. Pending deletions are
    /// tracked separately and are not part of this count.
    pub fn visible_count(&self) -> usize {
        self.assets.len()
    }

    pub fn pending_deletions(&self) -> &BTreeSet<AssetId> {
        &self.pending_deletions
    }

    pub fn contains_local(&self, local_id: &LocalAssetId) -> bool {
        self.assets.iter().any(|asset| &asset.local_id == local_id)
    }

    /// Payloads of all pending adds, in current relative order.
    pub fn pending_add_payloads(&self) -> Vec<ImagePayload> {
        self.assets
            .iter()
            .filter_map(|asset| asset.payload().cloned())
            .collect()
    }

    /// Append a batch of locally attached payloads.
    ///
    /// Rejects the whole batch (set unchanged) when it would exceed the
    /// maximum or when any payload fails the media-type/size checks.
    /// Returns the new slots' local ids paired with their payloads, in
    /// order, for preview generation.
    pub fn add_many(
        &mut self,
        payloads: Vec<ImagePayload>,
        policy: &CountPolicy,
    ) -> Result<Vec<(LocalAssetId, ImagePayload)>, ImageSetError> {
        if self.assets.len() + payloads.len() > policy.max_assets {
            return Err(ImageSetError::CapacityExceeded {
                max: policy.max_assets,
            });
        }
        for payload in &payloads {
            policy.check_payload(payload)?;
        }

        let mut requests = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let asset = ImageAsset::pending_add(payload.clone());
            requests.push((asset.local_id.clone(), payload));
            self.assets.push(asset);
        }
        Ok(requests)
    }

    /// Remove the slot at `index`.
    ///
    /// A persisted slot marks its identifier as pending deletion (idempotent,
    /// an identifier appears at most once per session); a pending add is
    /// simply discarded — any in-flight preview for it becomes stale.
    pub fn remove(&mut self, index: usize) -> Result<ImageAsset, ImageSetError> {
        if index >= self.assets.len() {
            return Err(ImageSetError::InvalidIndex {
                index,
                len: self.assets.len(),
            });
        }
        let removed = self.assets.remove(index);
        if let Some(id) = removed.asset_id() {
            self.pending_deletions.insert(id.clone());
        }
        Ok(removed)
    }

    /// Move the slot at `from` to position `to`, shifting the others.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), ImageSetError> {
        let len = self.assets.len();
        if from >= len {
            return Err(ImageSetError::InvalidIndex { index: from, len });
        }
        if to >= len {
            return Err(ImageSetError::InvalidIndex { index: to, len });
        }
        let asset = self.assets.remove(from);
        self.assets.insert(to, asset);
        Ok(())
    }

    /// Attach a generated preview to the slot with the given local id.
    ///
    /// Returns false when the slot is no longer present; a stale completion
    /// must never resurrect a removed slot, so it is dropped here.
    pub fn attach_preview(&mut self, local_id: &LocalAssetId, preview: PreviewRef) -> bool {
        match self
            .assets
            .iter_mut()
            .find(|asset| &asset.local_id == local_id)
        {
            Some(asset) => {
                asset.preview = Some(preview);
                true
            }
            None => false,
        }
    }

    /// Drop an identifier whose remote deletion has been confirmed.
    pub fn confirm_deletion(&mut self, id: &AssetId) {
        self.pending_deletions.remove(id);
    }

    /// Rebuild the visible sequence from a freshly confirmed baseline.
    ///
    /// Identifiers still marked as pending deletion (deletions the server
    /// failed to perform) stay hidden and stay marked, so the next
    /// submission retries them.
    pub fn rebuild_from_baseline(&mut self, baseline: &BaselineSnapshot) {
        self.assets = baseline
            .assets()
            .iter()
            .filter(|asset| !self.pending_deletions.contains(&asset.id))
            .map(|asset| ImageAsset::persisted(asset.id.clone(), asset.url.clone()))
            .collect();
    }

    #[cfg(test)]
    pub(crate) fn push_pending_add(&mut self, payload: ImagePayload) -> LocalAssetId {
        let asset = ImageAsset::pending_add(payload);
        let local_id = asset.local_id.clone();
        self.assets.push(asset);
        local_id
    }
}
