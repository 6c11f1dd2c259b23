//! Minimal set of remote operations reconciling local edits against the
//! last confirmed server state.

use crate::ids::AssetId;
use crate::media::baseline::BaselineSnapshot;
use crate::media::image_set::LocalImageSet;
use crate::media::payload::ImagePayload;

/// One slot of the displayed sequence as the remote store will know it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotRef {
    /// A retained persisted asset.
    Retained(AssetId),
    /// A new asset; the index points into [`AssetDiff::additions`] and is
    /// resolved to a server-assigned id once the upsert returns.
    New { addition_index: usize },
}

/// Remote operations needed to reconcile the local collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDiff {
    /// Persisted identifiers to delete. Order is irrelevant.
    pub deletions: Vec<AssetId>,
    /// Payloads of all pending adds, in current relative order.
    pub additions: Vec<ImagePayload>,
    /// The displayed sequence, slot by slot.
    pub final_order: Vec<SlotRef>,
    /// True when a pending add sits before a retained persisted asset.
    ///
    /// The remote contract only accepts new payloads as a trailing ordered
    /// batch; reordering persisted assets relative to each other is not
    /// expressed through this diff. The displayed order is still honored
    /// for presentation, so the mismatch is surfaced rather than silently
    /// resolved.
    pub has_interleaved_additions: bool,
}

/// Compute the remote operations for the current local state.
///
/// Pure function; the baseline is only read.
pub fn compute_diff(baseline: &BaselineSnapshot, set: &LocalImageSet) -> AssetDiff {
    let deletions: Vec<AssetId> = set.pending_deletions().iter().cloned().collect();

    let mut additions = Vec::new();
    let mut final_order = Vec::with_capacity(set.visible_count());
    let mut has_interleaved_additions = false;
    let mut seen_pending_add = false;

    for asset in set.assets() {
        match asset.asset_id() {
            Some(id) => {
                debug_assert!(baseline.contains(id), "retained asset missing from baseline");
                if seen_pending_add {
                    has_interleaved_additions = true;
                }
                final_order.push(SlotRef::Retained(id.clone()));
            }
            None => {
                if let Some(payload) = asset.payload() {
                    final_order.push(SlotRef::New {
                        addition_index: additions.len(),
                    });
                    additions.push(payload.clone());
                    seen_pending_add = true;
                }
            }
        }
    }

    AssetDiff {
        deletions,
        additions,
        final_order,
        has_interleaved_additions,
    }
}
