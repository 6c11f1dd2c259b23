//! One slot in the ordered image collection.

use serde::{Deserialize, Serialize};

use crate::ids::{AssetId, LocalAssetId};
use crate::media::payload::ImagePayload;

/// Where a slot's content comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetOrigin {
    /// Confirmed by the remote store; carries its server-assigned id and URL.
    Persisted { id: AssetId, url: String },
    /// Attached locally, not yet confirmed; only the payload exists.
    PendingAdd { payload: ImagePayload },
}

/// Renderable preview for a slot.
///
/// Pending adds start without one; the preview pipeline fills it in
/// asynchronously. A failed generation yields `Unavailable` so the slot
/// still renders (as a placeholder) without blocking its batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreviewRef {
    Ready { data_url: String },
    Unavailable,
}

/// One slot in the ordered collection.
///
/// Position in the owning sequence is the slot's order index; index 0 is
/// the primary asset, a display label with no other runtime meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub local_id: LocalAssetId,
    pub origin: AssetOrigin,
    pub preview: Option<PreviewRef>,
}

impl ImageAsset {
    pub fn persisted(id: AssetId, url: String) -> Self {
        Self {
            local_id: LocalAssetId::new(),
            origin: AssetOrigin::Persisted { id, url },
            preview: None,
        }
    }

    pub fn pending_add(payload: ImagePayload) -> Self {
        Self {
            local_id: LocalAssetId::new(),
            origin: AssetOrigin::PendingAdd { payload },
            preview: None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        matches!(self.origin, AssetOrigin::Persisted { .. })
    }

    pub fn is_pending_add(&self) -> bool {
        matches!(self.origin, AssetOrigin::PendingAdd { .. })
    }

    /// Server-assigned id, if this slot is persisted.
    pub fn asset_id(&self) -> Option<&AssetId> {
        match &self.origin {
            AssetOrigin::Persisted { id, .. } => Some(id),
            AssetOrigin::PendingAdd { .. } => None,
        }
    }

    /// Local payload, if this slot is a pending add.
    pub fn payload(&self) -> Option<&ImagePayload> {
        match &self.origin {
            AssetOrigin::Persisted { .. } => None,
            AssetOrigin::PendingAdd { payload } => Some(payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::payload::MimeType;
    use bytes::Bytes;

    #[test]
    fn pending_add_has_no_server_id() {
        let asset = ImageAsset::pending_add(ImagePayload::new(
            Bytes::from_static(b"jpg"),
            MimeType::image_jpeg(),
            None,
        ));
        assert!(asset.is_pending_add());
        assert!(asset.asset_id().is_none());
        assert!(asset.preview.is_none());
    }

    #[test]
    fn identical_payloads_are_distinct_slots() {
        let payload = ImagePayload::new(Bytes::from_static(b"jpg"), MimeType::image_jpeg(), None);
        let a = ImageAsset::pending_add(payload.clone());
        let b = ImageAsset::pending_add(payload);
        assert_ne!(a.local_id, b.local_id);
    }
}
