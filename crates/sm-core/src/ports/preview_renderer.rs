//! Preview renderer port - turns raw payloads into renderable previews.

use async_trait::async_trait;
use thiserror::Error;

use crate::media::payload::ImagePayload;

/// A generated preview, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPreview {
    pub data_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreviewError {
    #[error("failed to decode payload: {0}")]
    Decode(String),

    #[error("failed to encode preview: {0}")]
    Encode(String),
}

/// Preview renderer port.
///
/// Generation latency is payload-dependent; callers must not assume
/// completion order matches submission order.
#[async_trait]
pub trait PreviewRendererPort: Send + Sync {
    async fn render(&self, payload: &ImagePayload) -> Result<RenderedPreview, PreviewError>;
}
