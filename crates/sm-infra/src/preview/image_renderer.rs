//! In-process preview renderer.
//!
//! Decodes a local payload, downscales it to a bounded thumbnail and
//! re-encodes it as a PNG data URL. Decoding is CPU-bound, so it runs on
//! the blocking pool.

use std::io::Cursor;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::ImageFormat;
use tracing::debug;

use sm_core::media::ImagePayload;
use sm_core::ports::preview_renderer::{PreviewError, PreviewRendererPort, RenderedPreview};

pub struct ImagePreviewRenderer {
    max_edge: u32,
}

impl ImagePreviewRenderer {
    pub fn new(max_edge: u32) -> Self {
        Self { max_edge }
    }
}

impl Default for ImagePreviewRenderer {
    fn default() -> Self {
        Self::new(320)
    }
}

#[async_trait]
impl PreviewRendererPort for ImagePreviewRenderer {
    async fn render(&self, payload: &ImagePayload) -> Result<RenderedPreview, PreviewError> {
        let bytes = payload.content();
        let max_edge = self.max_edge;

        let data_url = tokio::task::spawn_blocking(move || -> Result<String, PreviewError> {
            let decoded = image::load_from_memory(&bytes)
                .map_err(|err| PreviewError::Decode(err.to_string()))?;
            // thumbnail() preserves aspect ratio within the bounding box.
            let thumb = decoded.thumbnail(max_edge, max_edge);
            let mut encoded = Cursor::new(Vec::new());
            thumb
                .write_to(&mut encoded, ImageFormat::Png)
                .map_err(|err| PreviewError::Encode(err.to_string()))?;
            Ok(format!(
                "data:image/png;base64,{}",
                BASE64.encode(encoded.into_inner())
            ))
        })
        .await
        .map_err(|err| PreviewError::Encode(format!("render task failed: {err}")))??;

        debug!(bytes = payload.len(), "Rendered preview");
        Ok(RenderedPreview { data_url })
    }
}
