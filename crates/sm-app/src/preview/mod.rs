//! Asynchronous preview generation.
//!
//! For a batch of k payloads added together, fires k independent render
//! operations. Generation latency is payload-dependent, so completions may
//! arrive in any order; the pipeline joins the whole batch and publishes
//! results in submission order (result i corresponds to payload i). One
//! failed generation yields a fallback for that slot without blocking the
//! others.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use sm_core::media::submission::PreviewRequest;
use sm_core::media::PreviewRef;
use sm_core::ports::PreviewRendererPort;
use sm_core::LocalAssetId;

pub struct PreviewPipeline {
    renderer: Arc<dyn PreviewRendererPort>,
}

impl PreviewPipeline {
    pub fn new(renderer: Arc<dyn PreviewRendererPort>) -> Self {
        Self { renderer }
    }

    /// Render a batch, preserving submission order in the result.
    pub async fn render_batch(
        &self,
        requests: &[PreviewRequest],
    ) -> Vec<(LocalAssetId, PreviewRef)> {
        let renders = requests.iter().map(|request| {
            let renderer = self.renderer.clone();
            async move {
                match renderer.render(&request.payload).await {
                    Ok(preview) => PreviewRef::Ready {
                        data_url: preview.data_url,
                    },
                    Err(err) => {
                        warn!(
                            local_id = %request.local_id,
                            error = %err,
                            "Preview generation failed; slot falls back to placeholder"
                        );
                        PreviewRef::Unavailable
                    }
                }
            }
        });

        // join_all yields results in the order the futures were given,
        // regardless of completion order.
        let previews = join_all(renders).await;
        debug!(batch = requests.len(), "Preview batch resolved");

        requests
            .iter()
            .map(|request| request.local_id.clone())
            .zip(previews)
            .collect()
    }
}
