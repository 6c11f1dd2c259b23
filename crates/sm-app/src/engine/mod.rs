//! Media form engine.
//!
//! Facade over the pure submission state machine: dispatches events,
//! executes the returned effects (preview batches, network calls) and
//! drives the two-phase remote reconciliation. This is the only place the
//! baseline snapshot is ever replaced, and only on confirmed success.
//!
//! Concurrency model: callers interact from one logical task; the form
//! state lives behind a mutex that is never held across an await of a
//! network call. Preview batches run in the background and are re-checked
//! for staleness (session generation + slot liveness) before they touch
//! state. Dropping the engine (or the `submit` future) cancels any further
//! effect: a cancelled Phase 1 never issues Phase 2.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, info_span, warn, Instrument};

use sm_core::media::submission::{
    DeletionFailure, Effect, FormError, FormEvent, FormState, PreviewRequest,
    SubmissionPhase, SubmissionStateMachine,
};
use sm_core::media::{BaselineSnapshot, CountPolicy, PersistedAsset, ValidationError};
use sm_core::ports::catalog_api::{CatalogApiError, EntityFields};
use sm_core::ports::{CatalogApiPort, PreviewRendererPort};
use sm_core::EntityId;

use crate::preview::PreviewPipeline;

/// Result of a completed submission.
///
/// Partial deletion failures do not fail the submission; they ride along
/// as warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub entity_id: EntityId,
    /// The server's authoritative asset list, now the new baseline.
    pub assets: Vec<PersistedAsset>,
    pub deletion_failures: Vec<DeletionFailure>,
}

/// Terminal error of a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(ValidationError),

    #[error("upsert failed: {source}")]
    Upsert {
        source: CatalogApiError,
        /// Phase-1 failures collected before the upsert failed.
        deletion_failures: Vec<DeletionFailure>,
    },

    #[error("a submission is already in flight")]
    AlreadyInFlight,

    #[error("submission was interrupted before reaching a terminal phase")]
    Interrupted,
}

struct EngineInner {
    state: Mutex<FormState>,
    api: Arc<dyn CatalogApiPort>,
    pipeline: PreviewPipeline,
    /// Session generation; bumped on reopen so completions spawned for a
    /// previous session are dropped.
    generation: AtomicU64,
}

impl EngineInner {
    async fn dispatch(&self, event: FormEvent) -> (FormState, Vec<Effect>) {
        let mut guard = self.state.lock().await;
        let (next, effects) = SubmissionStateMachine::transition(guard.clone(), event);
        *guard = next.clone();
        (next, effects)
    }
}

/// The engine exposed to the surrounding UI: current state, the three edit
/// operations, and `submit` driving the full state machine.
pub struct MediaFormEngine {
    inner: Arc<EngineInner>,
}

impl MediaFormEngine {
    /// Engine for an entity that does not exist remotely yet.
    ///
    /// The catalog client is injected fully constructed (credentials and
    /// all); the engine never reads ambient credential state.
    pub fn new_entity(
        api: Arc<dyn CatalogApiPort>,
        renderer: Arc<dyn PreviewRendererPort>,
        policy: CountPolicy,
    ) -> Self {
        Self::with_state(api, renderer, FormState::new_entity(policy))
    }

    /// Engine seeded from the last confirmed server state.
    pub fn open(
        api: Arc<dyn CatalogApiPort>,
        renderer: Arc<dyn PreviewRendererPort>,
        policy: CountPolicy,
        entity_id: EntityId,
        baseline: BaselineSnapshot,
    ) -> Self {
        Self::with_state(api, renderer, FormState::open(entity_id, baseline, policy))
    }

    fn with_state(
        api: Arc<dyn CatalogApiPort>,
        renderer: Arc<dyn PreviewRendererPort>,
        state: FormState,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                state: Mutex::new(state),
                api,
                pipeline: PreviewPipeline::new(renderer),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Current form state: the visible collection plus the submission phase.
    pub async fn state(&self) -> FormState {
        self.inner.state.lock().await.clone()
    }

    /// Reseed the form from fresh server state, discarding local edits.
    /// In-flight preview batches from the previous session become stale.
    pub async fn reopen(&self, entity_id: EntityId, baseline: BaselineSnapshot) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.inner.state.lock().await;
        let policy = guard.policy.clone();
        *guard = FormState::open(entity_id, baseline, policy);
    }

    /// Attach a batch of local files at the end of the collection.
    ///
    /// Preview generation for the batch starts in the background; the
    /// previews are attached once the whole batch has resolved, in
    /// submission order.
    pub async fn add(
        &self,
        payloads: Vec<sm_core::media::ImagePayload>,
    ) -> Result<(), FormError> {
        let span = info_span!("engine.media_form.add", batch = payloads.len());
        async {
            let (state, effects) = self.inner.dispatch(FormEvent::Add { payloads }).await;
            if let Some(err) = state.last_error {
                return Err(err);
            }
            for effect in effects {
                if let Effect::GeneratePreviews { requests } = effect {
                    self.spawn_preview_batch(requests);
                }
            }
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Remove the slot at `index`.
    pub async fn remove(&self, index: usize) -> Result<(), FormError> {
        let span = info_span!("engine.media_form.remove", index);
        async {
            let (state, _) = self.inner.dispatch(FormEvent::Remove { index }).await;
            match state.last_error {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
        .instrument(span)
        .await
    }

    /// Move the slot at `from` to position `to`.
    pub async fn reorder(&self, from: usize, to: usize) -> Result<(), FormError> {
        let span = info_span!("engine.media_form.reorder", from, to);
        async {
            let (state, _) = self.inner.dispatch(FormEvent::Reorder { from, to }).await;
            match state.last_error {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
        .instrument(span)
        .await
    }

    /// Drive a full submission: validation, sequential Phase-1 deletions,
    /// then the single Phase-2 upsert.
    pub async fn submit(&self, fields: EntityFields) -> Result<SubmitOutcome, SubmitError> {
        let span = info_span!("engine.media_form.submit");
        self.submit_inner(fields).instrument(span).await
    }

    async fn submit_inner(&self, fields: EntityFields) -> Result<SubmitOutcome, SubmitError> {
        let (state, effects) = self
            .inner
            .dispatch(FormEvent::SubmitRequested { fields })
            .await;
        if state.last_error == Some(FormError::SubmissionInFlight) {
            return Err(SubmitError::AlreadyInFlight);
        }

        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            let followups = self.execute_submit_effect(effect).await;
            queue.extend(followups);
        }

        let state = self.state().await;
        match state.phase {
            SubmissionPhase::Success => {
                let entity_id = state.entity_id.ok_or(SubmitError::Interrupted)?;
                if !state.deletion_failures.is_empty() {
                    warn!(
                        failures = state.deletion_failures.len(),
                        "Submission succeeded with partial deletion failures"
                    );
                }
                info!(entity_id = %entity_id, "Submission confirmed");
                Ok(SubmitOutcome {
                    entity_id,
                    assets: state.baseline.assets().to_vec(),
                    deletion_failures: state.deletion_failures,
                })
            }
            SubmissionPhase::Failed { error } => Err(SubmitError::Upsert {
                source: error,
                deletion_failures: state.deletion_failures,
            }),
            _ => match state.last_error {
                Some(FormError::Validation(err)) => Err(SubmitError::Validation(err)),
                Some(FormError::Edit(_)) | Some(FormError::SubmissionInFlight) => {
                    Err(SubmitError::AlreadyInFlight)
                }
                None => Err(SubmitError::Interrupted),
            },
        }
    }

    async fn execute_submit_effect(&self, effect: Effect) -> Vec<Effect> {
        match effect {
            Effect::Validate => {
                let (_, effects) = self.inner.dispatch(FormEvent::ValidationEvaluated).await;
                effects
            }

            Effect::DeleteAsset {
                entity_id,
                asset_id,
            } => {
                // Strictly sequential: the next deletion effect is only
                // produced once this outcome is folded back in, so a
                // failure is always attributable to one identifier.
                let outcome = self.inner.api.delete_asset(&entity_id, &asset_id).await;
                match &outcome {
                    Ok(()) => debug!(asset_id = %asset_id, "Deleted pending asset"),
                    Err(err) => warn!(
                        asset_id = %asset_id,
                        error = %err,
                        "Deletion failed; recorded and continuing"
                    ),
                }
                let (_, effects) = self
                    .inner
                    .dispatch(FormEvent::DeletionFinished { asset_id, outcome })
                    .await;
                effects
            }

            Effect::UpsertEntity {
                entity_id,
                fields,
                additions,
                final_order,
                has_interleaved_additions,
            } => {
                if has_interleaved_additions {
                    // The remote contract appends new images after retained
                    // ones; the displayed interleaving is presentation-only.
                    warn!(
                        slots = final_order.len(),
                        "Displayed order places new images before persisted ones; \
                         the remote store appends new images after retained ones"
                    );
                }
                let outcome = match &entity_id {
                    Some(id) => self.inner.api.update_entity(id, &fields, &additions).await,
                    None => self.inner.api.create_entity(&fields, &additions).await,
                };
                let (_, effects) = self
                    .inner
                    .dispatch(FormEvent::UpsertFinished { outcome })
                    .await;
                effects
            }

            Effect::GeneratePreviews { requests } => {
                self.spawn_preview_batch(requests);
                Vec::new()
            }
        }
    }

    fn spawn_preview_batch(&self, requests: Vec<PreviewRequest>) {
        let weak = Arc::downgrade(&self.inner);
        let generation = self.inner.generation.load(Ordering::SeqCst);
        tokio::spawn(async move {
            // Render through the strong handle only long enough for the
            // batch itself; the owner-token check below decides delivery.
            let previews = match weak.upgrade() {
                Some(inner) => inner.pipeline.render_batch(&requests).await,
                None => return,
            };
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.generation.load(Ordering::SeqCst) != generation {
                debug!("Dropping preview batch from a stale session");
                return;
            }
            inner.dispatch(FormEvent::PreviewsReady { previews }).await;
        });
    }
}
