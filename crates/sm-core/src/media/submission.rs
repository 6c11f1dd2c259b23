//! Submission state machine.
//!
//! Defines a pure state transition function for the edit-and-reconcile
//! flow. Every operation is a transition producing a new form state plus a
//! list of effects (preview requests, network calls) that the application
//! layer executes; the core stays testable without any async runtime.
//!
//! State transitions:
//!
//! ```text
//! Idle
//!  │
//!  └─→ Editing ──→ Validating ──→ DeletingPending ──→ Upserting ──→ Success
//!        ↑  │            │               │                 │
//!        │  └←───────────┘ (validation   └→ (failures are  └──→ Failed
//!        │                  error)           recorded, the        │
//!        └←──────────────────────────────────phase never──────────┘
//!                                            aborts)
//! ```
//!
//! Phase 1 deletion calls are strictly sequential: exactly one
//! `DeleteAsset` effect is outstanding at a time, so a failure is always
//! attributable to one identifier. Phase 2 is a single upsert call.

use std::collections::VecDeque;

use thiserror::Error;

use crate::ids::{AssetId, EntityId, LocalAssetId};
use crate::media::asset::PreviewRef;
use crate::media::baseline::{BaselineSnapshot, PersistedAsset};
use crate::media::diff::{compute_diff, SlotRef};
use crate::media::image_set::{ImageSetError, LocalImageSet};
use crate::media::payload::ImagePayload;
use crate::media::validation::{CountPolicy, ValidationError, ValidationGate};
use crate::ports::catalog_api::{CatalogApiError, EntityFields, EntityResponse};

/// Where the submission currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionPhase {
    /// Initial: local state is a copy of the baseline.
    Idle,
    /// Local edits pending; re-entrant.
    Editing,
    /// Count bounds being checked; no network call has been issued.
    Validating { fields: EntityFields },
    /// Phase 1: deleting pending identifiers one at a time.
    DeletingPending {
        remaining: VecDeque<AssetId>,
        fields: EntityFields,
    },
    /// Phase 2: the single create-or-update call is in flight.
    Upserting { fields: EntityFields },
    /// Submission confirmed; baseline replaced by the server response.
    Success,
    /// The upsert failed; local edits are preserved for retry.
    Failed { error: CatalogApiError },
}

impl SubmissionPhase {
    /// True while a submission attempt is running; edits are rejected then.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Validating { .. } | Self::DeletingPending { .. } | Self::Upserting { .. }
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed { .. })
    }
}

/// Events that drive the flow.
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    /// User attaches a batch of local files.
    Add { payloads: Vec<ImagePayload> },
    /// User removes the slot at `index`.
    Remove { index: usize },
    /// User moves a slot.
    Reorder { from: usize, to: usize },
    /// The preview pipeline published a completed batch.
    PreviewsReady {
        previews: Vec<(LocalAssetId, PreviewRef)>,
    },
    /// User submits the form.
    SubmitRequested { fields: EntityFields },
    /// The validation effect was executed.
    ValidationEvaluated,
    /// One Phase-1 deletion call resolved.
    DeletionFinished {
        asset_id: AssetId,
        outcome: Result<(), CatalogApiError>,
    },
    /// The Phase-2 upsert call resolved.
    UpsertFinished {
        outcome: Result<EntityResponse, CatalogApiError>,
    },
    /// User goes back to editing after a terminal phase.
    EditResumed,
}

/// A payload queued for preview generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRequest {
    pub local_id: LocalAssetId,
    pub payload: ImagePayload,
}

/// Side-effects produced by state transitions, executed by the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Run the validation gate (feeds back `ValidationEvaluated`).
    Validate,
    /// Generate previews for a batch of freshly added payloads.
    GeneratePreviews { requests: Vec<PreviewRequest> },
    /// Issue one deletion call.
    DeleteAsset {
        entity_id: EntityId,
        asset_id: AssetId,
    },
    /// Issue the single create-or-update call.
    UpsertEntity {
        entity_id: Option<EntityId>,
        fields: EntityFields,
        additions: Vec<ImagePayload>,
        final_order: Vec<SlotRef>,
        has_interleaved_additions: bool,
    },
}

/// Errors surfaced to the user by edit or submit attempts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error(transparent)]
    Edit(#[from] ImageSetError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("a submission is already in flight")]
    SubmissionInFlight,
}

/// One failed Phase-1 deletion, attributed to its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionFailure {
    pub asset_id: AssetId,
    pub cause: CatalogApiError,
}

/// Complete state of one edit form session.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pub image_set: LocalImageSet,
    pub baseline: BaselineSnapshot,
    pub entity_id: Option<EntityId>,
    pub phase: SubmissionPhase,
    /// Failures collected during the current submission attempt.
    pub deletion_failures: Vec<DeletionFailure>,
    /// Error surfaced by the most recent rejected transition, if any.
    pub last_error: Option<FormError>,
    pub policy: CountPolicy,
}

impl FormState {
    /// Fresh form for an entity that does not exist remotely yet.
    pub fn new_entity(policy: CountPolicy) -> Self {
        Self {
            image_set: LocalImageSet::empty(),
            baseline: BaselineSnapshot::empty(),
            entity_id: None,
            phase: SubmissionPhase::Idle,
            deletion_failures: Vec::new(),
            last_error: None,
            policy,
        }
    }

    /// Form seeded from server state at form-open.
    pub fn open(entity_id: EntityId, baseline: BaselineSnapshot, policy: CountPolicy) -> Self {
        Self {
            image_set: LocalImageSet::from_baseline(&baseline),
            baseline,
            entity_id: Some(entity_id),
            phase: SubmissionPhase::Idle,
            deletion_failures: Vec::new(),
            last_error: None,
            policy,
        }
    }
}

/// Pure submission state machine.
pub struct SubmissionStateMachine;

impl SubmissionStateMachine {
    pub fn transition(mut state: FormState, event: FormEvent) -> (FormState, Vec<Effect>) {
        match event {
            FormEvent::Add { payloads } => {
                if state.phase.is_in_flight() {
                    state.last_error = Some(FormError::SubmissionInFlight);
                    return (state, Vec::new());
                }
                let policy = state.policy.clone();
                match state.image_set.add_many(payloads, &policy) {
                    Ok(requests) => {
                        state.phase = SubmissionPhase::Editing;
                        state.last_error = None;
                        let effects = if requests.is_empty() {
                            Vec::new()
                        } else {
                            vec![Effect::GeneratePreviews {
                                requests: requests
                                    .into_iter()
                                    .map(|(local_id, payload)| PreviewRequest { local_id, payload })
                                    .collect(),
                            }]
                        };
                        (state, effects)
                    }
                    Err(err) => {
                        state.last_error = Some(FormError::Edit(err));
                        (state, Vec::new())
                    }
                }
            }

            FormEvent::Remove { index } => {
                if state.phase.is_in_flight() {
                    state.last_error = Some(FormError::SubmissionInFlight);
                    return (state, Vec::new());
                }
                match state.image_set.remove(index) {
                    Ok(_removed) => {
                        state.phase = SubmissionPhase::Editing;
                        state.last_error = None;
                    }
                    Err(err) => state.last_error = Some(FormError::Edit(err)),
                }
                (state, Vec::new())
            }

            FormEvent::Reorder { from, to } => {
                if state.phase.is_in_flight() {
                    state.last_error = Some(FormError::SubmissionInFlight);
                    return (state, Vec::new());
                }
                match state.image_set.reorder(from, to) {
                    Ok(()) => {
                        state.phase = SubmissionPhase::Editing;
                        state.last_error = None;
                    }
                    Err(err) => state.last_error = Some(FormError::Edit(err)),
                }
                (state, Vec::new())
            }

            FormEvent::PreviewsReady { previews } => {
                // Stale completions (slot removed, or session reseeded) are
                // dropped inside attach_preview.
                for (local_id, preview) in previews {
                    state.image_set.attach_preview(&local_id, preview);
                }
                (state, Vec::new())
            }

            FormEvent::SubmitRequested { fields } => {
                if state.phase.is_in_flight() {
                    state.last_error = Some(FormError::SubmissionInFlight);
                    return (state, Vec::new());
                }
                state.deletion_failures.clear();
                state.last_error = None;
                state.phase = SubmissionPhase::Validating { fields };
                (state, vec![Effect::Validate])
            }

            FormEvent::ValidationEvaluated => match state.phase.clone() {
                SubmissionPhase::Validating { fields } => {
                    let gate = ValidationGate::new(state.policy.clone());
                    if let Err(err) = gate.validate(&state.image_set) {
                        state.phase = SubmissionPhase::Editing;
                        state.last_error = Some(FormError::Validation(err));
                        return (state, Vec::new());
                    }
                    Self::begin_reconciliation(state, fields)
                }
                _ => (state, Vec::new()),
            },

            FormEvent::DeletionFinished { asset_id, outcome } => match state.phase.clone() {
                SubmissionPhase::DeletingPending {
                    mut remaining,
                    fields,
                } => {
                    match outcome {
                        Ok(()) => state.image_set.confirm_deletion(&asset_id),
                        Err(cause) => {
                            // Recorded, never aborts the phase: deletion is
                            // best-effort and must not block the upsert.
                            state.deletion_failures.push(DeletionFailure {
                                asset_id: asset_id.clone(),
                                cause,
                            });
                        }
                    }
                    match (state.entity_id.clone(), remaining.pop_front()) {
                        (Some(entity_id), Some(next)) => {
                            state.phase = SubmissionPhase::DeletingPending { remaining, fields };
                            (
                                state,
                                vec![Effect::DeleteAsset {
                                    entity_id,
                                    asset_id: next,
                                }],
                            )
                        }
                        _ => Self::begin_upsert(state, fields),
                    }
                }
                _ => (state, Vec::new()),
            },

            FormEvent::UpsertFinished { outcome } => match state.phase.clone() {
                SubmissionPhase::Upserting { .. } => match outcome {
                    Ok(response) => {
                        let mut assets = response.assets;
                        assets.sort_by_key(|asset| asset.order);
                        let baseline = BaselineSnapshot::new(
                            assets
                                .into_iter()
                                .map(|asset| PersistedAsset {
                                    id: asset.id,
                                    url: asset.url,
                                })
                                .collect(),
                        );
                        state.image_set.rebuild_from_baseline(&baseline);
                        state.baseline = baseline;
                        state.entity_id = Some(response.entity_id);
                        state.phase = SubmissionPhase::Success;
                        (state, Vec::new())
                    }
                    Err(error) => {
                        // Local edits, including already-failed deletions,
                        // stay pending for retry.
                        state.phase = SubmissionPhase::Failed { error };
                        (state, Vec::new())
                    }
                },
                _ => (state, Vec::new()),
            },

            FormEvent::EditResumed => {
                if state.phase.is_terminal() {
                    state.phase = SubmissionPhase::Editing;
                }
                (state, Vec::new())
            }
        }
    }

    /// Validation passed: start Phase 1, or go straight to Phase 2 when
    /// nothing is pending deletion.
    fn begin_reconciliation(
        mut state: FormState,
        fields: EntityFields,
    ) -> (FormState, Vec<Effect>) {
        let diff = compute_diff(&state.baseline, &state.image_set);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            deletions = diff.deletions.len(),
            additions = diff.additions.len(),
            interleaved = diff.has_interleaved_additions,
            "Validation passed; starting reconciliation"
        );
        let mut queue: VecDeque<AssetId> = diff.deletions.into();
        match (state.entity_id.clone(), queue.pop_front()) {
            (Some(entity_id), Some(first)) => {
                state.phase = SubmissionPhase::DeletingPending {
                    remaining: queue,
                    fields,
                };
                (
                    state,
                    vec![Effect::DeleteAsset {
                        entity_id,
                        asset_id: first,
                    }],
                )
            }
            _ => Self::begin_upsert(state, fields),
        }
    }

    fn begin_upsert(mut state: FormState, fields: EntityFields) -> (FormState, Vec<Effect>) {
        let diff = compute_diff(&state.baseline, &state.image_set);
        let effect = Effect::UpsertEntity {
            entity_id: state.entity_id.clone(),
            fields: fields.clone(),
            additions: diff.additions,
            final_order: diff.final_order,
            has_interleaved_additions: diff.has_interleaved_additions,
        };
        state.phase = SubmissionPhase::Upserting { fields };
        (state, vec![effect])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::payload::MimeType;
    use crate::ports::catalog_api::RemoteAsset;
    use bytes::Bytes;

    fn payload(tag: &str) -> ImagePayload {
        ImagePayload::new(
            Bytes::from(tag.as_bytes().to_vec()),
            MimeType::image_jpeg(),
            None,
        )
    }

    fn policy(min: usize, max: usize) -> CountPolicy {
        CountPolicy {
            min_assets: min,
            max_assets: max,
            ..CountPolicy::default()
        }
    }

    fn opened(ids: &[&str], min: usize, max: usize) -> FormState {
        let baseline = BaselineSnapshot::new(
            ids.iter()
                .map(|id| PersistedAsset {
                    id: AssetId::from(*id),
                    url: format!("https://cdn.example/{id}.jpg"),
                })
                .collect(),
        );
        FormState::open(EntityId::from("entity-1"), baseline, policy(min, max))
    }

    fn submit(state: FormState) -> (FormState, Vec<Effect>) {
        let (state, effects) = SubmissionStateMachine::transition(
            state,
            FormEvent::SubmitRequested {
                fields: EntityFields::new().with("name", "Sneaker"),
            },
        );
        assert_eq!(effects, vec![Effect::Validate]);
        assert!(matches!(state.phase, SubmissionPhase::Validating { .. }));
        SubmissionStateMachine::transition(state, FormEvent::ValidationEvaluated)
    }

    #[test]
    fn add_transitions_to_editing_and_requests_previews() {
        let state = opened(&["a"], 1, 5);
        let (state, effects) = SubmissionStateMachine::transition(
            state,
            FormEvent::Add {
                payloads: vec![payload("x"), payload("y")],
            },
        );
        assert_eq!(state.phase, SubmissionPhase::Editing);
        assert_eq!(state.image_set.visible_count(), 3);
        match &effects[..] {
            [Effect::GeneratePreviews { requests }] => {
                assert_eq!(requests.len(), 2);
                assert_eq!(requests[0].payload, payload("x"));
            }
            other => panic!("expected one preview batch, got {other:?}"),
        }
    }

    #[test]
    fn add_at_capacity_is_rejected_and_set_unchanged() {
        // Scenario 3: collection already at MAX.
        let state = opened(&["a", "b", "c", "d", "e"], 3, 5);
        let before = state.image_set.clone();
        let (state, effects) = SubmissionStateMachine::transition(
            state,
            FormEvent::Add {
                payloads: vec![payload("x")],
            },
        );
        assert!(effects.is_empty());
        assert_eq!(
            state.last_error,
            Some(FormError::Edit(ImageSetError::CapacityExceeded { max: 5 }))
        );
        assert_eq!(state.image_set, before);
    }

    #[test]
    fn submit_with_enough_assets_passes_validation() {
        // Scenario 1: MIN=3, two persisted plus one added.
        let state = opened(&["a", "b"], 3, 5);
        let (state, _) = SubmissionStateMachine::transition(
            state,
            FormEvent::Add {
                payloads: vec![payload("x")],
            },
        );
        assert_eq!(state.image_set.visible_count(), 3);

        let (state, effects) = submit(state);
        assert!(matches!(state.phase, SubmissionPhase::Upserting { .. }));
        assert!(matches!(&effects[..], [Effect::UpsertEntity { .. }]));
    }

    #[test]
    fn submit_below_minimum_returns_to_editing_without_network() {
        // Scenario 2: removing a persisted asset drops below MIN.
        let state = opened(&["a", "b"], 3, 5);
        let (state, _) = SubmissionStateMachine::transition(
            state,
            FormEvent::Add {
                payloads: vec![payload("x")],
            },
        );
        let (state, _) =
            SubmissionStateMachine::transition(state, FormEvent::Remove { index: 0 });
        assert_eq!(state.image_set.visible_count(), 2);

        let (state, effects) = submit(state);
        assert!(effects.is_empty());
        assert_eq!(state.phase, SubmissionPhase::Editing);
        assert_eq!(
            state.last_error,
            Some(FormError::Validation(ValidationError::BelowMinimum {
                min: 3,
                actual: 2
            }))
        );
    }

    #[test]
    fn deletions_are_issued_one_at_a_time() {
        let state = opened(&["a", "b", "c"], 1, 5);
        let (state, _) = SubmissionStateMachine::transition(state, FormEvent::Remove { index: 0 });
        let (state, _) = SubmissionStateMachine::transition(state, FormEvent::Remove { index: 0 });

        let (state, effects) = submit(state);
        let first = match &effects[..] {
            [Effect::DeleteAsset { asset_id, .. }] => asset_id.clone(),
            other => panic!("expected one deletion effect, got {other:?}"),
        };
        assert!(matches!(
            state.phase,
            SubmissionPhase::DeletingPending { .. }
        ));

        // First deletion resolves; exactly one more is issued.
        let (state, effects) = SubmissionStateMachine::transition(
            state,
            FormEvent::DeletionFinished {
                asset_id: first,
                outcome: Ok(()),
            },
        );
        let second = match &effects[..] {
            [Effect::DeleteAsset { asset_id, .. }] => asset_id.clone(),
            other => panic!("expected second deletion effect, got {other:?}"),
        };

        // Queue drained: the single upsert follows.
        let (state, effects) = SubmissionStateMachine::transition(
            state,
            FormEvent::DeletionFinished {
                asset_id: second,
                outcome: Ok(()),
            },
        );
        assert!(matches!(state.phase, SubmissionPhase::Upserting { .. }));
        assert!(matches!(&effects[..], [Effect::UpsertEntity { .. }]));
        assert!(state.image_set.pending_deletions().is_empty());
    }

    #[test]
    fn failed_deletion_is_recorded_and_never_blocks_the_upsert() {
        let state = opened(&["a", "b"], 1, 5);
        let (state, _) = SubmissionStateMachine::transition(state, FormEvent::Remove { index: 0 });

        let (state, effects) = submit(state);
        let id = match &effects[..] {
            [Effect::DeleteAsset { asset_id, .. }] => asset_id.clone(),
            other => panic!("expected deletion effect, got {other:?}"),
        };

        let (state, effects) = SubmissionStateMachine::transition(
            state,
            FormEvent::DeletionFinished {
                asset_id: id.clone(),
                outcome: Err(CatalogApiError::Server {
                    status: 500,
                    message: "boom".into(),
                }),
            },
        );
        assert!(matches!(&effects[..], [Effect::UpsertEntity { .. }]));
        assert_eq!(state.deletion_failures.len(), 1);
        assert_eq!(state.deletion_failures[0].asset_id, id);
        // The failed identifier stays pending for the next attempt.
        assert!(state.image_set.pending_deletions().contains(&id));
    }

    #[test]
    fn upsert_success_replaces_baseline_with_server_response() {
        let state = opened(&["a"], 1, 5);
        let (state, _) = SubmissionStateMachine::transition(
            state,
            FormEvent::Add {
                payloads: vec![payload("x")],
            },
        );
        let (state, _) = submit(state);

        let response = EntityResponse {
            entity_id: EntityId::from("entity-1"),
            assets: vec![
                RemoteAsset {
                    id: AssetId::from("a"),
                    url: "https://cdn.example/a.jpg".into(),
                    order: 0,
                },
                RemoteAsset {
                    id: AssetId::from("srv-9"),
                    url: "https://cdn.example/srv-9.jpg".into(),
                    order: 1,
                },
            ],
        };
        let (state, effects) = SubmissionStateMachine::transition(
            state,
            FormEvent::UpsertFinished {
                outcome: Ok(response),
            },
        );
        assert!(effects.is_empty());
        assert_eq!(state.phase, SubmissionPhase::Success);
        assert_eq!(state.baseline.len(), 2);
        assert_eq!(state.image_set.visible_count(), 2);
        assert!(state.image_set.assets().iter().all(|a| a.is_persisted()));
    }

    #[test]
    fn upsert_failure_preserves_local_state_for_retry() {
        let state = opened(&["a", "b"], 1, 5);
        let (state, _) = SubmissionStateMachine::transition(state, FormEvent::Remove { index: 0 });
        let set_before = state.image_set.clone();

        let (state, effects) = submit(state);
        let id = match &effects[..] {
            [Effect::DeleteAsset { asset_id, .. }] => asset_id.clone(),
            other => panic!("expected deletion effect, got {other:?}"),
        };
        let (state, _) = SubmissionStateMachine::transition(
            state,
            FormEvent::DeletionFinished {
                asset_id: id,
                outcome: Err(CatalogApiError::NotFound),
            },
        );
        let (state, _) = SubmissionStateMachine::transition(
            state,
            FormEvent::UpsertFinished {
                outcome: Err(CatalogApiError::Transport("connection reset".into())),
            },
        );
        assert!(matches!(state.phase, SubmissionPhase::Failed { .. }));
        assert_eq!(state.image_set.assets(), set_before.assets());
        assert_eq!(state.image_set.pending_deletions().len(), 1);

        // Failed -> Editing: the user may retry with edits intact.
        let (state, _) = SubmissionStateMachine::transition(state, FormEvent::EditResumed);
        assert_eq!(state.phase, SubmissionPhase::Editing);
    }

    #[test]
    fn edits_during_in_flight_submission_are_rejected() {
        let state = opened(&["a"], 1, 5);
        let (state, _) = SubmissionStateMachine::transition(
            state,
            FormEvent::SubmitRequested {
                fields: EntityFields::new(),
            },
        );
        assert!(state.phase.is_in_flight());

        let before = state.image_set.clone();
        let (state, effects) = SubmissionStateMachine::transition(
            state,
            FormEvent::Add {
                payloads: vec![payload("x")],
            },
        );
        assert!(effects.is_empty());
        assert_eq!(state.last_error, Some(FormError::SubmissionInFlight));
        assert_eq!(state.image_set, before);
    }

    #[test]
    fn new_entity_with_no_deletions_goes_straight_to_upsert() {
        let state = FormState::new_entity(policy(1, 5));
        let (state, _) = SubmissionStateMachine::transition(
            state,
            FormEvent::Add {
                payloads: vec![payload("x")],
            },
        );
        let (state, effects) = submit(state);
        assert!(matches!(state.phase, SubmissionPhase::Upserting { .. }));
        match &effects[..] {
            [Effect::UpsertEntity {
                entity_id,
                additions,
                ..
            }] => {
                assert!(entity_id.is_none());
                assert_eq!(additions.len(), 1);
            }
            other => panic!("expected upsert effect, got {other:?}"),
        }
    }

    #[test]
    fn stale_preview_completion_does_not_resurrect_removed_slot() {
        let state = FormState::new_entity(policy(0, 5));
        let (state, effects) = SubmissionStateMachine::transition(
            state,
            FormEvent::Add {
                payloads: vec![payload("x")],
            },
        );
        let local_id = match &effects[..] {
            [Effect::GeneratePreviews { requests }] => requests[0].local_id.clone(),
            other => panic!("expected preview batch, got {other:?}"),
        };
        let (state, _) = SubmissionStateMachine::transition(state, FormEvent::Remove { index: 0 });

        let (state, effects) = SubmissionStateMachine::transition(
            state,
            FormEvent::PreviewsReady {
                previews: vec![(
                    local_id,
                    PreviewRef::Ready {
                        data_url: "data:;base64,AA==".into(),
                    },
                )],
            },
        );
        assert!(effects.is_empty());
        assert_eq!(state.image_set.visible_count(), 0);
    }
}
