//! Image collection domain model.
//!
//! Ordered, bounded collection of media assets mixing persisted assets,
//! pending local adds and pending deletions, plus the pure logic that
//! reconciles it against the remote store.

pub mod asset;
pub mod baseline;
pub mod diff;
pub mod image_set;
pub mod payload;
pub mod submission;
pub mod validation;

pub use asset::{AssetOrigin, ImageAsset, PreviewRef};
pub use baseline::{BaselineSnapshot, PersistedAsset};
pub use diff::{compute_diff, AssetDiff, SlotRef};
pub use image_set::{ImageSetError, LocalImageSet};
pub use payload::{ImagePayload, MimeType};
pub use submission::{
    DeletionFailure, Effect, FormError, FormEvent, FormState, PreviewRequest, SubmissionPhase,
    SubmissionStateMachine,
};
pub use validation::{CountPolicy, ValidationError, ValidationGate};
