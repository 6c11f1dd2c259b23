//! # sm-core
//!
//! Core domain model and reconciliation logic for the catalog media engine.
//!
//! This crate contains pure business logic without any infrastructure
//! dependencies: the ordered image collection, the validation gate, the
//! diff computation and the submission state machine, plus the port
//! interfaces implemented by the infrastructure layer.

// Public module exports
pub mod ids;
pub mod media;
pub mod ports;

// Re-export commonly used types at the crate root
pub use ids::{AssetId, EntityId, LocalAssetId};
pub use media::{
    AssetDiff, BaselineSnapshot, CountPolicy, ImageAsset, ImagePayload, LocalImageSet,
    SubmissionPhase, ValidationError,
};
pub use ports::{CatalogApiError, CatalogApiPort, Credentials, PreviewRendererPort};
