//! Port interfaces for the application layer.
//!
//! Ports define the contract between the reconciliation logic (use cases)
//! and infrastructure implementations, keeping the core independent of any
//! concrete HTTP client or image codec.

pub mod catalog_api;
pub mod credentials;
pub mod preview_renderer;

pub use catalog_api::{
    CatalogApiError, CatalogApiPort, EntityFields, EntityResponse, RemoteAsset,
};
pub use credentials::Credentials;
pub use preview_renderer::{PreviewError, PreviewRendererPort, RenderedPreview};
