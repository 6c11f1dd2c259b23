//! # sm-infra
//!
//! Infrastructure adapters for the catalog media engine: the reqwest-based
//! catalog API client and the image-crate preview renderer.

pub mod catalog;
pub mod preview;

pub use catalog::{CatalogHttpClient, CatalogHttpConfig};
pub use preview::ImagePreviewRenderer;
