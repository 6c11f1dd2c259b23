//! Preview generation adapters.

pub mod image_renderer;

pub use image_renderer::ImagePreviewRenderer;
