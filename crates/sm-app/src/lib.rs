//! # sm-app
//!
//! Application layer for the catalog media engine. Executes the effects
//! produced by the pure submission state machine in `sm-core`: asynchronous
//! preview generation and the two-phase remote reconciliation.

pub mod engine;
pub mod preview;

pub use engine::{MediaFormEngine, SubmitError, SubmitOutcome};
pub use preview::PreviewPipeline;
