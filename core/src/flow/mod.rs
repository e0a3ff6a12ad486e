// hopz/src/flow/mod.rs

//! Step-pipeline engine used to sequence the storefront's multi-step operations.

pub mod context;
pub mod control;
pub mod pipeline;
pub mod registry;

pub use context::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use pipeline::{Handler, Pipeline, StepDef};
pub use registry::Flows;
