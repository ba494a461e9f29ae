//! Core domain models for step pipelines
//!
//! This module defines steps, middleware, the pipeline builder and the
//! declarative definitions used to assemble pipelines by name.

pub mod condition;
pub mod config;
pub mod middleware;
pub mod pipeline;
pub mod registry;
pub mod step;

pub use condition::conditional;
pub use config::{ConfigError, PipelineConfig};
pub use middleware::Middleware;
pub use pipeline::Pipeline;
pub use registry::Registry;
pub use step::{wrap, Failure, Step, StepResult};
