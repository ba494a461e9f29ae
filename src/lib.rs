//! stepchain - composable step pipelines
//!
//! Build a linear chain of steps over one value type, wrap steps with
//! middleware, branch with [`conditional`] and fan out with [`parallel`].
//!
//! ```
//! use stepchain::{parallel, wrap, Pipeline};
//!
//! let mut pipeline: Pipeline<i32> = Pipeline::new();
//! pipeline
//!     .then(wrap(|x| x + 1))
//!     .then(parallel(|parts: Vec<i32>| Ok(parts.into_iter().sum()), vec![
//!         wrap(|x| x * 2),
//!         wrap(|x| x * 3),
//!     ]));
//!
//! assert_eq!(pipeline.execute(1).unwrap(), 10);
//! ```

pub mod core;
pub mod execution;

// Re-export commonly used types
pub use crate::core::{conditional, wrap, ConfigError, Failure, Middleware, Pipeline, PipelineConfig, Registry, Step, StepResult};
pub use crate::core::middleware::{inspect_input, inspect_output, traced};
pub use crate::execution::{parallel, parallel_with, CompanionPolicy};
#[cfg(feature = "async")]
pub use crate::execution::{
    async_conditional, async_parallel, async_parallel_with, async_wrap, blocking, AsyncMiddleware, AsyncPipeline,
    AsyncStep, SharedAsyncStep,
};
