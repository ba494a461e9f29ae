//! Concurrent execution: parallel fan-out and the async pipeline

#[cfg(feature = "async")]
pub mod async_pipeline;
pub mod parallel;

#[cfg(feature = "async")]
pub use async_pipeline::{
    async_conditional, async_parallel, async_parallel_with, async_wrap, blocking, AsyncMiddleware,
    AsyncPipeline, AsyncStep, SharedAsyncStep,
};
pub use parallel::{parallel, parallel_with, Combiner, CompanionPolicy};
