//! Scenario-based tests for stepchain


mod middleware_order;

#[cfg(feature = "async")]
mod async_pipeline;
