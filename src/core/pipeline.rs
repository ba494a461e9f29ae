//! Pipeline builder and executor

use crate::core::{
    middleware::Middleware,
    step::{Step, StepResult},
};
use std::fmt;
use tracing::{debug, trace};

/// An ordered, append-only chain of middleware-wrapped steps
pub struct Pipeline<T, E = anyhow::Error> {
    /// Registered steps, already wrapped by the middleware live at registration
    steps: Vec<Step<T, E>>,

    /// Registered middleware, kept only to wrap steps added later
    middleware: Vec<Middleware<T, E>>,
}

impl<T, E> Pipeline<T, E> {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            middleware: Vec::new(),
        }
    }

    /// Register middleware for every step added after this call.
    ///
    /// Steps already registered are not affected.
    pub fn use_middleware(&mut self, middleware: Middleware<T, E>) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Append a step, wrapping it in the middleware registered so far.
    ///
    /// Middleware is applied last-registered first, so the first-registered
    /// middleware ends up as the outermost layer.
    pub fn then(&mut self, step: Step<T, E>) -> &mut Self {
        let wrapped = self
            .middleware
            .iter()
            .rev()
            .fold(step, |inner, middleware| middleware.apply(inner));
        self.steps.push(wrapped);
        self
    }

    /// Number of registered steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether no steps are registered
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of registered middleware
    pub fn middleware_len(&self) -> usize {
        self.middleware.len()
    }

    /// Run every step in registration order, threading each output into the
    /// next step.
    ///
    /// Stops at the first failure and returns it as-is, so the companion
    /// output is the one produced by the failing step.
    pub fn execute(&self, input: T) -> StepResult<T, E> {
        debug!(steps = self.steps.len(), "Executing pipeline");

        let mut current = input;
        for (index, step) in self.steps.iter().enumerate() {
            trace!(index, "Running step");
            current = match step.call(current) {
                Ok(output) => output,
                Err(failure) => {
                    debug!(index, "Step failed, stopping pipeline");
                    return Err(failure);
                }
            };
        }

        Ok(current)
    }
}

impl<T, E> Pipeline<T, E>
where
    T: 'static,
    E: 'static,
{
    /// Turn the whole pipeline into a single step
    pub fn into_step(self) -> Step<T, E> {
        Step::new(move |input| self.execute(input))
    }
}

impl<T: 'static, E: 'static> From<Pipeline<T, E>> for Step<T, E> {
    fn from(pipeline: Pipeline<T, E>) -> Self {
        pipeline.into_step()
    }
}

impl<T, E> Default for Pipeline<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for Pipeline<T, E> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
            middleware: self.middleware.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Pipeline<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.steps.len())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}
