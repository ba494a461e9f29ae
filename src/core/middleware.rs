//! Middleware: decorators that wrap a step with extra behavior

use crate::core::step::{Step, StepResult};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, debug_span, warn};

type MiddlewareFn<T, E> = dyn Fn(Step<T, E>) -> Step<T, E> + Send + Sync;

/// Wraps a step to produce another step with added behavior before/after
/// the wrapped call
pub struct Middleware<T, E = anyhow::Error> {
    func: Arc<MiddlewareFn<T, E>>,
}

impl<T, E> Middleware<T, E> {
    /// Create middleware from a step-decorating function
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(Step<T, E>) -> Step<T, E> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// Wrap `next` with this middleware
    pub fn apply(&self, next: Step<T, E>) -> Step<T, E> {
        (self.func)(next)
    }
}

impl<T, E> Clone for Middleware<T, E> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
        }
    }
}

impl<T, E> fmt::Debug for Middleware<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware").finish_non_exhaustive()
    }
}

/// Run every call of the wrapped step inside a `debug` span named after
/// `label`, recording elapsed time and logging failures at `warn`
pub fn traced<T, E>(label: impl Into<String>) -> Middleware<T, E>
where
    T: 'static,
    E: fmt::Display + 'static,
{
    let label: Arc<str> = Arc::from(label.into());
    Middleware::new(move |next: Step<T, E>| {
        let label = Arc::clone(&label);
        Step::new(move |input| {
            let span = debug_span!("step", label = %label);
            let _guard = span.enter();
            let started = Instant::now();
            let result = next.call(input);
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(_) => debug!(elapsed_ms, "Step {} completed", label),
                Err(failure) => warn!(elapsed_ms, "Step {} failed: {}", label, failure.error),
            }
            result
        })
    })
}

/// Observe the input of every call before it reaches the wrapped step
pub fn inspect_input<T, E, F>(observer: F) -> Middleware<T, E>
where
    T: 'static,
    E: 'static,
    F: Fn(&T) + Send + Sync + 'static,
{
    let observer = Arc::new(observer);
    Middleware::new(move |next: Step<T, E>| {
        let observer = Arc::clone(&observer);
        Step::new(move |input| {
            observer(&input);
            next.call(input)
        })
    })
}

/// Observe the result of every call after the wrapped step returns
pub fn inspect_output<T, E, F>(observer: F) -> Middleware<T, E>
where
    T: 'static,
    E: 'static,
    F: Fn(&StepResult<T, E>) + Send + Sync + 'static,
{
    let observer = Arc::new(observer);
    Middleware::new(move |next: Step<T, E>| {
        let observer = Arc::clone(&observer);
        Step::new(move |input| {
            let result = next.call(input);
            observer(&result);
            result
        })
    })
}
