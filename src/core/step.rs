//! Step domain model

use std::fmt;
use std::sync::Arc;

/// A failed step invocation.
///
/// Carries the value the failing step produced alongside the caller-supplied
/// error. The value may be partial; callers should not assume it is meaningful
/// beyond "whatever the failing step returned".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure<T, E = anyhow::Error> {
    /// Output produced by the failing step
    pub output: T,

    /// The error reported by the step
    pub error: E,
}

impl<T, E> Failure<T, E> {
    /// Create a new failure from a partial output and an error
    pub fn new(output: T, error: E) -> Self {
        Self { output, error }
    }

    /// Split the failure into its output and error
    pub fn into_parts(self) -> (T, E) {
        (self.output, self.error)
    }

    /// Replace the companion output, keeping the error
    pub fn with_output(self, output: T) -> Self {
        Self {
            output,
            error: self.error,
        }
    }
}

impl<T, E: fmt::Display> fmt::Display for Failure<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step failed: {}", self.error)
    }
}

impl<T, E> std::error::Error for Failure<T, E>
where
    T: fmt::Debug,
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Result of invoking a step
pub type StepResult<T, E = anyhow::Error> = Result<T, Failure<T, E>>;

type StepFn<T, E> = dyn Fn(T) -> StepResult<T, E> + Send + Sync;

/// A single unit of work: transforms a value, reporting success or failure
pub struct Step<T, E = anyhow::Error> {
    func: Arc<StepFn<T, E>>,
}

impl<T, E> Step<T, E> {
    /// Create a step from a function
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(T) -> StepResult<T, E> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// Invoke the step on a value
    pub fn call(&self, input: T) -> StepResult<T, E> {
        (self.func)(input)
    }
}

impl<T, E> Clone for Step<T, E> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
        }
    }
}

impl<T, E> fmt::Debug for Step<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step").finish_non_exhaustive()
    }
}

/// Lift an infallible transform into a step that always succeeds
pub fn wrap<T, E, F>(func: F) -> Step<T, E>
where
    T: 'static,
    E: 'static,
    F: Fn(T) -> T + Send + Sync + 'static,
{
    Step::new(move |input| Ok(func(input)))
}
