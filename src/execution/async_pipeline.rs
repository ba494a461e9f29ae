//! Async steps and pipelines running on tokio

use crate::core::step::{Step, StepResult};
use crate::execution::parallel::{fan_in, CompanionPolicy};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, trace};

/// A unit of work that completes asynchronously
#[async_trait]
pub trait AsyncStep<T, E = anyhow::Error>: Send + Sync {
    /// Transform a value, reporting success or failure
    async fn run(&self, input: T) -> StepResult<T, E>;
}

#[async_trait]
impl<T, E, F, Fut> AsyncStep<T, E> for F
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = StepResult<T, E>> + Send + 'static,
{
    async fn run(&self, input: T) -> StepResult<T, E> {
        (self)(input).await
    }
}

/// Shared handle to an async step
pub type SharedAsyncStep<T, E = anyhow::Error> = Arc<dyn AsyncStep<T, E>>;

type AsyncMiddlewareFn<T, E> = dyn Fn(SharedAsyncStep<T, E>) -> SharedAsyncStep<T, E> + Send + Sync;

/// Wraps an async step to produce another async step
pub struct AsyncMiddleware<T, E = anyhow::Error> {
    func: Arc<AsyncMiddlewareFn<T, E>>,
}

impl<T, E> AsyncMiddleware<T, E> {
    /// Create middleware from a function that wraps the next step
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(SharedAsyncStep<T, E>) -> SharedAsyncStep<T, E> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// Wrap `next` with this middleware
    pub fn apply(&self, next: SharedAsyncStep<T, E>) -> SharedAsyncStep<T, E> {
        (self.func)(next)
    }
}

impl<T, E> Clone for AsyncMiddleware<T, E> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
        }
    }
}

/// Async counterpart of [`Pipeline`](crate::core::Pipeline), with the same
/// ordering, middleware scoping and short-circuit rules
pub struct AsyncPipeline<T, E = anyhow::Error> {
    steps: Vec<SharedAsyncStep<T, E>>,
    middleware: Vec<AsyncMiddleware<T, E>>,
}

impl<T, E> AsyncPipeline<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create an empty async pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            middleware: Vec::new(),
        }
    }

    /// Register middleware for every step added after this call
    pub fn use_middleware(&mut self, middleware: AsyncMiddleware<T, E>) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Append a step, wrapping it in the middleware registered so far
    /// (first-registered outermost)
    pub fn then(&mut self, step: SharedAsyncStep<T, E>) -> &mut Self {
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

    /// Run every step in registration order, stopping at the first failure
    pub async fn execute(&self, input: T) -> StepResult<T, E> {
        debug!(steps = self.steps.len(), "Executing async pipeline");

        let mut current = input;
        for (index, step) in self.steps.iter().enumerate() {
            trace!(index, "Running async step");
            current = match step.run(current).await {
                Ok(output) => output,
                Err(failure) => {
                    debug!(index, "Async step failed, stopping pipeline");
                    return Err(failure);
                }
            };
        }

        Ok(current)
    }

    /// Turn the whole pipeline into a single shared step
    pub fn into_step(self) -> SharedAsyncStep<T, E> {
        Arc::new(PipelineStep(self))
    }
}

impl<T, E> Default for AsyncPipeline<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for AsyncPipeline<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncPipeline")
            .field("steps", &self.steps.len())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

struct PipelineStep<T, E>(AsyncPipeline<T, E>);

#[async_trait]
impl<T, E> AsyncStep<T, E> for PipelineStep<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    async fn run(&self, input: T) -> StepResult<T, E> {
        self.0.execute(input).await
    }
}

struct Blocking<T, E>(Step<T, E>);

#[async_trait]
impl<T, E> AsyncStep<T, E> for Blocking<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    async fn run(&self, input: T) -> StepResult<T, E> {
        self.0.call(input)
    }
}

/// Use a synchronous step inside an async pipeline.
///
/// The step runs inline on the calling task.
pub fn blocking<T, E>(step: Step<T, E>) -> SharedAsyncStep<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    Arc::new(Blocking(step))
}

/// Lift an infallible transform into an async step that always succeeds
pub fn async_wrap<T, E, F>(func: F) -> SharedAsyncStep<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(T) -> T + Send + Sync + 'static,
{
    Arc::new(move |input: T| {
        let output: StepResult<T, E> = Ok(func(input));
        async move { output }
    })
}

/// Route each input to `then_step` or `else_step` by `predicate`
pub fn async_conditional<T, E, P>(
    predicate: P,
    then_step: SharedAsyncStep<T, E>,
    else_step: SharedAsyncStep<T, E>,
) -> SharedAsyncStep<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    Arc::new(Conditional {
        predicate,
        then_step,
        else_step,
    })
}

struct Conditional<T, E, P> {
    predicate: P,
    then_step: SharedAsyncStep<T, E>,
    else_step: SharedAsyncStep<T, E>,
}

#[async_trait]
impl<T, E, P> AsyncStep<T, E> for Conditional<T, E, P>
where
    T: Send + 'static,
    E: Send + 'static,
    P: Fn(&T) -> bool + Send + Sync,
{
    async fn run(&self, input: T) -> StepResult<T, E> {
        if (self.predicate)(&input) {
            self.then_step.run(input).await
        } else {
            self.else_step.run(input).await
        }
    }
}

/// Spawn every branch as a tokio task on the same input and merge the
/// ordered outputs with `combiner`; failures follow the same rules as
/// [`parallel`](crate::execution::parallel::parallel)
pub fn async_parallel<T, E, C>(combiner: C, steps: Vec<SharedAsyncStep<T, E>>) -> SharedAsyncStep<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    C: Fn(Vec<T>) -> StepResult<T, E> + Send + Sync + 'static,
{
    async_parallel_with(CompanionPolicy::default(), combiner, steps)
}

/// Like [`async_parallel`], choosing the failure companion value with `policy`
pub fn async_parallel_with<T, E, C>(
    policy: CompanionPolicy,
    combiner: C,
    steps: Vec<SharedAsyncStep<T, E>>,
) -> SharedAsyncStep<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    C: Fn(Vec<T>) -> StepResult<T, E> + Send + Sync + 'static,
{
    Arc::new(Parallel {
        policy,
        combiner,
        steps,
    })
}

struct Parallel<T, E, C> {
    policy: CompanionPolicy,
    combiner: C,
    steps: Vec<SharedAsyncStep<T, E>>,
}

#[async_trait]
impl<T, E, C> AsyncStep<T, E> for Parallel<T, E, C>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    C: Fn(Vec<T>) -> StepResult<T, E> + Send + Sync,
{
    async fn run(&self, input: T) -> StepResult<T, E> {
        debug!(branches = self.steps.len(), "Fanning out async branches");

        let mut set = JoinSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            let step = Arc::clone(step);
            let branch_input = input.clone();
            set.spawn(async move { (index, step.run(branch_input).await) });
        }

        let mut finished = Vec::with_capacity(self.steps.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(slot) => finished.push(slot),
                Err(err) => std::panic::resume_unwind(err.into_panic()),
            }
        }
        finished.sort_by_key(|(index, _)| *index);

        let outcomes = finished.into_iter().map(|(_, outcome)| outcome).collect();
        fan_in(self.policy, input, outcomes, &self.combiner)
    }
}
