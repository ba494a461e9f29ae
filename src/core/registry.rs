//! Named steps, predicates, combiners and middleware for assembling
//! pipelines from definitions

use crate::core::{
    condition::conditional,
    config::{ConfigError, EntryConfig, PipelineConfig, StepConfig},
    middleware::Middleware,
    pipeline::Pipeline,
    step::{Step, StepResult},
};
use crate::execution::parallel::{parallel_with, Combiner};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Lookup table used to resolve the names in a [`PipelineConfig`]
pub struct Registry<T, E = anyhow::Error> {
    steps: HashMap<String, Step<T, E>>,
    predicates: HashMap<String, Predicate<T>>,
    combiners: HashMap<String, Combiner<T, E>>,
    middleware: HashMap<String, Middleware<T, E>>,
}

impl<T, E> Registry<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            steps: HashMap::new(),
            predicates: HashMap::new(),
            combiners: HashMap::new(),
            middleware: HashMap::new(),
        }
    }

    /// Register a step under `name`, replacing any previous one
    pub fn register_step(&mut self, name: impl Into<String>, step: Step<T, E>) -> &mut Self {
        self.steps.insert(name.into(), step);
        self
    }

    /// Register a predicate for conditional entries
    pub fn register_predicate<P>(&mut self, name: impl Into<String>, predicate: P) -> &mut Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(name.into(), Arc::new(predicate));
        self
    }

    /// Register a combiner for parallel entries
    pub fn register_combiner<C>(&mut self, name: impl Into<String>, combiner: C) -> &mut Self
    where
        C: Fn(Vec<T>) -> StepResult<T, E> + Send + Sync + 'static,
    {
        self.combiners.insert(name.into(), Arc::new(combiner));
        self
    }

    /// Register middleware for `middleware` lists and `use` entries
    pub fn register_middleware(&mut self, name: impl Into<String>, middleware: Middleware<T, E>) -> &mut Self {
        self.middleware.insert(name.into(), middleware);
        self
    }

    /// Assemble a pipeline from `config`.
    ///
    /// Entries are replayed through [`Pipeline::use_middleware`] and
    /// [`Pipeline::then`] in order, so a `use` entry only affects the steps
    /// that follow it.
    pub fn build(&self, config: &PipelineConfig) -> Result<Pipeline<T, E>, ConfigError> {
        config.validate()?;

        let mut pipeline = Pipeline::new();
        for name in &config.middleware {
            pipeline.use_middleware(self.lookup_middleware(name)?);
        }

        for entry in &config.steps {
            match entry {
                EntryConfig::Use { middleware } => {
                    debug!("Registering middleware {} mid-chain", middleware);
                    pipeline.use_middleware(self.lookup_middleware(middleware)?);
                }
                EntryConfig::Step(step) => {
                    pipeline.then(self.resolve(step)?);
                }
            }
        }

        info!(
            "Assembled pipeline {} ({} steps, {} middleware)",
            config.name,
            pipeline.len(),
            pipeline.middleware_len()
        );
        Ok(pipeline)
    }

    fn resolve(&self, config: &StepConfig) -> Result<Step<T, E>, ConfigError> {
        match config {
            StepConfig::Named { step } => self
                .steps
                .get(step)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownStep(step.clone())),
            StepConfig::Conditional { when, then, otherwise } => {
                let predicate = self
                    .predicates
                    .get(when)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownPredicate(when.clone()))?;
                Ok(conditional(
                    move |value: &T| predicate(value),
                    self.resolve(then)?,
                    self.resolve(otherwise)?,
                ))
            }
            StepConfig::Parallel { parallel } => {
                let combiner = self
                    .combiners
                    .get(&parallel.combiner)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownCombiner(parallel.combiner.clone()))?;
                let branches = parallel
                    .branches
                    .iter()
                    .map(|branch| self.resolve(branch))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(parallel_with(
                    parallel.on_failure,
                    move |values: Vec<T>| combiner(values),
                    branches,
                ))
            }
        }
    }

    fn lookup_middleware(&self, name: &str) -> Result<Middleware<T, E>, ConfigError> {
        self.middleware
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownMiddleware(name.to_string()))
    }
}

impl<T, E> Default for Registry<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
