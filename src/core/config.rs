//! Declarative pipeline definitions loaded from YAML

use crate::core::{pipeline::Pipeline, registry::Registry};
use crate::execution::parallel::CompanionPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading, validating or assembling a pipeline definition
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read pipeline file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse pipeline YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid pipeline definition: {0}")]
    Invalid(String),

    #[error("Unknown step: {0}")]
    UnknownStep(String),

    #[error("Unknown predicate: {0}")]
    UnknownPredicate(String),

    #[error("Unknown combiner: {0}")]
    UnknownCombiner(String),

    #[error("Unknown middleware: {0}")]
    UnknownMiddleware(String),
}

/// Top-level pipeline definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Middleware registered before the first step, in order
    #[serde(default)]
    pub middleware: Vec<String>,

    /// Chain entries, in execution order
    pub steps: Vec<EntryConfig>,
}

/// One entry of the chain: either a step or a middleware registration that
/// applies to the steps after it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged, deny_unknown_fields)]
pub enum EntryConfig {
    Use {
        #[serde(rename = "use")]
        middleware: String,
    },
    Step(StepConfig),
}

/// A step, possibly built from combinators.
///
/// Each shape accepts only its own keys, so an entry mixing two shapes is
/// rejected instead of matching whichever comes first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged, deny_unknown_fields)]
pub enum StepConfig {
    /// A step registered by name
    Named { step: String },

    /// Route by a registered predicate
    Conditional {
        when: String,
        then: Box<StepConfig>,
        #[serde(rename = "else")]
        otherwise: Box<StepConfig>,
    },

    /// Fan out to several branches and merge them
    Parallel { parallel: ParallelConfig },
}

/// Fan-out configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParallelConfig {
    /// Name of the registered combiner
    pub combiner: String,

    /// Value reported alongside a branch failure
    #[serde(default)]
    pub on_failure: CompanionPolicy,

    /// Branches, in the order their outputs reach the combiner
    pub branches: Vec<StepConfig>,
}

impl PipelineConfig {
    /// Load a pipeline definition from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a pipeline definition from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the definition without resolving any names
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("pipeline name is empty".to_string()));
        }

        for name in &self.middleware {
            check_name("middleware", name)?;
        }

        for entry in &self.steps {
            match entry {
                EntryConfig::Use { middleware } => check_name("middleware", middleware)?,
                EntryConfig::Step(step) => step.validate()?,
            }
        }

        Ok(())
    }

    /// Assemble the pipeline, resolving names against `registry`
    pub fn to_pipeline<T, E>(&self, registry: &Registry<T, E>) -> Result<Pipeline<T, E>, ConfigError>
    where
        T: Clone + Send + Sync + 'static,
        E: Send + 'static,
    {
        registry.build(self)
    }
}

impl StepConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            StepConfig::Named { step } => check_name("step", step),
            StepConfig::Conditional { when, then, otherwise } => {
                check_name("predicate", when)?;
                then.validate()?;
                otherwise.validate()
            }
            StepConfig::Parallel { parallel } => {
                check_name("combiner", &parallel.combiner)?;
                if parallel.branches.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "parallel block with combiner '{}' has no branches",
                        parallel.combiner
                    )));
                }
                parallel.branches.iter().try_for_each(StepConfig::validate)
            }
        }
    }
}

fn check_name(kind: &str, name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("empty {} name", kind)));
    }
    Ok(())
}
