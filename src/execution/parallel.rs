//! Parallel fan-out / fan-in of steps

use crate::core::step::{Failure, Step, StepResult};
use serde::{Deserialize, Serialize};
use std::panic;
use std::sync::Arc;
use std::thread;
use tracing::debug;

/// Which value accompanies the error when a parallel branch fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanionPolicy {
    /// The value recorded by the first branch in the list, whichever branch
    /// actually failed and whether or not the first branch succeeded
    #[default]
    FirstBranch,

    /// The output of the branch that failed
    FailingBranch,

    /// The original input handed to every branch
    Input,
}

/// Function merging the ordered branch outputs into one value
pub type Combiner<T, E> = Arc<dyn Fn(Vec<T>) -> StepResult<T, E> + Send + Sync>;

/// Run `steps` concurrently on the same input and merge their outputs with
/// `combiner`.
///
/// Each branch gets its own scoped thread, so branches may block on one
/// another.
///
/// Every branch runs to completion before any failure is reported. On
/// failure, the first failing branch in list order supplies the error and
/// the value recorded at index 0 accompanies it (see
/// [`CompanionPolicy::FirstBranch`]).
pub fn parallel<T, E, C>(combiner: C, steps: Vec<Step<T, E>>) -> Step<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    C: Fn(Vec<T>) -> StepResult<T, E> + Send + Sync + 'static,
{
    parallel_with(CompanionPolicy::default(), combiner, steps)
}

/// Like [`parallel`], choosing the failure companion value with `policy`
pub fn parallel_with<T, E, C>(policy: CompanionPolicy, combiner: C, steps: Vec<Step<T, E>>) -> Step<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
    C: Fn(Vec<T>) -> StepResult<T, E> + Send + Sync + 'static,
{
    Step::new(move |input: T| {
        debug!(branches = steps.len(), "Fanning out");
        let outcomes: Vec<StepResult<T, E>> = thread::scope(|scope| {
            let handles: Vec<_> = steps
                .iter()
                .map(|step| {
                    let branch_input = input.clone();
                    scope.spawn(move || step.call(branch_input))
                })
                .collect();

            // Joined in list order so each outcome lands in its branch's slot
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|payload| panic::resume_unwind(payload)))
                .collect()
        });
        fan_in(policy, input, outcomes, &combiner)
    })
}

/// Resolve the ordered branch outcomes of a fan-out.
///
/// Shared by the blocking and async fan-outs so both report failures the
/// same way.
pub(crate) fn fan_in<T, E, C>(
    policy: CompanionPolicy,
    input: T,
    outcomes: Vec<StepResult<T, E>>,
    combiner: &C,
) -> StepResult<T, E>
where
    C: Fn(Vec<T>) -> StepResult<T, E> + ?Sized,
{
    let mut results = Vec::with_capacity(outcomes.len());
    let mut first_error: Option<(usize, E)> = None;

    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(value) => results.push(value),
            Err(Failure { output, error }) => {
                results.push(output);
                if first_error.is_none() {
                    first_error = Some((index, error));
                }
            }
        }
    }

    let Some((failed_index, error)) = first_error else {
        return combiner(results);
    };

    debug!(failed_index, ?policy, "Parallel branch failed");
    let output = match policy {
        CompanionPolicy::FirstBranch => results.swap_remove(0),
        CompanionPolicy::FailingBranch => results.swap_remove(failed_index),
        CompanionPolicy::Input => input,
    };
    Err(Failure::new(output, error))
}
