//! Conditional routing between two steps

use crate::core::step::Step;

/// Build a step that routes each input to `then_step` when `predicate`
/// holds and to `else_step` otherwise.
///
/// The predicate is evaluated once per invocation and never cached. The
/// chosen branch's output and failure are returned unchanged.
pub fn conditional<T, E, P>(predicate: P, then_step: Step<T, E>, else_step: Step<T, E>) -> Step<T, E>
where
    T: 'static,
    E: 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    Step::new(move |input| {
        if predicate(&input) {
            then_step.call(input)
        } else {
            else_step.call(input)
        }
    })
}
