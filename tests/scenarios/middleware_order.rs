//! Test: Middleware Order - onion nesting and registration-time scoping

use crate::helpers::*;
use std::sync::{Arc, Mutex};
use stepchain::{inspect_input, inspect_output, traced, wrap, Pipeline, StepResult};

/// First-registered middleware is the outermost layer
#[test]
fn test_middleware_nests_like_an_onion() {
    init_tracing();
    let log = CallLog::new();
    let mut pipeline: Pipeline<i32, TestError> = Pipeline::new();
    pipeline
        .use_middleware(log.middleware("A"))
        .use_middleware(log.middleware("B"))
        .then(log.step("step", |x| x + 2));

    assert_eq!(pipeline.execute(1).unwrap(), 3);
    assert_eq!(
        log.entries(),
        vec!["A before", "B before", "step", "B after", "A after"]
    );
}

/// Middleware registered after a step does not touch that step
#[test]
fn test_late_middleware_only_wraps_later_steps() {
    init_tracing();
    let log = CallLog::new();
    let mut pipeline: Pipeline<i32, TestError> = Pipeline::new();
    pipeline
        .then(log.step("first", |x| x + 1))
        .use_middleware(log.middleware("late"))
        .then(log.step("second", |x| x * 2));

    assert_eq!(pipeline.execute(1).unwrap(), 4);
    assert_eq!(
        log.entries(),
        vec!["first", "late before", "second", "late after"]
    );
}

/// Each step is wrapped by every middleware live at its registration
#[test]
fn test_middleware_wraps_every_subsequent_step() {
    let log = CallLog::new();
    let mut pipeline: Pipeline<i32, TestError> = Pipeline::new();
    pipeline
        .use_middleware(log.middleware("M"))
        .then(log.step("one", |x| x))
        .then(log.step("two", |x| x));

    pipeline.execute(0).unwrap();
    assert_eq!(
        log.entries(),
        vec!["M before", "one", "M after", "M before", "two", "M after"]
    );
}

/// Middleware sees the failure and the chain still stops
#[test]
fn test_middleware_observes_failure() {
    init_tracing();
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let recorder = {
        let outcomes = Arc::clone(&outcomes);
        inspect_output(move |result: &StepResult<i32, TestError>| {
            outcomes.lock().unwrap().push(result.is_ok());
        })
    };

    let mut pipeline: Pipeline<i32, TestError> = Pipeline::new();
    pipeline
        .use_middleware(traced("scenario"))
        .use_middleware(recorder)
        .then(wrap(|x| x + 1))
        .then(failing_step("boom", -1))
        .then(wrap(|x| x + 1));

    let failure = pipeline.execute(0).unwrap_err();
    assert_eq!(failure.output, -1);
    assert_eq!(*outcomes.lock().unwrap(), vec![true, false]);
}

/// Input inspection happens before the wrapped step sees the value
#[test]
fn test_inspect_input_sees_running_value() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let observer = {
        let seen = Arc::clone(&seen);
        inspect_input(move |x: &i32| seen.lock().unwrap().push(*x))
    };

    let mut pipeline: Pipeline<i32, TestError> = Pipeline::new();
    pipeline
        .use_middleware(observer)
        .then(wrap(|x| x + 1))
        .then(wrap(|x| x * 3));

    assert_eq!(pipeline.execute(2).unwrap(), 9);
    assert_eq!(*seen.lock().unwrap(), vec![2, 3]);
}
