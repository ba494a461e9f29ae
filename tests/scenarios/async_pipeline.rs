//! Test: Async Pipeline - the same model over tokio tasks

use crate::helpers::*;
use std::sync::Arc;
use std::time::Duration;
use stepchain::{
    async_conditional, async_parallel, async_parallel_with, async_wrap, blocking, AsyncMiddleware, AsyncPipeline,
    CompanionPolicy, Failure, SharedAsyncStep,
};

fn async_failing(name: &'static str, output: i32) -> SharedAsyncStep<i32, TestError> {
    Arc::new(move |_x: i32| async move { Err::<i32, _>(Failure::new(output, TestError::Step(name))) })
}

fn async_logged(log: &CallLog, label: &'static str) -> AsyncMiddleware<i32, TestError> {
    let log = log.clone();
    AsyncMiddleware::new(move |next: SharedAsyncStep<i32, TestError>| {
        let log = log.clone();
        let step: SharedAsyncStep<i32, TestError> = Arc::new(move |x: i32| {
            let log = log.clone();
            let next = Arc::clone(&next);
            async move {
                log.record(format!("{} before", label));
                let result = next.run(x).await;
                log.record(format!("{} after", label));
                result
            }
        });
        step
    })
}

#[tokio::test]
async fn test_async_sequential_and_short_circuit() {
    init_tracing();
    let after = Counter::new();
    let mut pipeline: AsyncPipeline<i32, TestError> = AsyncPipeline::new();
    pipeline
        .then(async_wrap(|x| x + 1))
        .then(async_failing("second", 40))
        .then(blocking(after.step(|x| x * 2)));

    let failure = pipeline.execute(3).await.unwrap_err();
    assert_eq!(failure.output, 40);
    assert_eq!(failure.error, TestError::Step("second"));
    assert_eq!(after.count(), 0);

    let empty: AsyncPipeline<i32, TestError> = AsyncPipeline::new();
    assert_eq!(empty.execute(9).await.unwrap(), 9);
}

#[tokio::test]
async fn test_async_middleware_order_and_scope() {
    let log = CallLog::new();
    let mut pipeline: AsyncPipeline<i32, TestError> = AsyncPipeline::new();
    pipeline
        .then(blocking(log.step("early", |x| x)))
        .use_middleware(async_logged(&log, "A"))
        .use_middleware(async_logged(&log, "B"))
        .then(blocking(log.step("late", |x| x + 2)));

    assert_eq!(pipeline.execute(1).await.unwrap(), 3);
    assert_eq!(
        log.entries(),
        vec!["early", "A before", "B before", "late", "B after", "A after"]
    );
}

#[tokio::test]
async fn test_async_conditional() {
    let step = async_conditional(|x: &i32| x % 2 == 0, async_wrap(|x| x + 1), async_wrap(|x| x - 1));
    let mut pipeline: AsyncPipeline<i32, TestError> = AsyncPipeline::new();
    pipeline.then(step);

    assert_eq!(pipeline.execute(4).await.unwrap(), 5);
    assert_eq!(pipeline.execute(3).await.unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_parallel_is_positional() {
    let slow: SharedAsyncStep<i32, TestError> = Arc::new(|x: i32| async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        Ok::<_, Failure<i32, TestError>>(x + 1)
    });

    let step = async_parallel(
        |values: Vec<i32>| Ok(values[0] * 10 + values[1]),
        vec![slow, async_wrap(|x| x * 2)],
    );
    assert_eq!(step.run(3).await.unwrap(), 46);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_parallel_failure_companion() {
    let sibling = Counter::new();
    let branches = || {
        vec![
            async_wrap(|x| x + 1),
            async_failing("second", 500),
            blocking(sibling.step(|x| x)),
        ]
    };

    let default = async_parallel(sum, branches());
    let failure = default.run(3).await.unwrap_err();
    assert_eq!(failure.output, 4);
    assert_eq!(failure.error, TestError::Step("second"));

    let input = async_parallel_with(CompanionPolicy::Input, sum, branches());
    assert_eq!(input.run(3).await.unwrap_err().output, 3);

    assert_eq!(sibling.count(), 2);
}

#[tokio::test]
async fn test_async_pipeline_as_step() {
    let mut inner: AsyncPipeline<i32, TestError> = AsyncPipeline::new();
    inner.then(async_wrap(|x| x * 3));

    let mut outer: AsyncPipeline<i32, TestError> = AsyncPipeline::new();
    outer.then(async_wrap(|x| x + 1)).then(inner.into_step());

    assert_eq!(outer.execute(1).await.unwrap(), 6);
}
