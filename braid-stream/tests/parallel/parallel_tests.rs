// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use braid_core::{BraidError, Capacity, Publisher, SharedDispatcher};
use braid_runtime::{DispatcherFactory, SynchronousDispatcher};
use braid_stream::parallel::{parallel, Parallel};
use braid_stream::sources::{defer, Deferred};
use braid_stream::BraidStream;
use braid_test_utils::{Event, TestSubscriber};
use std::sync::Arc;

fn hot_source() -> anyhow::Result<Deferred<i32>> {
    let dispatcher: SharedDispatcher = Arc::new(SynchronousDispatcher::new());
    Ok(defer(dispatcher)?)
}

fn subscribe_all(parallel: &Parallel<i32>) -> Vec<Arc<TestSubscriber<i32>>> {
    parallel
        .sub_streams()
        .iter()
        .map(|stream| {
            let subscriber = TestSubscriber::unbounded();
            stream.subscribe(subscriber.clone());
            subscriber
        })
        .collect()
}

#[test]
fn test_parallel_round_robin_with_capacity_one() -> anyhow::Result<()> {
    // Arrange
    let source = hot_source()?;
    let factory = DispatcherFactory::synchronous(Capacity::Bounded(2));
    let parallel = Parallel::new(source.stream(), 3, &factory)?;
    let subscribers = subscribe_all(&parallel);

    // Act
    for value in 1..=6 {
        source.next(value)?;
    }

    // Assert
    assert_eq!(subscribers[0].values(), vec![1, 4]);
    assert_eq!(subscribers[1].values(), vec![2, 5]);
    assert_eq!(subscribers[2].values(), vec![3, 6]);
    Ok(())
}

#[test]
fn test_parallel_batches_of_capacity() -> anyhow::Result<()> {
    // Arrange
    let source = hot_source()?;
    let factory = DispatcherFactory::synchronous(Capacity::Bounded(4));
    let parallel = Parallel::new(source.stream(), 2, &factory)?;
    let subscribers = subscribe_all(&parallel);

    // Act
    for value in 1..=12 {
        source.next(value)?;
    }

    // Assert
    assert_eq!(subscribers[0].values(), vec![1, 2, 3, 7, 8, 9]);
    assert_eq!(subscribers[1].values(), vec![4, 5, 6, 10, 11, 12]);
    Ok(())
}

#[test]
fn test_parallel_sub_streams_declare_usable_capacity() -> anyhow::Result<()> {
    // Arrange
    let source = hot_source()?;
    let factory = DispatcherFactory::synchronous(Capacity::Bounded(6));

    // Act
    let parallel = parallel(source.stream(), 4, &factory)?;

    // Assert
    assert_eq!(parallel.pool_size(), 4);
    assert!(parallel
        .sub_streams()
        .iter()
        .all(|stream| stream.capacity() == Capacity::Bounded(5)));
    assert_eq!(parallel.capacity(), Capacity::Bounded(4));
    Ok(())
}

#[test]
fn test_parallel_every_value_reaches_exactly_one_sub_stream() -> anyhow::Result<()> {
    // Arrange
    let source = hot_source()?;
    let factory = DispatcherFactory::synchronous(Capacity::Bounded(3));
    let parallel = Parallel::new(source.stream(), 4, &factory)?;
    let subscribers = subscribe_all(&parallel);

    // Act
    for value in 0..100 {
        source.next(value)?;
    }

    // Assert
    let mut all: Vec<i32> = subscribers
        .iter()
        .flat_map(|subscriber| subscriber.values())
        .collect();
    all.sort_unstable();
    assert_eq!(all, (0..100).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn test_parallel_broadcasts_completion() -> anyhow::Result<()> {
    // Arrange
    let source = hot_source()?;
    let factory = DispatcherFactory::synchronous(Capacity::Bounded(2));
    let parallel = Parallel::new(source.stream(), 2, &factory)?;
    let subscribers = subscribe_all(&parallel);

    // Act
    source.next(1)?;
    source.complete();

    // Assert
    assert_eq!(
        subscribers[0].events(),
        vec![Event::Next(1), Event::Complete]
    );
    assert_eq!(subscribers[1].events(), vec![Event::Complete]);
    Ok(())
}

#[test]
fn test_parallel_broadcasts_errors() -> anyhow::Result<()> {
    // Arrange
    let source = hot_source()?;
    let factory = DispatcherFactory::synchronous(Capacity::Bounded(2));
    let parallel = Parallel::new(source.stream(), 3, &factory)?;
    let subscribers = subscribe_all(&parallel);

    // Act
    source.error(BraidError::stream_error("upstream failed"));

    // Assert
    for subscriber in &subscribers {
        assert_eq!(
            subscriber.events(),
            vec![Event::Error(
                "Stream processing error: upstream failed".to_string()
            )]
        );
    }
    Ok(())
}

#[test]
fn test_parallel_rejects_zero_pool_size() -> anyhow::Result<()> {
    // Arrange
    let source = hot_source()?;
    let factory = DispatcherFactory::synchronous(Capacity::Bounded(2));

    // Act
    let result = Parallel::new(source.stream(), 0, &factory);

    // Assert
    assert!(result.is_err_and(|error| error.is_configuration()));
    Ok(())
}

#[test]
fn test_parallel_propagates_factory_errors() -> anyhow::Result<()> {
    // Arrange
    let source = hot_source()?;
    let factory = DispatcherFactory::new(|| Err(BraidError::configuration("no dispatcher left")));

    // Act
    let result = Parallel::new(source.stream(), 2, &factory);

    // Assert
    assert!(result.is_err_and(|error| error.is_configuration()));
    Ok(())
}

#[test]
fn test_parallel_streams_emits_every_sub_stream_in_order() -> anyhow::Result<()> {
    // Arrange
    let source = hot_source()?;
    let factory = DispatcherFactory::synchronous(Capacity::Bounded(2));
    let parallel = Parallel::new(source.stream(), 3, &factory)?;
    let subscriber = TestSubscriber::<BraidStream<i32>>::unbounded();

    // Act
    parallel.subscribe(subscriber.clone());

    // Assert
    assert_eq!(subscriber.value_count(), 3);
    assert!(subscriber.is_completed());
    let inner = TestSubscriber::unbounded();
    subscriber.values()[1].subscribe(inner.clone());
    source.next(10)?;
    source.next(20)?;
    assert_eq!(inner.values(), vec![20]);
    Ok(())
}

#[test]
fn test_parallel_into_sub_streams() -> anyhow::Result<()> {
    // Arrange
    let source = hot_source()?;
    let factory = DispatcherFactory::synchronous(Capacity::Bounded(2));
    let parallel = Parallel::new(source.stream(), 2, &factory)?;

    // Act
    let streams = parallel.into_sub_streams();

    // Assert
    assert_eq!(streams.len(), 2);
    Ok(())
}
