// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use braid_core::{Capacity, SharedDispatcher};
use braid_runtime::{DispatcherFactory, SynchronousDispatcher};
use braid_stream::parallel::Parallel;
use braid_stream::BraidStream;
use braid_test_utils::{ManualPublisher, TestSubscriber};
use std::sync::Arc;

fn manual_source() -> (Arc<ManualPublisher<i32>>, BraidStream<i32>) {
    let publisher = ManualPublisher::new();
    let dispatcher: SharedDispatcher = Arc::new(SynchronousDispatcher::new());
    let stream = BraidStream::<i32>::new(publisher.clone(), dispatcher);
    (publisher, stream)
}

#[test]
fn test_parallel_requests_free_room_up_front() -> anyhow::Result<()> {
    // Arrange
    let (publisher, stream) = manual_source();
    let factory = DispatcherFactory::synchronous(Capacity::Bounded(3));

    // Act
    let _parallel = Parallel::new(stream, 3, &factory)?;

    // Assert
    assert_eq!(publisher.requests(), vec![6]);
    Ok(())
}

#[test]
fn test_parallel_withholds_demand_while_every_sub_stream_is_full() -> anyhow::Result<()> {
    // Arrange
    let (publisher, stream) = manual_source();
    let factory = DispatcherFactory::synchronous(Capacity::Bounded(2));
    let parallel = Parallel::new(stream, 2, &factory)?;
    let first = TestSubscriber::manual();
    let second = TestSubscriber::manual();
    parallel.sub_streams()[0].subscribe(first.clone());
    parallel.sub_streams()[1].subscribe(second.clone());

    // Act
    publisher.emit(1);
    publisher.emit(2);
    let requested_while_full = publisher.requests();
    first.request(1);

    // Assert
    assert_eq!(requested_while_full, vec![2]);
    assert_eq!(first.values(), vec![1]);
    assert_eq!(publisher.requests(), vec![2, 1]);
    Ok(())
}

#[test]
fn test_parallel_skips_full_sub_stream() -> anyhow::Result<()> {
    // Arrange
    let (publisher, stream) = manual_source();
    let factory = DispatcherFactory::synchronous(Capacity::Bounded(2));
    let parallel = Parallel::new(stream, 2, &factory)?;
    let slow = TestSubscriber::manual();
    let fast = TestSubscriber::unbounded();
    parallel.sub_streams()[0].subscribe(slow.clone());
    parallel.sub_streams()[1].subscribe(fast.clone());

    // Act
    for value in 1..=4 {
        publisher.emit(value);
    }

    // Assert
    assert!(slow.values().is_empty());
    assert_eq!(fast.values(), vec![2, 3, 4]);
    slow.request(1);
    assert_eq!(slow.values(), vec![1]);
    Ok(())
}

#[test]
fn test_parallel_cancels_upstream_once_every_sub_stream_cancelled() -> anyhow::Result<()> {
    // Arrange
    let (publisher, stream) = manual_source();
    let factory = DispatcherFactory::synchronous(Capacity::Bounded(2));
    let parallel = Parallel::new(stream, 2, &factory)?;
    let first = TestSubscriber::unbounded();
    let second = TestSubscriber::unbounded();
    parallel.sub_streams()[0].subscribe(first.clone());
    parallel.sub_streams()[1].subscribe(second.clone());

    // Act
    first.cancel();
    let cancelled_after_first = publisher.is_cancelled();
    publisher.emit(1);
    second.cancel();

    // Assert
    assert!(!cancelled_after_first);
    assert_eq!(second.values(), vec![1]);
    assert!(publisher.is_cancelled());
    Ok(())
}

#[test]
fn test_parallel_unbounded_sub_streams_request_everything() -> anyhow::Result<()> {
    // Arrange
    let (publisher, stream) = manual_source();
    let factory = DispatcherFactory::synchronous(Capacity::Unbounded);

    // Act
    let _parallel = Parallel::new(stream, 2, &factory)?;

    // Assert
    assert_eq!(publisher.requested(), u64::MAX);
    Ok(())
}

#[test]
fn test_parallel_released_value_keeps_placement_order() -> anyhow::Result<()> {
    // Arrange
    let (publisher, stream) = manual_source();
    let factory = DispatcherFactory::synchronous(Capacity::Bounded(2));
    let parallel = Parallel::new(stream, 3, &factory)?;
    let first = TestSubscriber::manual();
    let second = TestSubscriber::manual();
    let dropped = TestSubscriber::manual();
    parallel.sub_streams()[0].subscribe(first.clone());
    parallel.sub_streams()[1].subscribe(second.clone());
    parallel.sub_streams()[2].subscribe(dropped.clone());
    dropped.cancel();
    publisher.emit(1);
    publisher.emit(2);
    publisher.emit(3);

    // Act
    first.request(2);
    let released = first.values();
    publisher.emit(4);
    first.request(1);
    second.request(1);

    // Assert
    assert_eq!(released, vec![1, 3]);
    assert_eq!(first.values(), vec![1, 3, 4]);
    assert_eq!(second.values(), vec![2]);
    Ok(())
}

#[test]
fn test_parallel_completes_after_released_values() -> anyhow::Result<()> {
    // Arrange
    let (publisher, stream) = manual_source();
    let factory = DispatcherFactory::synchronous(Capacity::Bounded(2));
    let parallel = Parallel::new(stream, 2, &factory)?;
    let first = TestSubscriber::manual();
    let dropped = TestSubscriber::manual();
    parallel.sub_streams()[0].subscribe(first.clone());
    parallel.sub_streams()[1].subscribe(dropped.clone());
    dropped.cancel();
    publisher.emit(1);
    publisher.emit(2);
    publisher.complete();

    // Act
    first.request(2);

    // Assert
    assert_eq!(first.values(), vec![1, 2]);
    assert!(first.is_completed());
    Ok(())
}
