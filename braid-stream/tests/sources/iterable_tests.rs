// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use braid_core::{Capacity, SharedDispatcher};
use braid_runtime::SynchronousDispatcher;
use braid_stream::sources::{from_iter, from_values, generate};
use braid_test_utils::{Event, NonOrderingDispatcher, TestSubscriber};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

fn synchronous() -> SharedDispatcher {
    Arc::new(SynchronousDispatcher::new())
}

#[test]
fn test_from_values_emits_all_then_completes() -> anyhow::Result<()> {
    // Arrange
    let stream = from_values(synchronous(), vec![1, 2, 3])?;
    let subscriber = TestSubscriber::unbounded();

    // Act
    stream.subscribe(subscriber.clone());

    // Assert
    assert_eq!(stream.capacity(), Capacity::Bounded(3));
    assert_eq!(
        subscriber.events(),
        vec![Event::Next(1), Event::Next(2), Event::Next(3), Event::Complete]
    );
    Ok(())
}

#[test]
fn test_from_values_respects_demand() -> anyhow::Result<()> {
    // Arrange
    let stream = from_values(synchronous(), vec!["a", "b", "c"])?;
    let subscriber = TestSubscriber::with_demand(2);

    // Act
    stream.subscribe(subscriber.clone());
    let after_first_request = subscriber.values();
    subscriber.request(1);

    // Assert
    assert_eq!(after_first_request, vec!["a", "b"]);
    assert_eq!(subscriber.values(), vec!["a", "b", "c"]);
    assert!(subscriber.is_completed());
    Ok(())
}

#[test]
fn test_from_values_completes_on_exhaustion_without_extra_demand() -> anyhow::Result<()> {
    // Arrange
    let stream = from_values(synchronous(), vec![7, 8])?;
    let subscriber = TestSubscriber::with_demand(2);

    // Act
    stream.subscribe(subscriber.clone());

    // Assert
    assert_eq!(subscriber.values(), vec![7, 8]);
    assert!(subscriber.is_completed());
    Ok(())
}

#[test]
fn test_from_values_empty_completes_immediately() -> anyhow::Result<()> {
    // Arrange
    let stream = from_values::<i32>(synchronous(), Vec::new())?;
    let subscriber = TestSubscriber::manual();

    // Act
    stream.subscribe(subscriber.clone());

    // Assert
    assert_eq!(stream.capacity(), Capacity::Bounded(0));
    assert_eq!(subscriber.events(), vec![Event::Complete]);
    Ok(())
}

#[test]
fn test_from_values_replays_for_every_subscriber() -> anyhow::Result<()> {
    // Arrange
    let stream = from_values(synchronous(), vec![1, 2])?;
    let first = TestSubscriber::unbounded();
    let second = TestSubscriber::unbounded();

    // Act
    stream.subscribe(first.clone());
    stream.subscribe(second.clone());

    // Assert
    assert_eq!(first.values(), vec![1, 2]);
    assert_eq!(second.values(), vec![1, 2]);
    Ok(())
}

#[test]
fn test_from_values_requires_ordering() {
    // Act
    let result = from_values(Arc::new(NonOrderingDispatcher::new()), vec![1]);

    // Assert
    assert!(result.is_err_and(|error| error.is_configuration()));
}

#[test]
fn test_from_iter_is_unbounded_and_lazy() -> anyhow::Result<()> {
    // Arrange
    let stream = from_iter(synchronous(), 0u64..)?;
    let subscriber = TestSubscriber::with_demand(4);

    // Act
    stream.subscribe(subscriber.clone());

    // Assert
    assert_eq!(stream.capacity(), Capacity::Unbounded);
    assert_eq!(subscriber.values(), vec![0, 1, 2, 3]);
    assert!(!subscriber.is_terminated());
    Ok(())
}

#[test]
fn test_from_iter_requires_ordering() {
    // Act
    let result = from_iter(Arc::new(NonOrderingDispatcher::new()), vec![1, 2]);

    // Assert
    assert!(result.is_err_and(|error| error.is_configuration()));
}

#[test]
fn test_generate_calls_supplier_once_per_demand() {
    // Arrange
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let stream = generate(synchronous(), move || {
        Some(counter.fetch_add(1, Ordering::SeqCst))
    });
    let subscriber = TestSubscriber::with_demand(3);

    // Act
    stream.subscribe(subscriber.clone());
    let calls_after_subscribe = calls.load(Ordering::SeqCst);
    subscriber.request(2);

    // Assert
    assert_eq!(stream.capacity(), Capacity::Bounded(1));
    assert_eq!(calls_after_subscribe, 3);
    assert_eq!(subscriber.values(), vec![0, 1, 2, 3, 4]);
    assert!(!subscriber.is_terminated());
}

#[test]
fn test_generate_completes_when_supplier_is_exhausted() {
    // Arrange
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let stream = generate(synchronous(), move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        (n < 2).then_some(n)
    });
    let subscriber = TestSubscriber::unbounded();

    // Act
    stream.subscribe(subscriber.clone());

    // Assert
    assert_eq!(
        subscriber.events(),
        vec![Event::Next(0), Event::Next(1), Event::Complete]
    );
}

#[test]
fn test_generate_accepts_non_ordering_dispatcher() {
    // Arrange
    let stream = generate(Arc::new(NonOrderingDispatcher::new()), || Some(1));
    let subscriber = TestSubscriber::with_demand(2);

    // Act
    stream.subscribe(subscriber.clone());

    // Assert
    assert_eq!(subscriber.values(), vec![1, 1]);
}

#[test]
fn test_request_zero_fails_the_source() -> anyhow::Result<()> {
    // Arrange
    let stream = from_values(synchronous(), vec![1, 2])?;
    let subscriber = TestSubscriber::manual();
    stream.subscribe(subscriber.clone());

    // Act
    subscriber.request(0);

    // Assert
    assert!(matches!(
        subscriber.error(),
        Some(braid_core::BraidError::InvalidDemand { requested: 0 })
    ));
    assert!(subscriber.values().is_empty());
    Ok(())
}

#[test]
fn test_cancel_stops_emission() -> anyhow::Result<()> {
    // Arrange
    let stream = from_iter(synchronous(), 0u32..)?;
    let subscriber = TestSubscriber::with_demand(1);
    stream.subscribe(subscriber.clone());

    // Act
    subscriber.cancel();
    subscriber.request(5);

    // Assert
    assert_eq!(subscriber.values(), vec![0]);
    assert!(!subscriber.is_terminated());
    Ok(())
}
