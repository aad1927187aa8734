// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use braid_core::{BraidError, SharedDispatcher};
use braid_runtime::SynchronousDispatcher;
use braid_stream::merge::merge;
use braid_stream::sources::{defer, from_values};
use braid_test_utils::{Event, NonOrderingDispatcher, TestSubscriber};
use std::sync::Arc;

fn synchronous() -> SharedDispatcher {
    Arc::new(SynchronousDispatcher::new())
}

#[test]
fn test_merge_requires_ordering_dispatcher() -> anyhow::Result<()> {
    // Arrange
    let sources = vec![from_values(synchronous(), vec![1])?];

    // Act
    let result = merge(Arc::new(NonOrderingDispatcher::new()), sources);

    // Assert
    assert!(result.is_err_and(|error| error.is_configuration()));
    Ok(())
}

#[test]
fn test_merge_rejects_empty_source_list() {
    // Act
    let result = merge::<i32>(synchronous(), Vec::new());

    // Assert
    assert!(result.is_err_and(|error| error.is_configuration()));
}

#[test]
fn test_merge_source_error_fails_fast_and_cancels_others() -> anyhow::Result<()> {
    // Arrange
    let dispatcher = synchronous();
    let healthy = defer::<i32>(dispatcher.clone())?;
    let failing = defer::<i32>(dispatcher.clone())?;
    let merged = merge(dispatcher, vec![healthy.stream(), failing.stream()])?;
    let subscriber = TestSubscriber::unbounded();
    merged.subscribe(subscriber.clone());

    // Act
    healthy.next(1)?;
    failing.error(BraidError::stream_error("source failed"));
    healthy.next(2)?;

    // Assert
    assert_eq!(
        subscriber.events(),
        vec![
            Event::Next(1),
            Event::Error("Stream processing error: source failed".to_string())
        ]
    );
    assert!(healthy.is_cancelled());
    Ok(())
}

#[test]
fn test_merge_cancel_cancels_every_source() -> anyhow::Result<()> {
    // Arrange
    let dispatcher = synchronous();
    let first = defer::<i32>(dispatcher.clone())?;
    let second = defer::<i32>(dispatcher.clone())?;
    let merged = merge(dispatcher, vec![first.stream(), second.stream()])?;
    let subscriber = TestSubscriber::unbounded();
    merged.subscribe(subscriber.clone());

    // Act
    subscriber.cancel();

    // Assert
    assert!(first.is_cancelled());
    assert!(second.is_cancelled());
    assert!(!subscriber.is_terminated());
    Ok(())
}

#[test]
fn test_merge_request_zero_is_invalid_demand() -> anyhow::Result<()> {
    // Arrange
    let dispatcher = synchronous();
    let source = defer::<i32>(dispatcher.clone())?;
    let merged = merge(dispatcher, vec![source.stream()])?;
    let subscriber = TestSubscriber::manual();
    merged.subscribe(subscriber.clone());

    // Act
    subscriber.request(0);

    // Assert
    assert!(matches!(
        subscriber.error(),
        Some(BraidError::InvalidDemand { requested: 0 })
    ));
    assert!(source.is_cancelled());
    Ok(())
}

#[test]
fn test_merge_rejects_second_subscriber() -> anyhow::Result<()> {
    // Arrange
    let dispatcher = synchronous();
    let merged = merge(
        dispatcher.clone(),
        vec![from_values(dispatcher, vec![1, 2])?],
    )?;
    let first = TestSubscriber::unbounded();
    let second = TestSubscriber::unbounded();
    merged.subscribe(first.clone());

    // Act
    merged.subscribe(second.clone());

    // Assert
    assert_eq!(first.values(), vec![1, 2]);
    assert!(matches!(second.error(), Some(BraidError::AlreadySubscribed)));
    Ok(())
}
