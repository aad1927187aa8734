// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use braid_core::{BraidError, Capacity, SharedDispatcher, StreamState};
use braid_runtime::SynchronousDispatcher;
use braid_stream::sources::{defer, from_values};
use braid_test_utils::{Event, TestSubscriber};
use std::sync::Arc;

fn synchronous() -> SharedDispatcher {
    Arc::new(SynchronousDispatcher::new())
}

#[test]
fn test_map_transforms_values_and_keeps_capacity() -> anyhow::Result<()> {
    // Arrange
    let stream = from_values(synchronous(), vec![1, 2, 3])?;
    let mapped = stream.map(|n| n * 10);
    let subscriber = TestSubscriber::unbounded();

    // Act
    mapped.subscribe(subscriber.clone());

    // Assert
    assert_eq!(mapped.capacity(), Capacity::Bounded(3));
    assert_eq!(
        subscriber.events(),
        vec![
            Event::Next(10),
            Event::Next(20),
            Event::Next(30),
            Event::Complete
        ]
    );
    Ok(())
}

#[test]
fn test_map_forwards_demand() -> anyhow::Result<()> {
    // Arrange
    let stream = from_values(synchronous(), vec!["a", "bb", "ccc"])?;
    let mapped = stream.map(str::len);
    let subscriber = TestSubscriber::with_demand(2);

    // Act
    mapped.subscribe(subscriber.clone());

    // Assert
    assert_eq!(subscriber.values(), vec![1, 2]);
    assert!(!subscriber.is_terminated());
    Ok(())
}

#[test]
fn test_map_forwards_errors() -> anyhow::Result<()> {
    // Arrange
    let deferred = defer::<i32>(synchronous())?;
    let mapped = deferred.stream().map(|n| n + 1);
    let subscriber = TestSubscriber::unbounded();
    mapped.subscribe(subscriber.clone());

    // Act
    deferred.next(1)?;
    deferred.error(BraidError::stream_error("boom"));

    // Assert
    assert_eq!(
        subscriber.events(),
        vec![
            Event::Next(2),
            Event::Error("Stream processing error: boom".to_string())
        ]
    );
    Ok(())
}

#[test]
fn test_clone_shares_the_same_stream() -> anyhow::Result<()> {
    // Arrange
    let deferred = defer::<i32>(synchronous())?;
    let stream = deferred.stream();
    let clone = stream.clone();
    let first = TestSubscriber::unbounded();
    let second = TestSubscriber::unbounded();

    // Act
    stream.subscribe(first.clone());
    clone.subscribe(second.clone());

    // Assert
    assert!(first.is_subscribed());
    assert!(matches!(second.error(), Some(BraidError::AlreadySubscribed)));
    Ok(())
}

#[test]
fn test_state_tracks_termination() -> anyhow::Result<()> {
    // Arrange
    let deferred = defer::<i32>(synchronous())?;
    let stream = deferred.stream();
    let before = stream.state();

    // Act
    deferred.error(BraidError::stream_error("boom"));

    // Assert
    assert_eq!(before, StreamState::Active);
    assert_eq!(stream.state(), StreamState::Errored);
    Ok(())
}

#[test]
fn test_debug_shows_capacity() -> anyhow::Result<()> {
    // Arrange
    let stream = from_values(synchronous(), vec![1, 2])?;

    // Act
    let rendered = format!("{stream:?}");

    // Assert
    assert!(rendered.contains("capacity"));
    Ok(())
}
