// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use braid_core::{BraidError, Capacity, SharedDispatcher};
use braid_runtime::SynchronousDispatcher;
use braid_stream::merge::merge;
use braid_stream::sources::{defer, from_values};
use braid_stream::zip::zip_dynamic;
use braid_stream::BraidStream;
use braid_test_utils::{Event, NonOrderingDispatcher, TestSubscriber};
use std::sync::Arc;

fn synchronous() -> SharedDispatcher {
    Arc::new(SynchronousDispatcher::new())
}

fn sum(values: Vec<i32>) -> i32 {
    values.iter().sum()
}

#[test]
fn test_zip_dynamic_starts_once_outer_completes() -> anyhow::Result<()> {
    // Arrange
    let dispatcher = synchronous();
    let outer = defer::<BraidStream<i32>>(dispatcher.clone())?;
    let zipped = zip_dynamic(dispatcher.clone(), outer.stream(), None, sum)?;
    let subscriber = TestSubscriber::unbounded();
    zipped.subscribe(subscriber.clone());

    // Act
    outer.next(from_values(dispatcher.clone(), vec![1, 2])?)?;
    outer.next(from_values(dispatcher, vec![10, 20, 30])?)?;
    let before_outer_completes = subscriber.values();
    outer.complete();

    // Assert
    assert!(before_outer_completes.is_empty());
    assert_eq!(
        subscriber.events(),
        vec![Event::Next(11), Event::Next(22), Event::Complete]
    );
    Ok(())
}

#[test]
fn test_zip_dynamic_keeps_frames_when_delivery_reenters() -> anyhow::Result<()> {
    // Arrange
    let dispatcher = synchronous();
    let outer = defer::<BraidStream<i32>>(dispatcher.clone())?;
    let zipped = zip_dynamic(dispatcher.clone(), outer.stream(), None, |values: Vec<i32>| {
        (values[0], values[1])
    })?;
    let subscriber = TestSubscriber::unbounded();
    zipped.subscribe(subscriber.clone());
    let units = merge(
        dispatcher.clone(),
        vec![
            from_values(dispatcher.clone(), vec![1, 2])?,
            from_values(dispatcher.clone(), vec![3, 4, 5])?,
        ],
    )?;
    let tens = merge(
        dispatcher.clone(),
        vec![
            from_values(dispatcher.clone(), vec![10, 20])?,
            from_values(dispatcher, vec![30, 40, 50])?,
        ],
    )?;

    // Act
    outer.next(units)?;
    outer.next(tens)?;
    outer.complete();

    // Assert
    let frames = subscriber.values();
    let mut firsts: Vec<i32> = frames.iter().map(|(unit, _)| *unit).collect();
    firsts.sort_unstable();
    assert_eq!(frames.len(), 5);
    assert!(frames.iter().all(|(unit, ten)| *ten == unit * 10));
    assert_eq!(firsts, vec![1, 2, 3, 4, 5]);
    assert!(subscriber.is_completed());
    Ok(())
}

#[test]
fn test_zip_dynamic_starts_once_arity_is_reached() -> anyhow::Result<()> {
    // Arrange
    let dispatcher = synchronous();
    let outer = defer::<BraidStream<i32>>(dispatcher.clone())?;
    let zipped = zip_dynamic(dispatcher.clone(), outer.stream(), Some(2), sum)?;
    let subscriber = TestSubscriber::unbounded();
    zipped.subscribe(subscriber.clone());
    let left = defer::<i32>(dispatcher.clone())?;
    let right = defer::<i32>(dispatcher)?;

    // Act
    outer.next(left.stream())?;
    outer.next(right.stream())?;
    left.next(1)?;
    right.next(2)?;

    // Assert
    assert_eq!(subscriber.values(), vec![3]);
    assert!(!subscriber.is_terminated());
    Ok(())
}

#[test]
fn test_zip_dynamic_late_source_is_a_configuration_error() -> anyhow::Result<()> {
    // Arrange
    let dispatcher = synchronous();
    let outer = defer::<BraidStream<i32>>(dispatcher.clone())?;
    let zipped = zip_dynamic(dispatcher.clone(), outer.stream(), Some(2), sum)?;
    let subscriber = TestSubscriber::unbounded();
    zipped.subscribe(subscriber.clone());
    let first = defer::<i32>(dispatcher.clone())?;
    let second = defer::<i32>(dispatcher.clone())?;
    let late = defer::<i32>(dispatcher)?;
    outer.next(first.stream())?;
    outer.next(second.stream())?;

    // Act
    outer.next(late.stream())?;

    // Assert
    assert!(subscriber
        .error()
        .is_some_and(|error| error.is_configuration()));
    assert!(first.is_cancelled());
    assert!(second.is_cancelled());
    assert!(outer.is_cancelled());
    Ok(())
}

#[test]
fn test_zip_dynamic_empty_outer_completes() -> anyhow::Result<()> {
    // Arrange
    let dispatcher = synchronous();
    let outer = defer::<BraidStream<i32>>(dispatcher.clone())?;
    let zipped = zip_dynamic(dispatcher, outer.stream(), None, sum)?;
    let subscriber = TestSubscriber::unbounded();
    zipped.subscribe(subscriber.clone());

    // Act
    outer.complete();

    // Assert
    assert_eq!(subscriber.events(), vec![Event::Complete]);
    Ok(())
}

#[test]
fn test_zip_dynamic_outer_error_fails_output() -> anyhow::Result<()> {
    // Arrange
    let dispatcher = synchronous();
    let outer = defer::<BraidStream<i32>>(dispatcher.clone())?;
    let zipped = zip_dynamic(dispatcher.clone(), outer.stream(), None, sum)?;
    let subscriber = TestSubscriber::unbounded();
    zipped.subscribe(subscriber.clone());
    let inner = defer::<i32>(dispatcher)?;
    outer.next(inner.stream())?;

    // Act
    outer.error(BraidError::stream_error("outer failed"));

    // Assert
    assert!(inner.is_cancelled());
    assert!(subscriber.error().is_some());
    Ok(())
}

#[test]
fn test_zip_dynamic_rejects_zero_arity() -> anyhow::Result<()> {
    // Arrange
    let outer = defer::<BraidStream<i32>>(synchronous())?;

    // Act
    let result = zip_dynamic(synchronous(), outer.stream(), Some(0), sum);

    // Assert
    assert!(result.is_err_and(|error| error.is_configuration()));
    Ok(())
}

#[test]
fn test_zip_dynamic_requires_ordering_dispatcher() -> anyhow::Result<()> {
    // Arrange
    let outer = defer::<BraidStream<i32>>(synchronous())?;

    // Act
    let result = zip_dynamic(Arc::new(NonOrderingDispatcher::new()), outer.stream(), None, sum);

    // Assert
    assert!(result.is_err_and(|error| error.is_configuration()));
    Ok(())
}

#[test]
fn test_zip_dynamic_declares_dispatcher_capacity() -> anyhow::Result<()> {
    // Arrange
    let dispatcher: SharedDispatcher = Arc::new(SynchronousDispatcher::bounded(9));
    let outer = defer::<BraidStream<i32>>(dispatcher.clone())?;

    // Act
    let zipped = zip_dynamic(dispatcher, outer.stream(), None, sum)?;

    // Assert
    assert_eq!(zipped.capacity(), Capacity::Bounded(8));
    Ok(())
}
