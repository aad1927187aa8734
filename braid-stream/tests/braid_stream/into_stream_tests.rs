// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use braid_core::{BraidError, Capacity, SharedDispatcher, StreamItem};
use braid_runtime::{EventLoopDispatcher, SynchronousDispatcher};
use braid_stream::merge::{merge, merge_dynamic};
use braid_stream::sources::{defer, from_iter, from_values};
use braid_stream::zip::{zip, zip_all};
use braid_test_utils::{
    assert_no_element_emitted, assert_stream_ended, collect_values, unwrap_stream, unwrap_value,
};
use futures::StreamExt;
use std::sync::Arc;

fn synchronous() -> SharedDispatcher {
    Arc::new(SynchronousDispatcher::new())
}

#[tokio::test]
async fn test_into_stream_yields_values_then_ends() -> anyhow::Result<()> {
    // Arrange
    let stream = from_values(synchronous(), vec![1, 2, 3])?;

    // Act
    let values = collect_values(stream.into_stream(), 500).await?;

    // Assert
    assert_eq!(values, vec![1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn test_into_stream_pulls_long_sources_in_batches() -> anyhow::Result<()> {
    // Arrange
    let stream = from_iter(synchronous(), 0..1_000)?;

    // Act
    let values = collect_values(stream.into_stream(), 1_000).await?;

    // Assert
    assert_eq!(values, (0..1_000).collect::<Vec<_>>());
    Ok(())
}

#[tokio::test]
async fn test_into_stream_yields_error_item() -> anyhow::Result<()> {
    // Arrange
    let deferred = defer::<i32>(synchronous())?;
    let mut stream = deferred.stream().into_stream();

    // Act
    deferred.next(7)?;
    deferred.error(BraidError::stream_error("boom"));

    // Assert
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut stream, 500).await)), 7);
    assert!(matches!(
        unwrap_stream(&mut stream, 500).await,
        StreamItem::Error(BraidError::StreamProcessingError { .. })
    ));
    assert_stream_ended(&mut stream, 500).await;
    Ok(())
}

#[tokio::test]
async fn test_into_stream_waits_for_hot_values() -> anyhow::Result<()> {
    // Arrange
    let deferred = defer::<i32>(synchronous())?;
    let mut stream = deferred.stream().into_stream();

    // Act & Assert
    assert_no_element_emitted(&mut stream, 50).await;
    deferred.next(1)?;
    assert_eq!(unwrap_value(Some(unwrap_stream(&mut stream, 500).await)), 1);
    Ok(())
}

#[tokio::test]
async fn test_dropping_into_stream_cancels_the_source() -> anyhow::Result<()> {
    // Arrange
    let deferred = defer::<i32>(synchronous())?;
    let stream = deferred.stream().into_stream();

    // Act
    drop(stream);

    // Assert
    assert!(deferred.is_cancelled());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_merge_on_event_loop_delivers_every_value() -> anyhow::Result<()> {
    // Arrange
    let dispatcher: SharedDispatcher = Arc::new(EventLoopDispatcher::new(Capacity::Bounded(64))?);
    let left = from_iter(Arc::clone(&dispatcher), 0..100)?;
    let right = from_iter(Arc::clone(&dispatcher), 100..200)?;

    // Act
    let merged = merge(dispatcher, vec![left, right])?;
    let mut values = collect_values(merged.into_stream(), 2_000).await?;

    // Assert
    values.sort_unstable();
    assert_eq!(values, (0..200).collect::<Vec<_>>());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_zip_on_event_loop_pairs_in_order() -> anyhow::Result<()> {
    // Arrange
    let dispatcher: SharedDispatcher = Arc::new(EventLoopDispatcher::new(Capacity::Bounded(64))?);
    let numbers = from_iter(Arc::clone(&dispatcher), 0..50)?;
    let letters = from_iter(Arc::clone(&dispatcher), (0..40).map(|n| n * 2))?;

    // Act
    let zipped = zip(dispatcher, (numbers, letters), |(n, m)| n + m)?;
    let values: Vec<i32> = zipped
        .into_stream()
        .filter_map(|item| async move {
            match item {
                StreamItem::Value(value) => Some(value),
                StreamItem::Error(_) => None,
            }
        })
        .collect()
        .await;

    // Assert
    assert_eq!(values, (0..40).map(|n| n * 3).collect::<Vec<_>>());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_merge_stays_within_event_loop_backlog() -> anyhow::Result<()> {
    // Arrange
    let dispatcher: SharedDispatcher = Arc::new(EventLoopDispatcher::new(Capacity::Bounded(64))?);
    let left = from_iter(Arc::clone(&dispatcher), 0..500)?;
    let right = from_iter(Arc::clone(&dispatcher), 500..1_000)?;

    // Act
    let merged = merge(dispatcher, vec![left, right])?;
    let mut values = collect_values(merged.into_stream(), 5_000).await?;

    // Assert
    values.sort_unstable();
    assert_eq!(values, (0..1_000).collect::<Vec<_>>());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_merge_dynamic_stays_within_event_loop_backlog() -> anyhow::Result<()> {
    // Arrange
    let dispatcher: SharedDispatcher = Arc::new(EventLoopDispatcher::new(Capacity::Bounded(64))?);
    let sources = (0..4)
        .map(|n| from_iter(Arc::clone(&dispatcher), n * 300..(n + 1) * 300))
        .collect::<Result<Vec<_>, _>>()?;
    let outer = from_values(Arc::clone(&dispatcher), sources)?;

    // Act
    let merged = merge_dynamic(dispatcher, outer)?;
    let mut values = collect_values(merged.into_stream(), 5_000).await?;

    // Assert
    values.sort_unstable();
    assert_eq!(values, (0..1_200).collect::<Vec<_>>());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_zip_stays_within_event_loop_backlog() -> anyhow::Result<()> {
    // Arrange
    let dispatcher: SharedDispatcher = Arc::new(EventLoopDispatcher::new(Capacity::Bounded(64))?);
    let sources = (0..3)
        .map(|n| from_iter(Arc::clone(&dispatcher), (0..400).map(move |v| v * 10 + n)))
        .collect::<Result<Vec<_>, _>>()?;

    // Act
    let zipped = zip_all(dispatcher, sources, |values| values.iter().sum::<i32>())?;
    let values = collect_values(zipped.into_stream(), 5_000).await?;

    // Assert
    assert_eq!(values, (0..400).map(|v| v * 30 + 3).collect::<Vec<_>>());
    Ok(())
}
