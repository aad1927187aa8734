// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use braid_core::{BraidError, StreamItem};
use futures::stream::{Stream, StreamExt};
use std::time::Duration;
use tokio::time::{sleep, timeout};

pub async fn assert_no_element_emitted<S, T>(stream: &mut S, timeout_ms: u64)
where
    S: Stream<Item = T> + Unpin,
{
    tokio::select! {
        _state = stream.next() => {
            panic!(
                "Unexpected element emitted, expected no output."
            );
        }
        _ = sleep(Duration::from_millis(timeout_ms)) => {
        }
    }
}

/// Waits for the next item of `stream`.
///
/// # Panics
/// If nothing arrives within `timeout_ms`, or if the stream ends.
pub async fn unwrap_stream<S, T>(stream: &mut S, timeout_ms: u64) -> StreamItem<T>
where
    S: Stream<Item = StreamItem<T>> + Unpin,
{
    match timeout(Duration::from_millis(timeout_ms), stream.next()).await {
        Ok(Some(item)) => item,
        Ok(None) => panic!("Expected StreamItem but stream ended"),
        Err(_) => panic!("Timeout: No item received within {timeout_ms} ms"),
    }
}

/// # Panics
/// If `item` is `None` or an error.
pub fn unwrap_value<T>(item: Option<StreamItem<T>>) -> T {
    match item {
        Some(StreamItem::Value(value)) => value,
        Some(StreamItem::Error(error)) => panic!("Expected Value but got Error: {error}"),
        None => panic!("Expected Value but got None"),
    }
}

/// # Panics
/// If the stream yields an item or does not end within `timeout_ms`.
pub async fn assert_stream_ended<S, T>(stream: &mut S, timeout_ms: u64)
where
    S: Stream<Item = T> + Unpin,
{
    match timeout(Duration::from_millis(timeout_ms), stream.next()).await {
        Ok(None) => {}
        Ok(Some(_)) => panic!("Expected stream to end but it returned a value"),
        Err(_) => panic!("Timeout: Stream did not end within {timeout_ms} ms"),
    }
}

/// Drains `stream` until it ends, stopping at the first error.
///
/// # Errors
/// The first error the stream yields.
///
/// # Panics
/// If the stream does not end within `timeout_ms`.
pub async fn collect_values<S, T>(stream: S, timeout_ms: u64) -> Result<Vec<T>, BraidError>
where
    S: Stream<Item = StreamItem<T>>,
{
    let collect = async move {
        let mut stream = Box::pin(stream);
        let mut values = Vec::new();
        while let Some(item) = stream.next().await {
            values.push(item.into_result()?);
        }
        Ok(values)
    };
    match timeout(Duration::from_millis(timeout_ms), collect).await {
        Ok(result) => result,
        Err(_) => panic!("Timeout: Stream did not end within {timeout_ms} ms"),
    }
}
