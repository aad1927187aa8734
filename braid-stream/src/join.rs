// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Zip into collections.
//!
//! A join is a [zip](crate::zip) whose frames are emitted as a `Vec<T>`, the value at index
//! `i` coming from the `i`-th source. Completion, error and capacity rules are the zip's.

use crate::zip::{zip_all, zip_dynamic};
use crate::BraidStream;
use braid_core::{Result, SharedDispatcher};

/// Joins a fixed list of streams.
///
/// # Errors
/// Returns [`braid_core::BraidError::Configuration`] if the dispatcher does not support
/// ordering or if `sources` is empty.
///
/// # Example
///
/// ```
/// use braid_runtime::SynchronousDispatcher;
/// use braid_stream::join::join;
/// use braid_stream::sources::from_values;
/// use braid_core::SharedDispatcher;
/// use std::sync::Arc;
///
/// let dispatcher: SharedDispatcher = Arc::new(SynchronousDispatcher::new());
/// let rows = join(
///     dispatcher.clone(),
///     vec![
///         from_values(dispatcher.clone(), vec![1, 2]).unwrap(),
///         from_values(dispatcher.clone(), vec![3, 4]).unwrap(),
///     ],
/// )
/// .unwrap();
/// assert_eq!(rows.capacity(), braid_core::Capacity::Bounded(2));
/// ```
pub fn join<T>(
    dispatcher: SharedDispatcher,
    sources: Vec<BraidStream<T>>,
) -> Result<BraidStream<Vec<T>>>
where
    T: Send + 'static,
{
    zip_all(dispatcher, sources, |values| values)
}

/// Joins the streams emitted by `sources`, see [`zip_dynamic`].
///
/// # Errors
/// Returns [`braid_core::BraidError::Configuration`] if the dispatcher does not support
/// ordering or if `arity` is `Some(0)`.
pub fn join_dynamic<T>(
    dispatcher: SharedDispatcher,
    sources: BraidStream<BraidStream<T>>,
    arity: Option<usize>,
) -> Result<BraidStream<Vec<T>>>
where
    T: Send + 'static,
{
    zip_dynamic(dispatcher, sources, arity, |values| values)
}
