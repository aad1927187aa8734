// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Factory surface: sources and combinators bound to an [`Environment`].
//!
//! Functions without a suffix run on the environment's default dispatcher. The `_on`
//! forms take the dispatcher explicitly and are otherwise identical.
//!
//! # Example
//!
//! ```
//! use braid_rx::prelude::*;
//! let env = Environment::builder()
//!     .pool_size(2)
//!     .dispatcher_factory(DispatcherFactory::synchronous(Capacity::Bounded(2)))
//!     .build();
//!
//! let upstream = streams::from_values(&env, vec![1, 2, 3, 4])?;
//! let fan_out = streams::parallel(&env, upstream)?;
//! assert_eq!(fan_out.pool_size(), 2);
//! # Ok::<(), BraidError>(())
//! ```

use braid_core::{Publisher, Result};
use braid_runtime::Environment;
use braid_stream::sources::Deferred;
use braid_stream::{BraidStream, Parallel, ZipSources};
use std::sync::Arc;

pub use braid_stream::join::{join as join_on, join_dynamic as join_dynamic_on};
pub use braid_stream::merge::{merge as merge_on, merge_dynamic as merge_dynamic_on};
pub use braid_stream::parallel::parallel as parallel_with;
pub use braid_stream::sources::{
    defer as defer_on, from_iter as from_iter_on, from_publisher as from_publisher_on,
    from_values as from_values_on, generate as generate_on,
};
pub use braid_stream::zip::{zip as zip_on, zip_all as zip_all_on, zip_dynamic as zip_dynamic_on};

/// An empty hot stream fed through the returned handle.
///
/// # Errors
/// Returns a configuration error if the default dispatcher does not support ordering.
pub fn defer<T: Send + 'static>(env: &Environment) -> Result<Deferred<T>> {
    defer_on(env.default_dispatcher())
}

/// Emits `values`, then completes.
///
/// # Errors
/// Returns a configuration error if the default dispatcher does not support ordering.
pub fn from_values<T>(env: &Environment, values: Vec<T>) -> Result<BraidStream<T>>
where
    T: Clone + Send + Sync + 'static,
{
    from_values_on(env.default_dispatcher(), values)
}

/// Emits every item of `iterable`, then completes.
///
/// # Errors
/// Returns a configuration error if the default dispatcher does not support ordering.
pub fn from_iter<I>(env: &Environment, iterable: I) -> Result<BraidStream<I::Item>>
where
    I: IntoIterator + Clone + Send + Sync + 'static,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    from_iter_on(env.default_dispatcher(), iterable)
}

/// Relays an arbitrary [`Publisher`].
///
/// # Errors
/// Returns a configuration error if the default dispatcher does not support ordering.
pub fn from_publisher<T, P>(env: &Environment, publisher: Arc<P>) -> Result<BraidStream<T>>
where
    T: Send + 'static,
    P: Publisher<T> + ?Sized,
{
    from_publisher_on(env.default_dispatcher(), publisher)
}

/// Calls `supplier` once per unit of demand until it returns `None`.
pub fn generate<T, F>(env: &Environment, supplier: F) -> BraidStream<T>
where
    T: Send + 'static,
    F: Fn() -> Option<T> + Send + Sync + 'static,
{
    generate_on(env.default_dispatcher(), supplier)
}

/// Merges `sources` in production order.
///
/// # Errors
/// Returns a configuration error if `sources` is empty or the default dispatcher does not
/// support ordering.
pub fn merge<T>(env: &Environment, sources: Vec<BraidStream<T>>) -> Result<BraidStream<T>>
where
    T: Send + 'static,
{
    merge_on(env.default_dispatcher(), sources)
}

/// Merges every stream emitted by `sources`.
///
/// # Errors
/// Returns a configuration error if the default dispatcher does not support ordering.
pub fn merge_dynamic<T: Send + 'static>(
    env: &Environment,
    sources: BraidStream<BraidStream<T>>,
) -> Result<BraidStream<T>> {
    merge_dynamic_on(env.default_dispatcher(), sources)
}

/// Zips a tuple of streams, passing each complete frame to `aggregator`.
///
/// # Errors
/// Returns a configuration error if the default dispatcher does not support ordering.
pub fn zip<S, V, F>(env: &Environment, sources: S, aggregator: F) -> Result<BraidStream<V>>
where
    S: ZipSources,
    V: Send + 'static,
    F: Fn(S::Output) -> V + Send + Sync + 'static,
{
    zip_on(env.default_dispatcher(), sources, aggregator)
}

/// Zips a homogeneous list of streams.
///
/// # Errors
/// Returns a configuration error if `sources` is empty or the default dispatcher does not
/// support ordering.
pub fn zip_all<T, V, F>(
    env: &Environment,
    sources: Vec<BraidStream<T>>,
    aggregator: F,
) -> Result<BraidStream<V>>
where
    T: Send + 'static,
    V: Send + 'static,
    F: Fn(Vec<T>) -> V + Send + Sync + 'static,
{
    zip_all_on(env.default_dispatcher(), sources, aggregator)
}

/// Zips every stream emitted by `sources`, once `arity` of them are known.
///
/// # Errors
/// Returns a configuration error if `arity` is zero or the default dispatcher does not
/// support ordering.
pub fn zip_dynamic<T, V, F>(
    env: &Environment,
    sources: BraidStream<BraidStream<T>>,
    arity: Option<usize>,
    aggregator: F,
) -> Result<BraidStream<V>>
where
    T: Send + 'static,
    V: Send + 'static,
    F: Fn(Vec<T>) -> V + Send + Sync + 'static,
{
    zip_dynamic_on(env.default_dispatcher(), sources, arity, aggregator)
}

/// Joins `sources` into ordered collections, one value per source.
///
/// # Errors
/// Returns a configuration error if `sources` is empty or the default dispatcher does not
/// support ordering.
pub fn join<T>(env: &Environment, sources: Vec<BraidStream<T>>) -> Result<BraidStream<Vec<T>>>
where
    T: Send + 'static,
{
    join_on(env.default_dispatcher(), sources)
}

/// Joins every stream emitted by `sources`.
///
/// # Errors
/// Returns a configuration error if `arity` is zero or the default dispatcher does not
/// support ordering.
pub fn join_dynamic<T: Send + 'static>(
    env: &Environment,
    sources: BraidStream<BraidStream<T>>,
    arity: Option<usize>,
) -> Result<BraidStream<Vec<T>>> {
    join_dynamic_on(env.default_dispatcher(), sources, arity)
}

/// Spreads `upstream` over [`Environment::pool_size`] partitions, each on a dispatcher
/// minted by the environment's factory.
///
/// # Errors
/// Returns a configuration error if the pool size is zero or the factory fails.
pub fn parallel<T>(env: &Environment, upstream: BraidStream<T>) -> Result<Parallel<T>>
where
    T: Send + 'static,
{
    parallel_with(upstream, env.pool_size(), env.dispatcher_factory())
}
