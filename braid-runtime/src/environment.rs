// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Explicit environment passed to the factory surface.
//!
//! The environment answers two questions and nothing else: which dispatcher to use when a
//! call does not name one, and how to mint per-partition dispatchers for parallel
//! fan-out. It is an ordinary value; nothing about it is process-wide.

use crate::factory::DispatcherFactory;
use crate::impls::synchronous::SynchronousDispatcher;
use braid_core::{Capacity, SharedDispatcher};
use core::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Backlog used by the tokio-backed defaults.
pub const DEFAULT_BACKLOG: u64 = 2048;

/// Default dispatcher, dispatcher factory and parallel pool size.
#[derive(Clone)]
pub struct Environment {
    default_dispatcher: SharedDispatcher,
    dispatcher_factory: DispatcherFactory,
    pool_size: usize,
}

impl Environment {
    /// Synchronous dispatchers everywhere and one partition per available processor.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts from the synchronous defaults.
    #[must_use]
    pub fn builder() -> EnvironmentBuilder {
        EnvironmentBuilder {
            default_dispatcher: Arc::new(SynchronousDispatcher::new()),
            dispatcher_factory: DispatcherFactory::synchronous(Capacity::Unbounded),
            pool_size: processors(),
        }
    }

    /// Event-loop dispatchers with [`DEFAULT_BACKLOG`] slots, bound to the current runtime.
    ///
    /// # Errors
    /// Returns a configuration error outside of a tokio runtime.
    #[cfg(feature = "runtime-tokio")]
    pub fn tokio() -> braid_core::Result<Self> {
        let backlog = Capacity::Bounded(DEFAULT_BACKLOG);
        let default_dispatcher = crate::impls::tokio::EventLoopDispatcher::new(backlog)?;
        Ok(Self::builder()
            .default_dispatcher(Arc::new(default_dispatcher))
            .dispatcher_factory(DispatcherFactory::event_loop(backlog))
            .build())
    }

    /// Dispatcher used when a factory call names none.
    #[must_use]
    pub fn default_dispatcher(&self) -> SharedDispatcher {
        Arc::clone(&self.default_dispatcher)
    }

    /// Factory minting one dispatcher per parallel partition.
    #[must_use]
    pub fn dispatcher_factory(&self) -> &DispatcherFactory {
        &self.dispatcher_factory
    }

    /// Default number of parallel partitions.
    #[must_use]
    pub const fn pool_size(&self) -> usize {
        self.pool_size
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("default_dispatcher", &self.default_dispatcher.name())
            .field("pool_size", &self.pool_size)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Environment`].
///
/// # Example
///
/// ```
/// use braid_core::Capacity;
/// use braid_runtime::{DispatcherFactory, Environment};
///
/// let env = Environment::builder()
///     .pool_size(4)
///     .dispatcher_factory(DispatcherFactory::synchronous(Capacity::Bounded(2)))
///     .build();
/// assert_eq!(env.pool_size(), 4);
/// ```
#[must_use]
pub struct EnvironmentBuilder {
    default_dispatcher: SharedDispatcher,
    dispatcher_factory: DispatcherFactory,
    pool_size: usize,
}

impl EnvironmentBuilder {
    /// Dispatcher used when a factory call names none.
    pub fn default_dispatcher(mut self, dispatcher: SharedDispatcher) -> Self {
        self.default_dispatcher = dispatcher;
        self
    }

    /// Factory minting per-partition dispatchers.
    pub fn dispatcher_factory(mut self, factory: DispatcherFactory) -> Self {
        self.dispatcher_factory = factory;
        self
    }

    /// Default number of parallel partitions.
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Finishes the environment.
    pub fn build(self) -> Environment {
        Environment {
            default_dispatcher: self.default_dispatcher,
            dispatcher_factory: self.dispatcher_factory,
            pool_size: self.pool_size,
        }
    }
}

fn processors() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}
