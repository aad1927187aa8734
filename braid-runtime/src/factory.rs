// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::impls::synchronous::SynchronousDispatcher;
use braid_core::{Capacity, Result, SharedDispatcher};
use core::fmt;
use std::sync::Arc;

type MintFn = dyn Fn() -> Result<SharedDispatcher> + Send + Sync;

/// Mints independent execution contexts, one per call.
///
/// Parallel fan-out asks its factory for one dispatcher per partition, so each partition
/// can be scheduled independently of the others.
///
/// # Example
///
/// ```
/// use braid_core::Capacity;
/// use braid_runtime::DispatcherFactory;
///
/// let factory = DispatcherFactory::synchronous(Capacity::Bounded(2));
/// let first = factory.create().unwrap();
/// let second = factory.create().unwrap();
/// assert!(!std::sync::Arc::ptr_eq(&first, &second));
/// ```
#[derive(Clone)]
pub struct DispatcherFactory {
    mint: Arc<MintFn>,
}

impl DispatcherFactory {
    /// Wraps a closure producing a fresh dispatcher on each call.
    pub fn new<F>(mint: F) -> Self
    where
        F: Fn() -> Result<SharedDispatcher> + Send + Sync + 'static,
    {
        Self {
            mint: Arc::new(mint),
        }
    }

    /// Inline dispatchers declaring `backlog`.
    #[must_use]
    pub fn synchronous(backlog: Capacity) -> Self {
        Self::new(move || {
            let dispatcher = match backlog {
                Capacity::Bounded(n) => SynchronousDispatcher::bounded(n),
                Capacity::Unbounded => SynchronousDispatcher::new(),
            };
            Ok(Arc::new(dispatcher) as SharedDispatcher)
        })
    }

    /// One tokio event loop per call, each with `backlog` slots.
    #[cfg(feature = "runtime-tokio")]
    #[must_use]
    pub fn event_loop(backlog: Capacity) -> Self {
        Self::new(move || {
            crate::impls::tokio::EventLoopDispatcher::new(backlog)
                .map(|dispatcher| Arc::new(dispatcher) as SharedDispatcher)
        })
    }

    /// Produces the next dispatcher.
    ///
    /// # Errors
    /// Propagates the construction error of the underlying dispatcher.
    pub fn create(&self) -> Result<SharedDispatcher> {
        (self.mint)().inspect_err(|error| warn!("dispatcher factory failed: {}", error))
    }
}

impl fmt::Debug for DispatcherFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherFactory").finish_non_exhaustive()
    }
}
