// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::outlet::Outlet;
use crate::BraidStream;
use braid_core::dispatcher::{require_ordering, usable_capacity};
use braid_core::{BraidError, Capacity, Publisher, Result, SharedDispatcher};
use std::sync::Arc;

/// A hot stream fed by hand.
///
/// Values pushed before a subscriber arrives, or faster than it requests them, are
/// buffered up to the usable capacity of the dispatcher. Pushing past that is a
/// capacity violation: the push fails and the stream errors.
///
/// # Example
///
/// ```
/// use braid_runtime::SynchronousDispatcher;
/// use braid_stream::sources::defer;
/// use std::sync::Arc;
///
/// let deferred = defer::<u32>(Arc::new(SynchronousDispatcher::bounded(3))).unwrap();
/// assert!(deferred.next(1).is_ok());
/// assert!(deferred.next(2).is_ok());
/// assert!(deferred.next(3).unwrap_err().is_capacity_violation());
/// ```
pub struct Deferred<T> {
    outlet: Outlet<T>,
    stream: BraidStream<T>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            outlet: self.outlet.clone(),
            stream: self.stream.clone(),
        }
    }
}

impl<T: Send + 'static> Deferred<T> {
    /// Creates an empty hot stream on `dispatcher`.
    ///
    /// # Errors
    /// Returns [`BraidError::Configuration`] if the dispatcher does not support ordering.
    pub fn new(dispatcher: SharedDispatcher) -> Result<Self> {
        require_ordering(dispatcher.as_ref(), "defer")?;
        let capacity = usable_capacity(dispatcher.as_ref());
        let outlet = Outlet::new(Arc::clone(&dispatcher), capacity, capacity, None);
        let stream = BraidStream::new(Arc::new(outlet.clone()), dispatcher);
        Ok(Self { outlet, stream })
    }

    /// Pushes a value.
    ///
    /// # Errors
    /// [`BraidError::Closed`] after `complete` or `error`, and
    /// [`BraidError::CapacityExceeded`] when the buffer is full.
    pub fn next(&self, value: T) -> Result<()> {
        self.outlet.push(value, 0)
    }

    /// Terminates the stream with `error`, dropping values not yet delivered.
    pub fn error(&self, error: BraidError) {
        self.outlet.error(error);
    }

    /// Completes the stream after the buffered values are delivered.
    pub fn complete(&self) {
        self.outlet.complete();
    }

    /// The stream fed by this handle.
    pub fn stream(&self) -> BraidStream<T> {
        self.stream.clone()
    }

    /// Declared capacity.
    pub fn capacity(&self) -> Capacity {
        self.outlet.capacity()
    }

    /// Returns `true` once a terminal signal was pushed.
    pub fn is_closed(&self) -> bool {
        self.outlet.state().is_terminated()
    }

    /// Returns `true` once the subscriber cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.outlet.is_cancelled()
    }
}

/// Creates a [`Deferred`] hot stream on `dispatcher`.
///
/// # Errors
/// Returns [`BraidError::Configuration`] if the dispatcher does not support ordering.
pub fn defer<T: Send + 'static>(dispatcher: SharedDispatcher) -> Result<Deferred<T>> {
    Deferred::new(dispatcher)
}
