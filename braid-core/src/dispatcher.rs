// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Execution context contract.
//!
//! Combinators never own threads. They hand every unit of signal processing to a
//! [`Dispatcher`] and only rely on three things from it:
//!
//! - whether it is *ordering*: tasks submitted by one producer run in submission order and
//!   never concurrently;
//! - its declared backlog, from which stream capacities are derived;
//! - the `dispatch` primitive itself.
//!
//! # Example
//!
//! ```
//! use braid_core::dispatcher::{require_ordering, usable_capacity, Dispatcher, DispatchTask};
//! use braid_core::{Capacity, Result};
//!
//! struct Inline;
//!
//! impl Dispatcher for Inline {
//!     fn supports_ordering(&self) -> bool {
//!         true
//!     }
//!
//!     fn backlog_size(&self) -> Capacity {
//!         Capacity::Bounded(8)
//!     }
//!
//!     fn dispatch(&self, task: DispatchTask) -> Result<()> {
//!         task();
//!         Ok(())
//!     }
//! }
//!
//! assert!(require_ordering(&Inline, "merge").is_ok());
//! assert_eq!(usable_capacity(&Inline), Capacity::Bounded(7));
//! ```

use crate::{BraidError, Capacity, Result, Signal, Subscriber};
use std::sync::Arc;

/// A unit of work handed to a dispatcher.
pub type DispatchTask = Box<dyn FnOnce() + Send + 'static>;

/// Shared handle to an execution context.
pub type SharedDispatcher = Arc<dyn Dispatcher>;

/// Backlog slots set aside for the bookkeeping signals a combinator schedules itself
/// (drain and completion propagation).
pub const RESERVED_SLOTS: u64 = 1;

/// An execution context that serializes signal delivery.
pub trait Dispatcher: Send + Sync {
    /// `true` if tasks dispatched by a single producer run in submission order and never
    /// concurrently.
    fn supports_ordering(&self) -> bool;

    /// Declared buffering capacity. `Bounded(0)` and `Unbounded` both mean no limit.
    fn backlog_size(&self) -> Capacity;

    /// Enqueue a task.
    ///
    /// # Errors
    /// Returns [`BraidError::CapacityExceeded`] when the backlog is full and
    /// [`BraidError::Closed`] when the context was shut down.
    fn dispatch(&self, task: DispatchTask) -> Result<()>;

    /// Short name used in diagnostics.
    fn name(&self) -> &'static str {
        "dispatcher"
    }
}

/// Capacity a stream running on `dispatcher` may declare.
pub fn usable_capacity(dispatcher: &dyn Dispatcher) -> Capacity {
    dispatcher.backlog_size().usable(RESERVED_SLOTS)
}

/// Fails fast when a combinator that preserves relative ordering is attached to a
/// non-ordering context.
///
/// # Errors
/// Returns [`BraidError::Configuration`] naming the operator and the dispatcher.
pub fn require_ordering(dispatcher: &dyn Dispatcher, operator: &str) -> Result<()> {
    if dispatcher.supports_ordering() {
        Ok(())
    } else {
        warn!(
            "{} rejected: dispatcher '{}' does not support ordering",
            operator,
            dispatcher.name()
        );
        Err(BraidError::configuration(format!(
            "{operator} requires an ordering dispatcher, '{}' does not support event ordering",
            dispatcher.name()
        )))
    }
}

/// Enqueues `signal` for serialized delivery to `target`.
///
/// # Errors
/// Propagates the dispatcher's rejection.
pub fn deliver<T>(
    dispatcher: &dyn Dispatcher,
    signal: Signal<T>,
    target: Arc<dyn Subscriber<T>>,
) -> Result<()>
where
    T: Send + 'static,
{
    dispatcher.dispatch(Box::new(move || signal.deliver_to(target.as_ref())))
}
