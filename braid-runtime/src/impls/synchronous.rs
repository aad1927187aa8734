// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use braid_core::dispatcher::{DispatchTask, Dispatcher};
use braid_core::{Capacity, Result};

/// Runs every task inline, on the caller's thread.
///
/// Ordering holds for any single producer since nothing is queued. The backlog is purely
/// declarative: it only shapes the capacity of streams built on this dispatcher.
///
/// # Example
///
/// ```
/// use braid_core::Capacity;
/// use braid_core::dispatcher::{usable_capacity, Dispatcher};
/// use braid_runtime::impls::synchronous::SynchronousDispatcher;
///
/// let dispatcher = SynchronousDispatcher::bounded(4);
/// assert!(dispatcher.supports_ordering());
/// assert_eq!(usable_capacity(&dispatcher), Capacity::Bounded(3));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SynchronousDispatcher {
    backlog: Capacity,
}

impl SynchronousDispatcher {
    /// An inline dispatcher declaring no backlog limit.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            backlog: Capacity::Unbounded,
        }
    }

    /// An inline dispatcher declaring a backlog of `backlog` slots.
    #[must_use]
    pub const fn bounded(backlog: u64) -> Self {
        Self {
            backlog: Capacity::Bounded(backlog),
        }
    }
}

impl Dispatcher for SynchronousDispatcher {
    fn supports_ordering(&self) -> bool {
        true
    }

    fn backlog_size(&self) -> Capacity {
        self.backlog
    }

    fn dispatch(&self, task: DispatchTask) -> Result<()> {
        task();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "synchronous"
    }
}
