// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use braid_core::dispatcher::DispatchTask;
use braid_core::{Capacity, Dispatcher, Result};

/// Runs tasks inline but reports no ordering support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonOrderingDispatcher {
    backlog: Capacity,
}

impl NonOrderingDispatcher {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            backlog: Capacity::Unbounded,
        }
    }

    #[must_use]
    pub const fn bounded(backlog: u64) -> Self {
        Self {
            backlog: Capacity::Bounded(backlog),
        }
    }
}

impl Dispatcher for NonOrderingDispatcher {
    fn supports_ordering(&self) -> bool {
        false
    }

    fn backlog_size(&self) -> Capacity {
        self.backlog
    }

    fn dispatch(&self, task: DispatchTask) -> Result<()> {
        task();
        Ok(())
    }

    fn name(&self) -> &'static str {
        "non-ordering"
    }
}
