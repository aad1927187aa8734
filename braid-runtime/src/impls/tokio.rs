// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#[cfg(feature = "runtime-tokio")]
use braid_core::dispatcher::{DispatchTask, Dispatcher};
#[cfg(feature = "runtime-tokio")]
use braid_core::{BraidError, Capacity, Result};
#[cfg(feature = "runtime-tokio")]
use core::fmt;
#[cfg(feature = "runtime-tokio")]
use ::tokio::runtime::Handle;
#[cfg(feature = "runtime-tokio")]
use ::tokio::sync::mpsc;

/// Upper bound on the queue a bounded event loop allocates.
#[cfg(feature = "runtime-tokio")]
pub const MAX_EVENT_LOOP_BACKLOG: u64 = 1 << 20;

#[cfg(feature = "runtime-tokio")]
fn current_handle(kind: &str) -> Result<Handle> {
    Handle::try_current().map_err(|_| {
        warn!("{} dispatcher created outside of a tokio runtime", kind);
        BraidError::configuration(format!("{kind} dispatcher requires a running tokio runtime"))
    })
}

#[cfg(feature = "runtime-tokio")]
#[derive(Clone)]
enum LoopSender {
    Bounded(mpsc::Sender<DispatchTask>),
    Unbounded(mpsc::UnboundedSender<DispatchTask>),
}

/// An ordering dispatcher backed by one tokio task draining a FIFO queue.
///
/// Tasks run one at a time, in submission order, on whichever worker thread the loop
/// task is scheduled. A task dispatching into its own loop is queued, never run
/// reentrantly. With a bounded backlog, `dispatch` fails with
/// [`BraidError::CapacityExceeded`] instead of blocking when the queue is full.
///
/// # Example
///
/// ```
/// use braid_core::Capacity;
/// use braid_core::dispatcher::Dispatcher;
/// use braid_runtime::impls::tokio::EventLoopDispatcher;
///
/// # #[tokio::main]
/// # async fn main() -> braid_core::Result<()> {
/// let dispatcher = EventLoopDispatcher::new(Capacity::Bounded(64))?;
/// let (tx, rx) = tokio::sync::oneshot::channel();
/// dispatcher.dispatch(Box::new(move || {
///     let _ = tx.send(42);
/// }))?;
/// assert_eq!(rx.await.ok(), Some(42));
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "runtime-tokio")]
#[derive(Clone)]
pub struct EventLoopDispatcher {
    sender: LoopSender,
    backlog: Capacity,
}

#[cfg(feature = "runtime-tokio")]
impl EventLoopDispatcher {
    /// Spawns the loop on the current tokio runtime.
    ///
    /// # Errors
    /// Returns [`BraidError::Configuration`] outside of a tokio runtime.
    pub fn new(backlog: Capacity) -> Result<Self> {
        let handle = current_handle("event loop")?;
        let (sender, backlog) = match backlog {
            Capacity::Bounded(n) if n > 0 => {
                let slots = n.min(MAX_EVENT_LOOP_BACKLOG);
                let queue = usize::try_from(slots).unwrap_or(usize::MAX);
                let (tx, mut rx) = mpsc::channel::<DispatchTask>(queue);
                handle.spawn(async move {
                    while let Some(task) = rx.recv().await {
                        task();
                    }
                });
                (LoopSender::Bounded(tx), Capacity::Bounded(slots))
            }
            _ => {
                let (tx, mut rx) = mpsc::unbounded_channel::<DispatchTask>();
                handle.spawn(async move {
                    while let Some(task) = rx.recv().await {
                        task();
                    }
                });
                (LoopSender::Unbounded(tx), Capacity::Unbounded)
            }
        };
        debug!("event loop started with backlog {}", backlog);
        Ok(Self { sender, backlog })
    }
}

#[cfg(feature = "runtime-tokio")]
impl Dispatcher for EventLoopDispatcher {
    fn supports_ordering(&self) -> bool {
        true
    }

    fn backlog_size(&self) -> Capacity {
        self.backlog
    }

    fn dispatch(&self, task: DispatchTask) -> Result<()> {
        match &self.sender {
            LoopSender::Bounded(tx) => tx.try_send(task).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    warn!("event loop backlog of {} is full, rejecting task", self.backlog);
                    BraidError::capacity_exceeded(format!(
                        "event loop backlog of {} is full",
                        self.backlog
                    ))
                }
                mpsc::error::TrySendError::Closed(_) => {
                    debug!("event loop closed, rejecting task");
                    BraidError::Closed
                }
            }),
            LoopSender::Unbounded(tx) => tx.send(task).map_err(|_| BraidError::Closed),
        }
    }

    fn name(&self) -> &'static str {
        "event-loop"
    }
}

#[cfg(feature = "runtime-tokio")]
impl fmt::Debug for EventLoopDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoopDispatcher")
            .field("backlog", &self.backlog)
            .finish()
    }
}

/// A non-ordering dispatcher: every task becomes its own tokio task.
///
/// Useful for independent work; ordering-dependent combinators refuse it at construction.
#[cfg(feature = "runtime-tokio")]
#[derive(Clone)]
pub struct WorkPoolDispatcher {
    handle: Handle,
}

#[cfg(feature = "runtime-tokio")]
impl WorkPoolDispatcher {
    /// Binds to the current tokio runtime.
    ///
    /// # Errors
    /// Returns [`BraidError::Configuration`] outside of a tokio runtime.
    pub fn new() -> Result<Self> {
        Ok(Self {
            handle: current_handle("work pool")?,
        })
    }
}

#[cfg(feature = "runtime-tokio")]
impl Dispatcher for WorkPoolDispatcher {
    fn supports_ordering(&self) -> bool {
        false
    }

    fn backlog_size(&self) -> Capacity {
        Capacity::Unbounded
    }

    fn dispatch(&self, task: DispatchTask) -> Result<()> {
        self.handle.spawn(async move { task() });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "work-pool"
    }
}

#[cfg(feature = "runtime-tokio")]
impl fmt::Debug for WorkPoolDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkPoolDispatcher").finish()
    }
}
