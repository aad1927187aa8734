// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Fan-out of one stream over a fixed pool of sub-streams.
//!
//! [`Parallel`] splits an upstream into `pool_size` sub-streams, each running on its own
//! dispatcher minted by a [`DispatcherFactory`]. Every value goes to exactly one
//! sub-stream.
//!
//! ## Characteristics
//!
//! - **Starve-then-rotate**: values go to the sub-stream under the cursor until it has
//!   taken as many values in a row as its capacity allows, then the cursor moves on. A
//!   capacity of 1 gives plain round-robin, a capacity of `C` gives batches of `C`.
//! - **Full sub-streams are skipped**: a sub-stream whose buffer is full loses its turn.
//! - **Backpressure**: upstream demand is the free room left across all sub-streams. When
//!   every sub-stream is full, upstream is not asked for anything until one of them
//!   delivers.
//! - **Placement order**: each sub-stream receives its values in the order they were
//!   placed on it, even when a parked value is released from another sub-stream's
//!   dispatcher while upstream delivers.
//! - **Broadcast terminals**: upstream completion and errors reach every sub-stream.
//! - **Cancellation**: a cancelled sub-stream no longer receives values; upstream is
//!   cancelled once every sub-stream is.
//!
//! A sub-stream running on an unbounded dispatcher never exhausts its turn, so it takes
//! every value while it is under the cursor.
//!
//! ## Example
//!
//! ```
//! use braid_runtime::DispatcherFactory;
//! use braid_stream::parallel::Parallel;
//! use braid_stream::sources::defer;
//! use braid_runtime::SynchronousDispatcher;
//! use braid_core::Capacity;
//! use std::sync::Arc;
//!
//! let upstream = defer::<u32>(Arc::new(SynchronousDispatcher::bounded(2))).unwrap();
//! let factory = DispatcherFactory::synchronous(Capacity::Bounded(3));
//! let parallel = Parallel::new(upstream.stream(), 4, &factory).unwrap();
//!
//! assert_eq!(parallel.pool_size(), 4);
//! assert_eq!(parallel.sub_streams()[0].capacity(), Capacity::Bounded(2));
//! ```

use crate::outlet::{Outlet, OutletHook};
use crate::sources::from_values;
use crate::upstream::{SourceSink, SourceSubscriber, Upstream};
use crate::BraidStream;
use braid_core::braid_mutex::Mutex;
use braid_core::dispatcher::usable_capacity;
use braid_core::{
    BraidError, Capacity, Dispatcher, Publisher, Result, SharedDispatcher, Signal, Subscriber,
    UNBOUNDED_DEMAND,
};
use braid_runtime::{DispatcherFactory, SynchronousDispatcher};
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

/// Splits `upstream` over `pool_size` sub-streams, see [`Parallel`].
///
/// # Errors
/// Returns [`BraidError::Configuration`] if `pool_size` is zero, and propagates any
/// error of `factory`.
pub fn parallel<T>(
    upstream: BraidStream<T>,
    pool_size: usize,
    factory: &DispatcherFactory,
) -> Result<Parallel<T>>
where
    T: Send + 'static,
{
    Parallel::new(upstream, pool_size, factory)
}

/// A stream split over a pool of independently dispatched sub-streams.
pub struct Parallel<T> {
    sub_streams: Vec<BraidStream<T>>,
    streams: BraidStream<BraidStream<T>>,
}

impl<T: Send + 'static> Parallel<T> {
    /// Subscribes to `upstream` and creates one sub-stream per dispatcher minted by
    /// `factory`.
    ///
    /// Each sub-stream declares the usable capacity of its dispatcher. Upstream is asked
    /// for values right away; they wait in the sub-streams until subscribed.
    ///
    /// # Errors
    /// Returns [`BraidError::Configuration`] if `pool_size` is zero, and propagates any
    /// error of `factory`.
    pub fn new(
        upstream: BraidStream<T>,
        pool_size: usize,
        factory: &DispatcherFactory,
    ) -> Result<Self> {
        if pool_size == 0 {
            warn!("parallel rejected: pool size must be positive");
            return Err(BraidError::configuration("parallel pool size must be positive"));
        }
        let dispatchers = (0..pool_size)
            .map(|_| factory.create())
            .collect::<Result<Vec<_>>>()?;

        let core = ParallelCore::new(&dispatchers);
        let sub_streams: Vec<_> = core
            .outlets
            .iter()
            .zip(dispatchers)
            .map(|(outlet, dispatcher)| {
                BraidStream::new(Arc::new(outlet.clone()) as Arc<dyn Publisher<T>>, dispatcher)
            })
            .collect();

        upstream.subscribe(Arc::new(SourceSubscriber::new(
            Arc::clone(&core),
            0,
            Arc::clone(&core.upstream),
        )));
        core.replenish();

        let streams = from_values(Arc::clone(&core.inbound), sub_streams.clone())?;
        Ok(Self {
            sub_streams,
            streams,
        })
    }

    /// Number of sub-streams.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.sub_streams.len()
    }

    /// The sub-streams, in partition order.
    #[must_use]
    pub fn sub_streams(&self) -> &[BraidStream<T>] {
        &self.sub_streams
    }

    #[must_use]
    pub fn into_sub_streams(self) -> Vec<BraidStream<T>> {
        self.sub_streams
    }

    /// The sub-streams as a stream, emitted in partition order and then completed.
    #[must_use]
    pub fn streams(&self) -> BraidStream<BraidStream<T>> {
        self.streams.clone()
    }
}

impl<T: Send + 'static> Publisher<BraidStream<T>> for Parallel<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<BraidStream<T>>>) {
        self.streams().subscribe(subscriber);
    }

    fn capacity(&self) -> Capacity {
        Capacity::Bounded(u64::try_from(self.sub_streams.len()).unwrap_or(u64::MAX))
    }
}

struct Partition<T> {
    limit: u64,
    buffered: u64,
    cancelled: bool,
    /// Placed on this partition, not yet pushed to its outlet.
    pending: VecDeque<T>,
    pushing: bool,
    /// Complete the outlet once `pending` is flushed.
    closing: bool,
}

impl<T> Partition<T> {
    const fn has_room(&self) -> bool {
        !self.cancelled && self.buffered < self.limit
    }
}

struct ParallelState<T> {
    partitions: Vec<Partition<T>>,
    cursor: usize,
    turn: u64,
    outstanding: u64,
    parked: VecDeque<T>,
    completion_pending: bool,
    terminated: bool,
}

impl<T> ParallelState<T> {
    /// Picks the partition the next value goes to, moving the cursor along.
    fn place(&mut self) -> Option<usize> {
        let count = self.partitions.len();
        for _ in 0..count {
            let index = self.cursor;
            let partition = &mut self.partitions[index];
            if partition.has_room() && self.turn < partition.limit {
                partition.buffered += 1;
                self.turn += 1;
                if self.turn >= partition.limit {
                    self.rotate();
                }
                return Some(index);
            }
            self.rotate();
        }
        None
    }

    fn rotate(&mut self) {
        self.cursor = (self.cursor + 1) % self.partitions.len();
        self.turn = 0;
    }

    /// Places a value on partition `index`.
    fn assign(&mut self, index: usize, value: T) {
        if let Some(partition) = self.partitions.get_mut(index) {
            partition.pending.push_back(value);
        }
    }

    /// Drops every value not yet handed to a sub-stream.
    fn discard(&mut self) {
        self.parked.clear();
        for partition in &mut self.partitions {
            partition.pending.clear();
        }
    }

    /// Demand upstream may still be asked for.
    fn missing_demand(&self) -> u64 {
        if self.terminated || self.outstanding == UNBOUNDED_DEMAND {
            return 0;
        }
        let room = self
            .partitions
            .iter()
            .filter(|partition| !partition.cancelled)
            .fold(0u64, |room, partition| {
                room.saturating_add(partition.limit - partition.buffered.min(partition.limit))
            });
        if room == UNBOUNDED_DEMAND {
            return UNBOUNDED_DEMAND;
        }
        let parked = u64::try_from(self.parked.len()).unwrap_or(u64::MAX);
        room.saturating_sub(self.outstanding).saturating_sub(parked)
    }
}

struct ParallelCore<T> {
    inbound: SharedDispatcher,
    upstream: Arc<Upstream>,
    outlets: Vec<Outlet<T>>,
    // Keeps the outlet hooks alive, outlets only hold weak references.
    _hooks: Vec<Arc<PartitionHook<T>>>,
    state: Mutex<ParallelState<T>>,
}

impl<T: Send + 'static> ParallelCore<T> {
    fn new(dispatchers: &[SharedDispatcher]) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<Self>| {
            let mut outlets = Vec::with_capacity(dispatchers.len());
            let mut hooks = Vec::with_capacity(dispatchers.len());
            let mut partitions = Vec::with_capacity(dispatchers.len());

            for (index, dispatcher) in dispatchers.iter().enumerate() {
                let capacity = usable_capacity(dispatcher.as_ref());
                let hook = Arc::new(PartitionHook {
                    core: me.clone(),
                    index,
                });
                let weak_hook: Weak<dyn OutletHook> = Arc::downgrade(&hook) as Weak<PartitionHook<T>>;
                outlets.push(Outlet::new(
                    Arc::clone(dispatcher),
                    capacity,
                    capacity,
                    Some(weak_hook),
                ));
                hooks.push(hook);
                partitions.push(Partition {
                    limit: capacity.limit(),
                    buffered: 0,
                    cancelled: false,
                    pending: VecDeque::new(),
                    pushing: false,
                    closing: false,
                });
            }

            Self {
                inbound: Arc::new(SynchronousDispatcher::new()),
                upstream: Arc::new(Upstream::new()),
                outlets,
                _hooks: hooks,
                state: Mutex::new(ParallelState {
                    partitions,
                    cursor: 0,
                    turn: 0,
                    outstanding: 0,
                    parked: VecDeque::new(),
                    completion_pending: false,
                    terminated: false,
                }),
            }
        })
    }

    /// Asks upstream for as many values as the sub-streams can still take.
    fn replenish(&self) {
        let missing = {
            let mut state = self.state.lock();
            let missing = state.missing_demand();
            if missing > 0 {
                state.outstanding = if missing == UNBOUNDED_DEMAND {
                    UNBOUNDED_DEMAND
                } else {
                    state.outstanding.saturating_add(missing)
                };
            }
            missing
        };
        if missing > 0 {
            self.upstream.request(missing);
        }
    }

    fn on_value(&self, value: T) {
        let index = {
            let mut state = self.state.lock();
            if state.terminated {
                return;
            }
            if state.outstanding != UNBOUNDED_DEMAND {
                state.outstanding = state.outstanding.saturating_sub(1);
            }
            let placed = if state.parked.is_empty() {
                state.place()
            } else {
                None
            };
            match placed {
                Some(index) => {
                    state.assign(index, value);
                    index
                }
                None => {
                    debug!("parallel: no sub-stream has room, parking a value");
                    state.parked.push_back(value);
                    return;
                }
            }
        };
        self.flush(index);
    }

    /// Pushes the values placed on partition `index` to its outlet, in placement order.
    ///
    /// One caller pushes to a partition at a time. A caller finding the partition busy
    /// returns at once, the pushing caller picks up what it placed.
    fn flush(&self, index: usize) {
        {
            let mut state = self.state.lock();
            let Some(partition) = state.partitions.get_mut(index) else {
                return;
            };
            if partition.pushing {
                return;
            }
            partition.pushing = true;
        }

        loop {
            let next = {
                let mut state = self.state.lock();
                let Some(partition) = state.partitions.get_mut(index) else {
                    return;
                };
                match partition.pending.pop_front() {
                    Some(value) => Ok(value),
                    None => {
                        partition.pushing = false;
                        Err(core::mem::take(&mut partition.closing))
                    }
                }
            };

            match next {
                Ok(value) => {
                    if let Err(error) = self.outlets[index].push(value, 0) {
                        debug!("parallel: sub-stream {} refused a value: {}", index, error);
                    }
                }
                Err(closing) => {
                    if closing {
                        self.outlets[index].complete();
                    }
                    return;
                }
            }
        }
    }

    fn on_delivered(&self, index: usize) {
        let (unparked, complete) = {
            let mut state = self.state.lock();
            if let Some(partition) = state.partitions.get_mut(index) {
                partition.buffered = partition.buffered.saturating_sub(1);
            }
            if state.terminated {
                return;
            }
            let mut unparked = Vec::new();
            while !state.parked.is_empty() {
                let Some(target) = state.place() else {
                    break;
                };
                if let Some(value) = state.parked.pop_front() {
                    state.assign(target, value);
                    if !unparked.contains(&target) {
                        unparked.push(target);
                    }
                }
            }
            let complete = state.completion_pending && state.parked.is_empty();
            if complete {
                state.terminated = true;
            }
            (unparked, complete)
        };

        for target in unparked {
            self.flush(target);
        }
        if complete {
            self.complete_all();
        } else {
            self.replenish();
        }
    }

    fn on_complete(&self) {
        let complete = {
            let mut state = self.state.lock();
            if state.terminated {
                return;
            }
            if !state.parked.is_empty() {
                state.completion_pending = true;
                false
            } else {
                state.terminated = true;
                true
            }
        };
        if complete {
            self.complete_all();
        }
    }

    /// Completes every sub-stream, after the values still being pushed to it.
    fn complete_all(&self) {
        debug!("parallel completed, completing {} sub-stream(s)", self.outlets.len());
        for (index, outlet) in self.outlets.iter().enumerate() {
            let deferred = {
                let mut state = self.state.lock();
                match state.partitions.get_mut(index) {
                    Some(partition) if partition.pushing || !partition.pending.is_empty() => {
                        partition.closing = true;
                        true
                    }
                    _ => false,
                }
            };
            if !deferred {
                outlet.complete();
            }
        }
    }

    fn fail(&self, error: BraidError) {
        {
            let mut state = self.state.lock();
            if state.terminated {
                return;
            }
            state.terminated = true;
            state.discard();
        }
        warn!("parallel failed, erroring every sub-stream: {}", error);
        self.upstream.cancel();
        for outlet in &self.outlets {
            outlet.error(error.clone());
        }
    }

    fn on_partition_cancelled(&self, index: usize) {
        let all_cancelled = {
            let mut state = self.state.lock();
            if let Some(partition) = state.partitions.get_mut(index) {
                partition.cancelled = true;
            }
            let all_cancelled = state.partitions.iter().all(|partition| partition.cancelled);
            if all_cancelled {
                state.terminated = true;
                state.discard();
            }
            all_cancelled
        };
        if all_cancelled {
            debug!("parallel: every sub-stream cancelled, cancelling upstream");
            self.upstream.cancel();
        }
    }
}

impl<T: Send + 'static> SourceSink<T> for ParallelCore<T> {
    fn dispatcher(&self) -> &dyn Dispatcher {
        self.inbound.as_ref()
    }

    fn on_source_signal(&self, _id: u64, signal: Signal<T>) {
        match signal {
            Signal::Next(value) => self.on_value(value),
            Signal::Error(error) => {
                {
                    let mut state = self.state.lock();
                    if state.terminated {
                        return;
                    }
                    state.terminated = true;
                    state.discard();
                }
                warn!("parallel upstream failed: {}", error);
                for outlet in &self.outlets {
                    outlet.error(error.clone());
                }
            }
            Signal::Complete => self.on_complete(),
        }
    }

    fn on_dispatch_failure(&self, error: BraidError) {
        self.fail(error);
    }
}

/// Links one sub-stream's outlet back to the shared core.
struct PartitionHook<T> {
    core: Weak<ParallelCore<T>>,
    index: usize,
}

impl<T: Send + 'static> OutletHook for PartitionHook<T> {
    fn on_request(&self, _n: u64) {}

    fn on_cancel(&self) {
        if let Some(core) = self.core.upgrade() {
            core.on_partition_cancelled(self.index);
        }
    }

    fn on_delivered(&self, _origin: u64) {
        if let Some(core) = self.core.upgrade() {
            core.on_delivered(self.index);
        }
    }
}
