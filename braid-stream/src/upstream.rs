// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The consumer side every combinator keeps towards each of its sources.

use braid_core::braid_mutex::Mutex;
use braid_core::dispatcher::usable_capacity;
use braid_core::{
    add_demand, consume_demand, BraidError, Capacity, Dispatcher, Result, Signal, Subscriber,
    Subscription, UNBOUNDED_DEMAND,
};
use core::marker::PhantomData;
use std::sync::Arc;

/// Demand a consumer issues towards a source that declares no capacity.
pub const DEFAULT_PREFETCH: u64 = 256;

/// Initial demand a consumer issues towards a source declaring `capacity`.
pub(crate) const fn prefetch(capacity: Capacity) -> u64 {
    match capacity {
        Capacity::Bounded(0) => 1,
        Capacity::Bounded(n) => n,
        Capacity::Unbounded => DEFAULT_PREFETCH,
    }
}

/// Dispatcher slots a fan-in stage keeps for its own delivery and for its stream of sources.
const STAGE_OVERHEAD: u64 = 2;

/// Share of a bounded dispatcher backlog handed out as prefetch to the sources of a
/// fan-in stage.
///
/// Every value a source was asked for may sit in the stage's dispatcher queue at once,
/// together with one task of the source itself. On a bounded dispatcher the grants of all
/// live sources, plus one slot each, stay within the usable backlog minus the stage's own
/// slots. A known number of sources splits it evenly, otherwise each new source takes
/// half of what is left. A source is always granted at least one.
#[derive(Debug)]
pub(crate) struct PrefetchBudget {
    total: Option<u64>,
    share: Option<u64>,
    granted: u64,
}

impl PrefetchBudget {
    /// Budget on `dispatcher` for `sources` sources, or an unknown number of them.
    pub(crate) fn new(dispatcher: &dyn Dispatcher, sources: Option<usize>) -> Self {
        let total = match usable_capacity(dispatcher) {
            Capacity::Bounded(n) => Some(n.saturating_sub(STAGE_OVERHEAD)),
            Capacity::Unbounded => None,
        };
        let share = match (total, sources) {
            (Some(total), Some(sources)) if sources > 0 => {
                let sources = u64::try_from(sources).unwrap_or(u64::MAX);
                Some((total / sources).saturating_sub(1).max(1))
            }
            _ => None,
        };
        Self {
            total,
            share,
            granted: 0,
        }
    }

    /// Prefetch for a new source declaring `capacity`.
    pub(crate) fn grant(&mut self, capacity: Capacity) -> u64 {
        let wanted = prefetch(capacity);
        let Some(total) = self.total else {
            return wanted;
        };
        let left = total.saturating_sub(self.granted).saturating_sub(1);
        let grant = wanted.min(self.share.unwrap_or(left / 2)).min(left).max(1);
        self.granted = self.granted.saturating_add(grant + 1);
        grant
    }

    /// Returns the grant of a source that terminated.
    pub(crate) fn release(&mut self, grant: u64) {
        if self.total.is_some() {
            self.granted = self.granted.saturating_sub(grant.saturating_add(1));
        }
    }
}

#[derive(Default)]
struct UpstreamState {
    subscription: Option<Arc<dyn Subscription>>,
    pending: u64,
    outstanding: u64,
    cancelled: bool,
}

/// Handle on one upstream subscription.
///
/// Requests and cancellation may be issued before the source calls `on_subscribe`; they
/// are replayed once the subscription arrives. The handle also counts outstanding demand,
/// so that a source emitting more than it was asked for is caught.
#[derive(Default)]
pub(crate) struct Upstream {
    state: Mutex<UpstreamState>,
}

impl Upstream {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn attach(&self, subscription: Arc<dyn Subscription>) {
        let pending = {
            let mut state = self.state.lock();
            if state.cancelled || state.subscription.is_some() {
                None
            } else {
                state.subscription = Some(Arc::clone(&subscription));
                Some(core::mem::take(&mut state.pending))
            }
        };

        match pending {
            None => subscription.cancel(),
            Some(0) => {}
            Some(n) => subscription.request(n),
        }
    }

    pub(crate) fn request(&self, n: u64) {
        if n == 0 {
            return;
        }
        let subscription = {
            let mut state = self.state.lock();
            if state.cancelled {
                return;
            }
            state.outstanding = add_demand(state.outstanding, n);
            match &state.subscription {
                Some(subscription) => Arc::clone(subscription),
                None => {
                    state.pending = add_demand(state.pending, n);
                    return;
                }
            }
        };
        subscription.request(n);
    }

    pub(crate) fn cancel(&self) {
        let subscription = {
            let mut state = self.state.lock();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            state.pending = 0;
            state.subscription.take()
        };
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
    }

    /// Accounts for one value received from the source.
    pub(crate) fn receive(&self) -> Result<()> {
        let mut state = self.state.lock();
        match state.outstanding {
            UNBOUNDED_DEMAND => Ok(()),
            0 if !state.cancelled => Err(BraidError::capacity_exceeded(
                "source emitted a value without outstanding demand",
            )),
            _ => {
                state.outstanding = consume_demand(state.outstanding);
                Ok(())
            }
        }
    }
}

/// Stage consuming the signals of its sources on its own dispatcher.
pub(crate) trait SourceSink<T>: Send + Sync + 'static {
    fn dispatcher(&self) -> &dyn Dispatcher;

    /// Handles one signal from the source registered under `id`, on the stage's dispatcher.
    fn on_source_signal(&self, id: u64, signal: Signal<T>);

    /// The stage's dispatcher refused a signal.
    fn on_dispatch_failure(&self, error: BraidError);
}

/// Subscriber registered with a source on behalf of a [`SourceSink`].
///
/// Every signal is re-dispatched onto the sink's dispatcher, tagged with the id the sink
/// registered the source under.
pub(crate) struct SourceSubscriber<T, S> {
    sink: Arc<S>,
    id: u64,
    upstream: Arc<Upstream>,
    _marker: PhantomData<fn(T)>,
}

impl<T, S> SourceSubscriber<T, S>
where
    T: Send + 'static,
    S: SourceSink<T>,
{
    pub(crate) fn new(sink: Arc<S>, id: u64, upstream: Arc<Upstream>) -> Self {
        Self {
            sink,
            id,
            upstream,
            _marker: PhantomData,
        }
    }

    fn forward(&self, signal: Signal<T>) {
        let sink = Arc::clone(&self.sink);
        let id = self.id;
        let task = Box::new(move || sink.on_source_signal(id, signal));
        if let Err(error) = self.sink.dispatcher().dispatch(task) {
            self.sink.on_dispatch_failure(error);
        }
    }
}

impl<T, S> Subscriber<T> for SourceSubscriber<T, S>
where
    T: Send + 'static,
    S: SourceSink<T>,
{
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.upstream.attach(subscription);
    }

    fn on_next(&self, value: T) {
        match self.upstream.receive() {
            Ok(()) => self.forward(Signal::Next(value)),
            Err(error) => {
                warn!("source {} overflowed: {}", self.id, error);
                self.upstream.cancel();
                self.forward(Signal::Error(error));
            }
        }
    }

    fn on_error(&self, error: BraidError) {
        self.forward(Signal::Error(error));
    }

    fn on_complete(&self) {
        self.forward(Signal::Complete);
    }
}
