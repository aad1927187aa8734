// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The output side of every stage.
//!
//! An [`Outlet`] buffers the values a stage produces, serves them to its single downstream
//! subscriber as demand allows, and delivers the terminal signal once the buffer has
//! drained (errors skip the buffer). All deliveries happen in one drain loop scheduled on
//! the stage's dispatcher, so the subscriber is never called concurrently or reentrantly.

use braid_core::braid_mutex::Mutex;
use braid_core::{
    add_demand, consume_demand, reject, BraidError, Capacity, Publisher, Result,
    SharedDispatcher, StreamState, Subscriber, Subscription,
};
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

/// Callbacks from an outlet back into the stage feeding it.
///
/// Called without any outlet lock held.
pub(crate) trait OutletHook: Send + Sync {
    /// The downstream subscriber asked for `n` more values.
    fn on_request(&self, n: u64);

    /// The downstream subscriber cancelled, or the outlet failed on its own.
    fn on_cancel(&self);

    /// A value pushed with `origin` was handed to the downstream subscriber.
    fn on_delivered(&self, _origin: u64) {}
}

struct OutletState<T> {
    subscriber: Option<Arc<dyn Subscriber<T>>>,
    subscribed: bool,
    demand: u64,
    queue: VecDeque<(T, u64)>,
    status: StreamState,
    error: Option<BraidError>,
    finished: bool,
    cancelled: bool,
    draining: bool,
    missed: bool,
}

enum Step<T> {
    Next(Arc<dyn Subscriber<T>>, T, u64),
    Error(Arc<dyn Subscriber<T>>, BraidError),
    Complete(Arc<dyn Subscriber<T>>),
}

struct OutletShared<T> {
    dispatcher: SharedDispatcher,
    declared: Capacity,
    limit: Capacity,
    hook: Option<Weak<dyn OutletHook>>,
    state: Mutex<OutletState<T>>,
}

/// Unicast, buffered output of a stage.
pub(crate) struct Outlet<T> {
    shared: Arc<OutletShared<T>>,
}

impl<T> Clone for Outlet<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> Outlet<T> {
    /// An outlet declaring `declared` downstream and buffering at most `limit` values.
    pub(crate) fn new(
        dispatcher: SharedDispatcher,
        declared: Capacity,
        limit: Capacity,
        hook: Option<Weak<dyn OutletHook>>,
    ) -> Self {
        Self {
            shared: Arc::new(OutletShared {
                dispatcher,
                declared,
                limit,
                hook,
                state: Mutex::new(OutletState {
                    subscriber: None,
                    subscribed: false,
                    demand: 0,
                    queue: VecDeque::new(),
                    status: StreamState::Active,
                    error: None,
                    finished: false,
                    cancelled: false,
                    draining: false,
                    missed: false,
                }),
            }),
        }
    }

    /// Queues a value for delivery.
    ///
    /// Values pushed after cancellation are dropped silently.
    ///
    /// # Errors
    /// [`BraidError::Closed`] once a terminal signal was accepted, and
    /// [`BraidError::CapacityExceeded`] when the buffer is full. An overflow also errors
    /// the outlet and cancels the stage feeding it.
    pub(crate) fn push(&self, value: T, origin: u64) -> Result<()> {
        let overflow = {
            let mut state = self.shared.state.lock();
            if state.cancelled {
                return Ok(());
            }
            if state.status.is_terminated() {
                return Err(BraidError::Closed);
            }
            let buffered = u64::try_from(state.queue.len()).unwrap_or(u64::MAX);
            if self.shared.limit.has_room(buffered) {
                state.queue.push_back((value, origin));
                None
            } else {
                let error = BraidError::capacity_exceeded(format!(
                    "{buffered} values already buffered, capacity is {}",
                    self.shared.limit
                ));
                state.queue.clear();
                state.status = StreamState::Errored;
                state.error = Some(error.clone());
                Some(error)
            }
        };

        self.shared.schedule();

        match overflow {
            None => Ok(()),
            Some(error) => {
                warn!("outlet overflow: {}", error);
                if let Some(hook) = self.shared.hook() {
                    hook.on_cancel();
                }
                Err(error)
            }
        }
    }

    /// Completes the outlet once the buffered values have been delivered.
    pub(crate) fn complete(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.cancelled || state.status.is_terminated() {
                return;
            }
            state.status = StreamState::Completed;
        }
        self.shared.schedule();
    }

    /// Errors the outlet immediately, discarding buffered values.
    pub(crate) fn error(&self, error: BraidError) {
        {
            let mut state = self.shared.state.lock();
            if state.cancelled || state.status.is_terminated() {
                return;
            }
            state.queue.clear();
            state.status = StreamState::Errored;
            state.error = Some(error);
        }
        self.shared.schedule();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.shared.state.lock().cancelled
    }
}

impl<T: Send + 'static> Publisher<T> for Outlet<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let accepted = {
            let mut state = self.shared.state.lock();
            if state.subscribed {
                false
            } else {
                state.subscribed = true;
                state.subscriber = Some(Arc::clone(&subscriber));
                true
            }
        };

        if !accepted {
            warn!("second subscriber rejected, streams are unicast");
            reject(subscriber.as_ref(), BraidError::AlreadySubscribed);
            return;
        }

        subscriber.on_subscribe(Arc::new(OutletSubscription {
            shared: Arc::clone(&self.shared),
        }));
        self.shared.schedule();
    }

    fn capacity(&self) -> Capacity {
        self.shared.declared
    }

    fn state(&self) -> StreamState {
        self.shared.state.lock().status
    }
}

impl<T: Send + 'static> OutletShared<T> {
    fn hook(&self) -> Option<Arc<dyn OutletHook>> {
        self.hook.as_ref().and_then(Weak::upgrade)
    }

    fn schedule(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.draining {
                state.missed = true;
                return;
            }
            state.draining = true;
        }

        let shared = Arc::clone(self);
        if let Err(error) = self.dispatcher.dispatch(Box::new(move || shared.drain())) {
            warn!(
                "dispatcher '{}' refused a delivery: {}",
                self.dispatcher.name(),
                error
            );
            {
                let mut state = self.state.lock();
                if !state.finished {
                    state.queue.clear();
                    state.status = StreamState::Errored;
                    state.error = Some(error);
                }
            }
            self.drain();
        }
    }

    fn drain(&self) {
        loop {
            while let Some(step) = self.next_step() {
                match step {
                    Step::Next(subscriber, value, origin) => {
                        subscriber.on_next(value);
                        if let Some(hook) = self.hook() {
                            hook.on_delivered(origin);
                        }
                    }
                    Step::Error(subscriber, error) => subscriber.on_error(error),
                    Step::Complete(subscriber) => subscriber.on_complete(),
                }
            }

            let mut state = self.state.lock();
            if state.missed {
                state.missed = false;
            } else {
                state.draining = false;
                return;
            }
        }
    }

    fn next_step(&self) -> Option<Step<T>> {
        let mut state = self.state.lock();
        if state.cancelled || state.finished {
            return None;
        }
        let subscriber = state.subscriber.clone()?;

        let status = state.status;
        match status {
            StreamState::Errored => {
                state.finished = true;
                state.subscriber = None;
                let error = state
                    .error
                    .take()
                    .unwrap_or_else(|| BraidError::stream_error("stream failed"));
                Some(Step::Error(subscriber, error))
            }
            _ if state.demand > 0 && !state.queue.is_empty() => {
                let (value, origin) = state.queue.pop_front()?;
                state.demand = consume_demand(state.demand);
                Some(Step::Next(subscriber, value, origin))
            }
            StreamState::Completed if state.queue.is_empty() => {
                state.finished = true;
                state.subscriber = None;
                Some(Step::Complete(subscriber))
            }
            _ => None,
        }
    }

    fn request(self: &Arc<Self>, n: u64) {
        if n == 0 {
            warn!("request(0) is a protocol violation, failing the stream");
            {
                let mut state = self.state.lock();
                if state.cancelled || state.finished {
                    return;
                }
                state.queue.clear();
                state.status = StreamState::Errored;
                state.error = Some(BraidError::InvalidDemand { requested: n });
            }
            if let Some(hook) = self.hook() {
                hook.on_cancel();
            }
            self.schedule();
            return;
        }

        {
            let mut state = self.state.lock();
            if state.cancelled || state.finished {
                return;
            }
            state.demand = add_demand(state.demand, n);
        }
        if let Some(hook) = self.hook() {
            hook.on_request(n);
        }
        self.schedule();
    }

    fn cancel(&self) {
        {
            let mut state = self.state.lock();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            state.queue.clear();
            state.subscriber = None;
        }
        if let Some(hook) = self.hook() {
            hook.on_cancel();
        }
    }
}

struct OutletSubscription<T> {
    shared: Arc<OutletShared<T>>,
}

impl<T: Send + 'static> Subscription for OutletSubscription<T> {
    fn request(&self, n: u64) {
        self.shared.request(n);
    }

    fn cancel(&self) {
        self.shared.cancel();
    }
}
