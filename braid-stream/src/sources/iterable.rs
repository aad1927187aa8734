// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Cold sources pulled on demand: collections, iterables and suppliers.
//!
//! Every subscriber gets its own iterator. Values are pulled only while the subscriber
//! has outstanding demand, so an infinite iterable or a supplier is never run ahead of
//! what was requested.

use crate::BraidStream;
use braid_core::braid_mutex::Mutex;
use braid_core::dispatcher::require_ordering;
use braid_core::{
    add_demand, consume_demand, BraidError, Capacity, Publisher, Result, SharedDispatcher,
    Subscriber, Subscription,
};
use std::sync::{Arc, Weak};

type BoxIter<T> = Box<dyn Iterator<Item = T> + Send>;
type IterFactory<T> = dyn Fn() -> BoxIter<T> + Send + Sync;

/// Emits every value of `values`, then completes.
///
/// Declares a capacity equal to the number of values.
///
/// # Errors
/// Returns [`BraidError::Configuration`] if the dispatcher does not support ordering.
pub fn from_values<T>(dispatcher: SharedDispatcher, values: Vec<T>) -> Result<BraidStream<T>>
where
    T: Clone + Send + Sync + 'static,
{
    require_ordering(dispatcher.as_ref(), "from_values")?;
    let capacity = Capacity::Bounded(u64::try_from(values.len()).unwrap_or(u64::MAX));
    let make = move || Box::new(values.clone().into_iter()) as BoxIter<T>;
    Ok(PullPublisher::stream(dispatcher, capacity, true, Arc::new(make)))
}

/// Emits every value of a fresh iterator per subscriber, then completes.
///
/// Declares no capacity.
///
/// # Errors
/// Returns [`BraidError::Configuration`] if the dispatcher does not support ordering.
pub fn from_iter<I>(dispatcher: SharedDispatcher, iterable: I) -> Result<BraidStream<I::Item>>
where
    I: IntoIterator + Clone + Send + Sync + 'static,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    require_ordering(dispatcher.as_ref(), "from_iter")?;
    let make = move || Box::new(iterable.clone().into_iter()) as BoxIter<I::Item>;
    Ok(PullPublisher::stream(
        dispatcher,
        Capacity::Unbounded,
        true,
        Arc::new(make),
    ))
}

/// Calls `supplier` once per unit of demand; `None` completes the stream.
///
/// Declares a capacity of 1. The supplier is shared by all subscribers.
///
/// # Example
///
/// ```
/// use braid_runtime::SynchronousDispatcher;
/// use braid_stream::sources::generate;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
///
/// let counter = AtomicU32::new(0);
/// let ticks = generate(Arc::new(SynchronousDispatcher::new()), move || {
///     Some(counter.fetch_add(1, Ordering::Relaxed))
/// });
/// assert_eq!(ticks.capacity(), braid_core::Capacity::Bounded(1));
/// ```
pub fn generate<T, F>(dispatcher: SharedDispatcher, supplier: F) -> BraidStream<T>
where
    T: Send + 'static,
    F: Fn() -> Option<T> + Send + Sync + 'static,
{
    let supplier = Arc::new(supplier);
    let make = move || {
        let supplier = Arc::clone(&supplier);
        Box::new(std::iter::from_fn(move || supplier())) as BoxIter<T>
    };
    PullPublisher::stream(dispatcher, Capacity::Bounded(1), false, Arc::new(make))
}

struct PullPublisher<T> {
    dispatcher: SharedDispatcher,
    capacity: Capacity,
    eager_completion: bool,
    make: Arc<IterFactory<T>>,
}

impl<T: Send + 'static> PullPublisher<T> {
    fn stream(
        dispatcher: SharedDispatcher,
        capacity: Capacity,
        eager_completion: bool,
        make: Arc<IterFactory<T>>,
    ) -> BraidStream<T> {
        let publisher = Self {
            dispatcher: Arc::clone(&dispatcher),
            capacity,
            eager_completion,
            make,
        };
        BraidStream::new(Arc::new(publisher), dispatcher)
    }
}

impl<T: Send + 'static> Publisher<T> for PullPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let subscription = Arc::new_cyclic(|me| PullSubscription {
            me: me.clone(),
            dispatcher: Arc::clone(&self.dispatcher),
            eager_completion: self.eager_completion,
            state: Mutex::new(PullState {
                source: Some((self.make)()),
                lookahead: None,
                subscriber: Some(Arc::clone(&subscriber)),
                demand: 0,
                failure: None,
                done: false,
                draining: false,
                missed: false,
            }),
        });
        subscriber.on_subscribe(Arc::clone(&subscription) as Arc<dyn Subscription>);
        if self.eager_completion {
            subscription.schedule();
        }
    }

    fn capacity(&self) -> Capacity {
        self.capacity
    }
}

struct PullState<T> {
    source: Option<BoxIter<T>>,
    lookahead: Option<T>,
    subscriber: Option<Arc<dyn Subscriber<T>>>,
    demand: u64,
    failure: Option<BraidError>,
    done: bool,
    draining: bool,
    missed: bool,
}

impl<T> PullState<T> {
    fn finish(&mut self) {
        self.done = true;
        self.subscriber = None;
        self.source = None;
        self.lookahead = None;
    }
}

struct PullSubscription<T> {
    me: Weak<Self>,
    dispatcher: SharedDispatcher,
    eager_completion: bool,
    state: Mutex<PullState<T>>,
}

impl<T: Send + 'static> PullSubscription<T> {
    fn schedule(self: &Arc<Self>) {
        {
            let mut state = self.state.lock();
            if state.draining {
                state.missed = true;
                return;
            }
            state.draining = true;
        }

        let subscription = Arc::clone(self);
        if let Err(error) = self.dispatcher.dispatch(Box::new(move || subscription.drain())) {
            warn!("source could not schedule emission: {}", error);
            self.state.lock().failure = Some(error);
            self.drain();
        }
    }

    fn drain(&self) {
        loop {
            self.emit();
            let mut state = self.state.lock();
            if state.missed {
                state.missed = false;
            } else {
                state.draining = false;
                return;
            }
        }
    }

    fn emit(&self) {
        loop {
            let (subscriber, mut source, can_emit) = {
                let mut state = self.state.lock();
                if state.done {
                    return;
                }
                let Some(subscriber) = state.subscriber.clone() else {
                    return;
                };
                if let Some(error) = state.failure.take() {
                    state.finish();
                    drop(state);
                    subscriber.on_error(error);
                    return;
                }

                let can_emit = state.demand > 0;
                if can_emit {
                    if let Some(value) = state.lookahead.take() {
                        state.demand = consume_demand(state.demand);
                        drop(state);
                        subscriber.on_next(value);
                        continue;
                    }
                } else if !self.eager_completion || state.lookahead.is_some() {
                    return;
                }

                let Some(source) = state.source.take() else {
                    return;
                };
                (subscriber, source, can_emit)
            };

            let pulled = source.next();

            let mut state = self.state.lock();
            if state.done {
                return;
            }
            state.source = Some(source);
            match pulled {
                Some(value) if can_emit => {
                    state.demand = consume_demand(state.demand);
                    drop(state);
                    subscriber.on_next(value);
                }
                Some(value) => {
                    state.lookahead = Some(value);
                    return;
                }
                None => {
                    state.finish();
                    drop(state);
                    subscriber.on_complete();
                    return;
                }
            }
        }
    }
}

impl<T: Send + 'static> Subscription for PullSubscription<T> {
    fn request(&self, n: u64) {
        {
            let mut state = self.state.lock();
            if state.done {
                return;
            }
            if n == 0 {
                warn!("request(0) is a protocol violation, failing the stream");
                state.failure = Some(BraidError::InvalidDemand { requested: n });
            } else {
                state.demand = add_demand(state.demand, n);
            }
        }
        if let Some(me) = self.me.upgrade() {
            me.schedule();
        }
    }

    fn cancel(&self) {
        self.state.lock().finish();
    }
}
