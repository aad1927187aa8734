// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::outlet::{Outlet, OutletHook};
use crate::upstream::{prefetch, SourceSink, SourceSubscriber, Upstream};
use crate::BraidStream;
use braid_core::dispatcher::{require_ordering, usable_capacity};
use braid_core::{
    BraidError, Capacity, Dispatcher, Publisher, Result, SharedDispatcher, Signal, StreamState,
    Subscriber,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Adapts any [`Publisher`] into a [`BraidStream`] on `dispatcher`.
///
/// The relay subscribes right away and asks the publisher for at most its own capacity
/// (the usable capacity of `dispatcher`, capped by the publisher's declared one) once a
/// downstream subscriber requests. Values, completion and errors are forwarded unchanged.
///
/// # Errors
/// Returns [`BraidError::Configuration`] if the dispatcher does not support ordering.
pub fn from_publisher<T, P>(
    dispatcher: SharedDispatcher,
    publisher: Arc<P>,
) -> Result<BraidStream<T>>
where
    T: Send + 'static,
    P: Publisher<T> + ?Sized,
{
    require_ordering(dispatcher.as_ref(), "from_publisher")?;
    let capacity = usable_capacity(dispatcher.as_ref()).min(publisher.capacity());

    let relay = Arc::new_cyclic(|me: &Weak<Relay<T>>| {
        let hook: Weak<dyn OutletHook> = me.clone();
        Relay {
            dispatcher: Arc::clone(&dispatcher),
            outlet: Outlet::new(Arc::clone(&dispatcher), capacity, capacity, Some(hook)),
            upstream: Arc::new(Upstream::new()),
            prefetch: prefetch(capacity),
            started: AtomicBool::new(false),
        }
    });

    publisher.subscribe(Arc::new(SourceSubscriber::new(
        Arc::clone(&relay),
        0,
        Arc::clone(&relay.upstream),
    )));

    Ok(BraidStream::new(relay, dispatcher))
}

struct Relay<T> {
    dispatcher: SharedDispatcher,
    outlet: Outlet<T>,
    upstream: Arc<Upstream>,
    prefetch: u64,
    started: AtomicBool,
}

impl<T: Send + 'static> SourceSink<T> for Relay<T> {
    fn dispatcher(&self) -> &dyn Dispatcher {
        self.dispatcher.as_ref()
    }

    fn on_source_signal(&self, _id: u64, signal: Signal<T>) {
        match signal {
            Signal::Next(value) => {
                if self.outlet.push(value, 0).is_err() {
                    self.upstream.cancel();
                }
            }
            Signal::Error(error) => self.outlet.error(error),
            Signal::Complete => self.outlet.complete(),
        }
    }

    fn on_dispatch_failure(&self, error: BraidError) {
        self.upstream.cancel();
        self.outlet.error(error);
    }
}

impl<T: Send + 'static> OutletHook for Relay<T> {
    fn on_request(&self, _n: u64) {
        if !self.started.swap(true, Ordering::AcqRel) {
            self.upstream.request(self.prefetch);
        }
    }

    fn on_cancel(&self) {
        self.upstream.cancel();
    }

    fn on_delivered(&self, _origin: u64) {
        self.upstream.request(1);
    }
}

impl<T: Send + 'static> Publisher<T> for Relay<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.outlet.subscribe(subscriber);
    }

    fn capacity(&self) -> Capacity {
        self.outlet.capacity()
    }

    fn state(&self) -> StreamState {
        self.outlet.state()
    }
}
