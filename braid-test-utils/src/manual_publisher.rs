// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use braid_core::braid_mutex::Mutex;
use braid_core::{add_demand, BraidError, Capacity, Publisher, Subscriber, Subscription};
use std::sync::Arc;

#[derive(Default)]
struct Demand {
    requests: Vec<u64>,
    total: u64,
    cancelled: bool,
}

#[derive(Default)]
struct DemandRecorder {
    demand: Mutex<Demand>,
}

impl Subscription for DemandRecorder {
    fn request(&self, n: u64) {
        let mut demand = self.demand.lock();
        demand.requests.push(n);
        demand.total = add_demand(demand.total, n);
    }

    fn cancel(&self) {
        self.demand.lock().cancelled = true;
    }
}

/// A publisher driven by hand from the test.
///
/// A later subscriber replaces the earlier one. Signals are delivered inline and
/// unchecked, so a test can emit past the granted demand.
///
/// # Panics
/// Emitting or terminating before anything subscribed panics.
pub struct ManualPublisher<T> {
    capacity: Capacity,
    subscriber: Mutex<Option<Arc<dyn Subscriber<T>>>>,
    recorder: Arc<DemandRecorder>,
}

impl<T: Send + 'static> ManualPublisher<T> {
    /// A publisher declaring no capacity.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_capacity(Capacity::Unbounded)
    }

    #[must_use]
    pub fn with_capacity(capacity: Capacity) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            subscriber: Mutex::new(None),
            recorder: Arc::new(DemandRecorder::default()),
        })
    }

    fn subscriber(&self) -> Arc<dyn Subscriber<T>> {
        self.subscriber
            .lock()
            .clone()
            .expect("ManualPublisher has no subscriber")
    }

    pub fn emit(&self, value: T) {
        self.subscriber().on_next(value);
    }

    pub fn complete(&self) {
        self.subscriber().on_complete();
    }

    pub fn error(&self, error: BraidError) {
        self.subscriber().on_error(error);
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscriber.lock().is_some()
    }

    /// Total demand received, saturating at `u64::MAX`.
    #[must_use]
    pub fn requested(&self) -> u64 {
        self.recorder.demand.lock().total
    }

    /// Every `request(n)` received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<u64> {
        self.recorder.demand.lock().requests.clone()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.recorder.demand.lock().cancelled
    }
}

impl<T: Send + 'static> Publisher<T> for ManualPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        *self.subscriber.lock() = Some(Arc::clone(&subscriber));
        subscriber.on_subscribe(Arc::clone(&self.recorder) as Arc<dyn Subscription>);
    }

    fn capacity(&self) -> Capacity {
        self.capacity
    }
}
