// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use braid_core::braid_mutex::Mutex;
use braid_core::{BraidError, Subscriber, Subscription, UNBOUNDED_DEMAND};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// A signal as seen by a [`TestSubscriber`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event<T> {
    Next(T),
    Error(String),
    Complete,
}

struct Recorded<T> {
    subscription: Option<Arc<dyn Subscription>>,
    subscribe_calls: usize,
    events: Vec<Event<T>>,
    error: Option<BraidError>,
}

/// Subscriber recording every signal it receives.
///
/// It requests its initial demand on subscription and nothing more unless the test calls
/// [`request`](Self::request).
pub struct TestSubscriber<T> {
    initial_demand: u64,
    recorded: Mutex<Recorded<T>>,
}

impl<T: Send + 'static> TestSubscriber<T> {
    /// A subscriber requesting `demand` on subscription, or nothing when `demand` is 0.
    #[must_use]
    pub fn with_demand(demand: u64) -> Arc<Self> {
        Arc::new(Self {
            initial_demand: demand,
            recorded: Mutex::new(Recorded {
                subscription: None,
                subscribe_calls: 0,
                events: Vec::new(),
                error: None,
            }),
        })
    }

    /// A subscriber requesting everything on subscription.
    #[must_use]
    pub fn unbounded() -> Arc<Self> {
        Self::with_demand(UNBOUNDED_DEMAND)
    }

    /// A subscriber that requests nothing on its own.
    #[must_use]
    pub fn manual() -> Arc<Self> {
        Self::with_demand(0)
    }

    fn subscription(&self) -> Arc<dyn Subscription> {
        self.recorded
            .lock()
            .subscription
            .clone()
            .expect("TestSubscriber was never subscribed")
    }

    /// Requests `n` more values, `0` included.
    ///
    /// # Panics
    /// If the subscriber was never subscribed.
    pub fn request(&self, n: u64) {
        self.subscription().request(n);
    }

    /// # Panics
    /// If the subscriber was never subscribed.
    pub fn cancel(&self) {
        self.subscription().cancel();
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.recorded.lock().subscription.is_some()
    }

    #[must_use]
    pub fn subscribe_calls(&self) -> usize {
        self.recorded.lock().subscribe_calls
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.recorded
            .lock()
            .events
            .iter()
            .any(|event| matches!(event, Event::Complete))
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        let recorded = self.recorded.lock();
        recorded.error.is_some()
            || recorded
                .events
                .iter()
                .any(|event| matches!(event, Event::Complete))
    }

    /// The error received, if any.
    #[must_use]
    pub fn error(&self) -> Option<BraidError> {
        self.recorded.lock().error.clone()
    }

    /// Number of `on_next` calls so far.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.recorded
            .lock()
            .events
            .iter()
            .filter(|event| matches!(event, Event::Next(_)))
            .count()
    }

    /// Waits until a terminal signal arrives, `false` on timeout.
    pub async fn wait_terminated(&self, timeout_ms: u64) -> bool {
        self.wait_until(timeout_ms, Self::is_terminated).await
    }

    /// Waits until at least `count` values arrived, `false` on timeout.
    pub async fn wait_values(&self, count: usize, timeout_ms: u64) -> bool {
        self.wait_until(timeout_ms, |subscriber| subscriber.value_count() >= count)
            .await
    }

    async fn wait_until(&self, timeout_ms: u64, condition: impl Fn(&Self) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        while !condition(self) {
            if Instant::now() >= deadline {
                return false;
            }
            sleep(Duration::from_millis(1)).await;
        }
        true
    }
}

impl<T: Clone + Send + 'static> TestSubscriber<T> {
    /// Values received so far, in order.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.recorded
            .lock()
            .events
            .iter()
            .filter_map(|event| match event {
                Event::Next(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every signal received so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<Event<T>> {
        self.recorded.lock().events.clone()
    }
}

impl<T: Send + 'static> Subscriber<T> for TestSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        {
            let mut recorded = self.recorded.lock();
            recorded.subscribe_calls += 1;
            recorded.subscription = Some(Arc::clone(&subscription));
        }
        if self.initial_demand > 0 {
            subscription.request(self.initial_demand);
        }
    }

    fn on_next(&self, value: T) {
        self.recorded.lock().events.push(Event::Next(value));
    }

    fn on_error(&self, error: BraidError) {
        let mut recorded = self.recorded.lock();
        recorded.events.push(Event::Error(error.to_string()));
        recorded.error = Some(error);
    }

    fn on_complete(&self) {
        self.recorded.lock().events.push(Event::Complete);
    }
}
