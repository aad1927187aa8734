// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The push protocol every braid stage speaks.
//!
//! A [`Publisher`] hands a [`Subscription`] to each [`Subscriber`] through
//! [`Subscriber::on_subscribe`]. The subscriber then bounds the flow with
//! [`Subscription::request`]; the publisher answers with at most that many
//! [`Subscriber::on_next`] calls followed by exactly one terminal signal
//! ([`Subscriber::on_complete`] or [`Subscriber::on_error`]) unless the subscription is
//! cancelled first.
//!
//! All callbacks take `&self`: stages are shared behind `Arc` and keep their mutable
//! state behind a [`Mutex`](crate::braid_mutex::Mutex).

use crate::{BraidError, Capacity, StreamState};
use std::sync::Arc;

/// Demand channel from a subscriber back to its publisher.
pub trait Subscription: Send + Sync {
    /// Allow the publisher to send `n` more items. `n == 0` is a protocol violation.
    fn request(&self, n: u64);

    /// Stop the flow. Idempotent; signals already in flight may still arrive.
    fn cancel(&self);
}

/// Consumer side of the push protocol.
pub trait Subscriber<T>: Send + Sync {
    /// Called once, before any other signal.
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>);

    /// Called for each value, never more often than requested.
    fn on_next(&self, value: T);

    /// Terminal error signal.
    fn on_error(&self, error: BraidError);

    /// Terminal completion signal.
    fn on_complete(&self);
}

/// Producer side of the push protocol.
pub trait Publisher<T>: Send + Sync {
    /// Attach a subscriber. Failures are reported through the subscriber itself.
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>);

    /// The maximum number of outstanding items this publisher declares.
    fn capacity(&self) -> Capacity {
        Capacity::Unbounded
    }

    /// Completion state as currently known by the publisher.
    fn state(&self) -> StreamState {
        StreamState::Active
    }
}

/// A subscription that ignores every request.
///
/// Handed to subscribers that are rejected, right before their error signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSubscription;

impl Subscription for NoopSubscription {
    fn request(&self, _n: u64) {}

    fn cancel(&self) {}
}

/// Rejects a subscriber: hands it a no-op subscription, then the error.
pub fn reject<T>(subscriber: &dyn Subscriber<T>, error: BraidError) {
    subscriber.on_subscribe(Arc::new(NoopSubscription));
    subscriber.on_error(error);
}
