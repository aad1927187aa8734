// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::subscriber_stream::SubscriberStream;
use braid_core::{
    BraidError, Capacity, Publisher, SharedDispatcher, StreamState, Subscriber, Subscription,
};
use core::fmt;
use std::sync::Arc;

/// A push-based stream: a publisher plus the execution context it delivers on.
///
/// Cloning is cheap and yields a handle on the same stream. Streams produced by the
/// combinators are unicast, a second subscriber is rejected with
/// [`BraidError::AlreadySubscribed`]; source adapters built from values, iterables or
/// suppliers replay for every subscriber.
///
/// # Example
///
/// ```
/// use braid_runtime::SynchronousDispatcher;
/// use braid_stream::sources::from_values;
/// use std::sync::Arc;
///
/// let stream = from_values(Arc::new(SynchronousDispatcher::new()), vec![1, 2, 3]).unwrap();
/// assert_eq!(stream.capacity(), braid_core::Capacity::Bounded(3));
/// ```
pub struct BraidStream<T> {
    publisher: Arc<dyn Publisher<T>>,
    dispatcher: SharedDispatcher,
}

impl<T> Clone for BraidStream<T> {
    fn clone(&self) -> Self {
        Self {
            publisher: Arc::clone(&self.publisher),
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

impl<T: Send + 'static> BraidStream<T> {
    /// Wraps a publisher delivering on `dispatcher`.
    pub fn new(publisher: Arc<dyn Publisher<T>>, dispatcher: SharedDispatcher) -> Self {
        Self {
            publisher,
            dispatcher,
        }
    }

    /// Attaches a subscriber.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.publisher.subscribe(subscriber);
    }

    /// Declared capacity of the stream.
    pub fn capacity(&self) -> Capacity {
        self.publisher.capacity()
    }

    /// Completion state as currently known.
    pub fn state(&self) -> StreamState {
        self.publisher.state()
    }

    /// Execution context the stream delivers on.
    pub fn dispatcher(&self) -> &SharedDispatcher {
        &self.dispatcher
    }

    /// Transforms every value, keeping demand, capacity and terminal signals untouched.
    pub fn map<U, F>(&self, f: F) -> BraidStream<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        BraidStream::new(
            Arc::new(MapPublisher {
                source: self.clone(),
                f: Arc::new(f),
            }),
            Arc::clone(&self.dispatcher),
        )
    }

    /// Consumes the stream as a [`futures::Stream`] of [`StreamItem`](braid_core::StreamItem)s.
    ///
    /// Demand is prefetched up to the declared capacity and replenished as items are
    /// polled. Dropping the returned stream cancels the subscription.
    pub fn into_stream(self) -> SubscriberStream<T> {
        SubscriberStream::subscribe(&self)
    }
}

impl<T: Send + 'static> Publisher<T> for BraidStream<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.publisher.subscribe(subscriber);
    }

    fn capacity(&self) -> Capacity {
        self.publisher.capacity()
    }

    fn state(&self) -> StreamState {
        self.publisher.state()
    }
}

impl<T> fmt::Debug for BraidStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BraidStream")
            .field("capacity", &self.publisher.capacity())
            .field("dispatcher", &self.dispatcher.name())
            .finish()
    }
}

type MapFn<T, U> = dyn Fn(T) -> U + Send + Sync;

struct MapPublisher<T, U> {
    source: BraidStream<T>,
    f: Arc<MapFn<T, U>>,
}

impl<T: Send + 'static, U: Send + 'static> Publisher<U> for MapPublisher<T, U> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<U>>) {
        self.source.subscribe(Arc::new(MapSubscriber {
            downstream: subscriber,
            f: Arc::clone(&self.f),
        }));
    }

    fn capacity(&self) -> Capacity {
        self.source.capacity()
    }

    fn state(&self) -> StreamState {
        self.source.state()
    }
}

struct MapSubscriber<T, U> {
    downstream: Arc<dyn Subscriber<U>>,
    f: Arc<MapFn<T, U>>,
}

impl<T: Send + 'static, U: Send + 'static> Subscriber<T> for MapSubscriber<T, U> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.downstream.on_subscribe(subscription);
    }

    fn on_next(&self, value: T) {
        self.downstream.on_next((self.f)(value));
    }

    fn on_error(&self, error: BraidError) {
        self.downstream.on_error(error);
    }

    fn on_complete(&self) {
        self.downstream.on_complete();
    }
}
