// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Bridge from the push protocol to [`futures::Stream`].

use crate::upstream::{prefetch, Upstream};
use crate::BraidStream;
use braid_core::{BraidError, StreamItem, Subscriber, Subscription};
use futures::channel::mpsc;
use futures::Stream;
use pin_project::{pin_project, pinned_drop};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// A [`BraidStream`] consumed as a [`futures::Stream`].
///
/// Yields `StreamItem::Value` per value, a final `StreamItem::Error` if the stream fails,
/// and ends on completion.
#[pin_project(PinnedDrop)]
pub struct SubscriberStream<T> {
    #[pin]
    receiver: mpsc::UnboundedReceiver<StreamItem<T>>,
    upstream: Arc<Upstream>,
    consumed: u64,
    replenish_at: u64,
}

impl<T: Send + 'static> SubscriberStream<T> {
    pub(crate) fn subscribe(stream: &BraidStream<T>) -> Self {
        let (sender, receiver) = mpsc::unbounded();
        let upstream = Arc::new(Upstream::new());
        let prefetch = prefetch(stream.capacity());

        stream.subscribe(Arc::new(ChannelSubscriber {
            sender,
            upstream: Arc::clone(&upstream),
        }));
        upstream.request(prefetch);

        Self {
            receiver,
            upstream,
            consumed: 0,
            replenish_at: (prefetch / 2).max(1),
        }
    }
}

impl<T> Stream for SubscriberStream<T> {
    type Item = StreamItem<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let polled = this.receiver.poll_next(cx);

        if let Poll::Ready(Some(StreamItem::Value(_))) = &polled {
            *this.consumed += 1;
            if *this.consumed >= *this.replenish_at {
                this.upstream.request(*this.consumed);
                *this.consumed = 0;
            }
        }
        polled
    }
}

#[pinned_drop]
impl<T> PinnedDrop for SubscriberStream<T> {
    fn drop(self: Pin<&mut Self>) {
        self.project().upstream.cancel();
    }
}

struct ChannelSubscriber<T> {
    sender: mpsc::UnboundedSender<StreamItem<T>>,
    upstream: Arc<Upstream>,
}

impl<T: Send + 'static> Subscriber<T> for ChannelSubscriber<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.upstream.attach(subscription);
    }

    fn on_next(&self, value: T) {
        if let Err(error) = self.upstream.receive() {
            self.upstream.cancel();
            self.on_error(error);
            return;
        }
        if self.sender.unbounded_send(StreamItem::Value(value)).is_err() {
            self.upstream.cancel();
        }
    }

    fn on_error(&self, error: BraidError) {
        let _ = self.sender.unbounded_send(StreamItem::Error(error));
        self.sender.close_channel();
    }

    fn on_complete(&self) {
        self.sender.close_channel();
    }
}
