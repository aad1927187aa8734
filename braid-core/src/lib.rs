// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Core contracts for braid stream combinators.
//!
//! - [`Publisher`], [`Subscriber`], [`Subscription`]: the push protocol with explicit demand
//! - [`Dispatcher`]: the execution context every combinator runs its signals on
//! - [`Capacity`]: declared backlog and stream capacities
//! - [`BraidError`]: configuration errors, propagated errors and capacity violations
//! - [`StreamItem`]: the value/error pair seen once a stream is consumed as a `futures::Stream`

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
#[macro_use]
mod logging;
pub mod braid_error;
pub mod braid_mutex;
pub mod capacity;
pub mod dispatcher;
pub mod publisher;
pub mod signal;
pub mod stream_item;

pub use self::braid_error::{BraidError, Result};
pub use self::capacity::{add_demand, consume_demand, Capacity, StreamState, UNBOUNDED_DEMAND};
pub use self::dispatcher::{Dispatcher, SharedDispatcher, RESERVED_SLOTS};
pub use self::publisher::{reject, NoopSubscription, Publisher, Subscriber, Subscription};
pub use self::signal::Signal;
pub use self::stream_item::StreamItem;
