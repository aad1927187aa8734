// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Push-based stream combinators with explicit backpressure.
//!
//! Every combinator subscribes to its sources, requests values from them, and exposes the
//! result as a new [`BraidStream`]. Signal processing is handed to the
//! [`Dispatcher`](braid_core::Dispatcher) the combinator was built on; combinators own no
//! threads.
//!
//! ## Operators
//!
//! - **[`merge`](merge::merge)**: forwards every value of every source as it arrives
//! - **[`zip`](zip::zip)** / **[`zip_all`](zip::zip_all)**: pairs the k-th values of all
//!   sources
//! - **[`join`](join::join)**: zip into a `Vec` holding one value per source
//! - **[`parallel`](parallel::parallel)**: splits one stream over a pool of sub-streams
//!
//! Each fan-in operator has a `_dynamic` form taking a stream of streams.
//!
//! ## Capacity
//!
//! Every stream declares a [`Capacity`](braid_core::Capacity): the number of values it
//! may hold without downstream demand. Sources derive it from their dispatcher's backlog,
//! combinators from their sources. Consumers request that many values up front
//! ([`DEFAULT_PREFETCH`] for unbounded sources) and one more per value handed downstream.
//!
//! ## Ordering
//!
//! Operators that interleave several sources require a dispatcher that
//! [supports ordering](braid_core::Dispatcher::supports_ordering); attaching them to
//! any other fails with [`BraidError::Configuration`](braid_core::BraidError::Configuration)
//! before anything is subscribed.
//!
//! ## Consuming
//!
//! Subscribe with any [`Subscriber`](braid_core::Subscriber), or turn a stream into a
//! [`futures::Stream`] with [`BraidStream::into_stream`].
//!
//! ```
//! use braid_runtime::SynchronousDispatcher;
//! use braid_stream::prelude::*;
//! use braid_core::SharedDispatcher;
//! use futures::StreamExt;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let dispatcher: SharedDispatcher = Arc::new(SynchronousDispatcher::new());
//! let labels = zip(
//!     dispatcher.clone(),
//!     (
//!         from_values(dispatcher.clone(), vec![1, 2, 3]).unwrap(),
//!         from_values(dispatcher.clone(), vec!["a", "b"]).unwrap(),
//!     ),
//!     |(n, s)| format!("{s}{n}"),
//! )
//! .unwrap();
//!
//! let labels: Vec<_> = labels
//!     .into_stream()
//!     .filter_map(|item| async move { item.into_result().ok() })
//!     .collect()
//!     .await;
//! assert_eq!(labels, vec!["a1", "b2"]);
//! # }
//! ```

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
#[macro_use]
mod logging;
mod braid_stream;
pub mod join;
pub mod merge;
mod outlet;
pub mod parallel;
pub mod prelude;
pub mod sources;
mod subscriber_stream;
mod upstream;
pub mod zip;

pub use self::braid_stream::BraidStream;
pub use self::join::{join, join_dynamic};
pub use self::merge::{merge, merge_dynamic};
pub use self::parallel::{parallel, Parallel};
pub use self::subscriber_stream::SubscriberStream;
pub use self::upstream::DEFAULT_PREFETCH;
pub use self::zip::{zip, zip_all, zip_dynamic, ZipSources};
