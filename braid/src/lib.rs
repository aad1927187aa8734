// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! # Braid
//!
//! Push-based stream combinators with explicit execution contexts and backpressure.
//!
//! ## Overview
//!
//! Braid composes several asynchronous streams into one (`merge`, `zip`, `join`) or
//! spreads one stream across a pool of sub-streams (`parallel`). Every stream is bound to
//! a dispatcher that decides where its signals run, and declares a capacity: how many
//! values it may have in flight ahead of consumer demand.
//!
//! The crate is a facade over:
//!
//! - `braid-core`: the push protocol, the dispatcher contract, [`Capacity`] and [`BraidError`]
//! - `braid-runtime`: synchronous and tokio-backed dispatchers, [`Environment`]
//! - `braid-stream`: the combinators and sources
//!
//! The [`streams`] module is the factory surface. Each call comes in two forms: one taking
//! an [`Environment`] (its default dispatcher is used), one taking an explicit dispatcher
//! (suffixed `_on`).
//!
//! ## Quick Start
//!
//! ```rust
//! use braid_rx::prelude::*;
//!
//! let env = Environment::new();
//! let numbers = streams::from_values(&env, vec![1, 2, 3])?;
//! let letters = streams::from_values(&env, vec!["a", "b"])?;
//! let zipped = streams::zip(&env, (numbers, letters), |(n, s)| format!("{s}{n}"))?;
//! assert_eq!(zipped.capacity(), Capacity::Bounded(2));
//! # Ok::<(), BraidError>(())
//! ```

pub mod streams;

pub use braid_core::{
    BraidError, Capacity, Dispatcher, Publisher, Result, SharedDispatcher, StreamItem,
    StreamState, Subscriber, Subscription,
};
pub use braid_runtime::{DispatcherFactory, Environment, EnvironmentBuilder, SynchronousDispatcher};
#[cfg(feature = "runtime-tokio")]
pub use braid_runtime::{EventLoopDispatcher, WorkPoolDispatcher};
pub use braid_stream::sources::Deferred;
pub use braid_stream::{BraidStream, Parallel, SubscriberStream, ZipSources};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::streams;
    pub use braid_core::{BraidError, Capacity, SharedDispatcher, StreamItem};
    pub use braid_runtime::{DispatcherFactory, Environment};
    pub use braid_stream::sources::Deferred;
    pub use braid_stream::{BraidStream, Parallel};
}
