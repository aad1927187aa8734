// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Execution contexts for braid.
//!
//! - [`SynchronousDispatcher`]: inline, ordering, optional declared backlog
//! - [`EventLoopDispatcher`](impls::tokio::EventLoopDispatcher): one tokio task per
//!   dispatcher, FIFO, ordering (feature `runtime-tokio`)
//! - [`WorkPoolDispatcher`](impls::tokio::WorkPoolDispatcher): one tokio task per signal,
//!   not ordering (feature `runtime-tokio`)
//! - [`DispatcherFactory`] and [`Environment`]: how the factory surface finds its defaults

#[macro_use]
mod logging;

pub mod environment;
pub mod factory;
pub mod impls;

pub use environment::{Environment, EnvironmentBuilder, DEFAULT_BACKLOG};
pub use factory::DispatcherFactory;
pub use impls::synchronous::SynchronousDispatcher;

#[cfg(feature = "runtime-tokio")]
pub use impls::tokio::{EventLoopDispatcher, WorkPoolDispatcher};
