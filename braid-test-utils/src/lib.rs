// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Test utilities and fixtures for the braid stream combinators.
//!
//! This crate provides recording subscribers, hand-driven publishers and dispatchers, and
//! assertion helpers for streams consumed as [`futures::Stream`]s. It is designed for use
//! in development and testing only, not for production code.
//!
//! # Key Types
//!
//! ## `TestSubscriber<T>`
//!
//! Records every signal it receives and lets the test decide how much to request:
//!
//! ```rust
//! use braid_core::Publisher;
//! use braid_test_utils::{ManualPublisher, TestSubscriber};
//!
//! let publisher = ManualPublisher::<i32>::new();
//! let subscriber = TestSubscriber::with_demand(2);
//! publisher.subscribe(subscriber.clone());
//!
//! publisher.emit(1);
//! publisher.complete();
//!
//! assert_eq!(publisher.requested(), 2);
//! assert_eq!(subscriber.values(), vec![1]);
//! assert!(subscriber.is_completed());
//! ```
//!
//! ## `ManualPublisher<T>`
//!
//! A source the test drives by hand. It records the demand it receives and whether it was
//! cancelled, and emits whatever it is told to, demand or not.
//!
//! ## `NonOrderingDispatcher`
//!
//! An inline dispatcher that reports no ordering support, for exercising the
//! configuration checks of the combinators.
//!
//! # Module Organization
//!
//! - `test_subscriber` - `TestSubscriber<T>` and the recorded `Event`s
//! - `manual_publisher` - `ManualPublisher<T>`
//! - `dispatchers` - `NonOrderingDispatcher`
//! - `helpers` - Assertion and collection functions for `futures::Stream`s

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
pub mod dispatchers;
pub mod helpers;
pub mod manual_publisher;
pub mod test_subscriber;

pub use dispatchers::NonOrderingDispatcher;
pub use helpers::{
    assert_no_element_emitted, assert_stream_ended, collect_values, unwrap_stream, unwrap_value,
};
pub use manual_publisher::ManualPublisher;
pub use test_subscriber::{Event, TestSubscriber};
