// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Adapters turning values, iterables, suppliers, push handles and foreign publishers
//! into [`BraidStream`](crate::BraidStream)s.
//!
//! | adapter | declared capacity | needs ordering |
//! |---------|-------------------|----------------|
//! | [`defer`] | usable capacity of the dispatcher | yes |
//! | [`from_values`] | number of values | yes |
//! | [`from_iter`] | unbounded | yes |
//! | [`from_publisher`] | usable capacity, capped by the publisher's | yes |
//! | [`generate`] | 1 | no |

pub mod deferred;
pub mod iterable;
pub mod relay;

pub use deferred::{defer, Deferred};
pub use iterable::{from_iter, from_values, generate};
pub use relay::from_publisher;
