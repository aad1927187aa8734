// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synchronization primitive shared by every combinator.
//!
//! Combinator state is only touched by one in-flight signal at a time, so the lock is
//! uncontended; it exists to make the state `Sync`. Never hold a guard across a call
//! into another stage.

pub use parking_lot::{Mutex, MutexGuard};
