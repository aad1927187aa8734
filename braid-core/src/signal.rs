// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::{BraidError, Subscriber};

/// One downstream-bound signal of the push protocol.
#[derive(Debug, Clone)]
pub enum Signal<T> {
    /// A value
    Next(T),
    /// Terminal error
    Error(BraidError),
    /// Terminal completion
    Complete,
}

impl<T> Signal<T> {
    /// Returns `true` for `Error` and `Complete`.
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Next(_))
    }

    /// Hands the signal to the matching subscriber callback.
    pub fn deliver_to(self, subscriber: &dyn Subscriber<T>) {
        match self {
            Self::Next(value) => subscriber.on_next(value),
            Self::Error(error) => subscriber.on_error(error),
            Self::Complete => subscriber.on_complete(),
        }
    }
}
