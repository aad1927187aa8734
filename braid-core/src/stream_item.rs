// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::braid_error::BraidError;

/// Item of a braid stream consumed as a `futures::Stream`.
///
/// Each `on_next` becomes a `Value`, an `on_error` becomes a final `Error`, and completion
/// ends the stream.
#[derive(Debug, Clone)]
pub enum StreamItem<T> {
    Value(T),
    Error(BraidError),
}

impl<T> StreamItem<T> {
    /// `Ok` for a value, `Err` for the terminal error.
    ///
    /// # Errors
    /// The error carried by an `Error` item.
    pub fn into_result(self) -> Result<T, BraidError> {
        match self {
            Self::Value(value) => Ok(value),
            Self::Error(error) => Err(error),
        }
    }
}
