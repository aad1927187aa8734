// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Error types for braid stream combinators
//!
//! A single root [`BraidError`] covers the three families of failure the engine knows about:
//!
//! - **configuration errors**, raised synchronously when a combinator is built
//!   (missing ordering capability, structurally invalid arguments);
//! - **propagated errors**, signalled by a source and forwarded downstream;
//! - **capacity violations**, when more items or demand arrive than a stream declared.
//!
//! # Examples
//!
//! ```
//! use braid_core::{BraidError, Result};
//!
//! fn build() -> Result<()> {
//!     Err(BraidError::configuration("merge requires at least one source"))
//! }
//!
//! assert!(build().unwrap_err().is_configuration());
//! ```

/// Root error type for all braid operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum BraidError {
    /// A combinator could not be built with the supplied arguments or execution context.
    #[error("Configuration error: {context}")]
    Configuration {
        /// What was wrong with the configuration
        context: String,
    },

    /// A stream or execution context received more than its declared capacity.
    #[error("Capacity exceeded: {context}")]
    CapacityExceeded {
        /// Which capacity was exceeded
        context: String,
    },

    /// A subscriber requested a non-positive amount of items.
    #[error("Invalid demand: {requested} (requests must be strictly positive)")]
    InvalidDemand {
        /// The rejected request amount
        requested: u64,
    },

    /// A unicast stream was subscribed to a second time.
    #[error("Stream already has a subscriber")]
    AlreadySubscribed,

    /// A value was pushed into a stream that already terminated.
    #[error("Stream is closed")]
    Closed,

    /// Stream processing encountered an error
    #[error("Stream processing error: {context}")]
    StreamProcessingError {
        /// Description of what went wrong during stream processing
        context: String,
    },
}

impl BraidError {
    /// Create a configuration error with the given context
    pub fn configuration(context: impl Into<String>) -> Self {
        Self::Configuration {
            context: context.into(),
        }
    }

    /// Create a capacity violation with the given context
    pub fn capacity_exceeded(context: impl Into<String>) -> Self {
        Self::CapacityExceeded {
            context: context.into(),
        }
    }

    /// Create a stream processing error with the given context
    pub fn stream_error(context: impl Into<String>) -> Self {
        Self::StreamProcessingError {
            context: context.into(),
        }
    }

    /// Returns `true` for errors raised while building a combinator.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Returns `true` for protocol violations around capacity and demand.
    #[must_use]
    pub const fn is_capacity_violation(&self) -> bool {
        matches!(
            self,
            Self::CapacityExceeded { .. } | Self::InvalidDemand { .. }
        )
    }

    /// Check if this error indicates a permanent failure
    ///
    /// The core never retries, so every error terminates the stream it travels on.
    /// Only [`BraidError::Closed`] is reported to pushers without terminating anything.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// Specialized Result type for braid operations
pub type Result<T> = std::result::Result<T, BraidError>;
