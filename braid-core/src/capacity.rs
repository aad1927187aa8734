// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Declared capacities and demand arithmetic.

use core::fmt;

/// Demand value meaning "send everything you have".
pub const UNBOUNDED_DEMAND: u64 = u64::MAX;

/// The maximum number of outstanding, unacknowledged items a stream or execution context
/// accepts before it exerts backpressure.
///
/// # Example
///
/// ```
/// use braid_core::Capacity;
///
/// let merged = Capacity::Bounded(8).min(Capacity::Unbounded).min(Capacity::Bounded(3));
/// assert_eq!(merged, Capacity::Bounded(3));
/// assert_eq!(Capacity::Bounded(8).usable(1), Capacity::Bounded(7));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Capacity {
    /// At most this many items may be outstanding.
    Bounded(u64),
    /// No limit is declared.
    #[default]
    Unbounded,
}

impl Capacity {
    /// Returns `true` if a limit is declared.
    #[must_use]
    pub const fn is_bounded(self) -> bool {
        matches!(self, Self::Bounded(_))
    }

    /// The limit as a raw count, [`UNBOUNDED_DEMAND`] when unbounded.
    #[must_use]
    pub const fn limit(self) -> u64 {
        match self {
            Self::Bounded(n) => n,
            Self::Unbounded => UNBOUNDED_DEMAND,
        }
    }

    /// The smaller of two capacities; `Unbounded` is the identity.
    #[must_use]
    pub const fn min(self, other: Self) -> Self {
        match (self, other) {
            (Self::Bounded(a), Self::Bounded(b)) => Self::Bounded(if a < b { a } else { b }),
            (Self::Bounded(a), Self::Unbounded) | (Self::Unbounded, Self::Bounded(a)) => {
                Self::Bounded(a)
            }
            (Self::Unbounded, Self::Unbounded) => Self::Unbounded,
        }
    }

    /// Minimum over any number of capacities, `Unbounded` when none is stated.
    pub fn min_of<I>(capacities: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        capacities.into_iter().fold(Self::Unbounded, Self::min)
    }

    /// Sum of two capacities; unbounded if either is.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        match (self, other) {
            (Self::Bounded(a), Self::Bounded(b)) => match a.checked_add(b) {
                Some(sum) => Self::Bounded(sum),
                None => Self::Unbounded,
            },
            _ => Self::Unbounded,
        }
    }

    /// How many more items fit when `used` are already outstanding.
    #[must_use]
    pub const fn remaining(self, used: u64) -> u64 {
        match self {
            Self::Bounded(n) => n.saturating_sub(used),
            Self::Unbounded => UNBOUNDED_DEMAND,
        }
    }

    /// Returns `true` if one more item fits when `used` are already outstanding.
    #[must_use]
    pub const fn has_room(self, used: u64) -> bool {
        self.remaining(used) > 0
    }

    /// Capacity left once `reserved` bookkeeping slots are set aside.
    ///
    /// A zero backlog means "no limit". A backlog that cannot even hold the reserved
    /// slots is kept as is, so that no stream ends up with a capacity of zero.
    #[must_use]
    pub const fn usable(self, reserved: u64) -> Self {
        match self {
            Self::Bounded(0) | Self::Unbounded => Self::Unbounded,
            Self::Bounded(n) if n > reserved => Self::Bounded(n - reserved),
            // Not n - reserved clamped to zero: a stage with zero room could never deliver.
            Self::Bounded(n) => Self::Bounded(n),
        }
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(n) => write!(f, "{n}"),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Adds a new request to an outstanding demand counter, saturating at unbounded.
#[must_use]
pub const fn add_demand(current: u64, requested: u64) -> u64 {
    current.saturating_add(requested)
}

/// Consumes one unit of demand; unbounded demand is never consumed.
#[must_use]
pub const fn consume_demand(current: u64) -> u64 {
    if current == UNBOUNDED_DEMAND {
        UNBOUNDED_DEMAND
    } else {
        current.saturating_sub(1)
    }
}

/// Completion state of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StreamState {
    /// Still able to emit values.
    #[default]
    Active,
    /// Terminated normally.
    Completed,
    /// Terminated with an error.
    Errored,
}

impl StreamState {
    /// Returns `true` once the stream has received a terminal signal.
    #[must_use]
    pub const fn is_terminated(self) -> bool {
        !matches!(self, Self::Active)
    }
}
