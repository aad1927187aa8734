// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Prelude module re-exporting the stream type, every operator and every source adapter.
//!
//! ```
//! use braid_stream::prelude::*;
//! ```

pub use crate::join::{join, join_dynamic};
pub use crate::merge::{merge, merge_dynamic};
pub use crate::parallel::{parallel, Parallel};
pub use crate::sources::{defer, from_iter, from_publisher, from_values, generate, Deferred};
pub use crate::zip::{zip, zip_all, zip_dynamic, ZipSources};
pub use crate::{BraidStream, SubscriberStream};
