// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::BraidStream;
use braid_core::{BraidError, Result};
use std::any::Any;

/// A type-erased zip slot value.
pub(crate) type Erased = Box<dyn Any + Send>;

/// A tuple of streams that can be zipped together.
///
/// Implemented for tuples of 2 to 8 [`BraidStream`]s. Each stream is erased to a common
/// value type, zipped, and every frame is reassembled into a tuple of the original types.
pub trait ZipSources {
    /// One value from each source, in tuple order.
    type Output: Send + 'static;

    #[doc(hidden)]
    fn into_erased(self) -> Vec<BraidStream<Erased>>;

    #[doc(hidden)]
    fn assemble(values: Vec<Erased>) -> Result<Self::Output>;
}

fn restore<T: 'static>(value: Option<Erased>) -> Result<T> {
    value
        .and_then(|value| value.downcast::<T>().ok())
        .map(|value| *value)
        .ok_or_else(|| BraidError::stream_error("zip frame does not match the source tuple"))
}

macro_rules! impl_zip_sources {
    ($($ty:ident: $idx:tt),+) => {
        impl<$($ty: Send + 'static),+> ZipSources for ($(BraidStream<$ty>,)+) {
            type Output = ($($ty,)+);

            fn into_erased(self) -> Vec<BraidStream<Erased>> {
                vec![$(self.$idx.map(|value| Box::new(value) as Erased)),+]
            }

            fn assemble(values: Vec<Erased>) -> Result<Self::Output> {
                let mut values = values.into_iter();
                Ok(($(restore::<$ty>(values.next())?,)+))
            }
        }
    };
}

impl_zip_sources!(A: 0, B: 1);
impl_zip_sources!(A: 0, B: 1, C: 2);
impl_zip_sources!(A: 0, B: 1, C: 2, D: 3);
impl_zip_sources!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_zip_sources!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_zip_sources!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_zip_sources!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
