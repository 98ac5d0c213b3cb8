//! Element types and tensor storage for the umbra inference engine.
//!
//! A `Tensor` is a typed, shaped view over a `Buffer`. The buffer is either
//! owned by the tensor or borrowed from another tensor (or an externally
//! supplied weight buffer), see `Storage`.

#[macro_use]
mod macros;

/// A Smallvec instantiation with 4 embeddable values.
///
/// Used for tensor shapes, strides and operator inputs and outputs, which
/// are nearly always short.
pub type TVec<T> = smallvec::SmallVec<[T; 4]>;

pub type UmbraError = anyhow::Error;
pub type UmbraResult<T> = anyhow::Result<T>;

pub mod prelude {
    pub use crate::datum::{Datum, DatumType};
    pub use crate::tensor::{natural_strides, Buffer, Storage, Tensor};
    pub use crate::tvec;
    pub use crate::TVec;
    pub use crate::{dispatch_datum, UmbraError, UmbraResult};
}

pub mod internal {
    pub use crate::prelude::*;
    pub use crate::tensor::DEFAULT_ALIGNMENT;
    pub use anyhow::{bail, ensure, format_err, Context};
    pub use itertools::Itertools;
    pub use ndarray as umbra_ndarray;
    pub use smallvec as umbra_smallvec;
    pub use std::sync::Arc;
}

pub use anyhow;
pub use itertools;
pub use ndarray;
pub use num_traits;

mod datum;
mod tensor;
