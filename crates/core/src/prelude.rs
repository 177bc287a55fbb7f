//! Convenient re-exports of commonly used data types, designed to make crate usage painless.
//!
//! The contents of this module can be used by including the following in any module:
//! ```
//! use scry_core::prelude::*;
//! ```

#[doc(inline)]
pub use crate::data::{DataCursor, Endian, EndianExt, ReadExt, SeekExt};
#[doc(inline)]
pub use crate::identify::{MatchClass, MatchEntry, MatchResult};

/// Includes [`data::DataError`](crate::data::DataError), which is used in Results returned by
/// [`DataCursor`].
pub mod data {
    #[doc(inline)]
    pub use crate::data::DataError;
}
