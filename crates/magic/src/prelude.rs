//! Convenient re-exports of commonly used data types, designed to make crate usage painless.
//!
//! The contents of this module can be used by including the following in any module:
//! ```
//! use scry_magic::prelude::*;
//! ```

#[doc(inline)]
pub use crate::eval::MagicMatch;
#[doc(inline)]
pub use crate::forest::MagicDatabase;
#[doc(inline)]
pub use crate::record::{
    CompareOp, Endianness, OffsetSpec, PointerKind, PointerType, SignatureRecord, StringModifiers,
    TestValue, TypeKind, TypeSpec,
};

/// Includes [`Error`](crate::Error), which is used in Results returned by
/// [`MagicDatabase`].
pub mod magic {
    #[doc(inline)]
    pub use crate::error::Error;
}
