use std::path::PathBuf;

use snafu::prelude::*;

/// Error conditions when loading a magic database.
///
/// Only [`DatabaseIo`](Error::DatabaseIo) aborts a load. Every per-line variant carries the
/// 1-based line number it was found on; the loader logs it and skips that record, so a corrupted
/// line never invalidates the rest of the database.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Unable to read magic database {}: {source}", path.display()))]
    DatabaseIo { path: PathBuf, source: std::io::Error },

    #[snafu(display("line {lineno}: expected offset, type and test fields"))]
    MissingField { lineno: usize },

    #[snafu(display("line {lineno}: unterminated indirect offset"))]
    UnterminatedOffset { lineno: usize },

    #[snafu(display("line {lineno}: malformed offset {text:?}"))]
    BadOffset { lineno: usize, text: String },

    #[snafu(display("line {lineno}: unknown type {name:?}"))]
    UnknownType { lineno: usize, name: String },

    #[snafu(display("line {lineno}: type {name:?} is recognized but not supported"))]
    UnsupportedType { lineno: usize, name: String },

    #[snafu(display("line {lineno}: malformed mask {text:?}"))]
    BadMask { lineno: usize, text: String },

    #[snafu(display("line {lineno}: unknown string modifier {modifier:?}"))]
    BadModifier { lineno: usize, modifier: char },

    #[snafu(display("line {lineno}: malformed test value {text:?}"))]
    BadTestValue { lineno: usize, text: String },

    #[snafu(display("line {lineno}: mime annotation with no preceding record"))]
    OrphanMime { lineno: usize },
}

pub type Result<T> = core::result::Result<T, Error>;
