//! This crate implements the "magic" half of [scry](https://crates.io/crates/scry): a text
//! signature database is parsed once into an immutable forest of nested byte-pattern tests, which
//! is then evaluated against the raw bytes of each candidate file.
//!
//! # Format
//! One record per non-comment, non-blank logical line. Lines ending in `\` continue onto the next
//! physical line; lines starting with `#` and lines of one character or less are ignored. Fields
//! are separated by whitespace:
//!
//! ```text
//! <level-markers><offset>  <type>[&mask][/modifier]  <test-data>  <description...>
//! ```
//!
//! | Field | Notes |
//! |-------|-------|
//! | offset | A run of leading `>` markers sets the nesting level. The rest is either a literal offset, or an indirect form `(base[.type][+-adjust])` that reads the test offset out of the file itself. |
//! | type | A type name like `byte`, `beshort`, `lelong`, `string`, optionally `&mask` for numeric types or `/modifiers` for string types. |
//! | test-data | An optional comparison prefix from `=<>&^~x!`, then a literal to compare against: a numeric constant, or a C-escaped byte string. |
//! | description | The literal remainder of the line, printed on a match. May contain printf-style placeholders resolved with the matched value. |
//!
//! A line of the form `!:mime <value>` attaches a mime type to the record above it instead of
//! creating a new one.
//!
//! Records nest by level: a level-N+1 record refines the level-N record before it, and is only
//! evaluated when its parent matched. Top-level records are tried in file order, and the first
//! one to match wins.
//!
//! Malformed lines are logged with their line number and skipped; one bad signature never
//! invalidates the rest of the database. Only failing to read the database file at all is fatal.

mod error;
mod eval;
mod forest;
mod parser;
mod reader;
mod record;

pub mod prelude;

pub use error::{Error, Result};
pub use eval::MagicMatch;
pub use forest::MagicDatabase;
pub use record::{
    CompareOp, Endianness, OffsetSpec, PointerKind, PointerType, SignatureRecord, StringModifiers,
    TestValue, TypeKind, TypeSpec,
};
