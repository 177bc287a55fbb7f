//! This crate is a utilities library shared by the [scry](https://crates.io/crates/scry)
//! workspace.
//!
//! The data module contains [`DataCursor`](data::DataCursor), a borrowed, bounds-checked,
//! endian-aware reader used by the magic evaluator for every typed field read. The identify
//! module contains the [`MatchResult`](identify::MatchResult) accumulator that the filesystem
//! classifier and the magic evaluator both feed into.

pub mod data;
pub mod identify;

pub mod prelude;
