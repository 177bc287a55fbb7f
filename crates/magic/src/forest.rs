//! The test forest builder: assembles the ordered record stream into a forest of nested tests,
//! and owns the resulting database.

use std::path::Path;

use snafu::prelude::*;

use crate::error::{DatabaseIoSnafu, Error, Result};
use crate::eval::{self, MagicMatch};
use crate::parser::{parse_line, ParsedLine};
use crate::reader::LogicalLines;
use crate::record::SignatureRecord;

/// A parsed magic database: an ordered forest of signature records.
///
/// Built once, immutable thereafter. Evaluation borrows it read-only, so one database can be
/// shared across any number of per-file evaluations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MagicDatabase {
    roots: Vec<SignatureRecord>,
}

impl MagicDatabase {
    /// Reads and parses the database file at `path`.
    ///
    /// # Errors
    /// Returns [`DatabaseIo`](Error::DatabaseIo) if the file cannot be read at all. Malformed
    /// records inside a readable file are logged and skipped, never returned as errors.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::info!("loading magic database from {}", path.display());
        let text = std::fs::read_to_string(path).context(DatabaseIoSnafu { path })?;
        Ok(Self::parse(&text))
    }

    /// Parses database text into a forest. Malformed lines are warned about (with their line
    /// number) and skipped; a text yielding zero records is a valid, empty database that simply
    /// never matches anything.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut builder = ForestBuilder::default();
        let mut records = 0usize;

        for (lineno, line) in LogicalLines::new(text) {
            match parse_line(&line, lineno) {
                Ok(ParsedLine::Record(record)) => {
                    records += 1;
                    builder.push(record);
                }
                Ok(ParsedLine::Mime(value)) => {
                    if !builder.attach_mime(value) {
                        log::warn!("skipping magic record: {}", Error::OrphanMime { lineno });
                    }
                }
                Err(error) => log::warn!("skipping magic record: {error}"),
            }
        }

        let database = Self { roots: builder.finish() };
        log::info!("loaded {records} magic records ({} top-level tests)", database.roots.len());
        database
    }

    /// The top-level records, in file order.
    #[inline]
    #[must_use]
    pub fn roots(&self) -> &[SignatureRecord] {
        &self.roots
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Evaluates the forest against a file's bytes. Top-level records are tried in file order
    /// and the first match wins; `None` means no signature matched.
    #[must_use]
    pub fn evaluate(&self, data: &[u8]) -> Option<MagicMatch> {
        eval::evaluate(self, data)
    }
}

/// Maintains the stack of currently open ancestor records while consuming the parsed stream in
/// file order.
#[derive(Debug, Default)]
struct ForestBuilder {
    roots: Vec<SignatureRecord>,
    stack: Vec<SignatureRecord>,
}

impl ForestBuilder {
    /// Closes any open records at or below the incoming level, then opens the new record as a
    /// child of the remaining top (or as a new root).
    fn push(&mut self, record: SignatureRecord) {
        while self.stack.last().is_some_and(|open| open.level >= record.level) {
            self.close_one();
        }
        self.stack.push(record);
    }

    /// Binds a mime annotation to the most recently emitted record. Returns false if there is
    /// no record to bind to.
    fn attach_mime(&mut self, value: String) -> bool {
        match self.stack.last_mut() {
            Some(open) => {
                open.mime = Some(value);
                true
            }
            None => false,
        }
    }

    fn close_one(&mut self) {
        if let Some(record) = self.stack.pop() {
            match self.stack.last_mut() {
                Some(parent) => parent.children.push(record),
                None => self.roots.push(record),
            }
        }
    }

    fn finish(mut self) -> Vec<SignatureRecord> {
        while !self.stack.is_empty() {
            self.close_one();
        }
        self.roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_sequence_builds_expected_forest() {
        // Levels [0, 1, 2, 1, 0]: two roots, the first with a child that has its own child plus
        // a second direct child, the second root bare.
        let text = "0 byte 0 a\n>4 byte 0 b\n>>8 byte 0 c\n>12 byte 0 d\n0 byte 1 e\n";
        let db = MagicDatabase::parse(text);

        assert_eq!(db.roots().len(), 2);
        let first = &db.roots()[0];
        assert_eq!(first.description, "a");
        assert_eq!(first.children.len(), 2);
        assert_eq!(first.children[0].description, "b");
        assert_eq!(first.children[0].children.len(), 1);
        assert_eq!(first.children[0].children[0].description, "c");
        assert_eq!(first.children[1].description, "d");
        assert!(first.children[1].children.is_empty());
        assert!(db.roots()[1].children.is_empty());
    }

    #[test]
    fn level_jump_attaches_to_nearest_shallower_ancestor() {
        let text = "0 byte 0 root\n>>8 byte 0 deep\n";
        let db = MagicDatabase::parse(text);
        assert_eq!(db.roots().len(), 1);
        assert_eq!(db.roots()[0].children.len(), 1);
        assert_eq!(db.roots()[0].children[0].level, 2);
    }

    #[test]
    fn mime_binds_to_preceding_record() {
        let text = "0 string ABCD test\n!:mime application/x-test\n>4 byte 1 more\n";
        let db = MagicDatabase::parse(text);
        assert_eq!(db.roots()[0].mime.as_deref(), Some("application/x-test"));
        assert!(db.roots()[0].children[0].mime.is_none());
    }

    #[test]
    fn mime_line_never_creates_a_record() {
        let text = "0 byte 0 a\n!:mime x/y\n0 byte 1 b\n";
        assert_eq!(MagicDatabase::parse(text).roots().len(), 2);
    }

    #[test]
    fn orphan_mime_is_skipped() {
        let db = MagicDatabase::parse("!:mime x/y\n0 byte 0 a\n");
        assert_eq!(db.roots().len(), 1);
        assert!(db.roots()[0].mime.is_none());
    }

    #[test]
    fn malformed_line_does_not_invalidate_the_rest() {
        let text = "0 byte\n0 string ABCD ok\n";
        let db = MagicDatabase::parse(text);
        assert_eq!(db.roots().len(), 1);
        assert_eq!(db.roots()[0].description, "ok");
    }

    #[test]
    fn empty_database_is_valid() {
        let db = MagicDatabase::parse("# nothing but comments\n");
        assert!(db.is_empty());
        assert!(db.evaluate(b"anything").is_none());
    }
}
