//! Shared identification results, so the filesystem classifier and the magic evaluator can both
//! contribute entries to one per-file answer.

/// Where a match entry came from. Filesystem entries are always emitted before magic entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum MatchClass {
    /// Derived from file metadata, without reading any content.
    Filesystem,
    /// Derived from a magic database signature.
    Magic,
}

/// One description fragment attached to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEntry {
    pub class: MatchClass,
    pub desc: String,
}

/// The assembled identification for a single file. An empty result means "cannot identify".
///
/// Created fresh per file and discarded after rendering; nothing in here is shared across files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    entries: Vec<MatchEntry>,
    mime: Option<String>,
}

impl MatchResult {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a description fragment.
    #[inline]
    pub fn push(&mut self, class: MatchClass, desc: impl Into<String>) {
        self.entries.push(MatchEntry { class, desc: desc.into() });
    }

    /// Adopts a mime type if none has been set yet. The first mime to arrive wins, matching the
    /// first-match semantics of the evaluator.
    #[inline]
    pub fn set_mime(&mut self, mime: impl Into<String>) {
        if self.mime.is_none() {
            self.mime = Some(mime.into());
        }
    }

    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[MatchEntry] {
        &self.entries
    }

    #[inline]
    #[must_use]
    pub fn mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders all entries as one human-readable description.
    #[must_use]
    pub fn description(&self) -> String {
        let fragments: Vec<&str> = self.entries.iter().map(|entry| entry.desc.as_str()).collect();
        fragments.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_mime_wins() {
        let mut result = MatchResult::new();
        result.set_mime("inode/fifo");
        result.set_mime("text/plain");
        assert_eq!(result.mime(), Some("inode/fifo"));
    }

    #[test]
    fn description_joins_entries() {
        let mut result = MatchResult::new();
        result.push(MatchClass::Filesystem, "setuid");
        result.push(MatchClass::Magic, "ELF 64-bit LSB executable");
        assert_eq!(result.description(), "setuid, ELF 64-bit LSB executable");
    }
}
