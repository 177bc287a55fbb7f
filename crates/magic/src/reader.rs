//! The database reader: turns raw database text into a lazy stream of logical lines.

/// Iterator over the logical lines of a magic database.
///
/// Yields `(line_number, line)` pairs with 1-based numbering. Lines ending in a backslash are
/// joined with the following physical line (the yielded number is the first physical line's).
/// Comment lines starting with `#` and lines of one character or less are skipped transparently.
#[derive(Debug)]
pub struct LogicalLines<'a> {
    lines: core::iter::Enumerate<core::str::Lines<'a>>,
}

impl<'a> LogicalLines<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self { lines: text.lines().enumerate() }
    }
}

impl Iterator for LogicalLines<'_> {
    type Item = (usize, String);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (index, first) = self.lines.next()?;
            let lineno = index + 1;

            let mut logical = first.to_owned();
            while logical.ends_with('\\') {
                logical.pop();
                match self.lines.next() {
                    Some((_, continuation)) => logical.push_str(continuation),
                    None => break,
                }
            }

            let trimmed = logical.trim();
            if trimmed.len() <= 1 || trimmed.starts_with('#') {
                continue;
            }
            return Some((lineno, trimmed.to_owned()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_comments_and_blanks() {
        let text = "# a comment\n\n0 string ABCD first\n#another\n>4 byte 1 second\n";
        let lines: Vec<_> = LogicalLines::new(text).collect();
        assert_eq!(lines, vec![
            (3, "0 string ABCD first".to_owned()),
            (5, ">4 byte 1 second".to_owned()),
        ]);
    }

    #[test]
    fn joins_continuation_lines() {
        let text = "0 string ABCD a very \\\nlong description\n";
        let lines: Vec<_> = LogicalLines::new(text).collect();
        assert_eq!(lines, vec![(1, "0 string ABCD a very long description".to_owned())]);
    }

    #[test]
    fn continuation_at_eof_is_tolerated() {
        let lines: Vec<_> = LogicalLines::new("0 byte 0 trailing\\").collect();
        assert_eq!(lines, vec![(1, "0 byte 0 trailing".to_owned())]);
    }

    #[test]
    fn single_character_lines_are_ignored() {
        let lines: Vec<_> = LogicalLines::new(">\nx\n0 byte 0 ok\n").collect();
        assert_eq!(lines, vec![(3, "0 byte 0 ok".to_owned())]);
    }
}
