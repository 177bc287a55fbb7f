// The identification pipeline gets its own file: it is the one place where the filesystem
// classifier and the magic evaluator meet, and it owns the output format.
use scry_core::prelude::*;
use scry_fs::Classification;
use scry_magic::MagicDatabase;

/// Per-run knobs that affect how a single file is identified.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Options {
    /// Read block and character special files as if they were regular (`-s`).
    pub special: bool,
    /// Follow symbolic links instead of reporting them (`-L`).
    pub dereference: bool,
    /// Render mime types instead of descriptions (`--mime`).
    pub mime: bool,
}

/// Identifies one file and returns the finished output line. Failures to identify a file are
/// reported in its output line; they never abort the run.
pub(crate) fn identify_file(path: &str, database: &MagicDatabase, options: Options) -> String {
    match identify(path, database, options) {
        Ok(result) => format!("{path}: {}", render(&result, options.mime)),
        Err(error) => {
            log::error!("{path}: {error}");
            format!("{path}: {error}")
        }
    }
}

fn identify(
    path: &str,
    database: &MagicDatabase,
    options: Options,
) -> Result<MatchResult, scry_fs::Error> {
    let classification = scry_fs::classify(path, options.dereference)?;

    let mut result = MatchResult::new();
    for entry in &classification.entries {
        result.push(MatchClass::Filesystem, entry);
    }
    if let Some(mime) = &classification.mime {
        result.set_mime(mime);
    }

    if should_read_content(&classification, options.special) {
        match std::fs::read(path) {
            Ok(data) => match database.evaluate(&data) {
                Some(found) => {
                    result.push(MatchClass::Magic, found.description);
                    if let Some(mime) = found.mime {
                        result.set_mime(mime);
                    }
                }
                // Content was readable but matched no signature: the classic fallback.
                None => result.push(MatchClass::Magic, "data"),
            },
            // A file that disappears or turns unreadable between stat and read is classified
            // from its metadata alone.
            Err(error) => log::warn!("unable to read {path}: {error}"),
        }
    }

    Ok(result)
}

/// Content is only read from paths where reading is meaningful and safe: regular files with
/// content, plus devices when `-s` asks for them. Fifos and sockets stay excluded even under
/// `-s`: opening a fifo blocks until a writer appears, and a socket has no byte content to
/// scan, so `-s` deliberately covers devices only.
fn should_read_content(classification: &Classification, read_special: bool) -> bool {
    if classification.regular {
        return !classification.empty;
    }
    read_special && classification.special && classification.mime.as_deref() != Some("inode/fifo")
        && classification.mime.as_deref() != Some("inode/socket")
}

fn render(result: &MatchResult, mime: bool) -> String {
    if mime {
        return result.mime().unwrap_or("application/octet-stream").to_owned();
    }
    match result.is_empty() {
        true => String::from("cannot identify"),
        false => result.description(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fifo() -> Classification {
        Classification {
            entries: vec![String::from("fifo (named pipe)")],
            mime: Some(String::from("inode/fifo")),
            special: true,
            regular: false,
            empty: false,
        }
    }

    fn regular(empty: bool) -> Classification {
        Classification {
            entries: Vec::new(),
            mime: empty.then(|| String::from("inode/x-empty")),
            special: false,
            regular: true,
            empty,
        }
    }

    fn device() -> Classification {
        Classification {
            entries: vec![String::from("block special")],
            mime: Some(String::from("inode/blockdevice")),
            special: true,
            regular: false,
            empty: false,
        }
    }

    #[test]
    fn regular_files_are_read() {
        assert!(should_read_content(&regular(false), false));
        assert!(!should_read_content(&regular(true), false));
    }

    #[test]
    fn fifos_are_never_read() {
        assert!(!should_read_content(&fifo(), false));
        assert!(!should_read_content(&fifo(), true));
    }

    #[test]
    fn devices_are_read_only_on_request() {
        assert!(!should_read_content(&device(), false));
        assert!(should_read_content(&device(), true));
    }

    #[test]
    fn empty_result_renders_cannot_identify() {
        let result = MatchResult::new();
        assert_eq!(render(&result, false), "cannot identify");
        assert_eq!(render(&result, true), "application/octet-stream");
    }

    #[test]
    fn render_prefers_entries_and_mime() {
        let mut result = MatchResult::new();
        result.push(MatchClass::Filesystem, "setuid");
        result.push(MatchClass::Magic, "ELF 64-bit");
        result.set_mime("application/x-executable");
        assert_eq!(render(&result, false), "setuid, ELF 64-bit");
        assert_eq!(render(&result, true), "application/x-executable");
    }
}
