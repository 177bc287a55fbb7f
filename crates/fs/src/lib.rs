//! This crate implements the filesystem half of [scry](https://crates.io/crates/scry): everything
//! that can be said about a path from its metadata alone, before a single content byte is read.
//!
//! Classification covers the file type (directory, symlink, fifo, socket, device, regular file),
//! the interesting permission bits (setuid, setgid, sticky) and emptiness. Special files are
//! flagged so callers can decide whether opening them for content inspection is safe; reading a
//! fifo, for example, would block.

use std::fs::Metadata;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};

use snafu::prelude::*;

/// Error conditions for when classifying a path.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// Thrown when the path cannot be stat'd at all.
    #[snafu(display("Unable to stat {}: {source}", path.display()))]
    Stat { path: PathBuf, source: std::io::Error },
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// What the metadata alone says about a path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Human-readable findings, in the order they were determined.
    pub entries: Vec<String>,
    /// The `inode/*` mime type for non-regular files.
    pub mime: Option<String>,
    /// Reading content from this path would be unsafe or meaningless (fifo, socket, device).
    pub special: bool,
    /// A plain regular file whose content is worth inspecting.
    pub regular: bool,
    /// A regular file with no content at all.
    pub empty: bool,
}

impl Classification {
    fn note(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    fn mime(&mut self, mime: &str) {
        self.mime = Some(mime.to_owned());
    }
}

/// Classifies `path` from its metadata. With `follow_symlinks` the link target is classified in
/// its place; without it, a symlink is reported as such and never followed.
///
/// # Errors
/// Returns [`Stat`](Error::Stat) if the path's metadata cannot be read at all. A broken symlink
/// under `follow_symlinks` is not an error; it is reported as broken.
pub fn classify<P: AsRef<Path>>(path: P, follow_symlinks: bool) -> Result<Classification> {
    let path = path.as_ref();
    let metadata = std::fs::symlink_metadata(path).context(StatSnafu { path })?;
    log::debug!("classifying {} (mode {:o})", path.display(), metadata.mode());

    let mut result = Classification::default();

    if metadata.file_type().is_symlink() {
        let target = std::fs::read_link(path).context(StatSnafu { path })?;
        if !follow_symlinks {
            result.note(format!("symbolic link to {}", target.display()));
            result.mime("inode/symlink");
            return Ok(result);
        }
        // Re-stat through the link. A dangling target is a finding, not a failure.
        match std::fs::metadata(path) {
            Ok(metadata) => return Ok(classify_metadata(&metadata)),
            Err(_) => {
                result.note(format!("broken symbolic link to {}", target.display()));
                result.mime("inode/symlink");
                return Ok(result);
            }
        }
    }

    Ok(classify_metadata(&metadata))
}

fn classify_metadata(metadata: &Metadata) -> Classification {
    let mut result = Classification::default();
    let file_type = metadata.file_type();

    if file_type.is_dir() {
        result.note("directory");
        result.mime("inode/directory");
        return result;
    }
    if file_type.is_fifo() {
        result.note("fifo (named pipe)");
        result.mime("inode/fifo");
        result.special = true;
        return result;
    }
    if file_type.is_socket() {
        result.note("socket");
        result.mime("inode/socket");
        result.special = true;
        return result;
    }
    if file_type.is_char_device() {
        result.note("character special");
        result.mime("inode/chardevice");
        result.special = true;
        return result;
    }
    if file_type.is_block_device() {
        result.note("block special");
        result.mime("inode/blockdevice");
        result.special = true;
        return result;
    }

    let mode = metadata.mode();
    if mode & 0o4000 != 0 {
        result.note("setuid");
    }
    if mode & 0o2000 != 0 {
        result.note("setgid");
    }
    if mode & 0o1000 != 0 {
        result.note("sticky");
    }

    result.regular = true;
    if metadata.size() == 0 {
        result.note("empty");
        result.mime("inode/x-empty");
        result.empty = true;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    struct Scratch {
        root: PathBuf,
    }

    impl Scratch {
        fn new(tag: &str) -> Self {
            let root = std::env::temp_dir()
                .join(format!("scry-fs-test-{tag}-{}", std::process::id()));
            std::fs::create_dir_all(&root).unwrap();
            Self { root }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.root.join(name)
        }
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.root);
        }
    }

    #[test]
    fn directory() {
        let scratch = Scratch::new("dir");
        let found = classify(&scratch.root, false).unwrap();
        assert_eq!(found.entries, vec!["directory"]);
        assert_eq!(found.mime.as_deref(), Some("inode/directory"));
        assert!(!found.regular && !found.special);
    }

    #[test]
    fn empty_regular_file() {
        let scratch = Scratch::new("empty");
        let path = scratch.path("empty");
        File::create(&path).unwrap();
        let found = classify(&path, false).unwrap();
        assert!(found.regular && found.empty);
        assert_eq!(found.entries, vec!["empty"]);
        assert_eq!(found.mime.as_deref(), Some("inode/x-empty"));
    }

    #[test]
    fn nonempty_regular_file() {
        let scratch = Scratch::new("plain");
        let path = scratch.path("plain");
        File::create(&path).unwrap().write_all(b"content").unwrap();
        let found = classify(&path, false).unwrap();
        assert!(found.regular && !found.empty && !found.special);
        assert!(found.entries.is_empty());
        assert!(found.mime.is_none());
    }

    #[test]
    fn symlink_reported_not_followed() {
        let scratch = Scratch::new("link");
        let target = scratch.path("target");
        File::create(&target).unwrap();
        let link = scratch.path("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let found = classify(&link, false).unwrap();
        assert_eq!(found.entries, vec![format!("symbolic link to {}", target.display())]);
        assert_eq!(found.mime.as_deref(), Some("inode/symlink"));

        let followed = classify(&link, true).unwrap();
        assert!(followed.regular && followed.empty);
    }

    #[test]
    fn broken_symlink_when_following() {
        let scratch = Scratch::new("broken");
        let link = scratch.path("dangling");
        std::os::unix::fs::symlink(scratch.path("gone"), &link).unwrap();
        let found = classify(&link, true).unwrap();
        assert_eq!(found.entries.len(), 1);
        assert!(found.entries[0].starts_with("broken symbolic link to "));
    }

    #[test]
    fn missing_path_is_an_error() {
        let scratch = Scratch::new("missing");
        assert!(matches!(
            classify(scratch.path("nope"), false),
            Err(Error::Stat { .. })
        ));
    }
}
