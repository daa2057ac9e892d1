pub mod stream;
pub mod walker;

pub use stream::{pack, unpack};
pub use walker::{WalkOptions, Walker};

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::{DEFAULT_DIR_MODE, DEFAULT_FILE_MODE};

/// Entry kinds the archive layer serializes. Anything else is filtered out
/// while walking and never reaches the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Symlink,
    Directory,
}

/// Where an entry's content comes from. `Path` keeps the file closed until
/// the entry is actually serialized, so walking a large tree never holds
/// more than one file open.
pub enum EntrySource {
    Empty,
    Bytes(Vec<u8>),
    Path(PathBuf),
    Reader(Box<dyn Read>),
}

impl fmt::Debug for EntrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::Path(path) => write!(f, "Path({})", path.display()),
            Self::Reader(_) => f.write_str("Reader"),
        }
    }
}

/// One archive entry, path already rebased to its in-archive name.
#[derive(Debug)]
pub struct ArchiveEntry {
    pub name: PathBuf,
    pub kind: EntryKind,
    pub size: u64,
    pub mode: u32,
    pub mtime: u64,
    pub link_target: Option<PathBuf>,
    pub source: EntrySource,
}

impl ArchiveEntry {
    /// In-memory file entry; used for the synthetic sequence the assembler
    /// feeds into the final output archive.
    pub fn file(name: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size: bytes.len() as u64,
            mode: DEFAULT_FILE_MODE,
            mtime: epoch_now(),
            link_target: None,
            source: EntrySource::Bytes(bytes),
        }
    }

    /// File entry streamed from disk when serialized; `size` must match the
    /// on-disk length since tar headers are written before the content.
    pub fn file_on_disk(name: impl Into<PathBuf>, path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size,
            mode: DEFAULT_FILE_MODE,
            mtime: epoch_now(),
            link_target: None,
            source: EntrySource::Path(path.into()),
        }
    }

    pub fn directory(name: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
            size: 0,
            mode: DEFAULT_DIR_MODE,
            mtime: epoch_now(),
            link_target: None,
            source: EntrySource::Empty,
        }
    }

    pub fn symlink(name: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Symlink,
            size: 0,
            mode: DEFAULT_FILE_MODE,
            mtime: epoch_now(),
            link_target: Some(target.into()),
            source: EntrySource::Empty,
        }
    }
}

fn epoch_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
