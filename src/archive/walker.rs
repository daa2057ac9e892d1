use std::cmp::Ordering;
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use walkdir::{DirEntry, WalkDir};

use crate::archive::{ArchiveEntry, EntryKind, EntrySource};
use crate::constants::{DEFAULT_DIR_MODE, DEFAULT_FILE_MODE};
use crate::error::PackError;

/// Maps an on-disk path to the name the entry carries inside the archive.
pub type RebaseFn = Box<dyn Fn(&Path) -> PathBuf>;

/// Walk configuration. Defaults mirror what the packing pipeline wants for
/// arbitrary trees: everything included, depth-first, content reads
/// deferred until serialization.
pub struct WalkOptions {
    pub include_empty_file: bool,
    pub include_empty_dir: bool,
    pub recursive: bool,
    pub depth_first: bool,
    pub defer_file_read: bool,
    pub rebase: Option<RebaseFn>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            include_empty_file: true,
            include_empty_dir: true,
            recursive: true,
            depth_first: true,
            defer_file_read: true,
            rebase: None,
        }
    }
}

impl WalkOptions {
    /// Rebase every walked path to be relative to `root`.
    pub fn rebased_on(mut self, root: &Path) -> Self {
        let root = root.to_path_buf();
        self.rebase = Some(Box::new(move |path: &Path| {
            path.strip_prefix(&root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.to_path_buf())
        }));
        self
    }
}

/// Lazy, ordered entry source over a set of root paths.
///
/// A fresh `Walker` is a restartable sequence: each call to `Walker::new`
/// starts over from the roots, but a single iteration cannot be rewound.
/// Entries are produced one at a time; file contents are not read here.
pub struct Walker {
    options: WalkOptions,
    roots: std::vec::IntoIter<PathBuf>,
    current: Option<walkdir::IntoIter>,
}

impl Walker {
    pub fn new(roots: Vec<PathBuf>, options: WalkOptions) -> Self {
        Self {
            options,
            roots: roots.into_iter(),
            current: None,
        }
    }

    fn start_root(&self, root: &Path) -> walkdir::IntoIter {
        let mut walk = WalkDir::new(root).follow_links(false);
        if !self.options.recursive {
            walk = walk.max_depth(0);
        }
        if self.options.depth_first {
            walk = walk.sort_by(sibling_order);
        }
        walk.into_iter()
    }

    /// Convert one directory entry, or skip it (`Ok(None)`).
    fn convert(&self, entry: DirEntry) -> Result<Option<ArchiveEntry>, PackError> {
        let file_type = entry.file_type();
        let kind = if file_type.is_file() {
            EntryKind::File
        } else if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            // device nodes, sockets, fifos: not representable, skipped here
            return Ok(None);
        };

        let path = entry.path();
        let name = match &self.options.rebase {
            Some(rebase) => rebase(path),
            None => path.to_path_buf(),
        };
        if name.as_os_str().is_empty() {
            // the rebase root itself
            return Ok(None);
        }

        let metadata = entry.metadata()?;
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let converted = match kind {
            EntryKind::Directory => {
                if !self.options.include_empty_dir {
                    return Ok(None);
                }
                ArchiveEntry {
                    name,
                    kind,
                    size: 0,
                    mode: mode_of(&metadata, DEFAULT_DIR_MODE),
                    mtime,
                    link_target: None,
                    source: EntrySource::Empty,
                }
            }
            EntryKind::Symlink => {
                let target = fs::read_link(path)?;
                ArchiveEntry {
                    name,
                    kind,
                    size: 0,
                    mode: mode_of(&metadata, DEFAULT_FILE_MODE),
                    mtime,
                    link_target: Some(target),
                    source: EntrySource::Empty,
                }
            }
            EntryKind::File => {
                let size = metadata.len();
                if size == 0 && !self.options.include_empty_file {
                    return Ok(None);
                }
                let source = if size == 0 {
                    EntrySource::Empty
                } else if self.options.defer_file_read {
                    EntrySource::Path(path.to_path_buf())
                } else {
                    EntrySource::Reader(Box::new(File::open(path)?))
                };
                ArchiveEntry {
                    name,
                    kind,
                    size,
                    mode: mode_of(&metadata, DEFAULT_FILE_MODE),
                    mtime,
                    link_target: None,
                    source,
                }
            }
        };
        Ok(Some(converted))
    }
}

impl Iterator for Walker {
    type Item = Result<ArchiveEntry, PackError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                let root = self.roots.next()?;
                self.current = Some(self.start_root(&root));
            }
            let step = self.current.as_mut().and_then(|iter| iter.next());
            match step {
                None => self.current = None,
                Some(Err(err)) => return Some(Err(err.into())),
                Some(Ok(entry)) => match self.convert(entry) {
                    Ok(None) => {}
                    Ok(Some(converted)) => return Some(Ok(converted)),
                    Err(err) => return Some(Err(err)),
                },
            }
        }
    }
}

/// Sibling ordering for depth-first walks: files before directories, then
/// lexical file name within each class. This makes walking a pure function
/// of the tree's structural content.
fn sibling_order(a: &DirEntry, b: &DirEntry) -> Ordering {
    match (a.file_type().is_dir(), b.file_type().is_dir()) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        _ => a.file_name().cmp(b.file_name()),
    }
}

#[cfg(unix)]
fn mode_of(metadata: &fs::Metadata, _fallback: u32) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(_metadata: &fs::Metadata, fallback: u32) -> u32 {
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_temp_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), "world").unwrap();
        fs::write(dir.path().join("a.txt"), "hello").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.txt"), "nested").unwrap();
        dir
    }

    fn names(walker: Walker) -> Vec<String> {
        walker
            .map(|e| e.unwrap().name.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn files_come_before_sibling_directories() {
        let dir = make_temp_tree();
        let options = WalkOptions::default().rebased_on(dir.path());
        let walked = names(Walker::new(vec![dir.path().to_path_buf()], options));
        assert_eq!(walked, vec!["a.txt", "b.txt", "sub", "sub/c.txt"]);
    }

    #[test]
    fn excluding_directories_leaves_only_files() {
        let dir = make_temp_tree();
        let options = WalkOptions {
            include_empty_dir: false,
            ..WalkOptions::default()
        }
        .rebased_on(dir.path());
        let walked = names(Walker::new(vec![dir.path().to_path_buf()], options));
        assert_eq!(walked, vec!["a.txt", "b.txt", "sub/c.txt"]);
    }

    #[test]
    fn empty_files_are_skipped_when_excluded() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("empty"), "").unwrap();
        fs::write(dir.path().join("full"), "x").unwrap();
        let options = WalkOptions {
            include_empty_file: false,
            include_empty_dir: false,
            ..WalkOptions::default()
        }
        .rebased_on(dir.path());
        let walked = names(Walker::new(vec![dir.path().to_path_buf()], options));
        assert_eq!(walked, vec!["full"]);
    }

    #[test]
    fn walking_twice_yields_the_same_sequence() {
        let dir = make_temp_tree();
        let first = names(Walker::new(
            vec![dir.path().to_path_buf()],
            WalkOptions::default().rebased_on(dir.path()),
        ));
        let second = names(Walker::new(
            vec![dir.path().to_path_buf()],
            WalkOptions::default().rebased_on(dir.path()),
        ));
        assert_eq!(first, second);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_entries_carry_their_target() {
        let dir = make_temp_tree();
        std::os::unix::fs::symlink("a.txt", dir.path().join("link")).unwrap();
        let options = WalkOptions {
            include_empty_dir: false,
            ..WalkOptions::default()
        }
        .rebased_on(dir.path());
        let entries: Vec<_> = Walker::new(vec![dir.path().to_path_buf()], options)
            .map(Result::unwrap)
            .collect();
        let link = entries
            .iter()
            .find(|e| e.kind == EntryKind::Symlink)
            .expect("symlink entry");
        assert_eq!(link.name, PathBuf::from("link"));
        assert_eq!(link.link_target.as_deref(), Some(Path::new("a.txt")));
    }
}
