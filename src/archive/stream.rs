use std::fs::File;
use std::io::{self, Read, Write};

use tar::{Archive, Builder, EntryType, Header};

use crate::archive::{ArchiveEntry, EntryKind, EntrySource};
use crate::error::PackError;

/// Serialize an entry sequence into `dest` as a tar stream.
///
/// Entries are written strictly one after another; a file's content source
/// is resolved only when its turn comes, and the next entry is not started
/// before the previous one is fully flushed into the archive. The sink is
/// handed back so callers can keep digesting or syncing it.
pub fn pack<W, I>(dest: W, entries: I) -> Result<W, PackError>
where
    W: Write,
    I: IntoIterator<Item = Result<ArchiveEntry, PackError>>,
{
    let mut builder = Builder::new(dest);
    for entry in entries {
        append_entry(&mut builder, entry?)?;
    }
    Ok(builder.into_inner()?)
}

fn append_entry<W: Write>(builder: &mut Builder<W>, entry: ArchiveEntry) -> Result<(), PackError> {
    let mut header = Header::new_gnu();
    header.set_mode(entry.mode);
    header.set_mtime(entry.mtime);
    header.set_uid(0);
    header.set_gid(0);

    match entry.kind {
        EntryKind::Directory => {
            match entry.source {
                EntrySource::Empty => {}
                source => {
                    drain(source)?;
                    return Err(PackError::UnsupportedEntry {
                        name: entry.name,
                        reason: "directory entries carry no content".to_string(),
                    });
                }
            }
            header.set_entry_type(EntryType::Directory);
            header.set_size(0);
            builder.append_data(&mut header, &entry.name, io::empty())?;
        }
        EntryKind::Symlink => {
            let target = match entry.link_target {
                Some(target) => target,
                None => {
                    drain(entry.source)?;
                    return Err(PackError::UnsupportedEntry {
                        name: entry.name,
                        reason: "symlink entry is missing its target".to_string(),
                    });
                }
            };
            header.set_entry_type(EntryType::Symlink);
            header.set_size(0);
            builder.append_link(&mut header, &entry.name, &target)?;
        }
        EntryKind::File => {
            header.set_entry_type(EntryType::Regular);
            match entry.source {
                EntrySource::Empty => {
                    header.set_size(0);
                    builder.append_data(&mut header, &entry.name, io::empty())?;
                }
                EntrySource::Bytes(bytes) => {
                    header.set_size(bytes.len() as u64);
                    builder.append_data(&mut header, &entry.name, &bytes[..])?;
                }
                EntrySource::Path(path) => {
                    let file = File::open(&path)?;
                    header.set_size(entry.size);
                    builder.append_data(&mut header, &entry.name, file)?;
                }
                EntrySource::Reader(reader) => {
                    header.set_size(entry.size);
                    builder.append_data(&mut header, &entry.name, reader)?;
                }
            }
        }
    }
    Ok(())
}

/// Consume a pending readable source so a failed pack never leaves the
/// upstream side of a pipe stalled mid-write.
fn drain(source: EntrySource) -> io::Result<u64> {
    match source {
        EntrySource::Reader(mut reader) => io::copy(&mut reader, &mut io::sink()),
        _ => Ok(0),
    }
}

/// Read a tar stream and invoke `handler` once per physical entry.
///
/// The next entry is not parsed before the handler returns, so an archive
/// is never consumed faster than the caller processes it. A handler error
/// aborts the whole unpack with that error. Returns the number of entries
/// the handler saw.
pub fn unpack<R, F>(src: R, mut handler: F) -> anyhow::Result<usize>
where
    R: Read,
    F: FnMut(&Header, &mut dyn Read) -> anyhow::Result<()>,
{
    let mut archive = Archive::new(src);
    let mut count = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let header = entry.header().clone();
        handler(&header, &mut entry)?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingReader {
        remaining: usize,
        consumed: Arc<AtomicUsize>,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.remaining.min(buf.len());
            buf[..n].iter_mut().for_each(|b| *b = 0);
            self.remaining -= n;
            self.consumed.fetch_add(n, Ordering::SeqCst);
            Ok(n)
        }
    }

    #[test]
    fn packed_entries_round_trip() {
        let entries = vec![
            Ok(ArchiveEntry::directory("etc")),
            Ok(ArchiveEntry::file("etc/hello", b"hi".to_vec())),
            Ok(ArchiveEntry::symlink("etc/alias", "hello")),
        ];
        let bytes = pack(Vec::new(), entries).unwrap();

        let mut seen = Vec::new();
        unpack(Cursor::new(bytes), |header, content| {
            let mut data = String::new();
            content.read_to_string(&mut data)?;
            seen.push((
                header.path()?.to_string_lossy().into_owned(),
                header.entry_type(),
                data,
            ));
            Ok(())
        })
        .unwrap();

        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].0.trim_end_matches('/'), "etc");
        assert_eq!(seen[0].1, EntryType::Directory);
        assert_eq!(seen[1].0, "etc/hello");
        assert_eq!(seen[1].2, "hi");
        assert_eq!(seen[2].1, EntryType::Symlink);
    }

    #[test]
    fn unserializable_entry_fails_after_draining_its_source() {
        let consumed = Arc::new(AtomicUsize::new(0));
        let bad = ArchiveEntry {
            source: EntrySource::Reader(Box::new(CountingReader {
                remaining: 2048,
                consumed: consumed.clone(),
            })),
            ..ArchiveEntry::directory("broken")
        };

        let err = pack(Vec::new(), vec![Ok(bad)]).unwrap_err();
        assert!(matches!(err, PackError::UnsupportedEntry { .. }));
        assert_eq!(consumed.load(Ordering::SeqCst), 2048);
    }

    #[test]
    fn pack_stops_at_the_first_walk_error() {
        let entries = vec![
            Ok(ArchiveEntry::file("one", b"1".to_vec())),
            Err(PackError::UnsupportedEntry {
                name: "two".into(),
                reason: "boom".to_string(),
            }),
            Ok(ArchiveEntry::file("three", b"3".to_vec())),
        ];
        assert!(pack(Vec::new(), entries).is_err());
    }

    #[test]
    fn empty_file_entries_are_valid() {
        let bytes = pack(
            Vec::new(),
            vec![Ok(ArchiveEntry::file("empty", Vec::new()))],
        )
        .unwrap();
        let count = unpack(Cursor::new(bytes), |header, _| {
            assert_eq!(header.size()?, 0);
            Ok(())
        })
        .unwrap();
        assert_eq!(count, 1);
    }
}
