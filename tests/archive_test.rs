use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use ecspack::archive::{pack, unpack, ArchiveEntry, WalkOptions, Walker};
use tar::EntryType;
use tempfile::TempDir;

fn make_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("readme"), "top").unwrap();
    fs::create_dir_all(dir.path().join("etc/net")).unwrap();
    fs::write(dir.path().join("etc/hosts"), "127.0.0.1").unwrap();
    fs::write(dir.path().join("etc/net/ifcfg"), "eth0").unwrap();
    fs::create_dir(dir.path().join("var")).unwrap();
    dir
}

fn walk_all(root: &Path) -> Walker {
    Walker::new(
        vec![root.to_path_buf()],
        WalkOptions::default().rebased_on(root),
    )
}

#[test]
fn walk_pack_unpack_round_trips_paths_and_kinds() {
    let dir = make_tree();
    let bytes = pack(Vec::new(), walk_all(dir.path())).unwrap();

    let mut seen = Vec::new();
    unpack(Cursor::new(bytes), |header, _content| {
        seen.push((
            header
                .path()?
                .to_string_lossy()
                .trim_end_matches('/')
                .to_string(),
            header.entry_type(),
        ));
        Ok(())
    })
    .unwrap();

    assert_eq!(
        seen,
        vec![
            ("readme".to_string(), EntryType::Regular),
            ("etc".to_string(), EntryType::Directory),
            ("etc/hosts".to_string(), EntryType::Regular),
            ("etc/net".to_string(), EntryType::Directory),
            ("etc/net/ifcfg".to_string(), EntryType::Regular),
            ("var".to_string(), EntryType::Directory),
        ]
    );
}

#[test]
fn packing_the_same_tree_twice_is_byte_identical() {
    let dir = make_tree();
    let first = pack(Vec::new(), walk_all(dir.path())).unwrap();
    let second = pack(Vec::new(), walk_all(dir.path())).unwrap();
    assert_eq!(first, second);
}

#[test]
fn failing_handler_stops_the_unpack() {
    let entries = vec![
        Ok(ArchiveEntry::file("one", b"1".to_vec())),
        Ok(ArchiveEntry::file("two", b"2".to_vec())),
        Ok(ArchiveEntry::file("three", b"3".to_vec())),
    ];
    let bytes = pack(Vec::new(), entries).unwrap();

    let mut delivered: Vec<PathBuf> = Vec::new();
    let result = unpack(Cursor::new(bytes), |header, _content| {
        delivered.push(header.path()?.into_owned());
        if delivered.len() == 2 {
            anyhow::bail!("handler gave up");
        }
        Ok(())
    });

    let err = result.unwrap_err();
    assert!(err.to_string().contains("handler gave up"));
    // the third entry is never delivered
    assert_eq!(delivered, vec![PathBuf::from("one"), PathBuf::from("two")]);
}

#[test]
fn missing_root_aborts_the_walk() {
    let walker = Walker::new(
        vec![PathBuf::from("/definitely/not/here")],
        WalkOptions::default(),
    );
    assert!(pack(Vec::new(), walker).is_err());
}

#[cfg(unix)]
#[test]
fn symlinks_round_trip_with_their_target() {
    let dir = make_tree();
    std::os::unix::fs::symlink("etc/hosts", dir.path().join("hosts.lnk")).unwrap();

    let bytes = pack(Vec::new(), walk_all(dir.path())).unwrap();
    let mut links = Vec::new();
    unpack(Cursor::new(bytes), |header, _content| {
        if header.entry_type() == EntryType::Symlink {
            links.push((
                header.path()?.into_owned(),
                header.link_name()?.map(|l| l.into_owned()),
            ));
        }
        Ok(())
    })
    .unwrap();

    assert_eq!(
        links,
        vec![(
            PathBuf::from("hosts.lnk"),
            Some(PathBuf::from("etc/hosts"))
        )]
    );
}
