/*!
 * Size Aggregation Tests
 */

#![cfg(unix)]

use std::os::unix::fs::symlink;

use pretty_assertions::assert_eq;
use sandbox_fs::{CancelToken, FsError, Visit};

use crate::common::Jail;

fn write(jail: &Jail, relative: &str, len: usize) {
    let path = jail.path(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, vec![7u8; len]).unwrap();
}

#[test]
fn test_nested_sizes() {
    let jail = Jail::new();
    write(&jail, "world/level.dat", 1024);
    write(&jail, "world/region/r.0.0.mca", 4096);
    write(&jail, "world/region/r.0.1.mca", 4096);
    write(&jail, "world/DIM-1/region/r.0.0.mca", 512);
    write(&jail, "logs/latest.log", 10);
    std::fs::create_dir_all(jail.path("empty/nested")).unwrap();

    for fs in jail.engines() {
        assert_eq!(fs.directory_size("world/DIM-1").unwrap(), 512);
        assert_eq!(fs.directory_size("world/region").unwrap(), 8192);
        assert_eq!(fs.directory_size("world").unwrap(), 1024 + 8192 + 512);
        assert_eq!(fs.directory_size("").unwrap(), 1024 + 8192 + 512 + 10);
        assert_eq!(fs.directory_size("empty").unwrap(), 0);
    }
}

#[test]
fn test_hardlinks_counted_once_across_directories() {
    let jail = Jail::new();
    write(&jail, "backups/a/world.tar", 2048);
    std::fs::create_dir_all(jail.path("backups/b")).unwrap();
    std::fs::hard_link(
        jail.path("backups/a/world.tar"),
        jail.path("backups/b/world.tar"),
    )
    .unwrap();
    std::fs::hard_link(
        jail.path("backups/a/world.tar"),
        jail.path("backups/b/copy.tar"),
    )
    .unwrap();

    for fs in jail.engines() {
        assert_eq!(fs.directory_size("backups").unwrap(), 2048);
        // Each subtree counts its first sighting.
        assert_eq!(fs.directory_size("backups/b").unwrap(), 2048);
    }
}

#[test]
fn test_external_symlinks_do_not_count() {
    let jail = Jail::new();
    write(&jail, "data/blob", 100);
    symlink(jail.secret(), jail.path("data/outside")).unwrap();
    symlink(jail.secret().join("keep.txt"), jail.path("data/keep.txt")).unwrap();

    for fs in jail.engines() {
        assert_eq!(fs.directory_size("data").unwrap(), 100);
    }
}

#[test]
fn test_size_through_escaping_symlink_rejected() {
    let jail = Jail::new();
    symlink(jail.secret(), jail.path("outside")).unwrap();

    for fs in jail.engines() {
        assert!(matches!(
            fs.directory_size("outside"),
            Err(FsError::BadPathResolution(_))
        ));
    }
}

#[test]
fn test_size_of_missing_directory() {
    let jail = Jail::new();
    for fs in jail.engines() {
        assert!(fs.directory_size("nope").unwrap_err().is_not_exist());
    }
}

#[test]
fn test_cancel_mid_walk() {
    let jail = Jail::new();
    for n in 0..32 {
        write(&jail, &format!("chunks/{}.bin", n), 1);
    }

    for fs in jail.engines() {
        let cancel = CancelToken::new();
        let mut seen = 0;
        let err = fs
            .walk_with("chunks", &cancel, |_| {
                seen += 1;
                if seen == 3 {
                    cancel.cancel();
                }
                Ok(Visit::Continue)
            })
            .unwrap_err();
        assert!(matches!(err, FsError::Cancelled(_)));
        assert_eq!(seen, 3);

        assert!(matches!(
            fs.directory_size_with("chunks", &cancel),
            Err(FsError::Cancelled(_))
        ));
        assert_eq!(fs.directory_size("chunks").unwrap(), 32);
    }
}
