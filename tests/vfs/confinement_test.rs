/*!
 * Confinement Tests
 * No operation may reach outside Root, whatever the logical path says
 */

#![cfg(unix)]

use std::os::unix::fs::symlink;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use sandbox_fs::{FsError, FsResult, OpenFlags, SandboxFs};

use crate::common::{strings, Jail};

fn assert_bad<T: std::fmt::Debug>(result: FsResult<T>, what: &str) {
    match result {
        Err(FsError::BadPathResolution(_)) => {}
        other => panic!("{}: expected BadPathResolution, got {:?}", what, other),
    }
}

/// Every mutating operation pointed at `path`
fn attempt_mutations(fs: &SandboxFs, path: &str) {
    assert_bad(fs.mkdir(path, 0o755), &format!("mkdir {}", path));
    assert_bad(fs.mkdir_all(path, 0o755), &format!("mkdir_all {}", path));
    assert_bad(fs.create(path), &format!("create {}", path));
    assert_bad(
        fs.touch(path, OpenFlags::write_only(), 0o644),
        &format!("touch {}", path),
    );
    assert_bad(fs.remove(path), &format!("remove {}", path));
    assert_bad(fs.remove_all(path), &format!("remove_all {}", path));
    assert_bad(fs.symlink("target", path), &format!("symlink {}", path));
    assert_bad(fs.rename("inside.txt", path), &format!("rename to {}", path));
}

#[test]
fn test_dotdot_escape_is_rejected() {
    let jail = Jail::new();
    std::fs::write(jail.path("inside.txt"), b"x").unwrap();

    for fs in jail.engines() {
        for path in ["../x", "a/../../x", "/../secret/x", "../secret/keep.txt", "./../x"] {
            attempt_mutations(&fs, path);
            assert_bad(fs.stat(path), path);
            assert_bad(fs.chmod(path, 0o777), path);
        }
    }

    assert_eq!(jail.outer_names(), strings(&["jail", "secret"]));
    assert_eq!(jail.secret_names(), strings(&["keep.txt"]));
    assert!(jail.path("inside.txt").exists());
}

#[test]
fn test_symlink_escape_is_rejected() {
    let jail = Jail::new();
    std::fs::write(jail.path("inside.txt"), b"x").unwrap();
    std::fs::create_dir(jail.path("nested")).unwrap();
    symlink(jail.secret(), jail.path("abs")).unwrap();
    symlink("../secret", jail.path("rel")).unwrap();
    symlink("../../secret", jail.path("nested/deep")).unwrap();
    // Dangling: nothing exists at either target.
    symlink("../gone", jail.path("dangling")).unwrap();
    symlink(jail.outer.path().join("gone"), jail.path("dangling_abs")).unwrap();

    for fs in jail.engines() {
        for link in ["dangling", "dangling_abs"] {
            attempt_mutations(&fs, &format!("{}/x", link));
            assert_bad(fs.stat(link), link);
            assert_bad(fs.create(link), link);
            assert_bad(fs.mkdir_all(&format!("{}/a/b", link), 0o755), link);
        }

        for link in ["abs", "rel", "nested/deep"] {
            let through = format!("{}/x", link);
            attempt_mutations(&fs, &through);
            attempt_mutations(&fs, &format!("{}/keep.txt", link));

            // Following the link itself is just as forbidden.
            assert_bad(fs.stat(link), link);
            assert_bad(fs.read_dir(link), link);
            assert_bad(fs.chmod(link, 0o777), link);
            assert_bad(fs.open(&format!("{}/keep.txt", link)), link);
            assert_bad(fs.directory_size(link), link);
        }
    }

    assert_eq!(jail.secret_names(), strings(&["keep.txt"]));
    assert!(!jail.outer.path().join("gone").exists());
    assert_eq!(
        std::fs::read(jail.secret().join("keep.txt")).unwrap(),
        b"do not touch"
    );
}

#[test]
fn test_symlink_leaf_is_not_followed_by_no_follow_ops() {
    let jail = Jail::new();
    symlink(jail.secret().join("keep.txt"), jail.path("leak")).unwrap();

    for fs in jail.engines() {
        assert!(fs.lstat("leak").unwrap().is_symlink());
        assert_bad(fs.stat("leak"), "stat");
        assert_bad(fs.open("leak"), "open");
        assert_bad(
            fs.chtimes("leak", std::time::SystemTime::now(), std::time::SystemTime::now()),
            "chtimes",
        );
        let flags = OpenFlags {
            write: true,
            nofollow: true,
            ..Default::default()
        };
        assert_bad(fs.open_file("leak", flags, 0), "open nofollow");
    }

    let fs = SandboxFs::new(jail.root(), true).unwrap();
    fs.remove("leak").unwrap();
    assert_eq!(jail.secret_names(), strings(&["keep.txt"]));
}

#[test]
fn test_root_cannot_be_removed_or_renamed() {
    let jail = Jail::new();
    std::fs::create_dir(jail.path("dir1")).unwrap();
    std::fs::write(jail.path("dir1/file"), b"data").unwrap();
    std::fs::write(jail.path("world.dat"), b"world").unwrap();
    symlink(".", jail.path("self")).unwrap();
    symlink(jail.root(), jail.path("abs_root")).unwrap();

    for fs in jail.engines() {
        // The link forms reach Root only by following the link.
        for root in ["", ".", "/", "a/..", "self/", "abs_root/", "dir1/../self/"] {
            assert_bad(fs.remove(root), "remove root");
            assert_bad(fs.remove_all(root), "remove_all root");
            assert_bad(fs.rename(root, "x"), "rename root away");
            assert_bad(fs.rename("dir1", root), "rename over root");
        }
    }

    assert!(jail.root().is_dir());
    assert!(jail.path("world.dat").is_file());
    assert!(std::fs::symlink_metadata(jail.path("self")).is_ok());
    assert!(std::fs::symlink_metadata(jail.path("abs_root")).is_ok());
    assert_eq!(
        std::fs::read(jail.path("dir1/file")).unwrap(),
        b"data".to_vec()
    );
}

#[test]
fn test_symlink_loops_are_bounded() {
    let jail = Jail::new();
    symlink("loop_b", jail.path("loop_a")).unwrap();
    symlink("loop_a", jail.path("loop_b")).unwrap();
    symlink("self", jail.path("self")).unwrap();

    for fs in jail.engines() {
        assert_bad(fs.stat("loop_a"), "stat loop");
        assert_bad(fs.mkdir("loop_a/x", 0o755), "mkdir through loop");
        assert_bad(fs.read_dir("self"), "read_dir self loop");
    }
}

#[test]
fn test_symlinks_inside_root_are_followed() {
    let jail = Jail::new();
    std::fs::create_dir_all(jail.path("versions/v1.2.3")).unwrap();
    symlink("versions/v1.2.3", jail.path("current")).unwrap();
    symlink(jail.path("versions"), jail.path("abs_versions")).unwrap();

    for (idx, fs) in jail.engines().into_iter().enumerate() {
        let name = format!("current/server{}.jar", idx);
        fs.create(&name).unwrap();
        assert!(jail.path(&format!("versions/v1.2.3/server{}.jar", idx)).is_file());
        assert!(fs.stat(&format!("abs_versions/v1.2.3/server{}.jar", idx)).unwrap().is_file());
    }
}

const PARTS: &[&str] = &["..", ".", "a", "b", "esc", "abs", ""];

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_no_logical_path_escapes_root(
        parts in proptest::collection::vec(proptest::sample::select(PARTS.to_vec()), 0..6),
        strict in any::<bool>(),
    ) {
        let jail = Jail::new();
        symlink("../secret", jail.path("esc")).unwrap();
        symlink(jail.secret(), jail.path("abs")).unwrap();
        let fs = SandboxFs::new(jail.root(), strict).unwrap();

        let path = parts.join("/");
        let _ = fs.mkdir_all(&path, 0o755);
        let _ = fs.touch(&format!("{}/leaf", path), OpenFlags::write_only(), 0o644);
        let _ = fs.chmod(&path, 0o700);
        let _ = fs.remove_all(&format!("{}/keep.txt", path));
        let _ = fs.rename(&format!("{}/leaf", path), "moved");

        prop_assert_eq!(jail.outer_names(), strings(&["jail", "secret"]));
        prop_assert_eq!(jail.secret_names(), strings(&["keep.txt"]));
        let md = std::fs::metadata(jail.secret()).unwrap();
        prop_assert!(md.is_dir());
    }
}
