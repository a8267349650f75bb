/*!
 * Operation Tests
 * Behaviour of the operation surface inside Root
 */

#![cfg(unix)]

use std::io::{Read, Write};
use std::os::unix::fs::{symlink, DirBuilderExt, PermissionsExt};

use pretty_assertions::assert_eq;
use sandbox_fs::{CancelToken, FileType, FsError, OpenFlags, SandboxFs};

use crate::common::{list, strings, Jail};

#[test]
fn test_touch_creates_missing_parents() {
    let jail = Jail::new();
    for (idx, fs) in jail.engines().into_iter().enumerate() {
        let file = format!("t{}/b/c", idx);
        drop(fs.touch(&file, OpenFlags::write_only(), 0o644).unwrap());

        assert_eq!(fs.stat(&format!("t{}", idx)).unwrap().file_type, FileType::Directory);
        assert_eq!(fs.stat(&format!("t{}/b", idx)).unwrap().file_type, FileType::Directory);
        let stat = fs.stat(&file).unwrap();
        assert_eq!(stat.file_type, FileType::File);
        assert_eq!(stat.size, 0);
        assert_eq!(stat.name, "c");
    }
}

#[test]
fn test_mkdir_all_creates_every_level() {
    let jail = Jail::new();
    for (idx, fs) in jail.engines().into_iter().enumerate() {
        let dir = format!("m{}/b/c", idx);
        fs.mkdir_all(&dir, 0o750).unwrap();
        for level in [format!("m{}", idx), format!("m{}/b", idx), dir.clone()] {
            let stat = fs.stat(&level).unwrap();
            assert!(stat.is_dir(), "{}", level);
        }

        // Same mode as a directory created directly under the process umask.
        let reference = jail.outer.path().join(format!("reference{}", idx));
        std::fs::DirBuilder::new().mode(0o750).create(&reference).unwrap();
        let expected = std::fs::metadata(&reference).unwrap().permissions().mode();
        assert_eq!(fs.stat(&dir).unwrap().mode.mode & 0o777, expected & 0o777);
    }
}

#[test]
fn test_mkdir_requires_parent() {
    let jail = Jail::new();
    for fs in jail.engines() {
        assert!(fs.mkdir("no/such/parent", 0o755).unwrap_err().is_not_exist());
        assert!(fs.create("no/such/file").unwrap_err().is_not_exist());
    }
}

#[test]
fn test_remove_all_leaves_external_symlink_target() {
    let jail = Jail::new();
    for (idx, fs) in jail.engines().into_iter().enumerate() {
        let dir = format!("plugins{}", idx);
        std::fs::create_dir_all(jail.path(&format!("{}/cache", dir))).unwrap();
        std::fs::write(jail.path(&format!("{}/cache/blob", dir)), b"blob").unwrap();
        symlink(jail.secret(), jail.path(&format!("{}/external", dir))).unwrap();
        symlink(jail.secret(), jail.path(&format!("{}/cache/external", dir))).unwrap();

        fs.remove_all(&dir).unwrap();
        assert!(!jail.path(&dir).exists());
        assert_eq!(jail.secret_names(), strings(&["keep.txt"]));
    }
}

#[test]
fn test_remove_all_on_symlink_removes_only_the_link() {
    let jail = Jail::new();
    symlink(jail.secret(), jail.path("external")).unwrap();
    let fs = SandboxFs::new(jail.root(), true).unwrap();

    fs.remove_all("external").unwrap();
    assert!(std::fs::symlink_metadata(jail.path("external")).is_err());
    assert_eq!(jail.secret_names(), strings(&["keep.txt"]));
}

#[test]
fn test_remove_all_is_idempotent() {
    let jail = Jail::new();
    for fs in jail.engines() {
        fs.remove_all("never/existed").unwrap();
        fs.remove_all("never").unwrap();

        fs.mkdir_all("gone/deep", 0o755).unwrap();
        fs.remove_all("gone").unwrap();
        fs.remove_all("gone").unwrap();
    }
}

#[test]
fn test_remove_all_cancelled_before_start_removes_nothing() {
    let jail = Jail::new();
    let fs = SandboxFs::new(jail.root(), true).unwrap();
    fs.mkdir_all("logs", 0o755).unwrap();
    for n in 0..4 {
        std::fs::write(jail.path(&format!("logs/{}.log", n)), b"x").unwrap();
    }

    let cancel = CancelToken::new();
    cancel.cancel();
    let err = fs.remove_all_with("logs", &cancel).unwrap_err();
    assert!(matches!(err, FsError::Cancelled(_)));
    assert_eq!(list(&jail.path("logs")).len(), 4);

    fs.remove_all("logs").unwrap();
    assert!(!jail.path("logs").exists());
}

#[test]
fn test_end_to_end_scenario() {
    let jail = Jail::new();
    let parent = jail.outer.path().canonicalize().unwrap();

    for (idx, fs) in jail.engines().into_iter().enumerate() {
        let file = format!("e{}/b/file", idx);
        drop(fs.touch(&file, OpenFlags::write_only(), 0o644).unwrap());
        assert!(fs.stat(&format!("e{}", idx)).unwrap().is_dir());
        assert!(fs.stat(&format!("e{}/b", idx)).unwrap().is_dir());
        let stat = fs.stat(&file).unwrap();
        assert!(stat.is_file());
        assert_eq!(stat.size, 0);

        let escape = format!("escape{}", idx);
        fs.symlink(parent.to_str().unwrap(), &escape).unwrap();
        assert!(matches!(
            fs.mkdir(&format!("{}/x", escape), 0o755),
            Err(FsError::BadPathResolution(_))
        ));
        assert!(!parent.join("x").exists());

        let dir1 = format!("dir{}", idx);
        fs.mkdir(&dir1, 0o755).unwrap();
        fs.create(&format!("{}/contents", dir1)).unwrap();
        assert!(matches!(
            fs.rename(&dir1, ""),
            Err(FsError::BadPathResolution(_))
        ));
        assert!(fs.stat(&dir1).unwrap().is_dir());
        assert!(fs.exists(&format!("{}/contents", dir1)).unwrap());
    }
}

#[test]
fn test_trailing_slash_requires_directory() {
    let jail = Jail::new();
    std::fs::write(jail.path("server.jar"), b"jar").unwrap();
    std::fs::create_dir(jail.path("world")).unwrap();

    for fs in jail.engines() {
        assert!(matches!(fs.stat("server.jar/"), Err(FsError::NotDirectory(_))));
        assert!(matches!(fs.open("server.jar/"), Err(FsError::NotDirectory(_))));
        assert!(fs.stat("world/").unwrap().is_dir());
    }
}

#[test]
fn test_read_and_write_through_engine() {
    let jail = Jail::new();
    for (idx, fs) in jail.engines().into_iter().enumerate() {
        let name = format!("config/server{}.properties", idx);
        let mut file = fs.touch(&name, OpenFlags::write_only(), 0o600).unwrap();
        file.write_all(b"max-players=20\n").unwrap();
        drop(file);

        let mut file = fs.open_file(&name, OpenFlags::append_only(), 0).unwrap();
        file.write_all(b"pvp=false\n").unwrap();
        drop(file);

        let mut contents = String::new();
        fs.open(&name).unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "max-players=20\npvp=false\n");
        assert_eq!(fs.stat(&name).unwrap().mode.mode & 0o777, 0o600);
    }
}

#[test]
fn test_concurrent_operations_on_one_root() {
    let jail = Jail::new();
    let fs = SandboxFs::new(jail.root(), true).unwrap();

    std::thread::scope(|scope| {
        for worker in 0..8 {
            let fs = fs.clone();
            scope.spawn(move || {
                let dir = format!("shared/worker{}", worker);
                fs.mkdir_all(&dir, 0o755).unwrap();
                for n in 0..16 {
                    drop(fs.create(&format!("{}/{}.dat", dir, n)).unwrap());
                }
                fs.remove_all(&dir).unwrap();
            });
        }
    });

    assert!(fs.read_dir("shared").unwrap().is_empty());
}
