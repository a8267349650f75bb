/*!
 * Shared fixtures for sandbox tests
 */

use std::path::{Path, PathBuf};

use sandbox_fs::SandboxFs;
use tempfile::TempDir;

/// `<tmp>/jail` is Root; `<tmp>/secret` sits next to it with one file
pub struct Jail {
    pub outer: TempDir,
}

impl Jail {
    pub fn new() -> Self {
        let outer = TempDir::new().unwrap();
        std::fs::create_dir(outer.path().join("jail")).unwrap();
        std::fs::create_dir(outer.path().join("secret")).unwrap();
        std::fs::write(outer.path().join("secret/keep.txt"), b"do not touch").unwrap();
        Self { outer }
    }

    pub fn root(&self) -> PathBuf {
        self.outer.path().join("jail").canonicalize().unwrap()
    }

    pub fn secret(&self) -> PathBuf {
        self.outer.path().join("secret").canonicalize().unwrap()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Strict and fallback engines over the same Root
    pub fn engines(&self) -> Vec<SandboxFs> {
        vec![
            SandboxFs::new(self.root(), true).unwrap(),
            SandboxFs::new(self.root(), false).unwrap(),
        ]
    }

    /// Names directly under the temp dir holding Root
    pub fn outer_names(&self) -> Vec<String> {
        list(self.outer.path())
    }

    pub fn secret_names(&self) -> Vec<String> {
        list(&self.secret())
    }
}

pub fn list(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
