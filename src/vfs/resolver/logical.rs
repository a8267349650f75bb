/*!
 * Logical Paths
 * Caller-supplied, Root-relative paths after lexical cleaning
 */

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::vfs::types::{FsError, FsResult};

/// A caller-supplied path, always interpreted relative to Root
///
/// `..` is applied lexically; a path that climbs above Root is rejected
/// before any syscall is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalPath {
    components: Vec<OsString>,
    trailing_slash: bool,
    display: String,
}

impl LogicalPath {
    /// Parse and clean a logical path
    ///
    /// Empty, `.` and `/` all name Root. A leading `/` is ignored.
    pub fn parse(path: &str) -> FsResult<Self> {
        if path.contains('\0') {
            return Err(FsError::InvalidArgument(format!(
                "path contains NUL byte: {}",
                path.escape_default()
            )));
        }
        let relative = path.trim_start_matches('/');
        let components = clean_components(Path::new(relative)).ok_or_else(|| {
            FsError::BadPathResolution(format!("{}: path escapes the root", display_of(path)))
        })?;
        let trailing_slash = !components.is_empty() && relative.ends_with('/');
        Ok(Self {
            components,
            trailing_slash,
            display: display_of(path).to_string(),
        })
    }

    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn components(&self) -> &[OsString] {
        &self.components
    }

    #[inline]
    #[must_use]
    pub const fn has_trailing_slash(&self) -> bool {
        self.trailing_slash
    }

    /// The path as the caller wrote it, for error context
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// Final component, lossily converted; `None` for Root
    #[must_use]
    pub fn file_name(&self) -> Option<String> {
        self.components
            .last()
            .map(|name| name.to_string_lossy().into_owned())
    }

    /// Logical path of every ancestor, shortest first, ending with `self`
    ///
    /// `a/b/c` yields `a`, `a/b`, `a/b/c`.
    #[must_use]
    pub fn prefixes(&self) -> Vec<LogicalPath> {
        (1..=self.components.len())
            .map(|len| {
                let components = self.components[..len].to_vec();
                let display = joined(&components).to_string_lossy().into_owned();
                LogicalPath {
                    components,
                    trailing_slash: false,
                    display,
                }
            })
            .collect()
    }

    /// Parent directory; Root's parent is Root
    #[must_use]
    pub fn parent(&self) -> LogicalPath {
        let len = self.components.len().saturating_sub(1);
        let components = self.components[..len].to_vec();
        let display = joined(&components).to_string_lossy().into_owned();
        LogicalPath {
            components,
            trailing_slash: false,
            display,
        }
    }

    /// Child path built from a raw directory entry name
    #[must_use]
    pub fn child(&self, name: &std::ffi::OsStr) -> LogicalPath {
        let mut components = self.components.clone();
        components.push(name.to_os_string());
        let display = joined(&components).to_string_lossy().into_owned();
        LogicalPath {
            components,
            trailing_slash: false,
            display,
        }
    }

    /// Relative filesystem path (empty for Root)
    #[must_use]
    pub fn to_relative_path(&self) -> PathBuf {
        joined(&self.components)
    }
}

fn display_of(path: &str) -> &str {
    if path.is_empty() {
        "."
    } else {
        path
    }
}

pub(crate) fn joined(components: &[OsString]) -> PathBuf {
    components.iter().collect()
}

/// Lexically clean `path` into normal components
///
/// Returns `None` when the cleaned path still starts with `..`.
pub(crate) fn clean_components(path: &Path) -> Option<Vec<OsString>> {
    let cleaned = PathBuf::from(path_clean::clean(path));
    let mut components = Vec::new();
    for component in cleaned.components() {
        match component {
            Component::Normal(name) => components.push(name.to_os_string()),
            Component::ParentDir => return None,
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    Some(components)
}
