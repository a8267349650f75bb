/*!
 * Path Resolver
 * Turns a logical path into a single-use handle confined to Root
 *
 * Two modes:
 * - Strict: every component is opened relative to the previous one with
 *   no-follow semantics; symlinks are expanded by us, inside Root.
 * - Fallback: Root + cleaned path is canonicalized and prefix-checked.
 *   A concurrent rename between the check and the use can still escape.
 */

mod fallback;
mod logical;
#[cfg(unix)]
mod strict;

pub use logical::LogicalPath;

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

#[cfg(unix)]
use super::platform::unix::DirHandle;
use super::types::{FsError, FsResult};

/// How paths are confined to Root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    /// Relative-open, component by component
    Strict,
    /// Canonicalize and prefix-check
    Fallback,
}

impl ResolutionMode {
    /// Whether this host has the relative-open primitives strict mode needs
    #[must_use]
    pub const fn strict_supported() -> bool {
        cfg!(unix)
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResolutionMode::Strict => write!(f, "strict"),
            ResolutionMode::Fallback => write!(f, "fallback"),
        }
    }
}

/// What the caller is about to do with the final component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Intent {
    pub op: &'static str,
    /// Expand a symlink in the final component (stat, open, chmod, ...)
    pub follow: bool,
}

impl Intent {
    pub const fn follow(op: &'static str) -> Self {
        Self { op, follow: true }
    }

    pub const fn no_follow(op: &'static str) -> Self {
        Self { op, follow: false }
    }
}

/// Relative-open handle: the final component's parent plus its name
///
/// `name` is `.` exactly when the handle is Root itself.
#[cfg(unix)]
#[derive(Debug)]
pub(crate) struct AtHandle {
    pub dir: DirHandle,
    pub name: std::ffi::CString,
}

#[cfg(unix)]
impl AtHandle {
    pub fn is_root(&self) -> bool {
        self.name.as_bytes() == b"."
    }

    /// Open the handle's target as a directory, consuming the handle
    pub fn into_dir(self) -> std::io::Result<DirHandle> {
        if self.is_root() {
            return Ok(self.dir);
        }
        super::platform::unix::open_dir_at(&self.dir, &self.name)
    }
}

/// Canonical absolute path verified to lie inside Root
#[derive(Debug, Clone)]
pub(crate) struct PathHandle {
    pub path: PathBuf,
    pub is_root: bool,
}

/// Single-use resolution result; dropping it releases any open descriptor
#[derive(Debug)]
pub(crate) enum ResolvedHandle {
    #[cfg(unix)]
    At(AtHandle),
    Path(PathHandle),
}

impl ResolvedHandle {
    pub fn is_root(&self) -> bool {
        match self {
            #[cfg(unix)]
            ResolvedHandle::At(at) => at.is_root(),
            ResolvedHandle::Path(handle) => handle.is_root,
        }
    }
}

/// Resolves logical paths against one Root
#[derive(Debug, Clone)]
pub(crate) struct PathResolver {
    root: PathBuf,
    mode: ResolutionMode,
    max_symlinks: u32,
}

impl PathResolver {
    pub fn new(root: PathBuf, mode: ResolutionMode, max_symlinks: u32) -> Self {
        Self {
            root,
            mode,
            max_symlinks,
        }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    /// Resolve `path` for one operation
    pub fn resolve(&self, path: &LogicalPath, intent: Intent) -> FsResult<ResolvedHandle> {
        let intent = Intent {
            follow: intent.follow || path.has_trailing_slash(),
            ..intent
        };
        match self.mode {
            #[cfg(unix)]
            ResolutionMode::Strict => self.resolve_at(path, intent).map(ResolvedHandle::At),
            _ => self.resolve_path(path, intent).map(ResolvedHandle::Path),
        }
    }

    /// Build the logical components a symlink points at
    ///
    /// `parent` is the logical location of the directory holding the link,
    /// `rest` the components still to resolve after it. Absolute targets
    /// must lie inside Root; anything else is an escape.
    pub(super) fn expand_symlink(
        &self,
        path: &LogicalPath,
        intent: Intent,
        parent: &[OsString],
        target: &Path,
        rest: &[OsString],
        expansions: &mut u32,
    ) -> FsResult<Vec<OsString>> {
        *expansions += 1;
        if *expansions > self.max_symlinks {
            return Err(self.escape(intent, path, "too many levels of symbolic links"));
        }
        if target.as_os_str().is_empty() {
            return Err(FsError::NotExist(format!("{} {}", intent.op, path.as_str())));
        }

        let mut joined = if target.is_absolute() {
            let cleaned = PathBuf::from(path_clean::clean(target));
            match cleaned.strip_prefix(&self.root) {
                Ok(inside) => inside.to_path_buf(),
                Err(_) => {
                    return Err(self.escape(intent, path, "symlink target outside the root"))
                }
            }
        } else {
            logical::joined(parent).join(target)
        };
        for component in rest {
            joined.push(component);
        }

        logical::clean_components(&joined)
            .ok_or_else(|| self.escape(intent, path, "symlink target climbs out of the root"))
    }

    /// Log and build the error for an escape attempt
    pub(super) fn escape(&self, intent: Intent, path: &LogicalPath, reason: &str) -> FsError {
        warn!(
            root = %self.root.display(),
            path = %path.as_str(),
            op = intent.op,
            reason,
            "rejected path resolution"
        );
        FsError::BadPathResolution(format!("{} {}: {}", intent.op, path.as_str(), reason))
    }
}
