/*!
 * Sandboxed Filesystem
 * The operation surface collaborators use for one tenant's data directory
 *
 * Every call parses its logical path, resolves a fresh single-use handle,
 * performs one syscall through it and releases it on every exit path.
 * No handle or resolution outlives the call that made it.
 */

mod dir_ops;
mod file_ops;
mod metadata_ops;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use super::cancel::CancelToken;
use super::errno::io_result;
use super::resolver::{Intent, LogicalPath, PathResolver, ResolutionMode, ResolvedHandle};
use super::types::*;
use crate::config::SandboxConfig;
use crate::core::limits::{DEFAULT_FILE_MODE, MAX_SYMLINK_EXPANSIONS};

/// Filesystem engine confined to one Root
///
/// Holds no mutable state; clone it freely and call it from any thread.
#[derive(Debug, Clone)]
pub struct SandboxFs {
    resolver: PathResolver,
}

impl SandboxFs {
    /// Build an engine over an existing directory
    ///
    /// `strict_resolution` selects relative-open resolution where the host
    /// supports it; otherwise the engine falls back to canonicalize-and-check.
    pub fn new(root: impl AsRef<Path>, strict_resolution: bool) -> FsResult<Self> {
        Self::build(root.as_ref(), strict_resolution, MAX_SYMLINK_EXPANSIONS)
    }

    /// Build an engine from a validated configuration
    pub fn with_config(config: &SandboxConfig) -> FsResult<Self> {
        config
            .validate()
            .map_err(|err| FsError::InvalidArgument(err.to_string()))?;
        Self::build(
            &config.root,
            config.strict_resolution,
            config.max_symlink_expansions,
        )
    }

    fn build(root: &Path, strict_resolution: bool, max_symlinks: u32) -> FsResult<Self> {
        let display = root.display().to_string();
        let canonical = io_result("open root", &display, root.canonicalize())?;
        if !canonical.is_dir() {
            return Err(FsError::NotDirectory(format!("open root {}", display)));
        }

        let mode = if strict_resolution && ResolutionMode::strict_supported() {
            ResolutionMode::Strict
        } else {
            if strict_resolution {
                warn!(
                    root = %canonical.display(),
                    "relative-open primitives unavailable, using fallback resolution"
                );
            }
            ResolutionMode::Fallback
        };

        debug!(root = %canonical.display(), mode = %mode, "sandbox filesystem ready");
        Ok(Self {
            resolver: PathResolver::new(canonical, mode, max_symlinks),
        })
    }

    /// Canonical Root
    #[inline]
    pub fn root(&self) -> &Path {
        self.resolver.root()
    }

    /// Effective resolution mode
    #[inline]
    pub fn mode(&self) -> ResolutionMode {
        self.resolver.mode()
    }

    #[inline]
    pub(crate) fn resolve(&self, path: &LogicalPath, intent: Intent) -> FsResult<ResolvedHandle> {
        self.resolver.resolve(path, intent)
    }

    /// remove, remove_all and rename never act on Root itself
    pub(crate) fn reject_root(&self, path: &LogicalPath, op: &'static str) -> FsResult<()> {
        if path.is_root() {
            return Err(self
                .resolver
                .escape(Intent::no_follow(op), path, "refusing to act on the root"));
        }
        Ok(())
    }

    /// Same rule applied to where a path actually landed
    ///
    /// A symlink to `.` or to Root's absolute path passes `reject_root`
    /// and only shows up here.
    pub(crate) fn reject_resolved_root(
        &self,
        handle: &ResolvedHandle,
        path: &LogicalPath,
        op: &'static str,
    ) -> FsResult<()> {
        if handle.is_root() {
            return Err(self.resolver.escape(
                Intent::no_follow(op),
                path,
                "path resolves to the root",
            ));
        }
        Ok(())
    }

    /// Name reported in a Stat: the final component, or Root's own name
    pub(crate) fn stat_name(&self, path: &LogicalPath) -> String {
        path.file_name().unwrap_or_else(|| {
            self.root()
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "/".to_string())
        })
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// Create or truncate a file for reading and writing (mode 0644)
    pub fn create(&self, path: &str) -> FsResult<File> {
        traced(
            "create",
            with_path(path, |p| {
                self.open_file_impl(p, OpenFlags::create_truncate(), DEFAULT_FILE_MODE, "create")
            }),
        )
    }

    /// Open an existing file read-only
    pub fn open(&self, path: &str) -> FsResult<File> {
        self.open_file(path, OpenFlags::read_only(), 0)
    }

    /// Open with explicit flags; `mode` applies only when a file is created
    pub fn open_file(&self, path: &str, flags: OpenFlags, mode: u32) -> FsResult<File> {
        traced("open", with_path(path, |p| self.open_file_impl(p, flags, mode, "open")))
    }

    /// Create missing parents (0755), then open with create-or-truncate
    pub fn touch(&self, path: &str, flags: OpenFlags, mode: u32) -> FsResult<File> {
        traced("touch", with_path(path, |p| self.touch_impl(p, flags, mode)))
    }

    /// Create `link` pointing at `target`; the target text is stored verbatim
    ///
    /// The target is not checked here: it is confined when the link is
    /// resolved, like every other path.
    pub fn symlink(&self, target: &str, link: &str) -> FsResult<()> {
        traced("symlink", with_path(link, |p| self.symlink_impl(target, p)))
    }

    /// Raw target of a symlink
    pub fn read_link(&self, path: &str) -> FsResult<PathBuf> {
        traced("readlink", with_path(path, |p| self.read_link_impl(p)))
    }

    // =========================================================================
    // Directories
    // =========================================================================

    pub fn mkdir(&self, path: &str, mode: u32) -> FsResult<()> {
        traced("mkdir", with_path(path, |p| self.mkdir_impl(p, mode)))
    }

    /// Create `path` and every missing ancestor, one level at a time
    pub fn mkdir_all(&self, path: &str, mode: u32) -> FsResult<()> {
        traced("mkdir_all", with_path(path, |p| self.mkdir_all_impl(p, mode)))
    }

    /// Remove a file, symlink or empty directory
    pub fn remove(&self, path: &str) -> FsResult<()> {
        traced("remove", with_path(path, |p| self.remove_impl(p)))
    }

    /// Remove a tree; a missing path is success
    ///
    /// Symlinks inside the tree are removed, never followed.
    pub fn remove_all(&self, path: &str) -> FsResult<()> {
        self.remove_all_with(path, &CancelToken::new())
    }

    /// `remove_all` that stops between entries once `cancel` fires
    ///
    /// Entries removed before cancellation stay removed.
    pub fn remove_all_with(&self, path: &str, cancel: &CancelToken) -> FsResult<()> {
        traced(
            "remove_all",
            with_path(path, |p| self.remove_all_impl(p, cancel)),
        )
    }

    /// Atomic rename within Root
    pub fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        let result = LogicalPath::parse(from)
            .and_then(|from| LogicalPath::parse(to).map(|to| (from, to)))
            .and_then(|(from, to)| self.rename_impl(&from, &to));
        traced("rename", result)
    }

    /// Entries of a directory with their lstat, sorted by name
    pub fn read_dir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        traced("read_dir", with_path(path, |p| self.read_dir_impl(p)))
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Metadata, following a symlink in the final component
    pub fn stat(&self, path: &str) -> FsResult<Stat> {
        traced("stat", with_path(path, |p| self.stat_impl(p, true)))
    }

    /// Metadata of the final component itself
    pub fn lstat(&self, path: &str) -> FsResult<Stat> {
        traced("lstat", with_path(path, |p| self.stat_impl(p, false)))
    }

    /// Whether `path` names anything, following symlinks
    pub fn exists(&self, path: &str) -> FsResult<bool> {
        match self.stat(path) {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_exist() => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub fn chmod(&self, path: &str, mode: u32) -> FsResult<()> {
        traced("chmod", with_path(path, |p| self.chmod_impl(p, mode)))
    }

    /// Change ownership; `None` leaves that id unchanged
    pub fn chown(&self, path: &str, uid: Option<u32>, gid: Option<u32>) -> FsResult<()> {
        traced(
            "chown",
            with_path(path, |p| self.chown_impl(p, uid, gid, true)),
        )
    }

    /// Change ownership of a symlink itself
    pub fn lchown(&self, path: &str, uid: Option<u32>, gid: Option<u32>) -> FsResult<()> {
        traced(
            "lchown",
            with_path(path, |p| self.chown_impl(p, uid, gid, false)),
        )
    }

    pub fn chtimes(&self, path: &str, atime: SystemTime, mtime: SystemTime) -> FsResult<()> {
        traced(
            "chtimes",
            with_path(path, |p| self.chtimes_impl(p, atime, mtime)),
        )
    }
}

fn with_path<T>(path: &str, op: impl FnOnce(&LogicalPath) -> FsResult<T>) -> FsResult<T> {
    let path = LogicalPath::parse(path)?;
    op(&path)
}

/// Routine failures at debug; escapes were already logged by the resolver
fn traced<T>(op: &'static str, result: FsResult<T>) -> FsResult<T> {
    if let Err(err) = &result {
        if !err.is_bad_path() {
            debug!(op, kind = err.kind_str(), error = %err, "sandbox operation failed");
        }
    }
    result
}
