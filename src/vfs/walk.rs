/*!
 * Directory Walker
 * Depth-first, pre-order traversal over already-open directory handles
 *
 * Descending reuses the handle opened for the subdirectory, so a walk that
 * has started cannot be diverted by a symlink swapped into an ancestor.
 * Symlinks are visited as leaves and never descended into. Sibling order
 * is the host's directory order.
 */

use std::ffi::OsStr;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use super::cancel::CancelToken;
use super::errno::{io_result, map_io_error};
#[cfg(unix)]
use super::platform::unix::{self, DirHandle};
use super::resolver::{Intent, LogicalPath, ResolvedHandle};
use super::sandbox::SandboxFs;
use super::types::*;
use crate::monitoring::OpSpan;

/// What the walker does after visiting an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visit {
    #[default]
    Continue,
    /// Do not descend into the directory just visited
    SkipDir,
}

/// Directory the visited entry lives in
#[derive(Debug, Clone, Copy)]
enum ParentDir<'a> {
    #[cfg(unix)]
    Handle(&'a DirHandle),
    Path(&'a Path),
}

/// One visited entry
///
/// Borrowed for the duration of the visitor call only.
#[derive(Debug)]
pub struct WalkEntry<'a> {
    parent: ParentDir<'a>,
    name: &'a OsStr,
    relative_path: &'a Path,
    path: &'a LogicalPath,
    metadata: Result<&'a Stat, &'a FsError>,
}

impl<'a> WalkEntry<'a> {
    /// Entry name within its parent
    #[inline]
    pub fn name(&self) -> &OsStr {
        self.name
    }

    /// Path relative to the walk root
    #[inline]
    pub fn relative_path(&self) -> &Path {
        self.relative_path
    }

    /// Logical path relative to Root
    #[inline]
    pub fn logical_path(&self) -> &str {
        self.path.as_str()
    }

    /// lstat of the entry, or why it could not be read or descended into
    #[inline]
    pub fn metadata(&self) -> Result<&Stat, &FsError> {
        self.metadata
    }

    #[must_use]
    pub fn file_type(&self) -> Option<FileType> {
        self.metadata.ok().map(|stat| stat.file_type)
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.file_type() == Some(FileType::Directory)
    }

    /// Open the entry read-only relative to its parent directory
    ///
    /// No re-resolution from Root happens; a symlink leaf is refused.
    pub fn open(&self) -> FsResult<File> {
        let op = "open";
        match self.parent {
            #[cfg(unix)]
            ParentDir::Handle(dir) => {
                let name = io_result(op, self.path.as_str(), unix::c_name(self.name))?;
                io_result(
                    op,
                    self.path.as_str(),
                    unix::open_at(dir, &name, OpenFlags::read_only().to_oflags(), 0),
                )
            }
            ParentDir::Path(dir) => {
                let mut options = OpenFlags::read_only().to_open_options(0);
                #[cfg(unix)]
                {
                    use std::os::unix::fs::OpenOptionsExt;
                    options.custom_flags(libc::O_NOFOLLOW);
                }
                io_result(op, self.path.as_str(), options.open(dir.join(self.name)))
            }
        }
    }
}

impl SandboxFs {
    /// Visit every descendant of `path`, pre-order
    ///
    /// The visitor's error aborts the walk and is returned. When a
    /// subdirectory cannot be opened for descent, the visitor sees that
    /// entry a second time carrying the error; returning `Ok` skips it.
    pub fn walk<F>(&self, path: &str, visit: F) -> FsResult<()>
    where
        F: FnMut(&WalkEntry<'_>) -> FsResult<Visit>,
    {
        self.walk_with(path, &CancelToken::new(), visit)
    }

    /// `walk` that stops between entries once `cancel` fires
    pub fn walk_with<F>(&self, path: &str, cancel: &CancelToken, mut visit: F) -> FsResult<()>
    where
        F: FnMut(&WalkEntry<'_>) -> FsResult<Visit>,
    {
        let span = OpSpan::new("walk", path);
        let _entered = span.enter();

        let result = LogicalPath::parse(path).and_then(|path| {
            match self.resolve(&path, Intent::follow("walk"))? {
                #[cfg(unix)]
                ResolvedHandle::At(at) => {
                    let dir = io_result("walk", path.as_str(), at.into_dir())?;
                    walk_dir_at(&dir, Path::new(""), &path, cancel, &mut visit)
                }
                ResolvedHandle::Path(handle) => {
                    let entries = io_result("walk", path.as_str(), fs::read_dir(&handle.path))?;
                    walk_dir_path(&handle.path, entries, Path::new(""), &path, cancel, &mut visit)
                }
            }
        });
        span.record_result(&result);
        result
    }
}

#[cfg(unix)]
fn walk_dir_at<F>(
    dir: &DirHandle,
    relative: &Path,
    path: &LogicalPath,
    cancel: &CancelToken,
    visit: &mut F,
) -> FsResult<()>
where
    F: FnMut(&WalkEntry<'_>) -> FsResult<Visit>,
{
    let names = io_result("walk", path.as_str(), unix::read_names(dir))?;
    for name in names {
        cancel.check("walk", path.as_str())?;

        let child_relative = relative.join(&name);
        let child = path.child(&name);
        let cname = io_result("walk", child.as_str(), unix::c_name(&name))?;
        let stat = unix::stat_at(dir, &cname)
            .map(|st| unix::stat_from_libc(name.to_string_lossy().into_owned(), &st))
            .map_err(|err| map_io_error("walk", child.as_str(), err));

        let entry = WalkEntry {
            parent: ParentDir::Handle(dir),
            name: &name,
            relative_path: &child_relative,
            path: &child,
            metadata: stat.as_ref(),
        };
        let decision = visit(&entry)?;

        let is_dir = matches!(&stat, Ok(stat) if stat.is_dir());
        if !is_dir || decision == Visit::SkipDir {
            continue;
        }

        match unix::open_dir_at(dir, &cname) {
            Ok(sub) => walk_dir_at(&sub, &child_relative, &child, cancel, visit)?,
            Err(err) => {
                let err = map_io_error("walk", child.as_str(), err);
                let entry = WalkEntry {
                    metadata: Err(&err),
                    ..entry
                };
                visit(&entry)?;
            }
        }
    }
    Ok(())
}

fn walk_dir_path<F>(
    dir: &Path,
    entries: fs::ReadDir,
    relative: &Path,
    path: &LogicalPath,
    cancel: &CancelToken,
    visit: &mut F,
) -> FsResult<()>
where
    F: FnMut(&WalkEntry<'_>) -> FsResult<Visit>,
{
    for entry in entries {
        cancel.check("walk", path.as_str())?;

        let entry = io_result("walk", path.as_str(), entry)?;
        let name = entry.file_name();
        let child_relative = relative.join(&name);
        let child = path.child(&name);
        let stat = entry
            .metadata()
            .map(|md| Stat::from_metadata(name.to_string_lossy().into_owned(), &md))
            .map_err(|err| map_io_error("walk", child.as_str(), err));

        let visited = WalkEntry {
            parent: ParentDir::Path(dir),
            name: &name,
            relative_path: &child_relative,
            path: &child,
            metadata: stat.as_ref(),
        };
        let decision = visit(&visited)?;

        let is_dir = matches!(&stat, Ok(stat) if stat.is_dir());
        if !is_dir || decision == Visit::SkipDir {
            continue;
        }

        let sub_path: PathBuf = dir.join(&name);
        match fs::read_dir(&sub_path) {
            Ok(sub) => walk_dir_path(&sub_path, sub, &child_relative, &child, cancel, visit)?,
            Err(err) => {
                let err = map_io_error("walk", child.as_str(), err);
                let visited = WalkEntry {
                    metadata: Err(&err),
                    ..visited
                };
                visit(&visited)?;
            }
        }
    }
    Ok(())
}
