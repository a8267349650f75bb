/*!
 * Directory Operations
 * mkdir, removal, rename and listing through resolved handles
 */

use std::fs;
use std::path::Path;

use super::super::cancel::CancelToken;
use super::super::errno::{io_result, map_io_error};
#[cfg(unix)]
use super::super::platform::unix::{self, DirHandle};
use super::super::resolver::{Intent, LogicalPath, ResolvedHandle};
use super::super::types::*;
use super::SandboxFs;
use crate::monitoring::OpSpan;

impl SandboxFs {
    pub(super) fn mkdir_impl(&self, path: &LogicalPath, mode: u32) -> FsResult<()> {
        match self.resolve(path, Intent::no_follow("mkdir"))? {
            #[cfg(unix)]
            ResolvedHandle::At(at) => io_result(
                "mkdir",
                path.as_str(),
                unix::mkdir_at(&at.dir, &at.name, mode),
            ),
            ResolvedHandle::Path(handle) => {
                let mut builder = fs::DirBuilder::new();
                #[cfg(unix)]
                {
                    use std::os::unix::fs::DirBuilderExt;
                    builder.mode(mode);
                }
                #[cfg(not(unix))]
                let _ = mode;
                io_result("mkdir", path.as_str(), builder.create(&handle.path))
            }
        }
    }

    /// Each level is resolved afresh, so a symlink planted between two
    /// levels is caught by the next resolution.
    pub(super) fn mkdir_all_impl(&self, path: &LogicalPath, mode: u32) -> FsResult<()> {
        for prefix in path.prefixes() {
            match self.stat_impl(&prefix, true) {
                Ok(stat) if stat.is_dir() => continue,
                Ok(_) => {
                    return Err(FsError::NotDirectory(format!(
                        "mkdir_all {}",
                        prefix.as_str()
                    )))
                }
                Err(err) if err.is_not_exist() => match self.mkdir_impl(&prefix, mode) {
                    Ok(()) => {}
                    // Lost a race with a concurrent creator; accept a directory.
                    Err(FsError::AlreadyExists(_)) => {
                        if !self.stat_impl(&prefix, true)?.is_dir() {
                            return Err(FsError::NotDirectory(format!(
                                "mkdir_all {}",
                                prefix.as_str()
                            )));
                        }
                    }
                    Err(err) => return Err(err),
                },
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    pub(super) fn remove_impl(&self, path: &LogicalPath) -> FsResult<()> {
        self.reject_root(path, "remove")?;
        let handle = self.resolve(path, Intent::no_follow("remove"))?;
        self.reject_resolved_root(&handle, path, "remove")?;
        match handle {
            #[cfg(unix)]
            ResolvedHandle::At(at) => {
                io_result("remove", path.as_str(), unix::remove_at(&at.dir, &at.name))
            }
            ResolvedHandle::Path(handle) => {
                let md = io_result("remove", path.as_str(), fs::symlink_metadata(&handle.path))?;
                let result = if md.is_dir() {
                    fs::remove_dir(&handle.path)
                } else {
                    fs::remove_file(&handle.path)
                };
                io_result("remove", path.as_str(), result)
            }
        }
    }

    pub(super) fn remove_all_impl(&self, path: &LogicalPath, cancel: &CancelToken) -> FsResult<()> {
        self.reject_root(path, "remove_all")?;
        let span = OpSpan::new("remove_all", path.as_str());
        let _entered = span.enter();

        let result = cancel
            .check("remove_all", path.as_str())
            .and_then(|()| match self.resolve(path, Intent::no_follow("remove_all")) {
                // A missing parent means there is nothing to remove.
                Err(err) if err.is_not_exist() => Ok(()),
                Err(err) => Err(err),
                Ok(handle) => {
                    self.reject_resolved_root(&handle, path, "remove_all")?;
                    match handle {
                        #[cfg(unix)]
                        ResolvedHandle::At(at) => remove_entry_at(&at.dir, &at.name, path, cancel),
                        ResolvedHandle::Path(handle) => {
                            remove_tree_path(&handle.path, path, cancel)
                        }
                    }
                }
            });
        span.record_result(&result);
        result
    }

    pub(super) fn rename_impl(&self, from: &LogicalPath, to: &LogicalPath) -> FsResult<()> {
        self.reject_root(from, "rename")?;
        self.reject_root(to, "rename")?;
        let context = format!("{} -> {}", from.as_str(), to.as_str());

        let source = self.resolve(from, Intent::no_follow("rename"))?;
        self.reject_resolved_root(&source, from, "rename")?;
        let target = self.resolve(to, Intent::no_follow("rename"))?;
        self.reject_resolved_root(&target, to, "rename")?;

        #[allow(unreachable_patterns)]
        match (source, target) {
            #[cfg(unix)]
            (ResolvedHandle::At(old), ResolvedHandle::At(new)) => io_result(
                "rename",
                &context,
                unix::rename_at(&old.dir, &old.name, &new.dir, &new.name),
            ),
            (ResolvedHandle::Path(old), ResolvedHandle::Path(new)) => {
                io_result("rename", &context, fs::rename(&old.path, &new.path))
            }
            _ => Err(FsError::Io(format!("rename {}: mixed resolution modes", context))),
        }
    }

    pub(super) fn read_dir_impl(&self, path: &LogicalPath) -> FsResult<Vec<DirEntry>> {
        let mut entries = match self.resolve(path, Intent::follow("read_dir"))? {
            #[cfg(unix)]
            ResolvedHandle::At(at) => {
                let dir = io_result("read_dir", path.as_str(), at.into_dir())?;
                read_dir_at(&dir, path)?
            }
            ResolvedHandle::Path(handle) => read_dir_path(&handle.path, path)?,
        };
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

/// Treat a vanished target as already handled
fn ignore_missing(result: FsResult<()>) -> FsResult<()> {
    match result {
        Err(err) if err.is_not_exist() => Ok(()),
        other => other,
    }
}

/// Remove one entry of an open directory, recursing through handles
///
/// A direct remove is tried first; only a non-empty directory is opened
/// (without following symlinks) and cleared.
#[cfg(unix)]
fn remove_entry_at(
    parent: &DirHandle,
    name: &std::ffi::CStr,
    path: &LogicalPath,
    cancel: &CancelToken,
) -> FsResult<()> {
    match unix::remove_at(parent, name).map_err(|err| map_io_error("remove_all", path.as_str(), err)) {
        Ok(()) => Ok(()),
        Err(err) if err.is_not_exist() => Ok(()),
        Err(FsError::DirectoryNotEmpty(_)) | Err(FsError::AlreadyExists(_)) => {
            let dir = match unix::open_dir_at(parent, name) {
                Ok(dir) => dir,
                Err(err) => return ignore_missing(Err(map_io_error("remove_all", path.as_str(), err))),
            };
            clear_dir_at(&dir, path, cancel)?;
            ignore_missing(io_result(
                "remove_all",
                path.as_str(),
                unix::rmdir_at(parent, name),
            ))
        }
        Err(err) => Err(err),
    }
}

#[cfg(unix)]
fn clear_dir_at(dir: &DirHandle, path: &LogicalPath, cancel: &CancelToken) -> FsResult<()> {
    let names = io_result("remove_all", path.as_str(), unix::read_names(dir))?;
    for name in names {
        cancel.check("remove_all", path.as_str())?;
        let child = path.child(&name);
        let cname = io_result("remove_all", child.as_str(), unix::c_name(&name))?;
        remove_entry_at(dir, &cname, &child, cancel)?;
    }
    Ok(())
}

/// Fallback-mode tree removal by absolute path
fn remove_tree_path(target: &Path, path: &LogicalPath, cancel: &CancelToken) -> FsResult<()> {
    let md = match fs::symlink_metadata(target) {
        Ok(md) => md,
        Err(err) => return ignore_missing(Err(map_io_error("remove_all", path.as_str(), err))),
    };
    if !md.is_dir() {
        return ignore_missing(io_result("remove_all", path.as_str(), fs::remove_file(target)));
    }

    let entries = match fs::read_dir(target) {
        Ok(entries) => entries,
        Err(err) => return ignore_missing(Err(map_io_error("remove_all", path.as_str(), err))),
    };
    for entry in entries {
        cancel.check("remove_all", path.as_str())?;
        let entry = io_result("remove_all", path.as_str(), entry)?;
        let child = path.child(&entry.file_name());
        remove_tree_path(&entry.path(), &child, cancel)?;
    }
    ignore_missing(io_result("remove_all", path.as_str(), fs::remove_dir(target)))
}

#[cfg(unix)]
fn read_dir_at(dir: &DirHandle, path: &LogicalPath) -> FsResult<Vec<DirEntry>> {
    let names = io_result("read_dir", path.as_str(), unix::read_names(dir))?;
    let mut entries = Vec::with_capacity(names.len());
    for name in names {
        let child = path.child(&name);
        let cname = io_result("read_dir", child.as_str(), unix::c_name(&name))?;
        match unix::stat_at(dir, &cname) {
            Ok(st) => {
                let stat = unix::stat_from_libc(name.to_string_lossy().into_owned(), &st);
                entries.push(DirEntry::new(stat.name.clone(), stat.file_type, Some(stat)));
            }
            Err(err) => {
                let err = map_io_error("read_dir", child.as_str(), err);
                // Removed between listing and stat.
                if !err.is_not_exist() {
                    return Err(err);
                }
            }
        }
    }
    Ok(entries)
}

fn read_dir_path(dir: &Path, path: &LogicalPath) -> FsResult<Vec<DirEntry>> {
    let read = io_result("read_dir", path.as_str(), fs::read_dir(dir))?;
    let mut entries = Vec::new();
    for entry in read {
        let entry = io_result("read_dir", path.as_str(), entry)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        match entry.metadata() {
            Ok(md) => {
                let stat = Stat::from_metadata(name.clone(), &md);
                entries.push(DirEntry::new(name, stat.file_type, Some(stat)));
            }
            Err(err) => {
                let err = map_io_error("read_dir", path.child(&entry.file_name()).as_str(), err);
                if !err.is_not_exist() {
                    return Err(err);
                }
            }
        }
    }
    Ok(entries)
}
