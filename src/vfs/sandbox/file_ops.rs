/*!
 * File Operations
 * open, touch and symlink handling through resolved handles
 */

use std::fs::{self, File};
use std::path::PathBuf;

use super::super::errno::io_result;
use super::super::resolver::{Intent, LogicalPath, ResolvedHandle};
#[cfg(unix)]
use super::super::platform::unix;
use super::super::types::*;
use super::SandboxFs;
use crate::core::limits::DEFAULT_DIR_MODE;

impl SandboxFs {
    pub(super) fn open_file_impl(
        &self,
        path: &LogicalPath,
        flags: OpenFlags,
        mode: u32,
        op: &'static str,
    ) -> FsResult<File> {
        flags
            .validate()
            .map_err(|err| FsError::InvalidArgument(format!("{} {}: {}", op, path.as_str(), err.context())))?;

        let intent = Intent {
            op,
            follow: !flags.nofollow,
        };
        match self.resolve(path, intent)? {
            #[cfg(unix)]
            ResolvedHandle::At(at) => io_result(
                op,
                path.as_str(),
                unix::open_at(&at.dir, &at.name, flags.to_oflags(), mode),
            ),
            ResolvedHandle::Path(handle) => {
                let mut options = flags.to_open_options(mode);
                #[cfg(unix)]
                {
                    use std::os::unix::fs::OpenOptionsExt;
                    let mut custom = libc::O_NOFOLLOW;
                    if flags.directory {
                        custom |= libc::O_DIRECTORY;
                    }
                    if flags.sync {
                        custom |= libc::O_SYNC;
                    }
                    options.custom_flags(custom);
                }
                let file = io_result(op, path.as_str(), options.open(&handle.path))?;
                #[cfg(not(unix))]
                if flags.directory {
                    let md = io_result(op, path.as_str(), file.metadata())?;
                    if !md.is_dir() {
                        return Err(FsError::NotDirectory(format!("{} {}", op, path.as_str())));
                    }
                }
                Ok(file)
            }
        }
    }

    pub(super) fn touch_impl(&self, path: &LogicalPath, flags: OpenFlags, mode: u32) -> FsResult<File> {
        if !path.is_root() {
            self.mkdir_all_impl(&path.parent(), DEFAULT_DIR_MODE)?;
        }

        let mut flags = flags;
        flags.create = true;
        if !flags.append {
            flags.truncate = true;
        }
        if !flags.is_writable() {
            flags.write = true;
        }
        self.open_file_impl(path, flags, mode, "touch")
    }

    pub(super) fn symlink_impl(&self, target: &str, link: &LogicalPath) -> FsResult<()> {
        if target.contains('\0') {
            return Err(FsError::InvalidArgument(format!(
                "symlink {}: target contains NUL byte",
                link.as_str()
            )));
        }

        match self.resolve(link, Intent::no_follow("symlink"))? {
            #[cfg(unix)]
            ResolvedHandle::At(at) => {
                let target = io_result("symlink", link.as_str(), unix::c_name(target.as_ref()))?;
                io_result(
                    "symlink",
                    link.as_str(),
                    unix::symlink_at(&at.dir, &at.name, &target),
                )
            }
            ResolvedHandle::Path(handle) => {
                #[cfg(unix)]
                {
                    io_result(
                        "symlink",
                        link.as_str(),
                        std::os::unix::fs::symlink(target, &handle.path),
                    )
                }
                #[cfg(not(unix))]
                {
                    let _ = (target, handle);
                    Err(FsError::Io(format!("symlink {}: not supported", link.as_str())))
                }
            }
        }
    }

    pub(super) fn read_link_impl(&self, path: &LogicalPath) -> FsResult<PathBuf> {
        match self.resolve(path, Intent::no_follow("readlink"))? {
            #[cfg(unix)]
            ResolvedHandle::At(at) => io_result(
                "readlink",
                path.as_str(),
                unix::readlink_at(&at.dir, &at.name),
            )
            .map(PathBuf::from),
            ResolvedHandle::Path(handle) => {
                io_result("readlink", path.as_str(), fs::read_link(&handle.path))
            }
        }
    }
}
