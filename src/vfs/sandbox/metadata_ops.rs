/*!
 * Metadata Operations
 * stat, permission, ownership and timestamp changes
 */

use std::fs;
use std::time::SystemTime;

use super::super::errno::io_result;
#[cfg(unix)]
use super::super::platform::unix;
use super::super::resolver::{Intent, LogicalPath, ResolvedHandle};
use super::super::types::*;
use super::SandboxFs;

impl SandboxFs {
    pub(crate) fn stat_impl(&self, path: &LogicalPath, follow: bool) -> FsResult<Stat> {
        let intent = if follow {
            Intent::follow("stat")
        } else {
            Intent::no_follow("lstat")
        };
        let name = self.stat_name(path);
        match self.resolve(path, intent)? {
            #[cfg(unix)]
            ResolvedHandle::At(at) => {
                let st = io_result(intent.op, path.as_str(), unix::stat_at(&at.dir, &at.name))?;
                Ok(unix::stat_from_libc(name, &st))
            }
            ResolvedHandle::Path(handle) => {
                let md = io_result(intent.op, path.as_str(), fs::symlink_metadata(&handle.path))?;
                Ok(Stat::from_metadata(name, &md))
            }
        }
    }

    pub(super) fn chmod_impl(&self, path: &LogicalPath, mode: u32) -> FsResult<()> {
        match self.resolve(path, Intent::follow("chmod"))? {
            #[cfg(unix)]
            ResolvedHandle::At(at) => io_result(
                "chmod",
                path.as_str(),
                unix::chmod_at(&at.dir, &at.name, mode),
            ),
            ResolvedHandle::Path(handle) => {
                #[cfg(unix)]
                let permissions = {
                    use std::os::unix::fs::PermissionsExt;
                    fs::Permissions::from_mode(mode)
                };
                #[cfg(not(unix))]
                let permissions = {
                    let md = io_result("chmod", path.as_str(), fs::metadata(&handle.path))?;
                    let mut permissions = md.permissions();
                    permissions.set_readonly(mode & 0o200 == 0);
                    permissions
                };
                io_result(
                    "chmod",
                    path.as_str(),
                    fs::set_permissions(&handle.path, permissions),
                )
            }
        }
    }

    pub(super) fn chown_impl(
        &self,
        path: &LogicalPath,
        uid: Option<u32>,
        gid: Option<u32>,
        follow: bool,
    ) -> FsResult<()> {
        let intent = if follow {
            Intent::follow("chown")
        } else {
            Intent::no_follow("lchown")
        };
        match self.resolve(path, intent)? {
            #[cfg(unix)]
            ResolvedHandle::At(at) => io_result(
                intent.op,
                path.as_str(),
                unix::chown_at(&at.dir, &at.name, uid, gid),
            ),
            ResolvedHandle::Path(handle) => {
                // The leaf was already expanded if following was wanted.
                #[cfg(unix)]
                {
                    io_result(
                        intent.op,
                        path.as_str(),
                        std::os::unix::fs::lchown(&handle.path, uid, gid),
                    )
                }
                #[cfg(not(unix))]
                {
                    let _ = (handle, uid, gid);
                    Err(FsError::Io(format!("{} {}: not supported", intent.op, path.as_str())))
                }
            }
        }
    }

    pub(super) fn chtimes_impl(
        &self,
        path: &LogicalPath,
        atime: SystemTime,
        mtime: SystemTime,
    ) -> FsResult<()> {
        match self.resolve(path, Intent::follow("chtimes"))? {
            #[cfg(unix)]
            ResolvedHandle::At(at) => io_result(
                "chtimes",
                path.as_str(),
                unix::utimens_at(&at.dir, &at.name, atime, mtime),
            ),
            ResolvedHandle::Path(handle) => {
                let file = io_result("chtimes", path.as_str(), fs::File::open(&handle.path))?;
                let times = fs::FileTimes::new()
                    .set_accessed(atime)
                    .set_modified(mtime);
                io_result("chtimes", path.as_str(), file.set_times(times))
            }
        }
    }
}
