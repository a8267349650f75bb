/*!
 * Strict Resolution
 * Component-by-component relative opens anchored on a fresh Root handle
 */

use std::ffi::{CString, OsStr, OsString};
use std::path::Path;

use super::{AtHandle, Intent, LogicalPath, PathResolver};
use crate::vfs::errno::{io_result, map_io_error};
use crate::vfs::platform::unix::{c_name, open_dir_at, readlink_at, stat_at, DirHandle};
use crate::vfs::types::{FileType, FsError, FsResult};

impl PathResolver {
    /// Walk `path` from Root, expanding symlinks ourselves
    ///
    /// Intermediate directories are opened with `O_NOFOLLOW`. A component
    /// that refuses is checked with `readlinkat`; a symlink is expanded and
    /// resolution restarts from Root on the rewritten components.
    pub(super) fn resolve_at(&self, path: &LogicalPath, intent: Intent) -> FsResult<AtHandle> {
        let mut pending: Vec<OsString> = path.components().to_vec();
        let mut expansions = 0u32;

        'restart: loop {
            let mut dir = io_result(intent.op, path.as_str(), DirHandle::open_root(&self.root))?;
            let last = pending.len();

            for idx in 0..last {
                let name = io_result(intent.op, path.as_str(), c_name(&pending[idx]))?;
                let walked = &pending[..idx];
                let rest = &pending[idx + 1..];

                if idx + 1 == last {
                    if intent.follow {
                        if let Ok(target) = readlink_at(&dir, &name) {
                            pending = self.expand_symlink(
                                path,
                                intent,
                                walked,
                                Path::new(&target),
                                rest,
                                &mut expansions,
                            )?;
                            continue 'restart;
                        }
                    }
                    if path.has_trailing_slash() {
                        require_directory(&dir, &name, path, intent)?;
                    }
                    return Ok(AtHandle { dir, name });
                }

                match open_dir_at(&dir, &name) {
                    Ok(next) => dir = next,
                    Err(err) => match readlink_at(&dir, &name) {
                        Ok(target) => {
                            pending = self.expand_symlink(
                                path,
                                intent,
                                walked,
                                Path::new(&target),
                                rest,
                                &mut expansions,
                            )?;
                            continue 'restart;
                        }
                        Err(_) => return Err(map_io_error(intent.op, path.as_str(), err)),
                    },
                }
            }

            // Every component was consumed: the path names Root.
            let name = io_result(intent.op, path.as_str(), c_name(OsStr::new(".")))?;
            return Ok(AtHandle { dir, name });
        }
    }
}

/// A trailing slash demands a directory, when the leaf exists at all
fn require_directory(
    dir: &DirHandle,
    name: &CString,
    path: &LogicalPath,
    intent: Intent,
) -> FsResult<()> {
    match stat_at(dir, name) {
        Ok(st) if FileType::from_mode(st.st_mode as u32) != FileType::Directory => Err(
            FsError::NotDirectory(format!("{} {}", intent.op, path.as_str())),
        ),
        _ => Ok(()),
    }
}
