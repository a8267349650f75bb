/*!
 * Fallback Resolution
 * Path-based component walk, then a canonical prefix check against Root
 *
 * Intermediate components are inspected with lstat so that a symlink is
 * judged by its target before anything follows it; a dangling link out of
 * Root is an escape, not a missing file. Only the final component is left
 * unresolved so that operations which create or replace it (mkdir,
 * symlink, rename) can still name it.
 */

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::{Intent, LogicalPath, PathHandle, PathResolver};
use crate::vfs::errno::map_io_error;
use crate::vfs::types::{FsError, FsResult};

impl PathResolver {
    pub(super) fn resolve_path(&self, path: &LogicalPath, intent: Intent) -> FsResult<PathHandle> {
        let mut pending: Vec<OsString> = path.components().to_vec();
        let mut expansions = 0u32;

        'restart: loop {
            let Some((name, parents)) = pending.split_last() else {
                return Ok(PathHandle {
                    path: self.root.clone(),
                    is_root: true,
                });
            };

            let mut parent = self.root.clone();
            for (idx, component) in parents.iter().enumerate() {
                let candidate = parent.join(component);
                let md = fs::symlink_metadata(&candidate)
                    .map_err(|err| map_io_error(intent.op, path.as_str(), err))?;
                if md.file_type().is_symlink() {
                    let target = fs::read_link(&candidate)
                        .map_err(|err| map_io_error(intent.op, path.as_str(), err))?;
                    pending = self.expand_symlink(
                        path,
                        intent,
                        &pending[..idx],
                        &target,
                        &pending[idx + 1..],
                        &mut expansions,
                    )?;
                    continue 'restart;
                }
                if !md.is_dir() {
                    return Err(not_directory(intent, path));
                }
                parent = candidate;
            }

            // Anything swapped in since the walk still has to land inside Root.
            let canonical = self.confine(&parent, path, intent)?;
            let candidate = canonical.join(name);
            let leaf = fs::symlink_metadata(&candidate);

            if intent.follow {
                if let Ok(md) = &leaf {
                    if md.file_type().is_symlink() {
                        let target = fs::read_link(&candidate)
                            .map_err(|err| map_io_error(intent.op, path.as_str(), err))?;
                        pending = self.expand_symlink(
                            path,
                            intent,
                            parents,
                            &target,
                            &[],
                            &mut expansions,
                        )?;
                        continue 'restart;
                    }
                }
            }

            if path.has_trailing_slash() {
                if let Ok(md) = &leaf {
                    if !md.is_dir() {
                        return Err(not_directory(intent, path));
                    }
                }
            }

            return Ok(PathHandle {
                path: candidate,
                is_root: false,
            });
        }
    }

    /// Canonicalize an already-walked directory and prefix-check it
    fn confine(&self, dir: &Path, path: &LogicalPath, intent: Intent) -> FsResult<PathBuf> {
        let canonical =
            fs::canonicalize(dir).map_err(|err| map_io_error(intent.op, path.as_str(), err))?;
        if canonical.strip_prefix(&self.root).is_err() {
            return Err(self.escape(intent, path, "parent resolves outside the root"));
        }
        if !canonical.is_dir() {
            return Err(not_directory(intent, path));
        }
        Ok(canonical)
    }
}

fn not_directory(intent: Intent, path: &LogicalPath) -> FsError {
    FsError::NotDirectory(format!("{} {}", intent.op, path.as_str()))
}
