/*!
 * Size Aggregation
 * Recursive apparent size with hardlink deduplication, built on the walker
 *
 * Only regular files contribute. A file with more than one link is counted
 * the first time its (device, inode) pair is seen. Hosts without inode
 * metadata sum apparent sizes directly.
 */

use ahash::AHashSet;

use super::cancel::CancelToken;
use super::sandbox::SandboxFs;
use super::types::FsResult;
use super::walk::Visit;
use crate::monitoring::OpSpan;

impl SandboxFs {
    /// Total bytes of regular files below `path`
    pub fn directory_size(&self, path: &str) -> FsResult<u64> {
        self.directory_size_with(path, &CancelToken::new())
    }

    /// `directory_size` that stops between entries once `cancel` fires
    pub fn directory_size_with(&self, path: &str, cancel: &CancelToken) -> FsResult<u64> {
        let span = OpSpan::new("directory_size", path);
        let _entered = span.enter();

        let mut total = 0u64;
        let mut seen: AHashSet<(u64, u64)> = AHashSet::new();

        let walked = self.walk_with(path, cancel, |entry| {
            match entry.metadata() {
                Ok(stat) if stat.is_file() => {
                    let counted = match stat.raw.hardlink_key() {
                        Some(key) => seen.insert(key),
                        None => true,
                    };
                    if counted {
                        total = total.saturating_add(stat.size);
                    }
                }
                Ok(_) => {}
                // Removed while walking.
                Err(err) if err.is_not_exist() => {}
                Err(err) => return Err(err.clone()),
            }
            Ok(Visit::Continue)
        });

        let result = walked.map(|()| total);
        span.record_result(&result);
        result
    }
}
