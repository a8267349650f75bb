/*!
 * Stat
 * Platform-independent metadata with a per-platform raw payload
 */

use super::file_type::FileType;
use super::permissions::Permissions;
use crate::core::serde::system_time_micros;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Metadata for one filesystem object inside the sandbox
///
/// Timestamps are serialized as microseconds since UNIX epoch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Stat {
    pub name: String,
    pub size: u64,
    pub mode: Permissions,
    #[serde(with = "system_time_micros")]
    pub modified: SystemTime,
    pub file_type: FileType,
    pub raw: RawStat,
}

/// Raw stat payload for unix hosts
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RawStat {
    pub dev: u64,
    pub ino: u64,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    /// Full `st_mode`, including the file type bits
    pub mode: u32,
    pub blocks: u64,
    pub atime: i64,
    pub ctime: i64,
}

/// Raw stat payload for hosts without inode metadata
#[cfg(not(unix))]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RawStat {
    pub readonly: bool,
}

impl RawStat {
    /// `(device, inode)` identity for a multiply-linked object
    ///
    /// Returns `None` when the object has a single link, or when the host
    /// exposes no inode metadata; size aggregation then counts it directly.
    #[cfg(unix)]
    #[must_use]
    pub const fn hardlink_key(&self) -> Option<(u64, u64)> {
        if self.nlink > 1 {
            Some((self.dev, self.ino))
        } else {
            None
        }
    }

    #[cfg(not(unix))]
    #[must_use]
    pub const fn hardlink_key(&self) -> Option<(u64, u64)> {
        None
    }
}

impl Stat {
    /// Build a Stat from `std::fs::Metadata` (fallback resolution mode)
    #[must_use]
    pub fn from_metadata(name: String, md: &std::fs::Metadata) -> Self {
        let modified = md.modified().unwrap_or(UNIX_EPOCH);

        #[cfg(unix)]
        let (mode, raw) = {
            use std::os::unix::fs::MetadataExt;
            let raw = RawStat {
                dev: md.dev(),
                ino: md.ino(),
                nlink: md.nlink(),
                uid: md.uid(),
                gid: md.gid(),
                mode: md.mode(),
                blocks: md.blocks(),
                atime: md.atime(),
                ctime: md.ctime(),
            };
            (Permissions::new(md.mode()), raw)
        };

        #[cfg(not(unix))]
        let (mode, raw) = {
            let readonly = md.permissions().readonly();
            let mode = if readonly { 0o444 } else { 0o644 };
            (Permissions::new(mode), RawStat { readonly })
        };

        Self {
            name,
            size: md.len(),
            mode,
            modified,
            file_type: FileType::from_std(md.file_type()),
            raw,
        }
    }

    /// Check if this is a directory
    #[inline(always)]
    #[must_use]
    pub const fn is_dir(&self) -> bool {
        matches!(self.file_type, FileType::Directory)
    }

    /// Check if this is a regular file
    #[inline(always)]
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self.file_type, FileType::File)
    }

    #[inline(always)]
    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        matches!(self.file_type, FileType::Symlink)
    }
}

/// Convert a `(seconds, nanoseconds)` pair relative to the epoch
pub(crate) fn system_time_from_parts(secs: i64, nanos: i64) -> SystemTime {
    let nanos = nanos.clamp(0, 999_999_999) as u32;
    if secs >= 0 {
        UNIX_EPOCH + Duration::new(secs as u64, nanos)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()) + Duration::from_nanos(nanos as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(file_type: FileType) -> Stat {
        Stat {
            name: "server.properties".into(),
            size: 100,
            mode: Permissions::file_default(),
            modified: UNIX_EPOCH + Duration::from_secs(10),
            file_type,
            raw: RawStat::default(),
        }
    }

    #[test]
    fn test_stat_helpers() {
        let stat = sample(FileType::File);
        assert!(stat.is_file());
        assert!(!stat.is_dir());
        assert!(!stat.is_symlink());

        let stat = sample(FileType::Directory);
        assert!(stat.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_hardlink_key_requires_multiple_links() {
        let mut raw = RawStat {
            dev: 3,
            ino: 99,
            nlink: 1,
            ..Default::default()
        };
        assert_eq!(raw.hardlink_key(), None);
        raw.nlink = 2;
        assert_eq!(raw.hardlink_key(), Some((3, 99)));
    }

    #[test]
    fn test_system_time_from_parts() {
        assert_eq!(
            system_time_from_parts(5, 250),
            UNIX_EPOCH + Duration::new(5, 250)
        );
        assert!(system_time_from_parts(-5, 0) < UNIX_EPOCH);
    }

    #[test]
    fn test_stat_serialization() {
        let stat = sample(FileType::File);
        let json = serde_json::to_string(&stat).unwrap();
        assert!(json.contains("\"modified\":10000000"));
        let back: Stat = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stat);
    }
}
