/*!
 * Open Flags
 * POSIX open-flag vocabulary exposed to collaborators
 */

use super::errors::FsError;
use crate::core::serde::is_false;
use serde::{Deserialize, Serialize};

/// File open flags with compact serialization (only true flags are emitted)
///
/// `cloexec` is always applied by the engine; `large_file` is a no-op on
/// hosts other than Linux, where 64-bit offsets are already the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", default, deny_unknown_fields)]
pub struct OpenFlags {
    #[serde(skip_serializing_if = "is_false")]
    pub read: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub write: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub append: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub create: bool,
    /// Exclusive create (`O_EXCL`)
    #[serde(skip_serializing_if = "is_false")]
    pub create_new: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub truncate: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub sync: bool,
    /// Fail unless the target is a directory (`O_DIRECTORY`)
    #[serde(skip_serializing_if = "is_false")]
    pub directory: bool,
    /// Do not follow a symlink in the final component (`O_NOFOLLOW`)
    #[serde(skip_serializing_if = "is_false")]
    pub nofollow: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub cloexec: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub large_file: bool,
}

impl OpenFlags {
    #[inline]
    #[must_use]
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn write_only() -> Self {
        Self {
            write: true,
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn read_write() -> Self {
        Self {
            read: true,
            write: true,
            ..Default::default()
        }
    }

    /// Read-write, create or truncate (what `create` uses)
    #[inline]
    #[must_use]
    pub fn create_truncate() -> Self {
        Self {
            read: true,
            write: true,
            create: true,
            truncate: true,
            ..Default::default()
        }
    }

    /// Write + exclusive create
    #[inline]
    #[must_use]
    pub fn create_new() -> Self {
        Self {
            write: true,
            create: true,
            create_new: true,
            ..Default::default()
        }
    }

    /// Write + append + create (log files, remote downloads)
    #[inline]
    #[must_use]
    pub fn append_only() -> Self {
        Self {
            write: true,
            append: true,
            create: true,
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_writable(&self) -> bool {
        self.write || self.append
    }

    #[inline]
    #[must_use]
    pub const fn will_create(&self) -> bool {
        self.create || self.create_new
    }

    /// Reject contradictory combinations before any syscall
    #[must_use = "validation result must be checked"]
    pub fn validate(&self) -> Result<(), FsError> {
        if self.create_new && !self.is_writable() {
            return Err(FsError::InvalidArgument(
                "create_new requires write access".into(),
            ));
        }
        if self.truncate && !self.is_writable() {
            return Err(FsError::InvalidArgument(
                "truncate requires write access".into(),
            ));
        }
        if self.append && self.truncate {
            return Err(FsError::InvalidArgument(
                "cannot use both append and truncate".into(),
            ));
        }
        if self.directory && (self.is_writable() || self.will_create()) {
            return Err(FsError::InvalidArgument(
                "directory-only open cannot write or create".into(),
            ));
        }
        Ok(())
    }

    /// Host `open(2)` flags; `O_CLOEXEC` is always set
    #[cfg(unix)]
    #[must_use]
    pub fn to_oflags(&self) -> libc::c_int {
        let mut flags = match (self.read, self.is_writable()) {
            (true, true) => libc::O_RDWR,
            (false, true) => libc::O_WRONLY,
            _ => libc::O_RDONLY,
        };
        flags |= libc::O_CLOEXEC;
        if self.append {
            flags |= libc::O_APPEND;
        }
        if self.create || self.create_new {
            flags |= libc::O_CREAT;
        }
        if self.create_new {
            flags |= libc::O_EXCL;
        }
        if self.truncate {
            flags |= libc::O_TRUNC;
        }
        if self.sync {
            flags |= libc::O_SYNC;
        }
        if self.directory {
            flags |= libc::O_DIRECTORY;
        }
        if self.nofollow {
            flags |= libc::O_NOFOLLOW;
        }
        #[cfg(any(target_os = "linux", target_os = "android"))]
        if self.large_file {
            flags |= libc::O_LARGEFILE;
        }
        flags
    }

    /// Parse host `open(2)` flags as passed by a collaborator
    #[cfg(unix)]
    #[must_use]
    pub fn from_posix(flags: libc::c_int) -> Self {
        let access = flags & libc::O_ACCMODE;
        #[cfg(any(target_os = "linux", target_os = "android"))]
        let large_file = flags & libc::O_LARGEFILE != 0;
        #[cfg(not(any(target_os = "linux", target_os = "android")))]
        let large_file = false;

        Self {
            read: access == libc::O_RDONLY || access == libc::O_RDWR,
            write: access == libc::O_WRONLY || access == libc::O_RDWR,
            append: flags & libc::O_APPEND != 0,
            create: flags & libc::O_CREAT != 0,
            create_new: flags & libc::O_EXCL != 0,
            truncate: flags & libc::O_TRUNC != 0,
            sync: flags & libc::O_SYNC == libc::O_SYNC,
            directory: flags & libc::O_DIRECTORY != 0,
            nofollow: flags & libc::O_NOFOLLOW != 0,
            cloexec: flags & libc::O_CLOEXEC != 0,
            large_file,
        }
    }

    /// Equivalent `std::fs::OpenOptions` (fallback resolution mode)
    ///
    /// `directory`, `nofollow`, `sync` and `large_file` have no portable
    /// equivalent here; the caller enforces `directory` and `nofollow`.
    #[must_use]
    pub fn to_open_options(&self, mode: u32) -> std::fs::OpenOptions {
        let mut options = std::fs::OpenOptions::new();
        options
            .read(self.read || !self.is_writable())
            .write(self.write)
            .append(self.append)
            .truncate(self.truncate)
            .create(self.create && !self.create_new)
            .create_new(self.create_new);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;
        options
    }
}
