/*!
 * Permissions
 * Unix-style permission bits carried on every Stat
 */

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Permission bits (masked to 0o7777)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(deserialize_with = "deserialize_permission_mode")]
    pub mode: u32,
}

impl Permissions {
    /// Create permissions, masking off file-type bits
    #[inline]
    #[must_use]
    pub const fn new(mode: u32) -> Self {
        Self {
            mode: mode & 0o7777,
        }
    }

    /// Default mode for files created through the sandbox (0o644)
    #[inline]
    #[must_use]
    pub const fn file_default() -> Self {
        Self { mode: 0o644 }
    }

    /// Default mode for directories created through the sandbox (0o755)
    #[inline]
    #[must_use]
    pub const fn dir_default() -> Self {
        Self { mode: 0o755 }
    }

    /// No write bit for the owner
    #[inline(always)]
    #[must_use]
    pub const fn is_readonly(&self) -> bool {
        self.mode & 0o200 == 0
    }

    #[inline(always)]
    #[must_use]
    pub const fn is_executable(&self) -> bool {
        self.mode & 0o111 != 0
    }

    #[inline]
    #[must_use]
    pub const fn user_permissions(&self) -> u32 {
        (self.mode >> 6) & 0o7
    }

    #[inline]
    #[must_use]
    pub const fn group_permissions(&self) -> u32 {
        (self.mode >> 3) & 0o7
    }

    #[inline]
    #[must_use]
    pub const fn other_permissions(&self) -> u32 {
        self.mode & 0o7
    }
}

/// `ls -l` style rendering, e.g. `rwxr-xr--`
impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for bits in [
            self.user_permissions(),
            self.group_permissions(),
            self.other_permissions(),
        ] {
            let r = if bits & 0o4 != 0 { 'r' } else { '-' };
            let w = if bits & 0o2 != 0 { 'w' } else { '-' };
            let x = if bits & 0o1 != 0 { 'x' } else { '-' };
            write!(f, "{}{}{}", r, w, x)?;
        }
        Ok(())
    }
}

/// Deserialize and validate permission mode (must be <= 0o7777)
fn deserialize_permission_mode<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let mode = u32::deserialize(deserializer)?;
    if mode > 0o7777 {
        return Err(serde::de::Error::custom(format!(
            "invalid permission mode: 0o{:o} exceeds maximum 0o7777",
            mode
        )));
    }
    Ok(mode)
}

impl Default for Permissions {
    fn default() -> Self {
        Self::file_default()
    }
}
