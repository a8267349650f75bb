/*!
 * Sandbox Error Types
 * Closed error taxonomy surfaced to every collaborator of the engine
 */

use miette::Diagnostic;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Sandbox operation result
///
/// # Must Use
/// Filesystem operations can fail and must be handled to prevent data loss
#[must_use = "sandbox operations can fail and must be handled"]
pub type FsResult<T> = Result<T, FsError>;

/// Errors returned by the sandboxed filesystem engine
///
/// Collaborators branch on the variant only, never on host error codes.
/// Every variant carries a non-empty context string naming the logical path.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum FsError {
    #[error("Not exist: {0}")]
    #[diagnostic(
        code(sandbox::not_exist),
        help("The target or one of its parent directories does not exist.")
    )]
    NotExist(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Already exists: {0}")]
    #[diagnostic(code(sandbox::already_exists))]
    AlreadyExists(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Is a directory: {0}")]
    #[diagnostic(code(sandbox::is_directory))]
    IsDirectory(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Not a directory: {0}")]
    #[diagnostic(code(sandbox::not_directory))]
    NotDirectory(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Permission denied: {0}")]
    #[diagnostic(
        code(sandbox::permission_denied),
        help("The host denied access. Check ownership of the tenant data directory.")
    )]
    PermissionDenied(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Bad path resolution: {0}")]
    #[diagnostic(
        code(sandbox::bad_path_resolution),
        help("The path climbs out of the sandbox root, loops through symlinks, or targets the root itself.")
    )]
    BadPathResolution(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Directory not empty: {0}")]
    #[diagnostic(code(sandbox::directory_not_empty))]
    DirectoryNotEmpty(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Cancelled: {0}")]
    #[diagnostic(
        code(sandbox::cancelled),
        help("Work completed before cancellation is left in place.")
    )]
    Cancelled(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("Invalid argument: {0}")]
    #[diagnostic(code(sandbox::invalid_argument))]
    InvalidArgument(#[serde(deserialize_with = "deserialize_nonempty_string")] String),

    #[error("I/O error: {0}")]
    #[diagnostic(code(sandbox::io))]
    Io(#[serde(deserialize_with = "deserialize_nonempty_string")] String),
}

impl FsError {
    /// Stable string name for the error kind (logging only)
    #[must_use]
    pub const fn kind_str(&self) -> &'static str {
        match self {
            FsError::NotExist(_) => "not_exist",
            FsError::AlreadyExists(_) => "already_exists",
            FsError::IsDirectory(_) => "is_directory",
            FsError::NotDirectory(_) => "not_directory",
            FsError::PermissionDenied(_) => "permission_denied",
            FsError::BadPathResolution(_) => "bad_path_resolution",
            FsError::DirectoryNotEmpty(_) => "directory_not_empty",
            FsError::Cancelled(_) => "cancelled",
            FsError::InvalidArgument(_) => "invalid_argument",
            FsError::Io(_) => "io",
        }
    }

    /// Context string attached to the error
    #[must_use]
    pub fn context(&self) -> &str {
        match self {
            FsError::NotExist(s)
            | FsError::AlreadyExists(s)
            | FsError::IsDirectory(s)
            | FsError::NotDirectory(s)
            | FsError::PermissionDenied(s)
            | FsError::BadPathResolution(s)
            | FsError::DirectoryNotEmpty(s)
            | FsError::Cancelled(s)
            | FsError::InvalidArgument(s)
            | FsError::Io(s) => s,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_not_exist(&self) -> bool {
        matches!(self, FsError::NotExist(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_bad_path(&self) -> bool {
        matches!(self, FsError::BadPathResolution(_))
    }
}

/// Deserialize and validate non-empty string for error messages
pub(super) fn deserialize_nonempty_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    if s.is_empty() {
        return Err(serde::de::Error::custom("error message must not be empty"));
    }
    Ok(s)
}
