/*!
 * Host Error Mapping
 * The single place where raw host error codes are inspected
 */

use std::io;

use super::types::FsError;

/// Translate a host I/O error into the sandbox taxonomy
///
/// `op` and `path` become the error context, e.g. `mkdir a/b`.
pub fn map_io_error(op: &str, path: &str, err: io::Error) -> FsError {
    let context = describe(op, path, &err);
    error_from_kind(classify(&err), context)
}

/// Lift a host `io::Result` into an `FsResult`
#[inline]
pub(crate) fn io_result<T>(op: &str, path: &str, result: io::Result<T>) -> super::types::FsResult<T> {
    result.map_err(|err| map_io_error(op, path, err))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    NotExist,
    AlreadyExists,
    IsDirectory,
    NotDirectory,
    PermissionDenied,
    BadPathResolution,
    DirectoryNotEmpty,
    InvalidArgument,
    Io,
}

fn error_from_kind(class: Class, context: String) -> FsError {
    match class {
        Class::NotExist => FsError::NotExist(context),
        Class::AlreadyExists => FsError::AlreadyExists(context),
        Class::IsDirectory => FsError::IsDirectory(context),
        Class::NotDirectory => FsError::NotDirectory(context),
        Class::PermissionDenied => FsError::PermissionDenied(context),
        Class::BadPathResolution => FsError::BadPathResolution(context),
        Class::DirectoryNotEmpty => FsError::DirectoryNotEmpty(context),
        Class::InvalidArgument => FsError::InvalidArgument(context),
        Class::Io => FsError::Io(context),
    }
}

fn describe(op: &str, path: &str, err: &io::Error) -> String {
    let path = if path.is_empty() { "." } else { path };
    match classify(err) {
        Class::Io | Class::InvalidArgument => format!("{} {}: {}", op, path, err),
        _ => format!("{} {}", op, path),
    }
}

#[cfg(unix)]
fn classify(err: &io::Error) -> Class {
    match err.raw_os_error() {
        Some(libc::ENOENT) => Class::NotExist,
        Some(libc::EEXIST) => Class::AlreadyExists,
        Some(libc::EISDIR) => Class::IsDirectory,
        Some(libc::ENOTDIR) => Class::NotDirectory,
        Some(libc::EACCES) | Some(libc::EPERM) => Class::PermissionDenied,
        Some(libc::ELOOP) => Class::BadPathResolution,
        Some(libc::ENOTEMPTY) => Class::DirectoryNotEmpty,
        Some(libc::EINVAL) => Class::InvalidArgument,
        Some(_) => Class::Io,
        None => classify_kind(err.kind()),
    }
}

#[cfg(not(unix))]
fn classify(err: &io::Error) -> Class {
    classify_kind(err.kind())
}

fn classify_kind(kind: io::ErrorKind) -> Class {
    match kind {
        io::ErrorKind::NotFound => Class::NotExist,
        io::ErrorKind::AlreadyExists => Class::AlreadyExists,
        io::ErrorKind::PermissionDenied => Class::PermissionDenied,
        io::ErrorKind::InvalidInput => Class::InvalidArgument,
        _ => Class::Io,
    }
}
