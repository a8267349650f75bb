/*!
 * Sandbox Types
 * Shared types for filesystem operations with serde support
 */

mod entry;
mod errors;
mod file_type;
mod metadata;
mod open_flags;
mod permissions;

pub use entry::DirEntry;
pub use errors::{FsError, FsResult};
pub use file_type::FileType;
pub(crate) use metadata::system_time_from_parts;
pub use metadata::{RawStat, Stat};
pub use open_flags::OpenFlags;
pub use permissions::Permissions;
