/*!
 * Sandboxed Filesystem Engine
 * Confines every filesystem operation to one Root directory
 */

pub mod cancel;
pub mod errno;
mod platform;
pub mod resolver;
pub mod sandbox;
pub mod size;
pub mod types;
pub mod walk;

// Re-exports
pub use cancel::CancelToken;
pub use errno::map_io_error;
pub use resolver::{LogicalPath, ResolutionMode};
pub use sandbox::SandboxFs;
pub use types::{
    DirEntry, FileType, FsError, FsResult, OpenFlags, Permissions, RawStat, Stat,
};
pub use walk::{Visit, WalkEntry};
