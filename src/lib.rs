/*!
 * Sandboxed Filesystem Library
 * Per-tenant filesystem engine that confines every operation to one Root
 */

pub mod config;
pub mod core;
pub mod monitoring;
pub mod vfs;

// Re-exports
pub use config::{ConfigError, SandboxConfig};
pub use monitoring::{init_tracing, OpSpan};
pub use vfs::{
    map_io_error, CancelToken, DirEntry, FileType, FsError, FsResult, LogicalPath, OpenFlags,
    Permissions, RawStat, ResolutionMode, SandboxFs, Stat, Visit, WalkEntry,
};
