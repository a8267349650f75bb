/*!
 * Sandbox Limits and Constants
 *
 * Centralized location for the engine's limits, defaults and thresholds.
 * Grouped by domain; security-relevant values are marked with [SECURITY].
 */

use std::time::Duration;

// =============================================================================
// PATH RESOLUTION
// =============================================================================

/// Symlink expansions allowed while resolving one logical path
/// [SECURITY] Turns symlink loops into a bounded `BadPathResolution`
/// Matches the Linux kernel's MAXSYMLINKS
pub const MAX_SYMLINK_EXPANSIONS: u32 = 40;

/// Upper bound accepted from configuration
pub const MAX_SYMLINK_EXPANSIONS_LIMIT: u32 = 255;

// =============================================================================
// DEFAULT MODES
// =============================================================================

/// Mode for files created by `create` and `touch`
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Mode for directories created implicitly (touch parents, CLI `mkdir -p`)
pub const DEFAULT_DIR_MODE: u32 = 0o755;

// =============================================================================
// OBSERVABILITY
// =============================================================================

/// Tree operations slower than this log a warning
pub const SLOW_OPERATION_THRESHOLD: Duration = Duration::from_millis(500);
