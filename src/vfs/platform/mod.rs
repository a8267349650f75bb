/*!
 * Platform Primitives
 * Host-specific building blocks for strict resolution
 */

#[cfg(unix)]
pub(crate) mod unix;
