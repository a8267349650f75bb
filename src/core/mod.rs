/*!
 * Core Module
 * Engine-wide constants and serde helpers
 */

pub mod limits;
pub mod serde;
