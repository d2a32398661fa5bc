//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

#![allow(dead_code)]

/// Success - every deployment stage settled, or all checks passed
/// (warnings permitted)
pub const SUCCESS: i32 = 0;

/// General error - a fatal deployment action, or at least one failed check
pub const ERROR: i32 = 1;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
