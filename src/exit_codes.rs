//! Stable exit codes for the engine binary.

/// The invocation succeeded, including the "no ready work" outcome.
pub const OK: i32 = 0;
/// Any engine error (configuration, extraction, dispatch, subprocess).
pub const FAILURE: i32 = 1;
/// advance-next-task is administratively disabled in `engine.toml`.
pub const MODE_DISABLED: i32 = 2;
