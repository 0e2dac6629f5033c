//! Stable exit codes for taskloop CLI commands.

/// Command succeeded; for `taskloop run`, the pending queue was drained.
pub const OK: i32 = 0;
/// Command failed due to invalid configuration, layout or other errors.
pub const INVALID: i32 = 1;
/// `taskloop run` hit `max_loops` with tasks still pending.
pub const CAP_REACHED: i32 = 2;
/// `taskloop run` was stopped between iterations.
pub const STOPPED: i32 = 3;
