//! Stable exit codes for taskconv CLI commands.

/// Command succeeded; no errors (and no warnings under `--strict`).
pub const OK: i32 = 0;
/// Lint found violations, or a test phase failed.
pub const FAILED: i32 = 1;
/// Invalid usage, configuration, or an unresolvable target.
pub const INVALID: i32 = 2;
