//! Hard-assertion helper for syscalls whose failure means the isolation we
//! are about to claim would be a lie. See spec §4.7: every mount, namespace,
//! pipe, fork, and wait call aborts on error rather than propagating a
//! `Result` — partial isolation is worse than none.

/// Evaluate a `nix::Result<T>` (or any `Result<T, E: std::fmt::Display>`).
/// On `Ok`, yields the value. On `Err`, logs `file:line` plus the error and
/// aborts the process immediately, matching the original's `check()`/
/// `abort()` discipline.
#[macro_export]
macro_rules! checked {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(err) => {
                tracing::error!(
                    file = file!(),
                    line = line!(),
                    error = %err,
                    "fatal syscall failure, aborting"
                );
                std::process::abort();
            }
        }
    };
}
