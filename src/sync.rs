//! # Synchronization Primitives
//!
//! Interrupt-safe critical section wrapper. The scheduler itself needs no
//! locks — `Scheduler` is a plain value with no internal concurrency — but
//! a firmware that calls `tick()` from an interrupt while mutating the same
//! `Scheduler` from the foreground (via `set_enabled`/`reschedule`) must
//! serialize those calls, and this is the mechanism for that.
//!
//! Built on the `critical-section` crate rather than `cortex_m::interrupt`
//! directly, so the same scheduler builds and runs on the host (for tests)
//! and on whatever target provides a `critical-section` implementation, not
//! only Cortex-M.

/// Execute a closure with interrupts masked on whatever target provides a
/// `critical-section` implementation.
///
/// # Usage
/// ```ignore
/// sync::critical_section(|_cs| {
///     // Access shared scheduler state safely
/// });
/// ```
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(critical_section::CriticalSection) -> R,
{
    critical_section::with(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_closure_and_returns_value() {
        let result = critical_section(|_cs| 2 + 2);
        assert_eq!(result, 4);
    }
}
