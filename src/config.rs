//! # Scheduler Configuration
//!
//! Compile-time constants governing scheduler behavior. All limits are
//! fixed at compile time — no dynamic allocation.

/// Minimum allowed period for any task, in microseconds. `reschedule`
/// clamps any requested period below this up to this value.
pub const SCHEDULER_DELAY_LIMIT: u32 = 100;

/// Minimum slack, in microseconds, before the real-time task's deadline
/// required to run the best-effort aging/selection pass at all. Below this,
/// the tick returns immediately after checking the real-time task.
pub const GUARD_INTERVAL_US: u32 = 5;

/// Assumed execution cost for a candidate task when statistics are
/// disabled, in microseconds. Used directly as the admission budget.
pub const TASK_AVERAGE_EXECUTE_FALLBACK_US: u32 = 30;

/// Safety margin added on top of a task's measured moving-average
/// execution time when statistics are enabled, in microseconds.
pub const TASK_AVERAGE_EXECUTE_PADDING_US: u32 = 5;

/// Window size for the exponential-style moving sums
/// (`sum += sample - sum / W`) used for per-task execution and delta time.
pub const TASK_STATS_MOVING_SUM_COUNT: u32 = 32;

/// Smoothing factor for the cycle-time low-pass filter, expressed as a
/// fraction: `avg += (sample - avg) * CYCLE_TIME_ALPHA_NUM / CYCLE_TIME_ALPHA_DEN`.
/// 1/20 is alpha = 0.05.
pub const CYCLE_TIME_ALPHA_NUM: i64 = 1;
pub const CYCLE_TIME_ALPHA_DEN: i64 = 20;

/// SysTick frequency in Hz, used only by the optional `hw-cortex-m` clock.
#[cfg(feature = "hw-cortex-m")]
pub const TICK_HZ: u32 = 1_000_000;

/// System clock frequency in Hz, used only by the optional `hw-cortex-m`
/// clock (default assumes a 16 MHz HSI source, as on STM32F4).
#[cfg(feature = "hw-cortex-m")]
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;
