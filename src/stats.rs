//! # Execution Statistics
//!
//! Online accumulators updated by the scheduler when statistics collection
//! is enabled. Layout is stable regardless of the enable flag — see the
//! design note on runtime vs. compile-time statistics toggling.

use crate::config::{CYCLE_TIME_ALPHA_DEN, CYCLE_TIME_ALPHA_NUM, TASK_STATS_MOVING_SUM_COUNT};
use crate::time::TimeDelta;

/// Exponential-style moving sum: `sum += sample - sum / W`. The running
/// average is `sum / W`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovingSum {
    sum: i64,
}

impl MovingSum {
    pub const fn new() -> Self {
        Self { sum: 0 }
    }

    #[inline]
    pub fn push(&mut self, sample: u32) {
        let w = TASK_STATS_MOVING_SUM_COUNT as i64;
        self.sum += sample as i64 - self.sum / w;
    }

    #[inline]
    pub fn average(&self) -> u32 {
        (self.sum / TASK_STATS_MOVING_SUM_COUNT as i64).max(0) as u32
    }
}

/// First-order IIR low-pass filter over a task's measured cycle time.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleTimeFilter {
    average: i64,
}

impl CycleTimeFilter {
    pub const fn new() -> Self {
        Self { average: 0 }
    }

    #[inline]
    pub fn push(&mut self, sample: TimeDelta) {
        self.average += (sample as i64 - self.average) * CYCLE_TIME_ALPHA_NUM / CYCLE_TIME_ALPHA_DEN;
    }

    #[inline]
    pub fn average_us(&self) -> u32 {
        self.average.max(0) as u32
    }
}

/// Per-task execution statistics. Always allocated; updated only while
/// `Scheduler::statistics_enabled` is `true`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskStats {
    pub moving_execution_time_us: MovingSum,
    pub moving_delta_time_us: MovingSum,
    pub max_execution_time_us: u32,
    pub total_execution_time_us: u64,
    pub moving_average_cycle_time_us: CycleTimeFilter,
}

impl TaskStats {
    pub const fn new() -> Self {
        Self {
            moving_execution_time_us: MovingSum::new(),
            moving_delta_time_us: MovingSum::new(),
            max_execution_time_us: 0,
            total_execution_time_us: 0,
            moving_average_cycle_time_us: CycleTimeFilter::new(),
        }
    }

    /// Record one completed execution: `exec_time` is the measured wall
    /// time spent inside the task body; `delta_time` is the time since the
    /// previous execution (used for cycle-time averaging and reporting).
    pub fn record_execution(&mut self, exec_time_us: u32, delta_time: TimeDelta) {
        self.moving_execution_time_us.push(exec_time_us);
        self.max_execution_time_us = self.max_execution_time_us.max(exec_time_us);
        self.total_execution_time_us = self
            .total_execution_time_us
            .saturating_add(exec_time_us as u64);
        if delta_time > 0 {
            self.moving_delta_time_us.push(delta_time as u32);
            self.moving_average_cycle_time_us.push(delta_time);
        }
    }

    pub fn reset_max(&mut self) {
        self.max_execution_time_us = 0;
    }
}

/// Aggregate statistics across every check-function invocation, regardless
/// of which task owns the check.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckFuncStats {
    pub moving_execution_time_us: MovingSum,
    pub moving_delta_time_us: MovingSum,
    pub max_execution_time_us: u32,
    pub total_execution_time_us: u64,
}

impl CheckFuncStats {
    pub const fn new() -> Self {
        Self {
            moving_execution_time_us: MovingSum::new(),
            moving_delta_time_us: MovingSum::new(),
            max_execution_time_us: 0,
            total_execution_time_us: 0,
        }
    }

    pub fn record(&mut self, exec_time_us: u32, delta_time_us: u32) {
        self.moving_execution_time_us.push(exec_time_us);
        self.moving_delta_time_us.push(delta_time_us);
        self.max_execution_time_us = self.max_execution_time_us.max(exec_time_us);
        self.total_execution_time_us = self
            .total_execution_time_us
            .saturating_add(exec_time_us as u64);
    }
}

/// Tracks the fraction of aging passes during which each task was waiting
/// (had a non-zero dynamic priority), reset each time it is read.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLoadSampler {
    waiting_total: u32,
    samples: u32,
}

impl SystemLoadSampler {
    pub const fn new() -> Self {
        Self {
            waiting_total: 0,
            samples: 0,
        }
    }

    pub fn record_pass(&mut self, waiting: u32) {
        self.waiting_total = self.waiting_total.saturating_add(waiting);
        self.samples = self.samples.saturating_add(1);
    }

    /// Returns the average percentage of waiting tasks per pass, resetting
    /// the accumulators as a side effect.
    pub fn average_load_percent(&mut self) -> u32 {
        let result = if self.samples == 0 {
            0
        } else {
            100 * self.waiting_total / self.samples
        };
        self.waiting_total = 0;
        self.samples = 0;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_sum_converges_toward_constant_input() {
        let mut m = MovingSum::new();
        for _ in 0..500 {
            m.push(100);
        }
        assert!((m.average() as i64 - 100).abs() <= 1);
    }

    #[test]
    fn cycle_time_filter_tracks_constant_period() {
        let mut f = CycleTimeFilter::new();
        for _ in 0..2000 {
            f.push(1000);
        }
        assert!((f.average_us() as i64 - 1000).abs() <= 2);
    }

    #[test]
    fn task_stats_tracks_max_and_total() {
        let mut s = TaskStats::new();
        s.record_execution(10, 0);
        s.record_execution(50, 1000);
        s.record_execution(5, 1000);
        assert_eq!(s.max_execution_time_us, 50);
        assert_eq!(s.total_execution_time_us, 65);
    }

    #[test]
    fn load_sampler_resets_on_read() {
        let mut s = SystemLoadSampler::new();
        s.record_pass(2);
        s.record_pass(4);
        assert_eq!(s.average_load_percent(), 300);
        assert_eq!(s.average_load_percent(), 0);
    }
}
