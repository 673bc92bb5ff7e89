//! # Scheduler
//!
//! Cooperative, priority-aged task scheduler. No preemption, no heap, no
//! locks internal to the scheduler itself.
//!
//! ## Scheduling Algorithm
//!
//! Each call to [`Scheduler::tick`] runs in three phases:
//!
//! 1. **Real-time deadline.** If the designated real-time task's deadline
//!    has arrived, run it immediately.
//! 2. **Aging pass.** Only if there is slack left before that deadline (or
//!    no real-time task at all, or it just ran): age every enabled
//!    best-effort task and track the one with the highest dynamic priority.
//! 3. **Admission.** Run the best candidate only if its projected cost
//!    fits the remaining slack.
//!
//! Aging uses `dynamic_priority = 1 + static_priority * task_age_cycles`,
//! so a low-priority task that has missed enough periods eventually
//! outranks a high-priority task that is merely due.

use core::fmt::Write as _;

use crate::config::{
    GUARD_INTERVAL_US, SCHEDULER_DELAY_LIMIT, TASK_AVERAGE_EXECUTE_FALLBACK_US,
    TASK_AVERAGE_EXECUTE_PADDING_US,
};
use crate::diagnostics::{DiagnosticsSink, LineBuf};
use crate::queue::ReadyQueue;
use crate::stats::{CheckFuncStats, SystemLoadSampler};
use crate::task::{TaskId, TaskInfo, TaskRef, TaskRuntime, TaskSpec, TaskStatsSnapshot};
use crate::time::{cmp_time_us, Clock, TimeDelta, TimeUs};

/// The scheduler core. Borrows the caller's task table for its lifetime and
/// owns every piece of mutable scheduling state itself.
///
/// ## Design Notes
///
/// - The task table lives outside the scheduler (`&'a [TaskSpec; N]`); only
///   [`TaskRuntime`] is scheduler-owned.
/// - `N` is a const generic, so the ready queue and runtime array are fixed
///   at compile time — no heap, no dynamic task creation.
/// - There is no internal locking: a `Scheduler` is a plain value. A caller
///   sharing one between an ISR and the foreground must serialize access
///   itself, e.g. via [`crate::sync::critical_section`].
pub struct Scheduler<'a, const N: usize> {
    tasks: &'a [TaskSpec; N],
    runtime: [TaskRuntime; N],
    queue: ReadyQueue<N>,
    realtime_task: Option<TaskId>,
    current_task: Option<TaskId>,
    statistics_enabled: bool,
    check_stats: CheckFuncStats,
    load_sampler: SystemLoadSampler,
}

impl<'a, const N: usize> Scheduler<'a, N> {
    /// Build a scheduler over a borrowed task table. No task is enabled by
    /// default; callers enable each one via [`Scheduler::set_enabled`].
    ///
    /// The real-time task, if any, is the first entry whose
    /// `static_priority` is [`crate::priority::StaticPriority::REALTIME`].
    /// At most one is honored; later matches are treated as ordinary
    /// best-effort tasks with that same (otherwise unused) priority value.
    pub fn new(tasks: &'a [TaskSpec; N]) -> Self {
        let runtime = core::array::from_fn(|i| TaskRuntime::new(&tasks[i]));
        let realtime_task = tasks.iter().position(|t| t.static_priority.is_realtime());
        Self {
            tasks,
            runtime,
            queue: ReadyQueue::new(),
            realtime_task,
            current_task: None,
            statistics_enabled: false,
            check_stats: CheckFuncStats::new(),
            load_sampler: SystemLoadSampler::new(),
        }
    }

    pub fn statistics_enabled(&self) -> bool {
        self.statistics_enabled
    }

    pub fn set_statistics_enabled(&mut self, enabled: bool) {
        self.statistics_enabled = enabled;
    }

    /// The task currently executing, if called from within a task body.
    pub fn current_task(&self) -> Option<TaskId> {
        self.current_task
    }

    fn resolve(&self, task: TaskRef) -> Option<TaskId> {
        match task {
            TaskRef::Id(id) if id < N => Some(id),
            TaskRef::Id(_) => None,
            TaskRef::SelfTask => self.current_task,
        }
    }

    /// Enable or disable a task. Returns whether queue membership changed.
    pub fn set_enabled(&mut self, task: TaskRef, on: bool) -> bool {
        let Some(id) = self.resolve(task) else {
            return false;
        };
        let tasks = self.tasks;
        if on {
            self.queue.add(id, |i| tasks[i].static_priority.value())
        } else {
            self.queue.remove(id)
        }
    }

    pub fn is_enabled(&self, task: TaskRef) -> bool {
        match self.resolve(task) {
            Some(id) => self.queue.contains(id),
            None => false,
        }
    }

    /// Set a new period, clamped to [`SCHEDULER_DELAY_LIMIT`]. Returns
    /// whether the task reference resolved.
    pub fn reschedule(&mut self, task: TaskRef, new_period_us: u32) -> bool {
        let Some(id) = self.resolve(task) else {
            return false;
        };
        self.runtime[id].desired_period_us = new_period_us.max(SCHEDULER_DELAY_LIMIT);
        true
    }

    pub fn reset_task_max_execution_time(&mut self, task: TaskRef) -> bool {
        let Some(id) = self.resolve(task) else {
            return false;
        };
        self.runtime[id].stats.reset_max();
        true
    }

    pub fn get_task_info(&self, task: TaskRef) -> Option<TaskInfo> {
        let id = self.resolve(task)?;
        let spec = &self.tasks[id];
        let rt = &self.runtime[id];
        let stats = self.statistics_enabled.then(|| TaskStatsSnapshot {
            average_execution_time_us: rt.stats.moving_execution_time_us.average(),
            max_execution_time_us: rt.stats.max_execution_time_us,
            average_cycle_time_us: rt.stats.moving_average_cycle_time_us.average_us(),
            total_execution_time_us: rt.stats.total_execution_time_us,
        });
        Some(TaskInfo {
            name: spec.name,
            enabled: self.queue.contains(id),
            desired_period_us: rt.desired_period_us,
            static_priority: spec.static_priority,
            stats,
        })
    }

    /// Run one scheduling pass. See the module documentation for the
    /// three-phase algorithm.
    pub fn tick<C: Clock>(&mut self, clock: &mut C) {
        let mut now = clock.now_us();
        let mut realtime_ran = false;
        let mut delay: TimeDelta = TimeDelta::MAX;

        if let Some(rt_id) = self.realtime_task {
            let basis = self.runtime[rt_id].last_desired_at;
            let period = self.runtime[rt_id].desired_period_us;
            let deadline = basis.wrapping_add(period as TimeUs);
            delay = cmp_time_us(deadline, now);
            if delay <= 0 {
                self.execute_task(rt_id, now, clock);
                realtime_ran = true;
                now = clock.now_us();
            }
        }

        let should_age =
            realtime_ran || self.realtime_task.is_none() || delay > GUARD_INTERVAL_US as TimeDelta;
        if !should_age {
            return;
        }

        // Snapshot queue membership before mutating runtime state, so the
        // aging pass below never holds a borrow of `self.queue` while it
        // mutates `self.runtime`.
        let mut ids = [0usize; N];
        let mut count = 0;
        for id in self.queue.iter() {
            ids[count] = id;
            count += 1;
        }

        let mut candidate: Option<TaskId> = None;
        let mut best_dynamic_priority: u32 = 0;
        let mut waiting_count: u32 = 0;

        for &id in &ids[..count] {
            if self.age_task(id, now, clock) {
                waiting_count += 1;
            }
            let dp = self.runtime[id].dynamic_priority;
            if dp > best_dynamic_priority {
                best_dynamic_priority = dp;
                candidate = Some(id);
            }
        }
        self.load_sampler.record_pass(waiting_count);

        let Some(candidate) = candidate else {
            return;
        };
        if realtime_ran || self.realtime_task.is_none() {
            self.execute_task(candidate, now, clock);
            return;
        }
        let budget = self.required_budget(candidate) as TimeDelta;
        let elapsed = cmp_time_us(clock.now_us(), now);
        if budget + elapsed < delay {
            self.execute_task(candidate, now, clock);
        }
    }

    /// Age one queued, non-real-time task in place. Returns whether it is
    /// currently waiting (non-zero dynamic priority after this call).
    fn age_task<C: Clock>(&mut self, id: TaskId, now: TimeUs, clock: &mut C) -> bool {
        let spec = self.tasks[id];
        if spec.static_priority.is_realtime() {
            return false;
        }
        let sp = spec.static_priority.value() as i64;

        if let Some(check) = spec.check {
            if self.runtime[id].dynamic_priority > 0 {
                let last_signaled = self.runtime[id].last_signaled_at_us;
                let period = self.runtime[id].desired_period_us.max(1) as i64;
                let age = 1 + cmp_time_us(now, last_signaled) as i64 / period;
                let age = age.clamp(0, u32::MAX as i64) as u32;
                self.runtime[id].task_age_cycles = age;
                self.runtime[id].dynamic_priority =
                    (1i64 + sp * age as i64).clamp(0, u32::MAX as i64) as u32;
                return true;
            }

            let since = cmp_time_us(now, self.runtime[id].last_executed_at_us);
            let fired = if self.statistics_enabled {
                let start = clock.now_us();
                let fired = check(now, since);
                let end = clock.now_us();
                let cost = cmp_time_us(end, start).max(0) as u32;
                self.check_stats.record(cost, since.max(0) as u32);
                fired
            } else {
                check(now, since)
            };

            if fired {
                self.runtime[id].last_signaled_at_us = now;
                self.runtime[id].task_age_cycles = 1;
                self.runtime[id].dynamic_priority = (1i64 + sp).clamp(0, u32::MAX as i64) as u32;
                true
            } else {
                self.runtime[id].task_age_cycles = 0;
                false
            }
        } else {
            let period = self.runtime[id].desired_period_us.max(1) as i64;
            let basis = self.runtime[id].last_executed_at_us;
            let age = cmp_time_us(now, basis) as i64 / period;
            if age > 0 {
                let age = age.clamp(0, u32::MAX as i64) as u32;
                self.runtime[id].task_age_cycles = age;
                self.runtime[id].dynamic_priority =
                    (1i64 + sp * age as i64).clamp(0, u32::MAX as i64) as u32;
                true
            } else {
                false
            }
        }
    }

    fn required_budget(&self, id: TaskId) -> u32 {
        if self.statistics_enabled {
            self.runtime[id].stats.moving_execution_time_us.average() + TASK_AVERAGE_EXECUTE_PADDING_US
        } else {
            TASK_AVERAGE_EXECUTE_FALLBACK_US
        }
    }

    fn execute_task<C: Clock>(&mut self, id: TaskId, now: TimeUs, clock: &mut C) {
        let delta = cmp_time_us(now, self.runtime[id].last_executed_at_us);
        self.runtime[id].task_latest_delta_time_us = delta;
        self.runtime[id].last_executed_at_us = now;

        let period = self.runtime[id].desired_period_us;
        if period > 0 {
            let since_phase = cmp_time_us(now, self.runtime[id].last_desired_at);
            if since_phase > 0 {
                let periods = since_phase as i64 / period as i64;
                if periods > 0 {
                    let advance = periods as u64 * period as u64;
                    self.runtime[id].last_desired_at =
                        self.runtime[id].last_desired_at.wrapping_add(advance as TimeUs);
                }
            }
        }

        self.runtime[id].dynamic_priority = 0;
        self.current_task = Some(id);

        let run = self.tasks[id].run;
        if self.statistics_enabled {
            let start = clock.now_us();
            run(now);
            let end = clock.now_us();
            let exec_us = cmp_time_us(end, start).max(0) as u32;
            self.runtime[id].stats.record_execution(exec_us, delta);
        } else {
            run(now);
        }
    }

    /// Emit one formatted line per enabled task, then check-function and
    /// aggregate system-load totals if statistics are enabled. Resets each
    /// reported task's running execution-time maximum as a side effect.
    pub fn print_tasks(&mut self, sink: &mut dyn DiagnosticsSink) {
        for id in 0..N {
            if !self.queue.contains(id) {
                continue;
            }
            let spec = self.tasks[id];
            let mut line: LineBuf<200> = LineBuf::new();
            if self.statistics_enabled {
                let rt = &self.runtime[id];
                let avg_delta = rt.stats.moving_delta_time_us.average();
                let avg_exec = rt.stats.moving_execution_time_us.average();
                let max_exec = rt.stats.max_execution_time_us;
                let rate_hz = if avg_delta > 0 { 1_000_000u32 / avg_delta } else { 0 };
                let (avg_load_x10, max_load_x10) = if avg_delta > 0 {
                    (
                        (avg_exec as u64 * 1000 / avg_delta as u64) as u32,
                        (max_exec as u64 * 1000 / avg_delta as u64) as u32,
                    )
                } else {
                    (0, 0)
                };
                let _ = write!(
                    line,
                    "{:<16} rate={:>5}Hz avg={:>6}us max={:>6}us avg_load={:>3}.{:01}% max_load={:>3}.{:01}% total={:>10}us",
                    spec.name,
                    rate_hz,
                    avg_exec,
                    max_exec,
                    avg_load_x10 / 10,
                    avg_load_x10 % 10,
                    max_load_x10 / 10,
                    max_load_x10 % 10,
                    rt.stats.total_execution_time_us,
                );
            } else {
                let _ = write!(line, "{:<16} (statistics disabled)", spec.name);
            }
            sink.write_line(line.as_str());
            self.runtime[id].stats.reset_max();
        }

        if !self.statistics_enabled {
            return;
        }

        let mut line: LineBuf<200> = LineBuf::new();
        let _ = write!(
            line,
            "check_fns avg={:>6}us max={:>6}us total={:>10}us",
            self.check_stats.moving_execution_time_us.average(),
            self.check_stats.max_execution_time_us,
            self.check_stats.total_execution_time_us,
        );
        sink.write_line(line.as_str());

        let mut line: LineBuf<200> = LineBuf::new();
        let _ = write!(
            line,
            "system load: {}%",
            self.load_sampler.average_load_percent()
        );
        sink.write_line(line.as_str());
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::priority::StaticPriority;
    use core::sync::atomic::{AtomicU32, Ordering};

    fn noop(_now: TimeUs) {}

    static RT_RUNS: AtomicU32 = AtomicU32::new(0);
    fn rt_body(_now: TimeUs) {
        RT_RUNS.fetch_add(1, Ordering::Relaxed);
    }

    static LOW_RUNS: AtomicU32 = AtomicU32::new(0);
    fn low_body(_now: TimeUs) {
        LOW_RUNS.fetch_add(1, Ordering::Relaxed);
    }

    static HIGH_RUNS: AtomicU32 = AtomicU32::new(0);
    fn high_body(_now: TimeUs) {
        HIGH_RUNS.fetch_add(1, Ordering::Relaxed);
    }

    static EVENT_RUNS: AtomicU32 = AtomicU32::new(0);
    fn event_body(_now: TimeUs) {
        EVENT_RUNS.fetch_add(1, Ordering::Relaxed);
    }

    static EVENT_FIRE: AtomicU32 = AtomicU32::new(0);
    fn event_check(_now: TimeUs, _since: TimeDelta) -> bool {
        EVENT_FIRE.load(Ordering::Relaxed) != 0
    }

    struct ManualClock(TimeUs);
    impl Clock for ManualClock {
        fn now_us(&mut self) -> TimeUs {
            self.0
        }
    }

    #[test]
    fn realtime_task_runs_on_deadline_with_no_slack() {
        RT_RUNS.store(0, Ordering::Relaxed);
        let tasks = [TaskSpec::time_driven("rt", rt_body, 1000, StaticPriority::REALTIME)];
        let mut sched = Scheduler::new(&tasks);
        sched.set_enabled(TaskRef::Id(0), true);
        let mut clock = ManualClock(0);

        clock.0 = 1000;
        sched.tick(&mut clock);
        assert_eq!(RT_RUNS.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn best_effort_task_runs_only_within_slack() {
        LOW_RUNS.store(0, Ordering::Relaxed);
        let tasks = [
            TaskSpec::time_driven("rt", noop, 10_000, StaticPriority::REALTIME),
            TaskSpec::time_driven("low", low_body, 100, StaticPriority::LOW),
        ];
        let mut sched = Scheduler::new(&tasks);
        sched.set_enabled(TaskRef::Id(0), true);
        sched.set_enabled(TaskRef::Id(1), true);
        let mut clock = ManualClock(0);

        // Plenty of slack before the real-time deadline: best-effort task admitted.
        clock.0 = 200;
        sched.tick(&mut clock);
        assert_eq!(LOW_RUNS.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn best_effort_task_rejected_when_slack_too_small() {
        LOW_RUNS.store(0, Ordering::Relaxed);
        let tasks = [
            TaskSpec::time_driven("rt", noop, 1000, StaticPriority::REALTIME),
            TaskSpec::time_driven("low", low_body, 100, StaticPriority::LOW),
        ];
        let mut sched = Scheduler::new(&tasks);
        sched.set_enabled(TaskRef::Id(0), true);
        sched.set_enabled(TaskRef::Id(1), true);
        let mut clock = ManualClock(0);

        // Slack of only 10us, below the 30us fallback budget: rejected.
        clock.0 = 990;
        sched.tick(&mut clock);
        assert_eq!(LOW_RUNS.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn aging_lets_a_low_priority_task_beat_a_fresh_high_priority_one() {
        // Both tasks share a 100us period. "high" (priority 5) wins every
        // tick and keeps resetting its own age, capping its dynamic
        // priority at 1 + 5*1 = 6. "low" (priority 1) is starved and its
        // age climbs one cycle per tick, so its dynamic priority is
        // 1 + 1*age_cycles. It finally exceeds 6 once age_cycles reaches 6,
        // i.e. on the sixth tick.
        LOW_RUNS.store(0, Ordering::Relaxed);
        HIGH_RUNS.store(0, Ordering::Relaxed);
        let tasks = [
            TaskSpec::time_driven("low", low_body, 100, StaticPriority::LOW),
            TaskSpec::time_driven("high", high_body, 100, StaticPriority::HIGH),
        ];
        let mut sched = Scheduler::new(&tasks);
        sched.set_enabled(TaskRef::Id(0), true);
        sched.set_enabled(TaskRef::Id(1), true);
        let mut clock = ManualClock(0);

        for step in 1..=6u32 {
            clock.0 = step * 100;
            sched.tick(&mut clock);
        }

        assert_eq!(HIGH_RUNS.load(Ordering::Relaxed), 5);
        assert_eq!(LOW_RUNS.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn event_driven_task_runs_only_after_check_fires() {
        EVENT_RUNS.store(0, Ordering::Relaxed);
        EVENT_FIRE.store(0, Ordering::Relaxed);
        let tasks = [TaskSpec::event_driven(
            "event",
            event_check,
            event_body,
            100,
            StaticPriority::MEDIUM,
        )];
        let mut sched = Scheduler::new(&tasks);
        sched.set_enabled(TaskRef::Id(0), true);
        let mut clock = ManualClock(0);

        clock.0 = 50;
        sched.tick(&mut clock);
        assert_eq!(EVENT_RUNS.load(Ordering::Relaxed), 0);

        EVENT_FIRE.store(1, Ordering::Relaxed);
        clock.0 = 60;
        sched.tick(&mut clock);
        assert_eq!(EVENT_RUNS.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn reschedule_clamps_below_delay_limit() {
        let tasks = [TaskSpec::time_driven("t", noop, 1000, StaticPriority::LOW)];
        let mut sched = Scheduler::new(&tasks);
        assert!(sched.reschedule(TaskRef::Id(0), 1));
        let info = sched.get_task_info(TaskRef::Id(0)).unwrap();
        assert_eq!(info.desired_period_us, SCHEDULER_DELAY_LIMIT);
    }

    #[test]
    fn set_enabled_rejects_out_of_range_id() {
        let tasks = [TaskSpec::time_driven("t", noop, 1000, StaticPriority::LOW)];
        let mut sched = Scheduler::new(&tasks);
        assert!(!sched.set_enabled(TaskRef::Id(5), true));
    }

    #[test]
    fn print_tasks_emits_one_line_per_enabled_task() {
        let tasks = [TaskSpec::time_driven("alpha", noop, 1000, StaticPriority::LOW)];
        let mut sched = Scheduler::new(&tasks);
        sched.set_statistics_enabled(true);
        sched.set_enabled(TaskRef::Id(0), true);

        struct CollectSink(std::vec::Vec<std::string::String>);
        impl DiagnosticsSink for CollectSink {
            fn write_line(&mut self, line: &str) {
                self.0.push(std::string::String::from(line));
            }
        }
        let mut sink = CollectSink(std::vec::Vec::new());
        sched.print_tasks(&mut sink);
        assert!(sink.0.iter().any(|l| l.contains("alpha")));
    }
}
