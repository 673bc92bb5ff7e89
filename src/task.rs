//! # Task Model
//!
//! Splits each task into an immutable, externally-owned [`TaskSpec`] and a
//! scheduler-owned, mutable [`TaskRuntime`]. The two are kept in lock-step
//! by index (`TaskId`) rather than bundled into one struct, so a task table
//! can live in `static` memory (or ROM) while the scheduler's own state is
//! the only thing that ever changes.

use crate::priority::StaticPriority;
use crate::stats::TaskStats;
use crate::time::{TimeDelta, TimeUs};

/// Index of a task within the caller's task table.
pub type TaskId = usize;

/// Event-driven readiness predicate: `(now, time_since_last_exec) -> bool`.
pub type CheckFn = fn(now: TimeUs, since_last_exec: TimeDelta) -> bool;

/// Task body, invoked with the tick's sampled timestamp.
pub type TaskFn = fn(now: TimeUs);

/// Resolves a task either by explicit id or as "whichever task is currently
/// executing". Replaces the original firmware's `TASK_SELF`/`TASK_NONE`
/// sentinel values threaded through a raw integer id space.
#[derive(Debug, Clone, Copy)]
pub enum TaskRef {
    Id(TaskId),
    SelfTask,
}

/// Immutable task descriptor, supplied by the caller and borrowed for the
/// scheduler's whole lifetime. Never mutated by the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    pub name: &'static str,
    /// `None` for a purely time-driven task; `Some` for an event-driven one.
    pub check: Option<CheckFn>,
    pub run: TaskFn,
    pub desired_period_us: u32,
    pub static_priority: StaticPriority,
}

impl TaskSpec {
    pub const fn time_driven(
        name: &'static str,
        run: TaskFn,
        desired_period_us: u32,
        static_priority: StaticPriority,
    ) -> Self {
        Self {
            name,
            check: None,
            run,
            desired_period_us,
            static_priority,
        }
    }

    pub const fn event_driven(
        name: &'static str,
        check: CheckFn,
        run: TaskFn,
        desired_period_us: u32,
        static_priority: StaticPriority,
    ) -> Self {
        Self {
            name,
            check: Some(check),
            run,
            desired_period_us,
            static_priority,
        }
    }
}

/// Scheduler-owned mutable state tracked for each task, indexed in lock
/// step with the caller's `TaskSpec` table.
#[derive(Debug, Clone, Copy)]
pub struct TaskRuntime {
    pub desired_period_us: u32,
    pub dynamic_priority: u32,
    pub task_age_cycles: u32,
    pub last_executed_at_us: TimeUs,
    pub last_signaled_at_us: TimeUs,
    pub last_desired_at: TimeUs,
    pub task_latest_delta_time_us: TimeDelta,
    pub stats: TaskStats,
}

impl TaskRuntime {
    pub const fn new(spec: &TaskSpec) -> Self {
        Self {
            desired_period_us: spec.desired_period_us,
            dynamic_priority: 0,
            task_age_cycles: 0,
            last_executed_at_us: 0,
            last_signaled_at_us: 0,
            last_desired_at: 0,
            task_latest_delta_time_us: 0,
            stats: TaskStats::new(),
        }
    }
}

/// Point-in-time snapshot of a task's execution statistics, returned by
/// `get_task_info` when statistics collection is enabled.
#[derive(Debug, Clone, Copy)]
pub struct TaskStatsSnapshot {
    pub average_execution_time_us: u32,
    pub max_execution_time_us: u32,
    pub average_cycle_time_us: u32,
    pub total_execution_time_us: u64,
}

/// Read-only snapshot returned by `Scheduler::get_task_info`.
#[derive(Debug, Clone, Copy)]
pub struct TaskInfo {
    pub name: &'static str,
    pub enabled: bool,
    pub desired_period_us: u32,
    pub static_priority: StaticPriority,
    pub stats: Option<TaskStatsSnapshot>,
}
