//! Scheduling policies (spec §4.5). A policy owns its own ready-list
//! representation and is consulted by the engine at every scheduling
//! point; it never drives the clock or touches the ETM itself.

mod edf_vd;
mod rm;

pub use edf_vd::EdfVdScheduler;
pub use rm::RmScheduler;

use crate::job::JobArena;
use crate::task::{CritLevel, ProcessorId, TaskSet};
use crate::time::Cycles;

/// What a scheduler needs to inspect or mutate a job's priority-relevant
/// fields (e.g. EDF-VD's virtual-deadline scaling) without owning the
/// arena itself.
pub struct SchedCtx<'a> {
    pub tasks: &'a TaskSet,
    pub jobs: &'a mut JobArena,
}

pub trait Scheduler {
    /// Called once before the run starts, after every task is known.
    fn init(&mut self, tasks: &TaskSet);

    /// Returns `false` if the job was dropped outright (an MC scheduler
    /// refusing a LO-criticality job after a mode switch, spec §4.3) and
    /// never entered the ready set; the engine turns that into a
    /// `DroppedJob` event.
    fn on_activate(&mut self, ctx: &mut SchedCtx, job: crate::job::JobId) -> bool;
    fn on_terminated(&mut self, ctx: &mut SchedCtx, job: crate::job::JobId);

    /// Picks the job that should occupy `cpu` right now, or `None` to
    /// leave it idle. Called by the engine after every event that could
    /// change the outcome (spec §5).
    fn schedule(&mut self, ctx: &SchedCtx, cpu: ProcessorId) -> Option<crate::job::JobId>;

    /// LO unless this is an MC-aware scheduler that has switched up.
    fn criticality_mode(&self) -> CritLevel {
        CritLevel::Lo
    }

    fn set_criticality_mode(&mut self, _level: CritLevel) {}

    /// Hook fired once, at the processor and instant a mode switch was
    /// detected, mirroring `Scheduler.monitor_mode_switch_up` in the
    /// original. The default scheduler ignores it.
    fn monitor_mode_switch_up(&mut self, _cpu: ProcessorId, _at: Cycles) {}

    fn is_mc_aware(&self) -> bool {
        false
    }
}

/// Selects which concrete scheduler a run uses; matches the
/// `policy = "..."` config string.
#[derive(Debug, Clone, Copy)]
pub enum SchedulerKind {
    /// Plain EDF, usable by both MC and non-MC task sets.
    Edf,
    /// EDF with Virtual Deadlines, for Mixed-Criticality task sets only.
    EdfVd,
    Rm,
}

impl SchedulerKind {
    pub fn build(self) -> Box<dyn Scheduler> {
        match self {
            SchedulerKind::Edf => Box::new(EdfVdScheduler::plain()),
            SchedulerKind::EdfVd => Box::new(EdfVdScheduler::mixed_criticality()),
            SchedulerKind::Rm => Box::new(RmScheduler::new()),
        }
    }
}
