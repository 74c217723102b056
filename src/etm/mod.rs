//! The Execution-Time Model family (spec §4.6).
//!
//! All variants share the `Etm` trait contract. Per Design Notes §9 this is
//! implemented as a closed sum of six known-at-startup kinds rather than a
//! runtime plugin registry: `EtmKind` selects the concrete struct, each of
//! which implements `Etm` directly.

mod acet;
mod apriori;
mod cache;
mod fixedpenalty;
mod wcet;

pub use acet::AcetEtm;
pub use apriori::AprioriEtm;
pub use cache::CacheAwareEtm;
pub use fixedpenalty::FixedPenaltyEtm;
pub use wcet::WcetEtm;

use std::collections::HashMap;

use crate::job::{JobArena, JobId};
use crate::processor::ProcessorSet;
use crate::task::{CritLevel, TaskSet};
use crate::time::Cycles;

/// Read-only view an ETM needs to answer questions about a job: the
/// current clock, the cycle/ms scale, and the job/task/processor tables.
/// An ETM never mutates these directly; all of its own state lives in its
/// own per-job maps, purged on terminate/abort per spec §3's ETM invariant.
pub struct EtmCtx<'a> {
    pub now: Cycles,
    pub cycles_per_ms: u64,
    pub jobs: &'a JobArena,
    pub tasks: &'a TaskSet,
    pub processors: &'a ProcessorSet,
}

impl<'a> EtmCtx<'a> {
    pub fn speed_of(&self, job: JobId) -> f64 {
        let cpu = self.jobs.get(job).cpu;
        self.processors.get(cpu).speed
    }

    pub fn task_of(&self, job: JobId) -> &crate::task::Task {
        self.tasks.get(self.jobs.get(job).task)
    }
}

pub trait Etm {
    fn on_activate(&mut self, ctx: &EtmCtx, job: JobId);
    fn on_execute(&mut self, ctx: &EtmCtx, job: JobId);
    fn on_preempted(&mut self, ctx: &EtmCtx, job: JobId);
    fn on_terminated(&mut self, ctx: &EtmCtx, job: JobId);
    fn on_abort(&mut self, ctx: &EtmCtx, job: JobId);
    fn get_executed(&self, ctx: &EtmCtx, job: JobId) -> Cycles;
    fn get_ret(&self, ctx: &EtmCtx, job: JobId) -> Cycles;
    fn update(&mut self, ctx: &EtmCtx);

    /// `Some` only for ETMs tracking an MC job's current-mode WCET budget.
    fn get_rwcet(&self, _ctx: &EtmCtx, _job: JobId) -> Option<Cycles> {
        None
    }

    /// Invoked once per mode switch for every task in the simulation (spec
    /// §4.3). A non-MC ETM's default implementation is a no-op.
    fn on_mode_switch(&mut self, _ctx: &EtmCtx, _job: JobId, _level: CritLevel) {}

    fn is_mc_capable(&self) -> bool {
        false
    }
}

/// Per-job scalars shared by every variant: the drawn execution-time
/// target, the speed-scaled executed-so-far accumulator, the on-execute
/// timestamp if currently running, and (MC only) the WCET budget active in
/// the current mode.
#[derive(Debug, Default, Clone, Copy)]
struct JobBudget {
    et: Cycles,
    executed: Cycles,
    exec_start: Option<Cycles>,
    curr_wcet: Option<Cycles>,
}

impl JobBudget {
    fn flush(&mut self, now: Cycles, speed: f64) {
        if let Some(start) = self.exec_start.take() {
            self.executed += ((now.saturating_sub(start)) as f64 * speed) as Cycles;
        }
    }

    fn executed_now(&self, now: Cycles, speed: f64) -> Cycles {
        match self.exec_start {
            Some(start) => self.executed + ((now.saturating_sub(start)) as f64 * speed) as Cycles,
            None => self.executed,
        }
    }

    fn ret(&self, now: Cycles, speed: f64) -> Cycles {
        self.et.saturating_sub(self.executed_now(now, speed))
    }

    fn rwcet(&self, now: Cycles, speed: f64) -> Option<Cycles> {
        self.curr_wcet
            .map(|cw| cw.saturating_sub(self.executed_now(now, speed)))
    }
}

/// Common per-job bookkeeping table, composed into every concrete ETM to
/// avoid repeating the same accumulator logic six times.
#[derive(Debug, Default)]
struct BudgetTable {
    map: HashMap<JobId, JobBudget>,
}

impl BudgetTable {
    fn new() -> Self {
        Self { map: HashMap::new() }
    }

    fn insert(&mut self, job: JobId, et: Cycles, curr_wcet: Option<Cycles>) {
        self.map.insert(
            job,
            JobBudget {
                et,
                executed: 0,
                exec_start: None,
                curr_wcet,
            },
        );
    }

    fn on_execute(&mut self, now: Cycles, job: JobId) {
        if let Some(b) = self.map.get_mut(&job) {
            b.exec_start = Some(now);
        }
    }

    fn flush(&mut self, now: Cycles, speed: f64, job: JobId) {
        if let Some(b) = self.map.get_mut(&job) {
            b.flush(now, speed);
        }
    }

    fn purge(&mut self, job: JobId) {
        self.map.remove(&job);
    }

    fn get_executed(&self, now: Cycles, speed: f64, job: JobId) -> Cycles {
        self.map.get(&job).map(|b| b.executed_now(now, speed)).unwrap_or(0)
    }

    fn get_ret(&self, now: Cycles, speed: f64, job: JobId) -> Cycles {
        self.map.get(&job).map(|b| b.ret(now, speed)).unwrap_or(0)
    }

    fn get_rwcet(&self, now: Cycles, speed: f64, job: JobId) -> Option<Cycles> {
        self.map.get(&job).and_then(|b| b.rwcet(now, speed))
    }

    fn set_curr_wcet(&mut self, job: JobId, cw: Cycles) {
        if let Some(b) = self.map.get_mut(&job) {
            b.curr_wcet = Some(cw);
        }
    }

    fn update_all(&mut self, now: Cycles, speed_of: impl Fn(JobId) -> f64) {
        let jobs: Vec<JobId> = self.map.keys().copied().collect();
        for job in jobs {
            let speed = speed_of(job);
            if let Some(b) = self.map.get_mut(&job) {
                b.flush(now, speed);
            }
        }
    }
}

/// Selects which concrete ETM a run uses; matches the `kind = "..."`
/// config string to spec §6's recognised identifiers.
#[derive(Debug, Clone)]
pub enum EtmKind {
    Wcet,
    Acet { stddev_seed: u64 },
    McAcet { stddev_seed: u64 },
    Apriori { exec_times_ms: Vec<f64> },
    Cache { reload_penalty_ms: f64 },
    FixedPenalty { penalty_ms: f64 },
}

impl EtmKind {
    pub fn build(&self, cycles_per_ms: u64) -> Box<dyn Etm> {
        match self {
            EtmKind::Wcet => Box::new(WcetEtm::new()),
            EtmKind::Acet { stddev_seed } => Box::new(AcetEtm::new(false, *stddev_seed)),
            EtmKind::McAcet { stddev_seed } => Box::new(AcetEtm::new(true, *stddev_seed)),
            EtmKind::Apriori { exec_times_ms } => {
                let cycles = exec_times_ms
                    .iter()
                    .map(|ms| crate::time::ms_to_cycles_ceil(*ms, cycles_per_ms))
                    .collect();
                Box::new(AprioriEtm::new(cycles))
            }
            EtmKind::Cache { reload_penalty_ms } => {
                Box::new(CacheAwareEtm::new(crate::time::ms_to_cycles_ceil(*reload_penalty_ms, cycles_per_ms)))
            }
            EtmKind::FixedPenalty { penalty_ms } => {
                Box::new(FixedPenaltyEtm::new(crate::time::ms_to_cycles_ceil(*penalty_ms, cycles_per_ms)))
            }
        }
    }
}
