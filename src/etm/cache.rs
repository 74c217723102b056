use std::collections::HashMap;

use super::{BudgetTable, Etm, EtmCtx};
use crate::job::JobId;
use crate::task::CritLevel;
use crate::time::Cycles;

/// Adds a fixed cache-reload penalty for every preemption a job suffers:
/// `et = wcet + n_preemptions * reload_penalty`. The penalty count grows
/// each time `on_preempted` fires and is folded into `et` on the job's next
/// dispatch, not retroactively into work already accounted.
#[derive(Debug)]
pub struct CacheAwareEtm {
    table: BudgetTable,
    reload_penalty: Cycles,
    preemptions: HashMap<JobId, u32>,
}

impl CacheAwareEtm {
    pub fn new(reload_penalty: Cycles) -> Self {
        Self {
            table: BudgetTable::new(),
            reload_penalty,
            preemptions: HashMap::new(),
        }
    }
}

impl Etm for CacheAwareEtm {
    fn on_activate(&mut self, ctx: &EtmCtx, job: JobId) {
        let task = ctx.task_of(job);
        let et = task.wcet_cycles(ctx.cycles_per_ms);
        let curr_wcet = task.is_mc().then_some(et);
        self.table.insert(job, et, curr_wcet);
        self.preemptions.insert(job, 0);
    }

    fn on_execute(&mut self, ctx: &EtmCtx, job: JobId) {
        let n = *self.preemptions.get(&job).unwrap_or(&0);
        if n > 0 {
            // Fold the accumulated penalty into the remaining budget once,
            // at the moment the job resumes after a preemption.
            if let Some(b) = self.table.map.get_mut(&job) {
                b.et += self.reload_penalty;
            }
            self.preemptions.insert(job, 0);
        }
        self.table.on_execute(ctx.now, job);
    }

    fn on_preempted(&mut self, ctx: &EtmCtx, job: JobId) {
        self.table.flush(ctx.now, ctx.speed_of(job), job);
        *self.preemptions.entry(job).or_insert(0) += 1;
    }

    fn on_terminated(&mut self, ctx: &EtmCtx, job: JobId) {
        self.table.flush(ctx.now, ctx.speed_of(job), job);
        self.table.purge(job);
        self.preemptions.remove(&job);
    }

    fn on_abort(&mut self, ctx: &EtmCtx, job: JobId) {
        self.on_terminated(ctx, job);
    }

    fn get_executed(&self, ctx: &EtmCtx, job: JobId) -> Cycles {
        self.table.get_executed(ctx.now, ctx.speed_of(job), job)
    }

    fn get_ret(&self, ctx: &EtmCtx, job: JobId) -> Cycles {
        self.table.get_ret(ctx.now, ctx.speed_of(job), job)
    }

    fn update(&mut self, ctx: &EtmCtx) {
        self.table.update_all(ctx.now, |j| ctx.speed_of(j));
    }

    fn get_rwcet(&self, ctx: &EtmCtx, job: JobId) -> Option<Cycles> {
        self.table.get_rwcet(ctx.now, ctx.speed_of(job), job)
    }

    fn on_mode_switch(&mut self, ctx: &EtmCtx, job: JobId, level: CritLevel) {
        let task = ctx.task_of(job);
        let cw = match level {
            CritLevel::Hi => task
                .wcet_hi_cycles(ctx.cycles_per_ms)
                .unwrap_or_else(|| task.wcet_cycles(ctx.cycles_per_ms)),
            CritLevel::Lo => task.wcet_cycles(ctx.cycles_per_ms),
        };
        self.table.set_curr_wcet(job, cw);
    }

    fn is_mc_capable(&self) -> bool {
        true
    }
}
