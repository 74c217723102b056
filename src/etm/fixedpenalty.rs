use super::{BudgetTable, Etm, EtmCtx};
use crate::job::JobId;
use crate::task::CritLevel;
use crate::time::Cycles;

/// `et = wcet + penalty`, a flat per-activation overhead added on top of
/// the worst-case figure. Useful for modelling a fixed dispatch/accounting
/// cost the scheduler itself imposes on every job.
#[derive(Debug)]
pub struct FixedPenaltyEtm {
    table: BudgetTable,
    penalty: Cycles,
}

impl FixedPenaltyEtm {
    pub fn new(penalty: Cycles) -> Self {
        Self {
            table: BudgetTable::new(),
            penalty,
        }
    }
}

impl Etm for FixedPenaltyEtm {
    fn on_activate(&mut self, ctx: &EtmCtx, job: JobId) {
        let task = ctx.task_of(job);
        let et = task.wcet_cycles(ctx.cycles_per_ms) + self.penalty;
        let curr_wcet = task.is_mc().then_some(et);
        self.table.insert(job, et, curr_wcet);
    }

    fn on_execute(&mut self, ctx: &EtmCtx, job: JobId) {
        self.table.on_execute(ctx.now, job);
    }

    fn on_preempted(&mut self, ctx: &EtmCtx, job: JobId) {
        self.table.flush(ctx.now, ctx.speed_of(job), job);
    }

    fn on_terminated(&mut self, ctx: &EtmCtx, job: JobId) {
        self.table.flush(ctx.now, ctx.speed_of(job), job);
        self.table.purge(job);
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
                .unwrap_or_else(|| task.wcet_cycles(ctx.cycles_per_ms))
                + self.penalty,
            CritLevel::Lo => task.wcet_cycles(ctx.cycles_per_ms) + self.penalty,
        };
        self.table.set_curr_wcet(job, cw);
    }

    fn is_mc_capable(&self) -> bool {
        true
    }
}
