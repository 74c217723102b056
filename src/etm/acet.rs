use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use super::{BudgetTable, Etm, EtmCtx};
use crate::job::JobId;
use crate::task::{CritLevel, Task};
use crate::time::{ms_to_cycles_ceil, Cycles};

/// Stochastic (average-case) ETM: `et = min(wcet, N(acet, stddev))`, drawn
/// once per activation from a seeded, reproducible `ChaCha8Rng`. Backs both
/// the `acet` and `mc_acet` config identifiers; `mc` toggles whether
/// `curr_wcet`/`get_rwcet` are tracked.
#[derive(Debug)]
pub struct AcetEtm {
    table: BudgetTable,
    mc: bool,
    rng: ChaCha8Rng,
}

impl AcetEtm {
    pub fn new(mc: bool, seed: u64) -> Self {
        Self {
            table: BudgetTable::new(),
            mc,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn draw_et_ms(&mut self, task: &Task) -> f64 {
        let acet = task.acet_ms.unwrap_or(task.wcet_ms);
        let stddev = task.et_stddev_ms.unwrap_or(0.0).max(0.0);
        let sample = if stddev > 0.0 {
            let normal = Normal::new(acet, stddev).expect("stddev validated non-negative");
            normal.sample(&mut self.rng)
        } else {
            acet
        };
        sample.min(task.wcet_ms).max(0.0)
    }
}

impl Etm for AcetEtm {
    fn on_activate(&mut self, ctx: &EtmCtx, job: JobId) {
        let task = ctx.task_of(job).clone();
        let et_ms = self.draw_et_ms(&task);
        let et = ms_to_cycles_ceil(et_ms, ctx.cycles_per_ms);
        let curr_wcet = (self.mc && task.is_mc()).then(|| task.wcet_cycles(ctx.cycles_per_ms));
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
        if !self.mc {
            return None;
        }
        self.table.get_rwcet(ctx.now, ctx.speed_of(job), job)
    }

    fn on_mode_switch(&mut self, ctx: &EtmCtx, job: JobId, level: CritLevel) {
        if !self.mc {
            return;
        }
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
        self.mc
    }
}
