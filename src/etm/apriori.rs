use super::{BudgetTable, Etm, EtmCtx};
use crate::job::JobId;
use crate::task::CritLevel;
use crate::time::Cycles;

/// Replays a fixed, pre-recorded trace of execution times, one entry per
/// activation, wrapping around when the trace is outlived. Grounded on
/// `original_source/simso/core/etm/Apriori.py`, which extends the MC base
/// model directly, so this ETM is always MC-capable. The index is
/// process-wide: a single scalar cursor shared by every task's activations
/// (`Apriori.py`'s `self.t_idx`), not a per-task round-robin.
#[derive(Debug)]
pub struct AprioriEtm {
    table: BudgetTable,
    trace: Vec<Cycles>,
    cursor: usize,
}

impl AprioriEtm {
    pub fn new(trace: Vec<Cycles>) -> Self {
        Self {
            table: BudgetTable::new(),
            trace,
            cursor: 0,
        }
    }

    fn next_et(&mut self) -> Cycles {
        if self.trace.is_empty() {
            return 0;
        }
        let et = self.trace[self.cursor % self.trace.len()];
        self.cursor += 1;
        et
    }
}

impl Etm for AprioriEtm {
    fn on_activate(&mut self, ctx: &EtmCtx, job: JobId) {
        let task = ctx.task_of(job);
        let is_mc = task.is_mc();
        let et = self.next_et();
        let task = ctx.task_of(job);
        let curr_wcet = is_mc.then(|| task.wcet_cycles(ctx.cycles_per_ms));
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
                .unwrap_or_else(|| task.wcet_cycles(ctx.cycles_per_ms)),
            CritLevel::Lo => task.wcet_cycles(ctx.cycles_per_ms),
        };
        self.table.set_curr_wcet(job, cw);
    }

    fn is_mc_capable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobArena;
    use crate::processor::{Processor, ProcessorSet};
    use crate::task::{ProcessorId, Task, TaskId, TaskSet};

    fn task(id: u32) -> Task {
        Task {
            id: TaskId(id),
            period_ms: 10.0,
            deadline_ms: 10.0,
            wcet_ms: 5.0,
            acet_ms: None,
            et_stddev_ms: None,
            wcet_hi_ms: None,
            criticality_level: None,
            processor: ProcessorId(0),
        }
    }

    /// Two tasks activating in sequence draw from one interleaved cursor,
    /// not an independent round-robin each.
    #[test]
    fn cursor_is_shared_across_tasks() {
        let tasks = TaskSet { tasks: vec![task(0), task(1)] };
        let processors = ProcessorSet::new(vec![Processor::new(ProcessorId(0), 1.0)]);
        let mut jobs = JobArena::new();
        let job_a = jobs.alloc(TaskId(0), None, ProcessorId(0), 0, 10_000);
        let job_b = jobs.alloc(TaskId(1), None, ProcessorId(0), 0, 10_000);

        let mut etm = AprioriEtm::new(vec![1000, 2000, 3000]);
        let ctx = EtmCtx { now: 0, cycles_per_ms: 1000, jobs: &jobs, tasks: &tasks, processors: &processors };
        etm.on_activate(&ctx, job_a);
        etm.on_activate(&ctx, job_b);

        assert_eq!(etm.get_ret(&ctx, job_a), 1000);
        assert_eq!(etm.get_ret(&ctx, job_b), 2000);
    }
}
