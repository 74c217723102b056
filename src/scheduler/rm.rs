use super::{SchedCtx, Scheduler};
use crate::job::JobId;
use crate::task::ProcessorId;

/// Rate-Monotonic: fixed priority by period, shorter period wins. Not an
/// MC policy; supplements the spec's EDF-family schedulers the way
/// `rt.rs`'s `Policy::RM` sits alongside `Policy::EDF` in the teacher.
#[derive(Debug, Default)]
pub struct RmScheduler {
    ready_list: Vec<JobId>,
}

impl RmScheduler {
    pub fn new() -> Self {
        Self { ready_list: Vec::new() }
    }
}

impl Scheduler for RmScheduler {
    fn init(&mut self, _tasks: &crate::task::TaskSet) {
        self.ready_list.clear();
    }

    fn on_activate(&mut self, _ctx: &mut SchedCtx, job: JobId) -> bool {
        self.ready_list.push(job);
        true
    }

    fn on_terminated(&mut self, _ctx: &mut SchedCtx, job: JobId) {
        self.ready_list.retain(|&j| j != job);
    }

    fn schedule(&mut self, ctx: &SchedCtx, cpu: ProcessorId) -> Option<JobId> {
        self.ready_list
            .iter()
            .copied()
            .filter(|&j| ctx.tasks.get(ctx.jobs.get(j).task).processor == cpu)
            .min_by(|&a, &b| {
                let ta = ctx.tasks.get(ctx.jobs.get(a).task);
                let tb = ctx.tasks.get(ctx.jobs.get(b).task);
                ta.period_ms
                    .partial_cmp(&tb.period_ms)
                    .unwrap()
                    .then(ctx.jobs.get(a).id.0.cmp(&ctx.jobs.get(b).id.0))
            })
    }
}
