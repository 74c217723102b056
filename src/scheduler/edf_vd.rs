use super::{SchedCtx, Scheduler};
use crate::job::JobId;
use crate::task::{CritLevel, ProcessorId};

/// Earliest Deadline First, with an optional Virtual-Deadline scaling step
/// for Mixed-Criticality task sets. Grounded on
/// `original_source/simso/schedulers/EDF_VD_mono.py`; `vd_enabled = false`
/// gives plain EDF over the same ready-list machinery, since EDF-VD
/// degenerates to EDF when every job stays at its own criticality level.
#[derive(Debug)]
pub struct EdfVdScheduler {
    ready_list: Vec<JobId>,
    criticality_mode: CritLevel,
    vd_enabled: bool,
}

impl EdfVdScheduler {
    pub fn mixed_criticality() -> Self {
        Self {
            ready_list: Vec::new(),
            criticality_mode: CritLevel::Lo,
            vd_enabled: true,
        }
    }

    pub fn plain() -> Self {
        Self {
            ready_list: Vec::new(),
            criticality_mode: CritLevel::Lo,
            vd_enabled: false,
        }
    }

    /// `Ulo_hi / (1 - Ulo_lo)`.
    fn vd_coeff(tasks: &crate::task::TaskSet) -> f64 {
        let ulo_lo = tasks.utilization_at_level(CritLevel::Lo, CritLevel::Lo);
        let ulo_hi = tasks.utilization_at_level(CritLevel::Lo, CritLevel::Hi);
        ulo_hi / (1.0 - ulo_lo)
    }
}

impl Scheduler for EdfVdScheduler {
    fn init(&mut self, tasks: &crate::task::TaskSet) {
        debug_assert!(
            !self.vd_enabled || tasks.all_mc(),
            "EDF-VD can only schedule Mixed-Criticality tasks"
        );
        self.ready_list.clear();
        self.criticality_mode = CritLevel::Lo;
    }

    fn on_activate(&mut self, ctx: &mut SchedCtx, job: JobId) -> bool {
        let task_id = ctx.jobs.get(job).task;
        let task = ctx.tasks.get(task_id);
        let job_level = task.criticality_level.unwrap_or(CritLevel::Lo);

        if job_level < self.criticality_mode {
            return false;
        }

        if self.vd_enabled
            && task.criticality_level == Some(CritLevel::Hi)
            && self.criticality_mode == CritLevel::Lo
        {
            let ulo_lo = ctx.tasks.utilization_at_level(CritLevel::Lo, CritLevel::Lo);
            let uhi_hi = ctx.tasks.utilization_at_level(CritLevel::Hi, CritLevel::Hi);
            if ulo_lo + uhi_hi > 1.0 {
                let vd = Self::vd_coeff(ctx.tasks);
                let j = ctx.jobs.get_mut(job);
                j.absolute_deadline = ((j.absolute_deadline as f64) * vd).round() as crate::time::Cycles;
            }
        }

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
            .min_by_key(|&j| {
                let job = ctx.jobs.get(j);
                (job.absolute_deadline, job.id.0)
            })
    }

    fn criticality_mode(&self) -> CritLevel {
        self.criticality_mode
    }

    fn set_criticality_mode(&mut self, level: CritLevel) {
        self.criticality_mode = level;
    }

    fn is_mc_aware(&self) -> bool {
        self.vd_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobArena;
    use crate::task::{Task, TaskId, TaskSet};

    fn lo_task() -> Task {
        Task {
            id: TaskId(0),
            period_ms: 2.0,
            deadline_ms: 2.0,
            wcet_ms: 1.0,
            acet_ms: None,
            et_stddev_ms: None,
            wcet_hi_ms: None,
            criticality_level: Some(CritLevel::Lo),
            processor: ProcessorId(0),
        }
    }

    #[test]
    fn lo_job_dropped_after_mode_switch_to_hi() {
        let tasks = TaskSet { tasks: vec![lo_task()] };
        let mut jobs = JobArena::new();
        let job = jobs.alloc(TaskId(0), None, ProcessorId(0), 0, 2000);

        let mut sched = EdfVdScheduler::mixed_criticality();
        sched.init(&tasks);
        sched.set_criticality_mode(CritLevel::Hi);

        let mut ctx = SchedCtx { tasks: &tasks, jobs: &mut jobs };
        assert!(!sched.on_activate(&mut ctx, job));
    }

    #[test]
    fn lo_job_accepted_while_system_still_in_lo_mode() {
        let tasks = TaskSet { tasks: vec![lo_task()] };
        let mut jobs = JobArena::new();
        let job = jobs.alloc(TaskId(0), None, ProcessorId(0), 0, 2000);

        let mut sched = EdfVdScheduler::mixed_criticality();
        sched.init(&tasks);

        let mut ctx = SchedCtx { tasks: &tasks, jobs: &mut jobs };
        assert!(sched.on_activate(&mut ctx, job));
    }

    fn hi_task(id: u32) -> Task {
        Task {
            id: TaskId(id),
            period_ms: 10.0,
            deadline_ms: 10.0,
            wcet_ms: 4.0,
            acet_ms: None,
            et_stddev_ms: None,
            wcet_hi_ms: Some(8.0),
            criticality_level: Some(CritLevel::Hi),
            processor: ProcessorId(0),
        }
    }

    /// `Ulo_lo = 0`, `Uhi_hi = 0.8 + 0.8 = 1.6 > 1`, so the scaling
    /// condition holds while the system is still in LO mode.
    #[test]
    fn hi_job_deadline_scaled_while_in_lo_mode() {
        let tasks = TaskSet { tasks: vec![hi_task(0), hi_task(1)] };
        let mut jobs = JobArena::new();
        let job = jobs.alloc(TaskId(0), None, ProcessorId(0), 0, 10_000);

        let mut sched = EdfVdScheduler::mixed_criticality();
        sched.init(&tasks);

        let mut ctx = SchedCtx { tasks: &tasks, jobs: &mut jobs };
        assert!(sched.on_activate(&mut ctx, job));
        assert_eq!(ctx.jobs.get(job).absolute_deadline, 8_000);
    }

    /// Once the system has switched to HI mode, the same job release no
    /// longer gets its deadline scaled: only LO-mode releases use the
    /// virtual deadline.
    #[test]
    fn hi_job_deadline_unscaled_after_mode_switch_to_hi() {
        let tasks = TaskSet { tasks: vec![hi_task(0), hi_task(1)] };
        let mut jobs = JobArena::new();
        let job = jobs.alloc(TaskId(0), None, ProcessorId(0), 0, 10_000);

        let mut sched = EdfVdScheduler::mixed_criticality();
        sched.init(&tasks);
        sched.set_criticality_mode(CritLevel::Hi);

        let mut ctx = SchedCtx { tasks: &tasks, jobs: &mut jobs };
        assert!(sched.on_activate(&mut ctx, job));
        assert_eq!(ctx.jobs.get(job).absolute_deadline, 10_000);
    }
}
