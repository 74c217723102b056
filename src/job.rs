use crate::task::{ProcessorId, TaskId};
use crate::time::Cycles;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    /// Ready but not currently running (spec's `Active/Waiting`).
    Waiting,
    /// Currently running on its processor (spec's `Active/Running`).
    Running,
    Terminated,
    Aborted,
}

/// One per release. Lives in a `JobArena`, referenced everywhere else by
/// stable `JobId` rather than by pointer/reference, per Design Notes §9.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub task: TaskId,
    /// The job that released this one, for sporadic/non-periodic chains.
    /// Unused by the periodic task generator, kept for extensibility.
    pub pred: Option<JobId>,

    pub state: JobState,

    /// Cycle at which this job was released.
    pub activation_cycle: Cycles,
    /// Absolute deadline in cycles. Mutable only for EDF-VD's virtual
    /// deadline scaling; the original value is retained separately.
    pub absolute_deadline: Cycles,
    pub original_absolute_deadline: Cycles,

    pub start_date: Option<Cycles>,
    pub end_date: Option<Cycles>,

    /// Wall-cycle accumulator: cycles actually spent Running, irrespective
    /// of processor speed. Distinct from the ETM's speed-scaled executed
    /// accumulator (spec §4.2: "two accumulators exist ... do not conflate
    /// them").
    pub computation_time: Cycles,
    pub last_exec: Option<Cycles>,

    pub is_preempted: bool,
    pub aborted: bool,

    /// The processor this job is currently assigned to / last ran on.
    pub cpu: ProcessorId,

    /// Bumped every time an outstanding Hold is cancelled by an Interrupt,
    /// so a stale `HoldExpire` event popped from the engine's queue can be
    /// recognized and ignored.
    pub generation: u32,
}

impl Job {
    pub fn new(
        id: JobId,
        task: TaskId,
        pred: Option<JobId>,
        cpu: ProcessorId,
        now: Cycles,
        absolute_deadline: Cycles,
    ) -> Self {
        Job {
            id,
            task,
            pred,
            state: JobState::Created,
            activation_cycle: now,
            absolute_deadline,
            original_absolute_deadline: absolute_deadline,
            start_date: None,
            end_date: None,
            computation_time: 0,
            last_exec: None,
            is_preempted: false,
            aborted: false,
            cpu,
            generation: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.end_date.is_none()
    }

    pub fn is_running(&self) -> bool {
        self.state == JobState::Running
    }

    /// Response time in ms, defined only once terminated/aborted.
    pub fn response_time_ms(&self, cycles_per_ms: u64, activation_ms: f64) -> Option<f64> {
        self.end_date
            .map(|end| end as f64 / cycles_per_ms as f64 - activation_ms)
    }

    pub fn exceeded_deadline(&self) -> bool {
        self.aborted || self.end_date.map(|e| e > self.absolute_deadline).unwrap_or(false)
    }
}

/// Stable-id storage for jobs. A freed slot is never reused mid-run: jobs
/// are only ever appended, matching the "arena of Jobs keyed by a stable
/// integer identifier" guidance in Design Notes §9. Entries are retained
/// after termination for post-run analysis (response times, miss counts);
/// nothing here purges on terminate except the per-job ETM state, which
/// lives in the ETM itself.
#[derive(Debug, Default)]
pub struct JobArena {
    jobs: Vec<Job>,
}

impl JobArena {
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    pub fn alloc(
        &mut self,
        task: TaskId,
        pred: Option<JobId>,
        cpu: ProcessorId,
        now: Cycles,
        absolute_deadline: Cycles,
    ) -> JobId {
        let id = JobId(self.jobs.len() as u32);
        self.jobs.push(Job::new(id, task, pred, cpu, now, absolute_deadline));
        id
    }

    pub fn get(&self, id: JobId) -> &Job {
        &self.jobs[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: JobId) -> &mut Job {
        &mut self.jobs[id.0 as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
