//! The discrete-event Engine (spec §4.1, §4.4, §5).
//!
//! Jobs are not real coroutines here (Design Notes §9 explicitly allows a
//! hand-rolled continuation): `Hold` becomes a queued `HoldExpire` event
//! tagged with the job's current `generation`, and `Interrupt` is a
//! synchronous call (`preempt`) that bumps the generation so any
//! already-queued `HoldExpire` for the old run is recognized as stale and
//! ignored when it's popped. `Activate`/`Passivate` collapse into direct
//! calls (`dispatch_run`) made inline from `resched`, which satisfies the
//! "resched triggered inside an event handler executes before the clock
//! advances" ordering guarantee for free: everything runs synchronously
//! within one `now`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{Result, SimError};
use crate::etm::{Etm, EtmCtx};
use crate::job::{JobArena, JobId, JobState};
use crate::monitor::{Event, Monitor};
use crate::processor::ProcessorSet;
use crate::scheduler::{SchedCtx, Scheduler};
use crate::task::{CritLevel, ProcessorId, TaskId, TaskSet};
use crate::time::{is_close_to_zero, ms_to_cycles_ceil, Cycles};

#[derive(Debug, Clone, Copy)]
enum EngineEventKind {
    Release(TaskId),
    HoldExpire(JobId, u32),
    DeadlineCheck(JobId),
}

struct QueuedEvent {
    at: Cycles,
    seq: u64,
    kind: EngineEventKind,
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}
impl Eq for QueuedEvent {}

impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the smallest
        // `(at, seq)` first, giving same-cycle stable FIFO (spec §4.1).
        other.at.cmp(&self.at).then(other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Owns every mutable piece of a single run: clock, arenas, the chosen
/// ETM/scheduler, and the event queue driving them.
pub struct Engine {
    now: Cycles,
    cycles_per_ms: u64,
    horizon: Cycles,
    tasks: TaskSet,
    processors: ProcessorSet,
    jobs: JobArena,
    etm: Box<dyn Etm>,
    scheduler: Box<dyn Scheduler>,
    monitor: Box<dyn Monitor>,
    queue: BinaryHeap<QueuedEvent>,
    seq: u64,
}

impl Engine {
    pub fn new(
        tasks: TaskSet,
        processors: ProcessorSet,
        etm: Box<dyn Etm>,
        scheduler: Box<dyn Scheduler>,
        monitor: Box<dyn Monitor>,
        cycles_per_ms: u64,
        horizon_ms: f64,
    ) -> Self {
        Engine {
            now: 0,
            cycles_per_ms,
            horizon: ms_to_cycles_ceil(horizon_ms, cycles_per_ms),
            tasks,
            processors,
            jobs: JobArena::new(),
            etm,
            scheduler,
            monitor,
            queue: BinaryHeap::new(),
            seq: 0,
        }
    }

    pub fn jobs(&self) -> &JobArena {
        &self.jobs
    }

    pub fn tasks(&self) -> &TaskSet {
        &self.tasks
    }

    pub fn cycles_per_ms(&self) -> u64 {
        self.cycles_per_ms
    }

    pub fn now(&self) -> Cycles {
        self.now
    }

    fn push_event(&mut self, at: Cycles, kind: EngineEventKind) {
        let seq = self.seq;
        self.seq += 1;
        self.queue.push(QueuedEvent { at, seq, kind });
    }

    /// Runs until the event queue drains or the horizon is reached.
    pub fn run(&mut self) -> Result<()> {
        self.scheduler.init(&self.tasks);

        let task_ids: Vec<TaskId> = self.tasks.tasks.iter().map(|t| t.id).collect();
        for id in task_ids {
            self.push_event(0, EngineEventKind::Release(id));
        }

        while let Some(evt) = self.queue.pop() {
            if evt.at > self.horizon {
                break;
            }
            if evt.at < self.now {
                return Err(SimError::Protocol(format!(
                    "event queue went backwards: now={} popped={}",
                    self.now, evt.at
                )));
            }
            self.now = evt.at;
            match evt.kind {
                EngineEventKind::Release(task_id) => self.on_release(task_id),
                EngineEventKind::HoldExpire(job, gen) => self.on_hold_expire(job, gen),
                EngineEventKind::DeadlineCheck(job) => self.on_deadline_check(job),
            }
        }

        let ctx = EtmCtx {
            now: self.now,
            cycles_per_ms: self.cycles_per_ms,
            jobs: &self.jobs,
            tasks: &self.tasks,
            processors: &self.processors,
        };
        self.etm.update(&ctx);
        Ok(())
    }

    fn on_release(&mut self, task_id: TaskId) {
        self.release_job(task_id, None);

        let period = self.tasks.get(task_id).period_cycles(self.cycles_per_ms);
        let next_at = self.now + period;
        if next_at <= self.horizon {
            self.push_event(next_at, EngineEventKind::Release(task_id));
        }
    }

    /// `Created → Active/Waiting` (spec §4.2 step 1), including the
    /// `Processor.activate(job)` hand-off to the scheduler.
    fn release_job(&mut self, task_id: TaskId, pred: Option<JobId>) -> JobId {
        let now = self.now;
        let task = self.tasks.get(task_id).clone();
        let deadline = now + task.deadline_cycles(self.cycles_per_ms);
        let job = self.jobs.alloc(task_id, pred, task.processor, now, deadline);

        {
            let j = self.jobs.get_mut(job);
            j.start_date = Some(now);
            j.state = JobState::Waiting;
        }

        self.monitor.observe(Event::Activate { job, at: now });
        let ctx = EtmCtx {
            now: self.now,
            cycles_per_ms: self.cycles_per_ms,
            jobs: &self.jobs,
            tasks: &self.tasks,
            processors: &self.processors,
        };
        self.etm.on_activate(&ctx, job);

        self.monitor.observe(Event::BeginActivate { cpu: task.processor, at: now });
        let accepted = {
            let mut sched_ctx = SchedCtx { tasks: &self.tasks, jobs: &mut self.jobs };
            self.scheduler.on_activate(&mut sched_ctx, job)
        };
        self.monitor.observe(Event::EndActivate { cpu: task.processor, at: now });

        if !accepted {
            self.monitor.observe(Event::DroppedJob { job, at: now });
            return job;
        }

        let deadline_at = self.jobs.get(job).absolute_deadline;
        self.push_event(deadline_at, EngineEventKind::DeadlineCheck(job));

        self.resched(task.processor);
        job
    }

    /// `Processor` dispatch protocol (spec §4.4): ask the scheduler, and
    /// act on whatever differs from what's currently running.
    fn resched(&mut self, cpu: ProcessorId) {
        let now = self.now;
        self.monitor.observe(Event::BeginSchedule { cpu, at: now });
        let chosen = {
            let ctx = SchedCtx { tasks: &self.tasks, jobs: &mut self.jobs };
            self.scheduler.schedule(&ctx, cpu)
        };
        self.monitor.observe(Event::EndSchedule { cpu, at: now });

        let running = self.processors.get(cpu).running;
        if chosen == running {
            return;
        }
        if let Some(old) = running {
            self.preempt(old);
        }
        if let Some(new) = chosen {
            self.dispatch_run(new, cpu);
        }
    }

    fn stop_exec_accounting(&mut self, job: JobId) {
        let now = self.now;
        let j = self.jobs.get_mut(job);
        if let Some(last) = j.last_exec.take() {
            j.computation_time += now - last;
        }
    }

    /// `Active/Running → Active/Waiting` via Interrupt (spec §4.2 step 3,
    /// interrupted branch).
    fn preempt(&mut self, job: JobId) {
        let now = self.now;
        self.stop_exec_accounting(job);
        self.jobs.get_mut(job).generation += 1;

        let ctx = EtmCtx {
            now: self.now,
            cycles_per_ms: self.cycles_per_ms,
            jobs: &self.jobs,
            tasks: &self.tasks,
            processors: &self.processors,
        };
        self.etm.on_preempted(&ctx, job);

        let cpu = self.jobs.get(job).cpu;
        self.processors.get_mut(cpu).running = None;
        {
            let j = self.jobs.get_mut(job);
            j.is_preempted = true;
            j.state = JobState::Waiting;
        }
        self.monitor.observe(Event::Preempted { job, at: now });
    }

    /// `Active/Waiting → Active/Running` via Activate (spec §4.2 step 2).
    fn dispatch_run(&mut self, job: JobId, cpu: ProcessorId) {
        let now = self.now;
        self.processors.get_mut(cpu).running = Some(job);
        self.processors.get_mut(cpu).was_running = Some(job);
        {
            let j = self.jobs.get_mut(job);
            j.state = JobState::Running;
            j.is_preempted = false;
            j.last_exec = Some(now);
            j.cpu = cpu;
        }

        let ctx = EtmCtx {
            now: self.now,
            cycles_per_ms: self.cycles_per_ms,
            jobs: &self.jobs,
            tasks: &self.tasks,
            processors: &self.processors,
        };
        self.etm.on_execute(&ctx, job);
        self.monitor.observe(Event::Execute { job, cpu, at: now });

        self.schedule_next_wake(job);
    }

    /// Computes `ret` (and, for MC jobs, `rwcet`) and queues the `Hold`
    /// that will fire at whichever threshold is reached first (spec §4.3).
    /// Terminates the job immediately if `ret` is already exhausted.
    fn schedule_next_wake(&mut self, job: JobId) {
        let ctx = EtmCtx {
            now: self.now,
            cycles_per_ms: self.cycles_per_ms,
            jobs: &self.jobs,
            tasks: &self.tasks,
            processors: &self.processors,
        };
        let ret = self.etm.get_ret(&ctx, job);
        if is_close_to_zero(ret as f64) {
            self.terminate(job);
            return;
        }

        let is_mc = self.tasks.get(self.jobs.get(job).task).is_mc();
        let wake = if is_mc {
            let rwcet = self.etm.get_rwcet(&ctx, job).unwrap_or(ret);
            ret.min(rwcet)
        } else {
            ret
        };

        let gen = self.jobs.get(job).generation;
        self.push_event(self.now + wake, EngineEventKind::HoldExpire(job, gen));
    }

    /// The Hold expired without an intervening Interrupt (spec §4.2 step 3,
    /// uninterrupted branch; §4.3 for the MC mode-switch check).
    fn on_hold_expire(&mut self, job: JobId, generation: u32) {
        if self.jobs.get(job).generation != generation {
            return; // stale: this job was preempted or aborted since the Hold was queued
        }
        if self.jobs.get(job).state != JobState::Running {
            return;
        }

        let ctx = EtmCtx {
            now: self.now,
            cycles_per_ms: self.cycles_per_ms,
            jobs: &self.jobs,
            tasks: &self.tasks,
            processors: &self.processors,
        };
        let ret = self.etm.get_ret(&ctx, job);
        if is_close_to_zero(ret as f64) {
            self.terminate(job);
            return;
        }

        let is_mc = self.tasks.get(self.jobs.get(job).task).is_mc();
        if is_mc {
            let rwcet = self.etm.get_rwcet(&ctx, job).unwrap_or(ret);
            if is_close_to_zero(rwcet as f64) {
                self.mode_switch_to_hi(job);
            }
        }

        self.schedule_next_wake(job);
    }

    /// `Active/* → Terminated` (spec §4.2 step 4).
    fn terminate(&mut self, job: JobId) {
        let now = self.now;
        self.stop_exec_accounting(job);

        let ctx = EtmCtx {
            now: self.now,
            cycles_per_ms: self.cycles_per_ms,
            jobs: &self.jobs,
            tasks: &self.tasks,
            processors: &self.processors,
        };
        self.etm.on_terminated(&ctx, job);

        {
            let j = self.jobs.get_mut(job);
            j.end_date = Some(now);
            j.state = JobState::Terminated;
        }
        self.monitor.observe(Event::Terminated { job, at: now });

        let cpu = self.jobs.get(job).cpu;
        if self.processors.get(cpu).running == Some(job) {
            self.processors.get_mut(cpu).running = None;
        }

        self.monitor.observe(Event::BeginTerminate { cpu, at: now });
        {
            let mut sched_ctx = SchedCtx { tasks: &self.tasks, jobs: &mut self.jobs };
            self.scheduler.on_terminated(&mut sched_ctx, job);
        }
        self.monitor.observe(Event::EndTerminate { cpu, at: now });
        self.resched(cpu);
    }

    /// `Active/* → Aborted` (spec §4.2 step 5), driven by a deadline-miss
    /// `DeadlineCheck` firing on a job that's still active.
    fn abort(&mut self, job: JobId) {
        let now = self.now;
        self.stop_exec_accounting(job);
        self.jobs.get_mut(job).generation += 1;

        let ctx = EtmCtx {
            now: self.now,
            cycles_per_ms: self.cycles_per_ms,
            jobs: &self.jobs,
            tasks: &self.tasks,
            processors: &self.processors,
        };
        self.etm.on_abort(&ctx, job);

        {
            let j = self.jobs.get_mut(job);
            j.end_date = Some(now);
            j.aborted = true;
            j.state = JobState::Aborted;
        }
        self.monitor.observe(Event::Aborted { job, at: now });

        let cpu = self.jobs.get(job).cpu;
        if self.processors.get(cpu).running == Some(job) {
            self.processors.get_mut(cpu).running = None;
        }

        self.monitor.observe(Event::BeginTerminate { cpu, at: now });
        {
            let mut sched_ctx = SchedCtx { tasks: &self.tasks, jobs: &mut self.jobs };
            self.scheduler.on_terminated(&mut sched_ctx, job);
        }
        self.monitor.observe(Event::EndTerminate { cpu, at: now });
        self.resched(cpu);
    }

    /// A job whose `ret` has already reached zero by the time its own
    /// `DeadlineCheck` fires met its deadline exactly (zero-laxity release);
    /// the same-cycle FIFO tie-break can pop this before the terminating
    /// `HoldExpire`, so the check here uses `ret`, not popping order, to
    /// decide between `terminate` and `abort`.
    fn on_deadline_check(&mut self, job: JobId) {
        if !self.jobs.get(job).is_active() {
            return;
        }
        let ctx = EtmCtx {
            now: self.now,
            cycles_per_ms: self.cycles_per_ms,
            jobs: &self.jobs,
            tasks: &self.tasks,
            processors: &self.processors,
        };
        let ret = self.etm.get_ret(&ctx, job);
        if is_close_to_zero(ret as f64) {
            self.terminate(job);
        } else {
            self.abort(job);
        }
    }

    /// Mode switch LO → HI (spec §4.3): flips the scheduler's mode,
    /// broadcasts to the shared ETM (see DESIGN.md for why one call
    /// suffices instead of iterating every task's ETM), and fires the two
    /// observable events.
    fn mode_switch_to_hi(&mut self, job: JobId) {
        let now = self.now;
        self.scheduler.set_criticality_mode(CritLevel::Hi);

        let ctx = EtmCtx {
            now: self.now,
            cycles_per_ms: self.cycles_per_ms,
            jobs: &self.jobs,
            tasks: &self.tasks,
            processors: &self.processors,
        };
        self.etm.on_mode_switch(&ctx, job, CritLevel::Hi);

        self.monitor.observe(Event::Overrun { job, at: now });
        let cpu = self.jobs.get(job).cpu;
        self.scheduler.monitor_mode_switch_up(cpu, now);
        self.monitor.observe(Event::ModeSwitchUp { at: now });
    }
}
