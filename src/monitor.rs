//! The observable event stream (spec §6) and the sinks that consume it.
//!
//! The CORE only ever produces `Event`s through the `Monitor` trait; what
//! happens to them (a log line, an in-memory timeline for `report`, a GUI)
//! is explicitly out of scope per spec §1. `TracingMonitor` and
//! `EventLog` are the two sinks this crate ships.

use crate::job::JobId;
use crate::task::ProcessorId;
use crate::time::Cycles;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Activate { job: JobId, at: Cycles },
    Execute { job: JobId, cpu: ProcessorId, at: Cycles },
    Preempted { job: JobId, at: Cycles },
    Terminated { job: JobId, at: Cycles },
    Aborted { job: JobId, at: Cycles },
    Overrun { job: JobId, at: Cycles },
    BeginSchedule { cpu: ProcessorId, at: Cycles },
    EndSchedule { cpu: ProcessorId, at: Cycles },
    BeginActivate { cpu: ProcessorId, at: Cycles },
    EndActivate { cpu: ProcessorId, at: Cycles },
    BeginTerminate { cpu: ProcessorId, at: Cycles },
    EndTerminate { cpu: ProcessorId, at: Cycles },
    ModeSwitchUp { at: Cycles },
    ModeSwitchDown { at: Cycles },
    DroppedJob { job: JobId, at: Cycles },
}

impl Event {
    pub fn at(&self) -> Cycles {
        match *self {
            Event::Activate { at, .. }
            | Event::Execute { at, .. }
            | Event::Preempted { at, .. }
            | Event::Terminated { at, .. }
            | Event::Aborted { at, .. }
            | Event::Overrun { at, .. }
            | Event::BeginSchedule { at, .. }
            | Event::EndSchedule { at, .. }
            | Event::BeginActivate { at, .. }
            | Event::EndActivate { at, .. }
            | Event::BeginTerminate { at, .. }
            | Event::EndTerminate { at, .. }
            | Event::ModeSwitchUp { at }
            | Event::ModeSwitchDown { at }
            | Event::DroppedJob { at, .. } => at,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Activate { .. } => "ACTIVATE",
            Event::Execute { .. } => "EXECUTE",
            Event::Preempted { .. } => "PREEMPTED",
            Event::Terminated { .. } => "TERMINATED",
            Event::Aborted { .. } => "ABORTED",
            Event::Overrun { .. } => "OVERRUN",
            Event::BeginSchedule { .. } => "BEGIN_SCHEDULE",
            Event::EndSchedule { .. } => "END_SCHEDULE",
            Event::BeginActivate { .. } => "BEGIN_ACTIVATE",
            Event::EndActivate { .. } => "END_ACTIVATE",
            Event::BeginTerminate { .. } => "BEGIN_TERMINATE",
            Event::EndTerminate { .. } => "END_TERMINATE",
            Event::ModeSwitchUp { .. } => "MODE_SWITCH_UP",
            Event::ModeSwitchDown { .. } => "MODE_SWITCH_DOWN",
            Event::DroppedJob { .. } => "DROPPED_JOB",
        }
    }
}

pub trait Monitor {
    fn observe(&mut self, event: Event);
}

/// Streams every event through `tracing`, at `info` for job-visible
/// transitions and `debug` for scheduler bookkeeping. This is the default
/// sink the CLI wires up; a caller embedding the simulator as a library is
/// free to supply their own `Monitor`.
#[derive(Debug, Default)]
pub struct TracingMonitor;

impl Monitor for TracingMonitor {
    fn observe(&mut self, event: Event) {
        match &event {
            Event::Overrun { job, at } => {
                tracing::warn!(job = job.0, at, "OVERRUN")
            }
            Event::Aborted { job, at } => {
                tracing::warn!(job = job.0, at, "ABORTED")
            }
            Event::DroppedJob { job, at } => {
                tracing::warn!(job = job.0, at, "DROPPED_JOB")
            }
            Event::ModeSwitchUp { at } => {
                tracing::warn!(at, "MODE_SWITCH_UP")
            }
            Event::ModeSwitchDown { at } => {
                tracing::info!(at, "MODE_SWITCH_DOWN")
            }
            _ => tracing::debug!(kind = event.kind(), at = event.at(), "event"),
        }
    }
}

/// Records every event in order, for tests and for `report`.
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<Event>,
}

impl Monitor for EventLog {
    fn observe(&mut self, event: Event) {
        self.events.push(event);
    }
}

/// Fans every event out to a fixed set of sinks. Used by the CLI to both
/// log via `tracing` and retain the full event stream for the report.
#[derive(Default)]
pub struct CompositeMonitor {
    pub sinks: Vec<Box<dyn Monitor>>,
}

impl Monitor for CompositeMonitor {
    fn observe(&mut self, event: Event) {
        for sink in &mut self.sinks {
            sink.observe(event.clone());
        }
    }
}

/// Lets a caller retain its own handle to an `EventLog` while a clone of
/// the same `Rc` is handed to the `Engine` as a `Monitor` sink.
impl Monitor for std::rc::Rc<std::cell::RefCell<EventLog>> {
    fn observe(&mut self, event: Event) {
        self.borrow_mut().observe(event);
    }
}
