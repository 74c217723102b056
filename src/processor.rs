use crate::job::JobId;
use crate::task::ProcessorId;

/// Holds at most one running job. Speed scales execution progress: a job
/// running on a processor with `speed = 2.0` burns its remaining execution
/// time twice as fast as wall-cycles advance. See spec §3 / §4.4.
#[derive(Debug, Clone)]
pub struct Processor {
    pub id: ProcessorId,
    pub speed: f64,
    pub running: Option<JobId>,
    /// Hint set whenever a job starts executing on this processor; retained
    /// across preemption/termination for diagnostics, mirroring
    /// `Job._on_execute`'s `self.cpu.was_running = self`.
    pub was_running: Option<JobId>,
}

impl Processor {
    pub fn new(id: ProcessorId, speed: f64) -> Self {
        Processor {
            id,
            speed,
            running: None,
            was_running: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ProcessorSet {
    processors: Vec<Processor>,
}

impl ProcessorSet {
    pub fn new(processors: Vec<Processor>) -> Self {
        Self { processors }
    }

    pub fn get(&self, id: ProcessorId) -> &Processor {
        &self.processors[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ProcessorId) -> &mut Processor {
        &mut self.processors[id.0 as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Processor> {
        self.processors.iter()
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }
}
