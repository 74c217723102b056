use crate::time::{ms_to_cycles_ceil, Cycles};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessorId(pub u32);

/// Mixed-Criticality level. `LO < HI`, matching `simso.utils.MixedCriticality.CritLevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CritLevel {
    Lo,
    Hi,
}

impl CritLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            CritLevel::Lo => "LO",
            CritLevel::Hi => "HI",
        }
    }
}

impl std::str::FromStr for CritLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LO" => Ok(CritLevel::Lo),
            "HI" => Ok(CritLevel::Hi),
            other => Err(format!("unsupported criticality level: {other}")),
        }
    }
}

impl std::fmt::Display for CritLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A periodic task, immutable for the duration of a run. See spec §3.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub period_ms: f64,
    pub deadline_ms: f64,
    pub wcet_ms: f64,
    pub acet_ms: Option<f64>,
    pub et_stddev_ms: Option<f64>,
    pub wcet_hi_ms: Option<f64>,
    pub criticality_level: Option<CritLevel>,
    pub processor: ProcessorId,
}

impl Task {
    pub fn is_mc(&self) -> bool {
        self.criticality_level.is_some()
    }

    pub fn period_cycles(&self, cycles_per_ms: u64) -> Cycles {
        ms_to_cycles_ceil(self.period_ms, cycles_per_ms)
    }

    pub fn deadline_cycles(&self, cycles_per_ms: u64) -> Cycles {
        ms_to_cycles_ceil(self.deadline_ms, cycles_per_ms)
    }

    pub fn wcet_cycles(&self, cycles_per_ms: u64) -> Cycles {
        ms_to_cycles_ceil(self.wcet_ms, cycles_per_ms)
    }

    pub fn wcet_hi_cycles(&self, cycles_per_ms: u64) -> Option<Cycles> {
        self.wcet_hi_ms.map(|w| ms_to_cycles_ceil(w, cycles_per_ms))
    }

    pub fn utilization_lo(&self) -> f64 {
        self.wcet_ms / self.period_ms
    }

    pub fn utilization_hi(&self) -> f64 {
        self.wcet_hi_ms.unwrap_or(self.wcet_ms) / self.period_ms
    }
}

#[derive(Debug, Clone)]
pub struct TaskSet {
    pub tasks: Vec<Task>,
}

impl TaskSet {
    pub fn get(&self, id: TaskId) -> &Task {
        &self.tasks[id.0 as usize]
    }

    pub fn total_utilization(&self) -> f64 {
        self.tasks.iter().map(Task::utilization_lo).sum()
    }

    pub fn all_mc(&self) -> bool {
        self.tasks.iter().all(Task::is_mc)
    }

    /// `U_k^j`: system utilization at criticality level `k` for tasks whose
    /// own criticality is `j`. Grounded on
    /// `EDF_VD_mono.system_utilization_at_level`.
    pub fn utilization_at_level(&self, k: CritLevel, j: CritLevel) -> f64 {
        self.tasks
            .iter()
            .filter(|t| t.criticality_level == Some(j))
            .map(|t| match k {
                CritLevel::Lo => t.wcet_ms / t.period_ms,
                CritLevel::Hi => t.wcet_hi_ms.unwrap_or(t.wcet_ms) / t.period_ms,
            })
            .sum()
    }
}
