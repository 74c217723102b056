//! Task-set loading and validation (SPEC_FULL §6). Deserializes a
//! `SimulationConfig` from TOML or JSON via `serde`, then `build()`s it
//! into the CORE's immutable types, surfacing every invalid-parameter
//! case as a `ConfigError` rather than panicking. Grounded on
//! `genesis-lang/src/config.rs`'s struct-plus-`validate()` shape, using
//! synchronous `std::fs` since this crate has no async runtime.

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::etm::{Etm, EtmKind};
use crate::processor::{Processor, ProcessorSet};
use crate::scheduler::{Scheduler, SchedulerKind};
use crate::task::{CritLevel, ProcessorId, Task, TaskId, TaskSet};

fn default_seed() -> u64 {
    0x5EED
}

fn default_speed() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    pub cycles_per_ms: u64,
    pub horizon_ms: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    pub processors: Vec<ProcessorConfig>,
    pub tasks: Vec<TaskConfig>,
    pub etm: EtmConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    pub id: u32,
    #[serde(default = "default_speed")]
    pub speed: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub id: u32,
    pub period_ms: f64,
    pub deadline_ms: f64,
    pub wcet_ms: f64,
    pub processor: u32,
    pub acet_ms: Option<f64>,
    pub et_stddev_ms: Option<f64>,
    pub wcet_hi_ms: Option<f64>,
    pub criticality: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EtmConfig {
    Wcet,
    Acet,
    McAcet,
    Apriori { exec_times_ms: Vec<f64> },
    Cache {
        #[serde(default)]
        reload_penalty_ms: f64,
    },
    #[serde(rename = "fixedpenalty")]
    FixedPenalty {
        #[serde(default)]
        penalty_ms: f64,
    },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchedulerConfig {
    Edf,
    EdfVd,
    Rm,
}

/// Everything `Engine::new` needs, built from a validated config.
pub struct BuiltSimulation {
    pub tasks: TaskSet,
    pub processors: ProcessorSet,
    pub etm: Box<dyn Etm>,
    pub scheduler: Box<dyn Scheduler>,
    pub cycles_per_ms: u64,
    pub horizon_ms: f64,
}

impl SimulationConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(&path)?;
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(serde_json::from_str(&contents)?),
            _ => Ok(toml::from_str(&contents)?),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.cycles_per_ms == 0 {
            return Err(ConfigError::NonPositiveCyclesPerMs);
        }
        if self.processors.is_empty() {
            return Err(ConfigError::NoProcessors);
        }
        if self.tasks.is_empty() {
            return Err(ConfigError::NoTasks);
        }

        // Task/processor ids double as dense arena indices (TaskSet::get,
        // ProcessorSet::get), so they must be exactly 0..n.
        let mut proc_ids: Vec<u32> = self.processors.iter().map(|p| p.id).collect();
        proc_ids.sort_unstable();
        if proc_ids.iter().enumerate().any(|(i, &id)| i as u32 != id) {
            return Err(ConfigError::NonContiguousProcessorIds(proc_ids));
        }
        let mut task_ids: Vec<u32> = self.tasks.iter().map(|t| t.id).collect();
        task_ids.sort_unstable();
        if task_ids.iter().enumerate().any(|(i, &id)| i as u32 != id) {
            return Err(ConfigError::NonContiguousTaskIds(task_ids));
        }

        let is_mc_scheduler = matches!(self.scheduler, SchedulerConfig::EdfVd);
        let is_non_mc_scheduler = matches!(self.scheduler, SchedulerConfig::Rm);

        for t in &self.tasks {
            if t.period_ms <= 0.0 {
                return Err(ConfigError::NonPositivePeriod(t.id));
            }
            if t.deadline_ms <= 0.0 {
                return Err(ConfigError::NonPositiveDeadline(t.id));
            }
            if t.wcet_ms <= 0.0 {
                return Err(ConfigError::NonPositiveWcet(t.id));
            }
            if !self.processors.iter().any(|p| p.id == t.processor) {
                return Err(ConfigError::UnknownProcessor(t.id, t.processor));
            }

            let is_mc = match &t.criticality {
                Some(s) => {
                    CritLevel::from_str(s).map_err(|_| ConfigError::InvalidCriticality(t.id, s.clone()))?;
                    true
                }
                None => false,
            };

            if let Some(wcet_hi) = t.wcet_hi_ms {
                if t.wcet_ms > wcet_hi {
                    return Err(ConfigError::WcetExceedsWcetHi {
                        task: t.id,
                        wcet: t.wcet_ms,
                        wcet_hi,
                    });
                }
            }

            if is_mc_scheduler && !is_mc {
                return Err(ConfigError::NotMixedCriticality {
                    scheduler: "edf_vd".to_string(),
                    task: t.id,
                });
            }
            if is_non_mc_scheduler && is_mc {
                return Err(ConfigError::McNotAllowed {
                    scheduler: "rm".to_string(),
                    task: t.id,
                });
            }
        }

        if let EtmConfig::Apriori { exec_times_ms } = &self.etm {
            if exec_times_ms.is_empty() {
                return Err(ConfigError::EmptyAprioriTrace);
            }
            for &v in exec_times_ms {
                if v <= 0.0 {
                    return Err(ConfigError::NonPositiveAprioriEntry(v));
                }
            }
        }

        Ok(())
    }

    pub fn build(&self) -> Result<BuiltSimulation> {
        self.validate()?;

        let mut processors: Vec<Processor> = self
            .processors
            .iter()
            .map(|p| Processor::new(ProcessorId(p.id), p.speed))
            .collect();
        processors.sort_by_key(|p| p.id.0);
        let processors = ProcessorSet::new(processors);

        let mut task_vec: Vec<Task> = self
            .tasks
            .iter()
            .map(|t| Task {
                id: TaskId(t.id),
                period_ms: t.period_ms,
                deadline_ms: t.deadline_ms,
                wcet_ms: t.wcet_ms,
                acet_ms: t.acet_ms,
                et_stddev_ms: t.et_stddev_ms,
                wcet_hi_ms: t.wcet_hi_ms,
                criticality_level: t.criticality.as_deref().map(|s| CritLevel::from_str(s).unwrap()),
                processor: ProcessorId(t.processor),
            })
            .collect();
        task_vec.sort_by_key(|t| t.id.0);
        let tasks = TaskSet { tasks: task_vec };

        let etm_kind = match &self.etm {
            EtmConfig::Wcet => EtmKind::Wcet,
            EtmConfig::Acet => EtmKind::Acet { stddev_seed: self.seed },
            EtmConfig::McAcet => EtmKind::McAcet { stddev_seed: self.seed },
            EtmConfig::Apriori { exec_times_ms } => EtmKind::Apriori { exec_times_ms: exec_times_ms.clone() },
            EtmConfig::Cache { reload_penalty_ms } => EtmKind::Cache { reload_penalty_ms: *reload_penalty_ms },
            EtmConfig::FixedPenalty { penalty_ms } => EtmKind::FixedPenalty { penalty_ms: *penalty_ms },
        };

        let scheduler_kind = match self.scheduler {
            SchedulerConfig::Edf => SchedulerKind::Edf,
            SchedulerConfig::EdfVd => SchedulerKind::EdfVd,
            SchedulerConfig::Rm => SchedulerKind::Rm,
        };

        Ok(BuiltSimulation {
            etm: etm_kind.build(self.cycles_per_ms),
            scheduler: scheduler_kind.build(),
            tasks,
            processors,
            cycles_per_ms: self.cycles_per_ms,
            horizon_ms: self.horizon_ms,
        })
    }
}
