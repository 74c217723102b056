//! Result serialization (SPEC_FULL §1, "Report" component). Turns the
//! recorded `Event` stream plus the final job arena into a summary
//! suitable for `serde_json` output or a plain-text table; not part of
//! the CORE, grounded on the Config module's plain-data style.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::job::{JobArena, JobState};
use crate::monitor::{Event, EventLog};
use crate::task::{TaskId, TaskSet};

#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub task_id: u32,
    pub jobs_released: u64,
    pub jobs_terminated: u64,
    pub jobs_aborted: u64,
    pub mean_response_time_ms: Option<f64>,
    pub max_response_time_ms: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub cycles_per_ms: u64,
    pub horizon_ms: f64,
    pub total_jobs: u64,
    pub total_aborted: u64,
    pub mode_switch_timestamps_ms: Vec<f64>,
    pub per_task: Vec<TaskSummary>,
    #[serde(skip)]
    pub events: Vec<Event>,
}

impl Report {
    pub fn build(jobs: &JobArena, tasks: &TaskSet, log: &EventLog, cycles_per_ms: u64, horizon_ms: f64) -> Self {
        let mut released: HashMap<TaskId, u64> = HashMap::new();
        let mut terminated: HashMap<TaskId, u64> = HashMap::new();
        let mut aborted: HashMap<TaskId, u64> = HashMap::new();
        let mut response_times: HashMap<TaskId, Vec<f64>> = HashMap::new();

        for job in jobs.iter() {
            *released.entry(job.task).or_insert(0) += 1;
            match job.state {
                JobState::Terminated => *terminated.entry(job.task).or_insert(0) += 1,
                JobState::Aborted => *aborted.entry(job.task).or_insert(0) += 1,
                _ => {}
            }
            if let Some(end) = job.end_date {
                let activation_ms = job.activation_cycle as f64 / cycles_per_ms as f64;
                let rt = end as f64 / cycles_per_ms as f64 - activation_ms;
                response_times.entry(job.task).or_default().push(rt);
            }
        }

        let mode_switch_timestamps_ms = log
            .events
            .iter()
            .filter_map(|e| match e {
                Event::ModeSwitchUp { at } => Some(*at as f64 / cycles_per_ms as f64),
                _ => None,
            })
            .collect();

        let per_task = tasks
            .tasks
            .iter()
            .map(|t| {
                let rts = response_times.get(&t.id);
                let mean = rts.map(|v| v.iter().sum::<f64>() / v.len() as f64);
                let max = rts.and_then(|v| v.iter().cloned().fold(None, |acc: Option<f64>, x| {
                    Some(acc.map_or(x, |m| m.max(x)))
                }));
                TaskSummary {
                    task_id: t.id.0,
                    jobs_released: *released.get(&t.id).unwrap_or(&0),
                    jobs_terminated: *terminated.get(&t.id).unwrap_or(&0),
                    jobs_aborted: *aborted.get(&t.id).unwrap_or(&0),
                    mean_response_time_ms: mean,
                    max_response_time_ms: max,
                }
            })
            .collect();

        Report {
            cycles_per_ms,
            horizon_ms,
            total_jobs: jobs.len() as u64,
            total_aborted: aborted.values().sum(),
            mode_switch_timestamps_ms,
            per_task,
            events: log.events.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_text_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "task  released  terminated  aborted  mean_rt_ms  max_rt_ms");
        for s in &self.per_task {
            let _ = writeln!(
                out,
                "{:<5} {:<9} {:<11} {:<8} {:<11} {:<10}",
                s.task_id,
                s.jobs_released,
                s.jobs_terminated,
                s.jobs_aborted,
                s.mean_response_time_ms.map(|v| format!("{v:.3}")).unwrap_or_else(|| "-".to_string()),
                s.max_response_time_ms.map(|v| format!("{v:.3}")).unwrap_or_else(|| "-".to_string()),
            );
        }
        if !self.mode_switch_timestamps_ms.is_empty() {
            let _ = writeln!(out, "mode switches (ms): {:?}", self.mode_switch_timestamps_ms);
        }
        out
    }
}
