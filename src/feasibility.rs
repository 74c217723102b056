//! Pre-run schedulability checks (SPEC_FULL §4.9). These are advisory: the
//! event-driven `Engine` is the authority on what actually happens, so a
//! caller logs a warning on infeasibility rather than refusing to run.
//! Grounded on `rt.rs`'s `rm_ll_bound`, `rm_rta_feasible`, `edf_dbf_feasible`
//! and `edf_candidate_times`, generalized from `Micros` to simulation
//! `Cycles`.

use crate::task::{Task, TaskSet};
use crate::time::Cycles;

/// The Liu & Layland sufficient RM bound: `n(2^(1/n) - 1)`.
pub fn rm_liu_layland_bound(n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        n as f64 * (2f64.powf(1.0 / n as f64) - 1.0)
    }
}

/// Exact fixed-priority response-time analysis for Rate-Monotonic
/// (shorter period = higher priority). Returns the offending task's id and
/// its computed response time on infeasibility.
pub fn rm_response_time_analysis(tasks: &TaskSet, cycles_per_ms: u64) -> std::result::Result<(), (u32, Cycles)> {
    let mut ordered: Vec<&Task> = tasks.tasks.iter().collect();
    ordered.sort_by(|a, b| a.period_ms.partial_cmp(&b.period_ms).unwrap());

    for (i, ti) in ordered.iter().enumerate() {
        let ci = ti.wcet_cycles(cycles_per_ms);
        let di = ti.deadline_cycles(cycles_per_ms);
        let mut r = ci;
        loop {
            let mut interference: Cycles = 0;
            for tj in &ordered[..i] {
                let pj = tj.period_cycles(cycles_per_ms);
                let cj = tj.wcet_cycles(cycles_per_ms);
                let n = r.div_ceil(pj);
                interference = interference.saturating_add(n.saturating_mul(cj));
            }
            let next = ci.saturating_add(interference);
            if next > di {
                return Err((ti.id.0, next));
            }
            if next == r {
                break;
            }
            r = next;
        }
    }
    Ok(())
}

fn dbf_task(t: &Task, x: Cycles, cycles_per_ms: u64) -> Cycles {
    let d = t.deadline_cycles(cycles_per_ms);
    if x < d {
        return 0;
    }
    let p = t.period_cycles(cycles_per_ms);
    let k = (x - d) / p + 1;
    k.saturating_mul(t.wcet_cycles(cycles_per_ms))
}

fn edf_candidate_times(tasks: &TaskSet, horizon: Cycles, cycles_per_ms: u64) -> Vec<Cycles> {
    let mut cands = Vec::new();
    for t in &tasks.tasks {
        let d = t.deadline_cycles(cycles_per_ms);
        let p = t.period_cycles(cycles_per_ms);
        let mut k: u64 = 0;
        loop {
            let x = match d.checked_add(k.saturating_mul(p)) {
                Some(v) if v <= horizon => v,
                _ => break,
            };
            cands.push(x);
            k = k.saturating_add(1);
            if k > 1_000_000 {
                break;
            }
        }
    }
    cands.sort_unstable();
    cands.dedup();
    cands.into_iter().filter(|&x| x > 0).collect()
}

/// EDF processor-demand bound test, checked at every candidate instant up
/// to `horizon`. Returns the first instant where demand exceeds supply.
pub fn edf_processor_demand_bound(
    tasks: &TaskSet,
    horizon: Cycles,
    cycles_per_ms: u64,
) -> std::result::Result<(), Cycles> {
    if tasks.total_utilization() > 1.0 + 1e-9 {
        return Err(0);
    }
    for x in edf_candidate_times(tasks, horizon, cycles_per_ms) {
        let demand: u128 = tasks
            .tasks
            .iter()
            .map(|t| dbf_task(t, x, cycles_per_ms) as u128)
            .sum();
        if demand > x as u128 {
            return Err(x);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{ProcessorId, TaskId};

    fn task(id: u32, period_ms: f64, wcet_ms: f64) -> Task {
        Task {
            id: TaskId(id),
            period_ms,
            deadline_ms: period_ms,
            wcet_ms,
            acet_ms: None,
            et_stddev_ms: None,
            wcet_hi_ms: None,
            criticality_level: None,
            processor: ProcessorId(0),
        }
    }

    #[test]
    fn rm_bound_accepts_classic_example() {
        let ts = TaskSet { tasks: vec![task(0, 10.0, 2.5), task(1, 10.0, 2.0)] };
        assert!(ts.total_utilization() <= rm_liu_layland_bound(2) + 1e-9);
        assert!(rm_response_time_analysis(&ts, 1000).is_ok());
    }

    #[test]
    fn rm_rta_rejects_overloaded_set() {
        let ts = TaskSet { tasks: vec![task(0, 4.0, 3.0), task(1, 4.0, 3.0)] };
        assert!(rm_response_time_analysis(&ts, 1000).is_err());
    }

    #[test]
    fn edf_accepts_high_utilization_rm_would_reject() {
        let ts = TaskSet {
            tasks: vec![task(0, 10.0, 3.0), task(1, 10.0, 3.0), task(2, 10.0, 3.0)],
        };
        assert!(rm_response_time_analysis(&ts, 1000).is_err());
        assert!(edf_processor_demand_bound(&ts, 100_000, 1000).is_ok());
    }
}
