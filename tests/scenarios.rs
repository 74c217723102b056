//! End-to-end scenarios run through the full `Engine`, one per concrete
//! case this simulator is expected to reproduce exactly.

use std::cell::RefCell;
use std::rc::Rc;

use rtsim::engine::Engine;
use rtsim::etm::EtmKind;
use rtsim::job::JobState;
use rtsim::monitor::{Event, EventLog, Monitor};
use rtsim::processor::{Processor, ProcessorSet};
use rtsim::scheduler::SchedulerKind;
use rtsim::task::{CritLevel, ProcessorId, Task, TaskId, TaskSet};

const CYCLES_PER_MS: u64 = 1000;

fn one_processor() -> ProcessorSet {
    ProcessorSet::new(vec![Processor::new(ProcessorId(0), 1.0)])
}

fn two_processors() -> ProcessorSet {
    ProcessorSet::new(vec![
        Processor::new(ProcessorId(0), 1.0),
        Processor::new(ProcessorId(1), 1.0),
    ])
}

fn plain_task(id: u32, period_ms: f64, wcet_ms: f64, processor: u32) -> Task {
    Task {
        id: TaskId(id),
        period_ms,
        deadline_ms: period_ms,
        wcet_ms,
        acet_ms: None,
        et_stddev_ms: None,
        wcet_hi_ms: None,
        criticality_level: None,
        processor: ProcessorId(processor),
    }
}

fn run_with_log(
    tasks: TaskSet,
    processors: ProcessorSet,
    etm: Box<dyn rtsim::etm::Etm>,
    scheduler: Box<dyn rtsim::scheduler::Scheduler>,
    horizon_ms: f64,
) -> (Engine, Vec<Event>) {
    let log = Rc::new(RefCell::new(EventLog::default()));
    let monitor: Box<dyn Monitor> = Box::new(log.clone());
    let mut engine = Engine::new(tasks, processors, etm, scheduler, monitor, CYCLES_PER_MS, horizon_ms);
    engine.run().expect("run should not error");
    let events = log.borrow().events.clone();
    (engine, events)
}

/// Scenario 1: a single WCET task on an otherwise idle system runs to
/// completion every period with no contention.
#[test]
fn single_wcet_task_idle_system() {
    let tasks = TaskSet { tasks: vec![plain_task(0, 10.0, 3.0, 0)] };
    let (engine, events) = run_with_log(
        tasks,
        one_processor(),
        EtmKind::Wcet.build(CYCLES_PER_MS),
        SchedulerKind::Edf.build(),
        25.0,
    );

    assert_eq!(engine.jobs().len(), 3); // activations at 0, 10, 20
    for job in engine.jobs().iter() {
        assert_eq!(job.state, JobState::Terminated);
        assert!(!job.aborted);
        let end = job.end_date.unwrap();
        assert_eq!(end - job.activation_cycle, 3000);
    }
    assert!(!events.iter().any(|e| matches!(e, Event::Preempted { .. })));
    assert!(!events.iter().any(|e| matches!(e, Event::Aborted { .. })));
    assert_eq!(events.iter().filter(|e| matches!(e, Event::BeginTerminate { .. })).count(), 3);
    assert_eq!(events.iter().filter(|e| matches!(e, Event::EndTerminate { .. })).count(), 3);
}

/// Scenario 2: two EDF tasks on one processor. The lower-id task (shorter
/// deadline) releases second here purely to exercise the FIFO tie-break on
/// simultaneous releases: the first-released job (longer deadline) is
/// briefly dispatched onto the idle processor, then immediately preempted
/// once the earlier-deadline job arrives in the same instant.
#[test]
fn two_task_edf_preemption() {
    // task 0: the "T2" of the scenario narrative (period 7, wcet 3)
    // task 1: the "T1" of the scenario narrative (period 5, wcet 2)
    let tasks = TaskSet {
        tasks: vec![plain_task(0, 7.0, 3.0, 0), plain_task(1, 5.0, 2.0, 0)],
    };
    let (engine, events) = run_with_log(
        tasks,
        one_processor(),
        EtmKind::Wcet.build(CYCLES_PER_MS),
        SchedulerKind::Edf.build(),
        8.0,
    );

    let t2 = engine.jobs().get(rtsim::job::JobId(0));
    let t1 = engine.jobs().get(rtsim::job::JobId(1));

    // T1 (shorter deadline) ran uninterrupted from 0 to 2ms.
    assert_eq!(t1.start_date, Some(0));
    assert_eq!(t1.end_date, Some(2000));
    assert_eq!(t1.state, JobState::Terminated);

    // T2 was dispatched at 0, preempted at 0, then resumed at 2ms and ran
    // to completion at 5ms (3ms of total execution).
    assert_eq!(t2.end_date, Some(5000));
    assert_eq!(t2.computation_time, 3000);
    assert_eq!(t2.state, JobState::Terminated);

    let preempts: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, Event::Preempted { job, .. } if *job == rtsim::job::JobId(0)))
        .collect();
    assert_eq!(preempts.len(), 1);
    assert_eq!(preempts[0].at(), 0);
}

/// Scenario 3: a single HI-crit MC task whose drawn execution time (4ms)
/// exceeds its LO-mode WCET (2ms) but stays under `wcet_hi` (5ms) forces a
/// mode switch partway through, then the job still terminates normally.
#[test]
fn mc_mode_switch_on_overrun() {
    let mut task = plain_task(0, 10.0, 2.0, 0);
    task.wcet_hi_ms = Some(5.0);
    task.criticality_level = Some(CritLevel::Hi);
    let tasks = TaskSet { tasks: vec![task] };

    let (engine, events) = run_with_log(
        tasks,
        one_processor(),
        EtmKind::Apriori { exec_times_ms: vec![4.0] }.build(CYCLES_PER_MS),
        SchedulerKind::EdfVd.build(),
        10.0,
    );

    let job = engine.jobs().get(rtsim::job::JobId(0));
    assert_eq!(job.end_date, Some(4000));
    assert!(!job.aborted);
    assert_eq!(job.state, JobState::Terminated);

    let overrun = events.iter().find(|e| matches!(e, Event::Overrun { .. })).expect("overrun fired");
    assert_eq!(overrun.at(), 2000);
    let switch = events.iter().find(|e| matches!(e, Event::ModeSwitchUp { .. })).expect("mode switch fired");
    assert_eq!(switch.at(), 2000);
    assert!(!events.iter().any(|e| matches!(e, Event::Aborted { .. })));
}

/// Scenario 4: EDF-VD scales HI-crit jobs' absolute deadlines down while
/// the system utilization condition holds, using the virtual-deadline
/// coefficient computed from the task set's LO/HI utilizations.
#[test]
fn edf_vd_scales_hi_crit_deadlines() {
    let mut a = plain_task(0, 10.0, 4.0, 0);
    a.wcet_hi_ms = Some(8.0);
    a.criticality_level = Some(CritLevel::Hi);
    let mut b = plain_task(1, 10.0, 4.0, 1);
    b.wcet_hi_ms = Some(8.0);
    b.criticality_level = Some(CritLevel::Hi);
    let tasks = TaskSet { tasks: vec![a, b] };

    // Ulo_lo = 0 (no LO-crit tasks); Uhi_hi = 0.8 + 0.8 = 1.6 > 1, so the
    // scaling condition holds; Ulo_hi = 0.4 + 0.4 = 0.8, vd_coeff = 0.8.
    let (engine, _events) = run_with_log(
        tasks,
        two_processors(),
        EtmKind::Wcet.build(CYCLES_PER_MS),
        SchedulerKind::EdfVd.build(),
        0.001,
    );

    for job in engine.jobs().iter() {
        assert_eq!(job.absolute_deadline, 8000, "deadline should be scaled to 0.8 * 10ms");
        assert_eq!(job.original_absolute_deadline, 10000);
    }
}

/// Scenario 5: a low-priority task starved by a higher-priority one misses
/// its deadline and is aborted with only partial execution recorded.
#[test]
fn deadline_miss_is_aborted() {
    let tasks = TaskSet {
        tasks: vec![plain_task(0, 2.0, 1.0, 0), plain_task(1, 5.0, 4.0, 0)],
    };
    let (engine, events) = run_with_log(
        tasks,
        one_processor(),
        EtmKind::Wcet.build(CYCLES_PER_MS),
        SchedulerKind::Edf.build(),
        6.0,
    );

    let starved = engine.jobs().get(rtsim::job::JobId(1));
    assert!(starved.aborted);
    assert_eq!(starved.end_date, Some(5000));
    assert_eq!(starved.computation_time, 3000);
    assert!(starved.exceeded_deadline());
    assert_eq!(starved.state, JobState::Aborted);

    assert!(events.iter().any(|e| matches!(e, Event::Aborted { job, at } if *job == rtsim::job::JobId(1) && *at == 5000)));
}

/// A zero-laxity job (`wcet == deadline`) on an idle processor finishes
/// exactly at its deadline and must be recorded as terminated, not
/// aborted, regardless of the order the engine pops the two same-cycle
/// events (`DeadlineCheck` and the terminating `HoldExpire`) in.
#[test]
fn zero_laxity_job_terminates_on_time_not_aborted() {
    let tasks = TaskSet { tasks: vec![plain_task(0, 100.0, 5.0, 0)] };
    let (engine, events) = run_with_log(
        tasks,
        one_processor(),
        EtmKind::Wcet.build(CYCLES_PER_MS),
        SchedulerKind::Edf.build(),
        5.0,
    );

    let job = engine.jobs().get(rtsim::job::JobId(0));
    assert_eq!(job.end_date, Some(5000));
    assert!(!job.aborted);
    assert!(!job.exceeded_deadline());
    assert_eq!(job.state, JobState::Terminated);

    assert!(events.iter().any(|e| matches!(e, Event::Terminated { job, at } if *job == rtsim::job::JobId(0) && *at == 5000)));
    assert!(!events.iter().any(|e| matches!(e, Event::Aborted { .. })));
}

/// Scenario 6: replaying an ACET-driven run with the same seed produces an
/// identical event stream, byte for byte.
#[test]
fn determinism_under_fixed_seed() {
    fn build_and_run() -> Vec<Event> {
        let mut task = plain_task(0, 10.0, 5.0, 0);
        task.acet_ms = Some(3.0);
        task.et_stddev_ms = Some(1.0);
        let tasks = TaskSet { tasks: vec![task] };
        let (_engine, events) = run_with_log(
            tasks,
            one_processor(),
            EtmKind::Acet { stddev_seed: 42 }.build(CYCLES_PER_MS),
            SchedulerKind::Edf.build(),
            50.0,
        );
        events
    }

    let run_a = build_and_run();
    let run_b = build_and_run();
    assert_eq!(run_a, run_b);
    assert!(!run_a.is_empty());
}
