use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use rtsim::engine::Engine;
use rtsim::etm::EtmKind;
use rtsim::processor::{Processor, ProcessorSet};
use rtsim::scheduler::SchedulerKind;
use rtsim::task::{ProcessorId, Task, TaskId, TaskSet};

const CYCLES_PER_MS: u64 = 1000;

fn harmonic_task_set(n: usize) -> TaskSet {
    let tasks = (0..n)
        .map(|i| {
            let period_ms = 10.0 * (i + 1) as f64;
            Task {
                id: TaskId(i as u32),
                period_ms,
                deadline_ms: period_ms,
                wcet_ms: period_ms * 0.2,
                acet_ms: None,
                et_stddev_ms: None,
                wcet_hi_ms: None,
                criticality_level: None,
                processor: ProcessorId(0),
            }
        })
        .collect();
    TaskSet { tasks }
}

fn run_edf(n: usize, horizon_ms: f64) {
    let tasks = harmonic_task_set(n);
    let processors = ProcessorSet::new(vec![Processor::new(ProcessorId(0), 1.0)]);
    let etm = EtmKind::Wcet.build(CYCLES_PER_MS);
    let scheduler = SchedulerKind::Edf.build();
    let monitor = Box::new(rtsim::monitor::EventLog::default());
    let mut engine = Engine::new(tasks, processors, etm, scheduler, monitor, CYCLES_PER_MS, horizon_ms);
    engine.run().expect("run should not error");
    black_box(engine.jobs().len());
}

fn bench_engine_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_run");
    for n in [4usize, 8, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| run_edf(n, 10_000.0));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_engine_throughput);
criterion_main!(benches);
