use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anticipator::{Anticipator, HostRef, Warmup, WarmupConfig};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use sketches_ddsketch::DDSketch;

use crate::workloads::{
    PreparedWorkload, SyntheticHost, WorkloadsConfig, prepare_workload, process, register,
};

pub fn perform_stresstest(
    anticipator: Anticipator,
    startup: &WarmupConfig,
    workloads: WorkloadsConfig,
    warmup: Duration,
    duration: Duration,
) -> Result<()> {
    let anticipator = Arc::new(anticipator);

    // the configured startup plan runs against a host that answers after a fixed cost
    let host = HostRef::new(SyntheticHost {
        cost: Duration::from_micros(100),
    });
    let startup_scheduled = Warmup::new(&anticipator, host)
        .register(startup, &[])
        .context("failed to register startup anticipations")?;

    // initialize workloads
    let workloads: Vec<_> = workloads
        .workloads
        .into_iter()
        .enumerate()
        .map(|(i, workload)| Arc::new(prepare_workload(i, workload)))
        .collect();

    // warmup: register anticipations and give the worker a head start
    {
        let start = Instant::now();
        for workload in &workloads {
            register(&anticipator, workload).context("failed to register anticipations")?;
        }
        thread::sleep(warmup);

        println!(
            "Warmup: {:?}, {} startup anticipations, {} values and {} allocations ready",
            start.elapsed(),
            startup_scheduled,
            anticipator.value_cache().len(),
            anticipator.allocation_heap().len(),
        );
    };
    println!();

    // run the workloads concurrently
    let deadline = Instant::now() + duration;
    let mut tasks = Vec::with_capacity(workloads.len());
    for workload in &workloads {
        let task_durations = Arc::new(Mutex::new(DDSketch::default()));

        let threads: Vec<_> = (0..workload.concurrency)
            .map(|t| {
                let anticipator = Arc::clone(&anticipator);
                let workload = Arc::clone(workload);
                let task_durations = Arc::clone(&task_durations);

                thread::spawn(move || {
                    run_until(&anticipator, &workload, t, deadline, &task_durations)
                })
            })
            .collect();

        tasks.push((workload.concurrency, task_durations, threads));
    }

    for (i, (concurrency, task_durations, threads)) in tasks.into_iter().enumerate() {
        for thread in threads {
            if thread.join().is_err() {
                anyhow::bail!("workload {i} panicked");
            }
        }

        let task_durations = std::mem::take(&mut *task_durations.lock());
        report(i, concurrency, duration, &task_durations);
    }

    let released = anticipator.dispose();
    println!();
    println!("Disposed: {released} unclaimed results released");

    Ok(())
}

fn run_until(
    anticipator: &Anticipator,
    workload: &PreparedWorkload,
    thread: usize,
    deadline: Instant,
    task_durations: &Mutex<DDSketch>,
) {
    let mut local = DDSketch::default();

    for key in workload.keys.iter().cycle().skip(thread) {
        if Instant::now() >= deadline {
            break;
        }

        let task_start = Instant::now();
        process(anticipator, workload.store, key);
        local.add(task_start.elapsed().as_secs_f64());
    }

    if let Err(error) = task_durations.lock().merge(&local) {
        tracing::error!(%error, "failed to merge task durations");
    }
}

fn report(i: usize, concurrency: usize, duration: Duration, task_durations: &DDSketch) {
    let ops = task_durations.count();
    let ops_ps = ops as f32 / duration.as_secs_f32();
    println!("Workload {i} (concurrency: {concurrency}): {ops} operations, {ops_ps:.2} ops/s");

    if ops == 0 {
        return;
    }

    let quantile = |q| {
        let secs = task_durations.quantile(q).ok().flatten().unwrap_or_default();
        Duration::from_secs_f64(secs)
    };
    let avg = Duration::from_secs_f64(task_durations.sum().unwrap_or_default() / ops as f64);
    let (p50, p90, p99) = (quantile(0.5), quantile(0.9), quantile(0.99));
    println!("  avg: {avg:.2?}; p50: {p50:.2?}; p90: {p90:.2?}; p99: {p99:.2?}");
}
