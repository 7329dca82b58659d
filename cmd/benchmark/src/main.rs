//! Benchmark: coroutines vs OS threads
//!
//! Creates and runs pairs of empty coroutines, then spawns and joins pairs
//! of empty OS threads, and reports the time each took.
//!
//! `COT_STACK_SIZE` changes the coroutine stack size (default 1MB).

use cothread::{create, run, live_count, RuntimeConfig};
use std::time::{Duration, Instant};

const LOOP_TIMES: u32 = 500 * 100;

fn main() {
    println!("=== cothread Benchmarks ===\n");

    if let Err(e) = cothread::init(RuntimeConfig::from_env()) {
        cothread::kerror!("init failed: {}", e);
        std::process::exit(1);
    }

    let co = bench_coroutine();
    let th = bench_thread();

    println!("Summary");
    println!("{}", "─".repeat(40));
    println!("  coroutine: {} times {:.6} s", LOOP_TIMES * 2, co.as_secs_f64());
    println!("  thread:    {} times {:.6} s", LOOP_TIMES * 2, th.as_secs_f64());
    if co.as_nanos() > 0 {
        println!("  Speedup:   {:.1}x", th.as_secs_f64() / co.as_secs_f64());
    }

    println!("\n=== Benchmarks Complete ===");
}

fn report(label: &str, elapsed: Duration) {
    let ops = (LOOP_TIMES * 2) as f64;
    println!("  Iterations:  {}", LOOP_TIMES * 2);
    println!("  Total time:  {:?}", elapsed);
    println!("  Per {:<9} {:.1} ns", format!("{}:", label), elapsed.as_nanos() as f64 / ops);
    println!("  Rate:        {:.0}/sec\n", ops / elapsed.as_secs_f64());
}

fn bench_coroutine() -> Duration {
    println!("Benchmark: Coroutine create + run");
    println!("{}", "─".repeat(40));

    let start = Instant::now();
    for _ in 0..LOOP_TIMES {
        let first = create(|| {});
        let second = create(|| {});
        run(first);
        run(second);
    }
    let elapsed = start.elapsed();
    debug_assert_eq!(live_count(), 0);

    report("coroutine", elapsed);
    elapsed
}

fn bench_thread() -> Duration {
    println!("Benchmark: Thread spawn + join");
    println!("{}", "─".repeat(40));

    let start = Instant::now();
    for _ in 0..LOOP_TIMES {
        let first = std::thread::spawn(|| {});
        let second = std::thread::spawn(|| {});
        first.join().expect("thread panicked");
        second.join().expect("thread panicked");
    }
    let elapsed = start.elapsed();

    report("thread", elapsed);
    elapsed
}
