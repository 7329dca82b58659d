//! Basic cothread example
//!
//! Creates ten coroutines that print around one yield, then drives them
//! round-robin until all have finished.
//!
//! # Environment Variables
//!
//! - `COT_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `COT_DEBUG=1` - Log every scheduler transition
//! - `COT_STACK_SIZE=65536` - Per-coroutine stack size in bytes

use cothread::{create, current_id, run_all, yield_now, live_count, RuntimeConfig};
use cothread::{kinfo, kerror};

// COT_LOG_LEVEL=debug COT_DEBUG=1 cargo run -p cothread-basic
fn main() {
    println!("=== cothread Basic Example ===\n");

    let config = RuntimeConfig::from_env();
    config.print();
    if let Err(e) = cothread::init(config) {
        kerror!("init failed: {}", e);
        std::process::exit(1);
    }

    for i in 0..10 {
        let id = create(move || {
            println!("begin{}", i);
            yield_now();
            println!("end{}", i);
        });
        kinfo!("created coroutine {} for task {}", id, i);
    }
    assert_eq!(current_id(), cothread::CoroutineId::MAIN);

    println!("{} coroutines ready\n", live_count());
    let resumes = run_all();

    println!("\n{} resumes, {} coroutines left", resumes, live_count());
    println!("\n=== Example Complete ===");
}
