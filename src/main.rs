//! Hang detector for concurrent directory workloads.
//!
//! Runs a random mix of `list`, `create`, `remove` and `move_node` over a
//! small namespace from several threads, so that operations keep colliding
//! on the same directories. A watchdog reports any thread stuck on one
//! operation for more than two seconds. Afterwards the tree must be
//! quiescent: no holds, no presence, consistent parent links.
//!
//! Run with:
//! ```bash
//! # 8 threads, 20k ops each (defaults)
//! cargo run --release
//!
//! # 16 threads, 100k ops each, JSON log in logs/dirtree.json
//! RUST_LOG=dirtree=debug cargo run --release --features tracing -- 16 100000
//!
//! # usage; zero or non-numeric counts are rejected
//! cargo run --release -- --help
//! ```

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use clap::Parser;
use dirtree::{Tree, TreeError};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
type TracingGuard = tracing_appender::non_blocking::WorkerGuard;

#[cfg(not(feature = "tracing"))]
type TracingGuard = ();

const DEFAULT_THREADS: &str = "8";
const DEFAULT_OPS: &str = "20000";
const STALL_MS: u64 = 2000;

// =============================================================================
// Tracing (JSON to file)
// =============================================================================

#[cfg(feature = "tracing")]
fn init_json_tracing() -> TracingGuard {
    use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = std::env::var("DIRTREE_LOG_DIR").unwrap_or_else(|_| "logs".to_string());
    let filter_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "dirtree=warn".to_string());

    let _ = std::fs::create_dir_all(&log_dir);

    let file_appender = tracing_appender::rolling::never(&log_dir, "dirtree.json");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_thread_ids(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .json()
        .with_filter(EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new("warn")));

    let _ = tracing_subscriber::registry().with(file_layer).try_init();

    println!("Tracing enabled: {log_dir}/dirtree.json (filter: {filter_str})");

    guard
}

#[cfg(not(feature = "tracing"))]
fn init_json_tracing() -> TracingGuard {
    println!("Tracing disabled (compile with --features tracing)");
}

// =============================================================================
// Workload
// =============================================================================

const NAMES: [&str; 3] = ["a", "b", "c"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    List,
    Create,
    Remove,
    Move,
}

impl Op {
    const ALL: [Self; 4] = [Self::List, Self::Create, Self::Remove, Self::Move];

    const fn index(self) -> usize {
        self as usize
    }
}

/// Linear congruential generator seeded per thread.
struct Rng(u64);

impl Rng {
    const fn new(thread_id: usize) -> Self {
        Self((thread_id as u64 + 1).wrapping_mul(0x9e37_79b9_7f4a_7c15))
    }

    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        self.0 >> 33
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }

    /// A path of one to three components over [`NAMES`].
    fn path(&mut self) -> String {
        let depth = 1 + self.below(3);
        let mut p = String::from("/");
        for _ in 0..depth {
            p.push_str(NAMES[self.below(NAMES.len())]);
            p.push('/');
        }
        p
    }

    fn op(&mut self) -> Op {
        Op::ALL[self.below(Op::ALL.len())]
    }
}

/// Per-operation outcome counts: `[ok, err]` for each [`Op`].
#[derive(Default)]
struct Outcomes {
    counts: [[AtomicUsize; 2]; 4],
}

impl Outcomes {
    fn record(&self, op: Op, ok: bool) {
        self.counts[op.index()][usize::from(!ok)].fetch_add(1, Ordering::Relaxed);
    }

    fn print(&self) {
        for op in Op::ALL {
            let [ok, err] = &self.counts[op.index()];
            println!(
                "  {:<7} ok={:<8} err={}",
                format!("{op:?}"),
                ok.load(Ordering::Relaxed),
                err.load(Ordering::Relaxed)
            );
        }
    }
}

// =============================================================================
// Thread progress tracking for hang detection
// =============================================================================

struct ThreadProgress {
    /// Current operation index for each thread
    current_op: Vec<AtomicUsize>,
    /// Last time each thread made progress
    last_progress_ms: Vec<AtomicU64>,
    done: Vec<AtomicBool>,
    start: Instant,
}

impl ThreadProgress {
    fn new(num_threads: usize) -> Self {
        Self {
            current_op: (0..num_threads).map(|_| AtomicUsize::new(0)).collect(),
            last_progress_ms: (0..num_threads).map(|_| AtomicU64::new(0)).collect(),
            done: (0..num_threads).map(|_| AtomicBool::new(false)).collect(),
            start: Instant::now(),
        }
    }

    fn update(&self, thread_id: usize, op: usize) {
        self.current_op[thread_id].store(op, Ordering::Relaxed);
        self.last_progress_ms[thread_id]
            .store(self.start.elapsed().as_millis() as u64, Ordering::Relaxed);
    }

    fn mark_done(&self, thread_id: usize) {
        self.done[thread_id].store(true, Ordering::Relaxed);
    }

    fn report_stuck(&self, timeout_ms: u64) -> Vec<(usize, usize, u64)> {
        let now_ms = self.start.elapsed().as_millis() as u64;
        let mut stuck = Vec::new();

        for (i, done) in self.done.iter().enumerate() {
            if done.load(Ordering::Relaxed) {
                continue;
            }
            let last = self.last_progress_ms[i].load(Ordering::Relaxed);
            if now_ms.saturating_sub(last) > timeout_ms {
                stuck.push((i, self.current_op[i].load(Ordering::Relaxed), now_ms - last));
            }
        }
        stuck
    }

    fn all_done(&self) -> bool {
        self.done.iter().all(|d| d.load(Ordering::Relaxed))
    }
}

// =============================================================================
// Run
// =============================================================================

fn apply(tree: &Tree, rng: &mut Rng, op: Op) -> Result<(), TreeError> {
    match op {
        Op::List => tree.list(&rng.path()).map(drop),
        Op::Create => tree.create(&rng.path()),
        Op::Remove => tree.remove(&rng.path()),
        Op::Move => {
            let source = rng.path();
            let target = rng.path();
            tree.move_node(&source, &target)
        }
    }
}

fn run(threads: usize, ops_per_thread: usize) -> bool {
    println!("\n{}", "=".repeat(80));
    println!("MIXED WORKLOAD ({threads} threads, {ops_per_thread} ops/thread)");
    println!("{}", "=".repeat(80));

    let tree = Arc::new(Tree::new());
    let outcomes = Arc::new(Outcomes::default());
    let progress = Arc::new(ThreadProgress::new(threads));
    let stop_watchdog = Arc::new(AtomicBool::new(false));

    let watchdog = {
        let progress = Arc::clone(&progress);
        let stop = Arc::clone(&stop_watchdog);
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(500));
                for (tid, op, stall_ms) in progress.report_stuck(STALL_MS) {
                    eprintln!("!!! STUCK: Thread {tid} at op {op} for {stall_ms}ms");
                }
                if progress.all_done() {
                    break;
                }
            }
        })
    };

    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let tree = Arc::clone(&tree);
            let outcomes = Arc::clone(&outcomes);
            let progress = Arc::clone(&progress);
            thread::spawn(move || {
                let mut rng = Rng::new(t);

                for i in 0..ops_per_thread {
                    progress.update(t, i);

                    let op = rng.op();
                    let op_start = Instant::now();
                    let result = apply(&tree, &mut rng, op);
                    let op_elapsed = op_start.elapsed();

                    if op_elapsed > Duration::from_millis(100) {
                        eprintln!("[T{t:02}] SLOW op {i} ({op:?}) took {op_elapsed:?}");
                        #[cfg(feature = "tracing")]
                        tracing::warn!(thread = t, op = i, kind = ?op, elapsed = ?op_elapsed, "SLOW_OP");
                    }

                    outcomes.record(op, result.is_ok());
                }

                progress.mark_done(t);
            })
        })
        .collect();

    let mut panicked = false;
    for h in handles {
        panicked |= h.join().is_err();
    }

    stop_watchdog.store(true, Ordering::Relaxed);
    let _ = watchdog.join();

    let elapsed = start.elapsed();
    let total = threads * ops_per_thread;
    println!(
        "DONE: {total} ops in {elapsed:?} ({:.0} ops/sec)",
        total as f64 / elapsed.as_secs_f64()
    );
    outcomes.print();

    let quiescent = tree.is_quiescent();
    println!("root: {:?}", tree.root_snapshot());
    println!("quiescent: {quiescent}");

    !panicked && quiescent
}

#[derive(Parser, Debug)]
#[command(about = "Run a colliding directory workload and report stalled threads")]
struct Args {
    /// Worker threads
    #[arg(default_value = DEFAULT_THREADS)]
    threads: NonZeroUsize,
    /// Operations per worker thread
    #[arg(default_value = DEFAULT_OPS)]
    ops: NonZeroUsize,
}

fn main() -> std::process::ExitCode {
    let args = Args::parse();
    let _guard = init_json_tracing();

    let threads = args.threads.get();
    let ops_per_thread = args.ops.get();

    eprintln!("Directory Tree Hang Detector");
    eprintln!("============================");
    eprintln!("Watchdog will report any thread stuck for >{}s.", STALL_MS / 1000);

    if run(threads, ops_per_thread) {
        std::process::ExitCode::SUCCESS
    } else {
        eprintln!("\nWorkload left the tree in an inconsistent state");
        std::process::ExitCode::FAILURE
    }
}
