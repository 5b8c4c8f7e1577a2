//! Loom tests for the node synchronization protocol.
//!
//! Loom provides deterministic concurrency testing by exploring all possible
//! thread interleavings. This catches lost wakeups and ordering bugs that
//! random testing might miss.
//!
//! Run with: `RUSTFLAGS="--cfg loom" cargo test --lib nodesync::loom_tests --release`
//!
//! NOTE: Loom needs its own `Mutex`/`Condvar`. `LoomSync` supplies them to
//! [`Monitor`], so the wait loops under test are the ones [`NodeSync`] runs.

use loom::sync::atomic::{AtomicUsize, Ordering};
use loom::sync::{Arc, Condvar, Mutex, MutexGuard};
use loom::thread;

use super::{Monitor, SyncState};

/// [`Monitor`] on loom primitives.
struct LoomSync {
    state: Mutex<SyncState>,
    readers: Condvar,
    writers: Condvar,
}

impl LoomSync {
    fn new() -> Self {
        Self {
            state: Mutex::new(SyncState::default()),
            readers: Condvar::new(),
            writers: Condvar::new(),
        }
    }
}

impl Monitor for LoomSync {
    type Guard<'a> = MutexGuard<'a, SyncState>;

    fn lock(&self) -> Self::Guard<'_> {
        self.state.lock().unwrap()
    }

    fn wait_readers<'a>(&'a self, guard: Self::Guard<'a>) -> Self::Guard<'a> {
        self.readers.wait(guard).unwrap()
    }

    fn wait_writers<'a>(&'a self, guard: Self::Guard<'a>) -> Self::Guard<'a> {
        self.writers.wait(guard).unwrap()
    }

    fn notify_reader(&self) {
        self.readers.notify_one();
    }

    fn notify_writer(&self) {
        self.writers.notify_one();
    }
}

/// A reader and a writer never overlap, and neither is left waiting.
#[test]
fn test_loom_reader_writer_exclusion() {
    loom::model(|| {
        let sync = Arc::new(LoomSync::new());
        let inside = Arc::new(AtomicUsize::new(0));

        let s1 = Arc::clone(&sync);
        let i1 = Arc::clone(&inside);
        let writer = thread::spawn(move || {
            s1.enter_exclusive();
            assert_eq!(i1.fetch_add(1, Ordering::SeqCst), 0);
            i1.fetch_sub(1, Ordering::SeqCst);
            s1.exit_exclusive();
        });

        let s2 = Arc::clone(&sync);
        let i2 = Arc::clone(&inside);
        let reader = thread::spawn(move || {
            s2.enter_shared();
            assert_eq!(i2.fetch_add(1, Ordering::SeqCst), 0);
            i2.fetch_sub(1, Ordering::SeqCst);
            s2.exit_shared();
            s2.depart();
        });

        writer.join().unwrap();
        reader.join().unwrap();
        assert!(sync.is_idle());
    });
}

/// A writer is not admitted until a passed-through reader departs.
#[test]
fn test_loom_writer_waits_for_departure() {
    loom::model(|| {
        let sync = Arc::new(LoomSync::new());
        let below = Arc::new(AtomicUsize::new(0));

        let s1 = Arc::clone(&sync);
        let b1 = Arc::clone(&below);
        let reader = thread::spawn(move || {
            s1.enter_shared();
            b1.store(1, Ordering::SeqCst);
            s1.exit_shared();
            // Still "below" the node here.
            thread::yield_now();
            b1.store(0, Ordering::SeqCst);
            s1.depart();
        });

        let s2 = Arc::clone(&sync);
        let b2 = Arc::clone(&below);
        let writer = thread::spawn(move || {
            s2.enter_exclusive();
            assert_eq!(b2.load(Ordering::SeqCst), 0, "writer overlapped a reader below");
            s2.exit_exclusive();
        });

        reader.join().unwrap();
        writer.join().unwrap();
        assert!(sync.is_idle());
    });
}

/// Two writers serialize and both finish.
#[test]
fn test_loom_two_writers() {
    loom::model(|| {
        let sync = Arc::new(LoomSync::new());
        let counter = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let s = Arc::clone(&sync);
                let c = Arc::clone(&counter);
                thread::spawn(move || {
                    s.enter_exclusive();
                    let val = c.load(Ordering::Relaxed);
                    c.store(val + 1, Ordering::Relaxed);
                    s.exit_exclusive();
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(counter.load(Ordering::Relaxed), 2);
        assert!(sync.is_idle());
    });
}

/// Readers queued behind a writer are all woken (no lost cascade wakeup).
#[test]
fn test_loom_queued_readers_all_admitted() {
    loom::model(|| {
        let sync = Arc::new(LoomSync::new());
        sync.enter_exclusive();

        let readers: Vec<_> = (0..2)
            .map(|_| {
                let s = Arc::clone(&sync);
                thread::spawn(move || {
                    s.enter_shared();
                    s.exit_shared();
                    s.depart();
                })
            })
            .collect();

        sync.exit_exclusive();

        for r in readers {
            r.join().unwrap();
        }
        assert!(sync.is_idle());
    });
}
