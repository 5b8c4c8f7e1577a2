//! Filepath: src/nodesync.rs
//!
//! Per-node synchronization for the directory tree.
//!
//! [`NodeSync`] is a writer-preferring shared/exclusive monitor extended with
//! a subtree presence counter. A thread that enters a node (in either mode)
//! is counted in `presence_below` of that node until it gives the count back
//! with [`NodeSync::depart`]. Exiting shared mode does not give it back, so a
//! reader that has moved on to a child is still counted at every ancestor it
//! passed through. An exclusive holder therefore waits not only for the node
//! itself but for its whole subtree to become empty.
//!
//! # Protocol
//! 1. Readers: `enter_shared()`, read, `exit_shared()`, later `depart()`.
//! 2. Writers: `enter_exclusive()`, mutate, `exit_exclusive()` (which also
//!    gives back the writer's own presence at this node).
//!
//! # Fairness
//! A writer that has to wait closes the door: readers arriving afterwards
//! queue up instead of streaming past it. When a writer leaves, the readers
//! queued at that moment are admitted as one batch before any further writer,
//! and each admitted reader wakes the next.
//!
//! # Layout
//! The transitions live in [`SyncState`], a plain value with no blocking
//! primitives. The wait loops live in [`Monitor`], written once against a
//! lock/condvar pair. [`NodeSync`] implements it with a `parking_lot` mutex
//! and one condition variable per queue; the loom and shuttle models
//! implement it with their own primitives and so run the same loops.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::ops::DerefMut;


#[cfg(all(test, loom))]
mod loom_tests;

// ============================================================================
//  Wake
// ============================================================================

/// Which queue a transition asks the caller to signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wake {
    /// Nobody needs waking.
    Nobody,
    /// Wake one waiting reader.
    Reader,
    /// Wake one waiting writer.
    Writer,
}

// ============================================================================
//  SyncState
// ============================================================================

/// Counters guarded by a node's monitor.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct SyncState {
    pub(crate) readers_active: usize,
    pub(crate) writers_active: usize,
    pub(crate) readers_waiting: usize,
    pub(crate) writers_waiting: usize,

    /// Queued readers let past the closed door by the last exiting writer.
    pub(crate) readers_admitted: usize,

    /// Set while writers wait; newly arriving readers queue up.
    pub(crate) door_closed: bool,

    /// Threads at this node or anywhere below it.
    pub(crate) presence_below: usize,
}

impl SyncState {
    /// Threads holding or passing through this node.
    #[inline]
    pub(crate) const fn occupancy(&self) -> usize {
        self.readers_active + self.writers_active + self.presence_below
    }

    /// An arriving reader must queue.
    #[inline]
    pub(crate) const fn reader_must_wait(&self) -> bool {
        self.writers_active > 0 || self.door_closed
    }

    /// A queued reader may proceed, consuming an admission if one is pending.
    pub(crate) fn take_reader_pass(&mut self) -> bool {
        if self.writers_active > 0 {
            return false;
        }
        if self.readers_admitted > 0 {
            self.readers_admitted -= 1;
            return true;
        }
        !self.door_closed
    }

    /// Another queued reader could proceed right now.
    #[inline]
    pub(crate) const fn reader_pass_available(&self) -> bool {
        self.readers_waiting > 0
            && self.writers_active == 0
            && (self.readers_admitted > 0 || !self.door_closed)
    }

    /// A writer may not enter yet.
    #[inline]
    pub(crate) const fn writer_blocked(&self) -> bool {
        self.occupancy() > 0 || self.readers_admitted > 0
    }

    pub(crate) fn admit_reader(&mut self) {
        debug_assert_eq!(self.writers_active, 0, "reader admitted next to a writer");
        self.readers_active += 1;
        self.presence_below += 1;
    }

    pub(crate) fn admit_writer(&mut self) {
        debug_assert_eq!(self.occupancy(), 0, "writer admitted into an occupied subtree");
        self.writers_active += 1;
        self.presence_below += 1;
    }

    pub(crate) fn reader_exit(&mut self) -> Wake {
        debug_assert!(self.readers_active > 0, "exit_shared without a shared hold");
        self.readers_active -= 1;

        if self.readers_active == 0 && self.writers_waiting > 0 && !self.writer_blocked() {
            Wake::Writer
        } else {
            Wake::Nobody
        }
    }

    pub(crate) fn writer_exit(&mut self) -> Wake {
        debug_assert_eq!(self.writers_active, 1, "exit_exclusive without an exclusive hold");
        debug_assert!(self.presence_below > 0);
        self.writers_active -= 1;
        self.presence_below -= 1;

        if self.readers_waiting > 0 {
            self.door_closed = self.writers_waiting > 0;
            if self.door_closed {
                self.readers_admitted = self.readers_waiting;
            }
            Wake::Reader
        } else if self.writers_waiting > 0 {
            Wake::Writer
        } else {
            self.door_closed = false;
            Wake::Nobody
        }
    }

    pub(crate) fn depart(&mut self) -> Wake {
        debug_assert!(self.presence_below > 0, "depart without presence");
        self.presence_below -= 1;

        if self.writers_waiting > 0 && !self.writer_blocked() {
            Wake::Writer
        } else {
            Wake::Nobody
        }
    }

    /// Everything zero and the door open.
    #[inline]
    pub(crate) const fn is_idle(&self) -> bool {
        self.occupancy() == 0
            && self.readers_waiting == 0
            && self.writers_waiting == 0
            && self.readers_admitted == 0
            && !self.door_closed
    }
}

// ============================================================================
//  Monitor
// ============================================================================

/// A [`SyncState`] behind a mutex with a reader queue and a writer queue.
///
/// Implementors supply the primitives; the entry and exit protocol is
/// provided. Every method locks the state itself, so none may be called with
/// a guard held.
pub(crate) trait Monitor {
    type Guard<'a>: DerefMut<Target = SyncState>
    where
        Self: 'a;

    fn lock(&self) -> Self::Guard<'_>;

    /// Block on the reader queue, releasing the lock while parked.
    fn wait_readers<'a>(&'a self, guard: Self::Guard<'a>) -> Self::Guard<'a>;

    /// Block on the writer queue, releasing the lock while parked.
    fn wait_writers<'a>(&'a self, guard: Self::Guard<'a>) -> Self::Guard<'a>;

    fn notify_reader(&self);

    fn notify_writer(&self);

    #[inline]
    fn signal(&self, wake: Wake) {
        match wake {
            Wake::Nobody => {}
            Wake::Reader => self.notify_reader(),
            Wake::Writer => self.notify_writer(),
        }
    }

    fn enter_shared(&self) {
        let mut state = self.lock();

        if state.reader_must_wait() {
            state.readers_waiting += 1;
            while !state.take_reader_pass() {
                state = self.wait_readers(state);
            }
            state.readers_waiting -= 1;

            // Pass the wakeup along the queue.
            if state.reader_pass_available() {
                self.notify_reader();
            }
        }

        state.admit_reader();
    }

    fn exit_shared(&self) {
        let wake: Wake = self.lock().reader_exit();
        self.signal(wake);
    }

    fn enter_exclusive(&self) {
        let mut state = self.lock();

        if state.writer_blocked() {
            state.writers_waiting += 1;
            state.door_closed = true;
            while state.writer_blocked() {
                state = self.wait_writers(state);
            }
            state.writers_waiting -= 1;
        }

        state.admit_writer();
    }

    fn try_enter_exclusive(&self) -> bool {
        let mut state = self.lock();

        if state.writer_blocked() {
            return false;
        }
        state.admit_writer();
        true
    }

    fn exit_exclusive(&self) {
        let wake: Wake = self.lock().writer_exit();
        self.signal(wake);
    }

    fn depart(&self) {
        let wake: Wake = self.lock().depart();
        self.signal(wake);
    }

    fn is_idle(&self) -> bool {
        self.lock().is_idle()
    }
}

// ============================================================================
//  SyncSnapshot
// ============================================================================

/// Point-in-time copy of a node's counters, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncSnapshot {
    /// Threads holding the node in shared mode.
    pub readers_active: usize,
    /// Threads holding the node in exclusive mode (0 or 1).
    pub writers_active: usize,
    /// Threads queued for shared mode.
    pub readers_waiting: usize,
    /// Threads queued for exclusive mode.
    pub writers_waiting: usize,
    /// Whether newly arriving readers are held back for a waiting writer.
    pub door_closed: bool,
    /// Threads at this node or below it.
    pub presence_below: usize,
}

impl SyncSnapshot {
    /// No thread holds, waits for, or is present below the node.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.readers_active == 0
            && self.writers_active == 0
            && self.readers_waiting == 0
            && self.writers_waiting == 0
            && self.presence_below == 0
            && !self.door_closed
    }
}

// ============================================================================
//  NodeSync
// ============================================================================

/// Shared/exclusive monitor with subtree presence tracking.
///
/// # Example
///
/// ```rust
/// use dirtree::nodesync::NodeSync;
///
/// let sync = NodeSync::new();
///
/// sync.enter_shared();
/// sync.exit_shared();
/// assert_eq!(sync.snapshot().presence_below, 1);
///
/// // The reader still counts as present until it departs.
/// assert!(!sync.try_enter_exclusive());
/// sync.depart();
///
/// assert!(sync.try_enter_exclusive());
/// sync.exit_exclusive();
/// assert!(sync.snapshot().is_idle());
/// ```
#[derive(Debug, Default)]
pub struct NodeSync {
    state: Mutex<SyncState>,
    readers: Condvar,
    writers: Condvar,
}

impl NodeSync {
    /// Create an idle monitor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter shared mode, waiting while a writer holds the node or the door
    /// is closed.
    ///
    /// Counts the caller as present at this node until [`depart`](Self::depart).
    #[inline]
    pub fn enter_shared(&self) {
        Monitor::enter_shared(self);
    }

    /// Leave shared mode. Presence stays counted.
    #[inline]
    pub fn exit_shared(&self) {
        Monitor::exit_shared(self);
    }

    /// Enter exclusive mode, waiting until nobody holds the node and nobody
    /// is present anywhere below it.
    #[inline]
    pub fn enter_exclusive(&self) {
        Monitor::enter_exclusive(self);
    }

    /// Enter exclusive mode only if that is possible without waiting.
    #[must_use]
    #[inline]
    pub fn try_enter_exclusive(&self) -> bool {
        Monitor::try_enter_exclusive(self)
    }

    /// Leave exclusive mode and give back the writer's presence at this node.
    ///
    /// Queued readers are preferred over queued writers.
    #[inline]
    pub fn exit_exclusive(&self) {
        Monitor::exit_exclusive(self);
    }

    /// Give back one unit of presence at this node.
    #[inline]
    pub fn depart(&self) {
        Monitor::depart(self);
    }

    /// Copy the current counters.
    #[must_use]
    pub fn snapshot(&self) -> SyncSnapshot {
        let state = self.state.lock();

        SyncSnapshot {
            readers_active: state.readers_active,
            writers_active: state.writers_active,
            readers_waiting: state.readers_waiting,
            writers_waiting: state.writers_waiting,
            door_closed: state.door_closed,
            presence_below: state.presence_below,
        }
    }

    /// Check whether the monitor is completely idle.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        Monitor::is_idle(self)
    }
}

impl Monitor for NodeSync {
    type Guard<'a> = MutexGuard<'a, SyncState>;

    #[inline]
    fn lock(&self) -> Self::Guard<'_> {
        self.state.lock()
    }

    #[inline]
    fn wait_readers<'a>(&'a self, mut guard: Self::Guard<'a>) -> Self::Guard<'a> {
        self.readers.wait(&mut guard);
        guard
    }

    #[inline]
    fn wait_writers<'a>(&'a self, mut guard: Self::Guard<'a>) -> Self::Guard<'a> {
        self.writers.wait(&mut guard);
        guard
    }

    #[inline]
    fn notify_reader(&self) {
        self.readers.notify_one();
    }

    #[inline]
    fn notify_writer(&self) {
        self.writers.notify_one();
    }
}
