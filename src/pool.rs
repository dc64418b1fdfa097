//! A fixed-size worker pool sized to the machine's hardware
//! parallelism: `submit` blocks until a slot is free, `join` waits
//! until every submitted task has finished.
//!
//! This is the idiomatic-Rust shape of the original engine's
//! `pthread`-based pool, which busy-waited on a fixed slot array with
//! `usleep`. Here the same "bounded in-flight work, no queue" model is
//! expressed with `std::thread` plus a `Condvar` instead of polling.
//! The bounded-permit bookkeeping lives in [`Slots`], which [`WorkerPool`]
//! pairs with `thread::spawn` for `'static` tasks; [`crate::scan`] uses
//! `Slots` directly with `thread::scope` so its tasks can borrow the
//! archive buffer instead of needing to own it.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;

/// A counting semaphore bounding how many callers may hold a permit at
/// once. `acquire` blocks (on a `Condvar`, not a busy-wait) until a
/// permit is free; `release` gives one back.
pub struct Slots {
    capacity: usize,
    in_flight: Mutex<usize>,
    condvar: Condvar,
}

impl Slots {
    /// `capacity` of zero is treated as one: a pool that can never run
    /// anything isn't useful to anyone.
    pub fn new(capacity: usize) -> Slots {
        Slots { capacity: capacity.max(1), in_flight: Mutex::new(0), condvar: Condvar::new() }
    }

    /// Sized to [`std::thread::available_parallelism`], falling back
    /// to one slot if the platform can't report it.
    pub fn with_available_parallelism() -> Slots {
        Slots::new(thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Blocks until a permit is free, then takes it.
    pub fn acquire(&self) {
        let mut in_flight = self.in_flight.lock().expect("slots mutex poisoned");
        while *in_flight >= self.capacity {
            in_flight = self.condvar.wait(in_flight).expect("slots mutex poisoned");
        }
        *in_flight += 1;
    }

    /// Returns a permit, waking anyone blocked in `acquire`/`join`.
    pub fn release(&self) {
        let mut in_flight = self.in_flight.lock().expect("slots mutex poisoned");
        *in_flight -= 1;
        self.condvar.notify_all();
    }

    /// Blocks until every outstanding permit has been released.
    pub fn join(&self) {
        let mut in_flight = self.in_flight.lock().expect("slots mutex poisoned");
        while *in_flight > 0 {
            in_flight = self.condvar.wait(in_flight).expect("slots mutex poisoned");
        }
    }
}

/// A bounded pool of OS threads for `'static` work. One task runs per
/// archive member; no task may cancel another, there is no timeout, and
/// tasks always run to completion.
pub struct WorkerPool {
    slots: Arc<Slots>,
    /// Exposed to submitted tasks for serializing shared mutation that
    /// isn't already covered by `ResultSet`'s own lock (e.g. logging).
    shared: Arc<Mutex<()>>,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> WorkerPool {
        WorkerPool { slots: Arc::new(Slots::new(capacity)), shared: Arc::new(Mutex::new(())) }
    }

    pub fn with_available_parallelism() -> WorkerPool {
        WorkerPool { slots: Arc::new(Slots::with_available_parallelism()), shared: Arc::new(Mutex::new(())) }
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// The mutex shared with every task submitted to this pool.
    pub fn shared_mutex(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.shared)
    }

    /// Blocks until a slot is free, then spawns `task` on its own OS
    /// thread. Returns once the thread has been spawned, not once it
    /// has finished — use [`WorkerPool::join`] to wait for completion.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.slots.acquire();
        let slots = Arc::clone(&self.slots);
        thread::spawn(move || {
            task();
            slots.release();
        });
    }

    /// Blocks until every submitted task has finished.
    pub fn join(&self) {
        self.slots.join();
    }
}
