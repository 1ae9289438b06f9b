//! Cancellable periodic tasks.
//!
//! Replaces GUI timer callbacks with an explicit runner: each task owns its
//! tick closure on a dedicated thread, so everything that touches one
//! serial port runs from a single place and exchanges never interleave.
//! Control intervals are floored at 500 ms.

use crate::constants::MIN_CONTROL_INTERVAL_MS;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Returned by a tick closure to keep the task running or end it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Halt,
}

/// A periodic task running until cancelled or until its closure halts.
pub struct PeriodicTask {
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawn `tick` on its own thread, invoking it immediately and then
    /// once per interval. Intervals below the 500 ms floor are raised to it.
    pub fn spawn<F>(name: &str, interval: Duration, mut tick: F) -> io::Result<Self>
    where
        F: FnMut() -> TickControl + Send + 'static,
    {
        let interval = effective_interval(interval);
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while !flag.load(Ordering::Relaxed) {
                    let started = Instant::now();
                    if tick() == TickControl::Halt {
                        log::debug!("periodic task halted by its tick");
                        break;
                    }
                    // Sleep in slices so cancellation stays responsive.
                    while started.elapsed() < interval {
                        if flag.load(Ordering::Relaxed) {
                            return;
                        }
                        let remaining = interval.saturating_sub(started.elapsed());
                        thread::sleep(remaining.min(Duration::from_millis(20)));
                    }
                }
            })?;
        Ok(PeriodicTask {
            stop,
            thread: Some(thread),
        })
    }

    /// Signal the task to stop and wait for its thread to finish. Any tick
    /// already in flight completes first.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn effective_interval(requested: Duration) -> Duration {
    requested.max(Duration::from_millis(MIN_CONTROL_INTERVAL_MS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn interval_floor_is_enforced() {
        assert_eq!(
            effective_interval(Duration::from_millis(10)),
            Duration::from_millis(MIN_CONTROL_INTERVAL_MS)
        );
        assert_eq!(
            effective_interval(Duration::from_secs(2)),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn tick_halt_ends_the_task() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let task = PeriodicTask::spawn("halting", Duration::from_millis(500), move || {
            if seen.fetch_add(1, Ordering::SeqCst) + 1 >= 2 {
                TickControl::Halt
            } else {
                TickControl::Continue
            }
        })
        .unwrap();

        // Two ticks, one interval apart, then the task ends on its own.
        thread::sleep(Duration::from_millis(1_200));
        task.cancel();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cancel_stops_the_task() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let task = PeriodicTask::spawn("cancelled", Duration::from_millis(500), move || {
            seen.fetch_add(1, Ordering::SeqCst);
            TickControl::Continue
        })
        .unwrap();

        thread::sleep(Duration::from_millis(100));
        task.cancel();
        let after_cancel = count.load(Ordering::SeqCst);
        assert_eq!(after_cancel, 1);

        thread::sleep(Duration::from_millis(700));
        assert_eq!(count.load(Ordering::SeqCst), after_cancel);
    }
}
