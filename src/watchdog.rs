/// Deadline enforcement for solver attempts.
///
/// Runs alongside one attempt, counting fixed ticks; once the tick
/// budget is spent the deadline expires and the search gives up on the
/// attempt. Paired one-to-one with an attempt and discarded with it.
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Terminal state of a watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogOutcome {
    /// The tick budget ran out before the attempt finished.
    Expired,
    /// The controller cancelled the deadline after the attempt finished.
    Cancelled,
}

/// Tick counter shared between the watchdog task and the controller.
/// Every read and write goes through the mutex.
#[derive(Debug)]
struct Deadline {
    ticks_elapsed: u64,
    budget_ticks: u64,
    stop_requested: bool,
    alive: bool,
}

/// A running deadline timer.
pub struct Watchdog {
    deadline: Arc<Mutex<Deadline>>,
    task: JoinHandle<WatchdogOutcome>,
}

impl Watchdog {
    /// Start a deadline of `budget_ticks` ticks of `tick_interval` each.
    ///
    /// The timer task sleeps one tick at a time. Each wake it first
    /// observes any stop request, then advances the counter, expiring
    /// exactly once when the budget is reached.
    pub fn spawn(budget_ticks: u64, tick_interval: Duration) -> Watchdog {
        let deadline = Arc::new(Mutex::new(Deadline {
            ticks_elapsed: 0,
            budget_ticks,
            stop_requested: false,
            alive: true,
        }));

        let shared = Arc::clone(&deadline);
        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(tick_interval).await;
                let mut deadline = shared.lock().expect("deadline lock poisoned");
                if deadline.stop_requested {
                    deadline.alive = false;
                    tracing::debug!(
                        ticks = deadline.ticks_elapsed,
                        "watchdog observed cancellation"
                    );
                    return WatchdogOutcome::Cancelled;
                }
                deadline.ticks_elapsed += 1;
                if deadline.ticks_elapsed >= deadline.budget_ticks {
                    deadline.alive = false;
                    tracing::warn!(ticks = deadline.ticks_elapsed, "watchdog deadline expired");
                    return WatchdogOutcome::Expired;
                }
            }
        });

        Watchdog { deadline, task }
    }

    /// Request cooperative cancellation.
    ///
    /// The tick loop observes the request at its next tick boundary, so
    /// wind-down lags the request by at most one tick.
    pub fn cancel(&self) {
        let mut deadline = self.deadline.lock().expect("deadline lock poisoned");
        deadline.stop_requested = true;
    }

    /// Whether the deadline is still running. False once it has expired
    /// or observed a cancellation.
    #[allow(dead_code)]
    pub fn is_alive(&self) -> bool {
        self.deadline.lock().expect("deadline lock poisoned").alive
    }

    /// Ticks counted so far.
    #[allow(dead_code)]
    pub fn ticks_elapsed(&self) -> u64 {
        self.deadline
            .lock()
            .expect("deadline lock poisoned")
            .ticks_elapsed
    }

    /// Resolve when the timer task winds down: on expiry, or within one
    /// tick of a `cancel`. This is the completion signal the controller
    /// races against the attempt.
    pub async fn outcome(&mut self) -> WatchdogOutcome {
        (&mut self.task).await.expect("watchdog task panicked")
    }
}
