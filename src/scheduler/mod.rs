//! Periodic fetch scheduling.
//!
//! The [`Scheduler`] owns a single repeating timer. Each fire runs the
//! [`FeedFetchJob`]; at most one job body executes at a time, whether it was
//! started by the timer or by [`Scheduler::run_once_now`].

mod job;
mod state;

pub use self::job::{FeedFetchJob, TickOutcome};
pub use self::state::{SchedulePhase, ScheduleState};

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::TARGET_SCHEDULER;

#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    job: FeedFetchJob,
    clock: Arc<dyn Clock>,
    state: Mutex<ScheduleState>,
    // Held for the whole job body; shared by timer fires and run_once_now.
    tick_lock: tokio::sync::Mutex<()>,
    wake: Notify,
    shutdown: watch::Sender<bool>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Creates an idle scheduler. Call [`spawn_timer`](Self::spawn_timer) to
    /// let it fire on its own.
    pub fn new(job: FeedFetchJob, clock: Arc<dyn Clock>, period: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                job,
                clock,
                state: Mutex::new(ScheduleState::idle(period)),
                tick_lock: tokio::sync::Mutex::new(()),
                wake: Notify::new(),
                shutdown,
                driver: Mutex::new(None),
            }),
        }
    }

    /// Spawns the timer task. Calling it again while a timer task exists is a no-op.
    pub fn spawn_timer(&self) {
        let mut driver = lock(&self.inner.driver);
        if driver.is_some() {
            return;
        }
        let inner = Arc::clone(&self.inner);
        let shutdown = self.inner.shutdown.subscribe();
        *driver = Some(tokio::spawn(run_timer(inner, shutdown)));
        debug!(target: TARGET_SCHEDULER, "Scheduler timer task spawned");
    }

    /// Arms the timer with `period`. An already armed scheduler is re-armed,
    /// so there is never more than one pending run.
    pub fn start(&self, period: Duration) {
        self.reconfigure(period);
    }

    /// Replaces the pending schedule with one using `period`, counted from now.
    ///
    /// A tick that is already running is left alone; it re-arms with the new
    /// period when it completes.
    pub fn reconfigure(&self, period: Duration) {
        let now = self.inner.clock.now();
        {
            let mut state = self.inner.lock_state();
            state.period = period;
            if state.phase != SchedulePhase::Running {
                state.arm(now);
            }
            info!(
                target: TARGET_SCHEDULER,
                "Feed fetch scheduled every {:?}, next run at {:?}", period, state.next_run_at
            );
        }
        self.inner.wake.notify_one();
    }

    /// Cancels the pending run. A running tick finishes but does not re-arm.
    pub fn stop(&self) {
        self.inner.lock_state().disarm();
        self.inner.wake.notify_one();
        info!(target: TARGET_SCHEDULER, "Feed fetch schedule cleared");
    }

    /// The timer fire action: runs the job unless another job body is in
    /// flight, in which case this fire is coalesced into it.
    ///
    /// Returns `None` when nothing ran (idle, or coalesced).
    pub async fn tick(&self) -> Option<TickOutcome> {
        self.inner.tick().await
    }

    /// Runs the job immediately, waiting for any in-flight tick first.
    /// The schedule is not touched.
    pub async fn run_once_now(&self) -> TickOutcome {
        let _guard = self.inner.tick_lock.lock().await;
        debug!(target: TARGET_SCHEDULER, "Running feed fetch out of schedule");
        self.inner.job.run().await
    }

    pub fn state(&self) -> ScheduleState {
        self.inner.lock_state().clone()
    }

    pub fn next_run_at(&self) -> Option<DateTime<Utc>> {
        self.inner.lock_state().next_run_at
    }

    /// Stops the timer task after any in-flight tick completes.
    pub async fn shutdown(&self) {
        let _ = self.inner.shutdown.send(true);
        let driver = lock(&self.inner.driver).take();
        if let Some(handle) = driver {
            if let Err(err) = handle.await {
                warn!(target: TARGET_SCHEDULER, "Scheduler timer task ended abnormally: {}", err);
            }
        }
        info!(target: TARGET_SCHEDULER, "Scheduler shut down");
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, ScheduleState> {
        lock(&self.state)
    }

    async fn tick(&self) -> Option<TickOutcome> {
        let guard = match self.tick_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                let now = self.clock.now();
                let mut state = self.lock_state();
                if state.phase == SchedulePhase::Armed {
                    state.arm(now);
                }
                debug!(
                    target: TARGET_SCHEDULER,
                    "Previous fetch still running, skipping this fire; next run at {:?}",
                    state.next_run_at
                );
                return None;
            }
        };

        {
            let mut state = self.lock_state();
            if state.phase != SchedulePhase::Armed {
                return None;
            }
            state.phase = SchedulePhase::Running;
        }

        let outcome = self.job.run().await;

        {
            let now = self.clock.now();
            let mut state = self.lock_state();
            if state.phase == SchedulePhase::Running {
                state.arm(now);
            }
            debug!(
                target: TARGET_SCHEDULER,
                "Tick finished with {:?}; next run at {:?}", outcome, state.next_run_at
            );
        }
        drop(guard);

        Some(outcome)
    }
}

async fn run_timer(inner: Arc<Inner>, mut shutdown: watch::Receiver<bool>) {
    info!(target: TARGET_SCHEDULER, "Scheduler timer started");
    loop {
        if *shutdown.borrow() {
            break;
        }

        let wait = {
            let now = inner.clock.now();
            inner.lock_state().time_until_due(now)
        };

        match wait {
            Some(wait) if wait.is_zero() => {
                inner.tick().await;
            }
            Some(wait) => {
                tokio::select! {
                    _ = sleep(wait) => {}
                    _ = inner.wake.notified() => {}
                    _ = shutdown.changed() => {}
                }
            }
            None => {
                tokio::select! {
                    _ = inner.wake.notified() => {}
                    _ = shutdown.changed() => {}
                }
            }
        }
    }
    info!(target: TARGET_SCHEDULER, "Scheduler timer stopped");
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
