use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// "Not already running" flag shared by the runs of one periodic task.
#[derive(Clone, Default)]
pub struct RunningGuard {
    running: Arc<AtomicBool>,
}

/// Clears the running flag when dropped.
pub struct RunPermit {
    running: Arc<AtomicBool>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

impl RunningGuard {
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                running: self.running.clone(),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// A periodic job that never overlaps itself. Ticks that land while the previous
/// run is still going are skipped.
pub struct GuardedTask {
    name: &'static str,
    period: Duration,
    guard: RunningGuard,
}

impl GuardedTask {
    pub fn new(name: &'static str, period: Duration) -> Self {
        Self {
            name,
            period,
            guard: RunningGuard::default(),
        }
    }

    pub fn guard(&self) -> RunningGuard {
        self.guard.clone()
    }

    /// Spawns the timer loop. The first run starts immediately.
    pub fn spawn<F, Fut>(self, job: F) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let Some(permit) = self.guard.try_acquire() else {
                    log::debug!("{}: previous run still in progress, skipping tick", self.name);
                    continue;
                };
                let name = self.name;
                let run = job();
                tokio::spawn(async move {
                    if let Err(e) = run.await {
                        log::error!("{} failed: {:#}", name, e);
                    }
                    drop(permit);
                });
            }
        })
    }
}
