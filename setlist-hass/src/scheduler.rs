//! Periodic and forced refreshes.
//!
//! Every user gets its own timer task ticking at the user's
//! `refresh_period`. All tasks also listen on a shared broadcast channel so a
//! [`RefreshHandle`] can refresh everyone at once, and on a watch channel
//! for shutdown.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::coordinator::{RefreshReport, UserCoordinator};
use crate::error::RefreshError;

/// Triggers an immediate refresh of every user.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    tx: broadcast::Sender<()>,
}

impl RefreshHandle {
    /// Ask every running user task to refresh now.
    ///
    /// Returns the number of tasks that were notified (0 when the scheduler
    /// is not running).
    pub fn force_refresh(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }
}

/// Owns the per-user coordinators and their timers.
pub struct Scheduler {
    coordinators: Vec<Arc<UserCoordinator>>,
    force_tx: broadcast::Sender<()>,
}

impl Scheduler {
    /// Schedule `coordinators`.
    #[must_use]
    pub fn new(coordinators: Vec<Arc<UserCoordinator>>) -> Self {
        let (force_tx, _) = broadcast::channel(8);
        Self {
            coordinators,
            force_tx,
        }
    }

    /// Handle for forcing refreshes while [`run`](Self::run) is active.
    #[must_use]
    pub fn handle(&self) -> RefreshHandle {
        RefreshHandle {
            tx: self.force_tx.clone(),
        }
    }

    /// Scheduled coordinators.
    #[must_use]
    pub fn coordinators(&self) -> &[Arc<UserCoordinator>] {
        &self.coordinators
    }

    /// Refresh every user once, in configuration order.
    pub async fn refresh_all(&self) -> Vec<Result<RefreshReport, RefreshError>> {
        let mut results = Vec::with_capacity(self.coordinators.len());
        for coordinator in &self.coordinators {
            results.push(coordinator.refresh().await);
        }
        results
    }

    /// Refresh everyone, then keep refreshing on each user's period until
    /// `shutdown` resolves. Shutdown also cancels a pending initial refresh.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        // Subscribe before the initial refresh so no forced refresh is lost.
        let receivers: Vec<_> = self.coordinators.iter().map(|_| self.force_tx.subscribe()).collect();

        tokio::pin!(shutdown);

        info!(users = self.coordinators.len(), "Initial refresh");
        tokio::select! {
            results = self.refresh_all() => log_failures(&results),
            () = &mut shutdown => {
                info!("Shutdown requested during initial refresh");
                return;
            }
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let tasks: Vec<JoinHandle<()>> = self
            .coordinators
            .iter()
            .zip(receivers)
            .map(|(coordinator, force)| {
                tokio::spawn(run_user(Arc::clone(coordinator), force, stop_rx.clone()))
            })
            .collect();

        shutdown.await;
        info!("Stopping refresh timers");
        // Receivers only observe the change; a send error means they are gone already.
        let _ = stop_tx.send(true);

        for task in tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "Refresh task ended abnormally");
            }
        }
        debug!("Scheduler stopped");
    }
}

async fn run_user(
    coordinator: Arc<UserCoordinator>,
    mut force: broadcast::Receiver<()>,
    mut stop: watch::Receiver<bool>,
) {
    let name = coordinator.user().name.clone();
    let period = coordinator.user().refresh_interval();
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(user = %name, period_secs = period.as_secs(), "Refresh timer started");

    loop {
        tokio::select! {
            _ = timer.tick() => {
                debug!(user = %name, "Scheduled refresh");
            }
            msg = force.recv() => match msg {
                Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                    info!(user = %name, "Forced refresh");
                    timer.reset();
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = stop.changed() => break,
        }

        if let Err(err) = coordinator.refresh().await {
            log_failure(&err);
        }
    }
    debug!(user = %name, "Refresh timer stopped");
}

fn log_failures(results: &[Result<RefreshReport, RefreshError>]) {
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        log_failure(err);
    }
}

fn log_failure(err: &RefreshError) {
    match err {
        // Already reported by the coordinator.
        RefreshError::Fetch { .. } => {}
        RefreshError::Publish { .. } => warn!(error = %err, "Refresh not published"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use setlist_client::{ClientError, UserProfile};
    use setlist_core::format::Vocabulary;
    use setlist_core::{Concert, UserConfig};
    use tokio::sync::oneshot;

    use super::*;
    use crate::coordinator::ConcertSource;
    use crate::sink::MemorySink;

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
    }

    impl CountingSource {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConcertSource for CountingSource {
        async fn user(&self, userid: &str) -> Result<UserProfile, ClientError> {
            Ok(UserProfile {
                user_id: userid.to_string(),
                ..UserProfile::default()
            })
        }

        async fn attended(&self, _userid: &str, _max_pages: u32) -> Result<Vec<Concert>, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn user(name: &str, hours: u64) -> UserConfig {
        let mut user = UserConfig::new(name.to_lowercase(), name, "key");
        user.refresh_period = hours;
        user
    }

    fn coordinator(user: UserConfig, source: &Arc<CountingSource>) -> Arc<UserCoordinator> {
        let source: Arc<dyn ConcertSource> = Arc::clone(source) as Arc<dyn ConcertSource>;
        Arc::new(UserCoordinator::new(
            user,
            Vocabulary::default(),
            source,
            Arc::new(MemorySink::new()),
        ))
    }

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test(start_paused = true)]
    async fn refreshes_on_each_users_period() {
        let fast = Arc::new(CountingSource::default());
        let slow = Arc::new(CountingSource::default());
        let scheduler = Scheduler::new(vec![coordinator(user("Fast", 1), &fast), coordinator(user("Slow", 6), &slow)]);

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(scheduler.run(async {
            let _ = stop_rx.await;
        }));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!((fast.calls(), slow.calls()), (1, 1), "initial refresh");

        tokio::time::sleep(HOUR).await;
        assert_eq!((fast.calls(), slow.calls()), (2, 1));

        tokio::time::sleep(HOUR * 5).await;
        assert_eq!((fast.calls(), slow.calls()), (7, 2));

        stop_tx.send(()).expect("scheduler listening");
        task.await.expect("scheduler task");
    }

    #[tokio::test(start_paused = true)]
    async fn force_refresh_reaches_every_user() {
        let a = Arc::new(CountingSource::default());
        let b = Arc::new(CountingSource::default());
        let scheduler = Scheduler::new(vec![coordinator(user("A", 6), &a), coordinator(user("B", 12), &b)]);
        let handle = scheduler.handle();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(scheduler.run(async {
            let _ = stop_rx.await;
        }));
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(handle.force_refresh(), 2);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!((a.calls(), b.calls()), (2, 2));

        // A forced refresh restarts the period.
        tokio::time::sleep(HOUR * 6 - Duration::from_secs(2)).await;
        assert_eq!(a.calls(), 2);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(a.calls(), 3);

        stop_tx.send(()).expect("scheduler listening");
        task.await.expect("scheduler task");
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_timers() {
        let source = Arc::new(CountingSource::default());
        let scheduler = Scheduler::new(vec![coordinator(user("A", 1), &source)]);
        let handle = scheduler.handle();

        scheduler.run(async {}).await;
        assert_eq!(source.calls(), 1);

        tokio::time::sleep(HOUR * 3).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(handle.force_refresh(), 0);
    }

    struct StalledSource;

    #[async_trait]
    impl ConcertSource for StalledSource {
        async fn user(&self, userid: &str) -> Result<UserProfile, ClientError> {
            tokio::time::sleep(HOUR).await;
            Ok(UserProfile {
                user_id: userid.to_string(),
                ..UserProfile::default()
            })
        }

        async fn attended(&self, _userid: &str, _max_pages: u32) -> Result<Vec<Concert>, ClientError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_initial_refresh() {
        let stalled = Arc::new(UserCoordinator::new(
            user("A", 6),
            Vocabulary::default(),
            Arc::new(StalledSource),
            Arc::new(MemorySink::new()),
        ));
        let scheduler = Scheduler::new(vec![Arc::clone(&stalled)]);
        let start = tokio::time::Instant::now();

        scheduler.run(tokio::time::sleep(Duration::from_secs(1))).await;

        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(stalled.status().last_update, None);
    }

    #[tokio::test]
    async fn refresh_all_reports_per_user() {
        let source = Arc::new(CountingSource::default());
        let scheduler = Scheduler::new(vec![coordinator(user("A", 6), &source), coordinator(user("B", 6), &source)]);

        let results = scheduler.refresh_all().await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(source.calls(), 2);
    }
}
