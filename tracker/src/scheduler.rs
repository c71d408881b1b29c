//! Fixed-interval driver for reconciliation passes

use crate::reconciler::{PassReport, Reconciler};
use log::{error, info};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

/// Runs a pass immediately, then once per interval until told to stop.
///
/// Passes never overlap: the next tick is only awaited once the current pass
/// is done, and ticks missed while a slow pass was running are skipped.
pub struct Scheduler {
    reconciler: Reconciler,
    poll_interval: Duration,
    passes: u64,
}

impl Scheduler {
    pub fn new(reconciler: Reconciler, poll_interval: Duration) -> Self {
        Self {
            reconciler,
            poll_interval,
            passes: 0,
        }
    }

    /// Runs exactly one pass. A pass that could not start is logged and
    /// reported as `None`.
    pub async fn run_once(&mut self) -> Option<PassReport> {
        self.passes += 1;
        match self.reconciler.run_pass().await {
            Ok(report) => Some(report),
            Err(e) => {
                error!("Pass {} abandoned: {}", self.passes, e);
                None
            }
        }
    }

    /// Loops until `shutdown` carries `true` or its sender is dropped.
    ///
    /// A pass already in progress is finished before the loop exits.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut timer = interval(self.poll_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Polling every {:?}", self.poll_interval);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    self.run_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Scheduler stopping after {} passes", self.passes);
                        break;
                    }
                }
            }
        }
    }

    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::console::{ConsoleSession, RemoteConsole};
    use crate::error::TrackerError;
    use crate::store::{MemoryRegistry, MemorySessionStore, ServerRegistry};
    use async_trait::async_trait;
    use shared::{Address, LiveStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingConsole {
        polls: AtomicUsize,
    }

    struct StaticSession;

    #[async_trait]
    impl RemoteConsole for CountingConsole {
        async fn connect(
            &self,
            _address: &Address,
        ) -> Result<Box<dyn ConsoleSession>, TrackerError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(StaticSession))
        }
    }

    #[async_trait]
    impl ConsoleSession for StaticSession {
        async fn execute(&mut self, _command: &str) -> Result<String, TrackerError> {
            Ok("map : cp_gorge\nplayers : 1 humans, 0 bots (24 max)\n[U:1:77]".to_string())
        }
    }

    fn scheduler(console: Arc<CountingConsole>, every: Duration) -> (Scheduler, Arc<MemoryRegistry>) {
        let registry = Arc::new(MemoryRegistry::new(vec![Address::new("s1")]));
        let reconciler = Reconciler::new(
            registry.clone(),
            Arc::new(MemorySessionStore::new()),
            console,
            Arc::new(SystemClock),
        );
        (Scheduler::new(reconciler, every), registry)
    }

    #[tokio::test]
    async fn test_run_once_runs_a_single_pass() {
        let console = Arc::new(CountingConsole {
            polls: AtomicUsize::new(0),
        });
        let (mut scheduler, registry) = scheduler(console.clone(), Duration::from_secs(3600));

        let report = scheduler.run_once().await.unwrap();

        assert_eq!(report.polled, 1);
        assert_eq!(report.connected, 1);
        assert_eq!(scheduler.passes(), 1);
        assert_eq!(console.polls.load(Ordering::SeqCst), 1);
        assert_eq!(
            registry.status(&Address::new("s1")).await.unwrap().map,
            "cp_gorge"
        );
        assert_eq!(scheduler.reconciler().table().tracked_players(), 1);
    }

    #[tokio::test]
    async fn test_run_once_reports_abandoned_pass() {
        struct DownRegistry;

        #[async_trait]
        impl ServerRegistry for DownRegistry {
            async fn tracked_addresses(&self) -> Result<Vec<Address>, TrackerError> {
                Err(TrackerError::Registry("unavailable".to_string()))
            }

            async fn upsert_live_status(&self, _status: &LiveStatus) -> Result<(), TrackerError> {
                Ok(())
            }
        }

        let reconciler = Reconciler::new(
            Arc::new(DownRegistry),
            Arc::new(MemorySessionStore::new()),
            Arc::new(CountingConsole {
                polls: AtomicUsize::new(0),
            }),
            Arc::new(SystemClock),
        );
        let mut scheduler = Scheduler::new(reconciler, Duration::from_secs(1));

        assert!(scheduler.run_once().await.is_none());
        assert_eq!(scheduler.passes(), 1);
    }

    #[tokio::test]
    async fn test_run_polls_repeatedly_until_shutdown() {
        let console = Arc::new(CountingConsole {
            polls: AtomicUsize::new(0),
        });
        let (mut scheduler, _registry) = scheduler(console.clone(), Duration::from_millis(10));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            scheduler.run(shutdown_rx).await;
            scheduler
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();
        let scheduler = handle.await.unwrap();

        assert!(scheduler.passes() >= 2);
        assert_eq!(
            console.polls.load(Ordering::SeqCst) as u64,
            scheduler.passes()
        );
    }

    #[tokio::test]
    async fn test_run_stops_when_sender_dropped() {
        let console = Arc::new(CountingConsole {
            polls: AtomicUsize::new(0),
        });
        let (mut scheduler, _registry) = scheduler(console, Duration::from_secs(3600));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        drop(shutdown_tx);

        tokio::time::timeout(Duration::from_secs(5), scheduler.run(shutdown_rx))
            .await
            .unwrap();

        // The immediate first tick may or may not win the race with the
        // closed channel
        assert!(scheduler.passes() <= 1);
    }

    /// Console that records how many polls overlap and sleeps for the given
    /// time on each poll
    struct SlowConsole {
        delays: Vec<Duration>,
        polls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl SlowConsole {
        fn new(delays: Vec<Duration>) -> Self {
            Self {
                delays,
                polls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RemoteConsole for SlowConsole {
        async fn connect(
            &self,
            _address: &Address,
        ) -> Result<Box<dyn ConsoleSession>, TrackerError> {
            let poll = self.polls.fetch_add(1, Ordering::SeqCst);
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);

            let delay = self.delays.get(poll).or(self.delays.last()).copied();
            tokio::time::sleep(delay.unwrap_or_default()).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Box::new(StaticSession))
        }
    }

    fn slow_scheduler(console: Arc<SlowConsole>, every: Duration) -> Scheduler {
        let reconciler = Reconciler::new(
            Arc::new(MemoryRegistry::new(vec![Address::new("s1")])),
            Arc::new(MemorySessionStore::new()),
            console,
            Arc::new(SystemClock),
        );
        Scheduler::new(reconciler, every)
    }

    async fn run_for(mut scheduler: Scheduler, millis: u64) -> Scheduler {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            scheduler.run(shutdown_rx).await;
            scheduler
        });

        tokio::time::sleep(Duration::from_millis(millis)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_passes_never_overlap() {
        // Every pass takes two and a half intervals
        let console = Arc::new(SlowConsole::new(vec![Duration::from_millis(250)]));
        let scheduler = slow_scheduler(console.clone(), Duration::from_millis(100));

        let scheduler = run_for(scheduler, 975).await;

        assert_eq!(console.max_in_flight.load(Ordering::SeqCst), 1);
        // Back to back passes from 0ms, each 250ms long
        assert!((4..=5).contains(&scheduler.passes()));
        assert_eq!(
            console.polls.load(Ordering::SeqCst) as u64,
            scheduler.passes()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_missed_during_slow_pass_are_skipped() {
        // The first pass overruns five ticks, later ones are instant
        let console = Arc::new(SlowConsole::new(vec![
            Duration::from_millis(550),
            Duration::ZERO,
        ]));
        let scheduler = slow_scheduler(console.clone(), Duration::from_millis(100));

        let scheduler = run_for(scheduler, 975).await;

        // Passes start at 0, 550 (one late tick), then back on the 100ms
        // grid at 600, 700, 800 and 900. Catching up every missed tick
        // would have run four more passes at 550.
        assert_eq!(scheduler.passes(), 6);
        assert_eq!(console.max_in_flight.load(Ordering::SeqCst), 1);
    }
}
