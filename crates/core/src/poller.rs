//! Adaptive background poller.
//!
//! Runs a job on an interval that grows after repeated failures and snaps back
//! on success. Execution pauses while the host reports it is hidden or offline;
//! those ambient conditions arrive over a `watch` channel.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollerConfig {
    pub base_interval: Duration,
    pub max_interval: Duration,
    pub backoff_multiplier: f64,
    /// Consecutive failures tolerated before the interval starts growing.
    pub max_retries: u32,
    pub visibility_pause: bool,
    pub network_pause: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(10),
            max_interval: Duration::from_secs(300),
            backoff_multiplier: 1.5,
            max_retries: 3,
            visibility_pause: true,
            network_pause: true,
        }
    }
}

impl PollerConfig {
    pub fn should_pause(&self, ambient: Ambient) -> bool {
        (self.visibility_pause && ambient.hidden) || (self.network_pause && !ambient.online)
    }
}

/// Host conditions the poller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ambient {
    pub hidden: bool,
    pub online: bool,
}

impl Default for Ambient {
    fn default() -> Self {
        Self { hidden: false, online: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerStatus {
    pub running: bool,
    pub current_interval: Duration,
    pub consecutive_failures: u32,
    pub paused: bool,
    pub since_last_poll: Option<Duration>,
}

/// Work executed on every tick.
#[async_trait]
pub trait PollJob: Send + Sync + 'static {
    async fn poll(&self) -> Result<(), Error>;
}

/// Job built from an async closure. See [`poll_fn`].
pub struct PollFn<F>(F);

pub fn poll_fn<F, Fut>(f: F) -> PollFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    PollFn(f)
}

#[async_trait]
impl<F, Fut> PollJob for PollFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    async fn poll(&self) -> Result<(), Error> {
        (self.0)().await
    }
}

#[derive(Debug)]
struct PollState {
    config: PollerConfig,
    running: bool,
    current_interval: Duration,
    consecutive_failures: u32,
    last_poll: Option<Instant>,
}

impl PollState {
    fn new(config: PollerConfig) -> Self {
        Self { current_interval: config.base_interval, config, running: false, consecutive_failures: 0, last_poll: None }
    }

    fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.current_interval = self.config.base_interval;
    }

    fn record_outcome(&mut self, success: bool) {
        if success {
            self.reset();
            return;
        }

        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.config.max_retries {
            let multiplier = self.config.backoff_multiplier.max(1.0);
            let grown = Duration::try_from_secs_f64(self.current_interval.as_secs_f64() * multiplier)
                .unwrap_or(self.config.max_interval);
            self.current_interval = grown.min(self.config.max_interval);
        }
    }

    fn update_config(&mut self, config: PollerConfig) {
        self.config = config;
        if self.current_interval > config.max_interval {
            self.current_interval = config.max_interval;
        }
    }
}

struct Shared {
    state: Mutex<PollState>,
    wake: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PollState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Drives a [`PollJob`] on a spawned task.
pub struct Poller {
    name: String,
    job: Arc<dyn PollJob>,
    shared: Arc<Shared>,
    ambient: watch::Receiver<Ambient>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Poller {
    pub fn new(
        name: impl Into<String>, job: impl PollJob, config: PollerConfig, ambient: watch::Receiver<Ambient>,
    ) -> Self {
        Self {
            name: name.into(),
            job: Arc::new(job),
            shared: Arc::new(Shared { state: Mutex::new(PollState::new(config)), wake: Notify::new() }),
            ambient,
            task: Mutex::new(None),
        }
    }

    /// Start polling. The first tick fires one base interval from now.
    ///
    /// Does nothing if already running. Must be called inside a tokio runtime.
    pub fn start(&self) {
        {
            let mut state = self.shared.lock();
            if state.running {
                return;
            }
            state.running = true;
            state.reset();
        }

        let handle = tokio::spawn(run(self.name.clone(), self.job.clone(), self.shared.clone(), self.ambient.clone()));
        *self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);
        tracing::info!(poller = %self.name, "poller started");
    }

    /// Stop polling. A tick in progress is abandoned.
    pub fn stop(&self) {
        self.shared.lock().running = false;
        if let Some(handle) = self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take() {
            handle.abort();
            tracing::info!(poller = %self.name, "poller stopped");
        }
    }

    /// Replace the configuration, clamping the current interval to the new maximum.
    pub fn update_config(&self, config: PollerConfig) {
        self.shared.lock().update_config(config);
        self.shared.wake.notify_one();
    }

    pub fn status(&self) -> PollerStatus {
        let ambient = *self.ambient.borrow();
        let state = self.shared.lock();
        PollerStatus {
            running: state.running,
            current_interval: state.current_interval,
            consecutive_failures: state.consecutive_failures,
            paused: state.config.should_pause(ambient),
            since_last_poll: state.last_poll.map(|at| at.elapsed()),
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(handle) = self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take() {
            handle.abort();
        }
    }
}

async fn run(name: String, job: Arc<dyn PollJob>, shared: Arc<Shared>, mut ambient: watch::Receiver<Ambient>) {
    let started = Instant::now();
    let mut ambient_open = true;
    // The next tick is due one interval after this instant.
    let mut anchor = started;

    loop {
        let conditions = *ambient.borrow_and_update();
        let (due, paused) = {
            let state = shared.lock();
            (anchor + state.current_interval, state.config.should_pause(conditions))
        };

        if paused {
            tokio::select! {
                _ = ambient_changed(&mut ambient, &mut ambient_open) => {}
                _ = shared.wake.notified() => {}
            }
            // Resuming counts from the start of the last tick.
            anchor = shared.lock().last_poll.unwrap_or(started);
            continue;
        }

        tokio::select! {
            _ = sleep_until(due) => {}
            _ = ambient_changed(&mut ambient, &mut ambient_open) => continue,
            _ = shared.wake.notified() => continue,
        }

        shared.lock().last_poll = Some(Instant::now());
        let result = job.poll().await;
        anchor = Instant::now();

        let mut state = shared.lock();
        if let Err(e) = &result {
            tracing::debug!(poller = %name, failures = state.consecutive_failures + 1, error = %e, "poll failed");
        }
        state.record_outcome(result.is_ok());
        if result.is_err() && state.consecutive_failures == state.config.max_retries {
            tracing::info!(poller = %name, interval_ms = state.current_interval.as_millis() as u64, "poller backing off");
        }
    }
}

/// Resolves on the next ambient change. Once the sender is gone it never resolves.
async fn ambient_changed(rx: &mut watch::Receiver<Ambient>, open: &mut bool) {
    if *open && rx.changed().await.is_ok() {
        return;
    }
    *open = false;
    std::future::pending::<()>().await
}
