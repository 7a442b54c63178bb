// Subscriber registry and per-subscriber polling

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::time::{Duration, interval};

use crate::estimator::RateEstimator;
use crate::models::{ConfigMessage, RateObservation};
use crate::source::CounterSource;

/// Hub-wide settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub interface: String,
    pub poll_interval_ms: u64,
    /// Observation channel depth per subscriber.
    pub channel_capacity: usize,
}

struct SubscriberHandle {
    paused: Arc<AtomicBool>,
    task: tokio::task::JoinHandle<()>,
}

/// A connected subscriber as seen by the transport layer: its id, the
/// initial config message, and the observation stream for its poll loop.
pub struct Subscription {
    pub id: u64,
    pub config: ConfigMessage,
    pub observations: mpsc::Receiver<RateObservation>,
}

/// Fans rate observations out to connected subscribers.
///
/// Every subscriber gets its own poll task and its own `RateEstimator`;
/// only the device transport behind `CounterSource` is shared. Pause and
/// resume toggle a single subscriber's loop and never touch the others.
pub struct BroadcastHub {
    source: Arc<dyn CounterSource>,
    config: HubConfig,
    subscribers: std::sync::Mutex<HashMap<u64, SubscriberHandle>>,
    next_id: AtomicU64,
}

impl BroadcastHub {
    pub fn new(source: Arc<dyn CounterSource>, config: HubConfig) -> Self {
        Self {
            source,
            config,
            subscribers: std::sync::Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a subscriber and starts its poll loop.
    pub fn connect(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let paused = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);

        let task = tokio::spawn(poll_loop(
            id,
            self.source.clone(),
            paused.clone(),
            self.config.poll_interval_ms,
            tx,
        ));

        self.registry().insert(id, SubscriberHandle { paused, task });
        tracing::info!(subscriber = id, "subscriber connected");

        Subscription {
            id,
            config: self.config_message(),
            observations: rx,
        }
    }

    /// Stops this subscriber's polling. Idempotent; other subscribers are
    /// unaffected. Returns false for an unknown id.
    pub fn pause(&self, id: u64) -> bool {
        self.with_subscriber(id, |handle| {
            handle.paused.store(true, Ordering::Relaxed);
            tracing::info!(subscriber = id, "subscriber paused");
        })
    }

    /// Restarts this subscriber's polling. Idempotent.
    pub fn resume(&self, id: u64) -> bool {
        self.with_subscriber(id, |handle| {
            handle.paused.store(false, Ordering::Relaxed);
            tracing::info!(subscriber = id, "subscriber resumed");
        })
    }

    /// Removes the subscriber and synchronously cancels its poll task.
    pub fn disconnect(&self, id: u64) {
        let handle = self.registry().remove(&id);
        if let Some(handle) = handle {
            handle.task.abort();
            tracing::info!(subscriber = id, "subscriber disconnected");
        }
    }

    pub fn is_paused(&self, id: u64) -> Option<bool> {
        self.registry().get(&id).map(|h| h.paused.load(Ordering::Relaxed))
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry().len()
    }

    pub fn config_message(&self) -> ConfigMessage {
        ConfigMessage {
            interface: self.config.interface.clone(),
            poll_interval_ms: self.config.poll_interval_ms,
        }
    }

    // Registry lock is only ever held for map ops; recover from poisoning.
    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<u64, SubscriberHandle>> {
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn with_subscriber(&self, id: u64, f: impl FnOnce(&SubscriberHandle)) -> bool {
        let subscribers = self.registry();
        match subscribers.get(&id) {
            Some(handle) => {
                f(handle);
                true
            }
            None => false,
        }
    }

    /// Logs the live subscriber count on a fixed cadence.
    pub fn spawn_stats_logger(hub: Arc<Self>, interval_secs: u64) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = interval(Duration::from_secs(interval_secs));
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tick.tick().await;
                tracing::info!(subscribers = hub.subscriber_count(), "app stats");
            }
        })
    }
}

impl Drop for BroadcastHub {
    fn drop(&mut self) {
        for handle in self.registry().values() {
            handle.task.abort();
        }
    }
}

/// One subscriber's fetch-estimate-deliver cycle.
///
/// Ticks are strictly sequential: a new fetch never starts before the
/// previous tick's estimator update completed. A paused tick does nothing
/// at all; a failed fetch logs and skips the tick, leaving estimator state
/// untouched so the next success diffs against the last stored sample.
async fn poll_loop(
    id: u64,
    source: Arc<dyn CounterSource>,
    paused: Arc<AtomicBool>,
    poll_interval_ms: u64,
    tx: mpsc::Sender<RateObservation>,
) {
    let mut estimator = RateEstimator::new();
    let mut tick = interval(Duration::from_millis(poll_interval_ms));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tick.tick().await;
        if paused.load(Ordering::Relaxed) {
            continue;
        }

        let reading = match source.fetch().await {
            Ok(reading) => reading,
            Err(e) => {
                tracing::warn!(
                    subscriber = id,
                    error = %e,
                    operation = "fetch",
                    "fetch failed; skipping tick"
                );
                continue;
            }
        };

        if let Some(observation) = estimator.update(reading)
            && tx.send(observation).await.is_err()
        {
            // Receiver gone; the hub will reap us via disconnect.
            break;
        }
    }
}
