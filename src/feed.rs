//! Metrics feed
//!
//! Holds the buffer of current sensor readings together with the metrics
//! computed from it. Two independent kinds of timer drive it:
//!
//! - the perturbation ticker ([`MetricsFeed::start`]) applies one simulated
//!   telemetry step per period, five seconds by default;
//! - each reading/metrics stream polls the current snapshot on its own,
//!   finer interval and re-emits it whether or not it changed.
//!
//! Snapshots are replaced whole through a `watch` channel, so a stream never
//! observes readings and metrics from different ticks.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, Stream};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::FeedSettings;
use crate::error::AppResult;
use crate::metrics::{compute_metrics, temperature_alert, DeviceCounts};
use crate::models::{DashboardMetrics, SensorReading, TemperatureAlert};
use crate::simulation::{perturb_reading, ChannelVariance};
use crate::validation::validate_sensor_reading;

/// Shortest period a timer in this module runs at
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// `tokio::time::interval` panics on a zero period
fn timer_period(period: Duration, timer: &'static str) -> Duration {
    if period < MIN_PERIOD {
        warn!(timer, "Zero timer period, running at the minimum of 1 ms");
        return MIN_PERIOD;
    }
    period
}

/// Readings and the metrics computed from them, published together
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub readings: Arc<Vec<SensorReading>>,
    pub metrics: DashboardMetrics,
    pub counts: DeviceCounts,
}

impl FeedSnapshot {
    fn new(readings: Vec<SensorReading>, counts: DeviceCounts) -> Self {
        let metrics = compute_metrics(&readings, counts);
        Self {
            readings: Arc::new(readings),
            metrics,
            counts,
        }
    }
}

/// Rolling buffer of sensor readings with live aggregate metrics
pub struct MetricsFeed {
    state: watch::Sender<FeedSnapshot>,
    variance: ChannelVariance,
    rng: Mutex<StdRng>,
    stream_interval: Duration,
}

impl MetricsFeed {
    /// Create an empty feed. A seed makes the simulated telemetry reproducible.
    pub fn new(stream_interval: Duration, seed: Option<u64>) -> Self {
        info!(
            stream_interval_ms = stream_interval.as_millis() as u64,
            seeded = seed.is_some(),
            "Initializing metrics feed"
        );

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (state, _) = watch::channel(FeedSnapshot::new(Vec::new(), DeviceCounts::default()));

        Self {
            state,
            variance: ChannelVariance::DEFAULT,
            rng: Mutex::new(rng),
            stream_interval: timer_period(stream_interval, "stream"),
        }
    }

    pub fn from_settings(settings: &FeedSettings) -> Self {
        Self::new(settings.stream_interval(), settings.seed)
    }

    /// Seed the buffer and compute metrics. Invalid readings reject the whole batch.
    pub fn initialize(&self, readings: Vec<SensorReading>) -> AppResult<()> {
        for reading in &readings {
            validate_sensor_reading(reading)?;
        }

        let count = readings.len();
        self.state.send_modify(|snap| *snap = FeedSnapshot::new(readings, snap.counts));

        let metrics = self.metrics();
        info!(
            readings = count,
            average_temperature = metrics.average_temperature,
            "Metrics feed initialized"
        );
        Ok(())
    }

    /// Apply one simulated telemetry step to every reading and recompute metrics
    pub fn tick(&self) {
        let now = Utc::now();
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        self.state.send_modify(|snap| {
            let readings: Vec<SensorReading> = snap
                .readings
                .iter()
                .map(|r| perturb_reading(r, &self.variance, &mut *rng, now))
                .collect();
            *snap = FeedSnapshot::new(readings, snap.counts);
        });

        let metrics = self.metrics();
        debug!(
            average_temperature = metrics.average_temperature,
            average_humidity = metrics.average_humidity,
            average_soil_moisture = metrics.average_soil_moisture,
            critical_alerts = metrics.critical_alerts,
            "Metrics feed ticked"
        );
    }

    /// Manual refresh: one tick outside the timer
    pub fn refresh(&self) {
        debug!("Manual metrics refresh requested");
        self.tick();
    }

    /// Change where device counts come from and recompute metrics
    pub fn set_device_counts(&self, counts: DeviceCounts) {
        self.state.send_if_modified(|snap| {
            if snap.counts == counts {
                return false;
            }
            snap.counts = counts;
            snap.metrics = compute_metrics(&snap.readings, counts);
            true
        });
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn snapshot(&self) -> FeedSnapshot {
        self.state.borrow().clone()
    }

    pub fn readings(&self) -> Arc<Vec<SensorReading>> {
        self.state.borrow().readings.clone()
    }

    pub fn metrics(&self) -> DashboardMetrics {
        self.state.borrow().metrics
    }

    /// Alert for the current average temperature, if one is active
    pub fn temperature_alert(&self) -> Option<TemperatureAlert> {
        let metrics = self.metrics();
        if metrics.critical_alerts == 0 {
            return None;
        }
        temperature_alert(metrics.average_temperature)
    }

    // ── Streams ──────────────────────────────────────────────────────

    /// Current readings, immediately and then once per stream interval
    pub fn readings_stream(&self) -> impl Stream<Item = Arc<Vec<SensorReading>>> + Send + 'static {
        poll_stream(self.state.subscribe(), self.stream_interval, |snap| {
            snap.readings.clone()
        })
    }

    /// Current metrics, immediately and then once per stream interval
    pub fn metrics_stream(&self) -> impl Stream<Item = DashboardMetrics> + Send + 'static {
        poll_stream(self.state.subscribe(), self.stream_interval, |snap| snap.metrics)
    }

    // ── Ticker ───────────────────────────────────────────────────────

    /// Spawn the perturbation ticker. The first step happens one period after
    /// start; the task runs until the returned handle is shut down or dropped.
    pub fn start(self: &Arc<Self>, period: Duration) -> TickerHandle {
        let period = timer_period(period, "ticker");
        info!(
            interval_ms = period.as_millis() as u64,
            "Starting simulated telemetry ticker"
        );

        let feed = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut tick_count: u64 = 0;

            loop {
                ticker.tick().await;
                tick_count += 1;
                feed.tick();

                if let Some(alert) = feed.temperature_alert() {
                    warn!(
                        tick = tick_count,
                        level = ?alert.level,
                        alert = alert.message,
                        "Temperature alert active"
                    );
                }
            }
        });

        TickerHandle {
            handle: Some(handle),
        }
    }
}

/// Stream that re-reads the latest snapshot on every interval tick.
///
/// Nothing is allocated until the first poll, and the interval is released
/// when the stream is dropped.
fn poll_stream<T, F>(
    receiver: watch::Receiver<FeedSnapshot>,
    period: Duration,
    project: F,
) -> impl Stream<Item = T> + Send + 'static
where
    T: Send + 'static,
    F: Fn(&FeedSnapshot) -> T + Send + 'static,
{
    stream::unfold(
        (receiver, None::<Interval>, project),
        move |(receiver, ticker, project)| async move {
            let mut ticker = ticker.unwrap_or_else(|| {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker
            });
            // The first tick completes immediately
            ticker.tick().await;
            let item = project(&*receiver.borrow());
            Some((item, (receiver, Some(ticker), project)))
        },
    )
}

/// Owns the running ticker task. Dropping it stops the ticker.
#[derive(Debug)]
pub struct TickerHandle {
    handle: Option<JoinHandle<()>>,
}

impl TickerHandle {
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the ticker and wait for the task to wind down
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Telemetry ticker ended abnormally");
                }
            }
            info!("Simulated telemetry ticker stopped");
        }
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::mock_readings;
    use futures::StreamExt;

    fn feed() -> MetricsFeed {
        let feed = MetricsFeed::new(Duration::from_secs(1), Some(0xA6E0));
        feed.initialize(mock_readings()).unwrap();
        feed
    }

    #[test]
    fn test_initialize_computes_metrics() {
        let feed = feed();
        let metrics = feed.metrics();

        assert_eq!(feed.readings().len(), 3);
        assert_eq!(metrics.average_temperature, 25.5);
        assert_eq!(metrics.average_humidity, 65.0);
        assert_eq!(metrics.average_soil_moisture, 45.0);
        assert_eq!(metrics.total_devices, 12);
        assert_eq!(metrics.online_devices, 10);
        assert_eq!(metrics.critical_alerts, 0);
        assert!(feed.temperature_alert().is_none());
    }

    #[test]
    fn test_initialize_rejects_negative_reading() {
        let feed = feed();
        let bad = vec![SensorReading::new("sensor-001").with_temperature(-3.0)];

        assert!(feed.initialize(bad).is_err());
        assert_eq!(feed.readings().len(), 3);
    }

    #[test]
    fn test_tick_recomputes_metrics() {
        let feed = feed();
        let before = feed.snapshot();

        feed.tick();
        let after = feed.snapshot();

        assert_eq!(after.readings.len(), 3);
        assert_eq!(after.metrics, compute_metrics(&after.readings, after.counts));
        for (old, new) in before.readings.iter().zip(after.readings.iter()) {
            assert_eq!(old.device_id, new.device_id);
            let delta = (old.temperature.unwrap() - new.temperature.unwrap()).abs();
            assert!(delta <= 2.0 + f64::EPSILON);
        }
    }

    #[test]
    fn test_tick_never_negative() {
        let feed = MetricsFeed::new(Duration::from_secs(1), Some(5));
        let mut reading = SensorReading::new("sensor-edge")
            .with_temperature(0.5)
            .with_humidity(1.0)
            .with_soil_moisture(0.0);
        reading.ph = Some(0.1);
        reading.light_intensity = Some(10.0);
        feed.initialize(vec![reading]).unwrap();

        for _ in 0..200 {
            feed.refresh();
            let r = &feed.readings()[0];
            assert!(r.temperature.unwrap() >= 0.0);
            assert!(r.humidity.unwrap() >= 0.0);
            assert!(r.soil_moisture.unwrap() >= 0.0);
            assert!(r.ph.unwrap() >= 0.0);
            assert!(r.light_intensity.unwrap() >= 0.0);
            assert!(r.nitrogen.is_none());
        }
    }

    #[test]
    fn test_high_temperature_alert() {
        let feed = MetricsFeed::new(Duration::from_secs(1), Some(1));
        feed.initialize(vec![SensorReading::new("test-device").with_temperature(36.0)])
            .unwrap();

        let alert = feed.temperature_alert().unwrap();
        assert_eq!(alert.message, "High temperature alert!");
        assert_eq!(feed.metrics().critical_alerts, 1);
    }

    #[test]
    fn test_empty_feed_has_no_alert() {
        let feed = MetricsFeed::new(Duration::from_secs(1), None);

        assert!(feed.temperature_alert().is_none());
        assert_eq!(feed.metrics().average_temperature, 0.0);
    }

    #[test]
    fn test_set_device_counts() {
        let feed = feed();
        feed.set_device_counts(DeviceCounts { total: 3, online: 2 });

        let metrics = feed.metrics();
        assert_eq!(metrics.total_devices, 3);
        assert_eq!(metrics.online_devices, 2);
        assert_eq!(metrics.average_temperature, 25.5);
    }

    #[test]
    fn test_seeded_feeds_are_reproducible() {
        let a = feed();
        let b = feed();

        a.tick();
        b.tick();

        let ra = a.readings();
        let rb = b.readings();
        for (x, y) in ra.iter().zip(rb.iter()) {
            assert_eq!(x.temperature, y.temperature);
            assert_eq!(x.potassium, y.potassium);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_streams_emit_current_snapshot_first() {
        let feed = feed();
        let expected_metrics = feed.metrics();
        let expected_readings = feed.readings();

        let mut first = Box::pin(feed.metrics_stream());
        let mut second = Box::pin(feed.metrics_stream());
        let mut readings = Box::pin(feed.readings_stream());
        let mut readings_again = Box::pin(feed.readings_stream());

        assert_eq!(first.next().await, Some(expected_metrics));
        assert_eq!(second.next().await, Some(expected_metrics));
        assert_eq!(readings.next().await, Some(expected_readings.clone()));
        assert_eq!(readings_again.next().await, Some(expected_readings));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_reemits_latest_snapshot() {
        let feed = feed();
        let mut metrics = Box::pin(feed.metrics_stream());
        let mut readings = Box::pin(feed.readings_stream());

        let initial = readings.next().await.unwrap();
        metrics.next().await.unwrap();

        feed.refresh();
        let start = Instant::now();
        let updated = readings.next().await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert!(!Arc::ptr_eq(&initial, &updated));
        assert!(Arc::ptr_eq(&updated, &feed.readings()));

        // unchanged state is re-emitted as is
        assert_eq!(metrics.next().await, Some(feed.metrics()));
        assert_eq!(metrics.next().await, Some(feed.metrics()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_perturbs_until_shutdown() {
        let feed = Arc::new(feed());
        let initial = feed.readings();

        let ticker = feed.start(Duration::from_secs(5));
        assert!(ticker.is_running());

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(Arc::ptr_eq(&initial, &feed.readings()));

        tokio::time::sleep(Duration::from_secs(2)).await;
        let ticked = feed.readings();
        assert!(!Arc::ptr_eq(&initial, &ticked));

        ticker.shutdown().await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(Arc::ptr_eq(&ticked, &feed.readings()));
        assert_eq!(Arc::strong_count(&feed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_stream_interval_is_clamped() {
        let feed = MetricsFeed::new(Duration::ZERO, Some(1));
        feed.initialize(mock_readings()).unwrap();
        let mut metrics = Box::pin(feed.metrics_stream());

        assert_eq!(metrics.next().await, Some(feed.metrics()));
        assert_eq!(metrics.next().await, Some(feed.metrics()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_tick_interval_is_clamped() {
        let feed = Arc::new(feed());
        let initial = feed.readings();

        let ticker = feed.start(Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(ticker.is_running());
        assert!(!Arc::ptr_eq(&initial, &feed.readings()));
        ticker.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_ticker_stops_it() {
        let feed = Arc::new(feed());
        let ticker = feed.start(Duration::from_secs(5));
        drop(ticker);

        tokio::time::sleep(Duration::from_secs(1)).await;
        let before = feed.readings();
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert!(Arc::ptr_eq(&before, &feed.readings()));
    }
}
