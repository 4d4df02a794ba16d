//! Dashboard session
//!
//! Owns one device store, one metrics feed and the mock collaborators for the
//! lifetime of a session. Collaborator failures never escape from here: they
//! are written into the store's `error` field (last write wins) and the prior
//! state is left as it was.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::catalog::DeviceCatalog;
use crate::config::{DeviceCountSource, Settings};
use crate::error::{AppError, AppResult};
use crate::feed::{MetricsFeed, TickerHandle};
use crate::metrics::{temperature_alert, DeviceCounts, LOW_TEMPERATURE};
use crate::models::{
    Alert, DashboardMetrics, Device, DeviceStatus, DeviceType, DeviceUpdate, NewDevice,
    TemperatureAlert,
};
use crate::profile::ProfileService;
use crate::simulation::mock_readings;
use crate::store::DeviceStore;

/// Point-in-time view of everything the dashboard displays
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub devices: usize,
    pub online: usize,
    pub offline: usize,
    pub maintenance: usize,
    pub unread_alerts: usize,
    pub high_severity_alerts: usize,
    pub metrics: DashboardMetrics,
    pub temperature_alert: Option<TemperatureAlert>,
    pub error: Option<String>,
}

pub struct Dashboard {
    store: Arc<DeviceStore>,
    feed: Arc<MetricsFeed>,
    catalog: DeviceCatalog,
    profile: ProfileService,
    settings: Settings,
    ticker: Option<TickerHandle>,
    count_sync: Option<JoinHandle<()>>,
}

impl Dashboard {
    /// Session backed by the demo farm's mock data
    pub fn new(settings: Settings) -> AppResult<Self> {
        let simulate_latency = settings.backend.simulate_latency;
        let feed = MetricsFeed::from_settings(&settings.feed);
        feed.initialize(mock_readings())?;

        Ok(Self::with_parts(
            DeviceStore::new(),
            feed,
            DeviceCatalog::with_mock_data(simulate_latency),
            ProfileService::with_mock_user(simulate_latency),
            settings,
        ))
    }

    pub fn with_parts(
        store: DeviceStore,
        feed: MetricsFeed,
        catalog: DeviceCatalog,
        profile: ProfileService,
        settings: Settings,
    ) -> Self {
        Self {
            store: Arc::new(store),
            feed: Arc::new(feed),
            catalog,
            profile,
            settings,
            ticker: None,
            count_sync: None,
        }
    }

    pub fn store(&self) -> &Arc<DeviceStore> {
        &self.store
    }

    pub fn feed(&self) -> &Arc<MetricsFeed> {
        &self.feed
    }

    pub fn catalog(&self) -> &DeviceCatalog {
        &self.catalog
    }

    pub fn profile(&self) -> &ProfileService {
        &self.profile
    }

    /// Write a collaborator failure into the store
    fn report(&self, operation: &'static str, error: AppError) {
        warn!(
            operation,
            error_type = error.error_type(),
            error = %error,
            "Dashboard operation failed"
        );
        self.store.set_error(error.to_string());
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start the telemetry ticker, and the device-count sync when metrics
    /// count from the store. Calling it again while running does nothing.
    pub fn start(&mut self) {
        if self.is_running() {
            debug!("Dashboard already running");
            return;
        }

        if self.settings.feed.device_counts == DeviceCountSource::Store {
            self.count_sync = Some(self.spawn_count_sync());
        }
        self.ticker = Some(self.feed.start(self.settings.feed.tick_interval()));
        info!("Dashboard session started");
    }

    pub fn is_running(&self) -> bool {
        self.ticker.as_ref().is_some_and(TickerHandle::is_running)
    }

    /// Stop every timer owned by the session
    pub async fn shutdown(&mut self) {
        if let Some(sync) = self.count_sync.take() {
            sync.abort();
        }
        if let Some(ticker) = self.ticker.take() {
            ticker.shutdown().await;
        }
        info!("Dashboard session stopped");
    }

    fn spawn_count_sync(&self) -> JoinHandle<()> {
        let mut updates = self.store.subscribe();
        let feed = Arc::clone(&self.feed);

        let counts = DeviceCounts::from_state(&updates.borrow_and_update());
        feed.set_device_counts(counts);

        tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let counts = DeviceCounts::from_state(&updates.borrow_and_update());
                debug!(total = counts.total, online = counts.online, "Syncing device counts");
                feed.set_device_counts(counts);
            }
        })
    }

    // ── Data loading ─────────────────────────────────────────────────

    /// Load devices and alerts from the catalog into the store
    pub async fn load_initial_data(&self) {
        if !self.load_devices().await {
            return;
        }

        match self.catalog.get_alerts().await {
            Ok(alerts) => {
                info!(alerts = alerts.len(), "Alerts loaded");
                self.store.set_alerts(alerts);
            }
            Err(e) => self.report("load_alerts", e),
        }
    }

    /// Replace the store's devices with the full catalog list
    pub async fn load_devices(&self) -> bool {
        self.store.set_loading(true);

        match self.catalog.get_devices().await {
            Ok(devices) => {
                info!(devices = devices.len(), "Devices loaded");
                self.store.set_devices(devices);
                true
            }
            Err(e) => {
                self.report("load_devices", e);
                false
            }
        }
    }

    /// Show only the devices matching `query`. A blank query reloads all.
    pub async fn search_devices(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            self.load_devices().await;
            return;
        }

        let result = self.catalog.search_devices(query).await;
        self.show_devices("search_devices", result);
    }

    /// Show only devices of one type; `None` reloads all
    pub async fn filter_by_type(&self, device_type: Option<DeviceType>) {
        match device_type {
            Some(device_type) => {
                let result = self.catalog.devices_by_type(device_type).await;
                self.show_devices("filter_by_type", result);
            }
            None => {
                self.load_devices().await;
            }
        }
    }

    /// Show only devices with one status; `None` reloads all
    pub async fn filter_by_status(&self, status: Option<DeviceStatus>) {
        match status {
            Some(status) => {
                let result = self.catalog.devices_by_status(status).await;
                self.show_devices("filter_by_status", result);
            }
            None => {
                self.load_devices().await;
            }
        }
    }

    fn show_devices(&self, operation: &'static str, result: AppResult<Vec<Device>>) {
        match result {
            Ok(devices) => {
                debug!(operation, devices = devices.len(), "Showing device subset");
                self.store.set_devices(devices);
            }
            Err(e) => self.report(operation, e),
        }
    }

    // ── Device management ────────────────────────────────────────────

    pub async fn create_device(&self, new: NewDevice) -> Option<Device> {
        match self.catalog.create_device(new).await {
            Ok(device) => {
                self.store.add_device(device.clone());
                Some(device)
            }
            Err(e) => {
                self.report("create_device", e);
                None
            }
        }
    }

    pub async fn update_device(&self, id: &str, update: DeviceUpdate) -> Option<Device> {
        match self.catalog.update_device(id, update).await {
            Ok(device) => {
                self.store.update_device(device.clone());
                Some(device)
            }
            Err(e) => {
                self.report("update_device", e);
                None
            }
        }
    }

    pub async fn set_device_status(&self, id: &str, status: DeviceStatus) -> Option<Device> {
        self.update_device(id, DeviceUpdate::status(status)).await
    }

    pub async fn delete_device(&self, id: &str) -> bool {
        match self.catalog.delete_device(id).await {
            Ok(()) => {
                self.store.delete_device(id);
                true
            }
            Err(e) => {
                self.report("delete_device", e);
                false
            }
        }
    }

    pub async fn mark_alert_as_read(&self, id: &str) {
        match self.catalog.mark_alert_as_read(id).await {
            Ok(()) => self.store.mark_alert_as_read(id),
            Err(e) => self.report("mark_alert_as_read", e),
        }
    }

    // ── Telemetry ────────────────────────────────────────────────────

    /// Apply one telemetry step on demand
    pub fn refresh(&self) {
        self.feed.refresh();
    }

    /// Record the active temperature alert in the store.
    ///
    /// The alert is attributed to the reading furthest in the alert's
    /// direction: the hottest for high/rising, the coldest for low.
    pub fn raise_temperature_alert(&self) -> Option<Alert> {
        let snapshot = self.feed.snapshot();
        let average = snapshot.metrics.average_temperature;
        if snapshot.metrics.critical_alerts == 0 {
            return None;
        }
        let derived = temperature_alert(average)?;
        let low = average < LOW_TEMPERATURE;

        let source = snapshot
            .readings
            .iter()
            .filter_map(|r| r.temperature.map(|t| (t, r.device_id.as_str())))
            .fold(None::<(f64, &str)>, |best, (t, id)| match best {
                Some((b, _)) if (low && t >= b) || (!low && t <= b) => best,
                _ => Some((t, id)),
            })
            .map(|(_, id)| id)?;

        let alert = derived.to_alert(source);
        info!(
            alert_id = %alert.id,
            device_id = %alert.device_id,
            severity = ?alert.severity,
            "Temperature alert raised"
        );
        self.store.add_alert(alert.clone());
        Some(alert)
    }

    pub fn summary(&self) -> DashboardSummary {
        let state = self.store.snapshot();
        DashboardSummary {
            devices: state.devices.len(),
            online: state.online_devices().len(),
            offline: state.offline_devices().len(),
            maintenance: state.maintenance_devices().len(),
            unread_alerts: state.unread_alerts().len(),
            high_severity_alerts: state.high_severity_alerts().len(),
            metrics: self.feed.metrics(),
            temperature_alert: self.feed.temperature_alert(),
            error: state.error.clone(),
        }
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        if let Some(sync) = self.count_sync.take() {
            sync.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedSettings;
    use crate::models::SensorReading;
    use std::time::Duration;

    fn settings(device_counts: DeviceCountSource) -> Settings {
        Settings {
            feed: FeedSettings {
                seed: Some(11),
                device_counts,
                ..FeedSettings::default()
            },
            ..Settings::default()
        }
    }

    fn new_device(name: &str) -> NewDevice {
        NewDevice {
            name: name.to_string(),
            device_type: DeviceType::Actuator,
            location: "Field B - West".to_string(),
            status: DeviceStatus::Offline,
            battery_level: Some(50),
            firmware_version: "v1.0.0".to_string(),
            coordinates: None,
            metadata: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_initial_data() {
        let dashboard = Dashboard::new(settings(DeviceCountSource::Placeholder)).unwrap();

        dashboard.load_initial_data().await;

        let summary = dashboard.summary();
        assert_eq!(summary.devices, 5);
        assert_eq!(summary.online, 3);
        assert_eq!(summary.offline, 1);
        assert_eq!(summary.maintenance, 1);
        assert_eq!(summary.unread_alerts, 2);
        assert_eq!(summary.high_severity_alerts, 1);
        assert_eq!(summary.metrics.total_devices, 12);
        assert!(!dashboard.store().loading());
        assert!(summary.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_crud_mirrors_into_store() {
        let dashboard = Dashboard::new(settings(DeviceCountSource::Placeholder)).unwrap();
        dashboard.load_initial_data().await;

        let created = dashboard.create_device(new_device("Sprinkler 9")).await.unwrap();
        assert!(dashboard.store().snapshot().device_by_id(&created.id).is_some());

        let online = dashboard
            .set_device_status(&created.id, DeviceStatus::Online)
            .await
            .unwrap();
        assert_eq!(online.status, DeviceStatus::Online);
        assert_eq!(dashboard.store().snapshot().online_devices().len(), 4);

        assert!(dashboard.delete_device(&created.id).await);
        assert_eq!(dashboard.store().devices().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_written_into_store_error() {
        let dashboard = Dashboard::new(settings(DeviceCountSource::Placeholder)).unwrap();
        dashboard.load_initial_data().await;
        let before = dashboard.store().devices();

        assert!(!dashboard.delete_device("device-404").await);
        assert_eq!(dashboard.store().error().as_deref(), Some("Device not found"));
        assert_eq!(dashboard.store().devices(), before);

        assert!(dashboard.create_device(new_device("X")).await.is_none());
        let error = dashboard.store().error().unwrap();
        assert!(error.starts_with("Validation error"));

        dashboard.store().clear_error();
        assert!(dashboard.store().error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_narrows_store_and_blank_reloads() {
        let dashboard = Dashboard::new(settings(DeviceCountSource::Placeholder)).unwrap();
        dashboard.load_initial_data().await;

        dashboard.search_devices("FIELD a").await;
        let state = dashboard.store().snapshot();
        assert_eq!(state.devices.len(), 3);
        assert_eq!(state.online_devices().len(), 3);
        assert!(state.offline_devices().is_empty());
        assert!(!state.loading);

        dashboard.search_devices("   ").await;
        let state = dashboard.store().snapshot();
        assert_eq!(state.devices.len(), 5);
        assert_eq!(state.maintenance_devices().len(), 1);
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filters_follow_into_store_views() {
        let dashboard = Dashboard::new(settings(DeviceCountSource::Placeholder)).unwrap();
        dashboard.load_initial_data().await;

        dashboard.filter_by_type(Some(DeviceType::Controller)).await;
        let devices = dashboard.store().devices();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "device-004");

        dashboard.filter_by_status(Some(DeviceStatus::Offline)).await;
        let state = dashboard.store().snapshot();
        assert_eq!(state.devices.len(), 1);
        assert_eq!(state.offline_devices().len(), 1);
        assert!(state.online_devices().is_empty());

        dashboard.filter_by_status(None).await;
        assert_eq!(dashboard.store().devices().len(), 5);

        dashboard.filter_by_type(Some(DeviceType::Actuator)).await;
        assert!(dashboard.store().devices().is_empty());
        dashboard.filter_by_type(None).await;
        assert_eq!(dashboard.summary().online, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_alert_as_read() {
        let dashboard = Dashboard::new(settings(DeviceCountSource::Placeholder)).unwrap();
        dashboard.load_initial_data().await;

        dashboard.mark_alert_as_read("alert-002").await;

        assert_eq!(dashboard.summary().unread_alerts, 1);
        let catalog_alerts = dashboard.catalog().get_alerts().await.unwrap();
        assert!(catalog_alerts.iter().any(|a| a.id == "alert-002" && a.is_read));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_device_counts() {
        let mut dashboard = Dashboard::new(settings(DeviceCountSource::Store)).unwrap();
        dashboard.start();
        dashboard.load_initial_data().await;
        tokio::task::yield_now().await;

        let metrics = dashboard.feed().metrics();
        assert_eq!(metrics.total_devices, 5);
        assert_eq!(metrics.online_devices, 3);

        dashboard.delete_device("device-001").await;
        tokio::task::yield_now().await;
        assert_eq!(dashboard.feed().metrics().total_devices, 4);
        assert_eq!(dashboard.feed().metrics().online_devices, 2);

        dashboard.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_shutdown() {
        let mut dashboard = Dashboard::new(settings(DeviceCountSource::Placeholder)).unwrap();
        let initial = dashboard.feed().readings();

        dashboard.start();
        dashboard.start();
        assert!(dashboard.is_running());

        tokio::time::sleep(Duration::from_millis(5500)).await;
        let ticked = dashboard.feed().readings();
        assert!(!Arc::ptr_eq(&initial, &ticked));

        dashboard.shutdown().await;
        assert!(!dashboard.is_running());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(Arc::ptr_eq(&ticked, &dashboard.feed().readings()));
    }

    #[tokio::test]
    async fn test_raise_temperature_alert() {
        let feed = MetricsFeed::new(Duration::from_secs(1), Some(2));
        feed.initialize(vec![
            SensorReading::new("sensor-hot").with_temperature(39.0),
            SensorReading::new("sensor-warm").with_temperature(33.0),
        ])
        .unwrap();
        let dashboard = Dashboard::with_parts(
            DeviceStore::new(),
            feed,
            DeviceCatalog::with_mock_data(false),
            ProfileService::with_mock_user(false),
            settings(DeviceCountSource::Placeholder),
        );

        let alert = dashboard.raise_temperature_alert().unwrap();

        assert_eq!(alert.device_id, "sensor-hot");
        assert_eq!(alert.message, "High temperature alert!");
        assert_eq!(dashboard.store().alerts()[0].id, alert.id);
        assert_eq!(dashboard.summary().high_severity_alerts, 1);
    }

    #[tokio::test]
    async fn test_low_temperature_alert_uses_coldest_reading() {
        let feed = MetricsFeed::new(Duration::from_secs(1), Some(3));
        feed.initialize(vec![
            SensorReading::new("sensor-mild").with_temperature(8.0),
            SensorReading::new("sensor-cold").with_temperature(5.0),
        ])
        .unwrap();
        let dashboard = Dashboard::with_parts(
            DeviceStore::new(),
            feed,
            DeviceCatalog::with_mock_data(false),
            ProfileService::with_mock_user(false),
            settings(DeviceCountSource::Placeholder),
        );

        let alert = dashboard.raise_temperature_alert().unwrap();

        assert_eq!(alert.device_id, "sensor-cold");
        assert_eq!(alert.message, "Low temperature alert!");
        assert_eq!(dashboard.summary().high_severity_alerts, 0);
    }

    #[tokio::test]
    async fn test_no_alert_in_normal_range() {
        let dashboard = Dashboard::new(Settings {
            backend: crate::config::BackendSettings {
                simulate_latency: false,
            },
            ..settings(DeviceCountSource::Placeholder)
        })
        .unwrap();

        assert!(dashboard.raise_temperature_alert().is_none());
        assert!(dashboard.store().alerts().is_empty());
    }
}
