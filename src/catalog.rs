//! Mock device catalog
//!
//! Simulated backend for device and alert CRUD. Every call sleeps for a fixed,
//! per-operation latency before answering so callers exercise the same async
//! paths a networked backend would need. Lookups by unknown id fail with
//! "Device not found".

use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::{
    Alert, AlertType, Coordinates, Device, DeviceStatus, DeviceType, DeviceUpdate, NewDevice,
    Severity,
};
use crate::validation::{validate_device_update, validate_new_device};

/// Artificial latency per operation class
pub struct Latency;

impl Latency {
    pub const LIST: Duration = Duration::from_millis(500);
    pub const LOOKUP: Duration = Duration::from_millis(300);
    pub const WRITE: Duration = Duration::from_millis(500);
    pub const DELETE: Duration = Duration::from_millis(300);
    pub const ALERTS: Duration = Duration::from_millis(300);
    pub const MARK_READ: Duration = Duration::from_millis(200);
    pub const QUERY: Duration = Duration::from_millis(200);
}

/// Sleep for `latency` unless simulation is switched off
pub(crate) async fn simulate(enabled: bool, latency: Duration) {
    if enabled {
        tokio::time::sleep(latency).await;
    }
}

/// In-memory device and alert backend
pub struct DeviceCatalog {
    devices: RwLock<Vec<Device>>,
    alerts: RwLock<Vec<Alert>>,
    simulate_latency: bool,
}

impl DeviceCatalog {
    pub fn new(devices: Vec<Device>, alerts: Vec<Alert>, simulate_latency: bool) -> Self {
        info!(
            devices = devices.len(),
            alerts = alerts.len(),
            simulate_latency,
            "Initializing mock device catalog"
        );
        Self {
            devices: RwLock::new(devices),
            alerts: RwLock::new(alerts),
            simulate_latency,
        }
    }

    /// Catalog pre-filled with the demo farm's devices and alerts
    pub fn with_mock_data(simulate_latency: bool) -> Self {
        Self::new(mock_devices(), mock_alerts(), simulate_latency)
    }

    async fn delay(&self, latency: Duration) {
        simulate(self.simulate_latency, latency).await;
    }

    // ── Devices ──────────────────────────────────────────────────────

    pub async fn get_devices(&self) -> AppResult<Vec<Device>> {
        let devices = self.devices.read().await.clone();
        self.delay(Latency::LIST).await;
        Ok(devices)
    }

    pub async fn get_device_by_id(&self, id: &str) -> AppResult<Device> {
        let device = self
            .devices
            .read()
            .await
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(AppError::device_not_found)?;
        self.delay(Latency::LOOKUP).await;
        Ok(device)
    }

    /// Validate and store a new device; the catalog assigns `id` and `last_seen`
    pub async fn create_device(&self, new: NewDevice) -> AppResult<Device> {
        validate_new_device(&new)?;

        let device = Device::from_new(new);
        self.devices.write().await.push(device.clone());
        info!(device_id = %device.id, name = %device.name, "Device created");

        self.delay(Latency::WRITE).await;
        Ok(device)
    }

    pub async fn update_device(&self, id: &str, update: DeviceUpdate) -> AppResult<Device> {
        validate_device_update(&update)?;

        let device = {
            let mut devices = self.devices.write().await;
            let device = devices
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or_else(AppError::device_not_found)?;
            device.apply(update);
            device.clone()
        };
        info!(device_id = %id, "Device updated");

        self.delay(Latency::WRITE).await;
        Ok(device)
    }

    pub async fn delete_device(&self, id: &str) -> AppResult<()> {
        {
            let mut devices = self.devices.write().await;
            let index = devices
                .iter()
                .position(|d| d.id == id)
                .ok_or_else(AppError::device_not_found)?;
            devices.remove(index);
        }
        info!(device_id = %id, "Device deleted");

        self.delay(Latency::DELETE).await;
        Ok(())
    }

    pub async fn update_device_status(&self, id: &str, status: DeviceStatus) -> AppResult<Device> {
        self.update_device(id, DeviceUpdate::status(status)).await
    }

    // ── Alerts ───────────────────────────────────────────────────────

    pub async fn get_alerts(&self) -> AppResult<Vec<Alert>> {
        let alerts = self.alerts.read().await.clone();
        self.delay(Latency::ALERTS).await;
        Ok(alerts)
    }

    /// Always succeeds; unknown ids are ignored
    pub async fn mark_alert_as_read(&self, id: &str) -> AppResult<()> {
        if let Some(alert) = self.alerts.write().await.iter_mut().find(|a| a.id == id) {
            alert.is_read = true;
        }
        debug!(alert_id = %id, "Alert marked as read");

        self.delay(Latency::MARK_READ).await;
        Ok(())
    }

    // ── Search and filter ────────────────────────────────────────────

    /// Case-insensitive match against name, location and type
    pub async fn search_devices(&self, query: &str) -> AppResult<Vec<Device>> {
        let needle = query.to_lowercase();
        let matches = self.filter(|d| {
            d.name.to_lowercase().contains(&needle)
                || d.location.to_lowercase().contains(&needle)
                || d.device_type.as_str().contains(&needle)
        })
        .await;
        debug!(query = %query, matches = matches.len(), "Device search");

        self.delay(Latency::QUERY).await;
        Ok(matches)
    }

    pub async fn devices_by_type(&self, device_type: DeviceType) -> AppResult<Vec<Device>> {
        let matches = self.filter(|d| d.device_type == device_type).await;
        self.delay(Latency::QUERY).await;
        Ok(matches)
    }

    pub async fn devices_by_status(&self, status: DeviceStatus) -> AppResult<Vec<Device>> {
        let matches = self.filter(|d| d.status == status).await;
        self.delay(Latency::QUERY).await;
        Ok(matches)
    }

    async fn filter<F>(&self, predicate: F) -> Vec<Device>
    where
        F: Fn(&Device) -> bool,
    {
        self.devices
            .read()
            .await
            .iter()
            .filter(|d| predicate(d))
            .cloned()
            .collect()
    }
}

pub fn mock_devices() -> Vec<Device> {
    let now = Utc::now();
    let device = |id: &str,
                  name: &str,
                  device_type: DeviceType,
                  location: &str,
                  status: DeviceStatus,
                  hours_ago: i64,
                  battery: u8,
                  firmware: &str,
                  (latitude, longitude): (f64, f64)| Device {
        id: id.to_string(),
        name: name.to_string(),
        device_type,
        location: location.to_string(),
        status,
        last_seen: now - chrono::Duration::hours(hours_ago),
        battery_level: Some(battery),
        firmware_version: firmware.to_string(),
        coordinates: Some(Coordinates {
            latitude,
            longitude,
        }),
        metadata: None,
    };

    vec![
        device(
            "device-001",
            "Temperature Sensor 1",
            DeviceType::Sensor,
            "Field A - North",
            DeviceStatus::Online,
            0,
            85,
            "v2.1.0",
            (40.7128, -74.0060),
        ),
        device(
            "device-002",
            "Humidity Sensor 1",
            DeviceType::Sensor,
            "Field A - South",
            DeviceStatus::Online,
            0,
            92,
            "v2.1.0",
            (40.7129, -74.0061),
        ),
        device(
            "device-003",
            "Soil Moisture Sensor 1",
            DeviceType::Sensor,
            "Field B - East",
            DeviceStatus::Offline,
            1,
            15,
            "v2.0.5",
            (40.7130, -74.0062),
        ),
        device(
            "device-004",
            "Irrigation Controller 1",
            DeviceType::Controller,
            "Field A - Center",
            DeviceStatus::Online,
            0,
            78,
            "v1.9.2",
            (40.7127, -74.0059),
        ),
        device(
            "device-005",
            "Light Sensor 1",
            DeviceType::Sensor,
            "Greenhouse 1",
            DeviceStatus::Maintenance,
            2,
            45,
            "v2.1.1",
            (40.7131, -74.0063),
        ),
    ]
}

pub fn mock_alerts() -> Vec<Alert> {
    let now = Utc::now();
    vec![
        Alert {
            id: "alert-001".to_string(),
            device_id: "device-003".to_string(),
            alert_type: AlertType::Warning,
            message: "Low battery level detected".to_string(),
            timestamp: now - chrono::Duration::minutes(30),
            is_read: false,
            severity: Severity::Medium,
        },
        Alert {
            id: "alert-002".to_string(),
            device_id: "device-005".to_string(),
            alert_type: AlertType::Error,
            message: "Device offline for more than 2 hours".to_string(),
            timestamp: now - chrono::Duration::hours(2),
            is_read: false,
            severity: Severity::High,
        },
        Alert {
            id: "alert-003".to_string(),
            device_id: "device-001".to_string(),
            alert_type: AlertType::Info,
            message: "Firmware update available".to_string(),
            timestamp: now - chrono::Duration::hours(1),
            is_read: true,
            severity: Severity::Low,
        },
    ]
}
