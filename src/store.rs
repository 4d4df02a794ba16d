//! Device store
//!
//! Single source of truth for devices and alerts. The whole state lives in an
//! immutable snapshot behind a `watch` channel: every action builds the next
//! snapshot and swaps it in atomically, so a reader holding an
//! `Arc<DeviceState>` always sees one complete state and derived views never
//! mix fields from different versions.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::models::{Alert, Device, DeviceStatus, Severity};

/// One complete version of the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceState {
    pub devices: Vec<Device>,
    pub alerts: Vec<Alert>,
    pub loading: bool,
    pub error: Option<String>,
}

impl DeviceState {
    pub fn devices_with_status(&self, status: DeviceStatus) -> Vec<&Device> {
        self.devices.iter().filter(|d| d.status == status).collect()
    }

    pub fn online_devices(&self) -> Vec<&Device> {
        self.devices_with_status(DeviceStatus::Online)
    }

    pub fn offline_devices(&self) -> Vec<&Device> {
        self.devices_with_status(DeviceStatus::Offline)
    }

    pub fn maintenance_devices(&self) -> Vec<&Device> {
        self.devices_with_status(DeviceStatus::Maintenance)
    }

    pub fn unread_alerts(&self) -> Vec<&Alert> {
        self.alerts.iter().filter(|a| !a.is_read).collect()
    }

    pub fn high_severity_alerts(&self) -> Vec<&Alert> {
        self.alerts
            .iter()
            .filter(|a| a.severity == Severity::High)
            .collect()
    }

    pub fn device_by_id(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }
}

/// Reactive container for [`DeviceState`]
///
/// All actions are total: unknown ids are no-ops and nothing here returns an
/// error. Subscribers are only woken when an action actually changed state.
#[derive(Debug)]
pub struct DeviceStore {
    state: watch::Sender<Arc<DeviceState>>,
}

impl DeviceStore {
    /// Create an empty store
    pub fn new() -> Self {
        info!("Initializing device store");
        let (state, _) = watch::channel(Arc::new(DeviceState::default()));
        Self { state }
    }

    /// Build the next state from the current one and publish it if `apply`
    /// reports a change.
    fn update<F>(&self, action: &'static str, apply: F)
    where
        F: FnOnce(&mut DeviceState) -> bool,
    {
        let changed = self.state.send_if_modified(|current| {
            let mut next = (**current).clone();
            if apply(&mut next) && next != **current {
                *current = Arc::new(next);
                true
            } else {
                false
            }
        });

        debug!(action, changed, "Device store action applied");
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<DeviceState> {
        self.state.borrow().clone()
    }

    pub fn devices(&self) -> Vec<Device> {
        self.state.borrow().devices.clone()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.state.borrow().alerts.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    /// Receive every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<DeviceState>> {
        self.state.subscribe()
    }

    // ── Actions ──────────────────────────────────────────────────────

    pub fn set_loading(&self, loading: bool) {
        self.update("set_loading", |s| {
            s.loading = loading;
            s.error = None;
            true
        });
    }

    pub fn set_error(&self, error: impl Into<String>) {
        let error = error.into();
        warn!(error = %error, "Device store error set");
        self.update("set_error", |s| {
            s.error = Some(error);
            s.loading = false;
            true
        });
    }

    pub fn set_devices(&self, devices: Vec<Device>) {
        self.update("set_devices", |s| {
            s.devices = dedupe_by_id(devices);
            s.loading = false;
            s.error = None;
            true
        });
    }

    /// Append a device. A device whose id is already present is ignored,
    /// but the error is still cleared as on every other add.
    pub fn add_device(&self, device: Device) {
        self.update("add_device", |s| {
            if s.device_by_id(&device.id).is_some() {
                warn!(device_id = %device.id, "Ignoring device with duplicate id");
                return s.error.take().is_some();
            }
            s.devices.push(device);
            s.error = None;
            true
        });
    }

    /// Replace the device with the same id; no-op if absent
    pub fn update_device(&self, device: Device) {
        self.update("update_device", |s| {
            match s.devices.iter_mut().find(|d| d.id == device.id) {
                Some(slot) => *slot = device,
                None => return false,
            }
            s.error = None;
            true
        });
    }

    /// Remove the device with the given id; no-op if absent
    pub fn delete_device(&self, device_id: &str) {
        self.update("delete_device", |s| {
            let before = s.devices.len();
            s.devices.retain(|d| d.id != device_id);
            if s.devices.len() == before {
                return false;
            }
            s.error = None;
            true
        });
    }

    pub fn set_alerts(&self, alerts: Vec<Alert>) {
        self.update("set_alerts", |s| {
            s.alerts = alerts;
            s.error = None;
            true
        });
    }

    /// Newest alerts go first
    pub fn add_alert(&self, alert: Alert) {
        self.update("add_alert", |s| {
            s.alerts.insert(0, alert);
            s.error = None;
            true
        });
    }

    pub fn mark_alert_as_read(&self, alert_id: &str) {
        self.update("mark_alert_as_read", |s| {
            match s.alerts.iter_mut().find(|a| a.id == alert_id) {
                Some(alert) if !alert.is_read => {
                    alert.is_read = true;
                    true
                }
                _ => false,
            }
        });
    }

    pub fn clear_error(&self) {
        self.update("clear_error", |s| s.error.take().is_some());
    }
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Keep the first occurrence of every id
fn dedupe_by_id(devices: Vec<Device>) -> Vec<Device> {
    let mut unique: Vec<Device> = Vec::with_capacity(devices.len());
    for device in devices {
        if unique.iter().any(|d| d.id == device.id) {
            warn!(device_id = %device.id, "Dropping device with duplicate id");
            continue;
        }
        unique.push(device);
    }
    unique
}
