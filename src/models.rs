//! Data models for devices, alerts, sensor readings and user profiles
//!
//! Defines the core data structures used throughout the application.
//! Field names serialize in camelCase to match the dashboard's JSON shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

/// Kind of monitored unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Sensor,
    Actuator,
    Controller,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Sensor => "sensor",
            DeviceType::Actuator => "actuator",
            DeviceType::Controller => "controller",
        }
    }
}

/// Connectivity status reported for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A monitored physical unit in the field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub location: String,
    pub status: DeviceStatus,
    pub last_seen: DateTime<Utc>,
    /// Battery charge in percent (0-100), absent for mains-powered units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<u8>,
    pub firmware_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl Device {
    /// Materialize a create payload into a device with a fresh id
    pub fn from_new(new: NewDevice) -> Self {
        Self {
            id: format!("device-{}", Uuid::new_v4()),
            name: new.name,
            device_type: new.device_type,
            location: new.location,
            status: new.status,
            last_seen: Utc::now(),
            battery_level: new.battery_level,
            firmware_version: new.firmware_version,
            coordinates: new.coordinates,
            metadata: new.metadata,
        }
    }

    /// Apply a partial update. Absent fields are left untouched.
    pub fn apply(&mut self, update: DeviceUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(device_type) = update.device_type {
            self.device_type = device_type;
        }
        if let Some(location) = update.location {
            self.location = location;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(battery_level) = update.battery_level {
            self.battery_level = Some(battery_level);
        }
        if let Some(firmware_version) = update.firmware_version {
            self.firmware_version = firmware_version;
        }
        if let Some(coordinates) = update.coordinates {
            self.coordinates = Some(coordinates);
        }
        if let Some(metadata) = update.metadata {
            self.metadata = Some(metadata);
        }
    }
}

/// Create payload: a device before the catalog assigns `id` and `last_seen`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewDevice {
    #[validate(length(min = 3, message = "Name must be at least 3 characters"))]
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: String,
    pub status: DeviceStatus,
    #[validate(range(max = 100, message = "Battery level must be between 0 and 100"))]
    pub battery_level: Option<u8>,
    #[validate(length(min = 1, message = "Firmware version is required"))]
    pub firmware_version: String,
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

/// Partial device update
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeviceUpdate {
    #[validate(length(min = 3, message = "Name must be at least 3 characters"))]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub device_type: Option<DeviceType>,
    #[validate(length(min = 1, message = "Location is required"))]
    pub location: Option<String>,
    pub status: Option<DeviceStatus>,
    #[validate(range(max = 100, message = "Battery level must be between 0 and 100"))]
    pub battery_level: Option<u8>,
    #[validate(length(min = 1, message = "Firmware version is required"))]
    pub firmware_version: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub metadata: Option<Map<String, Value>>,
}

impl DeviceUpdate {
    pub fn status(status: DeviceStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Warning,
    Error,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A timestamped notification tied to a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    /// Lookup-only reference to the owning device
    pub device_id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
    pub severity: Severity,
}

impl Alert {
    pub fn new(
        device_id: impl Into<String>,
        alert_type: AlertType,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            id: format!("alert-{}", Uuid::new_v4()),
            device_id: device_id.into(),
            alert_type,
            message: message.into(),
            timestamp: Utc::now(),
            is_read: false,
            severity,
        }
    }
}

/// A timestamped bundle of environmental measurements from one device.
/// Every channel is optional; present channels are never negative.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,

    /// Air temperature (Celsius)
    #[validate(range(min = 0.0, message = "Temperature must not be negative"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Relative humidity (percentage)
    #[validate(range(min = 0.0, message = "Humidity must not be negative"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,

    /// Volumetric soil moisture (percentage)
    #[validate(range(min = 0.0, message = "Soil moisture must not be negative"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_moisture: Option<f64>,

    /// Light intensity (lux)
    #[validate(range(min = 0.0, message = "Light intensity must not be negative"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_intensity: Option<f64>,

    #[validate(range(min = 0.0, message = "pH must not be negative"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,

    /// Soil nutrients (mg/kg)
    #[validate(range(min = 0.0, message = "Nitrogen must not be negative"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nitrogen: Option<f64>,
    #[validate(range(min = 0.0, message = "Phosphorus must not be negative"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phosphorus: Option<f64>,
    #[validate(range(min = 0.0, message = "Potassium must not be negative"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub potassium: Option<f64>,
}

impl SensorReading {
    /// Create an empty reading for a device with current timestamp
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            timestamp: Utc::now(),
            ..Self::default()
        }
    }

    pub fn with_temperature(mut self, value: f64) -> Self {
        self.temperature = Some(value);
        self
    }

    pub fn with_humidity(mut self, value: f64) -> Self {
        self.humidity = Some(value);
        self
    }

    pub fn with_soil_moisture(mut self, value: f64) -> Self {
        self.soil_moisture = Some(value);
        self
    }
}

/// Aggregates over the current reading buffer. Never mutated on its own.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub average_temperature: f64,
    pub average_humidity: f64,
    pub average_soil_moisture: f64,
    pub total_devices: usize,
    pub online_devices: usize,
    pub critical_alerts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Danger,
    Warning,
}

/// Alert derived from the average temperature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureAlert {
    #[serde(rename = "type")]
    pub level: AlertLevel,
    pub message: &'static str,
    pub severity: Severity,
}

impl TemperatureAlert {
    /// Turn the derived alert into a store alert attributed to `device_id`
    pub fn to_alert(&self, device_id: impl Into<String>) -> Alert {
        let alert_type = match self.level {
            AlertLevel::Danger => AlertType::Error,
            AlertLevel::Warning => AlertType::Warning,
        };
        Alert::new(device_id, alert_type, self.message, self.severity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Farmer,
    Technician,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HumidityUnit {
    Percentage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub temperature_unit: TemperatureUnit,
    pub humidity_unit: HumidityUnit,
    pub notifications: bool,
    pub email_alerts: bool,
    pub sms_alerts: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_name: Option<String>,
    /// Farm area in hectares
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farm_location: Option<String>,
    pub preferences: UserPreferences,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile update
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[validate(email(message = "Email must be a valid address"))]
    pub email: Option<String>,
    #[validate(length(min = 2, message = "First name must be at least 2 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 2, message = "Last name must be at least 2 characters"))]
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub farm_name: Option<String>,
    #[validate(range(min = 0.0, message = "Farm size must not be negative"))]
    pub farm_size: Option<f64>,
    pub farm_location: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub temperature_unit: Option<TemperatureUnit>,
    pub humidity_unit: Option<HumidityUnit>,
    pub notifications: Option<bool>,
    pub email_alerts: Option<bool>,
    pub sms_alerts: Option<bool>,
}

/// Password change request as submitted by the profile form
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePassword {
    #[validate(length(min = 6, message = "Current password must be at least 6 characters"))]
    pub current_password: String,
    #[validate(length(min = 8, message = "New password must be at least 8 characters"))]
    pub new_password: String,
    pub confirm_password: String,
}

/// Outcome of a password change attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordChangeResult {
    pub success: bool,
    pub message: String,
}
