//! Aggregation helpers over the reading buffer
//!
//! Everything here is a pure function of its inputs: the feed calls
//! [`compute_metrics`] after every buffer mutation and [`temperature_alert`]
//! whenever a caller asks for the current alert.

use crate::models::{
    AlertLevel, DashboardMetrics, DeviceStatus, SensorReading, Severity, TemperatureAlert,
};
use crate::store::DeviceState;

/// Source of the device counts reported in [`DashboardMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCounts {
    pub total: usize,
    pub online: usize,
}

impl DeviceCounts {
    /// Fixed counts the dashboard has always reported, independent of the store
    pub const PLACEHOLDER: DeviceCounts = DeviceCounts {
        total: 12,
        online: 10,
    };

    /// Counts derived from the actual device list
    pub fn from_state(state: &DeviceState) -> Self {
        Self {
            total: state.devices.len(),
            online: state.devices_with_status(DeviceStatus::Online).len(),
        }
    }
}

impl Default for DeviceCounts {
    fn default() -> Self {
        Self::PLACEHOLDER
    }
}

/// High above 35, rising above 30, low below 10. All bounds exclusive.
pub const HIGH_TEMPERATURE: f64 = 35.0;
pub const RISING_TEMPERATURE: f64 = 30.0;
pub const LOW_TEMPERATURE: f64 = 10.0;

/// Derive the temperature alert for an average temperature
pub fn temperature_alert(average_temperature: f64) -> Option<TemperatureAlert> {
    if average_temperature > HIGH_TEMPERATURE {
        Some(TemperatureAlert {
            level: AlertLevel::Danger,
            message: "High temperature alert!",
            severity: Severity::High,
        })
    } else if average_temperature > RISING_TEMPERATURE {
        Some(TemperatureAlert {
            level: AlertLevel::Warning,
            message: "Temperature rising",
            severity: Severity::Medium,
        })
    } else if average_temperature < LOW_TEMPERATURE {
        Some(TemperatureAlert {
            level: AlertLevel::Warning,
            message: "Low temperature alert!",
            severity: Severity::Medium,
        })
    } else {
        None
    }
}

/// Mean of the present values, or `None` when no reading carries the channel
pub fn mean_of<F>(readings: &[SensorReading], channel: F) -> Option<f64>
where
    F: Fn(&SensorReading) -> Option<f64>,
{
    let (sum, count) = readings
        .iter()
        .filter_map(channel)
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Aggregate the buffer into dashboard metrics.
///
/// Temperature is rounded to one decimal, humidity and soil moisture to whole
/// numbers. A channel no reading carries averages to 0.
pub fn compute_metrics(readings: &[SensorReading], counts: DeviceCounts) -> DashboardMetrics {
    let average_temperature = mean_of(readings, |r| r.temperature)
        .map(|v| round_to(v, 1))
        .unwrap_or(0.0);
    let average_humidity = mean_of(readings, |r| r.humidity)
        .map(|v| round_to(v, 0))
        .unwrap_or(0.0);
    let average_soil_moisture = mean_of(readings, |r| r.soil_moisture)
        .map(|v| round_to(v, 0))
        .unwrap_or(0.0);

    // An empty buffer has no temperature to alert on
    let critical_alerts = match mean_of(readings, |r| r.temperature) {
        Some(_) if temperature_alert(average_temperature).is_some() => 1,
        _ => 0,
    };

    DashboardMetrics {
        average_temperature,
        average_humidity,
        average_soil_moisture,
        total_devices: counts.total,
        online_devices: counts.online,
        critical_alerts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(temperature: f64) -> SensorReading {
        SensorReading::new("sensor-001").with_temperature(temperature)
    }

    #[test]
    fn test_average_temperature_example() {
        let readings = vec![reading(25.5), reading(28.2), reading(22.8)];
        let metrics = compute_metrics(&readings, DeviceCounts::PLACEHOLDER);

        assert_eq!(metrics.average_temperature, 25.5);
        assert_eq!(metrics.critical_alerts, 0);
    }

    #[test]
    fn test_humidity_and_soil_round_to_integer() {
        let readings = vec![
            SensorReading::new("a").with_humidity(65.0).with_soil_moisture(45.0),
            SensorReading::new("b").with_humidity(58.0).with_soil_moisture(38.0),
            SensorReading::new("c").with_humidity(72.0).with_soil_moisture(52.0),
        ];
        let metrics = compute_metrics(&readings, DeviceCounts::PLACEHOLDER);

        // 195 / 3 = 65, 135 / 3 = 45
        assert_eq!(metrics.average_humidity, 65.0);
        assert_eq!(metrics.average_soil_moisture, 45.0);

        let readings = vec![
            SensorReading::new("a").with_humidity(60.0),
            SensorReading::new("b").with_humidity(61.0),
        ];
        assert_eq!(
            compute_metrics(&readings, DeviceCounts::PLACEHOLDER).average_humidity,
            61.0
        );
    }

    #[test]
    fn test_absent_channels_are_skipped() {
        let readings = vec![
            reading(20.0),
            SensorReading::new("sensor-002").with_humidity(50.0),
        ];
        let metrics = compute_metrics(&readings, DeviceCounts::PLACEHOLDER);

        assert_eq!(metrics.average_temperature, 20.0);
        assert_eq!(metrics.average_humidity, 50.0);
        assert_eq!(metrics.average_soil_moisture, 0.0);
    }

    #[test]
    fn test_empty_buffer() {
        let metrics = compute_metrics(&[], DeviceCounts::PLACEHOLDER);

        assert_eq!(metrics.average_temperature, 0.0);
        assert_eq!(metrics.critical_alerts, 0);
        assert_eq!(metrics.total_devices, 12);
        assert_eq!(metrics.online_devices, 10);
    }

    #[test]
    fn test_compute_metrics_is_pure() {
        let readings = vec![reading(31.0), reading(33.4)];

        let first = compute_metrics(&readings, DeviceCounts::PLACEHOLDER);
        let second = compute_metrics(&readings, DeviceCounts::PLACEHOLDER);
        let third = compute_metrics(&readings, DeviceCounts::PLACEHOLDER);

        assert_eq!(first, second);
        assert_eq!(second, third);
    }

    #[test]
    fn test_critical_alert_counted() {
        let metrics = compute_metrics(&[reading(36.0)], DeviceCounts::PLACEHOLDER);
        assert_eq!(metrics.critical_alerts, 1);

        let metrics = compute_metrics(&[reading(8.0)], DeviceCounts::PLACEHOLDER);
        assert_eq!(metrics.critical_alerts, 1);
    }

    #[test]
    fn test_temperature_alert_thresholds() {
        assert_eq!(temperature_alert(35.0).map(|a| a.level), Some(AlertLevel::Warning));
        assert_eq!(temperature_alert(35.0).map(|a| a.message), Some("Temperature rising"));

        let danger = temperature_alert(35.01).unwrap();
        assert_eq!(danger.level, AlertLevel::Danger);
        assert_eq!(danger.message, "High temperature alert!");
        assert_eq!(danger.severity, Severity::High);

        let rising = temperature_alert(30.01).unwrap();
        assert_eq!(rising.level, AlertLevel::Warning);
        assert_eq!(rising.message, "Temperature rising");
        assert_eq!(rising.severity, Severity::Medium);

        let low = temperature_alert(9.99).unwrap();
        assert_eq!(low.level, AlertLevel::Warning);
        assert_eq!(low.message, "Low temperature alert!");
        assert_eq!(low.severity, Severity::Medium);

        assert!(temperature_alert(30.0).is_none());
        assert!(temperature_alert(10.0).is_none());
        assert!(temperature_alert(22.0).is_none());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(25.46, 1), 25.5);
        assert_eq!(round_to(64.5, 0), 65.0);
        assert_eq!(round_to(0.04, 1), 0.0);
    }
}
