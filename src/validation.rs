//! Input validation module
//!
//! Validates create/update payloads and sensor readings before they reach
//! the mock collaborators or the metrics feed.

use crate::error::{AppError, AppResult};
use crate::models::{ChangePassword, DeviceUpdate, NewDevice, SensorReading, UserUpdate};
use tracing::{debug, warn};
use validator::{Validate, ValidationErrors};

/// Flatten validator field errors into `"field: msg, msg; field: msg"`
fn describe(validation_errors: &ValidationErrors) -> String {
    let mut error_messages: Vec<String> = validation_errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let msgs: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.message.as_ref().map(|c| c.as_ref()))
                .collect();
            format!("{}: {}", field, msgs.join(", "))
        })
        .collect();

    // field_errors() is a HashMap
    error_messages.sort();
    error_messages.join("; ")
}

fn check<T: Validate>(input: &T, what: &str) -> AppResult<()> {
    if let Err(validation_errors) = input.validate() {
        let message = describe(&validation_errors);
        warn!(errors = %message, "{} validation failed", what);
        return Err(AppError::ValidationError(message));
    }

    debug!("{} validation passed", what);
    Ok(())
}

/// Validate a device create payload
pub fn validate_new_device(input: &NewDevice) -> AppResult<()> {
    check(input, "Device")?;
    validate_name(&input.name)
}

/// Validate a partial device update
pub fn validate_device_update(input: &DeviceUpdate) -> AppResult<()> {
    check(input, "Device update")?;
    match &input.name {
        Some(name) => validate_name(name),
        None => Ok(()),
    }
}

/// Validate a sensor reading: every present channel must be finite and non-negative
pub fn validate_sensor_reading(reading: &SensorReading) -> AppResult<()> {
    let channels = [
        ("temperature", reading.temperature),
        ("humidity", reading.humidity),
        ("soilMoisture", reading.soil_moisture),
        ("lightIntensity", reading.light_intensity),
        ("ph", reading.ph),
        ("nitrogen", reading.nitrogen),
        ("phosphorus", reading.phosphorus),
        ("potassium", reading.potassium),
    ];

    for (name, value) in channels {
        if let Some(value) = value {
            if !value.is_finite() {
                return Err(AppError::ValidationError(format!(
                    "{}: must be a finite number",
                    name
                )));
            }
        }
    }

    check(reading, "Sensor reading")
}

/// Validate a profile update
pub fn validate_user_update(input: &UserUpdate) -> AppResult<()> {
    check(input, "Profile update")
}

/// Validate a password change request, including the confirmation match
pub fn validate_password_change(input: &ChangePassword) -> AppResult<()> {
    check(input, "Password change")?;

    if input.new_password != input.confirm_password {
        warn!("Password confirmation mismatch");
        return Err(AppError::PasswordMismatch);
    }

    Ok(())
}

/// Names must carry visible characters, not just pass the length check
fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().chars().count() < 3 {
        return Err(AppError::ValidationError(
            "name: Name must be at least 3 characters".to_string(),
        ));
    }

    Ok(())
}
