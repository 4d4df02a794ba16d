//! Mock user-profile service
//!
//! Holds the signed-in user and a mock credential. Like the device catalog,
//! every call waits a fixed latency before answering.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::catalog::simulate;
use crate::error::AppResult;
use crate::models::{
    ChangePassword, HumidityUnit, PasswordChangeResult, PreferencesUpdate, TemperatureUnit, User,
    UserPreferences, UserRole, UserUpdate,
};
use crate::validation::{validate_password_change, validate_user_update};

const GET_LATENCY: Duration = Duration::from_millis(300);
const UPDATE_LATENCY: Duration = Duration::from_millis(500);
const PREFERENCES_LATENCY: Duration = Duration::from_millis(300);
const PASSWORD_LATENCY: Duration = Duration::from_millis(500);

/// Password the mock account starts with
pub const INITIAL_PASSWORD: &str = "current123";

struct Account {
    user: User,
    password: String,
}

pub struct ProfileService {
    account: RwLock<Account>,
    simulate_latency: bool,
}

impl ProfileService {
    pub fn new(user: User, password: impl Into<String>, simulate_latency: bool) -> Self {
        info!(user_id = %user.id, "Initializing profile service");
        Self {
            account: RwLock::new(Account {
                user,
                password: password.into(),
            }),
            simulate_latency,
        }
    }

    pub fn with_mock_user(simulate_latency: bool) -> Self {
        Self::new(mock_user(), INITIAL_PASSWORD, simulate_latency)
    }

    pub async fn current_user(&self) -> AppResult<User> {
        let user = self.account.read().await.user.clone();
        simulate(self.simulate_latency, GET_LATENCY).await;
        Ok(user)
    }

    /// Apply a validated partial update and stamp `updated_at`
    pub async fn update_user(&self, update: UserUpdate) -> AppResult<User> {
        validate_user_update(&update)?;

        let user = {
            let mut account = self.account.write().await;
            let user = &mut account.user;
            if let Some(email) = update.email {
                user.email = email;
            }
            if let Some(first_name) = update.first_name {
                user.first_name = first_name;
            }
            if let Some(last_name) = update.last_name {
                user.last_name = last_name;
            }
            if update.phone.is_some() {
                user.phone = update.phone;
            }
            if update.farm_name.is_some() {
                user.farm_name = update.farm_name;
            }
            if update.farm_size.is_some() {
                user.farm_size = update.farm_size;
            }
            if update.farm_location.is_some() {
                user.farm_location = update.farm_location;
            }
            user.updated_at = Utc::now();
            user.clone()
        };
        info!(user_id = %user.id, "Profile updated");

        simulate(self.simulate_latency, UPDATE_LATENCY).await;
        Ok(user)
    }

    pub async fn update_preferences(&self, update: PreferencesUpdate) -> AppResult<User> {
        let user = {
            let mut account = self.account.write().await;
            let prefs = &mut account.user.preferences;
            if let Some(unit) = update.temperature_unit {
                prefs.temperature_unit = unit;
            }
            if let Some(unit) = update.humidity_unit {
                prefs.humidity_unit = unit;
            }
            if let Some(enabled) = update.notifications {
                prefs.notifications = enabled;
            }
            if let Some(enabled) = update.email_alerts {
                prefs.email_alerts = enabled;
            }
            if let Some(enabled) = update.sms_alerts {
                prefs.sms_alerts = enabled;
            }
            account.user.updated_at = Utc::now();
            account.user.clone()
        };
        info!(user_id = %user.id, "Preferences updated");

        simulate(self.simulate_latency, PREFERENCES_LATENCY).await;
        Ok(user)
    }

    /// Change the password.
    ///
    /// Malformed requests and mismatched confirmations are errors; a wrong
    /// current password is a normal, unsuccessful outcome.
    pub async fn change_password(&self, request: ChangePassword) -> AppResult<PasswordChangeResult> {
        validate_password_change(&request)?;

        let result = {
            let mut account = self.account.write().await;
            if account.password == request.current_password {
                account.password = request.new_password;
                account.user.updated_at = Utc::now();
                info!(user_id = %account.user.id, "Password changed");
                PasswordChangeResult {
                    success: true,
                    message: "Password changed successfully".to_string(),
                }
            } else {
                warn!(user_id = %account.user.id, "Password change rejected");
                PasswordChangeResult {
                    success: false,
                    message: "Current password is incorrect".to_string(),
                }
            }
        };

        simulate(self.simulate_latency, PASSWORD_LATENCY).await;
        Ok(result)
    }
}

pub fn mock_user() -> User {
    User {
        id: "user-001".to_string(),
        email: "farmer@smartfarm.com".to_string(),
        first_name: "John".to_string(),
        last_name: "Doe".to_string(),
        role: UserRole::Farmer,
        phone: Some("+1 (555) 123-4567".to_string()),
        farm_name: Some("Green Valley Farm".to_string()),
        farm_size: Some(150.0),
        farm_location: Some("California, USA".to_string()),
        preferences: UserPreferences {
            temperature_unit: TemperatureUnit::Celsius,
            humidity_unit: HumidityUnit::Percentage,
            notifications: true,
            email_alerts: true,
            sms_alerts: false,
        },
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_else(Utc::now),
        updated_at: Utc::now(),
    }
}
