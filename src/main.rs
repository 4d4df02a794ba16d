//! AgroSense dashboard simulator
//!
//! Runs one dashboard session against the mock farm: loads devices and
//! alerts, starts simulated telemetry and logs every metrics emission until
//! Ctrl-C.

use futures::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use agrosense::config::{LogFormat, Settings};
use agrosense::Dashboard;

fn init_tracing(format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,agrosense=debug"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::from_env()?;
    init_tracing(settings.logging.format);

    info!(
        tick_interval_ms = settings.feed.tick_interval_ms,
        stream_interval_ms = settings.feed.stream_interval_ms,
        device_counts = ?settings.feed.device_counts,
        "Starting AgroSense dashboard simulator"
    );

    let mut dashboard = Dashboard::new(settings)?;
    dashboard.load_initial_data().await;
    dashboard.start();

    let mut metrics = Box::pin(dashboard.feed().metrics_stream());
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut active_alert: Option<&'static str> = None;

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for shutdown signal");
                }
                info!("Shutdown requested");
                break;
            }
            Some(update) = metrics.next() => {
                info!(
                    average_temperature = update.average_temperature,
                    average_humidity = update.average_humidity,
                    average_soil_moisture = update.average_soil_moisture,
                    online_devices = update.online_devices,
                    total_devices = update.total_devices,
                    critical_alerts = update.critical_alerts,
                    "Metrics update"
                );

                // Record each newly entered alert state once
                let current = dashboard.feed().temperature_alert().map(|a| a.message);
                if current != active_alert {
                    if current.is_some() {
                        dashboard.raise_temperature_alert();
                    }
                    active_alert = current;
                }
            }
        }
    }

    dashboard.shutdown().await;

    let summary = dashboard.summary();
    info!(
        summary = %serde_json::to_string(&summary)?,
        "Final dashboard state"
    );

    Ok(())
}
