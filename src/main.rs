mod app;
mod domain;
mod infrastructure;

use crate::app::GyroMouseApp;
use crate::domain::models::AppEvent;
use crate::domain::settings::{Settings, SettingsService};
use crate::infrastructure::hid::LoopbackTransport;
use crate::infrastructure::sensor::SensorFeed;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let settings = match SettingsService::new() {
        Ok(mut service) => {
            if !service.path().exists() {
                if let Err(e) = service.save() {
                    eprintln!("Failed to write default settings: {}", e);
                }
            }
            if let Some(feed) = std::env::args().nth(1) {
                service.get_mut().sensor_feed = Some(feed);
            }
            service.get().clone()
        }
        Err(e) => {
            eprintln!("Failed to load settings, using defaults: {}", e);
            Settings {
                sensor_feed: std::env::args().nth(1),
                ..Settings::default()
            }
        }
    };

    let _logging_guard = infrastructure::logging::init_logger(&settings.log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    info!("Starting Gyro Mouse");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = rt.block_on(run(settings));
    // A stdin feed may still be blocked in a read
    rt.shutdown_timeout(Duration::from_millis(200));
    result
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let transport = Arc::new(LoopbackTransport::new(
        event_tx.clone(),
        &settings.hid.bonded_devices,
    ));
    let app = GyroMouseApp::new(&settings, transport, event_tx.clone(), event_rx);

    tokio::spawn(SensorFeed::new(event_tx.clone()).run(settings.sensor_feed.clone()));

    let ctrl_c_tx = event_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted");
            let _ = ctrl_c_tx.send(AppEvent::Shutdown);
        }
    });
    drop(event_tx);

    app.run().await;
    info!("Gyro Mouse stopped");
    Ok(())
}
