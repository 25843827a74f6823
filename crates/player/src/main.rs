//! GeoQuest Player - desktop composition root.
//!
//! Runs the progression engine against the play backend with simulated
//! sensors and a line console in place of the play screen.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use geoquest_domain::Coordinates;
use tokio::sync::{mpsc, watch};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geoquest_player::app::{Adapters, App, Inbox};
use geoquest_player::console::{self, HELP};
use geoquest_player::infrastructure::{
    FileStorageProvider, LocalNotificationCenter, RestBackend, Settings, SimulatedGeolocation,
    SimulatedMotion,
};

/// Seconds between simulated position samples.
const TRACK_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geoquest_player=debug,geoquest_domain=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting GeoQuest Player");

    let settings = Settings::from_env();
    tracing::info!(
        api_url = %settings.api_url,
        storage = %settings.storage_path.display(),
        "Settings loaded"
    );

    let backend = Arc::new(RestBackend::new(
        &settings.api_url,
        settings.api_token.clone(),
        settings.request_timeout,
    ));
    let storage = Arc::new(FileStorageProvider::open(&settings.storage_path));

    let geolocation = match &settings.simulated_track {
        Some(path) => SimulatedGeolocation::from_file(path, TRACK_INTERVAL)
            .with_context(|| format!("loading track {}", path.display()))?,
        None => {
            tracing::warn!("GEOQUEST_SIMULATED_TRACK not set; standing still at the origin");
            SimulatedGeolocation::stationary(Coordinates {
                latitude: 0.0,
                longitude: 0.0,
            })
        }
    };

    let (app, signals) = App::new(
        Adapters {
            play_records: backend.clone(),
            cursor: backend.clone(),
            hints: backend,
            geolocation: Arc::new(geolocation),
            motion: Arc::new(SimulatedMotion::default()),
            notifications: Arc::new(LocalNotificationCenter::default()),
            storage,
        },
        settings.thresholds,
    );
    let app = app.with_resample_delay(TRACK_INTERVAL);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (reentry_tx, reentries) = mpsc::channel(8);
    let (command_tx, commands) = mpsc::channel(16);

    let notifier = tokio::spawn(app.notifier.clone().run(
        settings.notifier_interval,
        reentry_tx,
        shutdown_rx.clone(),
    ));
    console::spawn_stdin_reader(command_tx);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Listening for ctrl-c failed");
        }
        tracing::info!("Shutting down");
        let _ = shutdown_tx.send(true);
    });

    println!("{}", HELP);
    let ctx = app.restore();
    app.run(
        ctx,
        Inbox {
            signals,
            reentries,
            commands,
        },
        shutdown_rx,
    )
    .await;

    notifier.await.context("notifier task")?;
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
