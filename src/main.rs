use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use releaf::air_quality::AirQualityClient;
use releaf::backend::BackendClient;
use releaf::constants::AIR_QUALITY_URL;
use releaf::database::CandidateStore;
use releaf::server::{start_server, AppState};
use releaf::settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("releaf=info,tower_http=info")),
        )
        .init();

    info!("Starting ReLeaf overlay service v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load().context("Failed to load settings")?;
    if !Settings::config_path().exists() {
        if let Err(e) = Settings::default().save() {
            warn!(error = %e, "could not write default config file");
        }
    }
    info!(
        config = %Settings::config_path().display(),
        port = settings.port,
        "settings loaded"
    );

    let store = CandidateStore::new();
    match store.load_from_disk() {
        Ok(true) => info!(trees = store.count(), "restored planting plan"),
        Ok(false) => info!("no saved planting plan, starting empty"),
        Err(e) => warn!(error = %e, "could not read planting plan, starting empty"),
    }

    let backend = BackendClient::new(settings.backend_url.clone()).context("Failed to build HTTP client")?;
    info!(url = %backend.base_url(), "backend client ready");
    let air_quality = match settings.google_maps_api_key {
        Some(ref key) => Some(AirQualityClient::new(reqwest::Client::new(), AIR_QUALITY_URL, key.clone())),
        None => {
            warn!("GOOGLE_MAPS_API_KEY not set, air quality sampling disabled");
            None
        }
    };

    let port = settings.port;
    let save_on_exit = settings.save_on_exit;
    let state = AppState::new(store.clone(), settings, backend, air_quality);

    start_server(state, port).await?;

    if save_on_exit {
        store.save_to_disk().context("Failed to save planting plan")?;
        info!(trees = store.count(), "planting plan saved");
    }

    Ok(())
}
