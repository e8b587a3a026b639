use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use super::events::VisionEvent;
use crate::air_quality::AirQualityClient;
use crate::backend::BackendClient;
use crate::database::CandidateStore;
use crate::panorama::PanoramaSession;
use crate::settings::Settings;
use crate::vision::VisionCache;

// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: CandidateStore,
    pub session: Arc<Mutex<PanoramaSession>>,
    pub settings: Arc<Mutex<Settings>>,
    pub backend: BackendClient,
    pub air_quality: Option<AirQualityClient>,
    pub vision: Arc<VisionCache>,
    pub event_sender: broadcast::Sender<VisionEvent>,
}

impl AppState {
    pub fn new(
        store: CandidateStore,
        settings: Settings,
        backend: BackendClient,
        air_quality: Option<AirQualityClient>,
    ) -> Self {
        let (event_sender, _) = broadcast::channel(100);
        Self {
            store,
            session: Arc::new(Mutex::new(PanoramaSession::new())),
            settings: Arc::new(Mutex::new(settings)),
            backend,
            air_quality,
            vision: Arc::new(VisionCache::default()),
            event_sender,
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn session(&self) -> std::sync::MutexGuard<'_, PanoramaSession> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }
}
