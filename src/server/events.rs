use serde::{Deserialize, Serialize};

// SSE event types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionEvent {
    pub event_type: String,
    pub data: VisionData,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VisionData {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub heading: Option<f64>,
    pub trees: Option<usize>,
    pub trees_added: Option<u32>,
    pub shared: Option<bool>,
    pub stale: Option<bool>,
    pub message: Option<String>,
}

impl VisionEvent {
    pub fn new(event_type: &str, data: VisionData) -> Self {
        Self {
            event_type: event_type.to_string(),
            data,
        }
    }

    pub fn heartbeat() -> Self {
        Self::new(
            "heartbeat",
            VisionData {
                message: Some("SSE connection alive".to_string()),
                ..Default::default()
            },
        )
    }
}
