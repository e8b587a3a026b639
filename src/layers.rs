//! Dashboard data layers and what they say about a clicked location.

use serde::{Deserialize, Serialize};

use crate::constants::{LAYER_POINT_RADIUS_DEG, VULNERABILITY_RADIUS_DEG};
use crate::geo::{find_nearby, GeoPoint, Located};

const MAX_ALERTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub lat: f64,
    pub lon: f64,
    pub temperature_c: f64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub reason: Option<String>,
    pub cooling_potential: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityZone {
    pub lat: f64,
    pub lon: f64,
    pub vulnerability_score: f64,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub factors: Option<String>,
}

macro_rules! impl_located {
    ($($ty:ty),*) => {
        $(impl Located for $ty {
            fn location(&self) -> GeoPoint {
                GeoPoint::new_unchecked(self.lat, self.lon)
            }
        })*
    };
}

impl_located!(Hotspot, Suggestion, VulnerabilityZone);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataLayer {
    Hotspots,
    Suggestions,
    Vulnerability,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerData {
    #[serde(default)]
    pub hotspots: Vec<Hotspot>,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
    #[serde(default)]
    pub vulnerability: Vec<VulnerabilityZone>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VulnerabilityLevel {
    Low,
    Medium,
    High,
}

impl VulnerabilityLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.7 {
            VulnerabilityLevel::High
        } else if score >= 0.4 {
            VulnerabilityLevel::Medium
        } else {
            VulnerabilityLevel::Low
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            VulnerabilityLevel::Low => "Low",
            VulnerabilityLevel::Medium => "Medium",
            VulnerabilityLevel::High => "High",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerInfo {
    pub layer: DataLayer,
    pub label: String,
    pub details: String,
}

/// What the active layer has to say about `location`, if anything.
pub fn layer_info(location: GeoPoint, layer: DataLayer, data: &LayerData) -> Option<LayerInfo> {
    match layer {
        DataLayer::Hotspots => {
            let hot = find_nearby(&data.hotspots, location, LAYER_POINT_RADIUS_DEG)?;
            Some(LayerInfo {
                layer,
                label: format!("RED ZONE: {}°C", hot.temperature_c),
                details: hot
                    .description
                    .clone()
                    .unwrap_or_else(|| "Extreme heat area".to_string()),
            })
        }
        DataLayer::Suggestions => {
            let s = find_nearby(&data.suggestions, location, LAYER_POINT_RADIUS_DEG)?;
            Some(LayerInfo {
                layer,
                label: "Suggested Planting Location".to_string(),
                details: format!(
                    "{} (−{}°C)",
                    s.reason.as_deref().unwrap_or(""),
                    s.cooling_potential
                ),
            })
        }
        DataLayer::Vulnerability => {
            let zone = find_nearby(&data.vulnerability, location, VULNERABILITY_RADIUS_DEG)?;
            let level = VulnerabilityLevel::from_score(zone.vulnerability_score);
            Some(LayerInfo {
                layer,
                label: format!(
                    "{} ({})",
                    zone.label.as_deref().unwrap_or("Vulnerable Area"),
                    level.as_str()
                ),
                details: zone.factors.clone().unwrap_or_default(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatAlert {
    pub temperature_c: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotspotSummary {
    pub average_c: Option<f64>,
    pub peak_c: Option<f64>,
    pub alerts: Vec<HeatAlert>,
}

/// Average and peak over all hotspots, plus alerts for the first few
/// hotspots ordered hottest first.
pub fn summarize_hotspots(hotspots: &[Hotspot]) -> HotspotSummary {
    let temps: Vec<f64> = hotspots.iter().map(|h| h.temperature_c).collect();
    let average_c = (!temps.is_empty()).then(|| temps.iter().sum::<f64>() / temps.len() as f64);
    let peak_c = temps.iter().copied().reduce(f64::max);

    let mut head: Vec<&Hotspot> = hotspots.iter().take(MAX_ALERTS).collect();
    head.sort_by(|a, b| b.temperature_c.total_cmp(&a.temperature_c));
    let alerts = head
        .into_iter()
        .map(|h| HeatAlert {
            temperature_c: h.temperature_c.round(),
            label: format!("Hotspot {:.4}, {:.4}", h.lat, h.lon),
        })
        .collect();

    HotspotSummary {
        average_c,
        peak_c,
        alerts,
    }
}
