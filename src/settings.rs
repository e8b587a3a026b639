use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_BACKEND_URL, DEFAULT_FOV_HALF_WIDTH_DEG, DEFAULT_MAX_RANGE_M, DEFAULT_PORT,
    DEFAULT_STREET_VIEW_FOV,
};
use crate::geo::FovParams;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub backend_url: String,
    pub port: u16,
    pub fov_half_width: f64,
    pub max_range_m: f64,
    pub street_view_fov: f64,
    // Never echoed back over the API
    #[serde(skip_serializing)]
    pub google_maps_api_key: Option<String>,
    #[serde(default)]
    pub save_on_exit: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            port: DEFAULT_PORT,
            fov_half_width: DEFAULT_FOV_HALF_WIDTH_DEG,
            max_range_m: DEFAULT_MAX_RANGE_M,
            street_view_fov: DEFAULT_STREET_VIEW_FOV,
            google_maps_api_key: None,
            save_on_exit: true,
        }
    }
}

impl Settings {
    /// Settings file, then environment overrides.
    pub fn load() -> Result<Self> {
        let mut settings = Self::load_from(&Self::config_path())?;
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Settings::default());
        }
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        Ok(Self::parse(&content))
    }

    /// Parses `key = value` lines. Unknown keys and unparsable values are ignored.
    pub fn parse(content: &str) -> Self {
        let mut settings = Settings::default();
        let mut config_map = HashMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                config_map.insert(key.trim().to_string(), value.trim().trim_matches('"').to_string());
            }
        }

        if let Some(url) = config_map.get("backend_url") {
            if !url.is_empty() {
                settings.backend_url = url.trim_end_matches('/').to_string();
            }
        }
        if let Some(port) = config_map.get("port").and_then(|v| v.parse::<u16>().ok()) {
            settings.port = port;
        }
        if let Some(width) = config_map.get("fov_half_width").and_then(|v| v.parse::<f64>().ok()) {
            if width > 0.0 && width <= 180.0 {
                settings.fov_half_width = width;
            }
        }
        if let Some(range) = config_map.get("max_range_m").and_then(|v| v.parse::<f64>().ok()) {
            if range > 0.0 {
                settings.max_range_m = range;
            }
        }
        if let Some(fov) = config_map.get("street_view_fov").and_then(|v| v.parse::<f64>().ok()) {
            settings.street_view_fov = fov;
        }
        if let Some(key) = config_map.get("google_maps_api_key") {
            if !key.is_empty() {
                settings.google_maps_api_key = Some(key.clone());
            }
        }
        if let Some(save) = config_map.get("save_on_exit").and_then(|v| v.parse::<bool>().ok()) {
            settings.save_on_exit = save;
        }

        settings
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("RELEAF_BACKEND_URL").filter(|v| !v.is_empty()) {
            self.backend_url = url.trim_end_matches('/').to_string();
        }
        if let Some(port) = lookup("RELEAF_PORT").and_then(|v| v.parse::<u16>().ok()) {
            self.port = port;
        }
        if let Some(key) = lookup("GOOGLE_MAPS_API_KEY").filter(|v| !v.is_empty()) {
            self.google_maps_api_key = Some(key);
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Creating config directory")?;
        }
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        let mut content = String::new();
        content.push_str("# ReLeaf Configuration File\n");
        content.push_str(&format!("backend_url = \"{}\"\n", self.backend_url));
        content.push_str(&format!("port = {}\n", self.port));
        content.push_str(&format!("fov_half_width = {}\n", self.fov_half_width));
        content.push_str(&format!("max_range_m = {}\n", self.max_range_m));
        content.push_str(&format!("street_view_fov = {}\n", self.street_view_fov));
        if let Some(ref key) = self.google_maps_api_key {
            content.push_str(&format!("google_maps_api_key = \"{}\"\n", key));
        }
        content.push_str(&format!("save_on_exit = {}\n", self.save_on_exit));

        std::fs::write(config_path, content).context("Failed to write to config file")?;
        Ok(())
    }

    pub fn fov(&self) -> FovParams {
        FovParams {
            half_width_deg: self.fov_half_width,
            max_range_m: self.max_range_m,
        }
    }

    pub fn config_path() -> PathBuf {
        crate::utils::get_config_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_known_keys() {
        let settings = Settings::parse(
            r#"
# comment
backend_url = "http://api.example:9000/"
port = 4010
fov_half_width = 45
max_range_m = 80.5
street_view_fov = 70
google_maps_api_key = "abc"
save_on_exit = false
unknown = 1
"#,
        );
        assert_eq!(settings.backend_url, "http://api.example:9000");
        assert_eq!(settings.port, 4010);
        assert_eq!(settings.fov_half_width, 45.0);
        assert_eq!(settings.max_range_m, 80.5);
        assert_eq!(settings.street_view_fov, 70.0);
        assert_eq!(settings.google_maps_api_key.as_deref(), Some("abc"));
        assert!(!settings.save_on_exit);
    }

    #[test]
    fn parse_falls_back_on_bad_values() {
        let settings = Settings::parse("port = lots\nfov_half_width = 400\nmax_range_m = -3");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut settings = Settings::parse("port = 4010");
        settings.apply_env(|key| match key {
            "RELEAF_PORT" => Some("5000".to_string()),
            "RELEAF_BACKEND_URL" => Some("http://backend:8000/".to_string()),
            _ => None,
        });
        assert_eq!(settings.port, 5000);
        assert_eq!(settings.backend_url, "http://backend:8000");
        assert_eq!(settings.google_maps_api_key, None);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("releaf.ini");
        let settings = Settings {
            port: 3555,
            max_range_m: 75.0,
            google_maps_api_key: Some("key".to_string()),
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Settings::load_from(&dir.path().join("none.ini")).unwrap();
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn api_key_is_not_serialized() {
        let settings = Settings {
            google_maps_api_key: Some("secret".to_string()),
            ..Settings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("secret"));
    }
}
