use std::path::PathBuf;

const APP_DIR_NAME: &str = "ReLeaf";

/// Returns the cross-platform directory for application data
pub fn get_app_data_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        let home_dir = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let mut path = PathBuf::from(home_dir);
        path.push("Library");
        path.push("Application Support");
        path.push(APP_DIR_NAME);
        path
    } else if cfg!(target_os = "windows") {
        if let Ok(appdata) = std::env::var("APPDATA") {
            PathBuf::from(appdata).join(APP_DIR_NAME)
        } else {
            PathBuf::from(".").join(APP_DIR_NAME)
        }
    } else if let Ok(xdg_data_home) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data_home).join(APP_DIR_NAME)
    } else {
        // Fallback to ~/.local/share/ReLeaf
        let home_dir = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let mut path = PathBuf::from(home_dir);
        path.push(".local");
        path.push("share");
        path.push(APP_DIR_NAME);
        path
    }
}

/// Ensures the directory exists, creating it if necessary
pub fn ensure_directory_exists(path: &PathBuf) -> Result<(), std::io::Error> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Returns the path to the application configuration file
pub fn get_config_path() -> PathBuf {
    get_app_data_dir().join("releaf.ini")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_lives_in_app_dir() {
        let config = get_config_path();
        assert_eq!(config.file_name().and_then(|n| n.to_str()), Some("releaf.ini"));
        assert_eq!(config.parent(), Some(get_app_data_dir().as_path()));
    }

    #[test]
    fn ensure_directory_exists_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_directory_exists(&nested).unwrap();
        assert!(nested.is_dir());
        // Second call is a no-op
        ensure_directory_exists(&nested).unwrap();
    }
}
