use crate::active_section::DetectionBand;
use crate::preferences::DEFAULT_NAMESPACE;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const PREFERENCES_FILENAME: &str = "preferences.json";
const APP_NAME: &str = "guidenav";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Prefix for every preference key
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Lines kept above a heading after jumping to it
    #[serde(default = "default_scroll_margin")]
    pub scroll_margin: u16,

    #[serde(default)]
    pub band_top_pct: f64,

    #[serde(default = "default_band_bottom_pct")]
    pub band_bottom_pct: f64,

    /// Narrower terminals get the drawer instead of the sidebar
    #[serde(default = "default_sidebar_min_width")]
    pub sidebar_min_width: u16,

    #[serde(default = "default_sidebar_width")]
    pub sidebar_width: u16,

    #[serde(default = "default_true")]
    pub smooth_scroll: bool,
}

fn default_true() -> bool {
    true
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_scroll_margin() -> u16 {
    1
}

fn default_band_bottom_pct() -> f64 {
    60.0
}

fn default_sidebar_min_width() -> u16 {
    100
}

fn default_sidebar_width() -> u16 {
    32
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            namespace: default_namespace(),
            scroll_margin: default_scroll_margin(),
            band_top_pct: 0.0,
            band_bottom_pct: default_band_bottom_pct(),
            sidebar_min_width: default_sidebar_min_width(),
            sidebar_width: default_sidebar_width(),
            smooth_scroll: true,
        }
    }
}

impl Settings {
    pub fn detection_band(&self) -> DetectionBand {
        DetectionBand::new(self.band_top_pct, self.band_bottom_pct)
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

pub fn default_preferences_path() -> Option<PathBuf> {
    dirs::data_dir().map(|data| data.join(APP_NAME).join(PREFERENCES_FILENAME))
}

/// Load settings from `path`, or from the platform config dir.
/// A missing default config is created with defaults.
pub fn load_settings(path: Option<&Path>) {
    if let Some(path) = path {
        load_settings_from_path(path);
        return;
    }

    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return;
    };
    if path.exists() {
        load_settings_from_path(&path);
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        if let Ok(settings) = SETTINGS.read() {
            save_settings_to_file(&settings, &path);
        }
    }
}

fn load_settings_from_path(path: &Path) {
    match fs::read_to_string(path) {
        Ok(content) => match parse_settings(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }

                if let Ok(mut global) = SETTINGS.write() {
                    *global = settings;
                }
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
        }
    }
}

pub fn parse_settings(content: &str) -> Result<Settings, serde_yaml::Error> {
    serde_yaml::from_str::<Settings>(content)
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let content = generate_settings_yaml(settings);

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::new();

    content.push_str(&format!("version: {}\n", settings.version));
    content.push_str("# Prefix for saved-guide and rating keys in preferences.json\n");
    content.push_str(&format!("namespace: \"{}\"\n", settings.namespace));
    content.push_str(&format!("scroll_margin: {}\n", settings.scroll_margin));
    content.push_str("# Share of the viewport ignored at the top/bottom when picking the active section\n");
    content.push_str(&format!("band_top_pct: {:?}\n", settings.band_top_pct));
    content.push_str(&format!("band_bottom_pct: {:?}\n", settings.band_bottom_pct));
    content.push_str(&format!("sidebar_min_width: {}\n", settings.sidebar_min_width));
    content.push_str(&format!("sidebar_width: {}\n", settings.sidebar_width));
    content.push_str(&format!("smooth_scroll: {}\n", settings.smooth_scroll));

    content
}

// Public API for accessing settings

pub fn current() -> Settings {
    SETTINGS.read().map(|s| s.clone()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let settings = parse_settings("scroll_margin: 3\n").unwrap();
        assert_eq!(settings.scroll_margin, 3);
        assert_eq!(settings.namespace, "wc26");
        assert_eq!(settings.band_bottom_pct, 60.0);
        assert!(settings.smooth_scroll);
    }

    #[test]
    fn test_generated_yaml_parses_back() {
        let settings = Settings {
            band_top_pct: 10.0,
            sidebar_width: 40,
            smooth_scroll: false,
            ..Settings::default()
        };
        let parsed = parse_settings(&generate_settings_yaml(&settings)).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_detection_band_from_settings() {
        let settings = Settings {
            band_top_pct: 10.0,
            band_bottom_pct: 50.0,
            ..Settings::default()
        };
        assert_eq!(settings.detection_band(), DetectionBand::new(10.0, 50.0));
    }

    #[test]
    #[serial]
    fn test_load_from_explicit_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "version: 0\nsidebar_min_width: 140\nnamespace: test\n").unwrap();

        load_settings(Some(&path));
        let loaded = current();
        assert_eq!(loaded.sidebar_min_width, 140);
        assert_eq!(loaded.namespace, "test");

        // Old version got migrated and rewritten
        let rewritten = parse_settings(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(rewritten.version, CURRENT_VERSION);

        *SETTINGS.write().unwrap() = Settings::default();
        assert_eq!(current().sidebar_min_width, 100);
    }

    #[test]
    #[serial]
    fn test_broken_file_keeps_current_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "scroll_margin: [not, a, number]\n").unwrap();

        let before = current();
        load_settings(Some(&path));
        assert_eq!(current(), before);
    }
}
