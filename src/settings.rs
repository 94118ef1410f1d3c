use crate::gate::WeekStart;
use serde::Deserialize;
use std::fs;

const SETTINGS_FILENAME: &str = "settings.json";

/// Server configuration, read from settings.json in the working directory.
/// Every field has a default, so a missing file means stock settings and a
/// partial file overrides only what it names.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind: String,
    pub port: u16,
    pub save_file: String,
    pub week_start: WeekStart,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bind: "0.0.0.0".to_string(),
            port: 3000,
            save_file: "tracker.redb".to_string(),
            week_start: WeekStart::Monday,
        }
    }
}

impl Settings {
    pub fn load() -> Settings {
        match fs::read_to_string(SETTINGS_FILENAME) {
            Ok(content) => {
                serde_json::from_str(&content).expect("settings.json is not valid JSON")
            }
            Err(_) => Settings::default(),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "port": 8080, "week_start": "sunday" }"#).unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.week_start, WeekStart::Sunday);
        assert_eq!(settings.bind, "0.0.0.0");
        assert_eq!(settings.save_file, "tracker.redb");
    }

    #[test]
    fn empty_object_is_stock_configuration() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.week_start, WeekStart::Monday);
    }
}
