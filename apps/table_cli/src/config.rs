use std::{fs, path::Path};

use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub default_entry: String,
    pub default_field: String,
    pub protect_header_row: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/fields.db".into(),
            default_entry: "default".into(),
            default_field: "table".into(),
            protect_header_row: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    database_url: Option<String>,
    default_entry: Option<String>,
    default_field: Option<String>,
    protect_header_row: Option<bool>,
}

/// Defaults, then `config_path` if it exists, then the environment.
pub fn load_settings(config_path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(config_path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file_settings(&mut settings, file_cfg),
            Err(error) => warn!(
                path = %config_path.display(),
                %error,
                "ignoring unreadable config file"
            ),
        }
    }

    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    settings
}

fn apply_file_settings(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file_cfg.default_entry {
        settings.default_entry = v;
    }
    if let Some(v) = file_cfg.default_field {
        settings.default_field = v;
    }
    if let Some(v) = file_cfg.protect_header_row {
        settings.protect_header_row = v;
    }
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("TABLE_DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = lookup("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = lookup("APP__DEFAULT_ENTRY") {
        settings.default_entry = v;
    }
    if let Some(v) = lookup("APP__DEFAULT_FIELD") {
        settings.default_field = v;
    }

    if let Some(v) = lookup("APP__PROTECT_HEADER_ROW") {
        match v.trim().parse::<bool>() {
            Ok(parsed) => settings.protect_header_row = parsed,
            Err(_) => warn!(value = %v, "APP__PROTECT_HEADER_ROW must be true or false"),
        }
    }
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        return format!("sqlite://{}", path.replace('\\', "/"));
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
