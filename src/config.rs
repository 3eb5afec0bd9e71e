// ⚙️ Configuration - directories, bind address, time basis, locale
// Loaded from an optional TOML file, then overridden by EXPLORER_* env vars

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ============================================================================
// TIME BASIS
// ============================================================================

/// Which calendar the hour/weekday/date of a timestamp is read in.
///
/// Naive timestamps ("2024-01-01T10:00") are wall-clock values and are taken
/// as-is. Timestamps carrying an offset and epoch numbers are converted into
/// this basis first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBasis {
    #[default]
    Utc,
    Local,
}

impl FromStr for TimeBasis {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "utc" => Ok(TimeBasis::Utc),
            "local" => Ok(TimeBasis::Local),
            other => Err(format!("unknown time basis: {}", other)),
        }
    }
}

// ============================================================================
// LOCALE
// ============================================================================

/// Language of chart titles and weekday labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Fr,
}

impl Locale {
    /// Weekday names, Monday first
    pub fn weekday_names(&self) -> [&'static str; 7] {
        match self {
            Locale::En => [
                "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
            ],
            Locale::Fr => [
                "Lundi", "Mardi", "Mercredi", "Jeudi", "Vendredi", "Samedi", "Dimanche",
            ],
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "fr" => Ok(Locale::Fr),
            other => Err(format!("unknown locale: {}", other)),
        }
    }
}

// ============================================================================
// EXPLORER CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Standardized datasets (*.json)
    pub data_dir: PathBuf,
    /// Uploaded spreadsheets
    pub upload_dir: PathBuf,
    /// Mapping patterns (*.json)
    pub patterns_dir: PathBuf,
    /// Front-end files served at /
    pub static_dir: PathBuf,
    pub bind_addr: String,
    pub time_basis: TimeBasis,
    pub locale: Locale,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        ExplorerConfig {
            data_dir: PathBuf::from("datas"),
            upload_dir: PathBuf::from("uploads"),
            patterns_dir: PathBuf::from("static/mapping/patterns"),
            static_dir: PathBuf::from("static"),
            bind_addr: "0.0.0.0:5000".to_string(),
            time_basis: TimeBasis::Utc,
            locale: Locale::En,
        }
    }
}

impl ExplorerConfig {
    /// Read a TOML config file. Missing keys keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
    }

    /// Defaults, then `EXPLORER_CONFIG` file (if set), then env overrides
    pub fn load() -> Result<Self> {
        let base = match env::var("EXPLORER_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        base.with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from a key lookup (env in production, a map in tests)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("EXPLORER_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("EXPLORER_UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("EXPLORER_PATTERNS_DIR") {
            self.patterns_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("EXPLORER_STATIC_DIR") {
            self.static_dir = PathBuf::from(dir);
        }
        if let Some(addr) = lookup("EXPLORER_BIND") {
            self.bind_addr = addr;
        }
        if let Some(basis) = lookup("EXPLORER_TIME_BASIS") {
            self.time_basis = basis.parse().map_err(anyhow::Error::msg)?;
        }
        if let Some(locale) = lookup("EXPLORER_LOCALE") {
            self.locale = locale.parse().map_err(anyhow::Error::msg)?;
        }
        Ok(self)
    }

    /// Create data and upload directories if needed
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.data_dir, &self.upload_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ExplorerConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("datas"));
        assert_eq!(config.bind_addr, "0.0.0.0:5000");
        assert_eq!(config.time_basis, TimeBasis::Utc);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ExplorerConfig = toml::from_str(
            r#"
            data_dir = "/srv/datasets"
            time_basis = "local"
            locale = "fr"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/datasets"));
        assert_eq!(config.time_basis, TimeBasis::Local);
        assert_eq!(config.locale, Locale::Fr);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("EXPLORER_BIND", "127.0.0.1:8080"),
            ("EXPLORER_TIME_BASIS", "LOCAL"),
        ]
        .into_iter()
        .collect();

        let config = ExplorerConfig::default()
            .with_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.time_basis, TimeBasis::Local);
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let result = ExplorerConfig::default()
            .with_overrides(|k| (k == "EXPLORER_LOCALE").then(|| "klingon".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_french_weekdays_start_monday() {
        let names = Locale::Fr.weekday_names();
        assert_eq!(names[0], "Lundi");
        assert_eq!(names[6], "Dimanche");
    }
}
