use crate::error::{FoodWasteError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "food_waste.toml";
pub const DATABASE_ENV: &str = "FOOD_WASTE_DB";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub paths: PathsConfig,
    pub cleaning: CleaningConfig,
    pub loader: LoaderConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: PathBuf::from("food_waste.db"),
        }
    }
}

/// Where each stage reads and writes its artifacts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub raw_dir: PathBuf,
    pub clean_dir: PathBuf,
    pub reject_dir: PathBuf,
    pub report_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            raw_dir: PathBuf::from("."),
            clean_dir: PathBuf::from("clean"),
            reject_dir: PathBuf::from("rejects"),
            report_dir: PathBuf::from("reports"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// What happens to rows that fail a cross-entity reference check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectPolicy {
    /// Written to the reject artifact and still kept in the cleaned file
    #[default]
    KeepInCleaned,
    /// Written to the reject artifact and removed from the cleaned file
    ExcludeFromCleaned,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub reject_policy: RejectPolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub progress: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig { progress: true }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// TOML query catalog replacing the built-in one
    pub catalog: Option<PathBuf>,
}

impl Config {
    /// Load from `path`, or from `food_waste.toml` when present, else defaults.
    /// `FOOD_WASTE_DB` overrides the database path.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Config::default(),
        };

        if let Ok(db) = std::env::var(DATABASE_ENV) {
            if !db.trim().is_empty() {
                config.database.path = PathBuf::from(db);
            }
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FoodWasteError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = Config::from_toml("").unwrap();

        assert_eq!(config.database.path, PathBuf::from("food_waste.db"));
        assert_eq!(config.paths.clean_dir, PathBuf::from("clean"));
        assert_eq!(config.cleaning.reject_policy, RejectPolicy::KeepInCleaned);
        assert!(config.loader.progress);
        assert!(config.dashboard.catalog.is_none());
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_toml(
            r#"
            [database]
            path = "/tmp/food.db"

            [paths]
            raw_dir = "data/raw"

            [cleaning]
            reject_policy = "exclude_from_cleaned"

            [loader]
            progress = false
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/food.db"));
        assert_eq!(config.paths.raw_dir, PathBuf::from("data/raw"));
        assert_eq!(config.paths.reject_dir, PathBuf::from("rejects"));
        assert_eq!(config.cleaning.reject_policy, RejectPolicy::ExcludeFromCleaned);
        assert!(!config.loader.progress);
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        let result = Config::from_toml("[cleaning]\nreject_policy = \"sometimes\"\n");
        assert!(matches!(result, Err(FoodWasteError::Toml(_))));
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let result = Config::from_file(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(FoodWasteError::Config(_))));
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::from_toml(include_str!("../food_waste.toml.example")).unwrap();
        assert_eq!(config.cleaning.reject_policy, RejectPolicy::KeepInCleaned);
        assert!(config.loader.progress);
        assert!(config.dashboard.catalog.is_none());
    }
}
