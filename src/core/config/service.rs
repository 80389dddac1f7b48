use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::AppConfig;
use super::validation::validate_config;
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
    explicit_path: Option<PathBuf>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self {
            paths,
            explicit_path: None,
        }
    }

    /// Reads configuration from `path` regardless of environment and data directories.
    pub fn with_path(paths: Arc<AppPaths>, path: PathBuf) -> Self {
        Self {
            paths,
            explicit_path: Some(path),
        }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Some(path) = &self.explicit_path {
            return path.clone();
        }

        if let Ok(path) = env::var("TOURGUIDE_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn load_config(&self) -> Result<Value, ApiError> {
        load_yaml_file(&self.config_path())
    }

    /// Loads, validates and types the configuration. Called once at startup.
    pub fn load_app_config(&self) -> Result<AppConfig, ApiError> {
        let raw = self.load_config()?;
        validate_config(&raw)?;
        serde_json::from_value::<AppConfig>(raw).map_err(|err| {
            ApiError::BadRequest(format!("Invalid config: {}", err))
        })
    }
}

fn load_yaml_file(path: &Path) -> Result<Value, ApiError> {
    if !path.exists() {
        tracing::info!("No config file at {}, using defaults", path.display());
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(ApiError::internal)?;
    if contents.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let value = serde_yaml::from_str::<Value>(&contents).map_err(|err| {
        ApiError::BadRequest(format!(
            "Invalid config file {}: {}",
            path.display(),
            err
        ))
    })?;

    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(ApiError::BadRequest(format!(
            "Invalid config file {}: top level must be a mapping",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_for(dir: &tempfile::TempDir, yaml: Option<&str>) -> ConfigService {
        let paths = Arc::new(AppPaths::from_dirs(
            dir.path().to_path_buf(),
            dir.path().to_path_buf(),
        ));
        let path = dir.path().join("config.yml");
        if let Some(contents) = yaml {
            fs::write(&path, contents).expect("write config");
        }
        ConfigService::with_path(paths, path)
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = service_for(&dir, None).load_app_config().expect("defaults");
        assert_eq!(config.images.relevance_threshold, 60);
        assert_eq!(config.images.max_images_per_turn, 5);
        assert_eq!(config.history.window, 10);
        assert!(config.prompts.system_prompt.contains("{schema}"));
    }

    #[test]
    fn threshold_is_overridable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let yaml = "images:\n  relevance_threshold: 75\n  max_images_per_turn: 3\n";
        let config = service_for(&dir, Some(yaml)).load_app_config().expect("config");
        assert_eq!(config.images.relevance_threshold, 75);
        assert_eq!(config.images.max_images_per_turn, 3);
        assert_eq!(config.completion.max_tokens, 2048);
    }

    #[test]
    fn invalid_threshold_fails_fast() {
        let dir = tempfile::tempdir().expect("tempdir");
        let yaml = "images:\n  relevance_threshold: 250\n";
        assert!(service_for(&dir, Some(yaml)).load_app_config().is_err());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let yaml = "images: [unclosed\n";
        assert!(service_for(&dir, Some(yaml)).load_config().is_err());
    }

    #[test]
    fn scalar_top_level_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(service_for(&dir, Some("just a string\n")).load_config().is_err());
    }
}
