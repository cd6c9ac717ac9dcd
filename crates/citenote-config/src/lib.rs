use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Scale applied to image annotations when none is configured.
pub const DEFAULT_IMAGE_SCALE: f64 = 1.25;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid value in config file at {config_path}: {message}")]
    ConfigValueError {
        config_path: PathBuf,
        message: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory relative document paths are resolved against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents_path: Option<PathBuf>,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Multiplier from annotation size in CSS pixels to inserted image size
    pub image_scale: f64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            image_scale: DEFAULT_IMAGE_SCALE,
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        let scale = config.import.image_scale;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ConfigError::ConfigValueError {
                config_path: config_path.to_path_buf(),
                message: format!("import.image_scale must be positive, got {scale}"),
            });
        }

        config.documents_path = config
            .documents_path
            .map(|path| Self::expand_path(&path).unwrap_or(path));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/citenote");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// `path` as given when absolute, otherwise under `documents_path` if
    /// one is configured.
    pub fn resolve_document(&self, path: &Path) -> PathBuf {
        match &self.documents_path {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::env;
    use tempfile::TempDir;

    fn write_config(content: &str) -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, content).unwrap();
        (temp_dir, config_file)
    }

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/citenote/config.toml"));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let (_dir, config_file) = write_config("");

        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.import.image_scale, DEFAULT_IMAGE_SCALE);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested/config.toml");
        let test_config = Config {
            documents_path: Some(PathBuf::from("/tmp/test-notes")),
            import: ImportConfig { image_scale: 2.0 },
        };

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_config_with_env_var_in_toml() {
        unsafe {
            env::set_var("CITENOTE_TEST_ROOT", "/custom/notes");
        }

        let (_dir, config_file) = write_config(
            r#"
documents_path = "$CITENOTE_TEST_ROOT/papers"
"#,
        );
        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(
            config.documents_path,
            Some(PathBuf::from("/custom/notes/papers"))
        );

        unsafe {
            env::remove_var("CITENOTE_TEST_ROOT");
        }
    }

    #[test]
    fn test_config_with_tilde_in_toml() {
        let (_dir, config_file) = write_config(
            r#"
documents_path = "~/papers"
"#,
        );
        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        let path = config.documents_path.unwrap();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.to_string_lossy().ends_with("papers"));
    }

    #[rstest]
    #[case::zero("0.0")]
    #[case::negative("-1.5")]
    fn test_non_positive_scale_is_rejected(#[case] scale: &str) {
        let (_dir, config_file) = write_config(&format!("[import]\nimage_scale = {scale}\n"));

        let result = Config::load_from_path(&config_file);

        assert!(matches!(result, Err(ConfigError::ConfigValueError { .. })));
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let (_dir, config_file) = write_config("documents_path = [");

        let result = Config::load_from_path(&config_file);

        assert!(matches!(result, Err(ConfigError::ConfigParseError { .. })));
    }

    #[test]
    fn test_resolve_document() {
        let config = Config {
            documents_path: Some(PathBuf::from("/notes")),
            ..Config::default()
        };

        assert_eq!(
            config.resolve_document(Path::new("a.json")),
            PathBuf::from("/notes/a.json")
        );
        assert_eq!(
            config.resolve_document(Path::new("/elsewhere/b.json")),
            PathBuf::from("/elsewhere/b.json")
        );
        assert_eq!(
            Config::default().resolve_document(Path::new("c.json")),
            PathBuf::from("c.json")
        );
    }
}
