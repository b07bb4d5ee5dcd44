//! Configuration file support.
//!
//! Parses `mdpane.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories. CLI flags take
//! precedence over config file values; that merge happens in the render
//! command, not here.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use mdpane_renderer::Theme;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mdpane.toml";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    /// Preview rendering configuration.
    pub(crate) preview: PreviewConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub(crate) config_path: Option<PathBuf>,
}

/// Preview rendering configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PreviewConfig {
    /// Stylesheet path, resolved relative to the config file after loading.
    pub(crate) stylesheet: Option<PathBuf>,
    /// Theme name (`light` or `dark`).
    pub(crate) theme: Option<String>,
    /// Code block text color override.
    pub(crate) pre_color: Option<String>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

impl Config {
    /// Load configuration from file.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mdpane.toml` in current directory and
    /// parents, falling back to defaults when none is found.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub(crate) fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)
        } else {
            Ok(Self::default())
        }
    }

    /// Theme parsed from `preview.theme`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the key when the value is
    /// not a known theme name.
    pub(crate) fn theme(&self) -> Result<Option<Theme>, ConfigError> {
        match &self.preview.theme {
            Some(name) => {
                let theme = Theme::parse(name).ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "preview.theme must be \"light\" or \"dark\", got \"{name}\""
                    ))
                })?;
                Ok(Some(theme))
            }
            None => Ok(None),
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        // Validate configuration after loading and resolution
        config.validate()?;

        Ok(config)
    }

    /// Resolve relative paths against the config file's directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        if let Some(stylesheet) = &self.preview.stylesheet
            && stylesheet.is_relative()
        {
            self.preview.stylesheet = Some(config_dir.join(stylesheet));
        }
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigError> {
        self.theme()?;

        if let Some(pre_color) = &self.preview.pre_color
            && pre_color.is_empty()
        {
            return Err(ConfigError::Validation(
                "preview.pre_color cannot be empty".to_owned(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.preview.stylesheet.is_none());
        assert!(config.preview.theme.is_none());
        assert!(config.preview.pre_color.is_none());
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let toml = "";
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.preview.theme.is_none());
    }

    #[test]
    fn test_parse_preview_config() {
        let toml = r##"
[preview]
stylesheet = "styles/preview.css"
theme = "dark"
pre_color = "#e6edf3"
"##;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.preview.stylesheet,
            Some(PathBuf::from("styles/preview.css"))
        );
        assert_eq!(config.preview.theme.as_deref(), Some("dark"));
        assert_eq!(config.preview.pre_color.as_deref(), Some("#e6edf3"));
    }

    #[test]
    fn test_theme_accessor() {
        let toml = r#"
[preview]
theme = "dark"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.theme().unwrap(), Some(Theme::Dark));
    }

    #[test]
    fn test_theme_validation_names_key() {
        let toml = r#"
[preview]
theme = "sepia"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let err = config.theme().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("preview.theme"), "got: {message}");
        assert!(message.contains("sepia"), "got: {message}");
    }

    #[test]
    fn test_load_explicit_path_not_found() {
        let err = Config::load(Some(Path::new("/nonexistent/mdpane.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_from_file_resolves_stylesheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdpane.toml");
        std::fs::write(&path, "[preview]\nstylesheet = \"preview.css\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(
            config.preview.stylesheet,
            Some(dir.path().join("preview.css"))
        );
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_from_file_keeps_absolute_stylesheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdpane.toml");
        std::fs::write(&path, "[preview]\nstylesheet = \"/etc/preview.css\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(
            config.preview.stylesheet,
            Some(PathBuf::from("/etc/preview.css"))
        );
    }

    #[test]
    fn test_load_rejects_invalid_theme() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdpane.toml");
        std::fs::write(&path, "[preview]\ntheme = \"solarized\"\n").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("preview.theme"));
    }

    #[test]
    fn test_load_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdpane.toml");
        std::fs::write(&path, "[preview\ntheme = \"light\"\n").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
