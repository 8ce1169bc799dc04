//! Configuration management
//!
//! An optional YAML file tunes the parser limits, the script layout and the
//! accepted directives. Every field has a default.

use crate::generator::RenderOptions;
use crate::parser::{DEFAULT_MAX_DEPTH, ParserConfig};
use crate::pipeline::DirectiveRegistry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A file could not be read
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// File that failed
        path: PathBuf,
        /// Cause
        source: std::io::Error,
    },

    /// A file is not valid YAML for its schema
    #[error("invalid {}: {source}", path.display())]
    Parse {
        /// File that failed
        path: PathBuf,
        /// Cause
        source: serde_yaml::Error,
    },
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Log level
    pub log_level: String,
    /// Maximum nesting depth accepted by the parser
    pub max_depth: usize,
    /// Spaces per indentation level in generated scripts
    pub indent: usize,
    /// Extra directive definitions merged over the built-in table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directives: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            indent: RenderOptions::default().indent,
            directives: None,
        }
    }
}

impl Config {
    /// Loads a configuration file.
    ///
    /// A relative `directives` path is resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read(path)?;
        let mut config: Self = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(directives) = &config.directives
            && directives.is_relative()
            && let Some(base) = path.parent()
        {
            config.directives = Some(base.join(directives));
        }
        tracing::debug!(path = %path.display(), ?config, "Loaded configuration");
        Ok(config)
    }

    /// Parser settings, with the directive file merged over the built-ins.
    ///
    /// # Errors
    ///
    /// Returns an error if the directive file cannot be read or parsed.
    pub fn parser_config(&self) -> Result<ParserConfig, ConfigError> {
        let registry = match &self.directives {
            Some(path) => {
                let extra = DirectiveRegistry::from_yaml(&read(path)?).map_err(|source| {
                    ConfigError::Parse {
                        path: path.clone(),
                        source,
                    }
                })?;
                DirectiveRegistry::builtin().merged(extra)
            }
            None => DirectiveRegistry::builtin(),
        };
        Ok(ParserConfig {
            max_depth: self.max_depth,
            registry,
        })
    }

    /// Script layout settings
    #[must_use]
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            indent: self.indent,
        }
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::DirectiveSection;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.max_depth, 64);
        assert_eq!(config.render_options(), RenderOptions { indent: 4 });
    }

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("yamline.yaml");
        std::fs::write(&path, "indent: 2\nmaxDepth: 16\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.indent, 2);
        assert_eq!(config.max_depth, 16);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.parser_config().unwrap().max_depth, 16);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("yamline.yaml");
        std::fs::write(&path, "indentation: 2\n").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/yamline.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/yamline.yaml"));
    }

    #[test]
    fn test_directive_file_is_merged() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("directives.yaml"),
            "options:\n  - name: lock\n    required: [resource]\n",
        )
        .unwrap();
        let path = dir.path().join("yamline.yaml");
        std::fs::write(&path, "directives: directives.yaml\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.directives, Some(dir.path().join("directives.yaml")));

        let parser = config.parser_config().unwrap();
        assert!(parser.registry.get(DirectiveSection::Options, "lock").is_some());
        assert!(parser.registry.get(DirectiveSection::Options, "timeout").is_some());
    }
}
