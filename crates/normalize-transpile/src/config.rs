//! Conversion configuration.
//!
//! Loaded from `.normalize/transpile.toml` under the project root:
//! ```toml
//! mode = "flexible"
//!
//! [naming]
//! interface_prefix = "I"
//! utility_class = "Util"
//!
//! [packages]
//! root = "com.acme"
//!
//! [pipeline]
//! parallel = true
//!
//! [output]
//! indent = 4
//! ```

use normalize_transpile_report::Mode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Error loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Names of generated types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NamingConfig {
    /// Prefix of the interface generated for a secondary base (`B` => `IB`)
    pub interface_prefix: String,
    /// Per-package holder of free functions
    pub utility_class: String,
    /// Per-package holder of namespace-level constants
    pub constants_class: String,
    /// Per-package holder of namespace-level variables
    pub globals_class: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            interface_prefix: "I".to_string(),
            utility_class: "Util".to_string(),
            constants_class: "Constants".to_string(),
            globals_class: "Globals".to_string(),
        }
    }
}

/// Namespace to package mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageConfig {
    /// Prefix prepended to every mapped package (`com.acme` => `com.acme.geo`)
    pub root: String,
    /// Package for declarations outside any namespace
    pub default: String,
}

/// Scheduling of the per-unit phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Run validate/transform/generate across units in parallel
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Registered reader format for `run_sources`
    pub format: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Registered writer language
    pub language: String,
    /// Spaces per indentation level
    pub indent: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            language: "java".to_string(),
            indent: 4,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranspileConfig {
    pub mode: Mode,
    pub naming: NamingConfig,
    pub packages: PackageConfig,
    pub pipeline: PipelineConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

impl TranspileConfig {
    /// Load configuration for a project root.
    ///
    /// A missing `.normalize/transpile.toml` yields the defaults; a present
    /// but invalid one is an error.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = Self::path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn path(root: &Path) -> PathBuf {
        root.join(".normalize").join("transpile.toml")
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = TranspileConfig::default();
        assert_eq!(config.mode, Mode::Strict);
        assert_eq!(config.naming.interface_prefix, "I");
        assert_eq!(config.naming.utility_class, "Util");
        assert!(config.pipeline.parallel);
        assert_eq!(config.output.indent, 4);
        assert_eq!(config.output.language, "java");
    }

    #[test]
    fn missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = TranspileConfig::load(dir.path()).unwrap();
        assert_eq!(config, TranspileConfig::default());
    }

    #[test]
    fn load_project_config() {
        let dir = TempDir::new().unwrap();
        let config_dir = dir.path().join(".normalize");
        std::fs::create_dir_all(&config_dir).unwrap();
        let mut file = std::fs::File::create(config_dir.join("transpile.toml")).unwrap();
        writeln!(
            file,
            r#"
mode = "flexible"

[naming]
interface_prefix = "Has"

[packages]
root = "com.acme"

[pipeline]
parallel = false
"#
        )
        .unwrap();

        let config = TranspileConfig::load(dir.path()).unwrap();
        assert_eq!(config.mode, Mode::Flexible);
        assert_eq!(config.naming.interface_prefix, "Has");
        // Unset keys in a present section keep their defaults
        assert_eq!(config.naming.utility_class, "Util");
        assert_eq!(config.packages.root, "com.acme");
        assert!(!config.pipeline.parallel);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = TranspileConfig::from_toml("[naming]\nprefix = \"I\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn bad_mode_is_rejected() {
        assert!(TranspileConfig::from_toml("mode = \"lenient\"").is_err());
    }
}
