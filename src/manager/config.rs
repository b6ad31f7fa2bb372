use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::site::DEFAULT_MAX_FRAMES;

/// Environment variable overriding [`AdvisorConfig::fetch_threshold`].
pub const ENV_THRESHOLD: &str = "PREFETCH_ADVISOR_THRESHOLD";
/// Environment variable overriding [`AdvisorConfig::max_prefetch_depth`].
pub const ENV_MAX_DEPTH: &str = "PREFETCH_ADVISOR_MAX_DEPTH";
/// Environment variable overriding [`AdvisorConfig::prefetch_enabled`].
pub const ENV_ENABLED: &str = "PREFETCH_ADVISOR_ENABLED";

/// Errors raised while loading or validating an [`AdvisorConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration text is not valid TOML for this schema.
    #[error("failed to parse config{}: {source}", describe_path(.path))]
    Parse {
        /// File that was being parsed, if any.
        path: Option<PathBuf>,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },
    /// A value is outside its accepted range.
    #[error("invalid config value for `{key}`: {reason}")]
    Invalid {
        /// Offending key.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Tunable parameters of an [`super::ExtentManager`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdvisorConfig {
    /// Joint traversal probability an association must exceed to be prefetched.
    pub fetch_threshold: f64,
    /// Maximum length of a recommended path and depth of profile trees.
    pub max_prefetch_depth: usize,
    /// Whether recommendations are produced at all.
    pub prefetch_enabled: bool,
    /// Maximum number of tracked sites; least recently used sites are evicted.
    pub max_sites: Option<usize>,
    /// Frame budget for stack-derived site keys.
    pub max_stack_frames: usize,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            fetch_threshold: 0.4,
            max_prefetch_depth: 5,
            prefetch_enabled: true,
            max_sites: None,
            max_stack_frames: DEFAULT_MAX_FRAMES,
        }
    }
}

impl AdvisorConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(text).map_err(|source| ConfigError::Parse { path: None, source })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `PREFETCH_ADVISOR_*` overrides from the process environment.
    pub fn apply_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides obtained from `lookup`, then re-validates.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_THRESHOLD) {
            self.fetch_threshold = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "fetch_threshold",
                reason: format!("`{raw}` is not a number"),
            })?;
        }
        if let Some(raw) = lookup(ENV_MAX_DEPTH) {
            self.max_prefetch_depth = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "max_prefetch_depth",
                reason: format!("`{raw}` is not a non-negative integer"),
            })?;
        }
        if let Some(raw) = lookup(ENV_ENABLED) {
            self.prefetch_enabled = parse_flag(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "prefetch_enabled",
                reason: format!("`{raw}` is not a boolean"),
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks every value against its accepted range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_threshold(self.fetch_threshold)?;
        validate_depth(self.max_prefetch_depth)?;
        if self.max_sites == Some(0) {
            return Err(ConfigError::Invalid {
                key: "max_sites",
                reason: "must be at least 1 when set".into(),
            });
        }
        if self.max_stack_frames == 0 {
            return Err(ConfigError::Invalid {
                key: "max_stack_frames",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

pub(crate) fn validate_threshold(threshold: f64) -> Result<(), ConfigError> {
    if threshold.is_finite() && threshold > 0.0 && threshold < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            key: "fetch_threshold",
            reason: format!("{threshold} is outside (0, 1)"),
        })
    }
}

pub(crate) fn validate_depth(depth: usize) -> Result<(), ConfigError> {
    if depth >= 1 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            key: "max_prefetch_depth",
            reason: "must be at least 1".into(),
        })
    }
}

fn describe_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" file {}", p.display()))
        .unwrap_or_default()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AdvisorConfig::default();
        assert_eq!(config.fetch_threshold, 0.4);
        assert_eq!(config.max_prefetch_depth, 5);
        assert!(config.prefetch_enabled);
        assert_eq!(config.max_sites, None);
        assert_eq!(config.max_stack_frames, 20);
        config.validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AdvisorConfig::from_toml_str("fetch_threshold = 0.25\nmax_sites = 128\n").unwrap();
        assert_eq!(config.fetch_threshold, 0.25);
        assert_eq!(config.max_sites, Some(128));
        assert_eq!(config.max_prefetch_depth, 5);
    }

    #[test]
    fn rejects_out_of_range_and_unknown_keys() {
        assert!(matches!(
            AdvisorConfig::from_toml_str("fetch_threshold = 1.0"),
            Err(ConfigError::Invalid { key: "fetch_threshold", .. })
        ));
        assert!(matches!(
            AdvisorConfig::from_toml_str("max_prefetch_depth = 0"),
            Err(ConfigError::Invalid { key: "max_prefetch_depth", .. })
        ));
        assert!(matches!(
            AdvisorConfig::from_toml_str("fetch_treshold = 0.5"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn load_reads_file_and_reports_missing_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "prefetch_enabled = false").unwrap();
        let config = AdvisorConfig::load(file.path()).unwrap();
        assert!(!config.prefetch_enabled);

        let missing = file.path().with_extension("missing");
        assert!(matches!(
            AdvisorConfig::load(&missing),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn overrides_replace_values() {
        let env: HashMap<&str, &str> = [(ENV_THRESHOLD, "0.7"), (ENV_ENABLED, "off")].into();
        let config = AdvisorConfig::default()
            .apply_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.fetch_threshold, 0.7);
        assert!(!config.prefetch_enabled);

        let bad = AdvisorConfig::default().apply_overrides(|name| {
            (name == ENV_MAX_DEPTH).then(|| "deep".to_string())
        });
        assert!(matches!(bad, Err(ConfigError::Invalid { key: "max_prefetch_depth", .. })));
    }
}
