//! Configuration management for testscope.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. Project-local `testscope.toml` file
//! 3. User config `~/.config/testscope/config.toml`
//! 4. Built-in defaults (lowest priority)

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Test discovery configuration.
    pub discovery: DiscoveryConfig,

    /// Test execution configuration.
    pub runner: RunnerConfig,
}

impl Config {
    /// Load configuration for the current directory.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_for(Path::new("."))
    }

    /// Load configuration for a workspace.
    ///
    /// Searches for config in order:
    /// 1. `<workspace>/testscope.toml` (project local)
    /// 2. `~/.config/testscope/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load_for(workspace: &Path) -> Result<Self, ConfigError> {
        let project_config = workspace.join(PROJECT_CONFIG_FILE);
        if project_config.exists() {
            return Self::from_file(&project_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join(USER_CONFIG_DIR).join(USER_CONFIG_FILE);
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(n) = lookup("TESTSCOPE_MAX_PARALLEL").and_then(|v| v.parse().ok()) {
            self.runner.max_parallel = n;
        }
        if let Some(go) = lookup("TESTSCOPE_GO_BINARY") {
            self.runner.go_binary = go;
        }
        if let Some(secs) = lookup("TESTSCOPE_TEST_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.runner.test_timeout_secs = secs;
        }
        if let Some(folders) = lookup("TESTSCOPE_SKIP_FOLDERS") {
            self.discovery.skip_folders = folders
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    /// Check values that would otherwise fail later at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runner.max_parallel == 0 {
            return Err(ConfigError::Invalid(
                "runner.max_parallel must be at least 1".to_string(),
            ));
        }
        if self.discovery.test_file_suffix.is_empty() {
            return Err(ConfigError::Invalid(
                "discovery.test_file_suffix must not be empty".to_string(),
            ));
        }
        self.discovery.receiver_method_regex()?;
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Test discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Directory base names whose subtrees are never scanned.
    pub skip_folders: Vec<String>,

    /// File name suffix of test files.
    pub test_file_suffix: String,

    /// Function name prefixes that mark a test entry point.
    pub test_prefixes: Vec<String>,

    /// Regex for receiver-method tests, matched against `(<recv>).<name>` labels.
    pub receiver_method_pattern: String,

    /// Discover from `<root>/src` when that directory exists.
    pub prefer_src_dir: bool,

    /// Leave files without test functions out of the tree.
    pub drop_empty_suites: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            skip_folders: DEFAULT_SKIP_FOLDERS.iter().map(|s| s.to_string()).collect(),
            test_file_suffix: DEFAULT_TEST_FILE_SUFFIX.to_string(),
            test_prefixes: DEFAULT_TEST_PREFIXES.iter().map(|s| s.to_string()).collect(),
            receiver_method_pattern: DEFAULT_RECEIVER_METHOD_PATTERN.to_string(),
            prefer_src_dir: true,
            drop_empty_suites: false,
        }
    }
}

impl DiscoveryConfig {
    pub fn receiver_method_regex(&self) -> Result<Regex, ConfigError> {
        Regex::new(&self.receiver_method_pattern).map_err(|e| {
            ConfigError::Invalid(format!("discovery.receiver_method_pattern: {}", e))
        })
    }

    /// True if the file name marks a test file.
    pub fn is_test_file(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(&self.test_file_suffix))
            .unwrap_or(false)
    }
}

/// How a suite failure that names no failing test is charged to the cases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnattributedFailure {
    /// Every case in the suite is marked failed.
    #[default]
    ChargeAll,
    /// No case is marked failed.
    ChargeNone,
}

/// Test execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Maximum number of run requests in flight.
    pub max_parallel: usize,

    /// Path or name of the go binary.
    pub go_binary: String,

    /// `go test -timeout`, in seconds. `0` means no timeout at all: go gets
    /// `-timeout 0s` and the process is never killed.
    pub test_timeout_secs: u64,

    /// Seconds beyond `test_timeout_secs` before the process is killed.
    pub kill_grace_secs: u64,

    /// Flag that narrows a suite function to some of its methods, used to
    /// run receiver-method tests. `None` leaves such tests unrunnable.
    pub suite_method_flag: Option<String>,

    /// Extra flags passed to `go test`.
    pub flags: Vec<String>,

    /// Build tags passed as `-tags` unless `flags` already sets them.
    pub build_tags: Option<String>,

    /// Charging policy for failures the runner cannot attribute.
    pub unattributed_failure: UnattributedFailure,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_MAX_PARALLEL,
            go_binary: DEFAULT_GO_BINARY.to_string(),
            test_timeout_secs: DEFAULT_TEST_TIMEOUT_SECS,
            kill_grace_secs: DEFAULT_KILL_GRACE_SECS,
            suite_method_flag: Some(DEFAULT_SUITE_METHOD_FLAG.to_string()),
            flags: Vec::new(),
            build_tags: None,
            unattributed_failure: UnattributedFailure::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.runner.max_parallel, DEFAULT_MAX_PARALLEL);
        assert_eq!(config.discovery.test_file_suffix, DEFAULT_TEST_FILE_SUFFIX);
        assert!(config.discovery.skip_folders.contains(&"vendor".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_to_toml() {
        let toml_str = Config::default_config_string();
        assert!(toml_str.contains("[discovery]"));
        assert!(toml_str.contains("[runner]"));
        assert!(toml_str.contains("charge_all"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TESTSCOPE_MAX_PARALLEL", "4"),
            ("TESTSCOPE_SKIP_FOLDERS", "vendor, testdata ,"),
            ("TESTSCOPE_TEST_TIMEOUT", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.runner.max_parallel, 4);
        assert_eq!(config.discovery.skip_folders, vec!["vendor", "testdata"]);
        assert_eq!(config.runner.test_timeout_secs, DEFAULT_TEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_validate_rejects_zero_parallel() {
        let mut config = Config::default();
        config.runner.max_parallel = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_bad_pattern() {
        let mut config = Config::default();
        config.discovery.receiver_method_pattern = "(".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_test_file() {
        let config = DiscoveryConfig::default();
        assert!(config.is_test_file(Path::new("pkg/parser_test.go")));
        assert!(!config.is_test_file(Path::new("pkg/parser.go")));
        assert!(!config.is_test_file(Path::new("pkg/parser_test.go.orig")));
    }
}
