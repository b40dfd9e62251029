//! Configuration loading from stackguard.toml.

use policy::{GrantEntry, Policy, PolicyFile};
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,

    /// Policy grants (`[[grant]]` tables).
    #[serde(default, rename = "grant")]
    pub grants: Vec<GrantEntry>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// `tracing` filter directive. `RUST_LOG` takes precedence.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "warn".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Compile the grants into a policy. Relative path patterns resolve
    /// against `base`, normally the directory holding the config file.
    pub fn into_policy(self, base: &Path) -> Result<Policy, policy::Error> {
        Policy::from_file(PolicyFile { grants: self.grants }, base)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy::{Origin, Permission, Resource};

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.log.filter, "warn");
        assert!(config.grants.is_empty());
    }

    #[test]
    fn test_parse_with_grants() {
        let config = Config::parse(
            r#"
[log]
filter = "guard=debug"

[[grant]]
origin = "plugin-a"
resource = "./data/**"
permissions = ["read", "write"]
"#,
        )
        .unwrap();
        assert_eq!(config.log.filter, "guard=debug");

        let policy = config.into_policy(Path::new("/srv")).unwrap();
        assert_eq!(policy.len(), 2);
        let target = Resource::path("/srv/data/x").unwrap();
        assert!(policy.implies(&Origin::new("plugin-a"), &target, Permission::Write));
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(matches!(
            Config::parse("[backend]\nmodel = \"x\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("stackguard.toml");
        std::fs::write(&path, "[log]\nfilter = \"info\"\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().log.filter, "info");
        assert!(matches!(
            Config::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
