//! Host configuration

use crate::application::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Host configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct HostConfig {
    pub name: String,
    /// Default command prefix supplied to integrations that do not set one.
    pub prefix: String,
    /// Directory scanned for module units.
    pub modules_dir: PathBuf,
    /// Directory scanned for output integrations.
    pub integrations_dir: PathBuf,
    /// Directory holding the reserved built-in candidates shipped with the
    /// host.
    pub builtin_dir: PathBuf,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            name: "hearth".to_string(),
            prefix: "/".to_string(),
            modules_dir: PathBuf::from("./modules"),
            integrations_dir: PathBuf::from("./integrations"),
            builtin_dir: PathBuf::from("./builtin"),
        }
    }
}

impl HostConfig {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kebab_case_yaml() {
        let yaml = "
name: hearth
prefix: '!'
modules-dir: /srv/hearth/modules
integrations-dir: /srv/hearth/integrations
builtin-dir: /srv/hearth/builtin
";
        let config: HostConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.prefix, "!");
        assert_eq!(config.modules_dir, PathBuf::from("/srv/hearth/modules"));
    }
}
