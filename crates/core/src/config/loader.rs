//! Configuration file loading

use super::schema::ConfigSchema;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Configuration wrapper
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed settings
    pub schema: ConfigSchema,
    /// File the settings came from, if any
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from an explicit path, a standard location, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) if !p.exists() => return Err(Error::config_not_found(p)),
            Some(p) => Some(p.to_path_buf()),
            None => find_config_file(Path::new(".")),
        };

        let schema = match config_path {
            Some(ref p) => load_config_file(p)?,
            None => ConfigSchema::default(),
        };

        Ok(Self {
            schema,
            path: config_path,
        })
    }
}

/// Find configuration file in standard locations
fn find_config_file(root: &Path) -> Option<PathBuf> {
    let candidates = [".buildcfg.toml", "buildcfg.toml", ".config/buildcfg.toml"];

    candidates
        .iter()
        .map(|candidate| root.join(candidate))
        .find(|path| path.exists())
}

/// Load and parse a TOML configuration file
fn load_config_file(path: &Path) -> Result<ConfigSchema> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    toml::from_str(&content).map_err(|e| {
        Error::toml_parse(&e, &content)
            .with_context(format!("Failed to parse config file {}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.path.is_none());
        assert_eq!(config.schema.general.credentials_file, "key.properties");
        assert!(!config.schema.validation.require_signing);
    }

    #[test]
    fn test_config_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("buildcfg.toml");
        std::fs::write(
            &path,
            "[general]\nmanifest = \"app/manifest.toml\"\n\n[validation]\nrequire_signing = true\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.schema.general.manifest, "app/manifest.toml");
        assert_eq!(config.schema.general.credentials_file, "key.properties");
        assert!(config.schema.validation.require_signing);
        assert_eq!(config.schema.logging.level, "warn");
    }

    #[test]
    fn test_config_load_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/buildcfg.toml"))).unwrap_err();
        assert!(err.is(ErrorCode::ConfigNotFound));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("buildcfg.toml");
        std::fs::write(&path, "[general\nmanifest = 1").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.is(ErrorCode::ConfigParseError));
    }

    #[test]
    fn test_find_config_file_in_dot_config() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".config")).unwrap();
        std::fs::write(dir.path().join(".config/buildcfg.toml"), "").unwrap();

        let found = find_config_file(dir.path()).unwrap();
        assert!(found.ends_with(".config/buildcfg.toml"));
    }
}
