//! Manifest loading
//!
//! Reads the manifest, attaches the optional signing credential and returns
//! a [`ResolvedManifest`]. Only reads files.

use crate::manifest::Manifest;
use crate::resolved::ResolvedManifest;
use crate::signing::{expand_path, SigningCredential};
use buildcfg_core::config::ConfigSchema;
use buildcfg_core::error::{Error, Result, ResultExt};
use buildcfg_core::validation::Validator;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default credentials file name, resolved next to the manifest
pub const DEFAULT_CREDENTIALS_FILE: &str = "key.properties";

/// Load a manifest with default settings
pub fn load(manifest_path: &Path) -> Result<ResolvedManifest> {
    ManifestLoader::new().load(manifest_path)
}

/// Reads and validates build manifests
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    credentials_file: String,
    require_signing: bool,
    warn_unsigned_release: bool,
}

impl Default for ManifestLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestLoader {
    /// Create a loader with default settings
    pub fn new() -> Self {
        Self {
            credentials_file: DEFAULT_CREDENTIALS_FILE.to_string(),
            require_signing: false,
            warn_unsigned_release: true,
        }
    }

    /// Create a loader from tool configuration
    pub fn from_config(schema: &ConfigSchema) -> Self {
        Self {
            credentials_file: schema.general.credentials_file.clone(),
            require_signing: schema.validation.require_signing,
            warn_unsigned_release: schema.validation.warn_unsigned_release,
        }
    }

    /// Override the default credentials file name
    pub fn with_credentials_file(mut self, name: impl Into<String>) -> Self {
        self.credentials_file = name.into();
        self
    }

    /// Fail instead of falling back to debug signing
    pub fn require_signing(mut self, required: bool) -> Self {
        self.require_signing = required;
        self
    }

    /// Load, validate and normalize a manifest
    pub fn load(&self, manifest_path: &Path) -> Result<ResolvedManifest> {
        if !manifest_path.is_file() {
            return Err(
                Error::file_not_found(manifest_path).with_context("Loading build manifest")
            );
        }

        let content = std::fs::read_to_string(manifest_path)
            .map_err(Error::from)
            .context(format!("Reading manifest {}", manifest_path.display()))?;
        let manifest = Manifest::parse(&content)
            .context(format!("In manifest {}", manifest_path.display()))?;

        debug!(
            application_id = %manifest.build.application_id,
            dependencies = manifest.dependencies.len(),
            "Parsed manifest"
        );

        let base_dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));
        let signing = self.load_signing(base_dir, manifest.credentials.as_deref())?;

        let mut warnings = manifest.warnings;
        let has_signed_types = manifest.build_types.iter().any(|b| b.signed);
        warnings.extend(
            Validator::new()
                .warn_if(
                    "signing",
                    self.warn_unsigned_release && signing.is_none() && has_signed_types,
                    "No signing credential found; release builds fall back to debug signing",
                )
                .validate()
                .warnings()
                .iter()
                .cloned(),
        );

        for warning in &warnings {
            warn!(field = %warning.field, "{}", warning.message);
        }

        info!(
            application_id = %manifest.build.application_id,
            version_code = manifest.build.version_code,
            signed = signing.is_some(),
            "Resolved manifest"
        );

        Ok(ResolvedManifest {
            build: manifest.build,
            compile_options: manifest.compile_options,
            build_types: manifest.build_types,
            dependencies: manifest.dependencies,
            signing,
            manifest_path: manifest_path.to_path_buf(),
            warnings,
        })
    }

    /// Resolve the credentials file
    ///
    /// An explicit path must exist. The default location is optional unless
    /// signing is required.
    fn load_signing(
        &self,
        base_dir: &Path,
        explicit: Option<&str>,
    ) -> Result<Option<SigningCredential>> {
        if let Some(explicit) = explicit {
            let path = base_dir.join(expand_path("signing.credentials", explicit)?);
            debug!(path = %path.display(), "Loading explicit credentials file");
            return SigningCredential::load(&path).map(Some);
        }

        let path: PathBuf = base_dir.join(&self.credentials_file);
        if path.is_file() {
            debug!(path = %path.display(), "Loading credentials file");
            return SigningCredential::load(&path).map(Some);
        }

        if self.require_signing {
            return Err(Error::credential_file_not_found(&path)
                .with_context("Signing is required by configuration"));
        }

        debug!(path = %path.display(), "No credentials file; using debug signing");
        Ok(None)
    }
}
