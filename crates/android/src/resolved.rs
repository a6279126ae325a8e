//! The normalized record handed to the packaging step

use crate::dependency::DependencyRef;
use crate::manifest::{BuildConfig, BuildType, CompileOptions};
use crate::signing::SigningCredential;
use buildcfg_core::error::Result;
use buildcfg_core::validation::ValidationError;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// How signed build types will be packaged
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SigningMode {
    /// Signed with the loaded release credential
    Release {
        /// Keystore entry used for signing
        key_alias: String,
    },
    /// No credential; the packaging tool uses its debug keystore
    DebugFallback,
}

/// Validated build configuration, read-only for the rest of the build
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedManifest {
    /// Identity and SDK levels
    #[serde(flatten)]
    pub build: BuildConfig,
    /// Java/Kotlin compile settings
    pub compile_options: CompileOptions,
    /// Build types to package
    pub build_types: Vec<BuildType>,
    /// Declared dependencies
    pub dependencies: Vec<DependencyRef>,
    /// Release credential, absent for debug-signing fallback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing: Option<SigningCredential>,
    /// Manifest this record was loaded from
    #[serde(skip)]
    pub manifest_path: PathBuf,
    /// Non-blocking findings from loading
    #[serde(skip)]
    pub warnings: Vec<ValidationError>,
}

/// The parts of a manifest that identify a build configuration
///
/// Signing is left out: keystore paths differ between machines and the
/// credentials file is absent on most of them.
#[derive(Serialize)]
struct FingerprintInput<'a> {
    build: &'a BuildConfig,
    compile_options: &'a CompileOptions,
    build_types: &'a [BuildType],
    dependencies: &'a [DependencyRef],
}

impl ResolvedManifest {
    /// Signing mode for signed build types
    pub fn signing_mode(&self) -> SigningMode {
        match &self.signing {
            Some(credential) => SigningMode::Release {
                key_alias: credential.key_alias.clone(),
            },
            None => SigningMode::DebugFallback,
        }
    }

    /// Build types that expect the release credential
    pub fn signed_build_types(&self) -> impl Iterator<Item = &BuildType> {
        self.build_types.iter().filter(|b| b.signed)
    }

    /// SHA-256 of the canonical JSON form of the declared configuration
    ///
    /// Independent of where the manifest lives and of whether signing
    /// credentials are present.
    pub fn fingerprint(&self) -> Result<String> {
        let canonical = serde_json::to_vec(&FingerprintInput {
            build: &self.build,
            compile_options: &self.compile_options,
            build_types: &self.build_types,
            dependencies: &self.dependencies,
        })?;
        Ok(hex::encode(Sha256::digest(&canonical)))
    }

    /// Pretty JSON for the packaging tool
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// TOML for the packaging tool
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
