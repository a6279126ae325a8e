//! Android build-manifest resolution
//!
//! This crate turns a declarative build manifest into the normalized record
//! an Android packaging step consumes:
//! - Manifest schema and validation (SDK levels, identity, build types)
//! - Dependency coordinates with BOM-managed versions
//! - Release signing credentials from a separate properties file
//! - The resolved, read-only build configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! let resolved = buildcfg_android::load(Path::new("android/build-manifest.toml"))?;
//! println!("{} {}", resolved.build.application_id, resolved.build.version_name);
//! # Ok::<(), buildcfg_core::Error>(())
//! ```

#![warn(missing_docs)]

pub mod dependency;
pub mod loader;
pub mod manifest;
pub mod resolved;
pub mod signing;

#[cfg(test)]
pub(crate) mod fixtures;

pub use dependency::{DependencyConfiguration, DependencyRef};
pub use loader::{load, ManifestLoader};
pub use manifest::{BuildConfig, BuildType, CompileOptions, Manifest};
pub use resolved::{ResolvedManifest, SigningMode};
pub use signing::{Secret, SigningCredential};
