//! Dependency coordinates
//!
//! Manifest entries are grouped by Gradle configuration and written either as
//! a notation string (`"group:artifact[:version]"`) or as a table with a
//! `platform` flag for BOMs.

use buildcfg_core::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

static COORDINATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+:[A-Za-z0-9_.\-]+$").unwrap());

static VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s:]+$").unwrap());

/// Gradle dependency configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DependencyConfiguration {
    /// `implementation`
    Implementation,
    /// `api`
    Api,
    /// `compileOnly`
    CompileOnly,
    /// `runtimeOnly`
    RuntimeOnly,
    /// `testImplementation`
    TestImplementation,
    /// `androidTestImplementation`
    AndroidTestImplementation,
    /// `coreLibraryDesugaring`
    CoreLibraryDesugaring,
}

impl DependencyConfiguration {
    /// Name as written in a Gradle build script
    pub fn gradle_name(&self) -> &'static str {
        match self {
            Self::Implementation => "implementation",
            Self::Api => "api",
            Self::CompileOnly => "compileOnly",
            Self::RuntimeOnly => "runtimeOnly",
            Self::TestImplementation => "testImplementation",
            Self::AndroidTestImplementation => "androidTestImplementation",
            Self::CoreLibraryDesugaring => "coreLibraryDesugaring",
        }
    }
}

impl FromStr for DependencyConfiguration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s.chars().filter(|c| *c != '_').collect::<String>().to_lowercase();
        match normalized.as_str() {
            "implementation" => Ok(Self::Implementation),
            "api" => Ok(Self::Api),
            "compileonly" => Ok(Self::CompileOnly),
            "runtimeonly" => Ok(Self::RuntimeOnly),
            "testimplementation" => Ok(Self::TestImplementation),
            "androidtestimplementation" => Ok(Self::AndroidTestImplementation),
            "corelibrarydesugaring" => Ok(Self::CoreLibraryDesugaring),
            _ => Err(Error::invalid_format(
                "dependencies",
                s,
                "a Gradle configuration such as implementation or core_library_desugaring",
            )),
        }
    }
}

impl fmt::Display for DependencyConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.gradle_name())
    }
}

impl Serialize for DependencyConfiguration {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.gradle_name())
    }
}

/// A single dependency declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyRef {
    /// `group:artifact`
    pub coordinate: String,
    /// Absent when the version is managed by a platform (BOM) dependency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_constraint: Option<String>,
    /// Gradle configuration the dependency is declared in
    pub configuration: DependencyConfiguration,
    /// A BOM whose versions apply to versionless entries
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub platform: bool,
}

impl DependencyRef {
    /// Parse `group:artifact[:version]`
    pub fn parse(notation: &str, configuration: DependencyConfiguration) -> Result<Self> {
        let parts: Vec<&str> = notation.trim().split(':').collect();
        let (coordinate, version) = match parts.as_slice() {
            [group, artifact] => (format!("{}:{}", group, artifact), None),
            [group, artifact, version] => {
                (format!("{}:{}", group, artifact), Some((*version).to_string()))
            }
            _ => {
                return Err(Error::invalid_format(
                    "dependencies",
                    notation,
                    "group:artifact or group:artifact:version",
                ))
            }
        };

        Self::new(coordinate, version, configuration, false)
    }

    /// Build a dependency, validating coordinate and version shape
    pub fn new(
        coordinate: impl Into<String>,
        version_constraint: Option<String>,
        configuration: DependencyConfiguration,
        platform: bool,
    ) -> Result<Self> {
        let coordinate = coordinate.into();
        if !COORDINATE.is_match(&coordinate) {
            return Err(Error::invalid_format(
                "dependencies",
                &coordinate,
                "a group:artifact coordinate",
            ));
        }
        if let Some(version) = &version_constraint {
            if !VERSION.is_match(version) {
                return Err(Error::invalid_format(
                    &format!("dependencies.{}", coordinate),
                    version,
                    "a version constraint without whitespace or colons",
                ));
            }
        }

        Ok(Self {
            coordinate,
            version_constraint,
            configuration,
            platform,
        })
    }

    /// Gradle notation, with version when pinned
    pub fn notation(&self) -> String {
        match &self.version_constraint {
            Some(version) => format!("{}:{}", self.coordinate, version),
            None => self.coordinate.clone(),
        }
    }
}

impl fmt::Display for DependencyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.platform {
            write!(f, "{}(platform(\"{}\"))", self.configuration, self.notation())
        } else {
            write!(f, "{}(\"{}\")", self.configuration, self.notation())
        }
    }
}

/// Dependency entry as written in the manifest
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawDependency {
    Notation(String),
    Detailed {
        coordinate: String,
        #[serde(default)]
        version: Option<String>,
        #[serde(default)]
        platform: bool,
    },
}

/// Resolve the manifest's `[dependencies]` table
///
/// Enforces coordinate uniqueness and requires a platform dependency in the
/// same configuration for every versionless entry.
pub(crate) fn resolve(raw: &BTreeMap<String, Vec<RawDependency>>) -> Result<Vec<DependencyRef>> {
    let mut resolved = Vec::new();
    let mut seen = HashSet::new();

    for (name, entries) in raw {
        let configuration: DependencyConfiguration = name.parse()?;

        for entry in entries {
            let dependency = match entry {
                RawDependency::Notation(notation) => DependencyRef::parse(notation, configuration)?,
                RawDependency::Detailed {
                    coordinate,
                    version,
                    platform,
                } => DependencyRef::new(
                    coordinate.clone(),
                    version.clone(),
                    configuration,
                    *platform,
                )?,
            };

            if !seen.insert(dependency.coordinate.clone()) {
                return Err(Error::duplicate_dependency(&dependency.coordinate));
            }
            resolved.push(dependency);
        }
    }

    for dependency in &resolved {
        if dependency.version_constraint.is_some() {
            continue;
        }
        if dependency.platform {
            return Err(Error::missing_field(&format!(
                "dependencies.{}.version",
                dependency.coordinate
            ))
            .with_context("Platform dependencies must pin a version"));
        }
        let managed = resolved
            .iter()
            .any(|d| d.platform && d.configuration == dependency.configuration);
        if !managed {
            return Err(Error::missing_field(&format!(
                "dependencies.{}.version",
                dependency.coordinate
            ))
            .with_suggestion(format!(
                "Pin a version or add a platform (BOM) dependency to {}",
                dependency.configuration
            )));
        }
    }

    Ok(resolved)
}
