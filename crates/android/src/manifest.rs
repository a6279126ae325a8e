//! Build manifest schema and validation
//!
//! The manifest is a TOML file holding what an Android `build.gradle.kts`
//! declares for an app module: identity, SDK levels, compile options, build
//! types and dependencies. Signing passwords are not allowed here.

use crate::dependency::{self, DependencyRef, RawDependency};
use buildcfg_core::error::{Error, ErrorCode, Result};
use buildcfg_core::validation::{ValidationError, Validator};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static PACKAGE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z][A-Za-z0-9_]*)+$").unwrap()
});

const PACKAGE_NAME_DESCRIPTION: &str = "a dotted package name such as com.example.app";

/// Keys that would carry a signing password, wherever they appear
const SECRET_KEYS: &[&str] = &[
    "password",
    "store_password",
    "storePassword",
    "key_password",
    "keyPassword",
];

/// Application identity and SDK levels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Unique package identifier, e.g. `com.example.app`
    pub application_id: String,
    /// Package used for generated R classes; defaults to `application_id`
    pub namespace: String,
    /// Lowest supported platform API level
    pub min_sdk: u32,
    /// API level the app is tested against
    pub target_sdk: u32,
    /// API level the app is compiled with
    pub compile_sdk: u32,
    /// Monotonic release number
    pub version_code: u32,
    /// User-facing version string
    pub version_name: String,
    /// Pinned NDK release
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ndk_version: Option<String>,
}

impl BuildConfig {
    /// Check field shapes and `min_sdk <= target_sdk <= compile_sdk`
    pub fn validate(&self) -> Result<()> {
        Validator::new()
            .required("app.application_id", &self.application_id)
            .required("app.namespace", &self.namespace)
            .required("app.version_name", &self.version_name)
            .pattern(
                "app.application_id",
                &self.application_id,
                &PACKAGE_NAME,
                PACKAGE_NAME_DESCRIPTION,
            )
            .pattern("app.namespace", &self.namespace, &PACKAGE_NAME, PACKAGE_NAME_DESCRIPTION)
            .at_least("app.version_code", self.version_code, 1)
            .at_least("sdk.min", self.min_sdk, 1)
            .ordered("sdk.min", self.min_sdk, "sdk.target", self.target_sdk)
            .ordered("sdk.target", self.target_sdk, "sdk.compile", self.compile_sdk)
            .validate()
            .into_result()
            .map(|_| ())
    }

    /// Require this release's version code to exceed the previous one
    pub fn ensure_version_bump(&self, previous: u32) -> Result<()> {
        if self.version_code > previous {
            Ok(())
        } else {
            Err(Error::invalid_range(
                "app.version_code",
                format!(
                    "{} does not increase on the previous release ({})",
                    self.version_code, previous
                ),
            )
            .with_suggestion(format!(
                "Set version_code to at least {}",
                previous.saturating_add(1)
            )))
        }
    }

    /// Serialize as a flat TOML table
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Parse and validate a flat TOML table written by [`BuildConfig::to_toml`]
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

/// Java/Kotlin compile settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompileOptions {
    /// Java source and target compatibility
    #[serde(default = "default_java_version")]
    pub java_version: u8,
    /// Enable core library desugaring
    #[serde(default)]
    pub core_library_desugaring: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            java_version: default_java_version(),
            core_library_desugaring: false,
        }
    }
}

fn default_java_version() -> u8 {
    11
}

impl CompileOptions {
    /// Kotlin `jvmTarget` string for the Java version
    pub fn jvm_target(&self) -> String {
        if self.java_version <= 8 {
            format!("1.{}", self.java_version)
        } else {
            self.java_version.to_string()
        }
    }
}

/// A named build type such as `debug` or `release`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildType {
    /// Build type name
    pub name: String,
    /// Run R8 code shrinking
    pub minify: bool,
    /// Strip unused resources; needs `minify`
    pub shrink_resources: bool,
    /// ProGuard rule files passed to R8
    pub proguard_files: Vec<String>,
    /// Packaged with the release signing credential when one is loaded
    pub signed: bool,
}

impl BuildType {
    fn defaults() -> Vec<Self> {
        ["debug", "release"]
            .into_iter()
            .map(|name| Self {
                name: name.to_string(),
                minify: false,
                shrink_resources: false,
                proguard_files: Vec::new(),
                signed: name == "release",
            })
            .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawApp {
    application_id: Option<String>,
    namespace: Option<String>,
    version_code: Option<u32>,
    version_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSdk {
    min: Option<u32>,
    target: Option<u32>,
    compile: Option<u32>,
    ndk: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBuildType {
    #[serde(default)]
    minify: bool,
    #[serde(default)]
    shrink_resources: bool,
    #[serde(default)]
    proguard_files: Vec<String>,
    signed: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSigning {
    credentials: Option<String>,
    #[serde(flatten)]
    other: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    app: RawApp,
    #[serde(default)]
    sdk: RawSdk,
    #[serde(default)]
    compile_options: CompileOptions,
    #[serde(default)]
    build_types: BTreeMap<String, RawBuildType>,
    signing: Option<RawSigning>,
    #[serde(default)]
    dependencies: BTreeMap<String, Vec<RawDependency>>,
}

/// A parsed and validated manifest, before credentials are attached
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Identity and SDK levels
    pub build: BuildConfig,
    /// Java/Kotlin compile settings
    pub compile_options: CompileOptions,
    /// Declared build types, or `debug` and `release`
    pub build_types: Vec<BuildType>,
    /// Dependencies grouped by configuration
    pub dependencies: Vec<DependencyRef>,
    /// Explicit credentials path from `[signing] credentials`
    pub credentials: Option<String>,
    /// Non-blocking findings
    pub warnings: Vec<ValidationError>,
}

impl Manifest {
    /// Parse manifest TOML and validate every section
    pub fn parse(content: &str) -> Result<Self> {
        let table: toml::Table =
            toml::from_str(content).map_err(|e| Error::toml_parse(&e, content))?;
        reject_inline_secrets(&table, "")?;

        let raw: RawManifest = toml::Value::Table(table)
            .try_into()
            .map_err(|e| Error::toml_parse(&e, content))?;

        let signing = raw.signing.unwrap_or_default();
        if let Some(key) = signing.other.keys().next() {
            return Err(Error::invalid_format(
                &format!("signing.{}", key),
                key,
                "only `credentials` is allowed under [signing]",
            ));
        }

        let app = raw.app;
        let sdk = raw.sdk;

        Validator::new()
            .present("app.application_id", &app.application_id)
            .present("app.version_code", &app.version_code)
            .present("app.version_name", &app.version_name)
            .present("sdk.min", &sdk.min)
            .present("sdk.target", &sdk.target)
            .present("sdk.compile", &sdk.compile)
            .validate()
            .into_result()?;

        let application_id = app.application_id.unwrap_or_default();
        let build = BuildConfig {
            namespace: app.namespace.unwrap_or_else(|| application_id.clone()),
            application_id,
            min_sdk: sdk.min.unwrap_or_default(),
            target_sdk: sdk.target.unwrap_or_default(),
            compile_sdk: sdk.compile.unwrap_or_default(),
            version_code: app.version_code.unwrap_or_default(),
            version_name: app.version_name.unwrap_or_default(),
            ndk_version: sdk.ndk,
        };
        build.validate()?;

        let build_types = resolve_build_types(raw.build_types)?;
        let compile_options = raw.compile_options;
        let dependencies = dependency::resolve(&raw.dependencies)?;

        let desugaring_declared = dependencies
            .iter()
            .any(|d| d.configuration == dependency::DependencyConfiguration::CoreLibraryDesugaring);

        let warnings = Validator::new()
            .at_least("compile_options.java_version", compile_options.java_version, 8)
            .custom("compile_options.core_library_desugaring", ErrorCode::MissingField, || {
                (compile_options.core_library_desugaring && !desugaring_declared).then(|| {
                    "Desugaring is enabled but no core_library_desugaring dependency is declared"
                        .to_string()
                })
            })
            .warn_if(
                "sdk.target",
                build.target_sdk < build.compile_sdk,
                "target SDK lags behind compile SDK",
            )
            .validate()
            .into_result()?;

        Ok(Self {
            build,
            compile_options,
            build_types,
            dependencies,
            credentials: signing.credentials,
            warnings,
        })
    }
}

/// Fail on any password key, in any table, before typed deserialization
fn reject_inline_secrets(table: &toml::Table, prefix: &str) -> Result<()> {
    for (key, value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        if SECRET_KEYS.contains(&key.as_str()) {
            return Err(Error::inline_secret(&path));
        }
        reject_secrets_in_value(value, &path)?;
    }
    Ok(())
}

fn reject_secrets_in_value(value: &toml::Value, path: &str) -> Result<()> {
    match value {
        toml::Value::Table(table) => reject_inline_secrets(table, path),
        toml::Value::Array(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(i, item)| reject_secrets_in_value(item, &format!("{}[{}]", path, i))),
        _ => Ok(()),
    }
}

fn resolve_build_types(raw: BTreeMap<String, RawBuildType>) -> Result<Vec<BuildType>> {
    if raw.is_empty() {
        return Ok(BuildType::defaults());
    }

    let mut validator = Validator::new();
    let mut build_types = Vec::with_capacity(raw.len());

    for (name, raw) in raw {
        validator = validator.custom(
            &format!("build_types.{}.shrink_resources", name),
            ErrorCode::ValidationError,
            || {
                (raw.shrink_resources && !raw.minify)
                    .then(|| "Resource shrinking requires minify = true".to_string())
            },
        );
        build_types.push(BuildType {
            signed: raw.signed.unwrap_or(name == "release"),
            name,
            minify: raw.minify,
            shrink_resources: raw.shrink_resources,
            proguard_files: raw.proguard_files,
        });
    }

    validator.validate().into_result()?;
    Ok(build_types)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::BIOMEDICAL;
    use proptest::prelude::*;

    fn with_sdk(min: u32, target: u32, compile: u32) -> String {
        format!(
            concat!(
                "[app]\napplication_id = \"com.example.app\"\n",
                "version_code = 1\nversion_name = \"1.0\"\n\n",
                "[sdk]\nmin = {}\ntarget = {}\ncompile = {}\n",
            ),
            min, target, compile
        )
    }

    #[test]
    fn test_parse_full_manifest() {
        let manifest = Manifest::parse(BIOMEDICAL).unwrap();

        assert_eq!(manifest.build.application_id, "com.example.biomedical");
        assert_eq!(manifest.build.namespace, "com.example.biomedical");
        assert_eq!(manifest.build.ndk_version.as_deref(), Some("27.0.12077973"));
        assert_eq!(manifest.compile_options.jvm_target(), "11");
        assert_eq!(manifest.dependencies.len(), 4);
        assert_eq!(manifest.build_types.len(), 1);
        assert!(manifest.build_types[0].signed);
        assert!(manifest.credentials.is_none());
        assert!(manifest.warnings.is_empty());
    }

    #[test]
    fn test_missing_application_id() {
        let content = BIOMEDICAL.replace("application_id = \"com.example.biomedical\"\n", "");
        let err = Manifest::parse(&content).unwrap_err();
        assert!(err.is(ErrorCode::MissingField));
        assert!(err.message.contains("app.application_id"));
    }

    #[test]
    fn test_missing_sdk_level() {
        let content = BIOMEDICAL.replace("compile = 36\n", "");
        let err = Manifest::parse(&content).unwrap_err();
        assert!(err.is(ErrorCode::MissingField));
        assert!(err.message.contains("sdk.compile"));
    }

    #[test]
    fn test_min_sdk_above_target() {
        let err = Manifest::parse(&with_sdk(30, 24, 34)).unwrap_err();
        assert!(err.is(ErrorCode::InvalidRange));
        assert!(err.message.contains("sdk.min"));
    }

    #[test]
    fn test_target_sdk_above_compile() {
        let err = Manifest::parse(&with_sdk(24, 35, 34)).unwrap_err();
        assert!(err.is(ErrorCode::InvalidRange));
        assert!(err.message.contains("sdk.target"));
    }

    #[test]
    fn test_target_behind_compile_warns() {
        let manifest = Manifest::parse(&with_sdk(24, 34, 36)).unwrap();
        assert_eq!(manifest.warnings.len(), 1);
        assert_eq!(manifest.warnings[0].field, "sdk.target");
    }

    #[test]
    fn test_invalid_application_id() {
        let content = with_sdk(24, 34, 34).replace("com.example.app", "biomedical");
        let err = Manifest::parse(&content).unwrap_err();
        assert!(err.is(ErrorCode::InvalidFormat));
    }

    #[test]
    fn test_inline_secret_rejected() {
        let content = format!(
            "{}\n[signing]\nstore_password = \"hunter2\"\n",
            with_sdk(24, 34, 34)
        );
        let err = Manifest::parse(&content).unwrap_err();
        assert!(err.is(ErrorCode::InlineSecret));
        assert!(!err.to_string().contains("hunter2"));
    }

    #[test]
    fn test_inline_secret_outside_signing_rejected() {
        let content = BIOMEDICAL.replace(
            "version_name = \"1.4.1\"\n",
            "version_name = \"1.4.1\"\nstorePassword = \"Rajeshrd14#1\"\n",
        );
        let err = Manifest::parse(&content).unwrap_err();
        assert!(err.is(ErrorCode::InlineSecret));
        assert!(err.message.contains("app.storePassword"));

        let shown = err.to_string();
        let report = serde_json::to_string(&err.to_report()).unwrap();
        assert!(!shown.contains("Rajeshrd14"));
        assert!(!report.contains("Rajeshrd14"));
    }

    #[test]
    fn test_inline_secret_in_dependency_table_rejected() {
        let content = BIOMEDICAL.replace(
            "platform = true }",
            "platform = true, password = \"hunter2\" }",
        );
        let err = Manifest::parse(&content).unwrap_err();
        assert!(err.is(ErrorCode::InlineSecret));
        assert!(err.message.contains("dependencies.implementation[1].password"));
    }

    #[test]
    fn test_parse_error_does_not_quote_source() {
        let content = format!("{}\n[app.extra]\nnote = \"hunter2\n", with_sdk(24, 34, 34));
        let err = Manifest::parse(&content).unwrap_err();
        assert!(err.is(ErrorCode::ConfigParseError));
        assert!(err.message.contains("line"));
        assert!(!err.to_string().contains("hunter2"));
    }

    #[test]
    fn test_zero_version_code() {
        let content = with_sdk(24, 34, 34).replace("version_code = 1", "version_code = 0");
        let err = Manifest::parse(&content).unwrap_err();
        assert!(err.is(ErrorCode::InvalidRange));
        assert!(err.message.contains("app.version_code"));
    }

    #[test]
    fn test_unknown_signing_key_rejected() {
        let content = format!("{}\n[signing]\nkeystore = \"a.jks\"\n", with_sdk(24, 34, 34));
        let err = Manifest::parse(&content).unwrap_err();
        assert!(err.is(ErrorCode::InvalidFormat));
    }

    #[test]
    fn test_explicit_credentials_path() {
        let content = format!(
            "{}\n[signing]\ncredentials = \"../key.properties\"\n",
            with_sdk(24, 34, 34)
        );
        let manifest = Manifest::parse(&content).unwrap();
        assert_eq!(manifest.credentials.as_deref(), Some("../key.properties"));
    }

    #[test]
    fn test_default_build_types() {
        let manifest = Manifest::parse(&with_sdk(24, 34, 34)).unwrap();
        let names: Vec<&str> = manifest.build_types.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["debug", "release"]);
        assert!(!manifest.build_types[0].signed);
        assert!(manifest.build_types[1].signed);
    }

    #[test]
    fn test_shrink_without_minify() {
        let content = format!(
            "{}\n[build_types.release]\nshrink_resources = true\n",
            with_sdk(24, 34, 34)
        );
        let err = Manifest::parse(&content).unwrap_err();
        assert!(err.is(ErrorCode::ValidationError));
        assert!(err.message.contains("build_types.release.shrink_resources"));
    }

    #[test]
    fn test_desugaring_without_dependency() {
        let content = format!(
            "{}\n[compile_options]\ncore_library_desugaring = true\n",
            with_sdk(24, 34, 34)
        );
        let err = Manifest::parse(&content).unwrap_err();
        assert!(err.is(ErrorCode::MissingField));
    }

    #[test]
    fn test_unknown_section_rejected() {
        let content = format!("{}\n[flutter]\nsource = \"../..\"\n", with_sdk(24, 34, 34));
        let err = Manifest::parse(&content).unwrap_err();
        assert!(err.is(ErrorCode::ConfigParseError));
    }

    #[test]
    fn test_version_bump() {
        let manifest = Manifest::parse(BIOMEDICAL).unwrap();
        assert!(manifest.build.ensure_version_bump(16).is_ok());

        let err = manifest.build.ensure_version_bump(17).unwrap_err();
        assert!(err.is(ErrorCode::InvalidRange));
    }

    #[test]
    fn test_jvm_target_legacy() {
        let options = CompileOptions {
            java_version: 8,
            core_library_desugaring: false,
        };
        assert_eq!(options.jvm_target(), "1.8");
    }

    #[test]
    fn test_build_config_toml_roundtrip() {
        let build = Manifest::parse(BIOMEDICAL).unwrap().build;
        let reparsed = BuildConfig::from_toml(&build.to_toml().unwrap()).unwrap();
        assert_eq!(build, reparsed);
    }

    proptest! {
        #[test]
        fn prop_build_config_roundtrip(
            min in 1u32..40,
            target_offset in 0u32..10,
            compile_offset in 0u32..10,
            version_code in 1u32..1_000_000,
            major in 0u8..20,
            minor in 0u8..50,
            ndk in proptest::option::of("[0-9]{2}\\.[0-9]\\.[0-9]{8}"),
        ) {
            let build = BuildConfig {
                application_id: "com.example.app".to_string(),
                namespace: "com.example.app".to_string(),
                min_sdk: min,
                target_sdk: min + target_offset,
                compile_sdk: min + target_offset + compile_offset,
                version_code,
                version_name: format!("{}.{}", major, minor),
                ndk_version: ndk,
            };

            let reparsed = BuildConfig::from_toml(&build.to_toml().unwrap()).unwrap();
            prop_assert_eq!(build, reparsed);
        }

        #[test]
        fn prop_valid_manifests_have_ordered_sdks(
            min in 1u32..40,
            target in 1u32..40,
            compile in 1u32..40,
        ) {
            match Manifest::parse(&with_sdk(min, target, compile)) {
                Ok(manifest) => {
                    prop_assert!(manifest.build.min_sdk <= manifest.build.target_sdk);
                    prop_assert!(manifest.build.target_sdk <= manifest.build.compile_sdk);
                }
                Err(err) => {
                    prop_assert!(err.is(ErrorCode::InvalidRange));
                    prop_assert!(min > target || target > compile);
                }
            }
        }
    }
}
