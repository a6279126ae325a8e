//! Terminal output utilities
//!
//! Provides consistent formatting for CLI output.

use buildcfg_android::{ResolvedManifest, SigningMode};
use buildcfg_core::error::Error;
use buildcfg_core::validation::ValidationError;
use owo_colors::OwoColorize;

/// Status message helpers
pub struct Status;

impl Status {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue(), message);
    }

    /// Print a header
    pub fn header(message: &str) {
        println!();
        println!("{}", message.bold());
        println!("{}", "─".repeat(message.chars().count()));
    }
}

/// Print a structured error with its code, context and suggestion
pub fn print_error(err: &Error) {
    Status::error(&format!("{} {}", err.code.to_string().dimmed(), err.message));
    if let Some(context) = &err.context {
        eprintln!("  {} {}", "context:".dimmed(), context);
    }
    if let Some(suggestion) = &err.suggestion {
        eprintln!("  {} {}", "help:".cyan(), suggestion);
    }
}

/// Print validation warnings
pub fn print_warnings(warnings: &[ValidationError]) {
    for warning in warnings {
        Status::warning(&warning.to_string());
    }
}

/// Human-readable summary of a resolved manifest
pub fn summary_lines(resolved: &ResolvedManifest) -> Vec<String> {
    let build = &resolved.build;
    let signing = match resolved.signing_mode() {
        SigningMode::Release { key_alias } => format!("release key `{}`", key_alias),
        SigningMode::DebugFallback => "debug keystore (no credentials)".to_string(),
    };

    vec![
        format!("{} {} ({})", build.application_id, build.version_name, build.version_code),
        format!(
            "SDK min {} / target {} / compile {}",
            build.min_sdk, build.target_sdk, build.compile_sdk
        ),
        format!(
            "{}, {}",
            format_count(resolved.dependencies.len(), "dependency", "dependencies"),
            format_count(resolved.build_types.len(), "build type", "build types")
        ),
        format!("Signing: {}", signing),
    ]
}

/// Print the summary of a resolved manifest
pub fn print_summary(resolved: &ResolvedManifest) {
    Status::header("Build manifest");
    for line in summary_lines(resolved) {
        println!("  {}", line);
    }
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildcfg_android::{BuildConfig, BuildType, CompileOptions};

    fn resolved() -> ResolvedManifest {
        ResolvedManifest {
            build: BuildConfig {
                application_id: "com.example.biomedical".to_string(),
                namespace: "com.example.biomedical".to_string(),
                min_sdk: 24,
                target_sdk: 36,
                compile_sdk: 36,
                version_code: 17,
                version_name: "1.4.1".to_string(),
                ndk_version: None,
            },
            compile_options: CompileOptions::default(),
            build_types: vec![BuildType {
                name: "release".to_string(),
                minify: false,
                shrink_resources: false,
                proguard_files: Vec::new(),
                signed: true,
            }],
            dependencies: Vec::new(),
            signing: None,
            manifest_path: "build-manifest.toml".into(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_summary_lines() {
        let lines = summary_lines(&resolved());
        assert_eq!(lines[0], "com.example.biomedical 1.4.1 (17)");
        assert_eq!(lines[1], "SDK min 24 / target 36 / compile 36");
        assert_eq!(lines[2], "0 dependencies, 1 build type");
        assert!(lines[3].contains("debug keystore"));
    }

    #[test]
    fn test_format_count_singular() {
        assert_eq!(format_count(1, "dependency", "dependencies"), "1 dependency");
    }

    #[test]
    fn test_format_count_plural() {
        assert_eq!(format_count(5, "dependency", "dependencies"), "5 dependencies");
    }
}
