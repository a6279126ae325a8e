//! buildcfg CLI
//!
//! Validates an Android build manifest and emits the normalized record for
//! the packaging step. The exit status tells the pipeline whether to proceed.

use anyhow::Result;
use buildcfg_android::{ManifestLoader, ResolvedManifest, SigningMode};
use buildcfg_cli::logging::{self, LoggingConfig};
use buildcfg_cli::output::{self, Status};
use buildcfg_core::config::Config;
use buildcfg_core::error::{exit_codes, Error};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser)]
#[command(name = "buildcfg")]
#[command(about = "Validate and normalize Android build manifests")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase output verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Report errors and log lines as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the manifest and credentials
    Check {
        /// Manifest path (defaults to the configured manifest)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
        /// Fail when no signing credential is available
        #[arg(long)]
        require_signing: bool,
        /// Version code of the previous release; this one must be higher
        #[arg(long)]
        previous_version_code: Option<u32>,
        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },

    /// Print the normalized build configuration
    Resolve {
        /// Manifest path (defaults to the configured manifest)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print only the configuration fingerprint
        #[arg(long)]
        fingerprint: bool,
    },

    /// Report the signing mode and verify the keystore
    Signing {
        /// Manifest path (defaults to the configured manifest)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Toml,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        owo_colors::set_override(false);
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => std::process::exit(report_error(&e, cli.json)),
    };

    logging::init(
        &LoggingConfig::from_verbosity(&config.schema.logging.level, cli.verbose, cli.quiet)
            .with_json(cli.json),
    )?;
    debug!(config = ?config.path, "Loaded tool configuration");

    let default_manifest = PathBuf::from(&config.schema.general.manifest);
    let manifest_or_default =
        |manifest: Option<PathBuf>| manifest.unwrap_or_else(|| default_manifest.clone());

    let result = match cli.command {
        Commands::Check {
            manifest,
            require_signing,
            previous_version_code,
            strict,
        } => run_check(
            &manifest_or_default(manifest),
            &config,
            require_signing,
            previous_version_code,
            strict,
            cli.quiet,
        ),
        Commands::Resolve {
            manifest,
            format,
            output,
            fingerprint,
        } => run_resolve(
            &manifest_or_default(manifest),
            &config,
            format,
            output.as_deref(),
            fingerprint,
        ),
        Commands::Signing { manifest } => {
            run_signing(&manifest_or_default(manifest), &config, cli.quiet)
        }
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => report_error(&e, cli.json),
    };

    std::process::exit(exit_code);
}

fn report_error(err: &Error, json: bool) -> i32 {
    if json {
        match serde_json::to_string_pretty(&err.to_report()) {
            Ok(report) => eprintln!("{}", report),
            Err(_) => output::print_error(err),
        }
    } else {
        output::print_error(err);
    }
    err.code.exit_code()
}

fn loader(config: &Config, require_signing: bool) -> ManifestLoader {
    let loader = ManifestLoader::from_config(&config.schema);
    if require_signing {
        loader.require_signing(true)
    } else {
        loader
    }
}

fn run_check(
    manifest: &Path,
    config: &Config,
    require_signing: bool,
    previous_version_code: Option<u32>,
    strict: bool,
    quiet: bool,
) -> buildcfg_core::Result<i32> {
    let resolved = loader(config, require_signing).load(manifest)?;

    if let Some(previous) = previous_version_code {
        resolved.build.ensure_version_bump(previous)?;
    }

    output::print_warnings(&resolved.warnings);
    if strict && !resolved.warnings.is_empty() {
        Status::error(&format!(
            "{} with --strict",
            output::format_count(resolved.warnings.len(), "warning", "warnings")
        ));
        return Ok(exit_codes::VALIDATION_ERROR);
    }

    if !quiet {
        output::print_summary(&resolved);
        println!();
        Status::success(&format!("{} is valid", manifest.display()));
    }

    Ok(exit_codes::SUCCESS)
}

fn run_resolve(
    manifest: &Path,
    config: &Config,
    format: Format,
    output_path: Option<&Path>,
    fingerprint: bool,
) -> buildcfg_core::Result<i32> {
    let resolved = loader(config, false).load(manifest)?;
    output::print_warnings(&resolved.warnings);

    let rendered = if fingerprint {
        format!("{}\n", resolved.fingerprint()?)
    } else {
        render(&resolved, format)?
    };

    match output_path {
        Some(path) => {
            std::fs::write(path, rendered)?;
            debug!(path = %path.display(), "Wrote resolved manifest");
        }
        None => print!("{}", rendered),
    }

    Ok(exit_codes::SUCCESS)
}

fn render(resolved: &ResolvedManifest, format: Format) -> buildcfg_core::Result<String> {
    match format {
        Format::Json => Ok(format!("{}\n", resolved.to_json()?)),
        Format::Toml => resolved.to_toml(),
    }
}

fn run_signing(manifest: &Path, config: &Config, quiet: bool) -> buildcfg_core::Result<i32> {
    let resolved = loader(config, false).load(manifest)?;

    match (resolved.signing_mode(), &resolved.signing) {
        (SigningMode::Release { key_alias }, Some(credential)) => {
            credential.ensure_keystore_exists()?;
            if !quiet {
                Status::success(&format!(
                    "Release signing with key `{}` from {}",
                    key_alias,
                    credential.keystore_path.display()
                ));
            }
        }
        _ => {
            let signed: Vec<&str> = resolved
                .signed_build_types()
                .map(|b| b.name.as_str())
                .collect();
            if signed.is_empty() {
                if !quiet {
                    Status::info("No build type requires release signing");
                }
            } else {
                Status::warning(&format!(
                    "No signing credential; {} will use the debug keystore",
                    signed.join(", ")
                ));
            }
        }
    }

    Ok(exit_codes::SUCCESS)
}
