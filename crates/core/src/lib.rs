//! Core utilities for the buildcfg manifest resolver
//!
//! This crate provides the shared plumbing used by the Android manifest
//! loader and the CLI:
//!
//! - **Error handling**: coded errors with context, suggestions and exit codes
//! - **Configuration**: `.buildcfg.toml` tool settings with defaults
//! - **Validation**: field-level checks that collect every problem at once
//!
//! # Example
//!
//! ```rust,no_run
//! use buildcfg_core::config::Config;
//!
//! let config = Config::load(None).expect("invalid .buildcfg.toml");
//! println!("manifest: {}", config.schema.general.manifest);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod validation;

pub use error::{Error, ErrorCode, Result, ResultExt};
