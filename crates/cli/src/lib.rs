//! CLI utilities for the buildcfg resolver
//!
//! Provides shared CLI functionality:
//! - Terminal status messages
//! - Report rendering for resolved manifests
//! - Tracing subscriber setup

#![warn(missing_docs)]

pub mod logging;
pub mod output;
