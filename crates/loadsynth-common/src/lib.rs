//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives and utilities for the synthesis runtime."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Shared primitives for the LoadSynth workspace.
//! This crate exposes configuration loading, logging bootstrap, and the
//! timestamp conventions used by pattern files and exported series.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{AppConfig, LoadedAppConfig, LoggingConfig, PathsConfig};
pub use logging::{init_tracing, LogFormat};
pub use time::{format_timestamp, parse_timestamp, TIMESTAMP_FORMAT};
