//! ---
//! ratchet_section: "04-configuration"
//! ratchet_subsection: "module"
//! ratchet_type: "source"
//! ratchet_scope: "code"
//! ratchet_description: "Configuration, tracing bootstrap and version metadata."
//! ratchet_version: "v0.0.0-prealpha"
//! ratchet_owner: "tbd"
//! ---
//! Shared runtime plumbing for Ratchet binaries.
//! This crate exposes configuration loading, tracing initialisation and
//! version metadata utilities consumed by `ratchetctl`.

pub mod config;
pub mod logging;
pub mod version;

pub use config::{
    AppConfig, DefaultsConfig, EngineConfig, JournalConfig, JournalKind, LoadedAppConfig,
    LoggingConfig, SourceConfig, TargetConfig,
};
pub use logging::{env_filter, init_tracing, LogFormat};
pub use version::{clap_long_version, VersionInfo};
