//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the agent's TOML configuration from the
//! platform-appropriate directory, writes it back when a consent decision
//! is persisted, and supplies defaults when no file exists yet.

pub mod config;
