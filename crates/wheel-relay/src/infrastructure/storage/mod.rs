//! Persistent storage: the optional TOML configuration file.

pub mod config;
