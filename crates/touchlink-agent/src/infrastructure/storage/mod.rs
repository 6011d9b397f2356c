//! Persistent storage for agent settings.

pub mod config;
