//! Infrastructure layer module
//!
//! Adapters behind the domain ports:
//! - Configuration management
//! - Logging infrastructure
//! - Provider admission, retry and registry

pub mod config;
pub mod logging;
pub mod providers;
