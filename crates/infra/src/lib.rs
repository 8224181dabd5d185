//! # forceauth Infrastructure
//!
//! Host-side implementations around the `forceauth-common` core.
//!
//! This crate contains:
//! - Configuration loading (environment variables and TOML files)
//! - The loopback redirect session and system browser launcher
//! - Tracing initialisation
//!
//! ## Architecture
//! - Implements `AuthSessionLauncher` defined in `forceauth-common`
//! - Depends on `forceauth-domain` and `forceauth-common`
//! - Contains the "impure" code (sockets, processes, environment)

pub mod config;
pub mod observability;
pub mod session;

// Re-export commonly used items
pub use observability::{init_tracing, LogFormat, ObservabilityError};
pub use session::{
    BrowserError, BrowserOpener, LoopbackAuthSession, SystemBrowser, DEFAULT_LOOPBACK_REDIRECT_URI,
};
