//! # forceauth Domain
//!
//! Domain types shared by every forceauth crate.
//!
//! This crate contains:
//! - Client configuration (`AuthConfig`, `Prompt`)
//! - The closed authentication error taxonomy (`AuthError`)
//! - Storage keys and user info models
//! - Issuer hosts and endpoint paths
//!
//! ## Architecture
//! - No dependencies on other forceauth crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
