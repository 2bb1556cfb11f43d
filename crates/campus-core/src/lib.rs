//! Campus Core Library
//!
//! Shared functionality for Campus components:
//! - Configuration resolution and hierarchy
//! - Server target store with explicit change notification
//! - Tracing initialisation
//! - Common error types

pub mod config;
pub mod error;
pub mod server;
pub mod tracing_init;

pub use config::{Config, SecurityMode};
pub use error::{Error, Result};
pub use server::ServerTarget;
