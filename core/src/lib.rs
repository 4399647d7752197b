//! Warden Core - Foundational Types
//!
//! Foundational types, errors, and the event stream shared across the
//! Warden workspace.

pub mod config;
pub mod error;
pub mod event;

// Re-export commonly used types
pub use config::{DomainResources, HostConfig, LogLevel, RebootConfig};
pub use error::{Result, WardenError};
pub use event::{EventEmitter, HostEvent};

/// Warden version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
