use thiserror::Error;

/// Warden error types
#[derive(Error, Debug)]
pub enum WardenError {
    /// Malformed backend device record
    #[error("backend record parse error: {0}")]
    Parse(String),

    /// Backend sequence is at its fixed capacity
    #[error("backend capacity exceeded ({capacity} records)")]
    CapacityExceeded { capacity: usize },

    /// Assigned domain id differs from the requested identity
    #[error("domain identity mismatch: requested {requested}, assigned {assigned}")]
    DomainIdentityMismatch { requested: u32, assigned: u32 },

    /// External domain creation call failed
    #[error("failed to create domain '{domain}': {message}")]
    Creation { domain: String, message: String },

    /// Post-creation backend attachment failed
    #[error("failed to attach backends for domain '{domain}': {message}")]
    Attach { domain: String, message: String },

    /// External container runtime call returned a non-zero code
    #[error("runtime call '{op}' failed with code {code}")]
    RuntimeInvocation { op: &'static str, code: i32 },

    /// Persistent store read failed
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation not available for this workload mechanism
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WardenError {
    /// Returns the wrapped OS-style code for runtime invocation failures.
    pub fn runtime_code(&self) -> Option<i32> {
        match self {
            Self::RuntimeInvocation { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias for Warden operations
pub type Result<T> = std::result::Result<T, WardenError>;
