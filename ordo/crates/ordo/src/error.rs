//! Error Module - Ordo Error Types
//!
//! Defines all error types surfaced by the raw layer.
//!
//! # Error Categories
//!
//! ## Resource Errors
//! - `OutOfResource` - the system (or the configured ceiling) refused an allocation
//! - `InvalidArgument` - negative or unrepresentable size, malformed layout
//!
//! ## Capability Errors
//! - `PermissionDenied` - caller is not trusted, reported at acquisition time
//!
//! ## Layout Errors
//! - `UnknownMember` - a type or field name that was never registered
//! - `Registry` - the layout arena ran out of indices
//!
//! ## Contract Errors
//! - `ContractViolation` - only produced by [`CheckedAccessor`](crate::memory::CheckedAccessor).
//!   The unchecked hot path never detects these; violating a contract there is
//!   undefined behaviour.

use crate::config::ConfigError;
use ordo_util::IndexVecError;
use thiserror::Error;

/// Main error type for all Ordo operations
///
/// # Examples
///
/// ```rust
/// use ordo::error::OrdoError;
///
/// fn handle_error(err: OrdoError) {
///     match err {
///         OrdoError::OutOfResource { requested, .. } => {
///             eprintln!("allocation of {} bytes refused", requested);
///         }
///         OrdoError::PermissionDenied { caller, .. } => {
///             eprintln!("{} may not use the raw layer", caller);
///         }
///         _ => {
///             eprintln!("Other error: {}", err);
///         }
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum OrdoError {
    /// Allocation refused
    ///
    /// **When returned:** `malloc`/`realloc` returned null, or the request is
    /// above `OrdoConfig::max_allocation_bytes`
    ///
    /// **Recovery strategy:** Release buffers and retry, or fail gracefully
    #[error("Out of resource: allocation of {requested} bytes refused ({reason})")]
    OutOfResource { requested: usize, reason: String },

    /// Invalid argument
    ///
    /// **When returned:** Function argument fails validation
    ///
    /// **Example scenarios:**
    /// - Negative allocation size
    /// - Size that does not fit the platform's address space
    /// - Duplicate field name in a layout
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Caller is not trusted
    ///
    /// **When returned:** [`CapabilityGate::acquire`](crate::capability::CapabilityGate::acquire)
    /// for a caller outside the trusted domains
    ///
    /// **Recovery strategy:** None - the caller must not use the raw layer
    #[error("Permission denied: caller '{caller}' ({domain}) is not trusted")]
    PermissionDenied { caller: String, domain: String },

    /// Unknown type or member
    ///
    /// **When returned:** Resolving a name that was never registered
    #[error("Unknown member: {type_name}::{member}")]
    UnknownMember { type_name: String, member: String },

    /// Contract violation detected by the checked accessor
    ///
    /// **When returned:** Only by `CheckedAccessor`; the unchecked accessor
    /// never validates contracts
    ///
    /// **Action required:** This is a bug in the caller
    #[error("Contract violation in {operation}: {detail}")]
    ContractViolation { operation: String, detail: String },

    /// Layout arena exhausted
    #[error("Layout registry error: {0}")]
    Registry(#[from] IndexVecError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl OrdoError {
    /// Check if this error is recoverable by the caller
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            OrdoError::OutOfResource { .. } | OrdoError::InvalidArgument(_)
        )
    }

    /// Check if this error indicates a bug in the calling code
    pub fn is_bug(&self) -> bool {
        matches!(
            self,
            OrdoError::ContractViolation { .. } | OrdoError::UnknownMember { .. }
        )
    }

    pub(crate) fn contract(operation: &str, detail: impl Into<String>) -> Self {
        OrdoError::ContractViolation {
            operation: operation.to_string(),
            detail: detail.into(),
        }
    }
}

/// Result type alias for Ordo operations
pub type Result<T> = std::result::Result<T, OrdoError>;

/// Ensure condition is true, otherwise return error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}
