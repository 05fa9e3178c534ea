//! # Ordo - Raw Memory Access and Atomic Cells for Lock-Free Code
//!
//! Ordo is the layer lock-free data structures are built on: typed,
//! ordering-qualified access to object fields and raw buffers, a single
//! compare-and-swap primitive per width, memory fences, and an
//! [`AtomicCell<T>`] with retry-based update combinators on top.
//!
//! ## Overview
//!
//! - **Memory accessor**: get/put/CAS at a `(base, offset)` or bare address in
//!   four ordering strengths; allocate/resize/free/fill/copy of raw buffers
//! - **Offset resolver**: register a type layout once, resolve members to
//!   `Copy` handles, array base offset and stride per element kind
//! - **Fences**: acquire, release and full fences
//! - **Atomic cell**: get/set/lazy_set, strong and weak CAS, get-and-add,
//!   functional update and accumulate loops
//! - **Capability gate**: only trusted callers obtain the raw layer
//!
//! ## Quick Start
//!
//! ```rust
//! use ordo::AtomicCell;
//!
//! static HITS: AtomicCell<i64> = AtomicCell::new(0);
//!
//! HITS.increment_and_get();
//! HITS.get_and_add(9);
//! assert_eq!(HITS.get(), 10);
//! assert_eq!(HITS.update_and_get(|v| v * 2), 20);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │          AtomicCell<T>          direct callers        │
//! │      (internal capability)   (Capability from gate)   │
//! └──────────────┬───────────────────────┬────────────────┘
//!                │                       │
//!                ▼                       ▼
//! ┌───────────────────────────────────────────────────────┐
//! │                    MemoryAccessor                     │
//! │  get/put/CAS per width    buffers    array metadata   │
//! │           │                                           │
//! │           └── reference store ──► StoreBarrier        │
//! └──────────────┬───────────────────────┬────────────────┘
//!                │                       │
//!        Location (base, offset)     FenceUnit
//!                ▲
//! ┌──────────────┴────────────────────────────────────────┐
//! │   LayoutRegistry: TypeId/FieldId arenas (ordo-util)   │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! ### Ordering Modes
//!
//! | Mode | load | store |
//! |------|------|-------|
//! | `Plain` | Relaxed | Relaxed |
//! | `Opaque` | Relaxed | Release |
//! | `AcquireRelease` | Acquire | Release |
//! | `Volatile` | SeqCst | SeqCst |
//!
//! ## Safety
//!
//! The raw accessor does not validate anything on its hot path. Its typed
//! operations are `unsafe fn`s whose contract is:
//!
//! 1. **Live memory**: the effective address is non-null and points into memory
//!    that is allocated and not yet freed
//! 2. **Alignment**: the address is aligned to the width of the access
//! 3. **Kind**: the slot was resolved for a compatible value kind
//! 4. **No data races**: a slot accessed atomically is never also accessed
//!    non-atomically at the same time
//!
//! [`CheckedAccessor`](memory::CheckedAccessor) validates 1-3 and reports
//! violations as [`OrdoError::ContractViolation`].
//!
//! ### Thread Safety
//!
//! - `AtomicCell<T>` is `Send + Sync`; every operation is lock-free
//! - `LayoutRegistry` is `Send + Sync`; registration takes a write lock
//! - Raw buffers are single-owner; freeing one while another thread uses it is
//!   undefined behaviour
//!
//! ## Example: Raw Access
//!
//! ```rust
//! use ordo::capability::{CallerIdentity, CapabilityGate};
//! use ordo::location::{OrderingMode, ValueKind};
//! use ordo::memory::MemoryAccessor;
//! use ordo::offset::{LayoutRegistry, TypeLayoutBuilder};
//!
//! #[repr(C)]
//! struct Node {
//!     count: i32,
//!     next: *mut Node,
//! }
//!
//! let cap = CapabilityGate::global().acquire(&CallerIdentity::platform("node-list"))?;
//! let mem = MemoryAccessor::new(&cap);
//!
//! let registry = LayoutRegistry::new();
//! let id = registry.register(
//!     TypeLayoutBuilder::for_type::<Node>("Node")
//!         .field_at("count", ValueKind::I32, std::mem::offset_of!(Node, count))
//!         .field_at("next", ValueKind::Reference, std::mem::offset_of!(Node, next)),
//! )?;
//! let count = registry.resolve_in(id, "count")?;
//!
//! let mut node = Node { count: 0, next: std::ptr::null_mut() };
//! let slot = count.at(std::ptr::addr_of_mut!(node).cast_const());
//! unsafe {
//!     assert!(mem.compare_and_swap_i32(slot, 0, 5));
//!     assert_eq!(mem.get_i32(slot, OrderingMode::AcquireRelease), 5);
//! }
//! # Ok::<(), ordo::OrdoError>(())
//! ```
//!
//! ## Modules
//!
//! - [`atomic`]: `AtomicCell<T>` and its value types
//! - [`barrier`]: store barrier hook for memory managers
//! - [`capability`]: trusted-caller gate
//! - [`config`]: configuration parameters and validation
//! - [`error`]: error types for all Ordo operations
//! - [`fence`]: fence primitives
//! - [`location`]: locations, value kinds and ordering modes
//! - [`logging`]: structured event log
//! - [`memory`]: typed raw access, buffers, checked wrapper
//! - [`offset`]: layout registry and array shapes
//! - [`stats`]: buffer statistics
//! - [`util`]: alignment helpers
//!
//! ## Limitations
//!
//! - **Starvation**: CAS retry loops are lock-free, not wait-free
//! - **Plain mode**: maps to `Relaxed` atomics, never to non-atomic access
//! - **64-bit atomics**: targets without native 64-bit atomics are unsupported

// Raw layer
pub mod location;
pub mod memory;
pub mod offset;
pub mod fence;

// Values built on the raw layer
pub mod atomic;

// Access control and memory-manager hooks
pub mod barrier;
pub mod capability;

// Ambient
pub mod config;
pub mod error;
pub mod logging;
pub mod stats;

// Utilities
pub mod util;

// Re-export main types for convenience
pub use atomic::{AtomicCell, AtomicI32Cell, AtomicI64Cell, AtomicReference};
pub use capability::{CallerIdentity, Capability, CapabilityGate};
pub use config::OrdoConfig;
pub use error::{OrdoError, Result};
pub use location::{Location, OrderingMode, ValueKind};
pub use memory::{CheckedAccessor, MemoryAccessor};

/// Ordo version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize Ordo from the environment
///
/// Validates [`OrdoConfig::global`] and, when `verbose` is set, echoes raw
/// layer events to the console. Calling it is optional; every component
/// works with defaults.
///
/// # Examples
///
/// ```rust
/// ordo::init()?;
/// # Ok::<(), ordo::OrdoError>(())
/// ```
pub fn init() -> Result<()> {
    init_with_config(OrdoConfig::global())
}

/// Initialize Ordo with a custom configuration
///
/// Only logging is affected; accessors and gates read their own
/// configuration when they are built.
pub fn init_with_config(config: &OrdoConfig) -> Result<()> {
    config.validate()?;

    if config.verbose {
        logging::configure_logger(logging::LoggerConfig {
            level: logging::LogLevel::Debug,
            console: true,
            ..Default::default()
        });
    }

    log::debug!(
        "ordo {} initialized (debug_checks={}, weak_cas_spin_limit={})",
        VERSION,
        config.debug_checks,
        config.weak_cas_spin_limit
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_default() {
        assert!(init_with_config(&OrdoConfig::default()).is_ok());
    }

    #[test]
    fn test_init_rejects_invalid_config() {
        let config = OrdoConfig {
            weak_cas_spin_limit: 0,
            ..Default::default()
        };
        assert!(matches!(
            init_with_config(&config),
            Err(OrdoError::Configuration(_))
        ));
    }

    #[test]
    fn test_version_not_empty() {
        assert!(!VERSION.is_empty());
    }
}
