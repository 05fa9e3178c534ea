//! Memory Accessor - Typed, Ordering-Qualified Raw Access
//!
//! [`MemoryAccessor`] is the single funnel through which every raw load, store
//! and compare-and-swap in the crate passes, whether it targets a field inside
//! a managed object or a bare address in a buffer obtained from
//! [`allocate`](MemoryAccessor::allocate).
//!
//! # Safety
//!
//! Typed access is `unsafe`: nothing on this path validates the location. The
//! caller guarantees that:
//! - the effective address is non-null, naturally aligned and live
//! - the slot was resolved for a kind compatible with the operation
//! - the slot is never accessed non-atomically by another thread at the same
//!   time
//!
//! Debug builds `debug_assert!` the first two. Use
//! [`CheckedAccessor`](checked::CheckedAccessor) to get them reported as
//! `ContractViolation` instead.
//!
//! # Example
//!
//! ```rust
//! use ordo::capability::{CallerIdentity, CapabilityGate};
//! use ordo::location::{Location, OrderingMode, ValueKind};
//! use ordo::memory::MemoryAccessor;
//!
//! let cap = CapabilityGate::global().acquire(&CallerIdentity::platform("doc"))?;
//! let mem = MemoryAccessor::new(&cap);
//!
//! let addr = mem.allocate(8)?;
//! let slot = Location::address(addr, ValueKind::I64);
//! unsafe {
//!     mem.put_i64(slot, OrderingMode::Volatile, 41);
//!     assert!(mem.compare_and_swap_i64(slot, 41, 42));
//!     assert_eq!(mem.get_i64(slot, OrderingMode::AcquireRelease), 42);
//!     mem.free(addr);
//! }
//! # Ok::<(), ordo::OrdoError>(())
//! ```

pub mod buffer;
pub mod checked;
mod intrinsics;

pub use checked::CheckedAccessor;

use crate::barrier::StoreBarrier;
use crate::capability::Capability;
use crate::config::OrdoConfig;
use crate::error::Result;
use crate::fence::FenceUnit;
use crate::location::{Location, OrderingMode, ValueKind};
use crate::offset::array::{ArrayShape, ElementKind};
use crossbeam::utils::Backoff;
use intrinsics::Primitive;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Limits an accessor enforces, taken from [`OrdoConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessLimits {
    /// Largest single allocation forwarded to the system
    pub max_allocation_bytes: usize,

    /// Record buffer operations in `BufferStats`
    pub stats_enabled: bool,
}

impl AccessLimits {
    pub const DEFAULT: AccessLimits = AccessLimits {
        max_allocation_bytes: isize::MAX as usize,
        stats_enabled: true,
    };

    pub fn from_config(config: &OrdoConfig) -> Self {
        Self {
            max_allocation_bytes: config.max_allocation_bytes,
            stats_enabled: config.stats_enabled,
        }
    }
}

impl Default for AccessLimits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

static INTERNAL_CAPABILITY: Capability = Capability::internal();

static INTERNAL: MemoryAccessor<'static> = MemoryAccessor {
    capability: &INTERNAL_CAPABILITY,
    barrier: None,
    limits: AccessLimits::DEFAULT,
};

/// Typed raw memory access, gated by a [`Capability`]
#[derive(Debug, Clone)]
pub struct MemoryAccessor<'c> {
    capability: &'c Capability,
    barrier: Option<Arc<dyn StoreBarrier>>,
    limits: AccessLimits,
}

#[inline(always)]
fn debug_check(loc: &Location, op: ValueKind) {
    let addr = loc.effective_address();
    debug_assert!(addr != 0, "{:?} access through a null location", op);
    debug_assert!(
        loc.kind().accepts(op),
        "{:?} slot at {:#x} accessed as {:?}",
        loc.kind(),
        addr,
        op
    );
    debug_assert!(
        addr % op.align() == 0,
        "misaligned {:?} access at {:#x}",
        op,
        addr
    );
}

#[inline(always)]
fn debug_check_address(loc: &Location) {
    debug_assert!(
        loc.kind() == ValueKind::Reference || loc.kind().size() == ValueKind::Reference.size(),
        "address-width access to a {:?} slot",
        loc.kind()
    );
    debug_check(&loc.with_kind(ValueKind::Reference), ValueKind::Reference);
}

macro_rules! typed_access {
    ($($get:ident, $put:ident => $ty:ty, $kind:expr;)*) => {
        $(
            #[doc = concat!("Read a `", stringify!($ty), "` with the given ordering")]
            ///
            /// # Safety
            ///
            /// See the [module documentation](self).
            #[inline]
            pub unsafe fn $get(&self, loc: Location, mode: OrderingMode) -> $ty {
                debug_check(&loc, $kind);
                unsafe { <$ty as Primitive>::load(loc.effective_address(), mode.load_ordering()) }
            }

            #[doc = concat!("Write a `", stringify!($ty), "` with the given ordering")]
            ///
            /// # Safety
            ///
            /// See the [module documentation](self).
            #[inline]
            pub unsafe fn $put(&self, loc: Location, mode: OrderingMode, value: $ty) {
                debug_check(&loc, $kind);
                unsafe {
                    <$ty as Primitive>::store(loc.effective_address(), value, mode.store_ordering())
                }
            }
        )*
    };
}

macro_rules! cas_access {
    ($($strong:ident, $weak:ident, $swap:ident, $add:ident => $ty:ty, $kind:expr;)*) => {
        $(
            /// Strong compare-and-swap: never fails spuriously, `SeqCst`
            ///
            /// Returns `true` iff the slot held `expected` and now holds `update`.
            ///
            /// # Safety
            ///
            /// See the [module documentation](self).
            #[inline]
            pub unsafe fn $strong(&self, loc: Location, expected: $ty, update: $ty) -> bool {
                debug_check(&loc, $kind);
                let result = unsafe {
                    <$ty as Primitive>::compare_exchange(
                        loc.effective_address(),
                        expected,
                        update,
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                    )
                };
                result.is_ok()
            }

            /// Weak compare-and-swap: may fail spuriously, `Relaxed`
            ///
            /// # Safety
            ///
            /// See the [module documentation](self).
            #[inline]
            pub unsafe fn $weak(&self, loc: Location, expected: $ty, update: $ty) -> bool {
                debug_check(&loc, $kind);
                let result = unsafe {
                    <$ty as Primitive>::compare_exchange_weak(
                        loc.effective_address(),
                        expected,
                        update,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    )
                };
                result.is_ok()
            }

            /// Atomically replace the value, returning the previous one
            ///
            /// # Safety
            ///
            /// See the [module documentation](self).
            pub unsafe fn $swap(&self, loc: Location, value: $ty) -> $ty {
                let backoff = Backoff::new();
                loop {
                    let current =
                        unsafe { <$ty as Primitive>::load(loc.effective_address(), Ordering::SeqCst) };
                    if unsafe { self.$strong(loc, current, value) } {
                        return current;
                    }
                    backoff.spin();
                }
            }

            /// Atomically add `delta` (wrapping), returning the previous value
            ///
            /// # Safety
            ///
            /// See the [module documentation](self).
            pub unsafe fn $add(&self, loc: Location, delta: $ty) -> $ty {
                let backoff = Backoff::new();
                loop {
                    let current =
                        unsafe { <$ty as Primitive>::load(loc.effective_address(), Ordering::SeqCst) };
                    if unsafe { self.$strong(loc, current, current.wrapping_add(delta)) } {
                        return current;
                    }
                    backoff.spin();
                }
            }
        )*
    };
}

impl<'c> MemoryAccessor<'c> {
    /// Accessor with no store barrier and limits from [`OrdoConfig::global`]
    pub fn new(capability: &'c Capability) -> Self {
        Self {
            capability,
            barrier: None,
            limits: AccessLimits::from_config(OrdoConfig::global()),
        }
    }

    /// Accessor with limits from an explicit, validated configuration
    pub fn with_config(capability: &'c Capability, config: &OrdoConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            capability,
            barrier: None,
            limits: AccessLimits::from_config(config),
        })
    }

    /// Install the barrier invoked after reference stores into managed owners
    pub fn with_barrier(mut self, barrier: Arc<dyn StoreBarrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    /// Accessor the crate's own safe wrappers run under
    #[inline(always)]
    pub(crate) fn internal() -> &'static MemoryAccessor<'static> {
        &INTERNAL
    }

    pub fn capability(&self) -> &'c Capability {
        self.capability
    }

    pub fn limits(&self) -> AccessLimits {
        self.limits
    }

    /// Fence primitives under this accessor's capability
    pub fn fences(&self) -> FenceUnit<'c> {
        FenceUnit::new(self.capability)
    }

    typed_access! {
        get_bool, put_bool => bool, ValueKind::Bool;
        get_i8, put_i8 => i8, ValueKind::I8;
        get_i16, put_i16 => i16, ValueKind::I16;
        get_char, put_char => u16, ValueKind::Char;
        get_i32, put_i32 => i32, ValueKind::I32;
        get_i64, put_i64 => i64, ValueKind::I64;
    }

    cas_access! {
        compare_and_swap_i32, weak_compare_and_swap_i32, get_and_set_i32, get_and_add_i32 => i32, ValueKind::I32;
        compare_and_swap_i64, weak_compare_and_swap_i64, get_and_set_i64, get_and_add_i64 => i64, ValueKind::I64;
    }

    /// Read an `f32` through its bit pattern
    ///
    /// # Safety
    ///
    /// See the [module documentation](self).
    #[inline]
    pub unsafe fn get_f32(&self, loc: Location, mode: OrderingMode) -> f32 {
        debug_check(&loc, ValueKind::F32);
        f32::from_bits(unsafe { u32::load(loc.effective_address(), mode.load_ordering()) })
    }

    /// # Safety
    ///
    /// See the [module documentation](self).
    #[inline]
    pub unsafe fn put_f32(&self, loc: Location, mode: OrderingMode, value: f32) {
        debug_check(&loc, ValueKind::F32);
        unsafe { u32::store(loc.effective_address(), value.to_bits(), mode.store_ordering()) }
    }

    /// Read an `f64` through its bit pattern
    ///
    /// # Safety
    ///
    /// See the [module documentation](self).
    #[inline]
    pub unsafe fn get_f64(&self, loc: Location, mode: OrderingMode) -> f64 {
        debug_check(&loc, ValueKind::F64);
        f64::from_bits(unsafe { u64::load(loc.effective_address(), mode.load_ordering()) })
    }

    /// # Safety
    ///
    /// See the [module documentation](self).
    #[inline]
    pub unsafe fn put_f64(&self, loc: Location, mode: OrderingMode, value: f64) {
        debug_check(&loc, ValueKind::F64);
        unsafe { u64::store(loc.effective_address(), value.to_bits(), mode.store_ordering()) }
    }

    // === References ===

    /// Read a reference
    ///
    /// # Safety
    ///
    /// See the [module documentation](self).
    #[inline]
    pub unsafe fn get_reference<T>(&self, loc: Location, mode: OrderingMode) -> *mut T {
        debug_check(&loc, ValueKind::Reference);
        unsafe { intrinsics::load_ptr(loc.effective_address(), mode.load_ordering()) }
    }

    /// Write a reference; runs the store barrier when the owner is non-null
    ///
    /// # Safety
    ///
    /// See the [module documentation](self).
    #[inline]
    pub unsafe fn put_reference<T>(&self, loc: Location, mode: OrderingMode, value: *mut T) {
        debug_check(&loc, ValueKind::Reference);
        unsafe { intrinsics::store_ptr(loc.effective_address(), value, mode.store_ordering()) };
        self.after_reference_store(&loc, value as usize);
    }

    /// Strong reference CAS; a successful swap runs the store barrier
    ///
    /// # Safety
    ///
    /// See the [module documentation](self).
    #[inline]
    pub unsafe fn compare_and_swap_reference<T>(
        &self,
        loc: Location,
        expected: *mut T,
        update: *mut T,
    ) -> bool {
        debug_check(&loc, ValueKind::Reference);
        let swapped =
            unsafe { intrinsics::cas_ptr(loc.effective_address(), expected, update, false) };
        if swapped {
            self.after_reference_store(&loc, update as usize);
        }
        swapped
    }

    /// Weak reference CAS, `Relaxed`
    ///
    /// # Safety
    ///
    /// See the [module documentation](self).
    #[inline]
    pub unsafe fn weak_compare_and_swap_reference<T>(
        &self,
        loc: Location,
        expected: *mut T,
        update: *mut T,
    ) -> bool {
        debug_check(&loc, ValueKind::Reference);
        let swapped =
            unsafe { intrinsics::cas_ptr(loc.effective_address(), expected, update, true) };
        if swapped {
            self.after_reference_store(&loc, update as usize);
        }
        swapped
    }

    /// Atomically replace a reference, returning the previous one
    ///
    /// # Safety
    ///
    /// See the [module documentation](self).
    pub unsafe fn get_and_set_reference<T>(&self, loc: Location, value: *mut T) -> *mut T {
        let backoff = Backoff::new();
        loop {
            let current = unsafe { self.get_reference(loc, OrderingMode::Volatile) };
            if unsafe { self.compare_and_swap_reference(loc, current, value) } {
                return current;
            }
            backoff.spin();
        }
    }

    #[inline]
    fn after_reference_store(&self, loc: &Location, value: usize) {
        if let (Some(owner), Some(barrier)) = (loc.owner(), self.barrier.as_deref()) {
            barrier.on_reference_store(owner, loc.effective_address(), value);
        }
    }

    // === Addresses ===

    /// Read an address-width value
    ///
    /// The slot may be a `Reference` or an integer of pointer width.
    ///
    /// # Safety
    ///
    /// See the [module documentation](self).
    #[inline]
    pub unsafe fn get_address(&self, loc: Location, mode: OrderingMode) -> usize {
        debug_check_address(&loc);
        unsafe { usize::load(loc.effective_address(), mode.load_ordering()) }
    }

    /// Write an address-width value; never runs the store barrier
    ///
    /// # Safety
    ///
    /// See the [module documentation](self).
    #[inline]
    pub unsafe fn put_address(&self, loc: Location, mode: OrderingMode, value: usize) {
        debug_check_address(&loc);
        unsafe { usize::store(loc.effective_address(), value, mode.store_ordering()) }
    }

    // === Metadata ===

    /// Width of a native address in bytes (4 or 8)
    pub fn address_size(&self) -> usize {
        std::mem::size_of::<usize>()
    }

    /// System memory page size in bytes
    pub fn page_size(&self) -> usize {
        page_size::get()
    }

    /// Byte offset of element 0 in a managed array of `kind`
    pub fn array_base_offset(&self, kind: ElementKind) -> usize {
        ArrayShape::of(kind).base_offset()
    }

    /// Distance between consecutive elements; 0 for `Bit`
    pub fn array_element_stride(&self, kind: ElementKind) -> usize {
        ArrayShape::of(kind).stride()
    }
}
