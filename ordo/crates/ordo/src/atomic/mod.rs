//! Atomic Cell - One Value, Lock-Free Updates
//!
//! [`AtomicCell<T>`] holds a single `i32`, `i64` or raw reference inline and
//! routes every access through the raw [`MemoryAccessor`] under the crate's
//! internal capability. It never allocates and never blocks.
//!
//! ```text
//! get / set                  Volatile load / store
//! lazy_set                   Opaque store
//! compare_and_set            strong CAS, SeqCst
//! weak_compare_and_set       one weak CAS, Relaxed, may fail spuriously
//! get_and_* / *_and_get      CAS retry loop
//! ```
//!
//! The retry combinators loop until their CAS succeeds. Under sustained
//! contention a particular thread can lose indefinitely; the operation is
//! lock-free, not wait-free.
//!
//! # Example
//!
//! ```rust
//! use ordo::AtomicCell;
//!
//! let cell = AtomicCell::new(10);
//! assert_eq!(cell.accumulate_and_get(5, i32::max), 10);
//! assert_eq!(cell.accumulate_and_get(15, i32::max), 15);
//! assert!(cell.compare_and_set(15, 0));
//! assert_eq!(cell.get_and_increment(), 0);
//! ```

pub mod value;

pub use value::{CellInteger, CellValue};

use crate::config::{OrdoConfig, DEFAULT_WEAK_CAS_SPIN_LIMIT};
use crate::location::{Location, OrderingMode};
use crate::memory::MemoryAccessor;
use crossbeam::utils::Backoff;
use std::cell::UnsafeCell;
use std::fmt;

/// Default bound on attempts made by [`AtomicCell::weak_compare_and_set_spin`]
///
/// Overridden process-wide by `ORDO_WEAK_CAS_SPIN_LIMIT`.
pub const WEAK_CAS_SPIN_LIMIT: u32 = DEFAULT_WEAK_CAS_SPIN_LIMIT;

/// Offset of the value inside a cell; `repr(transparent)` pins it for every `T`
const VALUE_OFFSET: usize = std::mem::offset_of!(AtomicCell<i64>, value);

/// Cell holding an `i32`
pub type AtomicI32Cell = AtomicCell<i32>;

/// Cell holding an `i64`
pub type AtomicI64Cell = AtomicCell<i64>;

/// Cell holding a raw reference
pub type AtomicReference<T> = AtomicCell<*mut T>;

/// A value updated atomically
#[repr(transparent)]
pub struct AtomicCell<T: CellValue> {
    value: UnsafeCell<T>,
}

// SAFETY: the slot is only accessed through atomic operations
unsafe impl<T: CellValue> Send for AtomicCell<T> {}
unsafe impl<T: CellValue> Sync for AtomicCell<T> {}

impl<T: CellValue> AtomicCell<T> {
    pub const fn new(value: T) -> Self {
        Self {
            value: UnsafeCell::new(value),
        }
    }

    #[inline(always)]
    fn slot(&self) -> Location {
        Location::in_object(self as *const Self, VALUE_OFFSET, T::KIND)
    }

    #[inline(always)]
    fn mem() -> &'static MemoryAccessor<'static> {
        MemoryAccessor::internal()
    }

    /// Current value (Volatile read)
    #[inline]
    pub fn get(&self) -> T {
        // SAFETY: slot() is this cell's own aligned, live value of kind T::KIND
        unsafe { T::read(Self::mem(), self.slot(), OrderingMode::Volatile) }
    }

    /// Store `value` (Volatile write)
    #[inline]
    pub fn set(&self, value: T) {
        unsafe { T::write(Self::mem(), self.slot(), OrderingMode::Volatile, value) }
    }

    /// Store `value` with Opaque ordering
    ///
    /// Prior writes of this thread are not reordered past it, but it may
    /// become visible to other threads later than a `set` would.
    #[inline]
    pub fn lazy_set(&self, value: T) {
        unsafe { T::write(Self::mem(), self.slot(), OrderingMode::Opaque, value) }
    }

    /// Replace `expected` with `update`; never fails spuriously
    #[inline]
    pub fn compare_and_set(&self, expected: T, update: T) -> bool {
        unsafe { T::compare_and_swap(Self::mem(), self.slot(), expected, update) }
    }

    /// One weak CAS attempt, Relaxed; may fail even when the value matches
    #[inline]
    pub fn weak_compare_and_set(&self, expected: T, update: T) -> bool {
        unsafe { T::weak_compare_and_swap(Self::mem(), self.slot(), expected, update) }
    }

    /// Weak CAS retried while the value still equals `expected`
    ///
    /// Gives up after the configured spin limit (64 by default). A `false`
    /// result means either the value differs or every attempt failed
    /// spuriously.
    pub fn weak_compare_and_set_spin(&self, expected: T, update: T) -> bool {
        let limit = OrdoConfig::global().weak_cas_spin_limit.max(1);
        let backoff = Backoff::new();

        for _ in 0..limit {
            if self.weak_compare_and_set(expected, update) {
                return true;
            }
            let observed = unsafe { T::read(Self::mem(), self.slot(), OrderingMode::Plain) };
            if observed != expected {
                return false;
            }
            backoff.spin();
        }
        false
    }

    /// Store `value`, returning the previous value
    pub fn get_and_set(&self, value: T) -> T {
        self.update(|_| value).0
    }

    /// Apply `f`, returning the previous value
    ///
    /// `f` may run several times under contention and must not have side
    /// effects.
    pub fn get_and_update<F>(&self, f: F) -> T
    where
        F: Fn(T) -> T,
    {
        self.update(f).0
    }

    /// Apply `f`, returning the new value
    pub fn update_and_get<F>(&self, f: F) -> T
    where
        F: Fn(T) -> T,
    {
        self.update(f).1
    }

    /// Combine the current value with `x`, returning the previous value
    pub fn get_and_accumulate<F>(&self, x: T, f: F) -> T
    where
        F: Fn(T, T) -> T,
    {
        self.update(|current| f(current, x)).0
    }

    /// Combine the current value with `x`, returning the new value
    pub fn accumulate_and_get<F>(&self, x: T, f: F) -> T
    where
        F: Fn(T, T) -> T,
    {
        self.update(|current| f(current, x)).1
    }

    /// Consume the cell, returning its value
    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }

    /// Mutable access; no other thread can observe the cell meanwhile
    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    /// CAS loop shared by every combinator; returns `(previous, new)`
    fn update<F>(&self, f: F) -> (T, T)
    where
        F: Fn(T) -> T,
    {
        let backoff = Backoff::new();
        let mut previous = self.get();
        loop {
            let next = f(previous);
            if self.compare_and_set(previous, next) {
                return (previous, next);
            }
            backoff.spin();
            previous = self.get();
        }
    }
}

impl<T: CellInteger> AtomicCell<T> {
    /// Add `delta` (wrapping), returning the previous value
    pub fn get_and_add(&self, delta: T) -> T {
        self.update(|v| v.wrapping_add(delta)).0
    }

    /// Add `delta` (wrapping), returning the new value
    pub fn add_and_get(&self, delta: T) -> T {
        self.update(|v| v.wrapping_add(delta)).1
    }

    pub fn get_and_increment(&self) -> T {
        self.get_and_add(T::ONE)
    }

    pub fn get_and_decrement(&self) -> T {
        self.get_and_add(T::ONE.wrapping_neg())
    }

    pub fn increment_and_get(&self) -> T {
        self.add_and_get(T::ONE)
    }

    pub fn decrement_and_get(&self) -> T {
        self.add_and_get(T::ONE.wrapping_neg())
    }

    /// Current value truncated or widened to `i32`
    pub fn int_value(&self) -> i32 {
        self.get().to_i32()
    }

    pub fn long_value(&self) -> i64 {
        self.get().to_i64()
    }

    pub fn float_value(&self) -> f32 {
        self.get().to_f32()
    }

    pub fn double_value(&self) -> f64 {
        self.get().to_f64()
    }
}

impl<T: CellValue> Default for AtomicCell<T> {
    fn default() -> Self {
        Self::new(T::ZERO)
    }
}

impl<T: CellValue> From<T> for AtomicCell<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: CellValue> fmt::Debug for AtomicCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicCell").field(&self.get()).finish()
    }
}

impl<T: CellValue> fmt::Display for AtomicCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.get().fmt_value(f)
    }
}
