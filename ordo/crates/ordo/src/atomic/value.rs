//! Element types an [`AtomicCell`](super::AtomicCell) can hold
//!
//! Each implementation names its [`ValueKind`] and forwards to the matching
//! typed operations of the [`MemoryAccessor`], so a cell's slot is accessed
//! exactly like any other raw location.

use crate::location::{Location, OrderingMode, ValueKind};
use crate::memory::MemoryAccessor;
use std::fmt;

mod sealed {
    pub trait Sealed {}

    impl Sealed for i32 {}
    impl Sealed for i64 {}
    impl<T> Sealed for *mut T {}
}

/// A value that fits one atomically accessible slot
///
/// # Safety
///
/// The `unsafe fn`s carry the accessor's contract: `loc` is a live, aligned
/// slot of kind [`KIND`](Self::KIND).
pub trait CellValue: Copy + PartialEq + fmt::Debug + sealed::Sealed {
    const KIND: ValueKind;

    /// Initial value of a default cell
    const ZERO: Self;

    unsafe fn read(mem: &MemoryAccessor<'_>, loc: Location, mode: OrderingMode) -> Self;

    unsafe fn write(mem: &MemoryAccessor<'_>, loc: Location, mode: OrderingMode, value: Self);

    unsafe fn compare_and_swap(
        mem: &MemoryAccessor<'_>,
        loc: Location,
        expected: Self,
        update: Self,
    ) -> bool;

    unsafe fn weak_compare_and_swap(
        mem: &MemoryAccessor<'_>,
        loc: Location,
        expected: Self,
        update: Self,
    ) -> bool;

    fn fmt_value(self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

/// Integer cell values: arithmetic and numeric conversions
pub trait CellInteger: CellValue {
    const ONE: Self;

    fn wrapping_add(self, delta: Self) -> Self;

    fn wrapping_neg(self) -> Self;

    fn to_i32(self) -> i32;

    fn to_i64(self) -> i64;

    fn to_f32(self) -> f32;

    fn to_f64(self) -> f64;
}

macro_rules! integer_cell_value {
    ($ty:ty, $kind:expr, $get:ident, $put:ident, $cas:ident, $weak:ident) => {
        impl CellValue for $ty {
            const KIND: ValueKind = $kind;
            const ZERO: Self = 0;

            #[inline]
            unsafe fn read(mem: &MemoryAccessor<'_>, loc: Location, mode: OrderingMode) -> Self {
                unsafe { mem.$get(loc, mode) }
            }

            #[inline]
            unsafe fn write(mem: &MemoryAccessor<'_>, loc: Location, mode: OrderingMode, value: Self) {
                unsafe { mem.$put(loc, mode, value) }
            }

            #[inline]
            unsafe fn compare_and_swap(
                mem: &MemoryAccessor<'_>,
                loc: Location,
                expected: Self,
                update: Self,
            ) -> bool {
                unsafe { mem.$cas(loc, expected, update) }
            }

            #[inline]
            unsafe fn weak_compare_and_swap(
                mem: &MemoryAccessor<'_>,
                loc: Location,
                expected: Self,
                update: Self,
            ) -> bool {
                unsafe { mem.$weak(loc, expected, update) }
            }

            fn fmt_value(self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self, f)
            }
        }

        impl CellInteger for $ty {
            const ONE: Self = 1;

            #[inline]
            fn wrapping_add(self, delta: Self) -> Self {
                <$ty>::wrapping_add(self, delta)
            }

            #[inline]
            fn wrapping_neg(self) -> Self {
                <$ty>::wrapping_neg(self)
            }

            #[inline]
            fn to_i32(self) -> i32 {
                self as i32
            }

            #[inline]
            fn to_i64(self) -> i64 {
                self as i64
            }

            #[inline]
            fn to_f32(self) -> f32 {
                self as f32
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

integer_cell_value!(
    i32,
    ValueKind::I32,
    get_i32,
    put_i32,
    compare_and_swap_i32,
    weak_compare_and_swap_i32
);
integer_cell_value!(
    i64,
    ValueKind::I64,
    get_i64,
    put_i64,
    compare_and_swap_i64,
    weak_compare_and_swap_i64
);

impl<T> CellValue for *mut T {
    const KIND: ValueKind = ValueKind::Reference;
    const ZERO: Self = std::ptr::null_mut();

    #[inline]
    unsafe fn read(mem: &MemoryAccessor<'_>, loc: Location, mode: OrderingMode) -> Self {
        unsafe { mem.get_reference(loc, mode) }
    }

    #[inline]
    unsafe fn write(mem: &MemoryAccessor<'_>, loc: Location, mode: OrderingMode, value: Self) {
        unsafe { mem.put_reference(loc, mode, value) }
    }

    #[inline]
    unsafe fn compare_and_swap(
        mem: &MemoryAccessor<'_>,
        loc: Location,
        expected: Self,
        update: Self,
    ) -> bool {
        unsafe { mem.compare_and_swap_reference(loc, expected, update) }
    }

    #[inline]
    unsafe fn weak_compare_and_swap(
        mem: &MemoryAccessor<'_>,
        loc: Location,
        expected: Self,
        update: Self,
    ) -> bool {
        unsafe { mem.weak_compare_and_swap_reference(loc, expected, update) }
    }

    fn fmt_value(self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Pointer::fmt(&self, f)
    }
}
