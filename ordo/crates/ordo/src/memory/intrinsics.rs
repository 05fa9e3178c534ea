//! Per-width atomic primitives over raw addresses
//!
//! Every typed accessor operation bottoms out here: the address is turned into
//! the matching `Atomic*` view with `from_ptr` and the access is performed
//! with the requested ordering.

use std::sync::atomic::{
    AtomicBool, AtomicI16, AtomicI32, AtomicI64, AtomicI8, AtomicPtr, AtomicU16, AtomicU32,
    AtomicU64, AtomicUsize, Ordering,
};

/// A value with a same-width atomic type
///
/// # Safety
///
/// Every function requires `addr` to be non-null, aligned to `Self`, valid
/// for reads and writes of `size_of::<Self>()` bytes, and not accessed
/// non-atomically by another thread for the duration of the call.
pub(crate) trait Primitive: Copy + PartialEq {
    unsafe fn load(addr: usize, order: Ordering) -> Self;

    unsafe fn store(addr: usize, value: Self, order: Ordering);

    unsafe fn compare_exchange(
        addr: usize,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;

    unsafe fn compare_exchange_weak(
        addr: usize,
        current: Self,
        new: Self,
        success: Ordering,
        failure: Ordering,
    ) -> Result<Self, Self>;
}

macro_rules! primitive {
    ($($ty:ty => $atomic:ty),* $(,)?) => {
        $(
            impl Primitive for $ty {
                #[inline(always)]
                unsafe fn load(addr: usize, order: Ordering) -> Self {
                    let slot = unsafe { <$atomic>::from_ptr(addr as *mut $ty) };
                    slot.load(order)
                }

                #[inline(always)]
                unsafe fn store(addr: usize, value: Self, order: Ordering) {
                    let slot = unsafe { <$atomic>::from_ptr(addr as *mut $ty) };
                    slot.store(value, order)
                }

                #[inline(always)]
                unsafe fn compare_exchange(
                    addr: usize,
                    current: Self,
                    new: Self,
                    success: Ordering,
                    failure: Ordering,
                ) -> Result<Self, Self> {
                    let slot = unsafe { <$atomic>::from_ptr(addr as *mut $ty) };
                    slot.compare_exchange(current, new, success, failure)
                }

                #[inline(always)]
                unsafe fn compare_exchange_weak(
                    addr: usize,
                    current: Self,
                    new: Self,
                    success: Ordering,
                    failure: Ordering,
                ) -> Result<Self, Self> {
                    let slot = unsafe { <$atomic>::from_ptr(addr as *mut $ty) };
                    slot.compare_exchange_weak(current, new, success, failure)
                }
            }
        )*
    };
}

primitive! {
    bool => AtomicBool,
    i8 => AtomicI8,
    i16 => AtomicI16,
    u16 => AtomicU16,
    i32 => AtomicI32,
    u32 => AtomicU32,
    i64 => AtomicI64,
    u64 => AtomicU64,
    usize => AtomicUsize,
}

/// Reference slots go through `AtomicPtr` to keep pointer provenance
#[inline(always)]
pub(crate) unsafe fn load_ptr<T>(addr: usize, order: Ordering) -> *mut T {
    let slot = unsafe { AtomicPtr::<T>::from_ptr(addr as *mut *mut T) };
    slot.load(order)
}

#[inline(always)]
pub(crate) unsafe fn store_ptr<T>(addr: usize, value: *mut T, order: Ordering) {
    let slot = unsafe { AtomicPtr::<T>::from_ptr(addr as *mut *mut T) };
    slot.store(value, order)
}

#[inline(always)]
pub(crate) unsafe fn cas_ptr<T>(
    addr: usize,
    current: *mut T,
    new: *mut T,
    weak: bool,
) -> bool {
    let slot = unsafe { AtomicPtr::<T>::from_ptr(addr as *mut *mut T) };
    if weak {
        slot.compare_exchange_weak(current, new, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    } else {
        slot.compare_exchange(current, new, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_round_trip() {
        let mut slot: i64 = 0;
        let addr = &mut slot as *mut i64 as usize;

        unsafe {
            i64::store(addr, -7, Ordering::SeqCst);
            assert_eq!(i64::load(addr, Ordering::SeqCst), -7);
            assert_eq!(
                i64::compare_exchange(addr, -7, 9, Ordering::SeqCst, Ordering::SeqCst),
                Ok(-7)
            );
            assert_eq!(
                i64::compare_exchange(addr, -7, 1, Ordering::SeqCst, Ordering::SeqCst),
                Err(9)
            );
        }
    }

    #[test]
    fn test_pointer_cas() {
        let mut target = 5u32;
        let mut slot: *mut u32 = std::ptr::null_mut();
        let addr = &mut slot as *mut *mut u32 as usize;

        unsafe {
            assert!(cas_ptr(addr, std::ptr::null_mut(), &mut target, false));
            assert_eq!(load_ptr::<u32>(addr, Ordering::Acquire), &mut target as *mut u32);
            assert!(!cas_ptr::<u32>(addr, std::ptr::null_mut(), std::ptr::null_mut(), false));
        }
    }
}
