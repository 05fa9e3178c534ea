//! Fence Unit - Ordering Independent of Any One Variable
//!
//! ```text
//! load_fence   Acquire   loads before it are not reordered with anything after
//! store_fence  Release   stores after it are not reordered with anything before
//! full_fence   SeqCst    both, plus a single total order of full fences
//! ```

use crate::capability::Capability;
use std::sync::atomic::{fence, Ordering};

/// Fence primitives, available to a [`Capability`] holder
#[derive(Debug, Clone, Copy)]
pub struct FenceUnit<'c> {
    capability: &'c Capability,
}

impl<'c> FenceUnit<'c> {
    pub fn new(capability: &'c Capability) -> Self {
        Self { capability }
    }

    pub fn capability(&self) -> &'c Capability {
        self.capability
    }

    #[inline]
    pub fn load_fence(&self) {
        fence(Ordering::Acquire);
    }

    #[inline]
    pub fn store_fence(&self) {
        fence(Ordering::Release);
    }

    #[inline]
    pub fn full_fence(&self) {
        fence(Ordering::SeqCst);
    }
}

/// Acquire fence
#[inline]
pub fn load_fence(capability: &Capability) {
    FenceUnit::new(capability).load_fence();
}

/// Release fence
#[inline]
pub fn store_fence(capability: &Capability) {
    FenceUnit::new(capability).store_fence();
}

/// Sequentially consistent fence
#[inline]
pub fn full_fence(capability: &Capability) {
    FenceUnit::new(capability).full_fence();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{Location, OrderingMode, ValueKind};
    use crate::memory::MemoryAccessor;
    use std::sync::atomic::{AtomicI32, AtomicI64};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_release_acquire_fences_publish_plain_writes() {
        // Message passing: data written Plain, flag written Plain after a
        // store fence; the reader's load fence makes the data visible.
        let data = Arc::new(AtomicI64::new(0));
        let flag = Arc::new(AtomicI32::new(0));

        let writer = {
            let data = Arc::clone(&data);
            let flag = Arc::clone(&flag);
            thread::spawn(move || {
                let mem = MemoryAccessor::internal();
                let fences = mem.fences();
                unsafe {
                    mem.put_i64(
                        Location::address(data.as_ptr() as usize, ValueKind::I64),
                        OrderingMode::Plain,
                        42,
                    );
                    fences.store_fence();
                    mem.put_i32(
                        Location::address(flag.as_ptr() as usize, ValueKind::I32),
                        OrderingMode::Plain,
                        1,
                    );
                }
            })
        };

        let mem = MemoryAccessor::internal();
        let flag_loc = Location::address(flag.as_ptr() as usize, ValueKind::I32);
        let data_loc = Location::address(data.as_ptr() as usize, ValueKind::I64);
        unsafe {
            while mem.get_i32(flag_loc, OrderingMode::Plain) == 0 {
                std::hint::spin_loop();
            }
            mem.fences().load_fence();
            assert_eq!(mem.get_i64(data_loc, OrderingMode::Plain), 42);
        }

        writer.join().unwrap();
    }

    #[test]
    fn test_free_functions() {
        let cap = Capability::internal();
        load_fence(&cap);
        store_fence(&cap);
        full_fence(&cap);
        assert_eq!(FenceUnit::new(&cap).capability().id(), 0);
    }
}
