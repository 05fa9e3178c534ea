//! Store Barrier - Memory-Manager Bookkeeping on Reference Stores
//!
//! When a reference is written into a slot that belongs to a managed object
//! (the location's owner base is non-null), the memory manager that owns that
//! object may need to hear about it: a generational collector marks the
//! owner's card so the next minor collection rescans it. The raw layer does
//! not know what the bookkeeping is; it only guarantees to call the configured
//! [`StoreBarrier`] after every such store, including stores made by a
//! successful CAS.
//!
//! Stores to bare addresses (owner base null) never invoke the barrier.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::fmt;

/// Hook invoked after a reference store into a managed owner
pub trait StoreBarrier: Send + Sync + fmt::Debug {
    /// `owner` is the non-null owner base, `slot` the effective address
    /// written, `value` the reference stored (may be null)
    fn on_reference_store(&self, owner: usize, slot: usize, value: usize);
}

const CARD_SHIFT: usize = 9;

/// Card-marking barrier
///
/// Marks the 512-byte card containing the owner whenever a non-null
/// reference is stored into it.
#[derive(Default)]
pub struct CardMarkingBarrier {
    cards: Mutex<CardTable>,
}

/// Dirty cards by index; sparse, so owners anywhere in the address space cost
/// one entry each
#[derive(Default)]
struct CardTable {
    dirty: HashSet<usize>,
}

impl CardTable {
    #[inline]
    fn card_of(address: usize) -> usize {
        address >> CARD_SHIFT
    }

    fn mark(&mut self, address: usize) {
        self.dirty.insert(Self::card_of(address));
    }

    fn is_marked(&self, address: usize) -> bool {
        self.dirty.contains(&Self::card_of(address))
    }
}

impl CardMarkingBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the card holding `address` is dirty
    pub fn is_card_marked(&self, address: usize) -> bool {
        self.cards.lock().is_marked(address)
    }

    /// Number of dirty cards
    pub fn marked_cards(&self) -> usize {
        self.cards.lock().dirty.len()
    }

    /// Clean every card
    pub fn clear(&self) {
        self.cards.lock().dirty.clear();
    }
}

impl StoreBarrier for CardMarkingBarrier {
    fn on_reference_store(&self, owner: usize, _slot: usize, value: usize) {
        if value == 0 {
            return;
        }
        self.cards.lock().mark(owner);
    }
}

impl fmt::Debug for CardMarkingBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardMarkingBarrier")
            .field("marked_cards", &self.marked_cards())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_marking_ignores_null_stores() {
        let barrier = CardMarkingBarrier::new();
        barrier.on_reference_store(0x10_000, 0x10_008, 0);
        assert_eq!(barrier.marked_cards(), 0);
    }

    #[test]
    fn test_card_marking_marks_owner_card_once() {
        let barrier = CardMarkingBarrier::new();
        barrier.on_reference_store(0x10_000, 0x10_008, 0xdead_0000);
        barrier.on_reference_store(0x10_010, 0x10_018, 0xbeef_0000);

        // Both owners fall in the same 512-byte card
        assert_eq!(barrier.marked_cards(), 1);
        assert!(barrier.is_card_marked(0x10_000));
        assert!(!barrier.is_card_marked(0x20_000));

        barrier.clear();
        assert!(!barrier.is_card_marked(0x10_000));
        assert_eq!(barrier.marked_cards(), 0);
    }

    #[test]
    fn test_card_marking_heap_and_high_addresses() {
        let barrier = CardMarkingBarrier::new();
        let owner = Box::new([0u64; 4]);
        let owner_addr = &*owner as *const [u64; 4] as usize;
        let high = usize::MAX & !0xfff;

        barrier.on_reference_store(owner_addr, owner_addr + 8, 0xdead_0000);
        barrier.on_reference_store(high, high + 8, 0xbeef_0000);

        assert!(barrier.is_card_marked(owner_addr));
        assert!(barrier.is_card_marked(high));
        assert_eq!(barrier.marked_cards(), 2);
    }
}
