//! Alignment Utilities
//!
//! Helper functions for memory alignment and transfer-unit selection.

/// Alignment - utility for alignment operations
pub struct Alignment;

impl Alignment {
    /// Align value up to boundary
    ///
    /// `alignment` must be a power of two.
    ///
    /// # Examples
    /// ```
    /// use ordo::util::Alignment;
    ///
    /// assert_eq!(Alignment::align_up(100, 8), 104);
    /// assert_eq!(Alignment::align_up(64, 8), 64);
    /// ```
    pub const fn align_up(value: usize, alignment: usize) -> usize {
        (value + alignment - 1) & !(alignment - 1)
    }

    /// [`align_up`](Self::align_up) that reports overflow as `None`
    pub const fn checked_align_up(value: usize, alignment: usize) -> Option<usize> {
        match value.checked_add(alignment - 1) {
            Some(v) => Some(v & !(alignment - 1)),
            None => None,
        }
    }

    /// Check if value is aligned
    pub const fn is_aligned(value: usize, alignment: usize) -> bool {
        value & (alignment - 1) == 0
    }

    /// Largest of 8/4/2/1 bytes dividing every operand
    ///
    /// Bulk copy and fill move data in units of this size, so a word-aligned
    /// range is transferred word by word and never torn below its alignment.
    ///
    /// ```
    /// use ordo::util::Alignment;
    ///
    /// assert_eq!(Alignment::transfer_unit(&[0x1000, 0x2000, 64]), 8);
    /// assert_eq!(Alignment::transfer_unit(&[0x1000, 0x2004, 64]), 4);
    /// assert_eq!(Alignment::transfer_unit(&[0x1000, 3]), 1);
    /// ```
    pub fn transfer_unit(operands: &[usize]) -> usize {
        let bits = operands.iter().fold(0usize, |acc, v| acc | v);
        match bits {
            b if b % 8 == 0 => 8,
            b if b % 4 == 0 => 4,
            b if b % 2 == 0 => 2,
            _ => 1,
        }
    }
}
