//! IndexVec - An append-only vector indexed by a specific type.
//!
//! [`IndexVec`] is a typed vector that uses a custom index type instead of
//! `usize`. Elements are never removed or reordered, which makes every index
//! returned by [`IndexVec::push`] a stable handle: registering something once
//! and looking it up by index later always yields the same element.
//!
//! # Example
//!
//! ```
//! use ordo_util::index_vec::{IndexVec, Idx};
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq)]
//! struct SlotId(u32);
//!
//! impl Idx for SlotId {
//!     fn from_usize(idx: usize) -> Self { SlotId(idx as u32) }
//!     fn index(self) -> usize { self.0 as usize }
//! }
//!
//! let mut slots: IndexVec<SlotId, i32> = IndexVec::new();
//! let id = slots.push(42);
//! assert_eq!(slots[id], 42);
//! ```

use crate::error::{IndexVecError, IndexVecResult};
use std::marker::PhantomData;
use std::ops::Index;

/// Trait for types that can be used as indices
///
/// The type must be convertible to and from `usize`. `MAX_INDEX` bounds the
/// number of elements an [`IndexVec`] will accept through [`IndexVec::try_push`].
///
/// # Example
///
/// ```
/// use ordo_util::index_vec::Idx;
///
/// #[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// struct MyIndex(u32);
///
/// impl Idx for MyIndex {
///     fn from_usize(idx: usize) -> Self {
///         assert!(idx <= u32::MAX as usize);
///         MyIndex(idx as u32)
///     }
///
///     fn index(self) -> usize {
///         self.0 as usize
///     }
/// }
/// ```
pub trait Idx: Copy + Eq + PartialEq {
    /// Largest index value representable by this type
    const MAX_INDEX: usize = u32::MAX as usize;

    /// Convert from usize to index type
    ///
    /// # Panics
    ///
    /// Implementations may panic if the usize value is too large to fit
    /// in the index type.
    fn from_usize(idx: usize) -> Self;

    /// Convert index to usize for array indexing
    fn index(self) -> usize;
}

impl Idx for usize {
    const MAX_INDEX: usize = usize::MAX;

    #[inline]
    fn from_usize(idx: usize) -> Self {
        idx
    }

    #[inline]
    fn index(self) -> usize {
        self
    }
}

/// An append-only vector indexed by a specific type
///
/// # Type Parameters
///
/// - `I`: The index type (must implement [`Idx`] trait)
/// - `T`: The element type
///
/// `IndexVec` has the same size as `Vec<T>`; the index type is a zero-cost
/// marker.
#[derive(Clone, Debug)]
pub struct IndexVec<I, T> {
    raw: Vec<T>,
    _marker: PhantomData<fn(&I)>,
}

impl<I, T> IndexVec<I, T> {
    /// Create an empty IndexVec
    ///
    /// ```
    /// use ordo_util::index_vec::IndexVec;
    ///
    /// let vec: IndexVec<usize, i32> = IndexVec::new();
    /// assert!(vec.is_empty());
    /// ```
    #[inline]
    pub const fn new() -> Self {
        Self {
            raw: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Create an IndexVec with the specified capacity
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            raw: Vec::with_capacity(capacity),
            _marker: PhantomData,
        }
    }

    /// Returns the number of elements in the vector
    #[inline]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns true if the vector contains no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the total capacity of the vector
    #[inline]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// View the elements as a plain slice
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.raw
    }
}

impl<I: Idx, T> IndexVec<I, T> {
    /// Append an element and return its index
    ///
    /// # Panics
    ///
    /// Panics (through [`Idx::from_usize`]) if the index space is exhausted.
    /// Use [`try_push`](Self::try_push) when that must be reported instead.
    #[inline]
    pub fn push(&mut self, value: T) -> I {
        let index = self.raw.len();
        self.raw.push(value);
        I::from_usize(index)
    }

    /// Append an element, failing instead of panicking when the index type
    /// cannot represent the new position
    ///
    /// ```
    /// use ordo_util::index_vec::IndexVec;
    ///
    /// let mut vec: IndexVec<usize, &str> = IndexVec::new();
    /// assert_eq!(vec.try_push("a"), Ok(0));
    /// ```
    pub fn try_push(&mut self, value: T) -> IndexVecResult<I> {
        let len = self.raw.len();
        if len > I::MAX_INDEX {
            return Err(IndexVecError::CapacityExceeded {
                len,
                max: I::MAX_INDEX,
            });
        }
        Ok(self.push(value))
    }

    /// Get a reference to the element at `index`
    #[inline]
    pub fn get(&self, index: I) -> Option<&T> {
        self.raw.get(index.index())
    }

    /// Get a reference to the element at `index`, reporting the bounds on failure
    pub fn try_get(&self, index: I) -> IndexVecResult<&T> {
        self.raw
            .get(index.index())
            .ok_or(IndexVecError::OutOfBounds {
                index: index.index(),
                length: self.raw.len(),
            })
    }

    /// Get a mutable reference to the element at `index`
    #[inline]
    pub fn get_mut(&mut self, index: I) -> Option<&mut T> {
        self.raw.get_mut(index.index())
    }

    /// Iterate over `(index, element)` pairs
    #[inline]
    pub fn iter_enumerated(&self) -> impl Iterator<Item = (I, &T)> {
        self.raw
            .iter()
            .enumerate()
            .map(|(i, v)| (I::from_usize(i), v))
    }

    /// Iterate over all valid indices
    #[inline]
    pub fn indices(&self) -> impl Iterator<Item = I> {
        (0..self.raw.len()).map(I::from_usize)
    }

    /// Index of the first element matching `pred`
    pub fn position<P>(&self, mut pred: P) -> Option<I>
    where
        P: FnMut(&T) -> bool,
    {
        self.raw.iter().position(|v| pred(v)).map(I::from_usize)
    }
}

impl<I: Idx, T> Index<I> for IndexVec<I, T> {
    type Output = T;

    #[inline]
    fn index(&self, index: I) -> &T {
        &self.raw[index.index()]
    }
}

impl<I, T> Default for IndexVec<I, T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Macro to define index types easily
///
/// Generates a newtype wrapper around `u32` that implements [`Idx`], along
/// with common derives for debugging and hashing.
///
/// ```
/// use ordo_util::define_idx;
/// use ordo_util::index_vec::IndexVec;
///
/// define_idx!(SlotId);
///
/// let mut vec: IndexVec<SlotId, i32> = IndexVec::new();
/// let idx = vec.push(42);
/// assert_eq!(vec[idx], 42);
/// ```
#[macro_export]
macro_rules! define_idx {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $crate::index_vec::Idx for $name {
            fn from_usize(idx: usize) -> Self {
                assert!(idx <= u32::MAX as usize, "Index {} exceeds u32::MAX", idx);
                $name(idx as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

#[cfg(test)]
mod tests;
