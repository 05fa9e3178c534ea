//! Locations, Value Kinds and Ordering Modes
//!
//! A [`Location`] names one memory slot. It is always a `(base, offset)` pair:
//!
//! ```text
//! double-register:  base = owner object,  offset = field offset
//! single-register:  base = 0 (null),      offset = absolute address
//!
//! effective address = base + offset
//! ```
//!
//! Each location also carries the [`ValueKind`] it was resolved for, so a slot
//! registered as `I32` is not silently read as an `I64`. The unchecked
//! accessor only `debug_assert!`s this; the checked accessor reports it.

use std::sync::atomic::Ordering;

/// Type of the value stored in a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    I8,
    I16,
    /// 16-bit unsigned code unit
    Char,
    I32,
    I64,
    F32,
    F64,
    /// Pointer-width reference to another object
    Reference,
}

impl ValueKind {
    /// Width in bytes
    pub const fn size(self) -> usize {
        match self {
            ValueKind::Bool | ValueKind::I8 => 1,
            ValueKind::I16 | ValueKind::Char => 2,
            ValueKind::I32 | ValueKind::F32 => 4,
            ValueKind::I64 | ValueKind::F64 => 8,
            ValueKind::Reference => std::mem::size_of::<usize>(),
        }
    }

    /// Required alignment in bytes; every kind is naturally aligned
    pub const fn align(self) -> usize {
        self.size()
    }

    /// Whether a slot of this kind may be accessed by an operation typed `op`
    ///
    /// Same-width primitive views are compatible (an `I32` slot may be read
    /// as `F32` bits). References are only compatible with references.
    pub fn accepts(self, op: ValueKind) -> bool {
        if self == op {
            return true;
        }
        let either_ref = self == ValueKind::Reference || op == ValueKind::Reference;
        !either_ref && self.size() == op.size()
    }
}

/// Memory ordering strength of a single access
///
/// | Mode             | load    | store   |
/// |------------------|---------|---------|
/// | `Plain`          | Relaxed | Relaxed |
/// | `Opaque`         | Relaxed | Release |
/// | `AcquireRelease` | Acquire | Release |
/// | `Volatile`       | SeqCst  | SeqCst  |
///
/// `Plain` maps to `Relaxed` because a racing non-atomic access is undefined
/// behaviour in Rust; the compiler may still reorder it freely with respect
/// to every other location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderingMode {
    Plain,
    Opaque,
    AcquireRelease,
    Volatile,
}

impl OrderingMode {
    #[inline]
    pub const fn load_ordering(self) -> Ordering {
        match self {
            OrderingMode::Plain | OrderingMode::Opaque => Ordering::Relaxed,
            OrderingMode::AcquireRelease => Ordering::Acquire,
            OrderingMode::Volatile => Ordering::SeqCst,
        }
    }

    #[inline]
    pub const fn store_ordering(self) -> Ordering {
        match self {
            OrderingMode::Plain => Ordering::Relaxed,
            OrderingMode::Opaque | OrderingMode::AcquireRelease => Ordering::Release,
            OrderingMode::Volatile => Ordering::SeqCst,
        }
    }
}

/// One memory slot: `(base, offset)` plus the kind it holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    base: usize,
    offset: usize,
    kind: ValueKind,
}

impl Location {
    /// Double-register location: a field or element inside `base`
    #[inline]
    pub const fn new(base: usize, offset: usize, kind: ValueKind) -> Self {
        Self { base, offset, kind }
    }

    /// Single-register location: a bare address in unmanaged memory
    #[inline]
    pub const fn address(address: usize, kind: ValueKind) -> Self {
        Self {
            base: 0,
            offset: address,
            kind,
        }
    }

    /// Field or element of the object at `owner`
    #[inline]
    pub fn in_object<T: ?Sized>(owner: *const T, offset: usize, kind: ValueKind) -> Self {
        Self::new(owner as *const u8 as usize, offset, kind)
    }

    #[inline]
    pub const fn base(&self) -> usize {
        self.base
    }

    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub const fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Owner object, or `None` for a single-register location
    #[inline]
    pub const fn owner(&self) -> Option<usize> {
        if self.base == 0 {
            None
        } else {
            Some(self.base)
        }
    }

    /// `base + offset`
    #[inline]
    pub const fn effective_address(&self) -> usize {
        self.base.wrapping_add(self.offset)
    }

    /// Same slot, viewed as another kind
    #[inline]
    pub const fn with_kind(self, kind: ValueKind) -> Self {
        Self { kind, ..self }
    }

    /// Slot `bytes` further into the same owner
    #[inline]
    pub const fn add(self, bytes: usize) -> Self {
        Self {
            offset: self.offset.wrapping_add(bytes),
            ..self
        }
    }

    /// Whether the effective address is aligned for this location's kind
    #[inline]
    pub fn is_aligned(&self) -> bool {
        self.effective_address() % self.kind.align() == 0
    }
}
