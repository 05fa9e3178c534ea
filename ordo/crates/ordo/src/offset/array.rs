//! Managed array shapes
//!
//! A managed array is a 16-byte header followed by its elements:
//!
//! ```text
//! +0   length     u64
//! +8   kind tag   u32
//! +12  (padding)
//! +16  element 0, element 1, ...   (stride = element width)
//! ```
//!
//! `Bit` arrays pack 64 elements per `u64` word. Their stride is 0 since no
//! single element is addressable; use [`ArrayShape::bit_word`] instead.

use crate::location::{Location, OrderingMode, ValueKind};
use crate::memory::MemoryAccessor;
use crate::util::Alignment;

/// Size of the managed array header
pub const ARRAY_HEADER_BYTES: usize = 16;

const LENGTH_OFFSET: usize = 0;
const TAG_OFFSET: usize = 8;

/// Element type of a managed array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Bool,
    I8,
    I16,
    Char,
    I32,
    I64,
    F32,
    F64,
    Reference,
    /// Packed bits, 64 per word
    Bit,
}

impl ElementKind {
    /// Kind of one addressable element; `None` for `Bit`
    pub const fn value_kind(self) -> Option<ValueKind> {
        Some(match self {
            ElementKind::Bool => ValueKind::Bool,
            ElementKind::I8 => ValueKind::I8,
            ElementKind::I16 => ValueKind::I16,
            ElementKind::Char => ValueKind::Char,
            ElementKind::I32 => ValueKind::I32,
            ElementKind::I64 => ValueKind::I64,
            ElementKind::F32 => ValueKind::F32,
            ElementKind::F64 => ValueKind::F64,
            ElementKind::Reference => ValueKind::Reference,
            ElementKind::Bit => return None,
        })
    }

    const fn tag(self) -> u32 {
        self as u32
    }
}

impl From<ValueKind> for ElementKind {
    fn from(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Bool => ElementKind::Bool,
            ValueKind::I8 => ElementKind::I8,
            ValueKind::I16 => ElementKind::I16,
            ValueKind::Char => ElementKind::Char,
            ValueKind::I32 => ElementKind::I32,
            ValueKind::I64 => ElementKind::I64,
            ValueKind::F32 => ElementKind::F32,
            ValueKind::F64 => ElementKind::F64,
            ValueKind::Reference => ElementKind::Reference,
        }
    }
}

/// Base offset and stride of a managed array of one element kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayShape {
    kind: ElementKind,
    base_offset: usize,
    stride: usize,
}

impl ArrayShape {
    pub const fn of(kind: ElementKind) -> Self {
        let stride = match kind.value_kind() {
            Some(value) => value.size(),
            None => 0,
        };
        Self {
            kind,
            base_offset: ARRAY_HEADER_BYTES,
            stride,
        }
    }

    pub const fn kind(&self) -> ElementKind {
        self.kind
    }

    pub const fn base_offset(&self) -> usize {
        self.base_offset
    }

    pub const fn stride(&self) -> usize {
        self.stride
    }

    /// Location of element `index` of the array at `array`
    ///
    /// `None` for `Bit` arrays. No bounds check is made.
    pub fn element(&self, array: usize, index: usize) -> Option<Location> {
        let kind = self.kind.value_kind()?;
        Some(Location::new(
            array,
            self.base_offset + index * self.stride,
            kind,
        ))
    }

    /// Word offset and mask holding bit `index` of a `Bit` array
    pub const fn bit_word(&self, index: usize) -> (usize, u64) {
        let offset = self.base_offset + (index / 64) * 8;
        (offset, 1u64 << (index % 64))
    }

    /// Bytes needed for a header plus `length` elements, rounded to 8
    pub fn byte_size(&self, length: usize) -> usize {
        let body = match self.kind {
            ElementKind::Bit => length.div_ceil(64) * 8,
            _ => length * self.stride,
        };
        Alignment::align_up(self.base_offset + body, 8)
    }

    /// Write the header of an array at `array`
    ///
    /// # Safety
    ///
    /// `array` is 8-aligned and valid for writes of at least
    /// [`ARRAY_HEADER_BYTES`].
    pub unsafe fn write_header(&self, mem: &MemoryAccessor<'_>, array: usize, length: usize) {
        unsafe {
            mem.put_i64(
                Location::new(array, LENGTH_OFFSET, ValueKind::I64),
                OrderingMode::Plain,
                length as i64,
            );
            mem.put_i32(
                Location::new(array, TAG_OFFSET, ValueKind::I32),
                OrderingMode::AcquireRelease,
                self.kind.tag() as i32,
            );
        }
    }

    /// Length recorded in the header of the array at `array`
    ///
    /// # Safety
    ///
    /// `array` holds a header written by [`write_header`](Self::write_header).
    pub unsafe fn read_length(mem: &MemoryAccessor<'_>, array: usize) -> usize {
        unsafe {
            mem.get_i64(
                Location::new(array, LENGTH_OFFSET, ValueKind::I64),
                OrderingMode::AcquireRelease,
            ) as usize
        }
    }
}
