//! Offset Resolver - Named Members to Stable Locations
//!
//! Structural types are described once, at setup time, with a
//! [`TypeLayoutBuilder`] and registered in a [`LayoutRegistry`]. Registration
//! assigns every member a fixed offset and hands back a [`TypeId`]; resolving a
//! member by name afterwards yields a [`FieldHandle`], a small `Copy` value the
//! caller keeps and turns into a [`Location`] on every access. Name lookup
//! never happens on the access path.
//!
//! ```text
//! TypeLayoutBuilder::new("Node")          LayoutRegistry
//!     .header(8)                          ┌──────────────────────────────┐
//!     .field("count", I32)      register  │ TypeId(0) "Node"  size 24    │
//!     .field("next", Reference) ────────► │   count  +8   I32            │
//!     .static_field("live", I64)          │   next   +16  Reference      │
//!                                         │   live   static block +0     │
//!                                         └──────────────────────────────┘
//! ```
//!
//! Instance offsets are assigned C-style: declaration order, each member
//! aligned to its own width, after the optional header. Offsets may also be
//! supplied explicitly (typically from `core::mem::offset_of!`), in which
//! case automatically placed members are laid out around them. Two members
//! never share bytes; a layout that would overlap is rejected.
//!
//! Static members live in a zeroed block owned by the registry. Their handle
//! resolves to `(block, offset)` with a non-null base.
//!
//! # Example
//!
//! ```rust
//! use ordo::location::ValueKind;
//! use ordo::offset::{LayoutRegistry, TypeLayoutBuilder};
//!
//! let registry = LayoutRegistry::new();
//! registry.register(
//!     TypeLayoutBuilder::new("Node")
//!         .field("count", ValueKind::I32)
//!         .field("next", ValueKind::Reference),
//! )?;
//!
//! let count = registry.resolve("Node", "count")?;
//! assert_eq!(count.offset(), 0);
//! assert!(registry.resolve("Node", "prev").is_err());
//! # Ok::<(), ordo::OrdoError>(())
//! ```

pub mod array;

pub use array::{ArrayShape, ElementKind, ARRAY_HEADER_BYTES};

use crate::error::{OrdoError, Result};
use crate::location::{Location, ValueKind};
use crate::logging::{log_event, RawEvent};
use crate::util::Alignment;
use indexmap::IndexMap;
use ordo_util::{Idx, IndexVec};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::ops::Range;
use std::sync::atomic::AtomicU64;

ordo_util::define_idx!(
    /// Handle of a registered type layout
    TypeId
);

ordo_util::define_idx!(
    /// Handle of a registered member
    FieldId
);

/// Resolved member, ready to produce locations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldHandle {
    type_id: TypeId,
    field_id: FieldId,
    kind: ValueKind,
    offset: usize,
    static_base: usize,
}

impl FieldHandle {
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn field_id(&self) -> FieldId {
        self.field_id
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Offset within the instance, or within the static block
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_static(&self) -> bool {
        self.static_base != 0
    }

    /// Location of this instance member inside the object at `owner`
    #[inline]
    pub fn at<T: ?Sized>(&self, owner: *const T) -> Location {
        debug_assert!(!self.is_static(), "static member resolved against an instance");
        Location::in_object(owner, self.offset, self.kind)
    }

    /// Location of this static member; `None` for instance members
    #[inline]
    pub fn static_location(&self) -> Option<Location> {
        self.is_static()
            .then(|| Location::new(self.static_base, self.offset, self.kind))
    }
}

#[derive(Debug, Clone, Copy)]
enum Placement {
    Auto,
    At(usize),
    Static,
}

#[derive(Debug, Clone)]
struct MemberSpec {
    name: String,
    kind: ValueKind,
    placement: Placement,
}

/// Description of a structural type, consumed by [`LayoutRegistry::register`]
#[derive(Debug, Clone)]
pub struct TypeLayoutBuilder {
    name: String,
    header: usize,
    fixed: Option<(usize, usize)>,
    members: Vec<MemberSpec>,
}

struct ComputedLayout {
    size: usize,
    align: usize,
    members: Vec<(MemberSpec, usize)>,
    static_words: usize,
}

impl TypeLayoutBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            header: 0,
            fixed: None,
            members: Vec::new(),
        }
    }

    /// Layout of an existing Rust type
    ///
    /// Size and alignment are taken from `T`; every instance member must fit
    /// inside it. Pair with [`field_at`](Self::field_at) and `offset_of!`.
    pub fn for_type<T>(name: impl Into<String>) -> Self {
        Self {
            fixed: Some((std::mem::size_of::<T>(), std::mem::align_of::<T>())),
            ..Self::new(name)
        }
    }

    /// Reserve `bytes` at offset 0 for an object header
    pub fn header(mut self, bytes: usize) -> Self {
        self.header = bytes;
        self
    }

    /// Instance member placed at the next aligned free offset
    pub fn field(self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.member(name, kind, Placement::Auto)
    }

    /// Instance member at an explicit offset
    pub fn field_at(self, name: impl Into<String>, kind: ValueKind, offset: usize) -> Self {
        self.member(name, kind, Placement::At(offset))
    }

    /// Static member, stored in the registry-owned static block
    pub fn static_field(self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.member(name, kind, Placement::Static)
    }

    fn member(mut self, name: impl Into<String>, kind: ValueKind, placement: Placement) -> Self {
        self.members.push(MemberSpec {
            name: name.into(),
            kind,
            placement,
        });
        self
    }

    fn invalid(&self, detail: impl std::fmt::Display) -> OrdoError {
        OrdoError::InvalidArgument(format!("layout {}: {}", self.name, detail))
    }

    fn compute(self) -> Result<ComputedLayout> {
        let mut seen = HashSet::new();
        for m in &self.members {
            if !seen.insert(m.name.as_str()) {
                return Err(self.invalid(format!("duplicate member `{}`", m.name)));
            }
        }

        let limit = self.fixed.map(|(size, _)| size);
        let mut offsets = vec![0usize; self.members.len()];
        let mut taken: Vec<(Range<usize>, usize)> = Vec::new();

        // Explicit members first so automatic ones can flow around them
        for (i, m) in self.members.iter().enumerate() {
            let Placement::At(offset) = m.placement else {
                continue;
            };
            if !Alignment::is_aligned(offset, m.kind.align()) {
                return Err(self.invalid(format!(
                    "`{}` at {} is not aligned to {}",
                    m.name,
                    offset,
                    m.kind.align()
                )));
            }
            let end = offset
                .checked_add(m.kind.size())
                .ok_or_else(|| self.invalid(format!("`{}` at {} overflows", m.name, offset)))?;
            let range = offset..end;
            if range.start < self.header {
                return Err(self.invalid(format!("`{}` overlaps the header", m.name)));
            }
            if let Some((_, other)) = taken.iter().find(|(r, _)| overlaps(r, &range)) {
                return Err(self.invalid(format!(
                    "`{}` overlaps `{}`",
                    m.name, self.members[*other].name
                )));
            }
            taken.push((range, i));
            offsets[i] = offset;
        }

        let mut cursor = self.header;
        for (i, m) in self.members.iter().enumerate() {
            if !matches!(m.placement, Placement::Auto) {
                continue;
            }
            let size = m.kind.size();
            let align = m.kind.align();
            let overflow = || self.invalid(format!("`{}` does not fit the address space", m.name));
            let place = |from: usize| -> Result<Range<usize>> {
                let start = Alignment::checked_align_up(from, align).ok_or_else(overflow)?;
                let end = start.checked_add(size).ok_or_else(overflow)?;
                Ok(start..end)
            };

            let mut slot = place(cursor)?;
            while let Some((r, _)) = taken.iter().find(|(r, _)| overlaps(r, &slot)) {
                slot = place(r.end)?;
            }
            offsets[i] = slot.start;
            cursor = slot.end;
            taken.push((slot, i));
        }

        let end = taken.iter().map(|(r, _)| r.end).max().unwrap_or(0).max(self.header);
        if let Some(size) = limit {
            if let Some((r, i)) = taken.iter().find(|(r, _)| r.end > size) {
                return Err(self.invalid(format!(
                    "`{}` ends at {} past the type size {}",
                    self.members[*i].name, r.end, size
                )));
            }
        }

        let mut static_cursor = 0;
        for (i, m) in self.members.iter().enumerate() {
            if matches!(m.placement, Placement::Static) {
                let offset = Alignment::align_up(static_cursor, m.kind.align());
                offsets[i] = offset;
                static_cursor = offset + m.kind.size();
            }
        }

        let (size, align) = match self.fixed {
            Some(fixed) => fixed,
            None => {
                let align = self
                    .members
                    .iter()
                    .filter(|m| !matches!(m.placement, Placement::Static))
                    .map(|m| m.kind.align())
                    .max()
                    .unwrap_or(1);
                let size = Alignment::checked_align_up(end, align)
                    .ok_or_else(|| self.invalid("size does not fit the address space"))?;
                (size, align)
            },
        };

        Ok(ComputedLayout {
            size,
            align,
            members: self.members.into_iter().zip(offsets).collect(),
            static_words: static_cursor.div_ceil(8),
        })
    }
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

#[derive(Debug)]
struct FieldLayout {
    kind: ValueKind,
    offset: usize,
    is_static: bool,
}

#[derive(Debug)]
struct TypeLayout {
    name: String,
    size: usize,
    align: usize,
    members: IndexMap<String, FieldId>,
    statics: Option<Box<[AtomicU64]>>,
}

impl TypeLayout {
    fn static_base(&self) -> usize {
        self.statics
            .as_ref()
            .map_or(0, |block| block.as_ptr() as usize)
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    types: IndexVec<TypeId, TypeLayout>,
    fields: IndexVec<FieldId, FieldLayout>,
    by_name: IndexMap<String, TypeId>,
}

impl RegistryInner {
    fn handle(&self, type_id: TypeId, field_id: FieldId) -> Result<FieldHandle> {
        let ty = self.types.try_get(type_id)?;
        let field = self.fields.try_get(field_id)?;
        Ok(FieldHandle {
            type_id,
            field_id,
            kind: field.kind,
            offset: field.offset,
            static_base: if field.is_static { ty.static_base() } else { 0 },
        })
    }
}

/// Registry of type layouts
///
/// Registration takes a write lock and is meant for setup time; resolution
/// takes a read lock and is meant to be done once per member.
#[derive(Debug, Default)]
pub struct LayoutRegistry {
    inner: RwLock<RegistryInner>,
}

lazy_static::lazy_static! {
    static ref GLOBAL_REGISTRY: LayoutRegistry = LayoutRegistry::new();
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry
    pub fn global() -> &'static LayoutRegistry {
        &GLOBAL_REGISTRY
    }

    /// Register a type layout
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a duplicate type or member name, a misaligned or
    /// overlapping explicit offset, or a member outside a fixed-size type.
    pub fn register(&self, builder: TypeLayoutBuilder) -> Result<TypeId> {
        let name = builder.name.clone();
        let layout = builder.compute()?;

        let mut inner = self.inner.write();
        if inner.by_name.contains_key(&name) {
            return Err(OrdoError::InvalidArgument(format!(
                "type {} is already registered",
                name
            )));
        }

        let type_id = TypeId::from_usize(inner.types.len());
        let field_count = layout.members.len();
        let mut members = IndexMap::with_capacity(field_count);
        for (spec, offset) in layout.members {
            let field_id = inner.fields.try_push(FieldLayout {
                kind: spec.kind,
                offset,
                is_static: matches!(spec.placement, Placement::Static),
            })?;
            members.insert(spec.name, field_id);
        }

        let statics = (layout.static_words > 0).then(|| {
            (0..layout.static_words)
                .map(|_| AtomicU64::new(0))
                .collect::<Box<[_]>>()
        });

        let pushed = inner.types.try_push(TypeLayout {
            name: name.clone(),
            size: layout.size,
            align: layout.align,
            members,
            statics,
        })?;
        debug_assert_eq!(pushed, type_id);
        inner.by_name.insert(name.clone(), type_id);
        drop(inner);

        log::debug!("registered layout {} as {:?}", name, type_id);
        log_event(RawEvent::LayoutRegistered {
            type_name: name,
            fields: field_count,
            size: layout.size,
        });

        Ok(type_id)
    }

    /// Id of a registered type
    pub fn type_id(&self, type_name: &str) -> Option<TypeId> {
        self.inner.read().by_name.get(type_name).copied()
    }

    /// Resolve `type_name::member`
    ///
    /// # Errors
    ///
    /// `UnknownMember` if either name was never registered.
    pub fn resolve(&self, type_name: &str, member: &str) -> Result<FieldHandle> {
        let inner = self.inner.read();
        let unknown = || OrdoError::UnknownMember {
            type_name: type_name.to_string(),
            member: member.to_string(),
        };

        let type_id = *inner.by_name.get(type_name).ok_or_else(unknown)?;
        let field_id = *inner
            .types
            .try_get(type_id)?
            .members
            .get(member)
            .ok_or_else(unknown)?;
        inner.handle(type_id, field_id)
    }

    /// Resolve a member of an already-known type
    pub fn resolve_in(&self, type_id: TypeId, member: &str) -> Result<FieldHandle> {
        let inner = self.inner.read();
        let ty = inner.types.try_get(type_id)?;
        let field_id = *ty.members.get(member).ok_or_else(|| OrdoError::UnknownMember {
            type_name: ty.name.clone(),
            member: member.to_string(),
        })?;
        inner.handle(type_id, field_id)
    }

    /// Every member of a type, in declaration order
    pub fn fields(&self, type_id: TypeId) -> Result<Vec<FieldHandle>> {
        let inner = self.inner.read();
        let ty = inner.types.try_get(type_id)?;
        ty.members
            .values()
            .map(|&field_id| inner.handle(type_id, field_id))
            .collect()
    }

    /// Instance size in bytes
    pub fn size_of(&self, type_id: TypeId) -> Result<usize> {
        Ok(self.inner.read().types.try_get(type_id)?.size)
    }

    /// Instance alignment in bytes
    pub fn align_of(&self, type_id: TypeId) -> Result<usize> {
        Ok(self.inner.read().types.try_get(type_id)?.align)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.inner.read().types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
