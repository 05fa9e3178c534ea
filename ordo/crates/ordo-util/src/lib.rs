//! ordo-util - Foundation Types for the Ordo Workspace
//!
//! ============================================================================
//! MODULE OVERVIEW
//! ============================================================================
//!
//! Small, dependency-light building blocks shared by the `ordo` crate.
//!
//! TYPED ARENAS:
//! -------------
//! Layout descriptions are registered once and then referred to by a compact
//! integer handle for the rest of the process. [`IndexVec`] is the arena that
//! backs this scheme: it is append-only, so an index handed out by
//! [`IndexVec::push`] stays valid and keeps pointing at the same element for as
//! long as the arena lives.
//!
//! ```text
//! IndexVec<TypeId, Layout>:
//! ┌────────────┬────────────┬────────────┐
//! │ TypeId(0)  │ TypeId(1)  │ TypeId(2)  │
//! ├────────────┼────────────┼────────────┤
//! │ "Node"     │ "Counter"  │ "Pair"     │
//! └────────────┴────────────┴────────────┘
//! ```
//!
//! Typed indices keep the index spaces apart at compile time: a `FieldId`
//! cannot be used to look up a type, even though both are a `u32` underneath.

pub mod error;
pub mod index_vec;

pub use error::{IndexVecError, IndexVecResult};
pub use index_vec::{Idx, IndexVec};
