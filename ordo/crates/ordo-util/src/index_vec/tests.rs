//! Tests for the IndexVec module.

use super::*;
use quickcheck_macros::quickcheck;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TestId(u32);

impl Idx for TestId {
    fn from_usize(idx: usize) -> Self {
        assert!(idx <= u32::MAX as usize);
        TestId(idx as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index type with a tiny index space, to exercise `try_push` limits
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TinyId(u8);

impl Idx for TinyId {
    const MAX_INDEX: usize = 1;

    fn from_usize(idx: usize) -> Self {
        TinyId(idx as u8)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

crate::define_idx!(MacroId);

// ============================================================================
// BASIC OPERATIONS
// ============================================================================

#[test]
fn test_new_and_empty() {
    let vec: IndexVec<TestId, i32> = IndexVec::new();
    assert!(vec.is_empty());
    assert_eq!(vec.len(), 0);
    assert_eq!(vec.capacity(), 0);
}

#[test]
fn test_with_capacity() {
    let vec: IndexVec<TestId, i32> = IndexVec::with_capacity(10);
    assert!(vec.is_empty());
    assert!(vec.capacity() >= 10);
}

#[test]
fn test_push_and_index() {
    let mut vec: IndexVec<TestId, i32> = IndexVec::new();
    let idx1 = vec.push(10);
    let idx2 = vec.push(20);
    let idx3 = vec.push(30);

    assert_eq!(vec[idx1], 10);
    assert_eq!(vec[idx2], 20);
    assert_eq!(vec[idx3], 30);
    assert_eq!(vec.len(), 3);
}

#[test]
fn test_indices_are_stable_across_growth() {
    let mut vec: IndexVec<TestId, String> = IndexVec::new();
    let first = vec.push("first".to_string());

    for i in 0..1000 {
        vec.push(format!("filler-{}", i));
    }

    assert_eq!(vec[first], "first");
    assert_eq!(first, TestId(0));
}

#[test]
fn test_try_get_out_of_bounds() {
    let mut vec: IndexVec<TestId, i32> = IndexVec::new();
    vec.push(1);

    assert_eq!(vec.try_get(TestId(0)), Ok(&1));
    assert_eq!(
        vec.try_get(TestId(5)),
        Err(IndexVecError::OutOfBounds { index: 5, length: 1 })
    );
}

#[test]
fn test_try_push_capacity_exceeded() {
    let mut vec: IndexVec<TinyId, i32> = IndexVec::new();
    assert_eq!(vec.try_push(1), Ok(TinyId(0)));
    assert_eq!(vec.try_push(2), Ok(TinyId(1)));
    assert_eq!(
        vec.try_push(3),
        Err(IndexVecError::CapacityExceeded { len: 2, max: 1 })
    );
    assert_eq!(vec.len(), 2);
}

#[test]
fn test_iter_enumerated_and_position() {
    let mut vec: IndexVec<MacroId, &str> = IndexVec::new();
    vec.push("a");
    vec.push("b");
    vec.push("c");

    let pairs: Vec<_> = vec.iter_enumerated().map(|(i, v)| (i.0, *v)).collect();
    assert_eq!(pairs, vec![(0, "a"), (1, "b"), (2, "c")]);
    assert_eq!(vec.position(|v| *v == "b"), Some(MacroId(1)));
    assert_eq!(vec.position(|v| *v == "z"), None);
    assert_eq!(vec.indices().count(), 3);
}

#[test]
fn test_get_mut() {
    let mut vec: IndexVec<TestId, i32> = IndexVec::new();
    let idx = vec.push(1);
    if let Some(v) = vec.get_mut(idx) {
        *v = 7;
    }
    assert_eq!(vec[idx], 7);
    assert_eq!(vec.get(TestId(9)), None);
}

// ============================================================================
// PROPERTIES
// ============================================================================

#[quickcheck]
fn prop_push_returns_position(values: Vec<i64>) -> bool {
    let mut vec: IndexVec<TestId, i64> = IndexVec::new();
    values
        .iter()
        .enumerate()
        .all(|(i, v)| vec.push(*v) == TestId(i as u32))
}

#[quickcheck]
fn prop_every_index_reads_back(values: Vec<u8>) -> bool {
    let mut vec: IndexVec<TestId, u8> = IndexVec::new();
    let ids: Vec<TestId> = values.iter().map(|v| vec.push(*v)).collect();
    ids.iter().zip(values.iter()).all(|(id, v)| vec[*id] == *v)
}
