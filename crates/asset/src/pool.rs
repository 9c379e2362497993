//! Append-only attribute pools addressed by OBJ face indices.

use corelib::AttributeKind;

/// All tuples seen so far for one attribute kind.
///
/// Slot 0 holds a zero-filled sentinel so that 1-based face indices map
/// directly onto slots. Tuples are stored as parsed; arity is not checked.
#[derive(Debug)]
pub struct AttributePool {
    kind: AttributeKind,
    tuples: Vec<Vec<f32>>,
}

impl AttributePool {
    pub fn new(kind: AttributeKind) -> Self {
        Self {
            kind,
            tuples: vec![vec![0.0; kind.arity()]],
        }
    }

    #[inline]
    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    pub fn push(&mut self, tuple: Vec<f32>) {
        self.tuples.push(tuple);
    }

    /// Number of appended tuples, sentinel excluded.
    #[inline]
    pub fn len(&self) -> usize {
        self.tuples.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map a face index to a slot. Positive indices are absolute, negative
    /// ones count back from the end (`-1` is the last tuple). `0` and
    /// negative indices reaching exactly one past the start land on the sentinel.
    pub fn resolve(&self, index: i64) -> Option<usize> {
        let slots = self.tuples.len() as i64;
        let slot = if index >= 0 { index } else { slots + index };
        (0..slots).contains(&slot).then_some(slot as usize)
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<&[f32]> {
        self.tuples.get(slot).map(Vec::as_slice)
    }
}
