//! Core shared types and errors (parser-agnostic).

use std::fmt;

use thiserror::Error;

/// Per-vertex attribute kinds, in the same order as the `p/t/n` slots of a face reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeKind {
    Position,
    Texcoord,
    Normal,
}

impl AttributeKind {
    /// All kinds in slot order.
    pub const ALL: [AttributeKind; 3] = [
        AttributeKind::Position,
        AttributeKind::Texcoord,
        AttributeKind::Normal,
    ];

    /// Number of components in one tuple of this kind.
    #[inline]
    pub const fn arity(self) -> usize {
        match self {
            AttributeKind::Position | AttributeKind::Normal => 3,
            AttributeKind::Texcoord => 2,
        }
    }

    /// Slot index inside a `p/t/n` face reference.
    #[inline]
    pub const fn slot(self) -> usize {
        match self {
            AttributeKind::Position => 0,
            AttributeKind::Texcoord => 1,
            AttributeKind::Normal => 2,
        }
    }

    /// Buffer name used by consumers when binding vertex data.
    pub const fn name(self) -> &'static str {
        match self {
            AttributeKind::Position => "position",
            AttributeKind::Texcoord => "texcoord",
            AttributeKind::Normal => "normal",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },

    #[error("line {line}: invalid {kind} index '{token}'")]
    InvalidIndex {
        line: usize,
        kind: AttributeKind,
        token: String,
    },

    #[error("line {line}: {kind} indices are 1-based; found 0")]
    ZeroIndex { line: usize, kind: AttributeKind },

    #[error("line {line}: {kind} index {index} out of range (len={len})")]
    IndexOutOfRange {
        line: usize,
        kind: AttributeKind,
        index: i64,
        len: usize,
    },
}

impl CoreError {
    /// 1-based source line the error refers to.
    pub fn line(&self) -> usize {
        match self {
            CoreError::InvalidNumber { line, .. }
            | CoreError::InvalidIndex { line, .. }
            | CoreError::ZeroIndex { line, .. }
            | CoreError::IndexOutOfRange { line, .. } => *line,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
