//! CPU-side geometry records produced by the OBJ parser.

use std::collections::BTreeMap;

use corelib::AttributeKind;

use crate::extents::Extents;

/// Flat, non-indexed vertex buffers keyed by attribute kind.
///
/// A kind is present only if something was written for it; after parsing,
/// empty buffers are removed so absence is the only "not present" signal.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexData {
    buffers: BTreeMap<AttributeKind, Vec<f32>>,
}

impl VertexData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one tuple to the buffer for `kind`, creating the buffer if needed.
    pub fn push(&mut self, kind: AttributeKind, values: &[f32]) {
        self.buffers.entry(kind).or_default().extend_from_slice(values);
    }

    #[inline]
    pub fn get(&self, kind: AttributeKind) -> Option<&[f32]> {
        self.buffers.get(&kind).map(Vec::as_slice)
    }

    #[inline]
    pub fn contains(&self, kind: AttributeKind) -> bool {
        self.buffers.contains_key(&kind)
    }

    pub fn position(&self) -> Option<&[f32]> {
        self.get(AttributeKind::Position)
    }

    pub fn texcoord(&self) -> Option<&[f32]> {
        self.get(AttributeKind::Texcoord)
    }

    pub fn normal(&self) -> Option<&[f32]> {
        self.get(AttributeKind::Normal)
    }

    /// Iterate present buffers in slot order (position, texcoord, normal).
    pub fn iter(&self) -> impl Iterator<Item = (AttributeKind, &[f32])> {
        self.buffers.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Raw bytes of one buffer, ready for a GPU upload.
    pub fn as_bytes(&self, kind: AttributeKind) -> Option<&[u8]> {
        self.get(kind).map(bytemuck::cast_slice)
    }

    /// Number of positions written (0 if there is no position buffer).
    pub fn position_len(&self) -> usize {
        self.position().map_or(0, <[f32]>::len)
    }

    /// Drop buffers that ended up empty.
    pub(crate) fn prune_empty(&mut self) {
        self.buffers.retain(|_, values| !values.is_empty());
    }

    /// `true` when every present buffer describes the same number of vertices.
    pub fn is_aligned(&self) -> bool {
        let mut counts = self.iter().map(|(kind, values)| {
            (values.len() % kind.arity() == 0, values.len() / kind.arity())
        });
        match counts.next() {
            None => true,
            Some((whole, first)) => whole && counts.all(|(w, n)| w && n == first),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.values().all(Vec::is_empty)
    }
}

/// One contiguous run of faces sharing object, groups and material.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    pub object: String,
    pub groups: Vec<String>,
    pub material: String,
    pub data: VertexData,
}

impl Geometry {
    pub fn new(object: String, groups: Vec<String>, material: String) -> Self {
        Self {
            object,
            groups,
            material,
            data: VertexData::new(),
        }
    }

    /// Vertex count, taken from the first present buffer.
    pub fn vertex_count(&self) -> usize {
        self.data
            .iter()
            .next()
            .map_or(0, |(kind, values)| values.len() / kind.arity())
    }

    pub fn triangle_count(&self) -> usize {
        self.vertex_count() / 3
    }

    pub fn extents(&self) -> Option<Extents> {
        self.data.position().and_then(Extents::from_positions)
    }
}

/// Non-fatal notice raised while parsing in lenient mode.
#[derive(Clone, Debug, PartialEq)]
pub enum DiagnosticKind {
    UnhandledKeyword(String),
    InvalidNumber(String),
    InvalidIndex {
        kind: AttributeKind,
        token: String,
    },
    IndexOutOfRange {
        kind: AttributeKind,
        index: i64,
        len: usize,
    },
    /// Face with fewer than three vertex references.
    DegenerateFace(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    /// 1-based line number.
    pub line: usize,
    pub kind: DiagnosticKind,
}

/// Everything a single parse produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParseResult {
    pub geometries: Vec<Geometry>,
    /// `mtllib` arguments, verbatim.
    pub material_libs: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    /// Union of the extents of every geometry with positions.
    pub fn extents(&self) -> Option<Extents> {
        self.geometries
            .iter()
            .filter_map(Geometry::extents)
            .reduce(|a, b| a.union(&b))
    }

    pub fn triangle_count(&self) -> usize {
        self.geometries.iter().map(Geometry::triangle_count).sum()
    }
}
