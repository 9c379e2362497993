//! Asset parsers: OBJ subset to flat, triangulated vertex buffers.

pub mod directive;
pub mod extents;
pub mod geometry;
pub mod obj;
pub mod pool;

pub use corelib::{AttributeKind, CoreError, CoreResult};
pub use extents::Extents;
pub use geometry::{Diagnostic, DiagnosticKind, Geometry, ParseResult, VertexData};
pub use obj::{IndexPolicy, ParseOptions, parse, parse_with_options};
