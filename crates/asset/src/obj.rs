//! OBJ subset parser producing flat, triangulated vertex buffers per geometry.
//!
//! Recognized: `v`, `vt`, `vn`, `f`, `s`, `mtllib`, `usemtl`, `g`, `o`.
//! Everything else is reported as a diagnostic and skipped.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result};
use corelib::{AttributeKind, CoreError, CoreResult};

use crate::{
    directive::{Keyword, RawLine},
    geometry::{Diagnostic, DiagnosticKind, Geometry, ParseResult, VertexData},
    pool::AttributePool,
};

const DEFAULT_NAME: &str = "default";

/// What to do with malformed numbers and face indices that do not resolve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IndexPolicy {
    /// Substitute `NaN`s, record a diagnostic and keep going.
    #[default]
    Lenient,
    /// Stop at the first problem with an error naming the line.
    Strict,
}

#[derive(Clone, Debug, Default)]
pub struct ParseOptions {
    pub index_policy: IndexPolicy,
}

impl ParseOptions {
    pub fn strict() -> Self {
        Self {
            index_policy: IndexPolicy::Strict,
        }
    }
}

/// Parse OBJ text leniently. Never fails; problems end up in `diagnostics`.
pub fn parse(text: &str) -> ParseResult {
    // Lenient handlers never return an error.
    parse_with_options(text, &ParseOptions::default()).unwrap_or_else(|err| {
        log::error!("Lenient OBJ parse failed: {err}");
        ParseResult::default()
    })
}

/// Parse OBJ text with explicit options.
pub fn parse_with_options(text: &str, options: &ParseOptions) -> CoreResult<ParseResult> {
    let mut parser = ObjParser::new(options.clone());
    for (line_no, line) in text.split('\n').enumerate() {
        parser.feed_line(line_no + 1, line)?;
    }
    Ok(parser.finish())
}

/// Load and parse an OBJ file.
pub fn load_obj_from_path(path: impl AsRef<Path>, options: &ParseOptions) -> Result<ParseResult> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open OBJ file: {}", path.display()))?;
    load_obj_from_reader(BufReader::new(file), options)
        .with_context(|| format!("Failed to parse OBJ file: {}", path.display()))
}

/// Parse OBJ data from a [`BufRead`] implementation.
pub fn load_obj_from_reader<R: BufRead>(reader: R, options: &ParseOptions) -> Result<ParseResult> {
    let mut parser = ObjParser::new(options.clone());
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_no + 1))?;
        parser.feed_line(line_no + 1, &line)?;
    }
    Ok(parser.finish())
}

/// Convenience helper to parse an OBJ string literal.
pub fn load_obj_from_str(contents: &str, options: &ParseOptions) -> Result<ParseResult> {
    load_obj_from_reader(io::Cursor::new(contents), options)
}

/// Current object/group/material and whether the next face starts a new geometry.
#[derive(Debug)]
struct ParserState {
    object: String,
    groups: Vec<String>,
    material: String,
    pending_switch: bool,
}

impl Default for ParserState {
    fn default() -> Self {
        Self {
            object: DEFAULT_NAME.to_owned(),
            groups: vec![DEFAULT_NAME.to_owned()],
            material: DEFAULT_NAME.to_owned(),
            pending_switch: false,
        }
    }
}

impl ParserState {
    fn new_geometry(&self) -> Geometry {
        Geometry::new(
            self.object.clone(),
            self.groups.clone(),
            self.material.clone(),
        )
    }
}

/// Rules deciding when a new geometry begins.
struct GeometrySwitch;

impl GeometrySwitch {
    /// Pending flag after `o`, `g` or `usemtl`. A switch is only remembered
    /// once the active geometry holds positions, so consecutive metadata
    /// directives collapse into one change.
    fn after_metadata(active: Option<&Geometry>, pending: bool) -> bool {
        pending || active.is_some_and(|g| g.data.position_len() > 0)
    }

    /// Whether a face that writes vertices needs a fresh geometry.
    fn needs_new(active: Option<&Geometry>, pending: bool) -> bool {
        pending || active.is_none()
    }
}

/// Face slot after index resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
enum SlotRef {
    Empty,
    Pool(usize),
    /// Did not resolve; written as `NaN`s.
    Unresolved,
}

type Corner = [SlotRef; 3];

/// Line-by-line OBJ state machine. Feed lines in order, then call [`ObjParser::finish`].
pub struct ObjParser {
    options: ParseOptions,
    pools: [AttributePool; 3],
    state: ParserState,
    geometries: Vec<Geometry>,
    material_libs: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl ObjParser {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            pools: AttributeKind::ALL.map(AttributePool::new),
            state: ParserState::default(),
            geometries: Vec::new(),
            material_libs: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    #[inline]
    fn strict(&self) -> bool {
        self.options.index_policy == IndexPolicy::Strict
    }

    fn active(&self) -> Option<&Geometry> {
        if self.state.pending_switch {
            None
        } else {
            self.geometries.last()
        }
    }

    fn notice(&mut self, line: usize, kind: DiagnosticKind) {
        log::warn!("OBJ line {}: {:?}", line, kind);
        self.diagnostics.push(Diagnostic { line, kind });
    }

    /// Process one line. `line_no` is 1-based and only used for reporting.
    pub fn feed_line(&mut self, line_no: usize, line: &str) -> CoreResult<()> {
        let Some(raw) = RawLine::split(line) else {
            return Ok(());
        };
        let Some(keyword) = Keyword::parse(raw.keyword) else {
            log::warn!("unhandled keyword: {}", raw.keyword);
            self.diagnostics.push(Diagnostic {
                line: line_no,
                kind: DiagnosticKind::UnhandledKeyword(raw.keyword.to_owned()),
            });
            return Ok(());
        };

        match keyword {
            Keyword::Vertex(kind) => {
                let mut tuple = Vec::with_capacity(raw.args.len());
                for token in &raw.args {
                    tuple.push(self.parse_number(line_no, token)?);
                }
                self.pools[kind.slot()].push(tuple);
            }
            Keyword::Face => self.face(line_no, &raw.args)?,
            Keyword::Smoothing => {}
            Keyword::MaterialLib => self.material_libs.push(raw.rest.to_owned()),
            Keyword::UseMaterial => {
                self.state.material = raw.rest.to_owned();
                self.request_switch();
            }
            Keyword::Group => {
                self.state.groups = if raw.args.is_empty() {
                    vec![DEFAULT_NAME.to_owned()]
                } else {
                    raw.args.iter().map(|s| (*s).to_owned()).collect()
                };
                self.request_switch();
            }
            Keyword::Object => {
                self.state.object = raw.rest.to_owned();
                self.request_switch();
            }
        }
        Ok(())
    }

    fn request_switch(&mut self) {
        self.state.pending_switch =
            GeometrySwitch::after_metadata(self.active(), self.state.pending_switch);
    }

    fn parse_number(&mut self, line: usize, token: &str) -> CoreResult<f32> {
        match token.parse::<f32>() {
            Ok(value) => Ok(value),
            Err(_) if self.strict() => Err(CoreError::InvalidNumber {
                line,
                token: token.to_owned(),
            }),
            Err(_) => {
                self.notice(line, DiagnosticKind::InvalidNumber(token.to_owned()));
                Ok(f32::NAN)
            }
        }
    }

    fn resolve_slot(&mut self, line: usize, kind: AttributeKind, token: &str) -> CoreResult<SlotRef> {
        if token.is_empty() {
            return Ok(SlotRef::Empty);
        }

        let index = match token.parse::<i64>() {
            Ok(index) => index,
            Err(_) if self.strict() => {
                return Err(CoreError::InvalidIndex {
                    line,
                    kind,
                    token: token.to_owned(),
                });
            }
            Err(_) => {
                let token = token.to_owned();
                self.notice(line, DiagnosticKind::InvalidIndex { kind, token });
                return Ok(SlotRef::Unresolved);
            }
        };

        if index == 0 && self.strict() {
            return Err(CoreError::ZeroIndex { line, kind });
        }

        let pool = &self.pools[kind.slot()];
        let len = pool.len();
        match pool.resolve(index) {
            // Sentinel reached through a negative index is only tolerated leniently.
            Some(0) if index != 0 && self.strict() => Err(CoreError::IndexOutOfRange {
                line,
                kind,
                index,
                len,
            }),
            Some(slot) => Ok(SlotRef::Pool(slot)),
            None if self.strict() => Err(CoreError::IndexOutOfRange {
                line,
                kind,
                index,
                len,
            }),
            None => {
                self.notice(line, DiagnosticKind::IndexOutOfRange { kind, index, len });
                Ok(SlotRef::Unresolved)
            }
        }
    }

    fn resolve_corner(&mut self, line: usize, token: &str) -> CoreResult<Corner> {
        let mut corner = [SlotRef::Empty; 3];
        for (kind, part) in AttributeKind::ALL.into_iter().zip(token.split('/')) {
            corner[kind.slot()] = self.resolve_slot(line, kind, part)?;
        }
        Ok(corner)
    }

    fn face(&mut self, line: usize, args: &[&str]) -> CoreResult<()> {
        let mut corners = Vec::with_capacity(args.len());
        for token in args {
            corners.push(self.resolve_corner(line, token)?);
        }

        if corners.len() < 3 {
            self.notice(line, DiagnosticKind::DegenerateFace(corners.len()));
            return Ok(());
        }

        if GeometrySwitch::needs_new(self.active(), self.state.pending_switch) {
            let geometry = self.state.new_geometry();
            log::debug!(
                "OBJ line {}: new geometry (object='{}', groups={:?}, material='{}')",
                line,
                geometry.object,
                geometry.groups,
                geometry.material
            );
            self.geometries.push(geometry);
            self.state.pending_switch = false;
        }

        let Some(geometry) = self.geometries.last_mut() else {
            return Ok(());
        };

        // Fan around the first corner, keeping the polygon's winding.
        for tri in 1..corners.len() - 1 {
            for corner in [&corners[0], &corners[tri], &corners[tri + 1]] {
                write_corner(&self.pools, corner, &mut geometry.data);
            }
        }
        Ok(())
    }

    /// Finish parsing: drop empty buffers and hand over the result.
    pub fn finish(mut self) -> ParseResult {
        for geometry in &mut self.geometries {
            geometry.data.prune_empty();
        }
        log::debug!(
            "OBJ parsed: {} geometries, {} material libs, {} diagnostics",
            self.geometries.len(),
            self.material_libs.len(),
            self.diagnostics.len()
        );
        ParseResult {
            geometries: self.geometries,
            material_libs: self.material_libs,
            diagnostics: self.diagnostics,
        }
    }
}

fn write_corner(pools: &[AttributePool; 3], corner: &Corner, data: &mut VertexData) {
    for pool in pools {
        let kind = pool.kind();
        match corner[kind.slot()] {
            SlotRef::Empty => {}
            SlotRef::Pool(slot) => {
                if let Some(tuple) = pool.get(slot) {
                    data.push(kind, tuple);
                }
            }
            SlotRef::Unresolved => data.push(kind, &[f32::NAN; 3][..kind.arity()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_VERTS: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\n";

    fn positions(result: &ParseResult, geometry: usize) -> Vec<f32> {
        result.geometries[geometry]
            .data
            .position()
            .expect("positions")
            .to_vec()
    }

    #[test]
    fn parse_simple_triangle() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vn 0.0 0.0 1.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 0.0 1.0
            f 1/1/1 2/2/1 3/3/1
        "#;
        let result = parse(src);
        assert_eq!(result.geometries.len(), 1);
        let geometry = &result.geometries[0];
        assert_eq!(geometry.vertex_count(), 3);
        assert_eq!(geometry.data.texcoord().map(<[f32]>::len), Some(6));
        assert_eq!(
            geometry.data.normal(),
            Some(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0][..])
        );
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn polygon_yields_n_minus_two_triangles() {
        let src = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nv -1 1 0\n\
                   vt 0 0\nvt 1 1\nvn 0 0 1\n\
                   f 1/1/1 2/2/1 3/1/1 4/2/1 5/1/1\n";
        let result = parse(src);
        let geometry = &result.geometries[0];
        assert_eq!(geometry.triangle_count(), 3);
        assert_eq!(geometry.data.position().map(<[f32]>::len), Some(27));
        assert_eq!(geometry.data.texcoord().map(<[f32]>::len), Some(18));
        assert_eq!(geometry.data.normal().map(<[f32]>::len), Some(27));
        assert!(geometry.data.is_aligned());
    }

    #[test]
    fn quad_fans_from_first_vertex() {
        let src = "v 1 1 1\nv 2 2 2\nv 3 3 3\nv 4 4 4\nf 1 2 3 4\n";
        let result = parse(src);
        assert_eq!(
            positions(&result, 0),
            vec![
                1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0, //
                1.0, 1.0, 1.0, 3.0, 3.0, 3.0, 4.0, 4.0, 4.0,
            ]
        );
    }

    #[test]
    fn negative_indices_count_from_end() {
        let relative = parse(&format!("{TRIANGLE_VERTS}f -1 -2 -3\n"));
        let absolute = parse(&format!("{TRIANGLE_VERTS}f 3 2 1\n"));
        assert_eq!(positions(&relative, 0), positions(&absolute, 0));
    }

    #[test]
    fn slots_resolve_independently() {
        let src = format!("{TRIANGLE_VERTS}vn 0 0 1\nvn 0 0 -1\nf 1//-1 2//1 3//-2\n");
        let result = parse(&src);
        let data = &result.geometries[0].data;
        assert!(!data.contains(AttributeKind::Texcoord));
        assert_eq!(
            data.normal(),
            Some(&[0.0, 0.0, -1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0][..])
        );
        assert!(data.is_aligned());
    }

    #[test]
    fn usemtl_between_faces_splits_geometry() {
        let src = format!("{TRIANGLE_VERTS}usemtl red\nf 1 2 3\nusemtl blue\nf 3 2 1\n");
        let result = parse(&src);
        assert_eq!(result.geometries.len(), 2);
        assert_eq!(result.geometries[0].material, "red");
        assert_eq!(result.geometries[1].material, "blue");
        assert_eq!(positions(&result, 0).len(), 9);
        assert_eq!(
            positions(&result, 1),
            vec![0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn trailing_metadata_creates_nothing() {
        let src = format!("{TRIANGLE_VERTS}f 1 2 3\nusemtl unused\no tail\n");
        let result = parse(&src);
        assert_eq!(result.geometries.len(), 1);
        assert_eq!(result.geometries[0].material, DEFAULT_NAME);
    }

    #[test]
    fn only_positions_present() {
        let result = parse(&format!("{TRIANGLE_VERTS}f 1 2 3\n"));
        let kinds: Vec<AttributeKind> =
            result.geometries[0].data.iter().map(|(kind, _)| kind).collect();
        assert_eq!(kinds, vec![AttributeKind::Position]);
    }

    #[test]
    fn consecutive_switches_collapse() {
        let result = parse(&format!("o A\no B\n{TRIANGLE_VERTS}f 1 2 3\n"));
        assert_eq!(result.geometries.len(), 1);
        assert_eq!(result.geometries[0].object, "B");

        let src = format!("{TRIANGLE_VERTS}o A\nf 1 2 3\no B\ng side\nusemtl m\nf 1 2 3\n");
        let result = parse(&src);
        assert_eq!(result.geometries.len(), 2);
        let second = &result.geometries[1];
        assert_eq!(second.object, "B");
        assert_eq!(second.groups, vec!["side".to_owned()]);
        assert_eq!(second.material, "m");
    }

    #[test]
    fn unknown_keyword_is_tolerated() {
        let with = parse(&format!("{TRIANGLE_VERTS}xyz 1 2 3\nf 1 2 3\n"));
        let without = parse(&format!("{TRIANGLE_VERTS}f 1 2 3\n"));
        assert_eq!(with.geometries, without.geometries);
        assert_eq!(
            with.diagnostics,
            vec![Diagnostic {
                line: 4,
                kind: DiagnosticKind::UnhandledKeyword("xyz".to_owned()),
            }]
        );
    }

    #[test]
    fn smoothing_comments_and_blank_lines_are_quiet() {
        let src = format!("# header\n\n{TRIANGLE_VERTS}s 1\n   \ns off\nf 1 2 3\n");
        let result = parse(&src);
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.geometries.len(), 1);
    }

    #[test]
    fn names_keep_spaces() {
        let src = format!(
            "mtllib my materials.mtl\nmtllib second.mtl\no big  object\nusemtl shiny red\n{TRIANGLE_VERTS}f 1 2 3\n"
        );
        let result = parse(&src);
        assert_eq!(
            result.material_libs,
            vec!["my materials.mtl".to_owned(), "second.mtl".to_owned()]
        );
        assert_eq!(result.geometries[0].object, "big  object");
        assert_eq!(result.geometries[0].material, "shiny red");
    }

    #[test]
    fn groups_replace_and_default() {
        let result = parse(&format!("{TRIANGLE_VERTS}f 1 2 3\ng a b\nf 1 2 3\ng\nf 1 2 3\n"));
        let groups: Vec<Vec<String>> = result.geometries.iter().map(|g| g.groups.clone()).collect();
        assert_eq!(
            groups,
            vec![
                vec!["default".to_owned()],
                vec!["a".to_owned(), "b".to_owned()],
                vec!["default".to_owned()],
            ]
        );
        assert_eq!(result.geometries[0].object, "default");
    }

    #[test]
    fn degenerate_face_allocates_nothing() {
        let result = parse(&format!("{TRIANGLE_VERTS}o A\nf 1 2\no B\nf 1 2 3\n"));
        assert_eq!(result.geometries.len(), 1);
        assert_eq!(result.geometries[0].object, "B");
        assert_eq!(result.diagnostics[0].kind, DiagnosticKind::DegenerateFace(2));
        assert_eq!(result.diagnostics[0].line, 5);
    }

    #[test]
    fn carriage_returns_are_trimmed() {
        let result = parse("v 0 0 0\r\nv 1 0 0\r\nv 0 1 0\r\nusemtl m\r\nf 1 2 3\r\n");
        assert_eq!(result.geometries[0].material, "m");
        assert_eq!(positions(&result, 0).len(), 9);
    }

    #[test]
    fn short_tuples_propagate() {
        let result = parse("v 1 2\nv 3 4\nv 5 6\nf 1 2 3\n");
        assert_eq!(positions(&result, 0), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn lenient_out_of_range_fills_nan() {
        let result = parse("v 1 1 1\nvt 0 0\nf 1/1 2/1 3/-5\n");
        let data = &result.geometries[0].data;
        let pos = data.position().expect("positions");
        assert_eq!(&pos[..3], &[1.0, 1.0, 1.0]);
        assert!(pos[3..].iter().all(|v| v.is_nan()));
        assert!(data.texcoord().expect("texcoords")[4..].iter().all(|v| v.is_nan()));
        assert!(data.is_aligned());
        assert_eq!(
            result.diagnostics[0].kind,
            DiagnosticKind::IndexOutOfRange {
                kind: AttributeKind::Position,
                index: 2,
                len: 1,
            }
        );
        assert_eq!(result.diagnostics.len(), 3);
    }

    #[test]
    fn lenient_bad_number_becomes_nan() {
        let result = parse("v 1 oops 3\n");
        assert_eq!(
            result.diagnostics,
            vec![Diagnostic {
                line: 1,
                kind: DiagnosticKind::InvalidNumber("oops".to_owned()),
            }]
        );
    }

    #[test]
    fn lenient_zero_index_reads_sentinel() {
        let result = parse("v 5 5 5\nf 0 1 1\n");
        assert_eq!(&positions(&result, 0)[..3], &[0.0, 0.0, 0.0]);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn strict_reports_line() {
        let strict = ParseOptions::strict();
        let err = parse_with_options(&format!("{TRIANGLE_VERTS}\nf 1 2 4\n"), &strict)
            .expect_err("index 4 is out of range");
        assert_eq!(
            err,
            CoreError::IndexOutOfRange {
                line: 5,
                kind: AttributeKind::Position,
                index: 4,
                len: 3,
            }
        );

        let err = parse_with_options("v 1 x 3\n", &strict).expect_err("bad float");
        assert_eq!(err.line(), 1);

        let err = parse_with_options(&format!("{TRIANGLE_VERTS}f 0 1 2\n"), &strict)
            .expect_err("zero index");
        assert!(matches!(err, CoreError::ZeroIndex { line: 4, .. }));

        let err = parse_with_options(&format!("{TRIANGLE_VERTS}f 1/a 2 3\n"), &strict)
            .expect_err("bad index");
        assert!(matches!(err, CoreError::InvalidIndex { kind: AttributeKind::Texcoord, .. }));

        let err = parse_with_options(&format!("{TRIANGLE_VERTS}f -4 1 2\n"), &strict)
            .expect_err("negative index before the first vertex");
        assert!(matches!(err, CoreError::IndexOutOfRange { index: -4, .. }));
    }

    #[test]
    fn strict_accepts_valid_input() {
        let src = format!("{TRIANGLE_VERTS}f 1 2 3\nxyz\n");
        let result = parse_with_options(&src, &ParseOptions::strict()).expect("valid input");
        assert_eq!(result, parse(&src));
    }

    #[test]
    fn reader_matches_string_parse() {
        let src = format!("{TRIANGLE_VERTS}usemtl a\nf 1 2 3\nusemtl b\nf 1 2 3\n");
        let loaded = load_obj_from_str(&src, &ParseOptions::default()).expect("load");
        assert_eq!(loaded, parse(&src));
    }

    #[test]
    fn strict_loader_error_has_context() {
        let err = load_obj_from_str("f 1 2 3\n", &ParseOptions::strict()).expect_err("no vertices");
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn result_extents_span_geometries() {
        let src = "v -1 0 0\nv 0 2 0\nv 0 0 3\nv 5 5 5\nf 1 2 3\nusemtl m\nf 2 3 4\n";
        let extents = parse(src).extents().expect("extents");
        assert_eq!(extents.min, glam::Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(extents.max, glam::Vec3::new(5.0, 5.0, 5.0));
    }
}
