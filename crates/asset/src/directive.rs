//! Line splitting and the closed set of recognized OBJ keywords.

use corelib::AttributeKind;

/// Recognized directive keywords. Anything else is reported and skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    /// `v`, `vt`, `vn`
    Vertex(AttributeKind),
    Face,
    /// `s`: accepted, has no effect.
    Smoothing,
    MaterialLib,
    UseMaterial,
    Group,
    Object,
}

impl Keyword {
    pub fn parse(keyword: &str) -> Option<Self> {
        let kw = match keyword {
            "v" => Keyword::Vertex(AttributeKind::Position),
            "vt" => Keyword::Vertex(AttributeKind::Texcoord),
            "vn" => Keyword::Vertex(AttributeKind::Normal),
            "f" => Keyword::Face,
            "s" => Keyword::Smoothing,
            "mtllib" => Keyword::MaterialLib,
            "usemtl" => Keyword::UseMaterial,
            "g" => Keyword::Group,
            "o" => Keyword::Object,
            _ => return None,
        };
        Some(kw)
    }
}

/// A trimmed, non-comment line split two ways.
#[derive(Debug, PartialEq)]
pub struct RawLine<'a> {
    /// Leading run of `[A-Za-z0-9_]`; may be empty.
    pub keyword: &'a str,
    /// Everything after the keyword and the whitespace following it, verbatim.
    pub rest: &'a str,
    /// Whitespace-delimited tokens after the first one.
    pub args: Vec<&'a str>,
}

impl<'a> RawLine<'a> {
    /// Returns `None` for blank lines and `#` comments.
    pub fn split(line: &'a str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }

        let end = trimmed
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(trimmed.len());
        let (keyword, rest) = trimmed.split_at(end);

        Some(Self {
            keyword,
            rest: rest.trim_start(),
            args: trimmed.split_whitespace().skip(1).collect(),
        })
    }
}
