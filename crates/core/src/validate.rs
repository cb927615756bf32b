// crates/core/src/validate.rs
//! Normalize a raw generate request into a [`CanonicalGlyphList`].
//!
//! Unknown fonts, unknown glyph codes and malformed entries are dropped
//! rather than failing the whole request. The drop counts are returned in
//! [`Validated`] so callers can log or assert on them.

use serde::Deserialize;
use serde_json::Value;

use crate::catalog::GlyphCatalog;
use crate::error::ValidationError;
use crate::types::{CanonicalGlyph, CanonicalGlyphList, GlyphRef};

/// Per-reason tally of entries that were filtered out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropCounts {
    /// Entry was not a `{src, from, code?}` object.
    pub malformed: usize,
    /// `src` does not name a catalog font.
    pub unknown_font: usize,
    /// `from` is not a glyph of that font.
    pub unknown_glyph: usize,
}

impl DropCounts {
    pub fn total(&self) -> usize {
        self.malformed + self.unknown_font + self.unknown_glyph
    }
}

/// Result of a successful validation.
#[derive(Debug, Clone)]
pub struct Validated {
    pub glyphs: CanonicalGlyphList,
    pub dropped: DropCounts,
}

/// Validate `request` against `catalog`.
///
/// The request must be an object whose `glyphs` field is a list. Survivors
/// are sorted by source code point; equal code points keep input order.
pub fn validate(request: &Value, catalog: &GlyphCatalog) -> Result<Validated, ValidationError> {
    let entries = match request.as_object().and_then(|obj| obj.get("glyphs")) {
        None => return Err(ValidationError::MissingGlyphs),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(ValidationError::NotAList),
    };

    let mut dropped = DropCounts::default();
    let mut glyphs = Vec::with_capacity(entries.len());

    for entry in entries {
        let Ok(glyph_ref) = GlyphRef::deserialize(entry) else {
            dropped.malformed += 1;
            continue;
        };
        let Some(font) = catalog.font(&glyph_ref.src) else {
            dropped.unknown_font += 1;
            continue;
        };
        let Some(source) = font.glyph(glyph_ref.from) else {
            dropped.unknown_glyph += 1;
            continue;
        };

        glyphs.push(CanonicalGlyph {
            css: source.css.clone(),
            src: glyph_ref.src,
            from: glyph_ref.from,
            // A zero override means "keep the source code point".
            code: glyph_ref.code.filter(|&c| c != 0).unwrap_or(glyph_ref.from),
        });
    }

    if dropped.total() > 0 {
        tracing::debug!(
            requested = entries.len(),
            kept = glyphs.len(),
            malformed = dropped.malformed,
            unknown_font = dropped.unknown_font,
            unknown_glyph = dropped.unknown_glyph,
            "dropped glyph entries from request"
        );
    }

    if glyphs.is_empty() {
        return Err(ValidationError::NoValidGlyphs {
            requested: entries.len(),
        });
    }

    Ok(Validated {
        glyphs: CanonicalGlyphList::from_unsorted(glyphs),
        dropped,
    })
}
