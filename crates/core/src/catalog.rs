// crates/core/src/catalog.rs
//! Catalog of embeddable source fonts and their glyph tables.
//!
//! Loaded once at startup from the embedded-fonts config and never mutated
//! afterwards. Lookup is by font name, then by source code point.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::CatalogError;

/// A single glyph of a source font.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceGlyph {
    pub code: u32,
    pub css: String,
}

/// A known embeddable font.
#[derive(Debug, Clone)]
pub struct GlyphSource {
    name: String,
    glyphs: HashMap<u32, SourceGlyph>,
}

impl GlyphSource {
    pub fn new(name: impl Into<String>, glyphs: impl IntoIterator<Item = SourceGlyph>) -> Self {
        let mut by_code = HashMap::new();
        for glyph in glyphs {
            // First definition of a code point wins.
            by_code.entry(glyph.code).or_insert(glyph);
        }
        Self {
            name: name.into(),
            glyphs: by_code,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn glyph(&self, code: u32) -> Option<&SourceGlyph> {
        self.glyphs.get(&code)
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

#[derive(Deserialize)]
struct RawFontConfig {
    font: RawFontMeta,
    #[serde(default)]
    glyphs: Vec<SourceGlyph>,
}

#[derive(Deserialize)]
struct RawFontMeta {
    fontname: String,
}

/// Immutable name → font index.
#[derive(Debug, Clone, Default)]
pub struct GlyphCatalog {
    fonts: HashMap<String, GlyphSource>,
}

impl GlyphCatalog {
    pub fn new(sources: impl IntoIterator<Item = GlyphSource>) -> Self {
        let mut fonts = HashMap::new();
        for source in sources {
            if let Some(prev) = fonts.insert(source.name.clone(), source) {
                tracing::warn!(font = %prev.name, "duplicate font in catalog, later entry wins");
            }
        }
        Self { fonts }
    }

    /// Parse the embedded-fonts config:
    /// `[{ "font": { "fontname": "..." }, "glyphs": [{ "code": 59392, "css": "..." }] }]`.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: Vec<RawFontConfig> = serde_json::from_str(json)
            .map_err(|e| CatalogError::Malformed { message: e.to_string() })?;
        Ok(Self::new(
            raw.into_iter()
                .map(|cfg| GlyphSource::new(cfg.font.fontname, cfg.glyphs)),
        ))
    }

    /// Read and parse the catalog file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
        let catalog = Self::from_json(&json)?;
        tracing::info!(
            path = %path.display(),
            fonts = catalog.len(),
            "glyph catalog loaded"
        );
        Ok(catalog)
    }

    pub fn font(&self, name: &str) -> Option<&GlyphSource> {
        self.fonts.get(name)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}
