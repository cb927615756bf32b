// crates/core/src/types.rs
use std::fmt;

use serde::{Deserialize, Serialize};

/// Length of a [`FontId`] in hex characters (SHA-256 digest).
pub const FONT_ID_LEN: usize = 64;

/// One entry of a generate request, as sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphRef {
    /// Name of the source font in the catalog.
    pub src: String,
    /// Code point of the glyph inside the source font.
    pub from: u32,
    /// Code point the glyph should be mapped to in the built font.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
}

/// A resolved glyph, ready to be fingerprinted and built.
///
/// Field order is part of the fingerprint encoding. Do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalGlyph {
    pub css: String,
    pub src: String,
    pub from: u32,
    pub code: u32,
}

/// Validated glyph selection, sorted by `from` ascending.
///
/// Every constructor sorts, deserialization included, so holding one implies
/// the sort invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CanonicalGlyphList(Vec<CanonicalGlyph>);

impl CanonicalGlyphList {
    /// Sort `glyphs` stably by source code point and wrap them.
    pub fn from_unsorted(mut glyphs: Vec<CanonicalGlyph>) -> Self {
        glyphs.sort_by_key(|g| g.from);
        Self(glyphs)
    }

    pub fn glyphs(&self) -> &[CanonicalGlyph] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CanonicalGlyph> {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for CanonicalGlyphList {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Vec::<CanonicalGlyph>::deserialize(d).map(Self::from_unsorted)
    }
}

impl<'a> IntoIterator for &'a CanonicalGlyphList {
    type Item = &'a CanonicalGlyph;
    type IntoIter = std::slice::Iter<'a, CanonicalGlyph>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Content hash of a canonical glyph selection, lowercase hex.
///
/// Used as the deduplication key and as the artifact path key, so only
/// well-formed hex ids can be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FontId(String);

impl FontId {
    /// Parse a client-supplied id. Returns `None` unless it is exactly
    /// [`FONT_ID_LEN`] hex characters. Uppercase input is normalized.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() != FONT_ID_LEN || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(raw.to_ascii_lowercase()))
    }

    pub(crate) fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The two directory shards: characters `[0..2]` and `[2..4]`.
    pub fn shards(&self) -> (&str, &str) {
        (&self.0[0..2], &self.0[2..4])
    }
}

impl fmt::Display for FontId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FontId {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        FontId::parse(&raw).ok_or_else(|| serde::de::Error::custom("malformed font id"))
    }
}
