// crates/core/src/fingerprint.rs
//! Content addressing for glyph selections.

use sha2::{Digest, Sha256};

use crate::types::{CanonicalGlyphList, FontId};

/// Compute the [`FontId`] of a canonical glyph list.
///
/// The list is encoded as compact JSON, an array of
/// `{"css","src","from","code"}` objects in that key order, then hashed with
/// SHA-256. Equal lists always produce equal ids.
pub fn fingerprint(glyphs: &CanonicalGlyphList) -> FontId {
    let encoded = canonical_bytes(glyphs);
    FontId::from_digest(&Sha256::digest(&encoded))
}

/// The exact byte string that [`fingerprint`] hashes.
pub fn canonical_bytes(glyphs: &CanonicalGlyphList) -> Vec<u8> {
    // Struct serialization cannot fail: only strings and integers.
    serde_json::to_vec(glyphs).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CanonicalGlyph;

    fn glyph(src: &str, from: u32, code: u32) -> CanonicalGlyph {
        CanonicalGlyph {
            css: format!("icon-{from}"),
            src: src.into(),
            from,
            code,
        }
    }

    #[test]
    fn test_encoding_has_fixed_key_order() {
        let list = CanonicalGlyphList::from_unsorted(vec![glyph("A", 10, 10)]);
        let encoded = String::from_utf8(canonical_bytes(&list)).unwrap();
        assert_eq!(
            encoded,
            r#"[{"css":"icon-10","src":"A","from":10,"code":10}]"#
        );
    }

    #[test]
    fn test_fingerprint_is_order_independent() {
        let a = CanonicalGlyphList::from_unsorted(vec![
            glyph("A", 30, 30),
            glyph("A", 10, 10),
            glyph("A", 20, 20),
        ]);
        let b = CanonicalGlyphList::from_unsorted(vec![
            glyph("A", 20, 20),
            glyph("A", 30, 30),
            glyph("A", 10, 10),
        ]);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_distinguishes_content() {
        let a = CanonicalGlyphList::from_unsorted(vec![glyph("A", 10, 10)]);
        let remapped = CanonicalGlyphList::from_unsorted(vec![glyph("A", 10, 11)]);
        let other_font = CanonicalGlyphList::from_unsorted(vec![glyph("B", 10, 10)]);
        assert_ne!(fingerprint(&a), fingerprint(&remapped));
        assert_ne!(fingerprint(&a), fingerprint(&other_font));
    }

    #[test]
    fn test_fingerprint_shape() {
        let id = fingerprint(&CanonicalGlyphList::from_unsorted(vec![glyph("A", 1, 1)]));
        assert_eq!(id.as_str().len(), crate::types::FONT_ID_LEN);
        assert!(FontId::parse(id.as_str()).is_some());
    }
}
