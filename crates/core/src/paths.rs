//! Default storage locations.
//!
//! Single source of truth for where fontpack keeps data when no explicit
//! path is configured.

use std::path::PathBuf;

/// App data root: `~/Library/Application Support/fontpack/` (macOS) or `~/.local/share/fontpack/` (Linux).
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("fontpack"))
}

/// Results root holding built packages: `<app_data_dir>/public/`.
pub fn default_results_dir() -> Option<PathBuf> {
    app_data_dir().map(|d| d.join("public"))
}

/// Embedded fonts catalog: `<app_data_dir>/embedded_fonts.json`.
pub fn default_catalog_path() -> Option<PathBuf> {
    app_data_dir().map(|d| d.join("embedded_fonts.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_results_dir() {
        if let Some(dir) = default_results_dir() {
            assert!(dir.ends_with("fontpack/public"));
        }
    }

    #[test]
    fn test_default_catalog_path() {
        if let Some(path) = default_catalog_path() {
            assert!(path.to_string_lossy().ends_with("embedded_fonts.json"));
        }
    }
}
