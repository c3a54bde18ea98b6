//! Tag color palette and legacy color normalization
//!
//! Tag colors are always stored as a `{bg, color}` pair serialized to JSON.
//! Older rows may hold a bare string (`#EC4899`, or the same value JSON-quoted);
//! [`TagColor::from_stored`] converts those once, at the persistence boundary.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Background tint + foreground color pair for a tag chip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagColor {
    pub bg: String,
    pub color: String,
}

/// A named palette entry
#[derive(Debug, Clone, Copy)]
pub struct PaletteEntry {
    pub name: &'static str,
    pub bg: &'static str,
    pub color: &'static str,
}

impl PaletteEntry {
    pub fn to_color(&self) -> TagColor {
        TagColor {
            bg: self.bg.to_string(),
            color: self.color.to_string(),
        }
    }
}

/// Fixed tag palette
pub const PALETTE: [PaletteEntry; 10] = [
    PaletteEntry { name: "red", bg: "rgba(239, 68, 68, 0.15)", color: "rgb(239, 68, 68)" },
    PaletteEntry { name: "orange", bg: "rgba(249, 115, 22, 0.15)", color: "rgb(249, 115, 22)" },
    PaletteEntry { name: "amber", bg: "rgba(245, 158, 11, 0.15)", color: "rgb(245, 158, 11)" },
    PaletteEntry { name: "lime", bg: "rgba(132, 204, 22, 0.15)", color: "rgb(132, 204, 22)" },
    PaletteEntry { name: "emerald", bg: "rgba(16, 185, 129, 0.15)", color: "rgb(16, 185, 129)" },
    PaletteEntry { name: "cyan", bg: "rgba(6, 182, 212, 0.15)", color: "rgb(6, 182, 212)" },
    PaletteEntry { name: "blue", bg: "rgba(59, 130, 246, 0.15)", color: "rgb(59, 130, 246)" },
    PaletteEntry { name: "indigo", bg: "rgba(99, 102, 241, 0.15)", color: "rgb(99, 102, 241)" },
    PaletteEntry { name: "violet", bg: "rgba(139, 92, 246, 0.15)", color: "rgb(139, 92, 246)" },
    PaletteEntry { name: "pink", bg: "rgba(236, 72, 153, 0.15)", color: "rgb(236, 72, 153)" },
];

/// Palette entry used when a new tag is created without a color
pub const DEFAULT_PALETTE_ENTRY: &str = "blue";

/// Look up a palette entry by name (case-insensitive)
pub fn palette_entry(name: &str) -> Option<&'static PaletteEntry> {
    PALETTE.iter().find(|e| e.name.eq_ignore_ascii_case(name))
}

fn hex_color_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid regex"))
}

impl Default for TagColor {
    fn default() -> Self {
        palette_entry(DEFAULT_PALETTE_ENTRY)
            .map(PaletteEntry::to_color)
            .unwrap_or_else(|| PALETTE[0].to_color())
    }
}

impl TagColor {
    /// Build the pair for a legacy bare color string
    ///
    /// Hex colors get a `15` alpha suffix for the tint; anything else is used
    /// for both halves.
    pub fn from_legacy(raw: &str) -> Self {
        let raw = raw.trim();
        if hex_color_re().is_match(raw) {
            TagColor {
                bg: format!("{}15", raw),
                color: raw.to_string(),
            }
        } else if let Some(entry) = palette_entry(raw) {
            entry.to_color()
        } else {
            TagColor {
                bg: raw.to_string(),
                color: raw.to_string(),
            }
        }
    }

    /// Decode a stored color column
    ///
    /// Accepts the structured JSON form, a JSON-quoted legacy string, or a bare
    /// legacy string. Empty/NULL columns decode to the default palette entry.
    pub fn from_stored(stored: Option<&str>) -> Self {
        let Some(raw) = stored.map(str::trim).filter(|s| !s.is_empty()) else {
            return TagColor::default();
        };

        if let Ok(color) = serde_json::from_str::<TagColor>(raw) {
            return color;
        }
        if let Ok(quoted) = serde_json::from_str::<String>(raw) {
            return TagColor::from_legacy(&quoted);
        }
        TagColor::from_legacy(raw)
    }

    /// Encode for the `tags.color` column
    pub fn to_stored(&self) -> String {
        // Serializing two strings cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_blue() {
        let c = TagColor::default();
        assert_eq!(c.color, "rgb(59, 130, 246)");
    }

    #[test]
    fn test_legacy_hex() {
        let c = TagColor::from_legacy("#EC4899");
        assert_eq!(c.bg, "#EC489915");
        assert_eq!(c.color, "#EC4899");
    }

    #[test]
    fn test_from_stored_variants() {
        let structured = r#"{"bg":"a","color":"b"}"#;
        assert_eq!(
            TagColor::from_stored(Some(structured)),
            TagColor { bg: "a".into(), color: "b".into() }
        );

        let quoted = r##""#10b981""##;
        assert_eq!(TagColor::from_stored(Some(quoted)).color, "#10b981");

        assert_eq!(TagColor::from_stored(Some("#10b981")).bg, "#10b98115");
        assert_eq!(TagColor::from_stored(None), TagColor::default());
        assert_eq!(TagColor::from_stored(Some("  ")), TagColor::default());
    }

    #[test]
    fn test_named_legacy_color() {
        let c = TagColor::from_legacy("Pink");
        assert_eq!(c.color, "rgb(236, 72, 153)");
    }
}
