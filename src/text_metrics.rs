use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use std::collections::HashMap;
use ttf_parser::Face;

/// Advance used per character when no face resolves, as a fraction of the
/// font size.
const FALLBACK_ADVANCE: f32 = 0.56;

/// Font used to size map labels. The face is resolved from the system font
/// database on first measurement and kept for the lifetime of the value.
#[derive(Debug)]
pub struct LabelFont {
    family: String,
    size: f32,
    face: FaceState,
}

#[derive(Debug)]
enum FaceState {
    Unloaded,
    Missing,
    Loaded(FontFace),
}

impl LabelFont {
    pub fn new(family: impl Into<String>, size: f32) -> Self {
        Self {
            family: family.into(),
            size,
            face: FaceState::Unloaded,
        }
    }

    /// A font that never touches the system database and measures with the
    /// fixed fallback advance.
    pub fn fallback(size: f32) -> Self {
        Self {
            family: "sans-serif".to_string(),
            size,
            face: FaceState::Missing,
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.face, FaceState::Loaded(_))
    }

    pub fn measure_width(&mut self, text: &str) -> f32 {
        if text.is_empty() || self.size <= 0.0 {
            return 0.0;
        }
        if matches!(self.face, FaceState::Unloaded) {
            self.face = match load_face(&self.family) {
                Some(face) => FaceState::Loaded(face),
                None => {
                    log::debug!("no face for \"{}\", using fallback advances", self.family);
                    FaceState::Missing
                }
            };
        }
        let size = self.size;
        match &mut self.face {
            FaceState::Loaded(face) => face.measure_width(text, size),
            _ => text.chars().filter(|ch| *ch != '\n').count() as f32 * size * FALLBACK_ADVANCE,
        }
    }
}

struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    ascii_advances: [u16; 128],
    advance_cache: HashMap<char, Option<u16>>,
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFace")
            .field("bytes", &self.data.len())
            .field("index", &self.index)
            .field("units_per_em", &self.units_per_em)
            .finish()
    }
}

impl FontFace {
    fn parse(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let units_per_em = face.units_per_em().max(1);
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph_id) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph_id).unwrap_or(0);
            }
        }
        Some(Self {
            data,
            index,
            units_per_em,
            ascii_advances,
            advance_cache: HashMap::new(),
        })
    }

    fn measure_width(&mut self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * FALLBACK_ADVANCE;

        if text.is_ascii() {
            let mut width = 0.0f32;
            for byte in text.as_bytes() {
                if *byte == b'\n' {
                    continue;
                }
                let advance = self.ascii_advances[*byte as usize];
                if advance == 0 {
                    width += fallback;
                } else {
                    width += advance as f32 * scale;
                }
            }
            return width.max(0.0);
        }

        // Parsed only when a character misses the advance cache.
        let mut face: Option<Face<'_>> = None;
        let mut width = 0.0f32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let advance = match self.advance_cache.get(&ch) {
                Some(cached) => *cached,
                None => {
                    if face.is_none() {
                        face = Face::parse(&self.data, self.index).ok();
                    }
                    let advance = face.as_ref().and_then(|face| {
                        face.glyph_index(ch)
                            .and_then(|glyph| face.glyph_hor_advance(glyph))
                    });
                    self.advance_cache.insert(ch, advance);
                    advance
                }
            };
            match advance {
                Some(advance) if advance > 0 => width += advance as f32 * scale,
                _ => width += fallback,
            }
        }
        width.max(0.0)
    }
}

fn load_face(font_family: &str) -> Option<FontFace> {
    #[derive(Clone, Copy)]
    enum FamilyToken {
        Generic(Family<'static>),
        Name(usize),
    }

    let mut names: Vec<String> = Vec::new();
    let mut order: Vec<FamilyToken> = Vec::new();
    for part in font_family.split(',') {
        let raw = part.trim().trim_matches('"').trim_matches('\'');
        if raw.is_empty() {
            continue;
        }
        match raw.to_ascii_lowercase().as_str() {
            "serif" => order.push(FamilyToken::Generic(Family::Serif)),
            "sans-serif" | "system-ui" => order.push(FamilyToken::Generic(Family::SansSerif)),
            "monospace" => order.push(FamilyToken::Generic(Family::Monospace)),
            _ => {
                order.push(FamilyToken::Name(names.len()));
                names.push(raw.to_string());
            }
        }
    }
    if order.is_empty() {
        order.push(FamilyToken::Generic(Family::SansSerif));
    }

    let families: Vec<Family<'_>> = order
        .iter()
        .map(|token| match token {
            FamilyToken::Generic(family) => *family,
            FamilyToken::Name(idx) => Family::Name(names[*idx].as_str()),
        })
        .collect();

    let mut db = Database::new();
    db.load_system_fonts();
    let query = Query {
        families: &families,
        weight: Weight::NORMAL,
        stretch: Stretch::Normal,
        style: Style::Normal,
    };
    let id = db.query(&query)?;
    db.with_face_data(id, |data, index| FontFace::parse(data.to_vec(), index))
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_width_scales_with_characters() {
        let mut font = LabelFont::fallback(10.0);
        assert_eq!(font.measure_width(""), 0.0);
        assert!((font.measure_width("abcd") - 22.4).abs() < 1e-4);
        assert!(!font.is_loaded());
    }

    #[test]
    fn cached_advances_skip_face_parsing() {
        // The data is not a valid font, so any re-parse would fall back to
        // 0.56em per character instead of the cached advances.
        let mut face = FontFace {
            data: Vec::new(),
            index: 0,
            units_per_em: 1000,
            ascii_advances: [0; 128],
            advance_cache: HashMap::from([('東', Some(1000)), ('京', Some(500))]),
        };
        assert!((face.measure_width("東京", 16.0) - 24.0).abs() < 1e-4);
        assert!((face.measure_width("京東京", 16.0) - 32.0).abs() < 1e-4);
        assert_eq!(face.advance_cache.len(), 2);
    }

    #[test]
    fn uncached_characters_are_remembered() {
        let mut face = FontFace {
            data: Vec::new(),
            index: 0,
            units_per_em: 1000,
            ascii_advances: [0; 128],
            advance_cache: HashMap::new(),
        };
        assert!((face.measure_width("大阪", 10.0) - 11.2).abs() < 1e-4);
        assert_eq!(face.advance_cache.get(&'大'), Some(&None));
        assert_eq!(face.advance_cache.len(), 2);
    }

    #[test]
    fn newlines_do_not_add_width() {
        let mut font = LabelFont::fallback(10.0);
        assert_eq!(font.measure_width("ab\n"), font.measure_width("ab"));
    }
}
