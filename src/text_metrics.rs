use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

static FONT_MEASURER: Lazy<Mutex<FontMeasurer>> = Lazy::new(|| Mutex::new(FontMeasurer::new()));

/// Width of `text` in user units.
///
/// With `fast` the width comes from per-character estimates, which keeps
/// output identical across machines. Otherwise the first installed font
/// matching `font_family` is measured, falling back to the estimate.
pub fn text_width(text: &str, font_size: f32, font_family: &str, fast: bool) -> f32 {
    if text.is_empty() || font_size <= 0.0 {
        return 0.0;
    }
    if !fast
        && let Some(width) = measure_with_font(text, font_size, font_family)
    {
        return width;
    }
    estimate_width(text, font_size)
}

pub fn estimate_width(text: &str, font_size: f32) -> f32 {
    text.chars()
        .filter(|ch| *ch != '\n')
        .map(|ch| char_width_factor(ch) * font_size)
        .sum()
}

/// Approximate advance of `ch` in ems for a proportional sans-serif face.
fn char_width_factor(ch: char) -> f32 {
    match ch {
        ' ' => 0.28,
        '\t' => 1.12,
        'i' | 'j' | 'l' | '!' | '|' | '.' | ',' | ':' | ';' | '\'' => 0.24,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '{' | '}' | '/' | '\\' | '-' => 0.34,
        'm' | 'w' => 0.84,
        'M' | 'W' | '@' => 0.9,
        'A'..='Z' => 0.67,
        '0'..='9' => 0.56,
        'a'..='z' => 0.53,
        _ if ch.is_ascii() => 0.56,
        _ if is_wide(ch) => 1.0,
        _ => 0.6,
    }
}

fn is_wide(ch: char) -> bool {
    matches!(ch as u32,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFF00..=0xFF60
        | 0x1F300..=0x1FAFF)
}

fn measure_with_font(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    let mut guard = FONT_MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

struct FontMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    faces: HashMap<String, Option<FontFace>>,
}

impl FontMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            faces: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = font_family.trim().to_string();
        if !self.faces.contains_key(&key) {
            let face = self.load_face(&key);
            if face.is_none() {
                tracing::debug!(font_family = key.as_str(), "no installed font matches, estimating widths");
            }
            self.faces.insert(key.clone(), face);
        }
        let face = self.faces.get_mut(&key)?.as_mut()?;
        face.width(&text.replace('\t', "    "), font_size)
    }

    fn load_face(&mut self, font_family: &str) -> Option<FontFace> {
        let names: Vec<&str> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\''))
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" | "system-ui" | "-apple-system" => Family::SansSerif,
                "monospace" => Family::Monospace,
                "cursive" => Family::Cursive,
                "fantasy" => Family::Fantasy,
                _ => Family::Name(name),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }
        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| FontFace::new(data.to_vec(), index))
            .flatten()
    }
}

/// Font bytes plus the advances already looked up, in font units.
struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    advances: HashMap<char, Option<u16>>,
}

impl FontFace {
    fn new(data: Vec<u8>, index: u32) -> Option<Self> {
        let units_per_em = Face::parse(&data, index).ok()?.units_per_em().max(1);
        Some(Self {
            data,
            index,
            units_per_em,
            advances: HashMap::new(),
        })
    }

    fn width(&mut self, text: &str, font_size: f32) -> Option<f32> {
        let scale = font_size / f32::from(self.units_per_em);
        let mut face: Option<Face<'_>> = None;
        let mut width = 0.0f32;
        for ch in text.chars().filter(|ch| *ch != '\n') {
            let advance = match self.advances.get(&ch) {
                Some(advance) => *advance,
                None => {
                    if face.is_none() {
                        face = Some(Face::parse(&self.data, self.index).ok()?);
                    }
                    let advance = face
                        .as_ref()
                        .and_then(|face| face.glyph_index(ch).and_then(|id| face.glyph_hor_advance(id)));
                    self.advances.insert(ch, advance);
                    advance
                }
            };
            width += match advance {
                Some(advance) => f32::from(advance) * scale,
                None => char_width_factor(ch) * font_size,
            };
        }
        Some(width.max(0.0))
    }
}
