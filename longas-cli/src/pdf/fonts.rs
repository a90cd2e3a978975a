//! Font lookups for text decoding and glyph advances

use std::collections::BTreeMap;

use lopdf::Encoding;
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Advance used when a font carries no `Widths` entry (in 1/1000 em)
const DEFAULT_GLYPH_WIDTH: f32 = 500.0;

/// Text decoded from one string operand
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRun {
    pub text: String,
    /// Sum of glyph advances in 1/1000 em
    pub width_units: f32,
    pub glyph_count: usize,
    pub space_count: usize,
}

/// A page font resource
pub struct LoadedFont<'a> {
    encoding: Option<Encoding<'a>>,
    first_char: i64,
    widths: Vec<f32>,
    two_byte: bool,
}

impl<'a> LoadedFont<'a> {
    fn load(doc: &'a Document, dict: &'a Dictionary) -> Self {
        let two_byte = matches!(dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Type0");

        let encoding = match dict.get_font_encoding(doc) {
            Ok(encoding) => Some(encoding),
            Err(err) => {
                log::debug!("Font encoding unavailable, decoding as Latin-1: {}", err);
                None
            }
        };

        let first_char = match dict.get(b"FirstChar") {
            Ok(Object::Integer(value)) => *value,
            _ => 0,
        };

        let widths = match dict.get(b"Widths").map(|o| resolve(doc, o)) {
            Ok(Object::Array(items)) => items
                .iter()
                .map(|o| number(o).unwrap_or(DEFAULT_GLYPH_WIDTH))
                .collect(),
            _ => Vec::new(),
        };

        Self {
            encoding,
            first_char,
            widths,
            two_byte,
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> DecodedRun {
        let text = match &self.encoding {
            Some(encoding) => {
                Document::decode_text(encoding, bytes).unwrap_or_else(|_| decode_latin1(bytes))
            }
            None => decode_latin1(bytes),
        };

        if self.two_byte {
            let glyph_count = bytes.len() / 2;
            return DecodedRun {
                space_count: 0,
                width_units: glyph_count as f32 * DEFAULT_GLYPH_WIDTH,
                glyph_count,
                text,
            };
        }

        let width_units = bytes.iter().map(|b| self.glyph_width(*b)).sum();
        DecodedRun {
            space_count: bytes.iter().filter(|b| **b == b' ').count(),
            glyph_count: bytes.len(),
            width_units,
            text,
        }
    }

    fn glyph_width(&self, code: u8) -> f32 {
        let index = i64::from(code) - self.first_char;
        if index < 0 {
            return DEFAULT_GLYPH_WIDTH;
        }
        self.widths
            .get(index as usize)
            .copied()
            .unwrap_or(DEFAULT_GLYPH_WIDTH)
    }
}

/// Fonts available to one page, keyed by resource name
#[derive(Default)]
pub struct PageFonts<'a> {
    fonts: BTreeMap<Vec<u8>, LoadedFont<'a>>,
}

impl<'a> PageFonts<'a> {
    pub fn load(doc: &'a Document, page_id: ObjectId) -> Self {
        let resources = match doc.get_page_fonts(page_id) {
            Ok(resources) => resources,
            Err(err) => {
                log::warn!("Could not read fonts of page {:?}: {}", page_id, err);
                BTreeMap::new()
            }
        };

        let fonts = resources
            .into_iter()
            .map(|(name, dict)| (name, LoadedFont::load(doc, dict)))
            .collect();

        Self { fonts }
    }

    /// Decode with the named font, or as Latin-1 when the font is unknown
    pub fn decode(&self, font: Option<&[u8]>, bytes: &[u8]) -> DecodedRun {
        match font.and_then(|name| self.fonts.get(name)) {
            Some(loaded) => loaded.decode(bytes),
            None => DecodedRun {
                text: decode_latin1(bytes),
                width_units: bytes.len() as f32 * DEFAULT_GLYPH_WIDTH,
                glyph_count: bytes.len(),
                space_count: bytes.iter().filter(|b| **b == b' ').count(),
            },
        }
    }
}

pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|b| char::from(*b)).collect()
}

/// Numeric operand as f32
pub fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}
