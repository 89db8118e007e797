//! Static code point tables for the generated font.

use serde::{Deserialize, Serialize};

/// Greek uppercase letters in alphabet order, by label name.
///
/// U+03A2 is unassigned, so SIGMA jumps to U+03A3.
pub const GREEK_LETTERS: [(&str, char); 24] = [
    ("ALPHA", 'Α'),
    ("BETA", 'Β'),
    ("GAMMA", 'Γ'),
    ("DELTA", 'Δ'),
    ("EPSILON", 'Ε'),
    ("ZETA", 'Ζ'),
    ("ETA", 'Η'),
    ("THETA", 'Θ'),
    ("IOTA", 'Ι'),
    ("KAPPA", 'Κ'),
    ("LAMBDA", 'Λ'),
    ("MU", 'Μ'),
    ("NU", 'Ν'),
    ("XI", 'Ξ'),
    ("OMICRON", 'Ο'),
    ("PI", 'Π'),
    ("RHO", 'Ρ'),
    ("SIGMA", 'Σ'),
    ("TAU", 'Τ'),
    ("UPSILON", 'Υ'),
    ("PHI", 'Φ'),
    ("CHI", 'Χ'),
    ("PSI", 'Ψ'),
    ("OMEGA", 'Ω'),
];

/// Offset from a Greek capital to its lowercase form.
const LOWERCASE_OFFSET: u32 = 0x20;

/// Last lowercase Greek letter (ω).
const LAST_LOWERCASE: u32 = 0x03C9;

/// Code point of the Greek capital with the given label name.
pub fn greek_letter(label: &str) -> Option<char> {
    GREEK_LETTERS
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, c)| *c)
}

/// Lowercase counterpart of a Greek capital, if it exists in the basic block.
pub fn lowercase_of(capital: char) -> Option<char> {
    let lower = u32::from(capital) + LOWERCASE_OFFSET;
    if lower <= LAST_LOWERCASE {
        char::from_u32(lower)
    } else {
        None
    }
}

/// PostScript-style glyph name (`uni0391`).
pub fn glyph_name(c: char) -> String {
    format!("uni{:04X}", u32::from(c))
}

/// Vertical metrics of the generated font, in font units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontMetrics {
    pub ascent: u32,
    pub descent: u32,
    pub em: u32,
    pub space_width: u32,
    pub punctuation_width: u32,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            ascent: 800,
            descent: 200,
            em: 1000,
            space_width: 400,
            punctuation_width: 600,
        }
    }
}

/// How a punctuation glyph is drawn by the font tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PunctuationShape {
    /// An irregular ink blob centred on the given point.
    Dot { x: i32, y: i32 },
    /// A blob above a comma stroke.
    Semicolon { x: i32, y: i32 },
    /// A reference to another glyph.
    Reference { base: &'static str },
}

/// A punctuation glyph drawn procedurally rather than from an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PunctuationGlyph {
    pub code_point: char,
    pub glyph_name: &'static str,
    pub shape: PunctuationShape,
}

/// Punctuation added to every font.
pub const PUNCTUATION: [PunctuationGlyph; 7] = [
    PunctuationGlyph {
        code_point: '.',
        glyph_name: "period",
        shape: PunctuationShape::Dot { x: 300, y: 100 },
    },
    PunctuationGlyph {
        code_point: ';',
        glyph_name: "semicolon",
        shape: PunctuationShape::Semicolon { x: 300, y: 400 },
    },
    PunctuationGlyph {
        code_point: '\u{00B7}',
        glyph_name: "periodcentered",
        shape: PunctuationShape::Dot { x: 300, y: 400 },
    },
    PunctuationGlyph {
        code_point: '\u{0387}',
        glyph_name: "anoteleia",
        shape: PunctuationShape::Reference {
            base: "periodcentered",
        },
    },
    PunctuationGlyph {
        code_point: '\u{0375}',
        glyph_name: "uni0375",
        shape: PunctuationShape::Dot { x: 300, y: 100 },
    },
    PunctuationGlyph {
        code_point: '\u{02D9}',
        glyph_name: "dotaccent",
        shape: PunctuationShape::Dot { x: 300, y: 550 },
    },
    PunctuationGlyph {
        code_point: '\u{2022}',
        glyph_name: "bullet",
        shape: PunctuationShape::Reference {
            base: "periodcentered",
        },
    },
];
