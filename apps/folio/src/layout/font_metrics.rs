//! Static font metrics for the server-side measurement renderer.
//!
//! Glyph widths are grouped into character classes and stored in em units
//! (relative to font size). This is an approximation of real shaping: good
//! enough to predict wrap points within a word or two per line, which is all
//! the partitioner needs when the browser is not reporting its own heights.
//!
//! Non-ASCII characters fall back to the family's average width.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Font family + descriptor
// ────────────────────────────────────────────────────────────────────────────

/// The font families offered by the theme picker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontFamily {
    /// Humanist sans-serif, the default theme.
    #[default]
    Inter,
    /// Old-style serif.
    EbGaramond,
    /// Geometric humanist sans-serif.
    Lato,
    /// Condensed display sans-serif.
    Oswald,
    /// Traditional TeX face.
    ComputerModern,
}

/// The selected font and whether the client finished loading it.
///
/// Measurements taken while `ready` is false are provisional: glyph metrics
/// change once the real face replaces the fallback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontDescriptor {
    pub family: FontFamily,
    #[serde(default)]
    pub ready: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Metrics
// ────────────────────────────────────────────────────────────────────────────

/// Per-class advance widths for one family, in em.
#[derive(Debug)]
pub struct FontMetrics {
    pub family: FontFamily,
    pub space: f32,
    /// i j l t f r . , : ; ' ! |
    narrow: f32,
    /// m w M W @ %
    wide: f32,
    uppercase: f32,
    lowercase: f32,
    digit: f32,
    /// Other printable ASCII punctuation and symbols.
    symbol: f32,
    pub average_char_width: f32,
}

impl FontMetrics {
    fn char_width(&self, c: char) -> f32 {
        match c {
            ' ' => self.space,
            'i' | 'j' | 'l' | 't' | 'f' | 'r' | '.' | ',' | ':' | ';' | '\'' | '!' | '|' => {
                self.narrow
            }
            'm' | 'w' | 'M' | 'W' | '@' | '%' => self.wide,
            'A'..='Z' => self.uppercase,
            'a'..='z' => self.lowercase,
            '0'..='9' => self.digit,
            c if c.is_ascii_graphic() => self.symbol,
            _ => self.average_char_width,
        }
    }

    /// Rendered width of a string in em units.
    pub fn measure_str(&self, s: &str) -> f32 {
        s.chars().map(|c| self.char_width(c)).sum()
    }

    /// Number of lines the text occupies when greedily word-wrapped at
    /// `max_width_em`. Empty text is zero lines; a single word wider than the
    /// line still counts as one line (it overflows horizontally).
    pub fn wrapped_lines(&self, text: &str, max_width_em: f32) -> u32 {
        let mut lines = 0u32;
        let mut current = 0.0_f32;

        for word in text.split_whitespace() {
            let width = self.measure_str(word);
            if lines == 0 {
                lines = 1;
                current = width;
            } else if current + self.space + width > max_width_em {
                lines += 1;
                current = width;
            } else {
                current += self.space + width;
            }
        }
        lines
    }
}

static INTER: FontMetrics = FontMetrics {
    family: FontFamily::Inter,
    space: 0.25,
    narrow: 0.27,
    wide: 0.84,
    uppercase: 0.64,
    lowercase: 0.54,
    digit: 0.56,
    symbol: 0.45,
    average_char_width: 0.52,
};

/// Roughly 85% of Inter's set width.
static EB_GARAMOND: FontMetrics = FontMetrics {
    family: FontFamily::EbGaramond,
    space: 0.21,
    narrow: 0.24,
    wide: 0.72,
    uppercase: 0.55,
    lowercase: 0.45,
    digit: 0.48,
    symbol: 0.38,
    average_char_width: 0.44,
};

static LATO: FontMetrics = FontMetrics {
    family: FontFamily::Lato,
    space: 0.23,
    narrow: 0.25,
    wide: 0.80,
    uppercase: 0.61,
    lowercase: 0.51,
    digit: 0.53,
    symbol: 0.43,
    average_char_width: 0.50,
};

/// Condensed: the narrowest of the set.
static OSWALD: FontMetrics = FontMetrics {
    family: FontFamily::Oswald,
    space: 0.18,
    narrow: 0.20,
    wide: 0.60,
    uppercase: 0.45,
    lowercase: 0.38,
    digit: 0.42,
    symbol: 0.32,
    average_char_width: 0.38,
};

static COMPUTER_MODERN: FontMetrics = FontMetrics {
    family: FontFamily::ComputerModern,
    space: 0.33,
    narrow: 0.28,
    wide: 0.83,
    uppercase: 0.70,
    lowercase: 0.50,
    digit: 0.50,
    symbol: 0.50,
    average_char_width: 0.50,
};

/// Returns the static metrics for a font family.
pub fn get_metrics(family: FontFamily) -> &'static FontMetrics {
    match family {
        FontFamily::Inter => &INTER,
        FontFamily::EbGaramond => &EB_GARAMOND,
        FontFamily::Lato => &LATO,
        FontFamily::Oswald => &OSWALD,
        FontFamily::ComputerModern => &COMPUTER_MODERN,
    }
}

/// Metrics used before the selected font has loaded: the browser renders the
/// fallback stack, which is closest to Inter.
pub fn fallback_metrics() -> &'static FontMetrics {
    &INTER
}
