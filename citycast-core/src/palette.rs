use serde::{Deserialize, Serialize};

use crate::error::AggregateError;

/// ARGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    pub const fn opaque(rgb: u32) -> Self {
        Color(0xFF00_0000 | (rgb & 0x00FF_FFFF))
    }

    pub const fn with_alpha(self, alpha: u8) -> Self {
        Color(((alpha as u32) << 24) | (self.0 & 0x00FF_FFFF))
    }

    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn rgb(self) -> (u8, u8, u8) {
        ((self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8)
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:08X}", self.0)
    }
}

/// Display colors of one day: a solid color and its translucent twin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPair {
    pub color: Color,
    pub alpha: Color,
}

/// Ordered day colors; day `i` uses pair `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pairs: Vec<ColorPair>,
}

// Material Design 500 tones.
const MATERIAL_500: [u32; 16] = [
    0xF44336, 0xE91E63, 0x9C27B0, 0x673AB7, 0x3F51B5, 0x2196F3, 0x03A9F4, 0x00BCD4,
    0x009688, 0x4CAF50, 0x8BC34A, 0xCDDC39, 0xFFC107, 0xFF9800, 0xFF5722, 0x795548,
];

const HALF_ALPHA: u8 = 0x80;

impl Palette {
    pub fn new(pairs: Vec<ColorPair>) -> Self {
        Self { pairs }
    }

    /// Builds a palette from two parallel color lists.
    pub fn from_parts(colors: &[Color], alphas: &[Color]) -> Result<Self, AggregateError> {
        if colors.len() != alphas.len() {
            return Err(AggregateError::PaletteMismatch {
                colors: colors.len(),
                alphas: alphas.len(),
            });
        }

        let pairs = colors
            .iter()
            .zip(alphas)
            .map(|(&color, &alpha)| ColorPair { color, alpha })
            .collect();

        Ok(Self { pairs })
    }

    pub fn material() -> Self {
        let pairs = MATERIAL_500
            .iter()
            .map(|&rgb| {
                let color = Color::opaque(rgb);
                ColorPair { color, alpha: color.with_alpha(HALF_ALPHA) }
            })
            .collect();

        Self { pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[ColorPair] {
        &self.pairs
    }

    pub fn get(&self, day_index: usize) -> Option<ColorPair> {
        self.pairs.get(day_index).copied()
    }

    /// Fails unless every one of `days` has a color pair.
    pub fn ensure_covers(&self, days: usize) -> Result<(), AggregateError> {
        if days > self.pairs.len() {
            return Err(AggregateError::PaletteTooShort { days, colors: self.pairs.len() });
        }
        Ok(())
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::material()
    }
}
