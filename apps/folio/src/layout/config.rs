//! Layout and spacing configuration for a previewed document.
//!
//! All geometry the partitioner sees is in CSS pixels. Physical units from the
//! editor (page format, millimetre margins) are converted here, once, so the
//! rest of the pipeline never deals with inches or millimetres.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// CSS reference resolution.
pub const DPI: f32 = 96.0;
/// Millimetres to CSS pixels at [`DPI`].
pub const MM_TO_PX: f32 = DPI / 25.4;

// ────────────────────────────────────────────────────────────────────────────
// Layout configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMode {
    #[default]
    One,
    Two,
    /// One full-width leading block, then two columns.
    Mix,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderAnchor {
    #[default]
    Top,
    Left,
    Right,
}

/// Physical page standard. Dimensions are rounded to whole pixels at 96 DPI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageFormat {
    #[default]
    A4,
    Letter,
}

impl PageFormat {
    pub fn size(self) -> PageSize {
        match self {
            // 210mm × 297mm
            PageFormat::A4 => PageSize {
                width_px: 794.0,
                height_px: 1123.0,
            },
            // 8.5in × 11in
            PageFormat::Letter => PageSize {
                width_px: 816.0,
                height_px: 1056.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width_px: f32,
    pub height_px: f32,
}

/// Column mode, header anchor, column split and page format of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub columns: ColumnMode,
    #[serde(default)]
    pub header_anchor: HeaderAnchor,
    /// Percentage of the content width given to the left and right column.
    #[serde(default = "default_split")]
    pub column_split: [u8; 2],
    #[serde(default)]
    pub page_format: PageFormat,
}

fn default_split() -> [u8; 2] {
    [50, 50]
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            columns: ColumnMode::One,
            header_anchor: HeaderAnchor::Top,
            column_split: default_split(),
            page_format: PageFormat::A4,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Spacing configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacingConfig {
    pub font_size_px: f32,
    /// Line height as a multiple of the font size.
    pub line_height: f32,
    pub margin_horizontal_mm: f32,
    pub margin_vertical_mm: f32,
    /// Fixed gap between two consecutive blocks in the same column.
    pub entry_spacing_px: f32,
    /// Gutter between the two columns.
    pub column_gap_px: f32,
}

impl Default for SpacingConfig {
    fn default() -> Self {
        Self {
            font_size_px: 14.0,
            line_height: 1.5,
            margin_horizontal_mm: 18.0,
            margin_vertical_mm: 18.0,
            entry_spacing_px: 24.0,
            column_gap_px: 24.0,
        }
    }
}

impl SpacingConfig {
    pub fn margin_horizontal_px(&self) -> f32 {
        self.margin_horizontal_mm * MM_TO_PX
    }

    pub fn margin_vertical_px(&self) -> f32 {
        self.margin_vertical_mm * MM_TO_PX
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Resolved geometry
// ────────────────────────────────────────────────────────────────────────────

/// Geometry derived from a [`LayoutConfig`] and [`SpacingConfig`] pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub page: PageSize,
    pub margin_horizontal_px: f32,
    pub margin_vertical_px: f32,
    /// `page height - 2 × vertical margin`.
    pub available_height_px: f32,
    pub content_width_px: f32,
    /// Rendered width of the left and right column; both equal the content
    /// width in single-column mode.
    pub column_widths_px: [f32; 2],
}

impl PageGeometry {
    pub fn resolve(layout: &LayoutConfig, spacing: &SpacingConfig) -> Self {
        let page = layout.page_format.size();
        let margin_horizontal_px = spacing.margin_horizontal_px();
        let margin_vertical_px = spacing.margin_vertical_px();
        let content_width_px = (page.width_px - 2.0 * margin_horizontal_px).max(0.0);
        let available_height_px = (page.height_px - 2.0 * margin_vertical_px).max(0.0);

        let column_widths_px = match layout.columns {
            ColumnMode::One => [content_width_px, content_width_px],
            ColumnMode::Two | ColumnMode::Mix => {
                let usable = (content_width_px - spacing.column_gap_px).max(0.0);
                let [left, right] = layout.column_split;
                [
                    usable * f32::from(left) / 100.0,
                    usable * f32::from(right) / 100.0,
                ]
            }
        };

        PageGeometry {
            page,
            margin_horizontal_px,
            margin_vertical_px,
            available_height_px,
            content_width_px,
            column_widths_px,
        }
    }
}

/// Rejects configurations the partitioner cannot lay out.
pub fn validate(layout: &LayoutConfig, spacing: &SpacingConfig) -> Result<(), AppError> {
    let [left, right] = layout.column_split;
    if u16::from(left) + u16::from(right) != 100 {
        return Err(AppError::Validation(format!(
            "column_split must sum to 100, got {left} + {right}"
        )));
    }
    if !(spacing.font_size_px.is_finite() && spacing.font_size_px > 0.0) {
        return Err(AppError::Validation(
            "font_size_px must be a positive number".to_string(),
        ));
    }
    if !(spacing.line_height.is_finite() && spacing.line_height > 0.0) {
        return Err(AppError::Validation(
            "line_height must be a positive number".to_string(),
        ));
    }
    let non_negative = [
        ("margin_horizontal_mm", spacing.margin_horizontal_mm),
        ("margin_vertical_mm", spacing.margin_vertical_mm),
        ("entry_spacing_px", spacing.entry_spacing_px),
        ("column_gap_px", spacing.column_gap_px),
    ];
    for (name, value) in non_negative {
        if !(value.is_finite() && value >= 0.0) {
            return Err(AppError::Validation(format!(
                "{name} must be a non-negative number"
            )));
        }
    }
    let geometry = PageGeometry::resolve(layout, spacing);
    if geometry.available_height_px <= 0.0 || geometry.content_width_px <= 0.0 {
        return Err(AppError::Validation(
            "margins leave no room for content".to_string(),
        ));
    }
    Ok(())
}
