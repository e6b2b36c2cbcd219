//! Page Fill Analysis — how well each page frame is used after pagination.
//!
//! The editor shows a hint next to the preview when the document spills a few
//! lines onto an extra page or when a single block overflows its frame.
//!
//! # Document rules
//! - Any column overflowing its frame → `Overflow` (an oversized block)
//! - Last page below 15% used on a multi-page document → `TooMuchWhitespace`
//! - Otherwise → `Acceptable`

use serde::{Deserialize, Serialize};

use crate::layout::assembler::PageDescriptor;
use crate::layout::blocks::BlockId;

/// Below this fill, a trailing page is considered a spill-over.
const SPILL_THRESHOLD: f32 = 0.15;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFill {
    /// Used height of each column, in pixels.
    pub used_px: Vec<f32>,
    pub available_px: f32,
    /// Fraction of the page area left empty (averaged over columns).
    pub whitespace_fraction: f32,
    /// True when some column holds more than the frame can show.
    pub overflowing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillVerdict {
    Acceptable,
    TooMuchWhitespace,
    Overflow,
}

/// Suggested remediation shown by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FillAction {
    /// Tighten spacing or font size to pull a short last page back.
    TightenSpacing,
    /// Shorten the first block of an overflowing column.
    ShortenBlock { block_id: BlockId },
    NoAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentFill {
    pub page_count: usize,
    pub verdict: FillVerdict,
    pub action: FillAction,
}

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

/// Analyzes one page given the used height of each of its columns.
pub fn analyze_page(used_px: &[f32], available_px: f32) -> PageFill {
    let columns = used_px.len().max(1) as f32;
    let fill_ratio = if available_px > 0.0 {
        used_px.iter().map(|u| (u / available_px).min(1.0)).sum::<f32>() / columns
    } else {
        1.0
    };

    PageFill {
        used_px: used_px.to_vec(),
        available_px,
        whitespace_fraction: (1.0 - fill_ratio).max(0.0),
        overflowing: used_px.iter().any(|&u| u > available_px),
    }
}

/// Document-level verdict plus a single recommended action.
///
/// On overflow the suggestion names the first block of the overflowing column:
/// only a block that alone exceeds the page overflows it. When that column
/// holds no block, the page-1 seeds are too tall and spacing is what can give.
pub fn analyze_document(pages: &[PageDescriptor]) -> DocumentFill {
    let overflowing = pages.iter().find(|p| p.fill.overflowing);

    let (verdict, action) = if let Some(page) = overflowing {
        let column = page
            .fill
            .used_px
            .iter()
            .position(|&u| u > page.fill.available_px)
            .unwrap_or(0);
        let action = page
            .page
            .column(column)
            .first()
            .map(|id| FillAction::ShortenBlock {
                block_id: id.clone(),
            })
            .unwrap_or(FillAction::TightenSpacing);
        (FillVerdict::Overflow, action)
    } else if pages.len() > 1
        && pages
            .last()
            .is_some_and(|p| 1.0 - p.fill.whitespace_fraction < SPILL_THRESHOLD)
    {
        (FillVerdict::TooMuchWhitespace, FillAction::TightenSpacing)
    } else {
        (FillVerdict::Acceptable, FillAction::NoAction)
    };

    DocumentFill {
        page_count: pages.len(),
        verdict,
        action,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
