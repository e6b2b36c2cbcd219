//! Page Assembler — turns partitioned index groups into renderable page descriptors.
//!
//! Also owns the mapping from layout configuration to partitioner parameters
//! (column count, fill direction, page-1 seeds), so the partitioner itself
//! never sees a `LayoutConfig`.

use serde::{Deserialize, Serialize};

use crate::layout::blocks::{Block, BlockId};
use crate::layout::config::{ColumnMode, HeaderAnchor, LayoutConfig, PageGeometry, PageSize, SpacingConfig};
use crate::layout::flow::{partition, Column, ColumnCount, FillDirection, FlowConfig, FlowPage, Seed, SeedSpan};
use crate::layout::page_fill::{analyze_page, PageFill};
use crate::layout::probe::Measurements;

/// Block placement of one page, tagged by layout type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum Page {
    Single {
        blocks: Vec<BlockId>,
    },
    Two {
        left: Vec<BlockId>,
        right: Vec<BlockId>,
    },
    Mix {
        /// Full-width block above the columns; only on the page it lands on.
        lead: Option<BlockId>,
        left: Vec<BlockId>,
        right: Vec<BlockId>,
    },
}

impl Page {
    /// Blocks of one physical column (`0` = left); a single page has only `0`.
    pub fn column(&self, index: usize) -> &[BlockId] {
        match (self, index) {
            (Page::Single { blocks }, 0) => blocks.as_slice(),
            (Page::Two { left, .. } | Page::Mix { left, .. }, 0) => left.as_slice(),
            (Page::Two { right, .. } | Page::Mix { right, .. }, 1) => right.as_slice(),
            _ => &[],
        }
    }
}

/// Everything a renderer needs to reproduce one page frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDescriptor {
    pub index: usize,
    pub size: PageSize,
    pub margin_horizontal_px: f32,
    pub margin_vertical_px: f32,
    pub column_widths_px: [f32; 2],
    pub header_anchor: HeaderAnchor,
    pub carries_header: bool,
    pub carries_profile: bool,
    #[serde(flatten)]
    pub page: Page,
    pub fill: PageFill,
}

/// Fill direction implied by the header anchor.
pub fn fill_direction(layout: &LayoutConfig) -> FillDirection {
    match layout.header_anchor {
        HeaderAnchor::Right => FillDirection::Inverse,
        HeaderAnchor::Top | HeaderAnchor::Left => FillDirection::Forward,
    }
}

/// Partitions measured blocks and assembles page descriptors.
///
/// `measured.blocks` must be parallel to `blocks`. Pure: identical inputs give
/// an identical page list.
pub fn paginate(
    blocks: &[Block],
    measured: &Measurements,
    layout: &LayoutConfig,
    spacing: &SpacingConfig,
) -> Vec<PageDescriptor> {
    let geometry = PageGeometry::resolve(layout, spacing);
    let direction = fill_direction(layout);
    let columns = match layout.columns {
        ColumnMode::One => ColumnCount::One,
        ColumnMode::Two | ColumnMode::Mix => ColumnCount::Two,
    };

    let header_span = match (columns, layout.header_anchor) {
        (ColumnCount::One, _) | (_, HeaderAnchor::Top) => SeedSpan::Both,
        (_, HeaderAnchor::Left) => SeedSpan::Only(Column::Left),
        (_, HeaderAnchor::Right) => SeedSpan::Only(Column::Right),
    };
    let mut seeds = vec![Seed {
        span: header_span,
        dim: measured.header,
        is_block: false,
    }];
    if let Some(profile) = measured.profile {
        seeds.push(Seed {
            span: SeedSpan::Both,
            dim: profile,
            is_block: false,
        });
    }

    let lead_count = usize::from(layout.columns == ColumnMode::Mix && !blocks.is_empty());
    if lead_count == 1 {
        seeds.push(Seed {
            span: SeedSpan::Both,
            dim: measured.blocks.first().map(|[dim, _]| *dim).unwrap_or_default(),
            is_block: true,
        });
    }
    let lead = blocks.first().filter(|_| lead_count == 1).map(|b| b.id.clone());

    let config = FlowConfig {
        columns,
        direction,
        available_height: geometry.available_height_px,
        entry_spacing: spacing.entry_spacing_px,
    };
    let flowing = measured.blocks.get(lead_count..).unwrap_or_default();
    let flow_pages = partition(&config, &seeds, flowing);

    flow_pages
        .into_iter()
        .enumerate()
        .map(|(index, flow_page)| {
            let ids = |col: usize| -> Vec<BlockId> {
                flow_page.columns[col]
                    .iter()
                    .filter_map(|&i| blocks.get(i + lead_count))
                    .map(|b| b.id.clone())
                    .collect()
            };
            let page = match layout.columns {
                ColumnMode::One => Page::Single { blocks: ids(0) },
                ColumnMode::Two => Page::Two {
                    left: ids(0),
                    right: ids(1),
                },
                ColumnMode::Mix => Page::Mix {
                    lead: if flow_page.seeded { lead.clone() } else { None },
                    left: ids(0),
                    right: ids(1),
                },
            };
            describe(index, &flow_page, page, &geometry, layout, measured, columns)
        })
        .collect()
}

fn describe(
    index: usize,
    flow_page: &FlowPage,
    page: Page,
    geometry: &PageGeometry,
    layout: &LayoutConfig,
    measured: &Measurements,
    columns: ColumnCount,
) -> PageDescriptor {
    let used = match columns {
        ColumnCount::One => &flow_page.heights[..1],
        ColumnCount::Two => &flow_page.heights[..],
    };
    PageDescriptor {
        index,
        size: geometry.page,
        margin_horizontal_px: geometry.margin_horizontal_px,
        margin_vertical_px: geometry.margin_vertical_px,
        column_widths_px: geometry.column_widths_px,
        header_anchor: layout.header_anchor,
        carries_header: flow_page.seeded,
        carries_profile: flow_page.seeded && measured.profile.is_some(),
        page,
        fill: analyze_page(used, geometry.available_height_px),
    }
}
