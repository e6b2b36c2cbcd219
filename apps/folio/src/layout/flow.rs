//! Flow partitioner — greedy placement of atomic blocks into fixed-height pages.
//!
//! One algorithm covers every column mode. It is parametrized by the number of
//! columns (1 or 2), the fill direction, and the seeds that occupy the top of
//! page 1 (header, profile, and the full-width leading block of mixed mode).
//!
//! # Placement rule
//! Each column tracks its running height `H` and the trailing bottom margin `M`
//! of whatever was placed last. The gap before a block is the fixed entry
//! spacing when the column already holds a block on this page, otherwise
//! `max(M, 0)`. A block fits when `H + gap + height <= available`.
//!
//! A block that does not fit the current column is tried in the next column in
//! fill order; the cursor never moves back, so a page fills strictly
//! left-then-right (or right-then-left). When no remaining column fits, the page
//! is closed and the block opens the next page in the starting column. A page
//! with no blocks yet accepts the block only if it would not fit an empty page
//! either: such an oversized block is placed alone and overflows instead of
//! stalling the loop. A block that merely does not fit below the page-1 seeds
//! moves on to page 2. Every block is placed in exactly one step: the
//! partitioner is O(n).
//!
//! Blocks carry one dimension per column, since wrapping depends on the
//! column's width; each column is checked with the block's height there.

use serde::{Deserialize, Serialize};

use crate::layout::probe::Dimension;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Left,
    Right,
}

impl Column {
    fn index(self) -> usize {
        match self {
            Column::Left => 0,
            Column::Right => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillDirection {
    /// Left column first.
    #[default]
    Forward,
    /// Right column first; used when the header is anchored right.
    Inverse,
}

impl FillDirection {
    fn order(self, columns: ColumnCount) -> &'static [Column] {
        match (columns, self) {
            (ColumnCount::One, _) => &[Column::Left],
            (ColumnCount::Two, FillDirection::Forward) => &[Column::Left, Column::Right],
            (ColumnCount::Two, FillDirection::Inverse) => &[Column::Right, Column::Left],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnCount {
    One,
    Two,
}

/// Which columns a page-1 seed occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSpan {
    Both,
    Only(Column),
}

/// Content that sits above the flowing blocks on page 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seed {
    pub span: SeedSpan,
    pub dim: Dimension,
    /// Counts as placed content: a page holding it is no longer empty.
    pub is_block: bool,
}

/// A block's dimensions in the left and the right column.
pub type ColumnDims = [Dimension; 2];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowConfig {
    pub columns: ColumnCount,
    pub direction: FillDirection,
    pub available_height: f32,
    pub entry_spacing: f32,
}

/// One partitioned page: block indices per physical column (`[left, right]`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowPage {
    pub columns: [Vec<usize>; 2],
    /// Final running height of each column, gaps included.
    pub heights: [f32; 2],
    /// Whether this page carries the page-1 seeds.
    pub seeded: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct ColumnState {
    height: f32,
    trailing_margin: f32,
    placed: usize,
    occupied: bool,
}

impl ColumnState {
    fn gap(&self, entry_spacing: f32) -> f32 {
        if self.placed > 0 {
            entry_spacing
        } else {
            self.trailing_margin.max(0.0)
        }
    }

    fn fits(&self, dim: &Dimension, config: &FlowConfig) -> bool {
        self.height + self.gap(config.entry_spacing) + dim.height <= config.available_height
    }

    fn place(&mut self, dim: &Dimension, entry_spacing: f32) {
        self.height += self.gap(entry_spacing) + dim.height;
        self.trailing_margin = dim.margin_bottom;
        self.placed += 1;
        self.occupied = true;
    }

    /// Seeds collapse with the preceding seed like ordinary CSS margins.
    fn seed(&mut self, dim: &Dimension) {
        let gap = if self.occupied {
            self.trailing_margin.max(dim.margin_top)
        } else {
            0.0
        };
        self.height += gap + dim.height;
        self.trailing_margin = dim.margin_bottom;
        self.occupied = true;
    }
}

#[derive(Debug, Default)]
struct PageState {
    columns: [ColumnState; 2],
    blocks: [Vec<usize>; 2],
    has_content: bool,
    seeded: bool,
}

impl PageState {
    fn seeded(seeds: &[Seed]) -> Self {
        let mut page = PageState {
            seeded: true,
            ..Default::default()
        };
        for seed in seeds {
            match seed.span {
                SeedSpan::Both => page.columns.iter_mut().for_each(|c| c.seed(&seed.dim)),
                SeedSpan::Only(column) => page.columns[column.index()].seed(&seed.dim),
            }
            page.has_content |= seed.is_block;
        }
        page
    }

    fn occupied(&self) -> bool {
        self.columns.iter().any(|c| c.occupied)
    }

    fn close(self) -> FlowPage {
        FlowPage {
            columns: self.blocks,
            heights: [self.columns[0].height, self.columns[1].height],
            seeded: self.seeded,
        }
    }
}

/// Partitions `dims` (one entry per flowing block, in document order) into pages.
///
/// Always returns at least one page; with no blocks that page carries only
/// the seeds.
pub fn partition(config: &FlowConfig, seeds: &[Seed], dims: &[ColumnDims]) -> Vec<FlowPage> {
    let order = config.direction.order(config.columns);
    let start = order[0].index();
    let mut pages = Vec::new();
    let mut page = PageState::seeded(seeds);
    let mut cursor = 0usize;

    for (index, dim) in dims.iter().enumerate() {
        let target = (cursor..order.len()).find(|&pos| {
            let column = order[pos].index();
            page.columns[column].fits(&dim[column], config)
        });

        match target {
            Some(pos) => cursor = pos,
            None => {
                let fits_empty_page = dim[start].height <= config.available_height;
                if page.has_content || (page.occupied() && fits_empty_page) {
                    pages.push(std::mem::take(&mut page).close());
                }
                cursor = 0;
            }
        }

        let column = order[cursor].index();
        page.columns[column].place(&dim[column], config.entry_spacing);
        page.blocks[column].push(index);
        page.has_content = true;
    }

    pages.push(page.close());
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_dims(heights: &[f32]) -> Vec<ColumnDims> {
        heights
            .iter()
            .map(|&h| [Dimension::new(h, 0.0, 0.0); 2])
            .collect()
    }

    fn single(available: f32, spacing: f32) -> FlowConfig {
        FlowConfig {
            columns: ColumnCount::One,
            direction: FillDirection::Forward,
            available_height: available,
            entry_spacing: spacing,
        }
    }

    fn two(available: f32, spacing: f32, direction: FillDirection) -> FlowConfig {
        FlowConfig {
            columns: ColumnCount::Two,
            direction,
            available_height: available,
            entry_spacing: spacing,
        }
    }

    fn flatten(pages: &[FlowPage], direction: FillDirection) -> Vec<usize> {
        let order = direction.order(ColumnCount::Two);
        pages
            .iter()
            .flat_map(|p| order.iter().flat_map(move |c| p.columns[c.index()].clone()))
            .collect()
    }

    // ── single column ───────────────────────────────────────────────────────

    #[test]
    fn test_single_column_greedy_break() {
        // 300, +24+300 = 624, +24+300 = 948 > 900 → break before the third block
        let pages = partition(&single(900.0, 24.0), &[], &make_dims(&[300.0; 4]));
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].columns[0], vec![0, 1]);
        assert_eq!(pages[1].columns[0], vec![2, 3]);
        assert_eq!(pages[0].heights[0], 624.0);
        assert_eq!(pages[1].heights[0], 624.0);
    }

    #[test]
    fn test_empty_input_yields_one_seeded_page() {
        let seeds = [Seed {
            span: SeedSpan::Both,
            dim: Dimension::new(120.0, 0.0, 16.0),
            is_block: false,
        }];
        let pages = partition(&single(900.0, 24.0), &seeds, &[]);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].columns.iter().all(|c| c.is_empty()));
        assert!(pages[0].seeded);
        assert_eq!(pages[0].heights[0], 120.0);
    }

    #[test]
    fn test_oversized_block_placed_alone_and_next_starts_fresh_page() {
        let pages = partition(&single(1000.0, 24.0), &[], &make_dims(&[5000.0, 100.0]));
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].columns[0], vec![0]);
        assert_eq!(pages[0].heights[0], 5000.0);
        assert_eq!(pages[1].columns[0], vec![1]);
    }

    #[test]
    fn test_oversized_block_after_header_stays_on_page_one() {
        let seeds = [Seed {
            span: SeedSpan::Both,
            dim: Dimension::new(200.0, 0.0, 10.0),
            is_block: false,
        }];
        let pages = partition(&single(1000.0, 24.0), &seeds, &make_dims(&[1500.0]));
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].columns[0], vec![0]);
        assert_eq!(pages[0].heights[0], 200.0 + 10.0 + 1500.0);
    }

    #[test]
    fn test_block_not_fitting_below_header_moves_to_page_two() {
        let seeds = [Seed {
            span: SeedSpan::Both,
            dim: Dimension::new(200.0, 0.0, 0.0),
            is_block: false,
        }];
        let pages = partition(&single(1000.0, 24.0), &seeds, &make_dims(&[900.0, 50.0]));
        assert_eq!(pages.len(), 2);
        assert!(pages[0].seeded);
        assert!(pages[0].columns[0].is_empty());
        assert_eq!(pages[0].heights[0], 200.0);
        assert_eq!(pages[1].columns[0], vec![0, 1]);
        assert_eq!(pages[1].heights[0], 900.0 + 24.0 + 50.0);
    }

    #[test]
    fn test_first_block_collapses_against_seed_margin() {
        let seeds = [Seed {
            span: SeedSpan::Both,
            dim: Dimension::new(100.0, 0.0, 30.0),
            is_block: false,
        }];
        // 100 + max(30, 0) + 870 = 1000 fits exactly
        let pages = partition(&single(1000.0, 24.0), &seeds, &make_dims(&[870.0]));
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].heights[0], 1000.0);
    }

    #[test]
    fn test_later_pages_ignore_previous_trailing_margin() {
        let dims = vec![
            [Dimension::new(900.0, 0.0, 50.0); 2],
            [Dimension::new(960.0, 0.0, 0.0); 2],
        ];
        let pages = partition(&single(1000.0, 24.0), &[], &dims);
        assert_eq!(pages.len(), 2);
        // fresh page: H = 0, M = 0, so the 960 block fits with no gap
        assert_eq!(pages[1].heights[0], 960.0);
    }

    // ── two columns ─────────────────────────────────────────────────────────

    #[test]
    fn test_two_column_forward_fill_overflows_into_right() {
        let pages = partition(
            &two(1000.0, 0.0, FillDirection::Forward),
            &[],
            &make_dims(&[200.0; 6]),
        );
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].columns[0], vec![0, 1, 2, 3, 4]);
        assert_eq!(pages[0].columns[1], vec![5]);
    }

    #[test]
    fn test_inverse_fill_starts_in_right_column() {
        let pages = partition(
            &two(1000.0, 0.0, FillDirection::Inverse),
            &[],
            &make_dims(&[200.0; 4]),
        );
        assert_eq!(pages[0].columns[1], vec![0, 1, 2, 3]);
        assert!(pages[0].columns[0].is_empty());
    }

    #[test]
    fn test_cursor_never_returns_to_first_column() {
        // 700 left, 400 → right, then 100 would fit left (700+100) but the
        // page is already filling the right column.
        let pages = partition(
            &two(1000.0, 0.0, FillDirection::Forward),
            &[],
            &make_dims(&[700.0, 400.0, 100.0]),
        );
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].columns[0], vec![0]);
        assert_eq!(pages[0].columns[1], vec![1, 2]);
    }

    #[test]
    fn test_block_fitting_neither_column_opens_new_page_in_start_column() {
        let pages = partition(
            &two(1000.0, 0.0, FillDirection::Inverse),
            &[],
            &make_dims(&[800.0, 800.0, 800.0]),
        );
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].columns, [vec![1], vec![0]]);
        assert_eq!(pages[1].columns, [vec![], vec![2]]);
    }

    #[test]
    fn test_left_anchored_header_seeds_only_left_column() {
        let seeds = [Seed {
            span: SeedSpan::Only(Column::Left),
            dim: Dimension::new(900.0, 0.0, 0.0),
            is_block: false,
        }];
        let pages = partition(
            &two(1000.0, 0.0, FillDirection::Forward),
            &seeds,
            &make_dims(&[300.0, 300.0]),
        );
        assert_eq!(pages.len(), 1);
        assert!(pages[0].columns[0].is_empty());
        assert_eq!(pages[0].columns[1], vec![0, 1]);
        assert_eq!(pages[0].heights, [900.0, 600.0]);
    }

    #[test]
    fn test_profile_after_header_collapses_margins() {
        let seeds = [
            Seed {
                span: SeedSpan::Both,
                dim: Dimension::new(100.0, 0.0, 20.0),
                is_block: false,
            },
            Seed {
                span: SeedSpan::Both,
                dim: Dimension::new(50.0, 8.0, 12.0),
                is_block: false,
            },
        ];
        let pages = partition(&two(1000.0, 0.0, FillDirection::Forward), &seeds, &[]);
        assert_eq!(pages[0].heights, [170.0, 170.0]);
    }

    #[test]
    fn test_mixed_leading_seed_shares_page_with_columns() {
        let seeds = [Seed {
            span: SeedSpan::Both,
            dim: Dimension::new(150.0, 0.0, 0.0),
            is_block: true,
        }];
        let pages = partition(
            &two(1000.0, 0.0, FillDirection::Forward),
            &seeds,
            &make_dims(&[400.0, 400.0, 400.0]),
        );
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].columns, [vec![0, 1], vec![2]]);
        assert_eq!(pages[0].heights, [950.0, 550.0]);
    }

    #[test]
    fn test_oversized_leading_seed_pushes_next_block_to_new_page() {
        let seeds = [Seed {
            span: SeedSpan::Both,
            dim: Dimension::new(1200.0, 0.0, 0.0),
            is_block: true,
        }];
        let pages = partition(
            &two(1000.0, 0.0, FillDirection::Forward),
            &seeds,
            &make_dims(&[100.0]),
        );
        assert_eq!(pages.len(), 2);
        assert!(pages[0].columns.iter().all(|c| c.is_empty()));
        assert_eq!(pages[1].columns[0], vec![0]);
        assert!(!pages[1].seeded);
    }

    #[test]
    fn test_each_column_checked_with_its_own_height() {
        // Narrow left column wraps the block to 1200px; in the wide right
        // column it is 600px and fits.
        let dims = vec![[Dimension::new(1200.0, 0.0, 0.0), Dimension::new(600.0, 0.0, 0.0)]];
        let pages = partition(&two(1000.0, 0.0, FillDirection::Forward), &[], &dims);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].columns, [vec![], vec![0]]);
        assert_eq!(pages[0].heights, [0.0, 600.0]);
    }

    #[test]
    fn test_inverse_fill_uses_right_column_height() {
        let dims = vec![
            [Dimension::new(126.0, 0.0, 0.0), Dimension::new(63.0, 0.0, 0.0)],
            [Dimension::new(126.0, 0.0, 0.0), Dimension::new(63.0, 0.0, 0.0)],
        ];
        let pages = partition(&two(1000.0, 10.0, FillDirection::Inverse), &[], &dims);
        assert_eq!(pages[0].columns[1], vec![0, 1]);
        assert_eq!(pages[0].heights[1], 63.0 + 10.0 + 63.0);
    }

    // ── properties ──────────────────────────────────────────────────────────

    fn varied_heights() -> Vec<f32> {
        (0..60u32).map(|i| ((i * 137) % 420 + 20) as f32).collect()
    }

    #[test]
    fn test_coverage_and_order_preserved_in_every_mode() {
        let dims = make_dims(&varied_heights());
        for direction in [FillDirection::Forward, FillDirection::Inverse] {
            let pages = partition(&two(1000.0, 24.0, direction), &[], &dims);
            assert_eq!(flatten(&pages, direction), (0..dims.len()).collect::<Vec<_>>());
        }
        let pages = partition(&single(1000.0, 24.0), &[], &dims);
        let flat: Vec<usize> = pages.iter().flat_map(|p| p.columns[0].clone()).collect();
        assert_eq!(flat, (0..dims.len()).collect::<Vec<_>>());
    }

    fn assert_capacity(pages: &[FlowPage], dims: &[ColumnDims], available: f32) {
        for page in pages {
            for (col, blocks) in page.columns.iter().enumerate() {
                let first_oversized = blocks
                    .first()
                    .is_some_and(|&i| dims[i][col].height > available);
                if !first_oversized {
                    assert!(
                        page.heights[col] <= available,
                        "column {col} overflows: {}",
                        page.heights[col]
                    );
                }
            }
        }
    }

    #[test]
    fn test_capacity_respected_unless_sole_oversized_block() {
        let mut heights = varied_heights();
        heights[17] = 2500.0;
        let dims = make_dims(&heights);
        let available = 1000.0;
        let header = Seed {
            span: SeedSpan::Both,
            dim: Dimension::new(300.0, 0.0, 14.0),
            is_block: false,
        };
        let left_header = Seed {
            span: SeedSpan::Only(Column::Left),
            dim: Dimension::new(700.0, 0.0, 14.0),
            is_block: false,
        };

        for seeds in [vec![], vec![header], vec![left_header], vec![header, header]] {
            for direction in [FillDirection::Forward, FillDirection::Inverse] {
                let pages = partition(&two(available, 24.0, direction), &seeds, &dims);
                assert_capacity(&pages, &dims, available);
            }
            let pages = partition(&single(available, 24.0), &seeds, &dims);
            assert_capacity(&pages, &dims, available);
        }

        // A near-full-page block right after a tall header.
        let tall = make_dims(&[950.0, 20.0]);
        let pages = partition(&single(available, 24.0), &[header], &tall);
        assert_capacity(&pages, &tall, available);
        assert_eq!(pages.len(), 2);
    }

    #[test]
    fn test_deterministic() {
        let dims = make_dims(&varied_heights());
        let config = two(900.0, 12.0, FillDirection::Inverse);
        assert_eq!(partition(&config, &[], &dims), partition(&config, &[], &dims));
    }
}
