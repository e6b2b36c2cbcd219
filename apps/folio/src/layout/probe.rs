//! Dimension Prober — reads block heights and margins back from a measurement mount.
//!
//! Heights are never computed analytically here. The prober builds a render
//! request (every node at the width it will have in the final layout), asks
//! the mount to commit it, then reads each node's box metrics. A node the mount
//! does not know about measures `{0, 0, 0}`: a vanished block contributes
//! nothing to layout.
//!
//! In the two-column modes a flowing block may land in either column, so it is
//! rendered once per column width under `<id>@left` and `<id>@right`. The
//! partitioner then checks each column with the height the block has there.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layout::blocks::{Block, BlockKind, TextRun};
use crate::layout::config::{ColumnMode, HeaderAnchor, LayoutConfig, PageGeometry, SpacingConfig};
use crate::layout::flow::Column;
use crate::layout::font_metrics::FontDescriptor;
use crate::layout::mount::{MeasurementMount, MountError};

pub const HEADER_KEY: &str = "header";
pub const PROFILE_KEY: &str = "profile";

/// Measured box of one node, in pixels.
///
/// `height` is the wrapper's box height; the margins belong to the wrapper's
/// first child, which is what collapses against its neighbours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub height: f32,
    #[serde(default)]
    pub margin_top: f32,
    #[serde(default)]
    pub margin_bottom: f32,
}

impl Dimension {
    pub fn new(height: f32, margin_top: f32, margin_bottom: f32) -> Self {
        Self {
            height,
            margin_top,
            margin_bottom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Header,
    Profile,
    Block(BlockKind),
}

/// One node to render into the hidden mount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderNode {
    pub key: String,
    pub kind: NodeKind,
    pub width_px: f32,
    pub runs: Vec<TextRun>,
}

/// Everything a mount needs to render one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct MountRequest {
    pub nodes: Vec<RenderNode>,
    pub font: FontDescriptor,
    pub spacing: SpacingConfig,
    /// Box metrics reported by a client-side renderer, keyed by node key.
    pub reported: Option<BTreeMap<String, Dimension>>,
}

/// Dimensions of one document, parallel to its block list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measurements {
    pub header: Dimension,
    pub profile: Option<Dimension>,
    /// Per block, its box in the left and the right column. Both entries are
    /// equal for blocks rendered at a single width.
    pub blocks: Vec<[Dimension; 2]>,
}

/// Mount key of a block rendered at one column's width.
pub fn column_key(id: &str, column: Column) -> String {
    match column {
        Column::Left => format!("{id}@left"),
        Column::Right => format!("{id}@right"),
    }
}

/// Builds the render request for a document.
///
/// `layout` must already be the effective layout (cover letters flow in one
/// column regardless of the configured mode).
pub fn build_request(
    header: Vec<TextRun>,
    profile: Option<Vec<TextRun>>,
    blocks: &[Block],
    layout: &LayoutConfig,
    spacing: &SpacingConfig,
    font: FontDescriptor,
    reported: Option<BTreeMap<String, Dimension>>,
) -> MountRequest {
    let geometry = PageGeometry::resolve(layout, spacing);
    let full = geometry.content_width_px;

    let header_width = match (layout.columns, layout.header_anchor) {
        (ColumnMode::One, _) | (_, HeaderAnchor::Top) => full,
        (_, HeaderAnchor::Left) => geometry.column_widths_px[0],
        (_, HeaderAnchor::Right) => geometry.column_widths_px[1],
    };

    let mut nodes = Vec::with_capacity(blocks.len() + 2);
    nodes.push(RenderNode {
        key: HEADER_KEY.to_string(),
        kind: NodeKind::Header,
        width_px: header_width,
        runs: header,
    });
    if let Some(runs) = profile {
        nodes.push(RenderNode {
            key: PROFILE_KEY.to_string(),
            kind: NodeKind::Profile,
            width_px: full,
            runs,
        });
    }
    let split = layout.columns != ColumnMode::One;
    for (i, block) in blocks.iter().enumerate() {
        let leading = layout.columns == ColumnMode::Mix && i == 0;
        if !split || leading {
            nodes.push(RenderNode {
                key: block.id.0.clone(),
                kind: NodeKind::Block(block.kind),
                width_px: full,
                runs: block.runs.clone(),
            });
            continue;
        }
        for (column, width_px) in [Column::Left, Column::Right].into_iter().zip(geometry.column_widths_px) {
            nodes.push(RenderNode {
                key: column_key(&block.id.0, column),
                kind: NodeKind::Block(block.kind),
                width_px,
                runs: block.runs.clone(),
            });
        }
    }

    MountRequest {
        nodes,
        font,
        spacing: spacing.clone(),
        reported,
    }
}

/// Commits the request to the mount and reads back every node's dimensions.
pub async fn measure(
    mount: &mut dyn MeasurementMount,
    request: &MountRequest,
    blocks: &[Block],
) -> Result<Measurements, MountError> {
    mount.commit(request).await?;
    let mount: &dyn MeasurementMount = mount;

    let keys: HashSet<&str> = request.nodes.iter().map(|n| n.key.as_str()).collect();
    let has_profile = keys.contains(PROFILE_KEY);
    let measurements = Measurements {
        header: read(mount, HEADER_KEY),
        profile: has_profile.then(|| read(mount, PROFILE_KEY)),
        blocks: blocks
            .iter()
            .map(|b| {
                let id = b.id.0.as_str();
                if keys.contains(column_key(id, Column::Left).as_str()) {
                    [read_column(mount, id, Column::Left), read_column(mount, id, Column::Right)]
                } else {
                    let dim = read(mount, id);
                    [dim, dim]
                }
            })
            .collect(),
    };
    Ok(measurements)
}

/// A client may report one box for both columns under the plain block id.
fn read_column(mount: &dyn MeasurementMount, id: &str, column: Column) -> Dimension {
    match mount.probe(&column_key(id, column)) {
        Some(dim) => dim,
        None => read(mount, id),
    }
}

fn read(mount: &dyn MeasurementMount, key: &str) -> Dimension {
    mount.probe(key).unwrap_or_else(|| {
        debug!(key, "measurement target not mounted, using zero dimensions");
        Dimension::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::blocks::{BlockId, TextRole};
    use crate::layout::font_metrics::get_metrics;
    use crate::layout::mount::{layout_node, MetricsMount, ReportedMount};

    fn make_block(id: &str) -> Block {
        Block {
            id: BlockId(id.to_string()),
            kind: BlockKind::Item,
            ordinal: 0,
            runs: vec![TextRun {
                role: TextRole::Body,
                text: "Shipped things".to_string(),
            }],
        }
    }

    fn make_layout(columns: ColumnMode, anchor: HeaderAnchor) -> LayoutConfig {
        LayoutConfig {
            columns,
            header_anchor: anchor,
            column_split: [40, 60],
            ..Default::default()
        }
    }

    #[test]
    fn test_left_anchored_header_measured_at_left_column_width() {
        let layout = make_layout(ColumnMode::Two, HeaderAnchor::Left);
        let spacing = SpacingConfig::default();
        let geometry = PageGeometry::resolve(&layout, &spacing);
        let request = build_request(
            vec![],
            None,
            &[make_block("b1")],
            &layout,
            &spacing,
            FontDescriptor::default(),
            None,
        );
        assert_eq!(request.nodes[0].width_px, geometry.column_widths_px[0]);
        assert_eq!(request.nodes[1].key, "b1@left");
        assert_eq!(request.nodes[1].width_px, geometry.column_widths_px[0]);
        assert_eq!(request.nodes[2].key, "b1@right");
        assert_eq!(request.nodes[2].width_px, geometry.column_widths_px[1]);
    }

    #[test]
    fn test_mix_leading_block_measured_full_width() {
        let layout = make_layout(ColumnMode::Mix, HeaderAnchor::Top);
        let spacing = SpacingConfig::default();
        let geometry = PageGeometry::resolve(&layout, &spacing);
        let request = build_request(
            vec![],
            Some(vec![]),
            &[make_block("lead"), make_block("b2")],
            &layout,
            &spacing,
            FontDescriptor::default(),
            None,
        );
        let widths: Vec<f32> = request.nodes.iter().map(|n| n.width_px).collect();
        assert_eq!(
            widths,
            vec![
                geometry.content_width_px,
                geometry.content_width_px,
                geometry.content_width_px,
                geometry.column_widths_px[0],
                geometry.column_widths_px[1],
            ]
        );
    }

    #[test]
    fn test_single_column_blocks_render_once() {
        let request = build_request(
            vec![],
            None,
            &[make_block("b1")],
            &LayoutConfig::default(),
            &SpacingConfig::default(),
            FontDescriptor::default(),
            None,
        );
        let keys: Vec<&str> = request.nodes.iter().map(|n| n.key.as_str()).collect();
        assert_eq!(keys, vec!["header", "b1"]);
    }

    #[tokio::test]
    async fn test_uneven_split_measures_each_column_at_its_width() {
        let layout = LayoutConfig {
            columns: ColumnMode::Two,
            header_anchor: HeaderAnchor::Right,
            column_split: [30, 70],
            ..Default::default()
        };
        let spacing = SpacingConfig::default();
        let geometry = PageGeometry::resolve(&layout, &spacing);
        let mut block = make_block("long");
        block.runs[0].text = "Led the migration of a monolithic billing platform to event driven \
            services, cutting settlement latency from hours to seconds across twelve markets"
            .to_string();
        let blocks = vec![block];
        let font = FontDescriptor {
            ready: true,
            ..Default::default()
        };
        let request = build_request(vec![], None, &blocks, &layout, &spacing, font, None);

        let mut mount = MetricsMount::default();
        let measured = measure(&mut mount, &request, &blocks).await.unwrap();
        let [left, right] = measured.blocks[0];

        let at_right_width = RenderNode {
            key: "long".to_string(),
            kind: NodeKind::Block(BlockKind::Item),
            width_px: geometry.column_widths_px[1],
            runs: blocks[0].runs.clone(),
        };
        let expected = layout_node(&at_right_width, get_metrics(font.family), &spacing);
        assert_eq!(right, expected);
        assert!(left.height > right.height);
    }

    #[tokio::test]
    async fn test_missing_nodes_measure_zero() {
        let blocks = vec![make_block("b1"), make_block("b2")];
        let mut reported = BTreeMap::new();
        reported.insert("header".to_string(), Dimension::new(80.0, 0.0, 12.0));
        reported.insert("b2".to_string(), Dimension::new(40.0, 2.0, 4.0));
        let request = build_request(
            vec![],
            None,
            &blocks,
            &LayoutConfig::default(),
            &SpacingConfig::default(),
            FontDescriptor::default(),
            Some(reported),
        );

        let mut mount = ReportedMount::default();
        let measured = measure(&mut mount, &request, &blocks).await.unwrap();
        assert_eq!(measured.header, Dimension::new(80.0, 0.0, 12.0));
        assert_eq!(measured.profile, None);
        let b2 = Dimension::new(40.0, 2.0, 4.0);
        assert_eq!(measured.blocks, vec![[Dimension::default(); 2], [b2, b2]]);
    }

    #[tokio::test]
    async fn test_reported_plain_id_covers_both_columns() {
        let blocks = vec![make_block("b1")];
        let layout = make_layout(ColumnMode::Two, HeaderAnchor::Top);
        let mut reported = BTreeMap::new();
        reported.insert("b1".to_string(), Dimension::new(50.0, 0.0, 0.0));
        reported.insert("b1@right".to_string(), Dimension::new(30.0, 0.0, 0.0));
        let request = build_request(
            vec![],
            None,
            &blocks,
            &layout,
            &SpacingConfig::default(),
            FontDescriptor::default(),
            Some(reported),
        );

        let mut mount = ReportedMount::default();
        let measured = measure(&mut mount, &request, &blocks).await.unwrap();
        assert_eq!(measured.blocks[0][0].height, 50.0);
        assert_eq!(measured.blocks[0][1].height, 30.0);
    }
}
