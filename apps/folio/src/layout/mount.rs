//! Measurement mounts — the hidden render targets the prober reads from.
//!
//! # Backends
//! - `MetricsMount` lays text out server-side with static font metrics.
//! - `ReportedMount` holds box metrics measured by the client's own hidden
//!   mount (the browser is the ground truth there).
//!
//! # Pooling
//! Mounts are expensive to set up in a real renderer, so each document view
//! leases one from a `MountPool` slot once and reuses it for every pass. A slot
//! is never leased twice at the same time, so two documents measured
//! concurrently never share a mount. Dropping the lease releases the slot and
//! parks the mount for the next view.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::layout::blocks::{BlockKind, TextRole};
use crate::layout::config::SpacingConfig;
use crate::layout::font_metrics::{fallback_metrics, get_metrics, FontMetrics};
use crate::layout::probe::{Dimension, MountRequest, NodeKind, RenderNode};

#[derive(Debug, Error)]
pub enum MountError {
    #[error("measurement slot {0} is already leased")]
    SlotInUse(Uuid),

    #[error("measurement pool exhausted ({capacity} slots in use)")]
    PoolExhausted { capacity: usize },

    #[error("render failed: {0}")]
    Render(String),
}

/// Capability interface: render nodes at a target width and report their boxes.
///
/// `commit` resolves once the render is done (one paint in a UI runtime);
/// only then are `probe` results meaningful.
#[async_trait]
pub trait MeasurementMount: Send + Sync {
    async fn commit(&mut self, request: &MountRequest) -> Result<(), MountError>;

    fn probe(&self, key: &str) -> Option<Dimension>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementStrategy {
    #[default]
    Metrics,
    Reported,
}

impl MeasurementStrategy {
    fn build(self) -> Box<dyn MeasurementMount> {
        match self {
            MeasurementStrategy::Metrics => Box::new(MetricsMount::default()),
            MeasurementStrategy::Reported => Box::new(ReportedMount::default()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// MetricsMount
// ────────────────────────────────────────────────────────────────────────────

/// Server-side renderer: greedy word wrap over static font metrics.
#[derive(Debug, Default)]
pub struct MetricsMount {
    boxes: HashMap<String, Dimension>,
}

#[async_trait]
impl MeasurementMount for MetricsMount {
    async fn commit(&mut self, request: &MountRequest) -> Result<(), MountError> {
        let nodes = request.nodes.clone();
        let spacing = request.spacing.clone();
        let metrics = if request.font.ready {
            get_metrics(request.font.family)
        } else {
            fallback_metrics()
        };

        // Wrapping every node is CPU-bound; keep it off the async workers.
        let boxes = tokio::task::spawn_blocking(move || {
            nodes
                .iter()
                .map(|node| (node.key.clone(), layout_node(node, metrics, &spacing)))
                .collect::<HashMap<_, _>>()
        })
        .await
        .map_err(|e| MountError::Render(format!("layout task failed: {e}")))?;

        debug!(nodes = boxes.len(), "metrics mount committed");
        self.boxes = boxes;
        Ok(())
    }

    fn probe(&self, key: &str) -> Option<Dimension> {
        self.boxes.get(key).copied()
    }
}

/// Font size multiplier per text role.
fn role_scale(role: TextRole) -> f32 {
    match role {
        TextRole::Name => 1.8,
        TextRole::Title => 1.15,
        TextRole::Body => 1.0,
        TextRole::Meta => 0.875,
    }
}

pub(crate) fn layout_node(node: &RenderNode, metrics: &FontMetrics, spacing: &SpacingConfig) -> Dimension {
    let base = spacing.font_size_px;
    let mut height = 0.0_f32;
    for run in &node.runs {
        let font_px = base * role_scale(run.role);
        let lines = metrics.wrapped_lines(&run.text, node.width_px / font_px);
        height += lines as f32 * font_px * spacing.line_height;
    }

    let (margin_top, margin_bottom) = match node.kind {
        NodeKind::Header => (0.0, base),
        NodeKind::Profile => (base * 0.5, base),
        NodeKind::Block(BlockKind::SectionHeading) => {
            // 2px rule under the section title
            height += 2.0;
            (base, base * 0.25)
        }
        NodeKind::Block(BlockKind::Section) => {
            height += 2.0;
            (base, 0.0)
        }
        NodeKind::Block(BlockKind::Item) => (0.0, 0.0),
        NodeKind::Block(BlockKind::Paragraph) => (0.0, base * 0.75),
    };

    Dimension::new(height.ceil(), margin_top, margin_bottom)
}

// ────────────────────────────────────────────────────────────────────────────
// ReportedMount
// ────────────────────────────────────────────────────────────────────────────

/// Holds metrics a client-side renderer measured for this exact request.
#[derive(Debug, Default)]
pub struct ReportedMount {
    boxes: HashMap<String, Dimension>,
}

#[async_trait]
impl MeasurementMount for ReportedMount {
    async fn commit(&mut self, request: &MountRequest) -> Result<(), MountError> {
        self.boxes = request
            .reported
            .iter()
            .flatten()
            .map(|(k, d)| (k.clone(), *d))
            .collect();
        tokio::task::yield_now().await;
        Ok(())
    }

    fn probe(&self, key: &str) -> Option<Dimension> {
        self.boxes.get(key).copied()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pool
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct PoolState {
    leased: HashSet<Uuid>,
    idle: Vec<(MeasurementStrategy, Box<dyn MeasurementMount>)>,
}

/// Per-view measurement slots with an explicit acquire / release lifecycle.
pub struct MountPool {
    capacity: usize,
    state: Mutex<PoolState>,
}

impl MountPool {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            state: Mutex::new(PoolState::default()),
        })
    }

    /// Leases the mount for `slot`, reusing a parked mount of the same strategy.
    pub fn acquire(
        self: &Arc<Self>,
        slot: Uuid,
        strategy: MeasurementStrategy,
    ) -> Result<MountLease, MountError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.leased.contains(&slot) {
            return Err(MountError::SlotInUse(slot));
        }
        if state.leased.len() >= self.capacity {
            return Err(MountError::PoolExhausted {
                capacity: self.capacity,
            });
        }

        let mount = match state.idle.iter().position(|(s, _)| *s == strategy) {
            Some(pos) => state.idle.swap_remove(pos).1,
            None => strategy.build(),
        };
        state.leased.insert(slot);
        info!(%slot, ?strategy, in_use = state.leased.len(), "measurement slot acquired");

        Ok(MountLease {
            slot,
            strategy,
            mount: Some(mount),
            pool: Arc::clone(self),
        })
    }

    pub fn in_use(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .leased
            .len()
    }

    fn give_back(&self, slot: Uuid, strategy: MeasurementStrategy, mount: Box<dyn MeasurementMount>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.leased.remove(&slot);
        if state.idle.len() < self.capacity {
            state.idle.push((strategy, mount));
        }
        info!(%slot, in_use = state.leased.len(), "measurement slot released");
    }
}

/// Exclusive use of one pooled mount. Released on drop.
pub struct MountLease {
    slot: Uuid,
    strategy: MeasurementStrategy,
    mount: Option<Box<dyn MeasurementMount>>,
    pool: Arc<MountPool>,
}

impl MountLease {
    pub fn slot(&self) -> Uuid {
        self.slot
    }

    pub fn mount_mut(&mut self) -> Option<&mut (dyn MeasurementMount + 'static)> {
        self.mount.as_deref_mut()
    }

    /// Explicit release; equivalent to dropping the lease.
    pub fn release(self) {}

    /// Replaces the leased mount, e.g. with a scripted one in tests.
    #[cfg(test)]
    pub(crate) fn with_mount(mut self, mount: Box<dyn MeasurementMount>) -> Self {
        self.mount = Some(mount);
        self
    }
}

impl Drop for MountLease {
    fn drop(&mut self) {
        if let Some(mount) = self.mount.take() {
            self.pool.give_back(self.slot, self.strategy, mount);
        }
    }
}
