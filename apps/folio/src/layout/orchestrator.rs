//! Pagination Orchestrator — owns the measure → partition → publish cycle for one document view.
//!
//! # Lifecycle
//! `idle → measuring → partitioning → published`, re-entering `measuring`
//! whenever a new input snapshot arrives.
//!
//! # Ordering
//! Every submitted snapshot gets a revision from a per-view counter. The worker
//! debounces bursts with a trailing delay, then measures the latest snapshot.
//! If a newer snapshot arrives while measuring, the in-flight measurement is
//! dropped. Publication re-checks the latest requested revision under the view
//! lock, so a result is never published once a newer snapshot was requested.
//!
//! # Fonts
//! A snapshot whose font is not ready is still paginated and published, but
//! flagged `provisional`. `font_ready` resubmits the latest snapshot with the
//! font marked ready, which triggers the follow-up measurement.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::layout::assembler::{paginate, PageDescriptor};
use crate::layout::blocks::{derive_blocks, header_runs, merge_leading_section, profile_runs, Block};
use crate::layout::config::{self, ColumnMode, LayoutConfig, SpacingConfig};
use crate::layout::font_metrics::FontDescriptor;
use crate::layout::mount::{MeasurementMount, MountError, MountLease};
use crate::layout::page_fill::{analyze_document, DocumentFill};
use crate::layout::probe::{build_request, measure, Dimension, Measurements, MountRequest};
use crate::models::document::{DocumentContent, DocumentKind};

// ────────────────────────────────────────────────────────────────────────────
// Input / output types
// ────────────────────────────────────────────────────────────────────────────

/// One input snapshot: everything pagination depends on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaginationInput {
    pub document: DocumentContent,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub spacing: SpacingConfig,
    #[serde(default)]
    pub font: FontDescriptor,
    /// Client-measured boxes, used by `reported` measurement sessions.
    #[serde(default)]
    pub measurements: Option<BTreeMap<String, Dimension>>,
}

impl PaginationInput {
    pub fn validate(&self) -> Result<(), AppError> {
        config::validate(&self.layout, &self.spacing)
    }

    /// Cover letters always flow in a single column.
    pub fn effective_layout(&self) -> LayoutConfig {
        match self.document.kind {
            DocumentKind::Resume => self.layout.clone(),
            DocumentKind::CoverLetter => LayoutConfig {
                columns: ColumnMode::One,
                ..self.layout.clone()
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Measuring,
    Partitioning,
    Published,
}

/// What the UI observes for one document view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaginationView {
    /// Revision the current `pages` were computed from (0 = nothing yet).
    pub revision: u64,
    /// Most recently submitted revision.
    pub latest_revision: u64,
    pub phase: Phase,
    /// True until the latest submitted revision is published.
    pub settling: bool,
    /// True when `pages` were measured before the font finished loading.
    pub provisional: bool,
    pub pages: Vec<PageDescriptor>,
    pub fill: Option<DocumentFill>,
    pub published_at: Option<DateTime<Utc>>,
}

// ────────────────────────────────────────────────────────────────────────────
// A single pass
// ────────────────────────────────────────────────────────────────────────────

/// A snapshot turned into blocks and a render request, ready to measure.
pub struct Pass {
    blocks: Vec<Block>,
    request: MountRequest,
    layout: LayoutConfig,
    spacing: SpacingConfig,
    provisional: bool,
}

impl Pass {
    pub fn prepare(input: &PaginationInput) -> Self {
        let layout = input.effective_layout();
        let mut blocks = derive_blocks(&input.document);
        if layout.columns == ColumnMode::Mix {
            blocks = merge_leading_section(blocks);
        }
        let request = build_request(
            header_runs(&input.document),
            profile_runs(&input.document),
            &blocks,
            &layout,
            &input.spacing,
            input.font,
            input.measurements.clone(),
        );
        Pass {
            blocks,
            request,
            layout,
            spacing: input.spacing.clone(),
            provisional: !input.font.ready,
        }
    }

    pub async fn measure(&self, mount: &mut dyn MeasurementMount) -> Result<Measurements, MountError> {
        measure(mount, &self.request, &self.blocks).await
    }

    /// Pure: partitions and assembles from already-measured dimensions.
    pub fn assemble(&self, measured: &Measurements, revision: u64) -> PaginationView {
        let pages = paginate(&self.blocks, measured, &self.layout, &self.spacing);
        let fill = analyze_document(&pages);
        PaginationView {
            revision,
            latest_revision: revision,
            phase: Phase::Published,
            settling: false,
            provisional: self.provisional,
            pages,
            fill: Some(fill),
            published_at: Some(Utc::now()),
        }
    }
}

/// Measures and paginates one snapshot immediately, without debounce.
pub async fn paginate_once(
    mount: &mut dyn MeasurementMount,
    input: &PaginationInput,
) -> Result<PaginationView, MountError> {
    let pass = Pass::prepare(input);
    let measured = pass.measure(mount).await?;
    Ok(pass.assemble(&measured, 1))
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct Submitted {
    revision: u64,
    input: Arc<PaginationInput>,
}

/// Handle to the pagination worker of one document view.
pub struct Paginator {
    inputs: watch::Sender<Option<Submitted>>,
    view: Arc<watch::Sender<PaginationView>>,
    latest: Arc<AtomicU64>,
    worker: JoinHandle<MountLease>,
}

impl Paginator {
    /// Starts the worker. The lease is held for the worker's lifetime and
    /// handed back by [`Paginator::shutdown`].
    pub fn spawn(lease: MountLease, debounce: Duration) -> Self {
        let (inputs, input_rx) = watch::channel(None);
        let view = Arc::new(watch::channel(PaginationView::default()).0);
        let latest = Arc::new(AtomicU64::new(0));

        let worker = Worker {
            inputs: input_rx,
            view: Arc::clone(&view),
            latest: Arc::clone(&latest),
            lease,
            debounce,
        };
        let worker = tokio::spawn(worker.run());

        Paginator {
            inputs,
            view,
            latest,
            worker,
        }
    }

    /// Queues a new snapshot and returns its revision.
    ///
    /// The view is marked settling before the worker can see the snapshot, so
    /// the publication of this revision always comes after it.
    pub fn submit(&self, input: PaginationInput) -> u64 {
        let input = Arc::new(input);
        let mut revision = 0;
        self.inputs.send_modify(|slot| {
            revision = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
            self.view.send_modify(|v| {
                v.latest_revision = v.latest_revision.max(revision);
                v.settling = true;
            });
            *slot = Some(Submitted { revision, input });
        });
        debug!(revision, "pagination snapshot submitted");
        revision
    }

    /// Resubmits the latest snapshot with its font marked ready.
    ///
    /// Returns `None` when nothing was submitted yet or the font already was
    /// ready.
    pub fn font_ready(&self) -> Option<u64> {
        let current = self.inputs.borrow().as_ref().map(|s| Arc::clone(&s.input))?;
        if current.font.ready {
            return None;
        }
        let mut next = (*current).clone();
        next.font.ready = true;
        info!("font resolved, scheduling re-measurement");
        Some(self.submit(next))
    }

    pub fn subscribe(&self) -> watch::Receiver<PaginationView> {
        self.view.subscribe()
    }

    pub fn current(&self) -> PaginationView {
        self.view.borrow().clone()
    }

    /// Stops the worker and returns its mount lease for release.
    pub async fn shutdown(self) -> Option<MountLease> {
        let Paginator { inputs, worker, .. } = self;
        drop(inputs);
        match worker.await {
            Ok(lease) => Some(lease),
            Err(e) => {
                warn!("pagination worker ended abnormally: {e}");
                None
            }
        }
    }
}

enum PassOutcome {
    Published,
    Superseded,
    Failed,
    Closed,
}

struct Worker {
    inputs: watch::Receiver<Option<Submitted>>,
    view: Arc<watch::Sender<PaginationView>>,
    latest: Arc<AtomicU64>,
    lease: MountLease,
    debounce: Duration,
}

impl Worker {
    async fn run(mut self) -> MountLease {
        let mut pending = false;
        loop {
            if !pending && self.inputs.changed().await.is_err() {
                break;
            }
            pending = false;

            if !self.debounce().await {
                break;
            }
            let Some(submitted) = self.inputs.borrow_and_update().clone() else {
                continue;
            };

            match self.process(submitted).await {
                PassOutcome::Published | PassOutcome::Failed => {}
                PassOutcome::Superseded => pending = true,
                PassOutcome::Closed => break,
            }
        }
        debug!(slot = %self.lease.slot(), "pagination worker stopped");
        self.lease
    }

    /// Waits until no new snapshot arrived for a full debounce interval.
    /// Returns false when the handle was dropped.
    async fn debounce(&mut self) -> bool {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.debounce) => return true,
                changed = self.inputs.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
            }
        }
    }

    async fn process(&mut self, submitted: Submitted) -> PassOutcome {
        let revision = submitted.revision;
        self.set_phase(revision, Phase::Measuring);

        let pass = Pass::prepare(&submitted.input);
        let Some(mount) = self.lease.mount_mut() else {
            warn!(revision, "measurement slot has no mount, skipping pass");
            return PassOutcome::Failed;
        };

        let measured = tokio::select! {
            biased;
            changed = self.inputs.changed() => {
                debug!(revision, "snapshot superseded while measuring");
                return if changed.is_ok() { PassOutcome::Superseded } else { PassOutcome::Closed };
            }
            result = pass.measure(mount) => result,
        };

        let measured = match measured {
            Ok(m) => m,
            Err(e) => {
                warn!(revision, "measurement failed, keeping previous pages: {e}");
                self.view.send_modify(|v| {
                    v.phase = if v.revision > 0 { Phase::Published } else { Phase::Idle };
                    v.settling = v.latest_revision > revision;
                });
                return PassOutcome::Failed;
            }
        };

        self.set_phase(revision, Phase::Partitioning);
        let next = pass.assemble(&measured, revision);
        let page_count = next.pages.len();
        let provisional = next.provisional;

        let latest = &self.latest;
        let published = self.view.send_if_modified(|v| {
            if latest.load(Ordering::SeqCst) != revision {
                return false;
            }
            *v = next;
            true
        });

        if published {
            info!(revision, pages = page_count, provisional, "pagination published");
            PassOutcome::Published
        } else {
            debug!(revision, "discarding superseded pagination result");
            PassOutcome::Superseded
        }
    }

    fn set_phase(&self, revision: u64, phase: Phase) {
        let latest = &self.latest;
        self.view.send_if_modified(|v| {
            if latest.load(Ordering::SeqCst) != revision {
                return false;
            }
            v.phase = phase;
            true
        });
    }
}
