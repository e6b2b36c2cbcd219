//! Preview sessions — one pagination worker and one measurement slot per open document view.
//!
//! Opening a session leases a mount slot keyed by the session id; closing it
//! stops the worker and hands the slot back to the pool. Sessions never share
//! a mount.
//!
//! Clients that go away without closing their session are handled by the
//! reaper: every submit, view or font signal touches the session, and sessions
//! idle for longer than the configured TTL are closed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::layout::mount::{MeasurementStrategy, MountPool};
use crate::layout::orchestrator::{PaginationInput, PaginationView, Paginator};

pub struct PreviewSession {
    pub id: Uuid,
    pub measurement: MeasurementStrategy,
    pub created_at: DateTime<Utc>,
    last_seen: Mutex<Instant>,
    paginator: Paginator,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub measurement: MeasurementStrategy,
    pub created_at: DateTime<Utc>,
}

impl PreviewSession {
    fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.last_seen.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            measurement: self.measurement,
            created_at: self.created_at,
        }
    }
}

/// All open preview sessions of this process.
pub struct PreviewRegistry {
    sessions: RwLock<HashMap<Uuid, PreviewSession>>,
    pool: Arc<MountPool>,
    debounce: Duration,
    idle_ttl: Duration,
}

impl PreviewRegistry {
    pub fn new(pool: Arc<MountPool>, debounce: Duration, idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            pool,
            debounce,
            idle_ttl,
        }
    }

    pub async fn open(&self, measurement: MeasurementStrategy) -> Result<SessionInfo, AppError> {
        let id = Uuid::new_v4();
        let lease = self.pool.acquire(id, measurement)?;
        let session = PreviewSession {
            id,
            measurement,
            created_at: Utc::now(),
            last_seen: Mutex::new(Instant::now()),
            paginator: Paginator::spawn(lease, self.debounce),
        };
        let info = session.info();
        self.sessions.write().await.insert(id, session);
        info!(session = %id, ?measurement, "preview session opened");
        Ok(info)
    }

    /// Validates and queues a snapshot; returns its revision.
    pub async fn submit(&self, id: Uuid, input: PaginationInput) -> Result<u64, AppError> {
        input.validate()?;
        let sessions = self.sessions.read().await;
        let session = lookup(&sessions, id)?;
        session.touch();
        if session.measurement == MeasurementStrategy::Reported && input.measurements.is_none() {
            return Err(AppError::Validation(
                "reported sessions require client measurements".to_string(),
            ));
        }
        Ok(session.paginator.submit(input))
    }

    /// Signals that the session's font finished loading.
    pub async fn font_ready(&self, id: Uuid) -> Result<Option<u64>, AppError> {
        let sessions = self.sessions.read().await;
        let session = lookup(&sessions, id)?;
        session.touch();
        Ok(session.paginator.font_ready())
    }

    pub async fn view(&self, id: Uuid) -> Result<PaginationView, AppError> {
        let sessions = self.sessions.read().await;
        let session = lookup(&sessions, id)?;
        session.touch();
        Ok(session.paginator.current())
    }

    /// Tears the session down and releases its measurement slot.
    pub async fn close(&self, id: Uuid) -> Result<(), AppError> {
        let session = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("Preview {id} not found")))?;

        if let Some(lease) = session.paginator.shutdown().await {
            lease.release();
        }
        info!(session = %id, "preview session closed");
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Closes every session idle for at least the TTL; returns how many closed.
    pub async fn reap_idle(&self) -> usize {
        let now = Instant::now();
        let idle: Vec<Uuid> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.idle_for(now) >= self.idle_ttl)
            .map(|s| s.id)
            .collect();

        let mut closed = 0;
        for id in idle {
            match self.close(id).await {
                Ok(()) => closed += 1,
                // closed concurrently by its client
                Err(e) => debug!(session = %id, "idle session already gone: {e}"),
            }
        }
        closed
    }

    /// Runs [`PreviewRegistry::reap_idle`] every `every` until the registry is dropped.
    pub fn spawn_reaper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let reaped = registry.reap_idle().await;
                if reaped > 0 {
                    let open = registry.len().await;
                    info!(reaped, open, "closed idle preview sessions");
                }
            }
        })
    }
}

fn lookup(sessions: &HashMap<Uuid, PreviewSession>, id: Uuid) -> Result<&PreviewSession, AppError> {
    sessions
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("Preview {id} not found")))
}
