use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ai::pricing::cost_usd;
use crate::database::models::UsageLog;
use crate::database::Database;
use crate::types::money;

/// One billable LLM call waiting to be written
#[derive(Debug, Clone)]
pub struct UsageEvent {
    pub user_id: Uuid,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub feature: &'static str,
}

#[derive(Debug, Serialize)]
struct NewUsageLog<'a> {
    model: &'a str,
    input_tokens: u32,
    output_tokens: u32,
    feature: &'a str,
    #[serde(with = "money")]
    cost_usd: Decimal,
}

/// Counters exposed on `/health`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecorderStats {
    pub recorded: u64,
    pub dropped: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    recorded: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

/// Best-effort usage log writer.
///
/// `record` never blocks and never fails: events go onto a bounded queue drained by a
/// background task. A full queue, a missing database or a failed insert is counted and
/// logged, and the caller's response is unaffected.
#[derive(Debug, Clone)]
pub struct UsageRecorder {
    tx: Option<mpsc::Sender<UsageEvent>>,
    counters: Arc<Counters>,
}

impl UsageRecorder {
    /// Starts the writer task. Must be called inside a Tokio runtime.
    pub fn spawn(database: Option<Database>, capacity: usize) -> Self {
        let counters = Arc::new(Counters::default());
        let Some(database) = database else {
            return Self { tx: None, counters };
        };

        let (tx, mut rx) = mpsc::channel::<UsageEvent>(capacity.max(1));
        let worker_counters = counters.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match write(&database, &event).await {
                    Ok(()) => {
                        worker_counters.recorded.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        worker_counters.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(user_id = %event.user_id, feature = event.feature, error = %e, "Failed to write usage log");
                    }
                }
            }
            debug!("Usage recorder stopped");
        });

        Self { tx: Some(tx), counters }
    }

    /// Recorder that counts every event as dropped
    pub fn disabled() -> Self {
        Self {
            tx: None,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn record(&self, event: UsageEvent) {
        let Some(tx) = &self.tx else {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(feature = event.feature, "Usage logging disabled; event dropped");
            return;
        };
        if let Err(e) = tx.try_send(event) {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "Usage log queue rejected event");
        }
    }

    pub fn stats(&self) -> RecorderStats {
        RecorderStats {
            recorded: self.counters.recorded.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

async fn write(database: &Database, event: &UsageEvent) -> Result<(), crate::database::DatabaseError> {
    let row = NewUsageLog {
        model: &event.model,
        input_tokens: event.input_tokens,
        output_tokens: event.output_tokens,
        feature: event.feature,
        cost_usd: cost_usd(&event.model, event.input_tokens, event.output_tokens),
    };
    database.repo::<UsageLog>(event.user_id).insert(row).await?;
    Ok(())
}
