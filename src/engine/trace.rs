// Step tracing - per-step execution records for telemetry and debugging

//! # Step Tracing
//!
//! The reducer can emit one [`TraceRecord`] per step to a [`TraceSink`].
//! Traces power the developer console's "what actually ran" view: which
//! steps executed, which were skipped by their `if` gate, what the
//! resolved args were, and how long each invocation took.
//!
//! Renderer suspension and aborts are recorded as **expected** outcomes -
//! they are control transfer and cancellation, not failures - so sinks
//! that forward to error telemetry can filter on
//! [`StepOutcome::is_failure`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::models::{BrickPosition, RegistryId};

/// How a traced step concluded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum StepOutcome {
    /// The brick ran and produced a value (null for effects).
    Completed { output: Value },
    /// The step's `if` gate resolved falsy; the brick was never invoked.
    Skipped,
    /// A headless run suspended at this renderer step.
    Suspended,
    /// The step failed. `expected` mirrors
    /// [`BrickRuntimeError::is_expected`](crate::BrickRuntimeError::is_expected).
    Failed { error: String, expected: bool },
}

impl StepOutcome {
    /// Whether telemetry should count this as a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, StepOutcome::Failed { expected: false, .. })
    }
}

/// One step's execution record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRecord {
    /// The run this record belongs to.
    pub run_id: Uuid,
    /// Step position in the pipeline tree.
    pub position: BrickPosition,
    /// Brick the step invoked (or would have invoked).
    pub brick_id: RegistryId,
    /// The step's stable instance id, when the definition carries one.
    pub instance_id: Option<String>,
    /// Resolved args, when resolution got that far.
    pub args: Option<Value>,
    /// How the step concluded.
    pub outcome: StepOutcome,
    /// When the step began resolving.
    pub started_at: DateTime<Utc>,
    /// When the step settled.
    pub finished_at: DateTime<Utc>,
}

/// Destination for trace records.
///
/// Sinks must tolerate records arriving from interleaved concurrent runs;
/// records carry their `run_id` for grouping.
#[async_trait]
pub trait TraceSink: Send + Sync {
    /// Store one step record.
    async fn record(&self, record: TraceRecord);
}

/// In-memory sink for tests and the developer console.
#[derive(Default)]
pub struct InMemoryTraceSink {
    records: tokio::sync::RwLock<Vec<TraceRecord>>,
}

impl InMemoryTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of all records seen so far, in arrival order.
    pub async fn snapshot(&self) -> Vec<TraceRecord> {
        self.records.read().await.clone()
    }

    /// Records for one run, in arrival order.
    pub async fn for_run(&self, run_id: Uuid) -> Vec<TraceRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|record| record.run_id == run_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TraceSink for InMemoryTraceSink {
    async fn record(&self, record: TraceRecord) {
        self.records.write().await.push(record);
    }
}
