//! Per-run outcome ledger. Append-only per job; owned by the controller worker.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

const RECENT_OUTCOMES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Applied,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub job_id: String,
    pub outcome: Outcome,
    pub reason: String,
    pub title: String,
    pub company: String,
    pub score: f64,
    pub attempt_id: Uuid,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub applied: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeLedger {
    /// Every attempt per job, oldest first.
    entries: BTreeMap<String, Vec<OutcomeRecord>>,
    /// Most recent outcomes across all jobs, newest first.
    #[serde(skip)]
    recent: VecDeque<OutcomeRecord>,
}

impl OutcomeLedger {
    pub fn record(&mut self, record: OutcomeRecord) {
        info!(
            job_id = %record.job_id,
            outcome = ?record.outcome,
            reason = %record.reason,
            "ledger entry recorded"
        );
        self.recent.push_front(record.clone());
        self.recent.truncate(RECENT_OUTCOMES);
        self.entries.entry(record.job_id.clone()).or_default().push(record);
    }

    /// The latest outcome for `job_id`.
    pub fn latest(&self, job_id: &str) -> Option<&OutcomeRecord> {
        self.entries.get(job_id).and_then(|v| v.last())
    }

    pub fn attempts(&self, job_id: &str) -> &[OutcomeRecord] {
        self.entries.get(job_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn recent(&self) -> impl Iterator<Item = &OutcomeRecord> {
        self.recent.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts by each job's latest outcome.
    pub fn summary(&self) -> LedgerSummary {
        let mut summary = LedgerSummary::default();
        for record in self.entries.values().filter_map(|v| v.last()) {
            match record.outcome {
                Outcome::Applied => summary.applied += 1,
                Outcome::Failed => summary.failed += 1,
                Outcome::Skipped => summary.skipped += 1,
            }
        }
        summary
    }
}
