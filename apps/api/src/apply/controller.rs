//! Auto-Apply Controller: one worker task drives sessions strictly one at a time.
//!
//! Control signals cross into the worker over an mpsc channel; the worker is
//! the only writer of the run snapshot (ledger included) and publishes it on
//! a `watch` channel, so readers never block it and it never blocks on them.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::apply::driver::FormDriver;
use crate::apply::ledger::{LedgerSummary, Outcome, OutcomeLedger, OutcomeRecord};
use crate::apply::session::{AnswerOutcome, ApplyContext, ApplySession, SessionState, SessionView};
use crate::apply::ApplySettings;
use crate::ingest::resume::UploadedResume;
use crate::matching::engine::MatchResult;
use crate::models::posting::JobPosting;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("an auto-apply run is already in progress")]
    AlreadyRunning,

    #[error("auto-apply worker is not running")]
    WorkerGone,
}

/// A posting paired with its match result, as produced by ranking.
#[derive(Debug, Clone)]
pub struct RankedJob {
    pub posting: JobPosting,
    pub result: MatchResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Running,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub score: f64,
}

/// Point-in-time view of the current (or last) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: Option<Uuid>,
    pub phase: RunPhase,
    pub paused: bool,
    pub threshold: Option<f64>,
    pub queued: Vec<QueuedJob>,
    pub active: Option<SessionView>,
    pub summary: LedgerSummary,
    /// Newest first.
    pub recent: Vec<OutcomeRecord>,
    pub ledger: OutcomeLedger,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Default for RunSnapshot {
    fn default() -> Self {
        Self {
            run_id: None,
            phase: RunPhase::Idle,
            paused: false,
            threshold: None,
            queued: Vec::new(),
            active: None,
            summary: LedgerSummary::default(),
            recent: Vec::new(),
            ledger: OutcomeLedger::default(),
            started_at: None,
            finished_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunTicket {
    pub run_id: Uuid,
    pub threshold: f64,
    pub dispatched: usize,
}

struct RunRequest {
    run_id: Uuid,
    threshold: f64,
    jobs: Vec<RankedJob>,
    resume: Arc<UploadedResume>,
}

enum ControlSignal {
    Start(RunRequest),
    Pause,
    Resume,
    Cancel,
    Answers {
        job_id: String,
        answers: BTreeMap<String, String>,
    },
}

/// Handle to the worker. Cheap to clone; every clone talks to the same worker.
#[derive(Clone)]
pub struct AutoApplyController {
    signals: mpsc::UnboundedSender<ControlSignal>,
    snapshot: watch::Receiver<RunSnapshot>,
    settings: ApplySettings,
    /// Set by `start`, cleared by the worker when the run finishes.
    run_slot: Arc<AtomicBool>,
}

impl AutoApplyController {
    /// Spawns the worker on the current tokio runtime.
    pub fn spawn(driver: Arc<dyn FormDriver>, settings: ApplySettings) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(RunSnapshot::default());
        let run_slot = Arc::new(AtomicBool::new(false));

        let worker = Worker {
            driver,
            settings: settings.clone(),
            signals: signal_rx,
            snapshot: snapshot_tx,
            ledger: OutcomeLedger::default(),
            run_slot: run_slot.clone(),
        };
        tokio::spawn(worker.run());

        Self {
            signals: signal_tx,
            snapshot: snapshot_rx,
            settings,
            run_slot,
        }
    }

    pub fn settings(&self) -> &ApplySettings {
        &self.settings
    }

    /// Filters `ranked` to `final_score >= threshold`, caps it at
    /// `max_applications` and hands the queue to the worker. Returns immediately.
    ///
    /// Only one run may be accepted until the worker finishes it; a second
    /// call in the meantime gets `AlreadyRunning`, even before the first run
    /// shows up as `Running` in the snapshot.
    pub fn start(
        &self,
        ranked: Vec<RankedJob>,
        resume: Arc<UploadedResume>,
        threshold: f64,
    ) -> Result<RunTicket, ControllerError> {
        if self
            .run_slot
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ControllerError::AlreadyRunning);
        }

        let jobs: Vec<RankedJob> = ranked
            .into_iter()
            .filter(|job| job.result.final_score >= threshold)
            .take(self.settings.max_applications)
            .collect();

        let ticket = RunTicket {
            run_id: Uuid::new_v4(),
            threshold,
            dispatched: jobs.len(),
        };
        let sent = self.send(ControlSignal::Start(RunRequest {
            run_id: ticket.run_id,
            threshold,
            jobs,
            resume,
        }));
        if let Err(err) = sent {
            self.run_slot.store(false, Ordering::Release);
            return Err(err);
        }
        Ok(ticket)
    }

    pub fn pause(&self) -> Result<(), ControllerError> {
        self.send(ControlSignal::Pause)
    }

    pub fn resume(&self) -> Result<(), ControllerError> {
        self.send(ControlSignal::Resume)
    }

    pub fn cancel(&self) -> Result<(), ControllerError> {
        self.send(ControlSignal::Cancel)
    }

    /// Delivers answers for the active session. Answers for another job, or
    /// for questions already answered, are dropped by the worker.
    pub fn submit_answers(
        &self,
        job_id: String,
        answers: BTreeMap<String, String>,
    ) -> Result<(), ControllerError> {
        self.send(ControlSignal::Answers { job_id, answers })
    }

    pub fn status(&self) -> RunSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn ledger_snapshot(&self) -> OutcomeLedger {
        self.snapshot.borrow().ledger.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.snapshot.clone()
    }

    fn send(&self, signal: ControlSignal) -> Result<(), ControllerError> {
        self.signals
            .send(signal)
            .map_err(|_| ControllerError::WorkerGone)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Worker
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct RunFlags {
    paused: bool,
    cancelled: bool,
}

struct Worker {
    driver: Arc<dyn FormDriver>,
    settings: ApplySettings,
    signals: mpsc::UnboundedReceiver<ControlSignal>,
    snapshot: watch::Sender<RunSnapshot>,
    ledger: OutcomeLedger,
    run_slot: Arc<AtomicBool>,
}

impl Worker {
    async fn run(mut self) {
        while let Some(signal) = self.signals.recv().await {
            match signal {
                ControlSignal::Start(request) => self.execute(request).await,
                ControlSignal::Pause | ControlSignal::Resume | ControlSignal::Cancel => {
                    debug!("control signal ignored: no run in progress");
                }
                ControlSignal::Answers { job_id, .. } => {
                    debug!(%job_id, "answers ignored: no run in progress");
                }
            }
        }
        debug!("auto-apply worker stopped");
    }

    async fn execute(&mut self, request: RunRequest) {
        let RunRequest {
            run_id,
            threshold,
            jobs,
            resume,
        } = request;
        info!(%run_id, threshold, jobs = jobs.len(), "auto-apply run started");

        self.ledger = OutcomeLedger::default();
        let mut queue: VecDeque<RankedJob> = jobs.into();
        let mut flags = RunFlags::default();

        self.snapshot.send_replace(RunSnapshot {
            run_id: Some(run_id),
            phase: RunPhase::Running,
            threshold: Some(threshold),
            queued: queue.iter().map(queued_job).collect(),
            started_at: Some(Utc::now()),
            ..RunSnapshot::default()
        });

        let settings = self.settings.clone();
        let ctx = ApplyContext {
            resume: resume.as_ref(),
            settings: &settings,
        };

        loop {
            while let Ok(signal) = self.signals.try_recv() {
                self.handle_signal(signal, &mut flags, None);
            }
            if flags.cancelled {
                break;
            }
            if flags.paused {
                match self.signals.recv().await {
                    Some(signal) => self.handle_signal(signal, &mut flags, None),
                    None => flags.cancelled = true,
                }
                continue;
            }

            let Some(job) = queue.pop_front() else { break };
            self.snapshot.send_modify(|s| {
                s.queued = queue.iter().map(queued_job).collect();
            });

            let mut session = ApplySession::new(job.posting, job.result.final_score);
            self.drive(&mut session, &ctx, &mut flags).await;
            self.driver.release().await;

            if let Some(record) = session.outcome() {
                self.ledger.record(record);
            }
            self.publish_ledger(|s| s.active = None);
        }

        let phase = if flags.cancelled {
            for job in queue.drain(..) {
                self.ledger.record(OutcomeRecord {
                    job_id: job.posting.id.clone(),
                    outcome: Outcome::Skipped,
                    reason: "cancelled".to_string(),
                    title: job.posting.title,
                    company: job.posting.company,
                    score: job.result.final_score,
                    attempt_id: Uuid::new_v4(),
                    recorded_at: Utc::now(),
                });
            }
            RunPhase::Cancelled
        } else {
            RunPhase::Completed
        };

        // Released first so a caller that sees the final phase can start again.
        self.run_slot.store(false, Ordering::Release);
        self.publish_ledger(|s| {
            s.phase = phase;
            s.queued.clear();
            s.active = None;
            s.finished_at = Some(Utc::now());
        });
        info!(%run_id, ?phase, summary = ?self.ledger.summary(), "auto-apply run finished");
    }

    /// Advances `session` until it is terminal, staying responsive to signals
    /// while it waits for answers.
    async fn drive(
        &mut self,
        session: &mut ApplySession,
        ctx: &ApplyContext<'_>,
        flags: &mut RunFlags,
    ) {
        loop {
            let view = session.view();
            self.snapshot.send_modify(|s| s.active = Some(view));
            if session.is_terminal() {
                return;
            }

            while let Ok(signal) = self.signals.try_recv() {
                self.handle_signal(signal, flags, Some(&mut *session));
            }
            if flags.cancelled {
                session.cancel();
                continue;
            }

            if session.state() == SessionState::AwaitingUserInput {
                match self.signals.recv().await {
                    Some(signal) => self.handle_signal(signal, flags, Some(&mut *session)),
                    None => flags.cancelled = true,
                }
                continue;
            }

            session.advance(self.driver.as_ref(), ctx).await;
        }
    }

    fn handle_signal(
        &self,
        signal: ControlSignal,
        flags: &mut RunFlags,
        session: Option<&mut ApplySession>,
    ) {
        match signal {
            ControlSignal::Pause => flags.paused = true,
            ControlSignal::Resume => flags.paused = false,
            ControlSignal::Cancel => flags.cancelled = true,
            ControlSignal::Start(request) => {
                warn!(run_id = %request.run_id, "start ignored: a run is already in progress");
            }
            ControlSignal::Answers { job_id, answers } => match session {
                Some(session) if session.job_id() == job_id => {
                    let outcome = session.submit_answers(&answers);
                    debug!(%job_id, ?outcome, "answers delivered");
                    if outcome != AnswerOutcome::NoChange {
                        let view = session.view();
                        self.snapshot.send_modify(|s| s.active = Some(view));
                    }
                }
                _ => debug!(%job_id, "answers ignored: not the active session"),
            },
        }
        let paused = flags.paused;
        self.snapshot.send_if_modified(|s| {
            let changed = s.paused != paused;
            s.paused = paused;
            changed
        });
    }

    fn publish_ledger(&self, update: impl FnOnce(&mut RunSnapshot)) {
        let ledger = self.ledger.clone();
        self.snapshot.send_modify(|s| {
            s.summary = ledger.summary();
            s.recent = ledger.recent().cloned().collect();
            s.ledger = ledger;
            update(s);
        });
    }
}

fn queued_job(job: &RankedJob) -> QueuedJob {
    QueuedJob {
        job_id: job.posting.id.clone(),
        title: job.posting.title.clone(),
        company: job.posting.company.clone(),
        score: job.result.final_score,
    }
}
