//! Apply Session: the per-job state machine.
//!
//! ```text
//! QUEUED → NAVIGATING → FORM_DETECTED → FILLING ⇄ AWAITING_USER_INPUT
//!                                        ↓    ↑ next page
//!                                      SUBMITTING → APPLIED
//! any non-terminal → FAILED | SKIPPED
//! ```
//!
//! `advance` performs exactly one step. `AWAITING_USER_INPUT` never advances
//! on its own; only `submit_answers` (or `cancel`) moves it. A submit that
//! lands on another page of the form returns to `FILLING`, bounded by
//! `max_form_steps`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::apply::driver::{DriverError, ErrorKind, FieldKind, FormDriver, Question, SubmitStep};
use crate::apply::ledger::{Outcome, OutcomeRecord};
use crate::apply::ApplySettings;
use crate::ingest::resume::UploadedResume;
use crate::models::posting::JobPosting;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Queued,
    Navigating,
    FormDetected,
    Filling,
    AwaitingUserInput,
    Submitting,
    Applied,
    Failed,
    Skipped,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Applied | SessionState::Failed | SessionState::Skipped
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from: SessionState,
    pub to: SessionState,
    pub at: DateTime<Utc>,
}

/// Result of offering answers to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// Every pending question is answered; the session is back in `FILLING`.
    Resumed,
    /// Some answers were taken; these question ids are still open.
    StillWaiting { remaining: Vec<String> },
    /// Nothing changed (not waiting, or every offered answer was already known).
    NoChange,
}

/// What a session needs besides the driver: the profile it fills from and run settings.
pub struct ApplyContext<'a> {
    pub resume: &'a UploadedResume,
    pub settings: &'a ApplySettings,
}

/// Read-only projection published to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub attempt_id: Uuid,
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub score: f64,
    pub state: SessionState,
    pub pending_questions: Vec<Question>,
    pub answered: Vec<String>,
    pub error: Option<ErrorKind>,
    pub skip_reason: Option<String>,
    pub history: Vec<Transition>,
}

#[derive(Debug, Clone)]
pub struct ApplySession {
    pub attempt_id: Uuid,
    pub posting: JobPosting,
    pub score: f64,
    state: SessionState,
    pending_questions: Vec<Question>,
    answers: BTreeMap<String, String>,
    /// Answer ids already handed to the driver.
    applied_answers: BTreeSet<String>,
    known_fields_filled: usize,
    /// Pages moved past with a next-step submit.
    form_steps: usize,
    /// Set on a new page; known fields are filled again before its questions.
    refill_known_fields: bool,
    error: Option<ErrorKind>,
    skip_reason: Option<String>,
    history: Vec<Transition>,
}

impl ApplySession {
    pub fn new(posting: JobPosting, score: f64) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            posting,
            score,
            state: SessionState::Queued,
            pending_questions: Vec::new(),
            answers: BTreeMap::new(),
            applied_answers: BTreeSet::new(),
            known_fields_filled: 0,
            form_steps: 0,
            refill_known_fields: false,
            error: None,
            skip_reason: None,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn job_id(&self) -> &str {
        &self.posting.id
    }

    pub fn pending_questions(&self) -> &[Question] {
        &self.pending_questions
    }

    pub fn error(&self) -> Option<&ErrorKind> {
        self.error.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Performs one step of the state machine against `driver`.
    pub async fn advance(&mut self, driver: &dyn FormDriver, ctx: &ApplyContext<'_>) {
        match self.state {
            SessionState::Queued => self.navigate(driver).await,
            SessionState::Navigating => self.detect(driver, ctx.settings).await,
            SessionState::FormDetected => self.fill_known_fields(driver, ctx.resume).await,
            SessionState::Filling => self.fill_answers(driver, ctx.resume).await,
            SessionState::Submitting => self.submit(driver, ctx.settings).await,
            SessionState::AwaitingUserInput
            | SessionState::Applied
            | SessionState::Failed
            | SessionState::Skipped => {}
        }
    }

    async fn navigate(&mut self, driver: &dyn FormDriver) {
        self.transition(SessionState::Navigating);
        if self.posting.apply_link.is_empty() {
            return self.skip("no apply link");
        }
        if !self.posting.is_easy_apply {
            return self.skip("not an easy apply posting");
        }
        if let Err(err) = driver.open(&self.posting.apply_link).await {
            self.fail(err.into());
        }
    }

    async fn detect(&mut self, driver: &dyn FormDriver, settings: &ApplySettings) {
        let deadline = Instant::now() + settings.detection_window;
        loop {
            match driver.detect_apply_affordance().await {
                Ok(true) => return self.transition(SessionState::FormDetected),
                Ok(false) => {}
                Err(err) => return self.fail(err.into()),
            }
            if Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(settings.poll_interval).await;
        }
        self.skip("no apply affordance found");
    }

    async fn fill_known_fields(&mut self, driver: &dyn FormDriver, resume: &UploadedResume) {
        if let Err(err) = self.fill_profile_fields(driver, resume).await {
            return self.fail(err.into());
        }
        self.transition(SessionState::Filling);
    }

    async fn fill_profile_fields(
        &mut self,
        driver: &dyn FormDriver,
        resume: &UploadedResume,
    ) -> Result<(), DriverError> {
        let profile = &resume.profile;
        let resume_path = resume
            .document_path()
            .map(|p| p.to_string_lossy().into_owned());

        let known = [
            (FieldKind::FullName, profile.contact.name.clone()),
            (FieldKind::Email, profile.contact.email.clone()),
            (FieldKind::Phone, profile.contact.phone.clone()),
            (
                FieldKind::Location,
                Some(profile.location.clone()).filter(|l| !l.is_empty()),
            ),
            (FieldKind::ResumeFile, resume_path),
        ];

        for (field, value) in known {
            let Some(value) = value else { continue };
            driver.fill_known_field(&field, &value).await?;
            self.known_fields_filled += 1;
        }
        Ok(())
    }

    async fn fill_answers(&mut self, driver: &dyn FormDriver, resume: &UploadedResume) {
        if self.refill_known_fields {
            if let Err(err) = self.fill_profile_fields(driver, resume).await {
                return self.fail(err.into());
            }
            self.refill_known_fields = false;
        }

        let unapplied: Vec<(String, String)> = self
            .answers
            .iter()
            .filter(|(id, _)| !self.applied_answers.contains(*id))
            .map(|(id, answer)| (id.clone(), answer.clone()))
            .collect();

        for (id, answer) in unapplied {
            if let Err(err) = driver
                .fill_known_field(&FieldKind::Question(id.clone()), &answer)
                .await
            {
                return self.fail(err.into());
            }
            self.applied_answers.insert(id);
        }

        let unresolved = match driver.list_unresolved_fields().await {
            Ok(fields) => fields,
            Err(err) => return self.fail(err.into()),
        };

        if let Some(rejected) = unresolved
            .iter()
            .find(|q| self.applied_answers.contains(&q.id))
        {
            let detail = format!("answer for '{}' was not accepted", rejected.id);
            return self.fail(ErrorKind::Fill(detail));
        }

        if unresolved.is_empty() {
            self.transition(SessionState::Submitting);
        } else {
            self.pending_questions = unresolved;
            self.transition(SessionState::AwaitingUserInput);
        }
    }

    async fn submit(&mut self, driver: &dyn FormDriver, settings: &ApplySettings) {
        match driver.submit().await {
            Ok(SubmitStep::Final) => {}
            Ok(SubmitStep::NextStep) => return self.next_page(settings),
            Err(err) => return self.fail(err.into()),
        }
        for poll in 0..settings.submit_ack_polls.max(1) {
            if poll > 0 {
                tokio::time::sleep(settings.poll_interval).await;
            }
            match driver.is_submit_acknowledged().await {
                Ok(true) => return self.transition(SessionState::Applied),
                Ok(false) => {}
                Err(err) => return self.fail(err.into()),
            }
        }
        self.fail(ErrorKind::Submission("submission not acknowledged".into()));
    }

    fn next_page(&mut self, settings: &ApplySettings) {
        self.form_steps += 1;
        if self.form_steps >= settings.max_form_steps.max(1) {
            let detail = format!("form did not finish within {} steps", settings.max_form_steps);
            return self.fail(ErrorKind::Submission(detail));
        }
        self.refill_known_fields = true;
        self.transition(SessionState::Filling);
    }

    /// Records answers for pending questions. Already-answered ids and ids
    /// that are not pending are ignored, so repeating a call is a no-op.
    pub fn submit_answers(&mut self, answers: &BTreeMap<String, String>) -> AnswerOutcome {
        if self.state != SessionState::AwaitingUserInput {
            return AnswerOutcome::NoChange;
        }

        let mut accepted = 0;
        for question in &self.pending_questions {
            if self.answers.contains_key(&question.id) {
                continue;
            }
            if let Some(answer) = answers.get(&question.id).filter(|a| !a.trim().is_empty()) {
                self.answers.insert(question.id.clone(), answer.clone());
                accepted += 1;
            }
        }

        let remaining: Vec<String> = self
            .pending_questions
            .iter()
            .filter(|q| !self.answers.contains_key(&q.id))
            .map(|q| q.id.clone())
            .collect();

        if remaining.is_empty() {
            self.pending_questions.clear();
            self.transition(SessionState::Filling);
            AnswerOutcome::Resumed
        } else if accepted > 0 {
            AnswerOutcome::StillWaiting { remaining }
        } else {
            AnswerOutcome::NoChange
        }
    }

    /// Forces a non-terminal session to `FAILED(cancelled)`.
    pub fn cancel(&mut self) {
        if !self.is_terminal() {
            self.fail(ErrorKind::Cancelled);
        }
    }

    /// Ledger entry for a terminal session.
    pub fn outcome(&self) -> Option<OutcomeRecord> {
        let (outcome, reason) = match self.state {
            SessionState::Applied => (Outcome::Applied, "submitted".to_string()),
            SessionState::Failed => (
                Outcome::Failed,
                self.error
                    .as_ref()
                    .map(ErrorKind::reason)
                    .unwrap_or_default(),
            ),
            SessionState::Skipped => (Outcome::Skipped, self.skip_reason.clone().unwrap_or_default()),
            _ => return None,
        };
        Some(OutcomeRecord {
            job_id: self.posting.id.clone(),
            outcome,
            reason,
            title: self.posting.title.clone(),
            company: self.posting.company.clone(),
            score: self.score,
            attempt_id: self.attempt_id,
            recorded_at: Utc::now(),
        })
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            attempt_id: self.attempt_id,
            job_id: self.posting.id.clone(),
            title: self.posting.title.clone(),
            company: self.posting.company.clone(),
            score: self.score,
            state: self.state,
            pending_questions: self.pending_questions.clone(),
            answered: self.answers.keys().cloned().collect(),
            error: self.error.clone(),
            skip_reason: self.skip_reason.clone(),
            history: self.history.clone(),
        }
    }

    fn transition(&mut self, to: SessionState) {
        let from = self.state;
        info!(job_id = %self.posting.id, ?from, ?to, "session transition");
        self.state = to;
        self.history.push(Transition {
            from,
            to,
            at: Utc::now(),
        });
    }

    fn skip(&mut self, reason: &str) {
        self.skip_reason = Some(reason.to_string());
        self.transition(SessionState::Skipped);
    }

    fn fail(&mut self, error: ErrorKind) {
        self.error = Some(error);
        self.pending_questions.clear();
        self.transition(SessionState::Failed);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::apply::driver::testing::{Call, ScriptedFormDriver};
    use crate::models::profile::{ContactInfo, ResumeProfile};

    fn resume() -> UploadedResume {
        UploadedResume::from_profile(ResumeProfile {
            skills: ["python".to_string()].into(),
            experience_years: 3.0,
            titles: vec!["Data Engineer".into()],
            location: "Remote".into(),
            raw_text: "python".into(),
            contact: ContactInfo {
                name: Some("Jane Doe".into()),
                email: Some("jane@example.com".into()),
                phone: None,
            },
        })
    }

    fn posting() -> JobPosting {
        JobPosting {
            id: "https://jobs.example.com/1".into(),
            title: "Data Engineer".into(),
            company: "Acme".into(),
            location: "Remote".into(),
            description_text: "python".into(),
            required_skills: Default::default(),
            is_easy_apply: true,
            apply_link: "https://jobs.example.com/1".into(),
        }
    }

    async fn run_until_blocked(
        session: &mut ApplySession,
        driver: &ScriptedFormDriver,
        resume: &UploadedResume,
    ) {
        let settings = ApplySettings::default();
        let ctx = ApplyContext {
            resume,
            settings: &settings,
        };
        while !session.is_terminal() && session.state() != SessionState::AwaitingUserInput {
            session.advance(driver, &ctx).await;
        }
    }

    fn answers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_happy_path_reaches_applied() {
        let driver = ScriptedFormDriver::new();
        let resume = resume();
        let mut session = ApplySession::new(posting(), 0.8);

        run_until_blocked(&mut session, &driver, &resume).await;

        assert_eq!(session.state(), SessionState::Applied);
        let states: Vec<SessionState> = session.view().history.iter().map(|t| t.to).collect();
        assert_eq!(
            states,
            vec![
                SessionState::Navigating,
                SessionState::FormDetected,
                SessionState::Filling,
                SessionState::Submitting,
                SessionState::Applied,
            ]
        );
        assert_eq!(
            driver.count(|c| matches!(c, Call::Fill(FieldKind::Email, v) if v == "jane@example.com")),
            1
        );
        assert_eq!(driver.count(|c| matches!(c, Call::Fill(FieldKind::Phone, _))), 0);
        assert_eq!(session.outcome().unwrap().outcome, Outcome::Applied);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_question_suspends_then_resumes_to_applied() {
        let driver = ScriptedFormDriver::new().with_question_step(&[("visa", "Need sponsorship?")]);
        let resume = resume();
        let mut session = ApplySession::new(posting(), 0.8);

        run_until_blocked(&mut session, &driver, &resume).await;
        assert_eq!(session.state(), SessionState::AwaitingUserInput);
        assert_eq!(session.pending_questions().len(), 1);
        assert_eq!(session.pending_questions()[0].id, "visa");

        // Blocked: advancing does nothing and never reaches APPLIED.
        let settings = ApplySettings::default();
        let ctx = ApplyContext {
            resume: &resume,
            settings: &settings,
        };
        session.advance(&driver, &ctx).await;
        assert_eq!(session.state(), SessionState::AwaitingUserInput);

        assert_eq!(session.submit_answers(&answers(&[("visa", "No")])), AnswerOutcome::Resumed);
        assert_eq!(session.state(), SessionState::Filling);
        assert!(session.pending_questions().is_empty());

        run_until_blocked(&mut session, &driver, &resume).await;
        assert_eq!(session.state(), SessionState::Applied);
        assert_eq!(driver.answered().get("visa").map(String::as_str), Some("No"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_multi_step_form_reenters_awaiting_input() {
        let driver = ScriptedFormDriver::new()
            .with_question_step(&[("q1", "First?")])
            .with_question_step(&[("q2", "Second?"), ("q3", "Third?")]);
        let resume = resume();
        let mut session = ApplySession::new(posting(), 0.8);

        run_until_blocked(&mut session, &driver, &resume).await;
        assert_eq!(session.submit_answers(&answers(&[("q1", "a")])), AnswerOutcome::Resumed);

        run_until_blocked(&mut session, &driver, &resume).await;
        assert_eq!(session.state(), SessionState::AwaitingUserInput);
        assert_eq!(session.pending_questions().len(), 2);

        assert_eq!(
            session.submit_answers(&answers(&[("q2", "b")])),
            AnswerOutcome::StillWaiting {
                remaining: vec!["q3".into()]
            }
        );
        assert_eq!(session.submit_answers(&answers(&[("q3", "c")])), AnswerOutcome::Resumed);

        run_until_blocked(&mut session, &driver, &resume).await;
        assert_eq!(session.state(), SessionState::Applied);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_step_submit_moves_to_second_page_question() {
        let driver = ScriptedFormDriver::new()
            .with_question_step(&[])
            .with_question_step(&[("visa", "Need sponsorship?")]);
        let resume = resume();
        let mut session = ApplySession::new(posting(), 0.8);

        run_until_blocked(&mut session, &driver, &resume).await;
        assert_eq!(session.state(), SessionState::AwaitingUserInput);
        assert_eq!(session.pending_questions()[0].id, "visa");
        assert_eq!(driver.count(|c| matches!(c, Call::Acknowledged)), 0);
        // Known fields are filled again on the new page.
        assert_eq!(driver.count(|c| matches!(c, Call::Fill(FieldKind::Email, _))), 2);

        assert_eq!(session.submit_answers(&answers(&[("visa", "No")])), AnswerOutcome::Resumed);
        run_until_blocked(&mut session, &driver, &resume).await;
        assert_eq!(session.state(), SessionState::Applied);
        assert_eq!(driver.count(|c| matches!(c, Call::Submit)), 2);

        let states: Vec<SessionState> = session.view().history.iter().map(|t| t.to).collect();
        assert_eq!(
            states,
            vec![
                SessionState::Navigating,
                SessionState::FormDetected,
                SessionState::Filling,
                SessionState::Submitting,
                SessionState::Filling,
                SessionState::AwaitingUserInput,
                SessionState::Filling,
                SessionState::Submitting,
                SessionState::Applied,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_form_that_never_finishes_fails_after_step_cap() {
        let driver = ScriptedFormDriver::new().stuck_on_next_step();
        let resume = resume();
        let mut session = ApplySession::new(posting(), 0.8);

        run_until_blocked(&mut session, &driver, &resume).await;
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(
            session.error(),
            Some(&ErrorKind::Submission("form did not finish within 10 steps".into()))
        );
        assert_eq!(driver.count(|c| matches!(c, Call::Submit)), 10);
        assert_eq!(driver.count(|c| matches!(c, Call::Acknowledged)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_answers_are_idempotent() {
        let driver = ScriptedFormDriver::new().with_question_step(&[("q1", "A?"), ("q2", "B?")]);
        let resume = resume();
        let mut session = ApplySession::new(posting(), 0.8);
        run_until_blocked(&mut session, &driver, &resume).await;

        let first = session.submit_answers(&answers(&[("q1", "yes")]));
        assert!(matches!(first, AnswerOutcome::StillWaiting { .. }));
        let before = session.view();

        let again = session.submit_answers(&answers(&[("q1", "changed"), ("unknown", "x")]));
        assert_eq!(again, AnswerOutcome::NoChange);
        assert_eq!(session.view(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_answers_outside_awaiting_input_are_ignored() {
        let mut session = ApplySession::new(posting(), 0.8);
        assert_eq!(session.submit_answers(&answers(&[("q1", "x")])), AnswerOutcome::NoChange);
        assert_eq!(session.state(), SessionState::Queued);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_easy_apply_is_skipped_without_opening() {
        let driver = ScriptedFormDriver::new();
        let resume = resume();
        let mut job = posting();
        job.is_easy_apply = false;
        let mut session = ApplySession::new(job, 0.8);

        run_until_blocked(&mut session, &driver, &resume).await;
        assert_eq!(session.state(), SessionState::Skipped);
        assert_eq!(session.outcome().unwrap().reason, "not an easy apply posting");
        assert!(driver.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_link_is_skipped() {
        let driver = ScriptedFormDriver::new();
        let resume = resume();
        let mut job = posting();
        job.apply_link.clear();
        let mut session = ApplySession::new(job, 0.8);

        run_until_blocked(&mut session, &driver, &resume).await;
        assert_eq!(session.outcome().unwrap().reason, "no apply link");
    }

    #[tokio::test(start_paused = true)]
    async fn test_affordance_window_expires_to_skipped() {
        let driver = ScriptedFormDriver::new().without_affordance();
        let resume = resume();
        let mut session = ApplySession::new(posting(), 0.8);
        let started = Instant::now();

        run_until_blocked(&mut session, &driver, &resume).await;
        assert_eq!(session.state(), SessionState::Skipped);
        assert_eq!(session.outcome().unwrap().reason, "no apply affordance found");
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert_eq!(driver.count(|c| matches!(c, Call::Detect)), 21);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_affordance_within_window_is_detected() {
        let driver = ScriptedFormDriver::new().with_affordance_after(3);
        let resume = resume();
        let mut session = ApplySession::new(posting(), 0.8);
        run_until_blocked(&mut session, &driver, &resume).await;
        assert_eq!(session.state(), SessionState::Applied);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_faults_fail_with_specific_kind() {
        let resume = resume();

        let driver = ScriptedFormDriver::new().failing_open(DriverError::Nav("dns".into()));
        let mut session = ApplySession::new(posting(), 0.8);
        run_until_blocked(&mut session, &driver, &resume).await;
        assert_eq!(session.error(), Some(&ErrorKind::Navigation("dns".into())));

        let driver = ScriptedFormDriver::new().failing_fill(DriverError::Fill("stale".into()));
        let mut session = ApplySession::new(posting(), 0.8);
        run_until_blocked(&mut session, &driver, &resume).await;
        assert_eq!(session.error(), Some(&ErrorKind::Fill("stale".into())));

        let driver = ScriptedFormDriver::new().failing_submit(DriverError::Submit("400".into()));
        let mut session = ApplySession::new(posting(), 0.8);
        run_until_blocked(&mut session, &driver, &resume).await;
        assert_eq!(session.error(), Some(&ErrorKind::Submission("400".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unacknowledged_submit_fails() {
        let driver = ScriptedFormDriver::new().without_acknowledgement();
        let resume = resume();
        let mut session = ApplySession::new(posting(), 0.8);
        run_until_blocked(&mut session, &driver, &resume).await;
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(driver.count(|c| matches!(c, Call::Acknowledged)), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_awaiting_input_fails_cancelled() {
        let driver = ScriptedFormDriver::new().with_question_step(&[("q", "?")]);
        let resume = resume();
        let mut session = ApplySession::new(posting(), 0.8);
        run_until_blocked(&mut session, &driver, &resume).await;

        session.cancel();
        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.pending_questions().is_empty());
        let record = session.outcome().unwrap();
        assert_eq!(record.outcome, Outcome::Failed);
        assert_eq!(record.reason, "cancelled");

        session.cancel();
        assert_eq!(session.view().history.len(), 5);
    }
}
