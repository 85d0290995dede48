//! Form Driver capability consumed by the Apply Session.
//!
//! The session holds no browser handle; it only sequences calls on this
//! trait. Transient UI-timing faults are retried inside implementations, so
//! an `Err` here is final for the current attempt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fields the session can fill from the profile without asking the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum FieldKind {
    FullName,
    Email,
    Phone,
    Location,
    ResumeFile,
    /// A custom question, addressed by the id the driver reported for it.
    Question(String),
}

/// A form field the driver could not resolve from the profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// What a successful `submit` did to the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStep {
    /// Moved on to another page of the form (next, continue, review).
    NextStep,
    /// Pressed the final submit control.
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("navigation failed: {0}")]
    Nav(String),

    #[error("could not fill field: {0}")]
    Fill(String),

    #[error("submission rejected: {0}")]
    Submit(String),

    #[error("driver transport failure: {0}")]
    Transport(String),
}

/// Why a session ended in `FAILED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum ErrorKind {
    Navigation(String),
    Fill(String),
    Submission(String),
    Cancelled,
}

impl ErrorKind {
    /// Short reason recorded in the ledger.
    pub fn reason(&self) -> String {
        match self {
            ErrorKind::Navigation(detail) => format!("navigation error: {detail}"),
            ErrorKind::Fill(detail) => format!("fill error: {detail}"),
            ErrorKind::Submission(detail) => format!("submission error: {detail}"),
            ErrorKind::Cancelled => "cancelled".to_string(),
        }
    }
}

impl From<DriverError> for ErrorKind {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Nav(detail) | DriverError::Transport(detail) => ErrorKind::Navigation(detail),
            DriverError::Fill(detail) => ErrorKind::Fill(detail),
            DriverError::Submit(detail) => ErrorKind::Submission(detail),
        }
    }
}

#[async_trait]
pub trait FormDriver: Send + Sync {
    /// Navigates the browser surface to `url`.
    async fn open(&self, url: &str) -> Result<(), DriverError>;

    /// Looks for the apply affordance on the current page and activates it.
    /// `Ok(false)` means "not yet"; the caller owns the detection window.
    async fn detect_apply_affordance(&self) -> Result<bool, DriverError>;

    /// Populates one field. A known field the form does not have is not an error.
    async fn fill_known_field(&self, field: &FieldKind, value: &str) -> Result<(), DriverError>;

    /// Required fields still empty on the current step, in encounter order.
    async fn list_unresolved_fields(&self) -> Result<Vec<Question>, DriverError>;

    /// Advances the form: next step or final submit.
    async fn submit(&self) -> Result<SubmitStep, DriverError>;

    async fn is_submit_acknowledged(&self) -> Result<bool, DriverError>;

    /// Called once a session is terminal. Implementations may drop page state here.
    async fn release(&self) {}
}
