pub mod controller;
pub mod driver;
pub mod handlers;
pub mod ledger;
pub mod session;
pub mod webdriver;

use std::time::Duration;

/// Tunables for sessions and runs, derived from `Config`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplySettings {
    /// Threshold used when a start request does not carry one.
    pub default_threshold: f64,
    /// Cap on sessions dispatched per run.
    pub max_applications: usize,
    /// How long a session waits for the apply affordance before skipping.
    pub detection_window: Duration,
    /// Interval between affordance checks and between acknowledgement checks.
    pub poll_interval: Duration,
    pub submit_ack_polls: u32,
    /// Cap on next-step submits within one application form.
    pub max_form_steps: usize,
}

impl Default for ApplySettings {
    fn default() -> Self {
        Self {
            default_threshold: 0.6,
            max_applications: 10,
            detection_window: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
            submit_ack_polls: 5,
            max_form_steps: 10,
        }
    }
}
