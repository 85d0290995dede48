//! `FormDriver` backed by a W3C WebDriver endpoint (chromedriver, geckodriver,
//! Selenium). One browser session is created lazily and reused across
//! application attempts.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::apply::driver::{DriverError, FieldKind, FormDriver, Question, SubmitStep};

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const RETRY_BASE_DELAY_MS: u64 = 250;

const TRANSIENT_ERRORS: &[&str] = &[
    "stale element reference",
    "element not interactable",
    "element click intercepted",
];

/// Clicks the first visible apply control. Also reports `true` when an
/// application form with inputs is already open.
const AFFORDANCE_SCRIPT: &str = r#"
const visible = el => !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);
const label = el => ((el.innerText || '') + ' ' + (el.getAttribute('aria-label') || '')).trim();
const controls = Array.from(document.querySelectorAll('button, a, [role="button"], input[type="button"]'));
const apply = controls.find(el => visible(el) && /easy apply|apply now|^\s*apply\s*$/i.test(label(el)));
if (apply) { apply.click(); return true; }
const form = Array.from(document.querySelectorAll('form')).find(f => visible(f) && f.querySelector('input, textarea, select'));
return !!form;
"#;

/// Required, visible, still-empty fields of the open form, in document order.
const UNRESOLVED_SCRIPT: &str = r#"
const visible = el => !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);
const root = document.querySelector('[role="dialog"] form, form') || document;
const fields = Array.from(root.querySelectorAll('input, textarea, select'))
  .filter(el => el.type !== 'hidden' && el.type !== 'file' && visible(el))
  .filter(el => el.required || el.getAttribute('aria-required') === 'true');
const seen = new Set();
const out = [];
for (const el of fields) {
  const id = el.name || el.id;
  if (!id || seen.has(id)) continue;
  let empty;
  if (el.type === 'radio') {
    empty = !root.querySelector(`input[type="radio"][name="${CSS.escape(el.name)}"]:checked`);
  } else if (el.type === 'checkbox') {
    empty = !el.checked;
  } else {
    empty = !String(el.value || '').trim();
  }
  if (!empty) continue;
  seen.add(id);
  const byFor = el.id ? root.querySelector(`label[for="${CSS.escape(el.id)}"]`) : null;
  const wrapping = el.closest('label');
  const prompt = ((byFor || wrapping || {}).innerText || el.getAttribute('aria-label') || el.placeholder || id).trim();
  let options = [];
  if (el.tagName === 'SELECT') {
    options = Array.from(el.options).map(o => o.text.trim()).filter(Boolean);
  } else if (el.type === 'radio') {
    options = Array.from(root.querySelectorAll(`input[type="radio"][name="${CSS.escape(el.name)}"]`))
      .map(r => ((r.closest('label') || {}).innerText || r.value || '').trim()).filter(Boolean);
  }
  out.push({ id, prompt, options });
}
return out;
"#;

/// Fills a custom question by name or id; returns `false` when it is not on the page.
const FILL_QUESTION_SCRIPT: &str = r#"
const [id, value] = arguments;
const els = Array.from(document.querySelectorAll(`[name="${CSS.escape(id)}"], #${CSS.escape(id)}`));
if (!els.length) return false;
const el = els[0];
const fire = target => ['input', 'change'].forEach(t => target.dispatchEvent(new Event(t, { bubbles: true })));
if (el.tagName === 'SELECT') {
  const opt = Array.from(el.options).find(o => o.text.trim().toLowerCase() === value.toLowerCase() || o.value === value);
  if (!opt) return false;
  el.value = opt.value;
  fire(el);
} else if (el.type === 'radio') {
  const match = els.find(r => r.value === value || ((r.closest('label') || {}).innerText || '').trim().toLowerCase() === value.toLowerCase());
  if (!match) return false;
  match.click();
} else if (el.type === 'checkbox') {
  el.checked = /^(yes|true|1|on)$/i.test(value);
  fire(el);
} else {
  el.focus();
  el.value = value;
  fire(el);
}
return true;
"#;

/// Clicks submit, review, next or continue inside the open form. Returns
/// `"final"` or `"next"` for the kind of control clicked, `null` when none.
const SUBMIT_SCRIPT: &str = r#"
const visible = el => !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);
const root = document.querySelector('[role="dialog"]') || document;
const buttons = Array.from(root.querySelectorAll('button, input[type="submit"]')).filter(visible);
const text = el => ((el.innerText || el.value || '') + ' ' + (el.getAttribute('aria-label') || '')).trim();
const submit = buttons.find(b => /submit/i.test(text(b)));
if (submit) { submit.click(); return 'final'; }
const next = buttons.find(b => /review|next|continue/i.test(text(b)));
if (next) { next.click(); return 'next'; }
const fallback = buttons.find(b => b.type === 'submit');
if (fallback) { fallback.click(); return 'final'; }
return null;
"#;

const ACK_SCRIPT: &str = r#"
const text = (document.body && document.body.innerText) || '';
return /application (was )?(sent|submitted)|thank you for applying|your application has been (received|submitted)/i.test(text);
"#;

#[derive(Debug, Error)]
enum WireError {
    #[error("{0}")]
    Transport(String),

    #[error("{error}: {message}")]
    Protocol { error: String, message: String },
}

impl WireError {
    fn is_transient(&self) -> bool {
        match self {
            WireError::Transport(_) => true,
            WireError::Protocol { error, .. } => TRANSIENT_ERRORS.contains(&error.as_str()),
        }
    }

    fn is_no_such_element(&self) -> bool {
        matches!(self, WireError::Protocol { error, .. } if error == "no such element")
    }
}

impl From<reqwest::Error> for WireError {
    fn from(err: reqwest::Error) -> Self {
        WireError::Transport(err.to_string())
    }
}

/// CSS selectors tried in order for each profile-backed field.
fn selectors_for(field: &FieldKind) -> &'static [&'static str] {
    match field {
        FieldKind::FullName => &[
            "input[autocomplete='name']",
            "input[name='name']",
            "input[name*='fullname' i]",
            "input[name*='full_name' i]",
        ],
        FieldKind::Email => &[
            "input[type='email']",
            "input[autocomplete='email']",
            "input[name*='email' i]",
        ],
        FieldKind::Phone => &[
            "input[type='tel']",
            "input[autocomplete='tel']",
            "input[name*='phone' i]",
        ],
        FieldKind::Location => &[
            "input[autocomplete='address-level2']",
            "input[name*='location' i]",
            "input[name*='city' i]",
        ],
        FieldKind::ResumeFile => &["input[type='file'][name*='resume' i]", "input[type='file']"],
        FieldKind::Question(_) => &[],
    }
}

fn capabilities(headless: bool) -> Value {
    let args: Vec<&str> = if headless {
        vec!["--headless=new", "--disable-gpu", "--window-size=1280,1024"]
    } else {
        vec!["--window-size=1280,1024"]
    };
    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": { "args": args }
            }
        }
    })
}

/// Splits a WebDriver response body into its `value` or a protocol error.
fn parse_response(body: Value) -> Result<Value, WireError> {
    let value = body.get("value").cloned().unwrap_or(Value::Null);
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(WireError::Protocol {
            error: error.to_string(),
            message: value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }
    Ok(value)
}

fn submit_step(value: &Value) -> Option<SubmitStep> {
    match value.as_str()? {
        "final" => Some(SubmitStep::Final),
        "next" => Some(SubmitStep::NextStep),
        _ => None,
    }
}

fn element_id(value: &Value) -> Option<String> {
    value.get(ELEMENT_KEY).and_then(Value::as_str).map(String::from)
}

pub struct WebDriverFormDriver {
    client: Client,
    endpoint: String,
    headless: bool,
    max_retries: u32,
    session: Mutex<Option<String>>,
}

impl WebDriverFormDriver {
    pub fn new(endpoint: String, headless: bool, max_retries: u32) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            headless,
            max_retries: max_retries.max(1),
            session: Mutex::new(None),
        })
    }

    /// Ends the browser session, if one was started.
    pub async fn close(&self) {
        let Some(id) = self.session.lock().await.take() else {
            return;
        };
        match self.command(Method::DELETE, &format!("/session/{id}"), None).await {
            Ok(_) => info!(session = %id, "webdriver session closed"),
            Err(e) => warn!(session = %id, "failed to close webdriver session: {e}"),
        }
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, WireError> {
        let url = format!("{}{}", self.endpoint, path);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        match parse_response(body) {
            Err(err) => Err(err),
            Ok(_) if status.is_server_error() => Err(WireError::Transport(format!(
                "webdriver returned status {status}"
            ))),
            Ok(value) => Ok(value),
        }
    }

    /// Runs `command` with bounded retries on transient faults.
    async fn command_with_retry(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, WireError> {
        let mut attempt = 0;
        loop {
            match self.command(method.clone(), path, body.clone()).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < self.max_retries => {
                    let delay = Duration::from_millis(RETRY_BASE_DELAY_MS * (1 << attempt));
                    warn!(
                        "WebDriver {} attempt {} failed ({}), retrying after {}ms...",
                        path,
                        attempt + 1,
                        err,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn session_id(&self) -> Result<String, WireError> {
        let mut guard = self.session.lock().await;
        if let Some(id) = guard.as_ref() {
            return Ok(id.clone());
        }
        let value = self
            .command_with_retry(Method::POST, "/session", Some(capabilities(self.headless)))
            .await?;
        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| WireError::Transport("session response carried no sessionId".into()))?
            .to_string();
        info!(session = %id, "webdriver session started");
        *guard = Some(id.clone());
        Ok(id)
    }

    async fn execute(&self, script: &str, args: Value) -> Result<Value, WireError> {
        let id = self.session_id().await?;
        self.command_with_retry(
            Method::POST,
            &format!("/session/{id}/execute/sync"),
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }

    async fn find(&self, selector: &str) -> Result<Option<String>, WireError> {
        let id = self.session_id().await?;
        match self
            .command_with_retry(
                Method::POST,
                &format!("/session/{id}/element"),
                Some(json!({ "using": "css selector", "value": selector })),
            )
            .await
        {
            Ok(value) => Ok(element_id(&value)),
            Err(err) if err.is_no_such_element() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn type_into(&self, element: &str, text: &str, clear: bool) -> Result<(), WireError> {
        let id = self.session_id().await?;
        if clear {
            self.command_with_retry(
                Method::POST,
                &format!("/session/{id}/element/{element}/clear"),
                Some(json!({})),
            )
            .await?;
        }
        self.command_with_retry(
            Method::POST,
            &format!("/session/{id}/element/{element}/value"),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl FormDriver for WebDriverFormDriver {
    async fn open(&self, url: &str) -> Result<(), DriverError> {
        let id = self
            .session_id()
            .await
            .map_err(|e| DriverError::Transport(e.to_string()))?;
        self.command_with_retry(
            Method::POST,
            &format!("/session/{id}/url"),
            Some(json!({ "url": url })),
        )
        .await
        .map_err(|e| DriverError::Nav(e.to_string()))?;
        debug!(%url, "navigated");
        Ok(())
    }

    async fn detect_apply_affordance(&self) -> Result<bool, DriverError> {
        let value = self
            .execute(AFFORDANCE_SCRIPT, json!([]))
            .await
            .map_err(|e| DriverError::Nav(e.to_string()))?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn fill_known_field(&self, field: &FieldKind, value: &str) -> Result<(), DriverError> {
        let fill_err = |e: WireError| DriverError::Fill(e.to_string());

        if let FieldKind::Question(question_id) = field {
            let filled = self
                .execute(FILL_QUESTION_SCRIPT, json!([question_id, value]))
                .await
                .map_err(fill_err)?;
            if filled.as_bool() != Some(true) {
                return Err(DriverError::Fill(format!(
                    "question '{question_id}' could not take the answer"
                )));
            }
            return Ok(());
        }

        for selector in selectors_for(field) {
            if let Some(element) = self.find(selector).await.map_err(fill_err)? {
                let clear = *field != FieldKind::ResumeFile;
                self.type_into(&element, value, clear).await.map_err(fill_err)?;
                return Ok(());
            }
        }
        debug!(?field, "known field not present on form");
        Ok(())
    }

    async fn list_unresolved_fields(&self) -> Result<Vec<Question>, DriverError> {
        let value = self
            .execute(UNRESOLVED_SCRIPT, json!([]))
            .await
            .map_err(|e| DriverError::Fill(e.to_string()))?;
        serde_json::from_value(value).map_err(|e| DriverError::Fill(e.to_string()))
    }

    async fn submit(&self) -> Result<SubmitStep, DriverError> {
        let clicked = self
            .execute(SUBMIT_SCRIPT, json!([]))
            .await
            .map_err(|e| DriverError::Submit(e.to_string()))?;
        let step = submit_step(&clicked)
            .ok_or_else(|| DriverError::Submit("no submit control found".into()))?;
        debug!(?step, "form submit clicked");
        Ok(step)
    }

    async fn is_submit_acknowledged(&self) -> Result<bool, DriverError> {
        let value = self
            .execute(ACK_SCRIPT, json!([]))
            .await
            .map_err(|e| DriverError::Submit(e.to_string()))?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn release(&self) {
        let Some(id) = self.session.lock().await.clone() else {
            return;
        };
        if let Err(e) = self
            .command(
                Method::POST,
                &format!("/session/{id}/url"),
                Some(json!({ "url": "about:blank" })),
            )
            .await
        {
            debug!("could not reset page after attempt: {e}");
        }
    }
}
