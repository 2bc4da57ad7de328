use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

use futures_util::StreamExt;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use turn_decoder::JobEvent;

use crate::config::{BackendConfig, DEFAULT_USER_AGENT};
use crate::error::{parse_error_message, BackendApiError};
use crate::payload::{JobCreated, JobDetail, JobSummary, PromptRequest, SessionEvents, StoredSession};
use crate::sse::EventLineParser;

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// File downloads may carry screenshots, so they get a longer budget
/// than control calls.
const FILE_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CSRF_HEADER: &str = "X-CSRF-Token";

/// Cookie-authenticated client for the job backend.
///
/// `login` must succeed before any other call: it establishes the session
/// cookie and captures the CSRF token that rides on mutating requests.
#[derive(Debug)]
pub struct BackendClient {
    http: Client,
    config: BackendConfig,
    csrf_token: Mutex<Option<String>>,
}

impl BackendClient {
    pub fn new(config: BackendConfig) -> Result<Self, BackendApiError> {
        if config.base_url.trim().is_empty() {
            return Err(BackendApiError::InvalidBaseUrl(config.base_url));
        }
        let http = Client::builder()
            .cookie_store(true)
            .connect_timeout(config.connect_timeout)
            .default_headers(default_headers(&config)?)
            .build()
            .map_err(BackendApiError::from)?;
        Ok(Self {
            http,
            config,
            csrf_token: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// True once `login` has captured a CSRF token.
    pub fn is_authenticated(&self) -> bool {
        lock_unpoisoned(&self.csrf_token).is_some()
    }

    /// Exchange the auth token for a session cookie, then scrape the CSRF
    /// token out of the index page.
    pub async fn login(&self, auth_token: &str) -> Result<(), BackendApiError> {
        let response = self
            .http
            .post(self.config.endpoint("login"))
            .timeout(self.config.request_timeout)
            .json(&serde_json::json!({ "token": auth_token }))
            .send()
            .await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(BackendApiError::RateLimited),
            status if !status.is_success() => return Err(BackendApiError::AuthFailed),
            _ => {}
        }

        let index = self
            .http
            .get(self.config.endpoint(""))
            .timeout(self.config.request_timeout)
            .send()
            .await?
            .text()
            .await?;
        let token = csrf_pattern()
            .captures(&index)
            .and_then(|captures| captures.get(1))
            .map(|capture| capture.as_str().to_string())
            .ok_or(BackendApiError::MissingCsrfToken)?;

        *lock_unpoisoned(&self.csrf_token) = Some(token);
        Ok(())
    }

    /// Allowed working directories, grouped by label.
    pub async fn directories(&self) -> Result<BTreeMap<String, Vec<String>>, BackendApiError> {
        self.get_json("api/directories", &[]).await
    }

    /// Create a job for a prompt. The returned id feeds `stream_job`.
    pub async fn send_prompt(&self, request: &PromptRequest) -> Result<JobCreated, BackendApiError> {
        self.post_json("api/prompt", request).await
    }

    /// Job detail with stored events, skipping the first `offset` events.
    pub async fn job(&self, job_id: &str, offset: usize) -> Result<JobDetail, BackendApiError> {
        let offset = offset.to_string();
        self.get_json(&format!("api/jobs/{job_id}"), &[("offset", offset.as_str())])
            .await
    }

    /// Recent jobs, newest first.
    pub async fn jobs(&self) -> Result<Vec<JobSummary>, BackendApiError> {
        self.get_json("api/jobs", &[]).await
    }

    /// Ask the backend to stop a running job.
    pub async fn cancel(&self, job_id: &str) -> Result<(), BackendApiError> {
        let _: Value = self
            .post_json("api/cancel", &serde_json::json!({ "job_id": job_id }))
            .await?;
        Ok(())
    }

    /// Stored conversation logs available on the host machine.
    pub async fn sessions(&self) -> Result<Vec<StoredSession>, BackendApiError> {
        self.get_json("api/sessions", &[]).await
    }

    /// Raw stored records for one conversation, in log order.
    pub async fn session_events(&self, session_id: &str) -> Result<Vec<Value>, BackendApiError> {
        let detail: SessionEvents = self
            .get_json(&format!("api/sessions/{session_id}"), &[])
            .await?;
        Ok(detail.events)
    }

    /// Fetch a file from the host, returning its bytes and MIME type.
    pub async fn file(&self, path: &str) -> Result<(Vec<u8>, String), BackendApiError> {
        let response = self
            .http
            .get(self.config.endpoint("api/files"))
            .query(&[("path", path)])
            .timeout(FILE_REQUEST_TIMEOUT)
            .send()
            .await?;
        let response = check_status(response).await?;
        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = response.bytes().await?;
        Ok((bytes.to_vec(), mime))
    }

    /// Stream live events for a job until the connection closes.
    ///
    /// The connect timeout still applies, but there is no read timeout: a
    /// quiet agent can hold the stream open indefinitely. Cancellation is
    /// polled while awaiting, so a raised signal interrupts a blocked read
    /// within one poll interval and surfaces as `Cancelled`.
    pub async fn stream_job<F>(
        &self,
        job_id: &str,
        cancellation: Option<&CancellationSignal>,
        mut on_event: F,
    ) -> Result<(), BackendApiError>
    where
        F: FnMut(JobEvent),
    {
        let request = self
            .http
            .get(self.config.endpoint(&format!("api/jobs/{job_id}/stream")))
            .send();
        let response = await_or_cancel(request, cancellation)
            .await?
            .map_err(BackendApiError::from)?;
        let response = check_status(response).await?;

        let mut bytes = response.bytes_stream();
        let mut parser = EventLineParser::default();

        loop {
            let Some(chunk) = await_or_cancel(bytes.next(), cancellation).await? else {
                break;
            };
            if is_cancelled(cancellation) {
                return Err(BackendApiError::Cancelled);
            }
            let chunk = chunk.map_err(BackendApiError::from)?;
            for event in parser.feed(&chunk) {
                on_event(event);
            }
        }

        if let Some(event) = parser.finish() {
            on_event(event);
        }

        if is_cancelled(cancellation) {
            return Err(BackendApiError::Cancelled);
        }

        Ok(())
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, BackendApiError>
    where
        T: DeserializeOwned,
    {
        let mut request = self
            .http
            .get(self.config.endpoint(path))
            .timeout(self.config.request_timeout);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = check_status(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, BackendApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut request = self
            .http
            .post(self.config.endpoint(path))
            .timeout(self.config.request_timeout)
            .json(body);
        if let Some(token) = lock_unpoisoned(&self.csrf_token).as_deref() {
            request = request.header(CSRF_HEADER, token);
        }
        let response = check_status(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }
}

fn default_headers(config: &BackendConfig) -> Result<HeaderMap, BackendApiError> {
    let mut headers = HeaderMap::new();
    let user_agent = config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .map_err(|_| BackendApiError::Unknown(format!("invalid user agent: {user_agent}")))?,
    );
    for (key, value) in &config.extra_headers {
        headers.insert(
            HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| BackendApiError::Unknown(format!("invalid header key: {key}")))?,
            HeaderValue::from_str(value)
                .map_err(|_| BackendApiError::Unknown(format!("invalid header value for {key}")))?,
        );
    }
    Ok(headers)
}

async fn check_status(response: Response) -> Result<Response, BackendApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(BackendApiError::RateLimited);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendApiError::Status(
        status,
        parse_error_message(status, &body),
    ))
}

fn csrf_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"const CSRF_TOKEN = "([^"]+)""#).expect("static pattern compiles")
    })
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, BackendApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(BackendApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(BackendApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::{await_or_cancel, csrf_pattern, is_cancelled, CancellationSignal};
    use crate::error::BackendApiError;

    #[test]
    fn csrf_pattern_extracts_token_from_index_page() {
        let html = r#"<script>const CSRF_TOKEN = "abc123";</script>"#;
        let token = csrf_pattern()
            .captures(html)
            .and_then(|captures| captures.get(1))
            .map(|capture| capture.as_str());
        assert_eq!(token, Some("abc123"));
    }

    #[test]
    fn csrf_pattern_requires_quoted_assignment() {
        assert!(csrf_pattern().captures("const CSRF_TOKEN = abc").is_none());
    }

    #[test]
    fn cancellation_signal_defaults_unset() {
        let signal: CancellationSignal = Arc::new(AtomicBool::new(false));
        assert!(!is_cancelled(Some(&signal)));
        signal.store(true, Ordering::Release);
        assert!(is_cancelled(Some(&signal)));
        assert!(!is_cancelled(None));
    }

    #[tokio::test]
    async fn await_or_cancel_returns_output_without_signal() {
        let output = await_or_cancel(async { 7 }, None).await.unwrap();
        assert_eq!(output, 7);
    }

    #[tokio::test]
    async fn await_or_cancel_interrupts_pending_future() {
        let signal: CancellationSignal = Arc::new(AtomicBool::new(true));
        let pending = std::future::pending::<()>();
        let result = await_or_cancel(pending, Some(&signal)).await;
        assert!(matches!(result, Err(BackendApiError::Cancelled)));
    }
}
