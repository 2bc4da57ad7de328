use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body for `POST /api/prompt`.
#[derive(Debug, Clone, Serialize)]
pub struct PromptRequest {
    pub prompt: String,
    pub cwd: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Response from `POST /api/prompt`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobCreated {
    pub job_id: String,
}

/// One entry from `GET /api/jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct JobSummary {
    pub job_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub created_at: Option<f64>,
    #[serde(default)]
    pub session_id_out: Option<String>,
}

/// Response from `GET /api/jobs/{id}`. `events` holds the raw stored
/// event objects, suitable for feeding through the event decoder.
#[derive(Debug, Clone, Deserialize)]
pub struct JobDetail {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub events: Vec<Value>,
    #[serde(default)]
    pub session_id_out: Option<String>,
}

/// One entry from `GET /api/sessions`, describing a stored conversation
/// log on the host machine.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredSession {
    pub session_id: String,
    #[serde(default)]
    pub project_dir: String,
    #[serde(default)]
    pub last_modified: Option<f64>,
    #[serde(default)]
    pub last_user_msg: String,
    #[serde(default)]
    pub last_assist_msg: String,
    #[serde(default)]
    pub line_count: u64,
}

/// Response from `GET /api/sessions/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionEvents {
    #[serde(default)]
    pub events: Vec<Value>,
}
