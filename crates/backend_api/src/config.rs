use std::collections::BTreeMap;
use std::time::Duration;

/// Transport configuration for backend requests.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the backend tunnel, scheme included.
    pub base_url: String,
    /// TCP connect timeout applied to every request.
    pub connect_timeout: Duration,
    /// Full-request timeout for control calls. Streams opt out of this.
    pub request_timeout: Duration,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers sent with every request.
    pub extra_headers: BTreeMap<String, String>,
}

pub(crate) const DEFAULT_USER_AGENT: &str = "remote-agent/0.1";

impl Default for BackendConfig {
    fn default() -> Self {
        let mut extra_headers = BTreeMap::new();
        // Tunnel providers interpose a browser warning page without this.
        extra_headers.insert("ngrok-skip-browser-warning".to_string(), "true".to_string());
        Self {
            base_url: String::new(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            user_agent: None,
            extra_headers,
        }
    }
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }

    /// Join an absolute path onto the base URL, collapsing trailing slashes.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.base_url.trim().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::BackendConfig;

    #[test]
    fn endpoint_join_collapses_slashes() {
        let config = BackendConfig::new("https://example.ngrok.app/");
        assert_eq!(
            config.endpoint("/api/jobs"),
            "https://example.ngrok.app/api/jobs"
        );
        assert_eq!(config.endpoint("login"), "https://example.ngrok.app/login");
    }

    #[test]
    fn default_headers_bypass_tunnel_warning_page() {
        let config = BackendConfig::default();
        assert_eq!(
            config.extra_headers.get("ngrok-skip-browser-warning"),
            Some(&"true".to_string())
        );
    }
}
