use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timeout for requests against the capability server
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A capability offering as served by `GET /capabilities`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practice_area: Option<String>,
    #[serde(default)]
    pub industry_verticals: Vec<String>,
    #[serde(default)]
    pub capacity: f64,
    #[serde(default)]
    pub consultants: Vec<String>,
}

impl Capability {
    /// Practice badge text ("General" when the server omits the field)
    pub fn practice_label(&self) -> &str {
        self.practice_area.as_deref().unwrap_or("General")
    }
}

/// Capabilities keyed by name. Names are unique keys in the server response,
/// and sorted iteration keeps the rendered order stable across re-fetches.
pub type CapabilityMap = BTreeMap<String, Capability>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never completed (connect failure, timeout, bad body)
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status and (maybe) a `detail` field
    #[error("{detail}")]
    Server { status: StatusCode, detail: String },

    #[error("invalid server URL `{0}`")]
    BadUrl(String),
}

/// Success payload of register/unregister
#[derive(Debug, Deserialize)]
struct MessageBody {
    message: Option<String>,
}

/// Error payload of any non-2xx response
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Client for the capability server's REST endpoints
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    pub fn new(server_url: &str) -> Result<Self, ApiError> {
        let base = Url::parse(server_url)
            .map_err(|e| ApiError::BadUrl(format!("{server_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::BadUrl(server_url.to_string()));
        }

        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self { http, base })
    }

    /// Fetch the full capability map
    pub async fn fetch_capabilities(&self) -> Result<CapabilityMap, ApiError> {
        let url = self.url(&["capabilities"]);
        tracing::debug!("Fetching capabilities from {}", url);

        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(Self::server_error(resp).await);
        }

        Ok(resp.json().await?)
    }

    /// Register an email as a consultant for a capability.
    /// Returns the server's confirmation message.
    pub async fn register(&self, capability: &str, email: &str) -> Result<String, ApiError> {
        let url = self.url(&["capabilities", capability, "register"]);
        tracing::debug!("Registering {} for {}", email, capability);

        let resp = self
            .http
            .post(url)
            .query(&[("email", email)])
            .send()
            .await?;
        Self::read_message(resp).await
    }

    /// Remove a consultant registration from a capability
    pub async fn unregister(&self, capability: &str, email: &str) -> Result<String, ApiError> {
        let url = self.url(&["capabilities", capability, "unregister"]);
        tracing::debug!("Unregistering {} from {}", email, capability);

        let resp = self
            .http
            .delete(url)
            .query(&[("email", email)])
            .send()
            .await?;
        Self::read_message(resp).await
    }

    /// Build an endpoint URL under the base, percent-encoding each segment
    /// (capability names may contain spaces and slashes).
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        {
            // Checked in new(): the base can always carry path segments
            let mut path = url.path_segments_mut().expect("base URL validated");
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        url
    }

    async fn read_message(resp: Response) -> Result<String, ApiError> {
        if !resp.status().is_success() {
            return Err(Self::server_error(resp).await);
        }

        let body: MessageBody = resp.json().await?;
        Ok(body
            .message
            .unwrap_or_else(|| "Request completed".to_string()))
    }

    /// Convert a non-2xx response into the application-level error, keeping
    /// the server-provided `detail` text when there is one.
    async fn server_error(resp: Response) -> ApiError {
        let status = resp.status();
        let detail = resp
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.detail)
            .unwrap_or_else(|| "An error occurred".to_string());

        ApiError::Server { status, detail }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_defaults() {
        let json = r#"{"Cloud":{"description":"x","capacity":10,"consultants":["a@x.com"]}}"#;
        let map: CapabilityMap = serde_json::from_str(json).unwrap();

        assert_eq!(map.len(), 1);
        let cloud = &map["Cloud"];
        assert_eq!(cloud.description, "x");
        assert_eq!(cloud.capacity, 10.0);
        assert_eq!(cloud.consultants.len(), 1);
        assert_eq!(cloud.consultants[0], "a@x.com");
        assert!(cloud.industry_verticals.is_empty());
        assert_eq!(cloud.practice_label(), "General");
    }

    #[test]
    fn test_map_is_sorted_by_name() {
        let json = r#"{
            "Security": {"description": "b"},
            "Cloud": {"description": "a"}
        }"#;
        let map: CapabilityMap = serde_json::from_str(json).unwrap();
        let names: Vec<&String> = map.keys().collect();
        assert_eq!(names, ["Cloud", "Security"]);
    }

    #[test]
    fn test_url_encodes_segments() {
        let client = ApiClient::new("http://localhost:8000").unwrap();
        let url = client.url(&["capabilities", "Data & AI", "register"]);
        assert_eq!(url.path(), "/capabilities/Data%20&%20AI/register");

        // A slash in the name must stay a single segment
        let url = client.url(&["capabilities", "Cloud/Edge", "unregister"]);
        assert_eq!(url.path(), "/capabilities/Cloud%2FEdge/unregister");
    }

    #[test]
    fn test_url_respects_base_path() {
        let client = ApiClient::new("http://localhost:8000/internal/").unwrap();
        let url = client.url(&["capabilities"]);
        assert_eq!(url.path(), "/internal/capabilities");
    }

    #[test]
    fn test_bad_server_url() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ApiError::BadUrl(_))
        ));
        assert!(matches!(
            ApiClient::new("mailto:someone@x.com"),
            Err(ApiError::BadUrl(_))
        ));
    }

    #[test]
    fn test_error_body_detail() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail":"already registered"}"#).unwrap();
        assert_eq!(body.detail.as_deref(), Some("already registered"));

        let body: ErrorBody = serde_json::from_str(r#"{}"#).unwrap();
        assert!(body.detail.is_none());
    }
}
