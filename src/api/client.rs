//! HTTP client for the network twin backend.
//!
//! Wraps the read endpoints (`/network/topology`, `/sensors`) and the
//! fire-and-forget action triggers (`/sensors/refresh`,
//! `/sensors/simulate-leak/{edge}`, `/sensors/reset/{edge}`).

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::ApiError;
use crate::source::{SensorRow, SensorsResponse, Topology};

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A backend action the dashboard can trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Re-read every sensor so readings look live.
    RefreshSensors,
    /// Inject leak-like readings on one pipe.
    SimulateLeak { edge_id: String },
    /// Restore normal readings on one pipe.
    ResetSensors { edge_id: String },
}

impl Action {
    /// Path relative to the API base URL.
    pub fn path(&self) -> String {
        match self {
            Action::RefreshSensors => "/sensors/refresh".to_string(),
            Action::SimulateLeak { edge_id } => {
                format!("/sensors/simulate-leak/{}", urlencoded(edge_id))
            }
            Action::ResetSensors { edge_id } => {
                format!("/sensors/reset/{}", urlencoded(edge_id))
            }
        }
    }

    /// Short human label for notifications.
    pub fn label(&self) -> String {
        match self {
            Action::RefreshSensors => "Sensor refresh".to_string(),
            Action::SimulateLeak { edge_id } => format!("Leak simulation on {}", edge_id),
            Action::ResetSensors { edge_id } => format!("Sensor reset on {}", edge_id),
        }
    }
}

/// Body returned by action endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ActionResponse {
    /// Turn an `"error"` status into a [`ApiError::Rejected`].
    pub fn into_result(self) -> Result<Option<String>, ApiError> {
        if self.status.eq_ignore_ascii_case("error") {
            let reason = self
                .error
                .or(self.message)
                .unwrap_or_else(|| "Backend reported an error".to_string());
            Err(ApiError::Rejected(reason))
        } else {
            Ok(self.message)
        }
    }
}

/// Client for the twin backend HTTP API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the given base URL (e.g. "http://localhost:8000").
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the absolute URL for a path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch nodes, edges and the incident summary.
    pub async fn fetch_topology(&self) -> Result<Topology, ApiError> {
        let url = self.url("/network/topology");
        debug!(%url, "fetching topology");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status().as_u16()));
        }

        response
            .json::<Topology>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Fetch every sensor row.
    pub async fn fetch_sensors(&self) -> Result<Vec<SensorRow>, ApiError> {
        let url = self.url("/sensors");
        debug!(%url, "fetching sensors");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status().as_u16()));
        }

        let body: SensorsResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(body.sensors)
    }

    /// Trigger an action and wait for the backend's verdict.
    ///
    /// Returns the backend's message on success.
    pub async fn trigger(&self, action: &Action) -> Result<Option<String>, ApiError> {
        let url = self.url(&action.path());
        debug!(%url, "triggering action");

        let response = self.client.post(&url).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status().as_u16()));
        }

        let body: ActionResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        body.into_result()
    }
}

/// Percent-encode a path segment.
fn urlencoded(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => c.to_string(),
            _ => c
                .to_string()
                .bytes()
                .map(|b| format!("%{:02X}", b))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and return the request line.
    async fn serve_once(status: &str, body: &str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            request.lines().next().unwrap_or_default().to_string()
        });

        (format!("http://{}", addr), handle)
    }

    #[test]
    fn test_action_paths() {
        assert_eq!(Action::RefreshSensors.path(), "/sensors/refresh");
        assert_eq!(
            Action::SimulateLeak {
                edge_id: "E1".into()
            }
            .path(),
            "/sensors/simulate-leak/E1"
        );
        assert_eq!(
            Action::ResetSensors {
                edge_id: "pipe 7/a".into()
            }
            .path(),
            "/sensors/reset/pipe%207%2Fa"
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.url("/sensors"), "http://localhost:8000/sensors");
    }

    #[test]
    fn test_action_response_error_status() {
        let body: ActionResponse =
            serde_json::from_str(r#"{"status": "error", "message": "Edge INVALID not found"}"#)
                .unwrap();
        let err = body.into_result().unwrap_err();
        assert_eq!(err.to_string(), "Edge INVALID not found");

        let ok: ActionResponse =
            serde_json::from_str(r#"{"status": "success", "message": "Refreshed 12 sensors"}"#)
                .unwrap();
        assert_eq!(ok.into_result().unwrap().as_deref(), Some("Refreshed 12 sensors"));
    }

    #[tokio::test]
    async fn test_fetch_sensors() {
        let body = r#"{"sensors":[{"id":"s1","asset_id":"e1","asset_type":"edge","type":"flow","value":92.0,"unit":"L/s"}],"count":1}"#;
        let (base, server) = serve_once("200 OK", body).await;

        let client = ApiClient::new(&base).unwrap();
        let sensors = client.fetch_sensors().await.unwrap();
        assert_eq!(sensors.len(), 1);
        assert_eq!(sensors[0].value, Some(92.0));

        let request_line = server.await.unwrap();
        assert!(request_line.starts_with("GET /sensors "));
    }

    #[tokio::test]
    async fn test_fetch_topology_status_error() {
        let (base, server) = serve_once("500 Internal Server Error", "{}").await;

        let client = ApiClient::new(&base).unwrap();
        let err = client.fetch_topology().await.unwrap_err();
        assert!(matches!(err, ApiError::Status(500)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_trigger_posts_to_action_path() {
        let (base, server) = serve_once("200 OK", r#"{"status":"success"}"#).await;

        let client = ApiClient::new(&base).unwrap();
        let action = Action::SimulateLeak {
            edge_id: "E1".into(),
        };
        assert!(client.trigger(&action).await.is_ok());

        let request_line = server.await.unwrap();
        assert!(request_line.starts_with("POST /sensors/simulate-leak/E1 "));
    }
}
