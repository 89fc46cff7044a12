//! HTTP polling data source.
//!
//! Spawns two background tasks on the tokio runtime: one polls the topology
//! endpoint, the other the sensors endpoint, each on its own interval.
//! Results arrive on a channel that [`HttpSource::poll`] drains without
//! blocking.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::{DataSource, TwinSnapshot};
use crate::api::ApiClient;

/// Floor for both polling periods.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How often each endpoint is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIntervals {
    pub topology: Duration,
    pub sensors: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            topology: Duration::from_secs(30),
            sensors: Duration::from_secs(5),
        }
    }
}

impl PollIntervals {
    /// Both periods raised to at least [`MIN_POLL_INTERVAL`].
    pub fn clamped(self) -> Self {
        Self {
            topology: self.topology.max(MIN_POLL_INTERVAL),
            sensors: self.sensors.max(MIN_POLL_INTERVAL),
        }
    }
}

/// Last error per endpoint; a success on one does not hide a failure on the other.
#[derive(Debug, Default)]
struct FetchErrors {
    topology: Option<String>,
    sensors: Option<String>,
}

impl FetchErrors {
    fn summary(&self) -> Option<String> {
        match (&self.topology, &self.sensors) {
            (Some(t), Some(s)) => Some(format!("topology: {}; sensors: {}", t, s)),
            (Some(t), None) => Some(format!("topology: {}", t)),
            (None, Some(s)) => Some(format!("sensors: {}", s)),
            (None, None) => None,
        }
    }
}

/// A data source that polls the backend HTTP API.
#[derive(Debug)]
pub struct HttpSource {
    receiver: mpsc::Receiver<TwinSnapshot>,
    description: String,
    errors: Arc<Mutex<FetchErrors>>,
    wake: Arc<Notify>,
    tasks: Vec<JoinHandle<()>>,
}

impl HttpSource {
    /// Start polling `client` on `runtime`.
    pub fn spawn(client: ApiClient, intervals: PollIntervals, runtime: &Handle) -> Self {
        let intervals = intervals.clamped();
        let (tx, rx) = mpsc::channel(16);
        let errors = Arc::new(Mutex::new(FetchErrors::default()));
        let wake = Arc::new(Notify::new());
        let description = format!("api: {}", client.base_url());

        let topology_task = {
            let client = client.clone();
            let tx = tx.clone();
            let errors = errors.clone();
            let wake = wake.clone();
            runtime.spawn(async move {
                let mut ticker = tokio::time::interval(intervals.topology);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {}
                        _ = wake.notified() => {}
                    }
                    let result = client.fetch_topology().await;
                    let update = match result {
                        Ok(topology) => {
                            debug!(
                                nodes = topology.nodes.len(),
                                edges = topology.edges.len(),
                                "topology fetched"
                            );
                            record_error(&errors, |e| e.topology = None);
                            Some(TwinSnapshot::topology(topology))
                        }
                        Err(e) => {
                            warn!(error = %e, "topology fetch failed");
                            let message = e.to_string();
                            record_error(&errors, |errs| errs.topology = Some(message));
                            None
                        }
                    };
                    if let Some(update) = update {
                        if tx.send(update).await.is_err() {
                            break;
                        }
                    }
                }
            })
        };

        let sensor_task = {
            let tx = tx;
            let errors = errors.clone();
            let wake = wake.clone();
            runtime.spawn(async move {
                let mut ticker = tokio::time::interval(intervals.sensors);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {}
                        _ = wake.notified() => {}
                    }
                    let update = match client.fetch_sensors().await {
                        Ok(sensors) => {
                            debug!(rows = sensors.len(), "sensors fetched");
                            record_error(&errors, |e| e.sensors = None);
                            Some(TwinSnapshot::sensors(sensors))
                        }
                        Err(e) => {
                            warn!(error = %e, "sensor fetch failed");
                            let message = e.to_string();
                            record_error(&errors, |errs| errs.sensors = Some(message));
                            None
                        }
                    };
                    if let Some(update) = update {
                        if tx.send(update).await.is_err() {
                            break;
                        }
                    }
                }
            })
        };

        Self {
            receiver: rx,
            description,
            errors,
            wake,
            tasks: vec![topology_task, sensor_task],
        }
    }
}

fn record_error(errors: &Mutex<FetchErrors>, update: impl FnOnce(&mut FetchErrors)) {
    if let Ok(mut guard) = errors.lock() {
        update(&mut guard);
    }
}

impl DataSource for HttpSource {
    fn poll(&mut self) -> Option<TwinSnapshot> {
        // Merge everything queued so one frame sees both halves
        let mut merged: Option<TwinSnapshot> = None;
        while let Ok(update) = self.receiver.try_recv() {
            let entry = merged.get_or_insert_with(TwinSnapshot::default);
            if update.topology.is_some() {
                entry.topology = update.topology;
            }
            if update.sensors.is_some() {
                entry.sensors = update.sensors;
            }
        }
        merged
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn error(&self) -> Option<String> {
        self.errors.lock().ok().and_then(|e| e.summary())
    }

    fn refresh(&mut self) {
        // Only wakes tasks idle between ticks; one mid-fetch is about to deliver anyway
        self.wake.notify_waiters();
    }
}

impl Drop for HttpSource {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal backend answering both read endpoints forever.
    async fn fake_backend() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).to_string();
                    let body = if request.starts_with("GET /network/topology") {
                        r#"{"nodes":[{"id":"n1","name":"R1","type":"reservoir","x":1.0,"y":2.0}],"edges":[]}"#
                    } else {
                        r#"{"sensors":[{"asset_id":"e1","asset_type":"edge","type":"pressure","value":63.0,"unit":"psi"}],"count":1}"#
                    };
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_http_source_merges_both_endpoints() {
        let base = fake_backend().await;
        let client = ApiClient::new(&base).unwrap();
        let mut source = HttpSource::spawn(client, PollIntervals::default(), &Handle::current());

        let mut merged = TwinSnapshot::default();
        for _ in 0..100 {
            if let Some(update) = source.poll() {
                if update.topology.is_some() {
                    merged.topology = update.topology;
                }
                if update.sensors.is_some() {
                    merged.sensors = update.sensors;
                }
            }
            if merged.topology.is_some() && merged.sensors.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(merged.topology.unwrap().nodes[0].kind, "reservoir");
        assert_eq!(merged.sensors.unwrap()[0].value, Some(63.0));
        assert!(source.error().is_none());
        assert!(source.description().starts_with("api: http://127.0.0.1:"));
    }

    #[tokio::test]
    async fn test_http_source_records_errors() {
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        let mut source = HttpSource::spawn(client, PollIntervals::default(), &Handle::current());

        let mut error = None;
        for _ in 0..100 {
            assert!(source.poll().is_none());
            error = source.error();
            if error.as_deref().is_some_and(|e| e.contains("sensors")) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert!(error.is_some());
    }

    #[tokio::test]
    async fn test_zero_intervals_still_poll() {
        let base = fake_backend().await;
        let client = ApiClient::new(&base).unwrap();
        let zero = PollIntervals {
            topology: Duration::ZERO,
            sensors: Duration::ZERO,
        };
        let mut source = HttpSource::spawn(client, zero, &Handle::current());

        let mut received = false;
        for _ in 0..100 {
            if source.poll().is_some() {
                received = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(received);
        assert!(source.tasks.iter().all(|t| !t.is_finished()));
    }

    #[test]
    fn test_intervals_clamped() {
        let clamped = PollIntervals {
            topology: Duration::ZERO,
            sensors: Duration::from_secs(5),
        }
        .clamped();
        assert_eq!(clamped.topology, MIN_POLL_INTERVAL);
        assert_eq!(clamped.sensors, Duration::from_secs(5));
    }

    #[test]
    fn test_error_summary() {
        let mut errors = FetchErrors::default();
        assert_eq!(errors.summary(), None);
        errors.sensors = Some("Request timed out".into());
        assert_eq!(errors.summary().as_deref(), Some("sensors: Request timed out"));
        errors.topology = Some("API returned status 502".into());
        assert_eq!(
            errors.summary().as_deref(),
            Some("topology: API returned status 502; sensors: Request timed out")
        );
    }
}
