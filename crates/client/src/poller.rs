//! Fixed-delay status polling.

use crate::http::DashboardClient;
use anyhow::Result;
use async_trait::async_trait;
use mcdash_net::{decode_status, ServerStatus};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Anything that can produce a raw status payload.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch one payload. An empty payload means offline.
    async fn fetch(&self) -> Result<Vec<u8>>;
}

#[async_trait]
impl StatusSource for DashboardClient {
    async fn fetch(&self) -> Result<Vec<u8>> {
        self.fetch_status_bytes().await
    }
}

/// Outcome of one poll.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StatusReport {
    /// Latest snapshot.
    Online(ServerStatus),
    /// No data, transport failure, or an undecodable payload.
    #[default]
    Offline,
}

impl StatusReport {
    /// Classify a raw payload. Partial decodes count as offline.
    pub fn from_payload(bytes: &[u8]) -> Self {
        let Some(decoded) = decode_status(bytes) else {
            return StatusReport::Offline;
        };
        match decoded.into_result() {
            Ok(status) => StatusReport::Online(status),
            Err(err) => {
                warn!(%err, "Discarding malformed status payload");
                StatusReport::Offline
            }
        }
    }

    /// Classify the outcome of one request. Transport failures count as offline.
    pub fn from_fetch(result: Result<Vec<u8>>) -> Self {
        match result {
            Ok(bytes) => Self::from_payload(&bytes),
            Err(err) => {
                warn!("Status request failed: {:#}", err);
                StatusReport::Offline
            }
        }
    }

    /// Whether a valid player with `id` is in the snapshot. Always `false` when offline.
    pub fn has_player(&self, id: u32) -> bool {
        self.status().is_some_and(|status| status.contains_player(id))
    }

    /// The snapshot, when online.
    pub fn status(&self) -> Option<&ServerStatus> {
        match self {
            StatusReport::Online(status) => Some(status),
            StatusReport::Offline => None,
        }
    }

    /// Whether the server answered with a valid payload.
    pub fn is_online(&self) -> bool {
        matches!(self, StatusReport::Online(_))
    }
}

/// Polls a [`StatusSource`], one request at a time.
#[derive(Debug)]
pub struct StatusPoller<S> {
    source: S,
    interval: Duration,
    online: Option<bool>,
}

impl<S: StatusSource> StatusPoller<S> {
    /// Poll `source`, waiting `interval` after each completed request.
    pub fn new(source: S, interval: Duration) -> Self {
        Self {
            source,
            interval,
            online: None,
        }
    }

    /// Run a single request.
    pub async fn poll_once(&mut self) -> StatusReport {
        let report = StatusReport::from_fetch(self.source.fetch().await);
        let online = report.is_online();
        if self.online != Some(online) {
            if online {
                info!("Server is online");
            } else {
                info!("Server is offline");
            }
            self.online = Some(online);
        }
        report
    }

    /// Publish a report after every poll until all receivers are gone.
    pub async fn run(mut self, tx: watch::Sender<StatusReport>) {
        loop {
            let report = self.poll_once().await;
            if tx.send(report).is_err() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = tx.closed() => break,
            }
        }
        debug!("Status receivers dropped, poller stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcdash_net::{encode_status, PlayerSummary};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Scripted(Mutex<VecDeque<Result<Vec<u8>>>>);

    #[async_trait]
    impl StatusSource for Scripted {
        async fn fetch(&self) -> Result<Vec<u8>> {
            self.0
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn sample() -> ServerStatus {
        ServerStatus {
            online: 1,
            max: 20,
            players: vec![PlayerSummary {
                id: 4,
                name: "steve".into(),
                skin: None,
            }],
        }
    }

    #[tokio::test]
    async fn reports_follow_the_source() {
        let payload = encode_status(&sample()).unwrap();
        let source = Scripted(Mutex::new(VecDeque::from(vec![
            Ok(payload.clone()),
            Err(anyhow::anyhow!("connection refused")),
            Ok(Vec::new()),
            Ok(payload[..payload.len() - 1].to_vec()),
            Ok(payload),
        ])));
        let mut poller = StatusPoller::new(source, Duration::from_millis(1));

        assert_eq!(poller.poll_once().await, StatusReport::Online(sample()));
        assert_eq!(poller.poll_once().await, StatusReport::Offline);
        assert_eq!(poller.poll_once().await, StatusReport::Offline);
        assert_eq!(poller.poll_once().await, StatusReport::Offline);
        assert!(poller.poll_once().await.is_online());
    }

    #[test]
    fn truncated_payload_has_no_players() {
        let mut status = sample();
        status.online = 2;
        status.players.push(PlayerSummary {
            id: 5,
            name: "alex".into(),
            skin: None,
        });
        let payload = encode_status(&status).unwrap();
        let truncated = &payload[..payload.len() - 2];

        let decoded = mcdash_net::decode_status(truncated).unwrap();
        assert!(decoded.status.contains_player(4));
        let report = StatusReport::from_payload(truncated);
        assert_eq!(report, StatusReport::Offline);
        assert!(!report.has_player(4));

        let report = StatusReport::from_fetch(Ok(payload));
        assert!(report.has_player(4));
        assert!(report.has_player(5));
        assert!(!StatusReport::from_fetch(Err(anyhow::anyhow!("timed out"))).has_player(4));
    }

    #[tokio::test]
    async fn run_publishes_and_stops_without_receivers() {
        let payload = encode_status(&sample()).unwrap();
        let source = Scripted(Mutex::new(VecDeque::from(vec![Ok(payload)])));
        let poller = StatusPoller::new(source, Duration::from_secs(60));
        let (tx, mut rx) = watch::channel(StatusReport::Offline);
        let task = tokio::spawn(poller.run(tx));

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().status(), Some(&sample()));
        drop(rx);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("poller should stop")
            .unwrap();
    }
}
