//! Driver for the live admin connection.
//!
//! A single [`HubConnection`] task owns the [`AdminSession`]: it applies inbound frames in
//! arrival order and serves [`HubHandle`] requests over a channel, so no other code ever
//! touches the registry directly. When the socket drops the session is discarded, and a
//! fresh one is created on the next successful connect.

use crate::ws::{self, session_cookie, WsMessage, WsWriter};
use anyhow::Result;
use mcdash_net::{
    AdminSession, CommandId, OutboundMessage, PlayerRecord, SessionEvent, SessionLimits, World,
};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

const REQUEST_QUEUE: usize = 64;

/// Connection settings.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// WebSocket URL of the hub.
    pub url: String,
    /// Session key sent as the `key` cookie.
    pub session_key: Option<String>,
    /// Bounds applied to every new session.
    pub limits: SessionLimits,
    /// Pause between a disconnect and the next connection attempt.
    pub reconnect_delay: Duration,
    /// How often stale pending commands are swept.
    pub expire_interval: Duration,
}

impl HubConfig {
    /// Settings for `url` with default limits.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            session_key: None,
            limits: SessionLimits::default(),
            reconnect_delay: Duration::from_secs(3),
            expire_interval: Duration::from_secs(5),
        }
    }
}

/// Notifications emitted by the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum HubUpdate {
    /// Socket open; the session starts empty.
    Connected,
    /// Socket gone; the session was discarded.
    Disconnected {
        /// What ended the connection.
        reason: String,
    },
    /// A frame changed (or was accepted by) the session.
    Session(SessionEvent),
    /// A command frame was written to the socket.
    CommandSent {
        /// Allocated id.
        command_id: CommandId,
        /// Command text.
        command: String,
    },
    /// Pending commands dropped after their TTL.
    CommandsExpired(Vec<CommandId>),
}

/// Read-only copy of the registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HubSnapshot {
    /// Whether a socket is currently open.
    pub connected: bool,
    /// Known worlds, by id.
    pub worlds: Vec<World>,
    /// Known players, by id.
    pub players: Vec<PlayerRecord>,
    /// Pending commands, oldest first.
    pub pending: Vec<(CommandId, String)>,
    /// Frames dropped as malformed in this session.
    pub rejected_frames: u64,
}

/// Failures surfaced to [`HubHandle`] callers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HubError {
    /// The driver task has stopped.
    #[error("hub connection closed")]
    Closed,
    /// No socket is open right now.
    #[error("not connected to the hub")]
    NotConnected,
    /// Writing the frame failed; the command was withdrawn.
    #[error("failed to send command: {0}")]
    Send(String),
}

enum HubRequest {
    Issue {
        command: String,
        respond_to: oneshot::Sender<Result<CommandId, HubError>>,
    },
    Cancel {
        command_id: CommandId,
        respond_to: oneshot::Sender<bool>,
    },
    Snapshot {
        respond_to: oneshot::Sender<HubSnapshot>,
    },
}

/// Cloneable front for a running [`HubConnection`]. The driver stops once every handle is
/// dropped.
#[derive(Debug, Clone)]
pub struct HubHandle {
    requests: mpsc::Sender<HubRequest>,
}

impl std::fmt::Debug for HubRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HubRequest::Issue { command, .. } => write!(f, "Issue({command:?})"),
            HubRequest::Cancel { command_id, .. } => write!(f, "Cancel({command_id})"),
            HubRequest::Snapshot { .. } => write!(f, "Snapshot"),
        }
    }
}

impl HubHandle {
    /// Issue a console command; resolves to its correlation id once the frame is written.
    pub async fn issue(&self, command: impl Into<String>) -> Result<CommandId, HubError> {
        let (respond_to, response) = oneshot::channel();
        self.send(HubRequest::Issue {
            command: command.into(),
            respond_to,
        })
        .await?;
        response.await.map_err(|_| HubError::Closed)?
    }

    /// Stop waiting for a command's result.
    pub async fn cancel(&self, command_id: CommandId) -> Result<bool, HubError> {
        let (respond_to, response) = oneshot::channel();
        self.send(HubRequest::Cancel {
            command_id,
            respond_to,
        })
        .await?;
        response.await.map_err(|_| HubError::Closed)
    }

    /// Copy of the current registry.
    pub async fn snapshot(&self) -> Result<HubSnapshot, HubError> {
        let (respond_to, response) = oneshot::channel();
        self.send(HubRequest::Snapshot { respond_to }).await?;
        response.await.map_err(|_| HubError::Closed)
    }

    async fn send(&self, request: HubRequest) -> Result<(), HubError> {
        self.requests
            .send(request)
            .await
            .map_err(|_| HubError::Closed)
    }
}

enum Ended {
    Disconnected(String),
    HandlesDropped,
}

/// Owns the socket and the session for one hub endpoint.
#[derive(Debug)]
pub struct HubConnection {
    config: HubConfig,
    session: AdminSession,
    connected: bool,
    requests: mpsc::Receiver<HubRequest>,
    updates: mpsc::UnboundedSender<HubUpdate>,
}

impl HubConnection {
    /// Create the driver, its handle and the update stream. Nothing connects until
    /// [`HubConnection::run`] is polled.
    pub fn new(config: HubConfig) -> (Self, HubHandle, mpsc::UnboundedReceiver<HubUpdate>) {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE);
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let connection = Self {
            session: AdminSession::new(config.limits),
            config,
            connected: false,
            requests: request_rx,
            updates: update_tx,
        };
        (
            connection,
            HubHandle {
                requests: request_tx,
            },
            update_rx,
        )
    }

    /// Connect, serve, and reconnect after `reconnect_delay` until every handle is dropped.
    pub async fn run(mut self) {
        loop {
            let reason = match self.serve().await {
                Ok(Ended::HandlesDropped) => break,
                Ok(Ended::Disconnected(reason)) => reason,
                Err(err) => format!("{err:#}"),
            };
            if self.connected {
                info!(reason = %reason, "Hub disconnected");
            } else {
                warn!(reason = %reason, "Hub connection failed");
            }
            self.connected = false;
            self.session.reset();
            self.emit(HubUpdate::Disconnected { reason });

            if !self.wait_reconnect().await {
                break;
            }
        }
        info!("Hub handles dropped, connection stopping");
    }

    async fn serve(&mut self) -> Result<Ended> {
        let cookie = self.config.session_key.as_deref().map(session_cookie);
        let headers: Vec<(&str, &str)> = cookie
            .as_deref()
            .map(|value| vec![("Cookie", value)])
            .unwrap_or_default();

        let url = self.config.url.clone();
        let (mut writer, mut reader) = tokio::select! {
            connected = ws::connect(&url, &headers) => connected?,
            ended = self.idle_until_closed() => return Ok(ended),
        };

        self.session.reset();
        self.connected = true;
        info!(url = %url, "Hub connected");
        self.emit(HubUpdate::Connected);

        let mut sweep = tokio::time::interval(self.config.expire_interval);
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                message = reader.recv() => match message {
                    Some(Ok(WsMessage::Text(text))) => self.on_frame(&text),
                    Some(Ok(WsMessage::Ping(data))) => writer.send_pong(data).await?,
                    Some(Ok(WsMessage::Binary(data))) => {
                        debug!(len = data.len(), "Ignoring binary hub frame");
                    }
                    Some(Ok(WsMessage::Close { code, reason })) => {
                        return Ok(Ended::Disconnected(format!("closed by server ({code}) {reason}")));
                    }
                    Some(Err(err)) => return Err(err),
                    None => return Ok(Ended::Disconnected("stream ended".to_string())),
                },
                request = self.requests.recv() => match request {
                    Some(request) => self.on_request(request, Some(&mut writer)).await?,
                    None => {
                        if let Err(err) = writer.close().await {
                            debug!("Hub close failed: {:#}", err);
                        }
                        return Ok(Ended::HandlesDropped);
                    }
                },
                _ = sweep.tick() => self.sweep(),
            }
        }
    }

    /// Answer requests while no socket is open. Returns once the handles are dropped.
    async fn idle_until_closed(&mut self) -> Ended {
        while let Some(request) = self.requests.recv().await {
            // Without a writer nothing here can fail.
            let _ = self.on_request(request, None).await;
        }
        Ended::HandlesDropped
    }

    /// Sleep out the reconnect delay; `false` when the handles went away meanwhile.
    async fn wait_reconnect(&mut self) -> bool {
        let delay = tokio::time::sleep(self.config.reconnect_delay);
        tokio::pin!(delay);
        tokio::select! {
            _ = &mut delay => true,
            _ = self.idle_until_closed() => false,
        }
    }

    fn on_frame(&mut self, text: &str) {
        // Malformed frames are logged and counted by the session itself.
        if let Ok(event) = self.session.apply_frame(text) {
            self.emit(HubUpdate::Session(event));
        }
    }

    async fn on_request(
        &mut self,
        request: HubRequest,
        writer: Option<&mut WsWriter>,
    ) -> Result<()> {
        match request {
            HubRequest::Issue {
                command,
                respond_to,
            } => {
                let Some(writer) = writer else {
                    let _ = respond_to.send(Err(HubError::NotConnected));
                    return Ok(());
                };
                let frame = self.session.issue_command(command.clone());
                let OutboundMessage::Command { command_id, .. } = frame;
                if let Err(err) = writer.send_text(&frame.encode()).await {
                    self.session.cancel_command(command_id);
                    let _ = respond_to.send(Err(HubError::Send(format!("{err:#}"))));
                    return Err(err);
                }
                debug!(%command_id, command = %command, "Command sent");
                self.emit(HubUpdate::CommandSent {
                    command_id,
                    command,
                });
                let _ = respond_to.send(Ok(command_id));
            }
            HubRequest::Cancel {
                command_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.session.cancel_command(command_id));
            }
            HubRequest::Snapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
        }
        Ok(())
    }

    fn sweep(&mut self) {
        let expired = self.session.expire_commands(Instant::now());
        if !expired.is_empty() {
            self.emit(HubUpdate::CommandsExpired(
                expired.into_iter().map(|(id, _)| id).collect(),
            ));
        }
    }

    fn snapshot(&self) -> HubSnapshot {
        HubSnapshot {
            connected: self.connected,
            worlds: self.session.worlds().values().cloned().collect(),
            players: self.session.players().values().cloned().collect(),
            pending: self
                .session
                .commands()
                .pending()
                .into_iter()
                .map(|(id, command)| (id, command.text.clone()))
                .collect(),
            rejected_frames: self.session.rejected_frames(),
        }
    }

    fn emit(&self, update: HubUpdate) {
        // Nobody listening is fine; the registry is still served through the handle.
        let _ = self.updates.send(update);
    }
}
