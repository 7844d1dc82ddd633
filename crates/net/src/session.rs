//! Client-side mirror of the server registry, driven by hub frames.
//!
//! [`AdminSession`] is owned by whoever reads the hub connection. Every mutation goes
//! through [`AdminSession::apply`] (or [`AdminSession::apply_frame`] for raw text) and
//! [`AdminSession::issue_command`], in frame arrival order.

use crate::correlator::{CommandCorrelator, CommandId, PendingCommand};
use crate::hub::{decode_frame, FrameError, HubMessage, OutboundMessage, PlayerRecord, World};
use crate::logs::{LogBuffer, LogLine};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Resource bounds for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Log lines retained.
    pub log_capacity: usize,
    /// Commands awaiting a result.
    pub pending_capacity: NonZeroUsize,
    /// Age after which a pending command is dropped; `None` keeps it until evicted.
    pub pending_ttl: Option<Duration>,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            log_capacity: 1000,
            pending_capacity: NonZeroUsize::new(256).unwrap_or(NonZeroUsize::MIN),
            pending_ttl: Some(Duration::from_secs(300)),
        }
    }
}

/// What applying one message changed.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A world was inserted; `replaced` is true when the id already existed.
    WorldAdded {
        /// The stored world.
        world: World,
        /// Whether an older entry was overwritten.
        replaced: bool,
    },
    /// A world was removed (`None` when the id was unknown).
    WorldRemoved {
        /// Requested id.
        id: i64,
        /// The removed world, if any.
        world: Option<World>,
    },
    /// A player was inserted or replaced.
    PlayerAdded {
        /// The stored record.
        player: PlayerRecord,
        /// Whether an older entry was overwritten.
        replaced: bool,
    },
    /// A player was removed.
    PlayerRemoved {
        /// Requested id.
        id: i64,
        /// The removed record, if any.
        player: Option<PlayerRecord>,
    },
    /// A log line was appended.
    LogAppended(LogLine),
    /// A command result arrived.
    CommandCompleted {
        /// Id of the command.
        command_id: CommandId,
        /// Whether it succeeded.
        success: bool,
        /// The pending entry, `None` when the id was unknown or already expired.
        command: Option<PendingCommand>,
        /// Output line appended to the log, if the result carried output.
        output: Option<LogLine>,
    },
    /// Settings frame; accepted without effect.
    SettingsIgnored,
    /// Unrecognized kind; nothing changed.
    UnknownIgnored {
        /// The unrecognized discriminator.
        kind: String,
    },
}

/// Registry state for one hub connection.
#[derive(Debug)]
pub struct AdminSession {
    worlds: BTreeMap<i64, World>,
    players: BTreeMap<i64, PlayerRecord>,
    logs: LogBuffer,
    commands: CommandCorrelator,
    limits: SessionLimits,
    rejected_frames: u64,
}

impl AdminSession {
    /// Fresh session with a randomly seeded command counter.
    pub fn new(limits: SessionLimits) -> Self {
        let commands = CommandCorrelator::new(limits.pending_capacity, limits.pending_ttl);
        Self::with_correlator(limits, commands)
    }

    /// Fresh session whose first command gets `first`.
    pub fn starting_at(limits: SessionLimits, first: CommandId) -> Self {
        let commands =
            CommandCorrelator::starting_at(first, limits.pending_capacity, limits.pending_ttl);
        Self::with_correlator(limits, commands)
    }

    fn with_correlator(limits: SessionLimits, commands: CommandCorrelator) -> Self {
        Self {
            worlds: BTreeMap::new(),
            players: BTreeMap::new(),
            logs: LogBuffer::new(limits.log_capacity),
            commands,
            limits,
            rejected_frames: 0,
        }
    }

    /// Replace this session with an empty one (new connection, new id seed).
    pub fn reset(&mut self) {
        *self = Self::new(self.limits);
    }

    /// Decode and apply one raw frame.
    ///
    /// A malformed frame is logged, counted and returned as an error; the registry is left
    /// exactly as it was.
    pub fn apply_frame(&mut self, text: &str) -> Result<SessionEvent, FrameError> {
        match decode_frame(text) {
            Ok(message) => Ok(self.apply(message)),
            Err(err) => {
                self.rejected_frames += 1;
                warn!(%err, "Dropping malformed hub frame");
                Err(err)
            }
        }
    }

    /// Apply one decoded message.
    pub fn apply(&mut self, message: HubMessage) -> SessionEvent {
        match message {
            HubMessage::AddWorld(world) => {
                let replaced = self.worlds.insert(world.id, world.clone()).is_some();
                SessionEvent::WorldAdded { world, replaced }
            }
            HubMessage::RemoveWorld { id } => SessionEvent::WorldRemoved {
                id,
                world: self.worlds.remove(&id),
            },
            HubMessage::AddPlayer(player) => {
                let replaced = self.players.insert(player.id, player.clone()).is_some();
                SessionEvent::PlayerAdded { player, replaced }
            }
            HubMessage::RemovePlayer { id } => SessionEvent::PlayerRemoved {
                id,
                player: self.players.remove(&id),
            },
            HubMessage::Log {
                message,
                command_id,
            } => {
                let command = command_id
                    .and_then(|id| self.commands.get(id))
                    .map(|pending| pending.text.clone());
                SessionEvent::LogAppended(self.logs.push(message, command_id, command))
            }
            HubMessage::CommandResult {
                command_id,
                success,
                output,
            } => {
                let command = self.commands.resolve(command_id);
                if command.is_none() {
                    debug!(%command_id, "Result for unknown command");
                }
                let output = output.map(|text| {
                    let issued = command.as_ref().map(|c| c.text.clone());
                    self.logs.push(text, Some(command_id), issued)
                });
                SessionEvent::CommandCompleted {
                    command_id,
                    success,
                    command,
                    output,
                }
            }
            HubMessage::Settings(_) => SessionEvent::SettingsIgnored,
            HubMessage::Unknown { kind } => {
                debug!(kind = %kind, "Ignoring unknown hub message");
                SessionEvent::UnknownIgnored { kind }
            }
        }
    }

    /// Allocate an id for `text`, record it as pending and build the frame to send.
    pub fn issue_command(&mut self, text: impl Into<String>) -> OutboundMessage {
        let command = text.into();
        let command_id = self.commands.issue(command.clone());
        OutboundMessage::Command {
            command,
            command_id,
        }
    }

    /// Drop pending commands older than the TTL.
    pub fn expire_commands(&mut self, now: Instant) -> Vec<(CommandId, PendingCommand)> {
        let expired = self.commands.expire(now);
        for (id, command) in &expired {
            debug!(command_id = %id, text = %command.text, "Pending command expired");
        }
        expired
    }

    /// Give up on a pending command.
    pub fn cancel_command(&mut self, id: CommandId) -> bool {
        self.commands.cancel(id)
    }

    /// Known worlds, by id.
    pub fn worlds(&self) -> &BTreeMap<i64, World> {
        &self.worlds
    }

    /// Known players, by id.
    pub fn players(&self) -> &BTreeMap<i64, PlayerRecord> {
        &self.players
    }

    /// Players currently in `world`.
    pub fn players_in(&self, world: i64) -> impl Iterator<Item = &PlayerRecord> {
        self.players
            .values()
            .filter(move |player| player.world == Some(world))
    }

    /// Retained log lines.
    pub fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    /// Correlation table.
    pub fn commands(&self) -> &CommandCorrelator {
        &self.commands
    }

    /// Frames dropped as malformed since the session started.
    pub fn rejected_frames(&self) -> u64 {
        self.rejected_frames
    }

    /// Limits this session was created with.
    pub fn limits(&self) -> SessionLimits {
        self.limits
    }
}

impl Default for AdminSession {
    fn default() -> Self {
        Self::new(SessionLimits::default())
    }
}
