//! JSON frames exchanged over the live admin (hub) connection.
//!
//! Every frame is a single JSON object whose `type` field names the message kind.
//! Decoding walks the `serde_json::Value` by hand so that a missing field can be reported
//! precisely and unknown kinds can be passed through untouched.

use crate::correlator::CommandId;
use serde_json::{Map, Value};
use thiserror::Error;

/// Name of the discriminator field.
pub const KIND_FIELD: &str = "type";

/// Wire value meaning "no parent world".
pub const NO_PARENT: i64 = -1;

/// A world (level) known to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct World {
    /// Server-assigned id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Dimension id.
    pub dimension: i64,
    /// Parent world, for nested dimensions.
    pub parent: Option<i64>,
}

/// Player entry mirrored from the hub.
///
/// Only `id` is required. Well-known optional fields get typed accessors; everything else
/// the server sends is preserved in `extra` so newer servers do not break decoding.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerRecord {
    /// Server-assigned id.
    pub id: i64,
    /// Account name.
    pub name: Option<String>,
    /// Display name, may contain markup.
    pub display: Option<String>,
    /// Id of the world the player is in.
    pub world: Option<i64>,
    /// Fields this client does not interpret.
    pub extra: Map<String, Value>,
}

impl PlayerRecord {
    /// Best name to show: display name, then account name, then the id.
    pub fn label(&self) -> String {
        self.display
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| format!("#{}", self.id))
    }
}

/// Decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    /// Insert or replace a world.
    AddWorld(World),
    /// Forget a world.
    RemoveWorld {
        /// Id of the world.
        id: i64,
    },
    /// Insert or replace a player.
    AddPlayer(PlayerRecord),
    /// Forget a player.
    RemovePlayer {
        /// Id of the player.
        id: i64,
    },
    /// One log line.
    Log {
        /// Line text, may contain markup.
        message: String,
        /// Command that produced the line, when the server knows it.
        command_id: Option<CommandId>,
    },
    /// Final outcome of an issued command.
    CommandResult {
        /// Id sent with the command.
        command_id: CommandId,
        /// Whether the command succeeded.
        success: bool,
        /// Optional output text.
        output: Option<String>,
    },
    /// Settings sync; accepted but not interpreted.
    Settings(Value),
    /// A kind this client does not know.
    Unknown {
        /// The unrecognized discriminator.
        kind: String,
    },
}

impl HubMessage {
    /// Discriminator string of this message.
    pub fn kind(&self) -> &str {
        match self {
            HubMessage::AddWorld(_) => "add_world",
            HubMessage::RemoveWorld { .. } => "remove_world",
            HubMessage::AddPlayer(_) => "add_player",
            HubMessage::RemovePlayer { .. } => "remove_player",
            HubMessage::Log { .. } => "log",
            HubMessage::CommandResult { .. } => "command_result",
            HubMessage::Settings(_) => "settings",
            HubMessage::Unknown { kind } => kind,
        }
    }
}

/// Reasons an inbound frame was rejected.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The frame is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The frame is valid JSON but not an object.
    #[error("frame must be a JSON object")]
    NotAnObject,
    /// The discriminator is absent or not a string.
    #[error("missing or invalid string field `type`")]
    MissingKind,
    /// A known kind lacks a required field, or the field has the wrong type.
    #[error("{kind}: missing or invalid {expected} field `{field}`")]
    InvalidField {
        /// Message kind being decoded.
        kind: &'static str,
        /// Offending field.
        field: &'static str,
        /// Expected JSON type.
        expected: &'static str,
    },
}

fn invalid(kind: &'static str, field: &'static str, expected: &'static str) -> FrameError {
    FrameError::InvalidField {
        kind,
        field,
        expected,
    }
}

fn required_i64(
    obj: &Map<String, Value>,
    kind: &'static str,
    field: &'static str,
) -> Result<i64, FrameError> {
    obj.get(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| invalid(kind, field, "integer"))
}

fn required_str(
    obj: &Map<String, Value>,
    kind: &'static str,
    field: &'static str,
) -> Result<String, FrameError> {
    obj.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| invalid(kind, field, "string"))
}

fn optional_i64(
    obj: &Map<String, Value>,
    kind: &'static str,
    field: &'static str,
) -> Result<Option<i64>, FrameError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| invalid(kind, field, "integer")),
    }
}

fn optional_str(
    obj: &Map<String, Value>,
    kind: &'static str,
    field: &'static str,
) -> Result<Option<String>, FrameError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| invalid(kind, field, "string")),
    }
}

fn command_id(
    obj: &Map<String, Value>,
    kind: &'static str,
) -> Result<Option<CommandId>, FrameError> {
    match obj.get("command_id") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|id| Some(CommandId(id)))
            .ok_or_else(|| invalid(kind, "command_id", "unsigned integer")),
    }
}

/// Decode one inbound frame.
pub fn decode_frame(text: &str) -> Result<HubMessage, FrameError> {
    let value: Value = serde_json::from_str(text)?;
    decode_value(value)
}

/// Decode an already-parsed frame.
pub fn decode_value(value: Value) -> Result<HubMessage, FrameError> {
    let Value::Object(mut obj) = value else {
        return Err(FrameError::NotAnObject);
    };

    let kind = obj
        .get(KIND_FIELD)
        .and_then(Value::as_str)
        .ok_or(FrameError::MissingKind)?
        .to_string();

    match kind.as_str() {
        "add_world" => {
            const KIND: &str = "add_world";
            let parent = optional_i64(&obj, KIND, "parent")?.filter(|id| *id != NO_PARENT);
            Ok(HubMessage::AddWorld(World {
                id: required_i64(&obj, KIND, "id")?,
                name: required_str(&obj, KIND, "name")?,
                dimension: required_i64(&obj, KIND, "dimension")?,
                parent,
            }))
        }
        "remove_world" => Ok(HubMessage::RemoveWorld {
            id: required_i64(&obj, "remove_world", "id")?,
        }),
        "add_player" => {
            const KIND: &str = "add_player";
            let id = required_i64(&obj, KIND, "id")?;
            let name = optional_str(&obj, KIND, "name")?;
            let display = optional_str(&obj, KIND, "display")?;
            let world = optional_i64(&obj, KIND, "world")?;
            for known in [KIND_FIELD, "id", "name", "display", "world"] {
                obj.remove(known);
            }
            Ok(HubMessage::AddPlayer(PlayerRecord {
                id,
                name,
                display,
                world,
                extra: obj,
            }))
        }
        "remove_player" => Ok(HubMessage::RemovePlayer {
            id: required_i64(&obj, "remove_player", "id")?,
        }),
        "log" => Ok(HubMessage::Log {
            message: required_str(&obj, "log", "message")?,
            command_id: command_id(&obj, "log")?,
        }),
        "command_result" => {
            const KIND: &str = "command_result";
            let command_id = command_id(&obj, KIND)?.ok_or_else(|| {
                invalid(KIND, "command_id", "unsigned integer")
            })?;
            let success = match obj.get("success") {
                None | Some(Value::Null) => true,
                Some(v) => v
                    .as_bool()
                    .ok_or_else(|| invalid(KIND, "success", "boolean"))?,
            };
            Ok(HubMessage::CommandResult {
                command_id,
                success,
                output: optional_str(&obj, KIND, "output")?,
            })
        }
        "settings" => {
            obj.remove(KIND_FIELD);
            Ok(HubMessage::Settings(Value::Object(obj)))
        }
        _ => Ok(HubMessage::Unknown { kind }),
    }
}

/// Frames sent from this client to the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Execute a console command on the server.
    Command {
        /// Command line as typed.
        command: String,
        /// Correlation id allocated by the session.
        command_id: CommandId,
    },
}

impl OutboundMessage {
    /// Build the JSON object for this frame.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        match self {
            OutboundMessage::Command {
                command,
                command_id,
            } => {
                obj.insert(KIND_FIELD.to_string(), Value::String("command".to_string()));
                obj.insert("command".to_string(), Value::String(command.clone()));
                obj.insert("command_id".to_string(), Value::Number(command_id.0.into()));
            }
        }
        Value::Object(obj)
    }

    /// Serialize to the frame text sent on the wire.
    pub fn encode(&self) -> String {
        self.to_value().to_string()
    }
}
