//! JSON wire protocol shared with game clients.
//!
//! Every frame is an [`Envelope`] `{type, payload, seq, time}`. Client frames
//! are parsed into a typed [`ClientMessage`]; server frames are built from a
//! [`ServerMessage`].

use std::fmt;

use loil_core::{CharacterId, LocationId, ObjectId, PlayerId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current wall-clock time in unix milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

fn no_character(id: &CharacterId) -> bool {
    id.is_none()
}

/// The outer frame of every message in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type tag.
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific body; absent for bare messages.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
    /// Per-connection sequence number; 0 on broadcasts.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub seq: i64,
    /// Send time in unix milliseconds.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub time: i64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Machine-readable error codes sent in `error` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The frame is not valid JSON or not an envelope.
    InvalidFormat,
    /// The `type` tag is not a known message.
    UnknownType,
    /// The payload does not match the message type.
    InvalidRequest,
    /// Required payload fields are missing or zero.
    MissingFields,
    /// `direction` is outside -1..=1.
    InvalidDirection,
    /// `vertical` is outside -1..=1.
    InvalidVertical,
    /// The connection has not joined yet.
    NotJoined,
    /// The join was refused.
    JoinFailed,
    /// The move command failed.
    MoveFailed,
    /// The stop command failed.
    StopFailed,
    /// The interaction could not be run.
    InteractFailed,
    /// The requested location does not exist.
    LocationNotFound,
    /// The player controls no character.
    NoCharacter,
    /// The engine queue is full.
    ServerBusy,
    /// The server is stopping.
    ShuttingDown,
}

impl ErrorCode {
    /// The snake_case wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidFormat => "invalid_format",
            Self::UnknownType => "unknown_type",
            Self::InvalidRequest => "invalid_request",
            Self::MissingFields => "missing_fields",
            Self::InvalidDirection => "invalid_direction",
            Self::InvalidVertical => "invalid_vertical",
            Self::NotJoined => "not_joined",
            Self::JoinFailed => "join_failed",
            Self::MoveFailed => "move_failed",
            Self::StopFailed => "stop_failed",
            Self::InteractFailed => "interact_failed",
            Self::LocationNotFound => "location_not_found",
            Self::NoCharacter => "no_character",
            Self::ServerBusy => "server_busy",
            Self::ShuttingDown => "shutting_down",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A client frame that could not be turned into a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ProtocolError {
    /// Error class.
    pub code: ErrorCode,
    /// Details for humans.
    pub message: String,
}

impl ProtocolError {
    /// An error of class `code`.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Client -> server
// ---------------------------------------------------------------------------

/// Payload of a `join` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// The joining player.
    pub player_id: PlayerId,
    /// Character to take over; 0 lets the server pick.
    #[serde(default, skip_serializing_if = "no_character")]
    pub character_id: CharacterId,
    /// Location the client wants to see.
    pub location_id: LocationId,
}

/// Payload of a `move` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    /// -1 left, 0 stop, 1 right.
    pub direction: i32,
    /// -1 down, 0 none, 1 up.
    pub vertical: i32,
}

/// Payload of an `interact` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractRequest {
    /// Target object.
    pub object_id: ObjectId,
    /// Index into the object type's interaction list.
    pub interaction_idx: usize,
}

/// A validated client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Take control of a character and subscribe to a location.
    Join {
        /// The joining player.
        player: PlayerId,
        /// Requested character, if any.
        character: Option<CharacterId>,
        /// Location to subscribe to.
        location: LocationId,
    },
    /// Set the heading of the player's character.
    Move {
        /// -1 left, 0 stop, 1 right.
        direction: i8,
        /// -1 down, 0 none, 1 up.
        vertical: i8,
    },
    /// Stop the player's character.
    Stop,
    /// Interact with an object.
    Interact {
        /// Target object.
        object: ObjectId,
        /// Interaction index.
        index: usize,
    },
    /// Answer to a server ping.
    Pong,
}

fn payload<T: serde::de::DeserializeOwned>(
    envelope: Envelope,
    what: &str,
) -> Result<T, ProtocolError> {
    serde_json::from_value(envelope.payload).map_err(|e| {
        ProtocolError::new(
            ErrorCode::InvalidRequest,
            format!("invalid {what} request: {e}"),
        )
    })
}

fn axis(value: i32, code: ErrorCode, name: &str) -> Result<i8, ProtocolError> {
    match value {
        -1..=1 => Ok(value as i8),
        _ => Err(ProtocolError::new(
            code,
            format!("{name} must be -1, 0 or 1, got {value}"),
        )),
    }
}

/// Parse and validate one client text frame.
pub fn parse_client_message(text: &str) -> Result<ClientMessage, ProtocolError> {
    let envelope: Envelope = serde_json::from_str(text)
        .map_err(|e| ProtocolError::new(ErrorCode::InvalidFormat, format!("invalid JSON: {e}")))?;

    match envelope.kind.as_str() {
        "join" => {
            let req: JoinRequest = payload(envelope, "join")?;
            if req.player_id.is_none() || req.location_id.is_none() {
                return Err(ProtocolError::new(
                    ErrorCode::MissingFields,
                    "player_id and location_id are required",
                ));
            }
            Ok(ClientMessage::Join {
                player: req.player_id,
                character: (!req.character_id.is_none()).then_some(req.character_id),
                location: req.location_id,
            })
        }
        "move" => {
            let req: MoveRequest = payload(envelope, "move")?;
            Ok(ClientMessage::Move {
                direction: axis(req.direction, ErrorCode::InvalidDirection, "direction")?,
                vertical: axis(req.vertical, ErrorCode::InvalidVertical, "vertical")?,
            })
        }
        "stop" => Ok(ClientMessage::Stop),
        "interact" => {
            let req: InteractRequest = payload(envelope, "interact")?;
            Ok(ClientMessage::Interact {
                object: req.object_id,
                index: req.interaction_idx,
            })
        }
        "pong" => Ok(ClientMessage::Pong),
        other => Err(ProtocolError::new(
            ErrorCode::UnknownType,
            format!("unknown message type: {other}"),
        )),
    }
}

// ---------------------------------------------------------------------------
// Server -> client
// ---------------------------------------------------------------------------

/// Published state of a character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterState {
    /// Character ID.
    pub id: CharacterId,
    /// Display name.
    pub name: String,
    /// Current location.
    pub location_id: LocationId,
    /// Fractional position.
    pub x: f64,
    /// Horizontal heading.
    pub direction: i8,
    /// Vertical intent.
    pub vertical: i8,
    /// Tiles per second.
    pub speed: f64,
    /// Controlling player, 0 for NPCs.
    pub controlled: PlayerId,
    /// Capture time in unix milliseconds.
    pub last_update: i64,
}

/// Published state of a creature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureState {
    /// Creature ID.
    pub id: loil_core::CreatureId,
    /// Creature type code.
    pub type_id: i32,
    /// Display name.
    pub name: String,
    /// Current location.
    pub location_id: LocationId,
    /// Fractional position.
    pub x: f64,
    /// Current health.
    pub health: i32,
    /// Maximum health.
    pub max_health: i32,
    /// Hunger rounded to the nearest whole, 0..=100.
    #[serde(default, skip_serializing_if = "is_zero_i32")]
    pub hunger: i32,
    /// Active behavior name, empty when idle.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub behavior: String,
    /// Capture time in unix milliseconds.
    pub last_update: i64,
}

fn is_zero_i32(n: &i32) -> bool {
    *n == 0
}

/// Published state of an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectState {
    /// Object ID.
    pub id: ObjectId,
    /// Object type code.
    pub type_id: i32,
    /// Owning location.
    pub location_id: LocationId,
    /// Tile position.
    pub x: i32,
    /// Uses left.
    pub durability: i32,
    /// Durability of a fresh object of this type.
    pub max_durability: i32,
    /// Growth stage, 0..=100.
    #[serde(default, skip_serializing_if = "is_zero_i32")]
    pub growth_stage: i32,
    /// Capture time in unix milliseconds.
    pub last_update: i64,
}

/// Tile layers of one location. The foreground is occupancy-encoded:
/// characters and objects as their ID, creatures as their negated ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationState {
    /// Location ID.
    pub id: LocationId,
    /// Display name.
    pub name: String,
    /// Number of tiles.
    pub width: usize,
    /// Occupancy codes by tile.
    pub foreground: Vec<i32>,
    /// Road codes by tile.
    pub road: Vec<i32>,
    /// Ground codes by tile.
    pub ground: Vec<i32>,
    /// Background codes by tile.
    pub background: Vec<i32>,
    /// Capture time in unix milliseconds.
    pub last_update: i64,
}

/// Full view of a location, sent after a join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    /// The player the view is for.
    pub player_id: PlayerId,
    /// Layers of the joined location.
    pub location: LocationState,
    /// Characters on the lane.
    pub characters: Vec<CharacterState>,
    /// Creatures on the lane.
    pub creatures: Vec<CreatureState>,
    /// Objects on the lane.
    pub objects: Vec<ObjectState>,
    /// Send time in unix milliseconds.
    pub server_time: i64,
}

/// Entity states of one location, broadcast to its subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    /// The location.
    pub location_id: LocationId,
    /// Characters on the lane.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub characters: Vec<CharacterState>,
    /// Creatures on the lane.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub creatures: Vec<CreatureState>,
    /// Objects on the lane.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<ObjectState>,
    /// Send time in unix milliseconds.
    pub server_time: i64,
}

/// State of the player's own character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterUpdate {
    /// The character.
    pub character_id: CharacterId,
    /// Its state; absent once it is gone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<CharacterState>,
    /// Send time in unix milliseconds.
    pub server_time: i64,
}

/// An item stack in an interaction result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Item type ID.
    pub item_id: i32,
    /// How many were gained.
    pub count: u32,
    /// Item type name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

/// Result of an `interact` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionResult {
    /// Whether the interaction took place.
    pub success: bool,
    /// The target object.
    pub object_id: ObjectId,
    /// Summary for humans.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Items gained.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<InventoryItem>,
    /// Send time in unix milliseconds.
    pub server_time: i64,
}

/// Payload of an `error` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Error class.
    pub code: ErrorCode,
    /// Details for humans.
    pub message: String,
}

/// A frame the server sends.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Initial state after a join.
    WorldState(WorldState),
    /// Periodic state of a subscribed location.
    LocationUpdate(LocationUpdate),
    /// The player's own character.
    CharacterUpdate(CharacterUpdate),
    /// Answer to an `interact` request.
    InteractionResult(InteractionResult),
    /// A request failed.
    Error(ErrorMessage),
    /// Keepalive; clients answer with `pong`.
    Ping,
}

impl ServerMessage {
    /// An `error` frame.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error(ErrorMessage {
            code,
            message: message.into(),
        })
    }

    /// The `type` tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::WorldState(_) => "world_state",
            Self::LocationUpdate(_) => "location_update",
            Self::CharacterUpdate(_) => "character_update",
            Self::InteractionResult(_) => "interaction_result",
            Self::Error(_) => "error",
            Self::Ping => "ping",
        }
    }

    /// Wrap into an envelope stamped with `seq` and the current time.
    pub fn into_envelope(self, seq: i64) -> serde_json::Result<Envelope> {
        let kind = self.kind().to_string();
        let payload = match self {
            Self::WorldState(p) => serde_json::to_value(p)?,
            Self::LocationUpdate(p) => serde_json::to_value(p)?,
            Self::CharacterUpdate(p) => serde_json::to_value(p)?,
            Self::InteractionResult(p) => serde_json::to_value(p)?,
            Self::Error(p) => serde_json::to_value(p)?,
            Self::Ping => Value::Null,
        };
        Ok(Envelope {
            kind,
            payload,
            seq,
            time: now_ms(),
        })
    }

    /// Serialize to the JSON text of a full envelope.
    pub fn to_json(self, seq: i64) -> serde_json::Result<String> {
        serde_json::to_string(&self.into_envelope(seq)?)
    }
}
