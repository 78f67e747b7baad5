//! Per-connection event vocabulary
//!
//! The simulation talks to the outside world exclusively through these types:
//! `ClientCommand` arrives from the transport adapter, `Outbound` envelopes
//! leave through the outbox channel. The adapter decides how to deliver an
//! `Audience` (socket rooms, per-connection queues, ...); the engine never
//! sees a socket.

use serde::{Deserialize, Serialize};

use crate::ability::creation::CreationType;
use crate::core::types::{CreationId, EntityId, PlayerId, Rect, Segment, Size, Vec2};
use crate::entity::EntityKind;

/// Directional key flags, diagonals normalized by the movement code
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// Latest buffered input for one player (last write wins)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputState {
    /// Aim/movement vector relative to the player
    pub mouse: Vec2,
    pub keys: KeyState,
    /// When set, `mouse` drives movement instead of `keys`
    pub mouse_movement: bool,
}

/// Inbound command from one connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientCommand {
    /// Connection opened; the adapter allocates the id up front
    Connect,
    Spawn { nickname: String, hero: String },
    Input(InputState),
    AbilityUse { slot: usize },
    Upgrade { slot: usize },
    Chat { message: String },
    Disconnect,
}

/// A command addressed to the player it came from
#[derive(Debug, Clone)]
pub struct Inbound {
    pub player: PlayerId,
    pub command: ClientCommand,
}

/// Who an outbound event is for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    All,
    Player(PlayerId),
    /// Everyone currently in one area
    Area { region: String, index: usize },
    /// Everyone in one area except the named player
    AreaExcept {
        region: String,
        index: usize,
        except: PlayerId,
    },
}

/// Outbound envelope: one event, one audience
#[derive(Debug, Clone)]
pub struct Outbound {
    pub audience: Audience,
    pub event: ServerEvent,
}

/// Events streamed to clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Static geometry of the area a client is entering
    AreaData(AreaSnapshot),
    SelfId { id: PlayerId },
    PlayerUpdate(PlayerData),
    /// Batched per-area roster, sent every tick
    PlayersUpdate(Vec<PlayerData>),
    EntitiesUpdate(Vec<EntityData>),
    CreationsUpdate(Vec<CreationData>),
    /// Bundles the new area geometry with the mover's state
    AreaChanged {
        area: AreaSnapshot,
        player: PlayerData,
    },
    NewPlayer(PlayerData),
    ExistingPlayers(Vec<PlayerData>),
    PlayerJoined(PlayerData),
    PlayerLeft { id: PlayerId },
    PlayerDisconnected { id: PlayerId },
    LeaderboardUpdate(Vec<LeaderboardEntry>),
    HeroUpdate(HeroDelta),
    Chat {
        id: PlayerId,
        name: String,
        color: String,
        message: String,
    },
}

/// Area geometry for the initial per-client sync; never carries live state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaSnapshot {
    pub region_name: String,
    pub area_number: usize,
    pub position: Vec2,
    pub size: Size,
    pub background: String,
    pub border: [Vec2; 4],
    pub start_zone: Rect,
    pub finish_zone: Rect,
    pub next_area_zone: Rect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_area_zone: Option<Rect>,
    pub portals: Vec<PortalData>,
    pub death_timer: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalData {
    pub target_region: String,
    pub position: Vec2,
    pub size: Size,
    pub exit_offset_y: f32,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerData {
    pub id: PlayerId,
    pub name: String,
    pub position: Vec2,
    pub radius: f32,
    pub speed: f32,
    pub color: String,
    pub hero: u8,
    pub death_timer: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityData {
    pub id: EntityId,
    pub entity_type: EntityKind,
    pub position: Vec2,
    pub radius: f32,
    pub color: String,
    /// Mine only: true while inert
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exploded: Option<bool>,
    /// Connectus only: pairing line in progress
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionData>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionData {
    pub progress: f32,
    pub line: [Segment; 2],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationData {
    pub id: CreationId,
    pub creation_type: CreationType,
    pub position: Vec2,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: PlayerId,
    pub name: String,
    pub region_name: String,
    pub area_number: usize,
    pub color: String,
    pub score: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityData {
    pub name: String,
    pub description: String,
    pub unlocked: bool,
    pub tier: usize,
    pub cooldown: f32,
}

/// Sparse stat/ability delta for the owning client; only changed fields are
/// serialized
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xp: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xp_to_next_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_points: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_energy: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_regen: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abilities: Option<Vec<AbilityData>>,
}
