//! Transient objects spawned by ability use
//!
//! A creation lives inside exactly one area, independent of its caster, and
//! removes itself once its destroy countdown elapses. Concrete variants
//! override placement and collision behavior but share that lifecycle.

use serde::Serialize;

use crate::core::types::{CreationId, PlayerId, Rect, Size, Tick, Vec2};
use crate::entity::Entity;
use crate::protocol::CreationData;

/// Wire tag for each creation variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CreationType {
    #[serde(rename = "Ice Wall")]
    IceWall,
    #[serde(rename = "Magnetic Field")]
    MagneticField,
}

/// Variant-specific geometry and behavior data
#[derive(Debug, Clone)]
pub enum CreationKind {
    /// Directional wall hazard that blocks and redirects entities
    Wall { rect: Rect },
    /// Player-following field that reverses nearby entity velocities
    Field {
        owner: PlayerId,
        position: Vec2,
        radius: f32,
    },
}

#[derive(Debug, Clone)]
pub struct AbilityCreation {
    pub id: CreationId,
    pub kind: CreationKind,
    pub color: String,
    pub spawned_at: Tick,
    /// Ticks until self-destruction
    pub lifetime: u64,
}

/// Distance from the caster at which a wall is raised
const WALL_OFFSET: f32 = 40.0;
/// Long and short wall dimensions
const WALL_LENGTH: f32 = 200.0;
const WALL_THICKNESS: f32 = 10.0;

impl AbilityCreation {
    /// Raise a wall sized and placed by the caster's aim octant
    pub fn wall(id: CreationId, caster: Vec2, aim: Vec2, lifetime: u64, tick: Tick) -> Self {
        let degree = aim.y.atan2(aim.x).to_degrees();
        let vertical = Size::new(WALL_THICKNESS, WALL_LENGTH);
        let horizontal = Size::new(WALL_LENGTH, WALL_THICKNESS);

        let (size, position) = if (-22.5..22.5).contains(&degree) {
            // Right
            (
                vertical,
                Vec2::new(caster.x + WALL_OFFSET, caster.y - WALL_LENGTH / 2.0),
            )
        } else if (22.5..67.5).contains(&degree) {
            // Down-right
            (
                vertical,
                Vec2::new(
                    caster.x + WALL_OFFSET / 2.0,
                    caster.y + WALL_OFFSET / 2.0 - WALL_LENGTH / 2.0,
                ),
            )
        } else if (67.5..112.5).contains(&degree) {
            // Down
            (
                horizontal,
                Vec2::new(caster.x - WALL_LENGTH / 2.0, caster.y + WALL_OFFSET),
            )
        } else if (112.5..157.5).contains(&degree) {
            // Down-left
            (
                vertical,
                Vec2::new(
                    caster.x - WALL_OFFSET / 2.0,
                    caster.y + WALL_OFFSET / 2.0 - WALL_LENGTH / 2.0,
                ),
            )
        } else if !(-157.5..157.5).contains(&degree) {
            // Left
            (
                vertical,
                Vec2::new(caster.x - WALL_OFFSET, caster.y - WALL_LENGTH / 2.0),
            )
        } else if (-157.5..-112.5).contains(&degree) {
            // Up-left
            (
                vertical,
                Vec2::new(
                    caster.x - WALL_OFFSET / 2.0,
                    caster.y - WALL_OFFSET / 2.0 - WALL_LENGTH / 2.0,
                ),
            )
        } else if (-112.5..-67.5).contains(&degree) {
            // Up
            (
                horizontal,
                Vec2::new(caster.x - WALL_LENGTH / 2.0, caster.y - WALL_OFFSET),
            )
        } else {
            // Up-right
            (
                vertical,
                Vec2::new(
                    caster.x + WALL_OFFSET / 2.0,
                    caster.y - WALL_OFFSET / 2.0 - WALL_LENGTH / 2.0,
                ),
            )
        };

        Self {
            id,
            kind: CreationKind::Wall {
                rect: Rect { position, size },
            },
            color: "#3dcfd1".to_string(),
            spawned_at: tick,
            lifetime,
        }
    }

    /// Spawn a field centred on (and following) its owner
    pub fn field(
        id: CreationId,
        owner: PlayerId,
        position: Vec2,
        radius: f32,
        lifetime: u64,
        tick: Tick,
    ) -> Self {
        Self {
            id,
            kind: CreationKind::Field {
                owner,
                position,
                radius,
            },
            color: "rgba(255, 0, 255, 0.2)".to_string(),
            spawned_at: tick,
            lifetime,
        }
    }

    pub fn creation_type(&self) -> CreationType {
        match self.kind {
            CreationKind::Wall { .. } => CreationType::IceWall,
            CreationKind::Field { .. } => CreationType::MagneticField,
        }
    }

    /// Destroy-on-timeout contract shared by every variant
    pub fn expired(&self, tick: Tick) -> bool {
        tick.saturating_sub(self.spawned_at) >= self.lifetime
    }

    /// Owning player, for variants that follow their caster
    pub fn field_owner(&self) -> Option<PlayerId> {
        match &self.kind {
            CreationKind::Field { owner, .. } => Some(*owner),
            CreationKind::Wall { .. } => None,
        }
    }

    /// The blocking rect, for variants that participate in movement resolution
    pub fn wall_rect(&self) -> Option<&Rect> {
        match &self.kind {
            CreationKind::Wall { rect } => Some(rect),
            CreationKind::Field { .. } => None,
        }
    }

    /// Follow the owner and reverse entities heading into the field
    pub fn apply_field(&mut self, owner_position: Option<Vec2>, entities: &mut [Entity]) {
        let CreationKind::Field {
            position, radius, ..
        } = &mut self.kind
        else {
            return;
        };

        if let Some(p) = owner_position {
            *position = p;
        }

        for entity in entities.iter_mut() {
            let to_field = *position - entity.position;
            if to_field.length() >= *radius {
                continue;
            }
            let moving_away = to_field.dot(&entity.velocity) < 0.0;
            if !moving_away {
                entity.velocity = entity.velocity * -1.0;
            }
        }
    }

    pub fn data(&self) -> CreationData {
        match &self.kind {
            CreationKind::Wall { rect } => CreationData {
                id: self.id,
                creation_type: self.creation_type(),
                position: rect.position,
                color: self.color.clone(),
                size: Some(rect.size),
                radius: None,
            },
            CreationKind::Field {
                position, radius, ..
            } => CreationData {
                id: self.id,
                creation_type: self.creation_type(),
                position: *position,
                color: self.color.clone(),
                size: None,
                radius: Some(*radius),
            },
        }
    }
}
