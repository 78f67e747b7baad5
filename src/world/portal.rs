//! Static links between regions
//!
//! A portal teleports an overlapping player to area 0 of its target region.
//! A short re-trigger cooldown prevents the immediate bounce-back a player
//! would otherwise cause by landing on the destination's return portal.

use crate::core::types::{Rect, Tick, Vec2};
use crate::protocol::PortalData;
use crate::world::template::PortalTemplate;

#[derive(Debug, Clone)]
pub struct Portal {
    pub target_region: String,
    pub rect: Rect,
    pub exit_offset_y: f32,
    pub color: String,
    last_teleport: Option<Tick>,
}

impl Portal {
    pub fn from_template(template: &PortalTemplate) -> Self {
        Self {
            target_region: template.target_region.clone(),
            rect: Rect {
                position: template.position,
                size: template.size,
            },
            exit_offset_y: template.exit_offset_y,
            color: "rgba(138, 43, 226, 0.5)".to_string(),
            last_teleport: None,
        }
    }

    /// Fire if the position is inside the hitbox and the cooldown has
    /// elapsed; a successful trigger re-arms the cooldown.
    pub fn try_trigger(&mut self, position: Vec2, tick: Tick, cooldown_ticks: u64) -> bool {
        if let Some(last) = self.last_teleport {
            if tick.saturating_sub(last) < cooldown_ticks {
                return false;
            }
        }
        if self.rect.contains(position) {
            self.last_teleport = Some(tick);
            true
        } else {
            false
        }
    }

    /// Start the cooldown without a traversal (arrival side of a teleport)
    pub fn suppress(&mut self, tick: Tick) {
        self.last_teleport = Some(tick);
    }

    /// Relative position along the portal's horizontal span, clamped to [0, 1]
    pub fn span_fraction(&self, position: Vec2) -> f32 {
        if self.rect.size.width <= 0.0 {
            return 0.5;
        }
        ((position.x - self.rect.min_x()) / self.rect.size.width).clamp(0.0, 1.0)
    }

    /// Point at the given fraction of the span, just past the exit edge
    pub fn exit_point(&self, fraction: f32, margin: f32) -> Vec2 {
        Vec2::new(
            self.rect.min_x() + fraction.clamp(0.0, 1.0) * self.rect.size.width,
            self.rect.max_y() + self.exit_offset_y + margin,
        )
    }

    pub fn data(&self) -> PortalData {
        PortalData {
            target_region: self.target_region.clone(),
            position: self.rect.position,
            size: self.rect.size,
            exit_offset_y: self.exit_offset_y,
            color: self.color.clone(),
        }
    }
}
