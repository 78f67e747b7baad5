//! A live simulation cell: bounds, zones, portals, and live collections
//!
//! Areas are rebuilt fresh from their template on every load; entity and
//! creation state does not survive an unload/reload cycle.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::ability::creation::AbilityCreation;
use crate::core::config::GameConfig;
use crate::core::error::{GameError, Result};
use crate::core::types::{IdAllocator, PlayerId, Rect, Vec2};
use crate::entity::behavior::AreaGeometry;
use crate::entity::{BehaviorState, Entity};
use crate::protocol::AreaSnapshot;
use crate::world::portal::Portal;
use crate::world::template::{AreaTemplate, EntityTemplate, SpawnPosition};

#[derive(Debug, Clone)]
pub struct Area {
    pub region_name: String,
    pub index: usize,
    pub bounds: Rect,
    pub background: String,
    pub border: [Vec2; 4],
    pub start_zone: Rect,
    pub finish_zone: Rect,
    pub next_area_zone: Rect,
    /// Absent at index 0
    pub previous_area_zone: Option<Rect>,
    pub portals: Vec<Portal>,
    /// Death countdown in ticks applied to players killed here
    pub death_timer: i32,
    pub players: Vec<PlayerId>,
    pub entities: Vec<Entity>,
    pub creations: Vec<AbilityCreation>,
}

impl Area {
    /// Build a fresh area from its template, generating the entity
    /// population
    pub fn from_template(
        template: &AreaTemplate,
        region_name: &str,
        index: usize,
        config: &GameConfig,
        ids: &IdAllocator,
        rng: &mut ChaCha8Rng,
    ) -> Result<Self> {
        let bounds = Rect {
            position: template.position,
            size: template.size,
        };
        let border = [
            Vec2::new(bounds.min_x(), bounds.min_y()),
            Vec2::new(bounds.max_x(), bounds.min_y()),
            Vec2::new(bounds.max_x(), bounds.max_y()),
            Vec2::new(bounds.min_x(), bounds.max_y()),
        ];
        let start_zone = Rect::new(
            bounds.min_x(),
            bounds.min_y(),
            config.start_zone_width,
            bounds.size.height,
        );
        let finish_zone = Rect::new(
            bounds.max_x() - config.start_zone_width,
            bounds.min_y(),
            config.start_zone_width,
            bounds.size.height,
        );
        let next_area_zone = Rect::new(
            bounds.max_x() - config.transition_zone_width,
            bounds.min_y(),
            config.transition_zone_width,
            bounds.size.height,
        );
        let previous_area_zone = (index > 0).then(|| {
            Rect::new(
                bounds.min_x(),
                bounds.min_y(),
                config.transition_zone_width,
                bounds.size.height,
            )
        });

        let mut area = Self {
            region_name: region_name.to_string(),
            index,
            bounds,
            background: template.background.clone(),
            border,
            start_zone,
            finish_zone,
            next_area_zone,
            previous_area_zone,
            portals: template.portals.iter().map(Portal::from_template).collect(),
            death_timer: template.death_timer.unwrap_or(config.default_death_timer),
            players: Vec::new(),
            entities: Vec::new(),
            creations: Vec::new(),
        };
        area.generate_entities(&template.entities, config, ids, rng)?;
        Ok(area)
    }

    /// Instantiate the template population plus the fixed pellet count.
    ///
    /// Fixed spawn points pass through verbatim; "random"/"wall" policies
    /// sample a collision-safe position. Entities without a starting
    /// velocity get a random heading at their own speed.
    fn generate_entities(
        &mut self,
        templates: &[EntityTemplate],
        config: &GameConfig,
        ids: &IdAllocator,
        rng: &mut ChaCha8Rng,
    ) -> Result<()> {
        for template in templates {
            for _ in 0..template.amount.max(1) {
                let mut entity = Entity::spawn(ids.entity_id(), template.kind);
                if let Some(speed) = template.speed {
                    entity.speed = speed;
                }
                if let Some(radius) = template.radius {
                    entity.radius = radius;
                }
                entity.position = match template.position {
                    SpawnPosition::Fixed(point) => point,
                    SpawnPosition::Policy(_) => self.random_position(entity.radius, config, rng)?,
                };
                if entity.velocity == Vec2::ZERO && entity.speed > 0.0 {
                    entity.velocity = Vec2::new(
                        (rng.gen::<f32>() - 0.5) * entity.speed,
                        (rng.gen::<f32>() - 0.5) * entity.speed,
                    );
                }
                self.entities.push(entity);
            }
        }

        // Passive pellets, XP scaled by area index
        let pellet_xp = (self.index.max(1) as u32) * 2;
        for _ in 0..config.pellet_count {
            let mut pellet = Entity::spawn(ids.entity_id(), crate::entity::EntityKind::Pellet);
            pellet.color = format!("#{:06x}", rng.gen_range(0..0x1000000));
            pellet.state = BehaviorState::Pellet { xp: pellet_xp };
            pellet.position = self.random_position(pellet.radius, config, rng)?;
            self.entities.push(pellet);
        }

        Ok(())
    }

    /// Collision-safe uniform position inside the interior, outside every
    /// zone and portal footprint. Fails loudly when the exclusions leave no
    /// free interior instead of looping forever.
    pub fn random_position(
        &self,
        radius: f32,
        config: &GameConfig,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec2> {
        sample_position(
            &self.bounds,
            &self.exclusion_rects(),
            radius,
            config.position_sample_cap,
            rng,
        )
        .ok_or(GameError::NoValidPosition {
            region: self.region_name.clone(),
            index: self.index,
            attempts: config.position_sample_cap,
        })
    }

    /// Rects no entity may spawn inside: all reserved zones and portals
    pub fn exclusion_rects(&self) -> Vec<Rect> {
        let mut rects = vec![self.start_zone, self.finish_zone, self.next_area_zone];
        if let Some(zone) = self.previous_area_zone {
            rects.push(zone);
        }
        rects.extend(self.portals.iter().map(|p| p.rect));
        rects
    }

    pub fn geometry(&self) -> AreaGeometry {
        AreaGeometry {
            bounds: self.bounds,
            start_zone: self.start_zone,
            finish_zone: self.finish_zone,
        }
    }

    pub fn remove_player(&mut self, id: PlayerId) {
        self.players.retain(|p| *p != id);
    }

    /// Static geometry for the initial per-client sync; never carries live
    /// entity or player state
    pub fn snapshot(&self) -> AreaSnapshot {
        AreaSnapshot {
            region_name: self.region_name.clone(),
            area_number: self.index,
            position: self.bounds.position,
            size: self.bounds.size,
            background: self.background.clone(),
            border: self.border,
            start_zone: self.start_zone,
            finish_zone: self.finish_zone,
            next_area_zone: self.next_area_zone,
            previous_area_zone: self.previous_area_zone,
            portals: self.portals.iter().map(|p| p.data()).collect(),
            death_timer: self.death_timer,
        }
    }
}

/// Rejection-sample a point uniformly within `bounds` (margin inset) that
/// lies outside every exclusion rect. Returns `None` once the attempt cap is
/// exhausted; the caller turns that into a configuration error.
pub fn sample_position(
    bounds: &Rect,
    exclusions: &[Rect],
    margin: f32,
    cap: u32,
    rng: &mut ChaCha8Rng,
) -> Option<Vec2> {
    let span_x = bounds.size.width - 2.0 * margin;
    let span_y = bounds.size.height - 2.0 * margin;
    if span_x <= 0.0 || span_y <= 0.0 {
        return None;
    }
    for _ in 0..cap {
        let candidate = Vec2::new(
            bounds.min_x() + margin + rng.gen::<f32>() * span_x,
            bounds.min_y() + margin + rng.gen::<f32>() * span_y,
        );
        if exclusions.iter().all(|rect| !rect.contains(candidate)) {
            return Some(candidate);
        }
    }
    None
}
