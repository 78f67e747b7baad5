//! Entity movement behaviors and the shared collision-resolution routine
//!
//! Every behavior routes its proposed movement through `resolve_movement` so
//! edge handling never diverges between kinds: outer-border reflection,
//! reserved-zone reflection decided by the previous position, ability-wall
//! hooks, then a final clamp inside the area bounds.

use ahash::{AHashMap, AHashSet};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::core::config::GameConfig;
use crate::core::error::{GameError, Result};
use crate::core::types::{EntityId, PlayerId, Rect, Segment, Tick, Vec2};
use crate::entity::{BehaviorState, Entity, EntityKind};
use crate::player::Player;
use crate::world::area::{sample_position, Area};

pub const PULSAR_MIN_RADIUS: f32 = 5.0;
pub const PULSAR_MAX_RADIUS: f32 = 20.0;
pub const PULSAR_PULSE_RATE: f32 = 0.2;

pub const ZIGZAG_FLIP_TICKS: u32 = 60;
pub const ZIGZAG_FREQUENCY: f32 = 0.1;

pub const TELEPORT_INTERVAL_TICKS: u32 = 180;
pub const TELEPORT_DISTANCE: f32 = 50.0;

pub const AMBUSHER_DETECTION_RANGE: f32 = 400.0;

pub const CLINGER_STICK_TICKS: u32 = 180;
pub const CLINGER_RETARGET_TICKS: u32 = 300;

pub const CONNECTUS_DURATION_SECS: f32 = 5.0;
pub const CONNECTUS_LINE_WIDTH: f32 = 2.0;

pub const MINE_DETECTION_RANGE: f32 = 50.0;
pub const MINE_RELOAD_SECS: f32 = 5.0;

/// Immutable area geometry used by movement resolution
#[derive(Debug, Clone, Copy)]
pub struct AreaGeometry {
    pub bounds: Rect,
    pub start_zone: Rect,
    pub finish_zone: Rect,
}

/// The band between the start and finish zones where enemies hunt
pub fn is_in_play_zone(geom: &AreaGeometry, pos: Vec2) -> bool {
    pos.x > geom.start_zone.max_x()
        && pos.x < geom.finish_zone.min_x()
        && pos.y > geom.bounds.min_y()
        && pos.y < geom.bounds.max_y()
}

/// Resolve a proposed move against the area border, the reserved zones, and
/// any active wall hazards. Reflects velocity on struck faces and returns the
/// corrected position, always inside the bounds.
pub fn resolve_movement(
    geom: &AreaGeometry,
    walls: &[Rect],
    prev: Vec2,
    radius: f32,
    velocity: &mut Vec2,
    proposed: Vec2,
) -> Vec2 {
    let mut new = proposed;

    // Outer border: reflect and cancel movement on the crossing axis
    if new.x - radius < geom.bounds.min_x() || new.x + radius > geom.bounds.max_x() {
        velocity.x = -velocity.x;
        new.x = prev.x;
    }
    if new.y - radius < geom.bounds.min_y() || new.y + radius > geom.bounds.max_y() {
        velocity.y = -velocity.y;
        new.y = prev.y;
    }

    new = resolve_zone_rect(&geom.start_zone, prev, radius, velocity, new);
    new = resolve_zone_rect(&geom.finish_zone, prev, radius, velocity, new);
    for wall in walls {
        new = resolve_zone_rect(wall, prev, radius, velocity, new);
    }

    geom.bounds.clamp_inside(new, radius)
}

/// Reflect against one reserved rectangle. The previous position decides
/// which face was struck, so an entity is always pushed back to the side it
/// came from.
fn resolve_zone_rect(
    rect: &Rect,
    prev: Vec2,
    radius: f32,
    velocity: &mut Vec2,
    mut new: Vec2,
) -> Vec2 {
    let overlaps = new.x - radius < rect.max_x()
        && new.x + radius > rect.min_x()
        && new.y - radius < rect.max_y()
        && new.y + radius > rect.min_y();
    if !overlaps {
        return new;
    }

    if prev.x >= rect.max_x() {
        velocity.x = velocity.x.abs();
        new.x = rect.max_x() + radius;
    } else if prev.x <= rect.min_x() {
        velocity.x = -velocity.x.abs();
        new.x = rect.min_x() - radius;
    }
    if prev.y >= rect.max_y() {
        velocity.y = velocity.y.abs();
        new.y = rect.max_y() + radius;
    } else if prev.y <= rect.min_y() {
        velocity.y = -velocity.y.abs();
        new.y = rect.min_y() - radius;
    }
    new
}

/// Step one entity by its velocity through the shared resolution
fn integrate(entity: &mut Entity, geom: &AreaGeometry, walls: &[Rect]) {
    let prev = entity.position;
    let proposed = prev + entity.velocity;
    let mut velocity = entity.velocity;
    entity.position = resolve_movement(geom, walls, prev, entity.radius, &mut velocity, proposed);
    entity.velocity = velocity;
}

/// Assign a random heading at the entity's own speed
fn random_heading(entity: &mut Entity, rng: &mut ChaCha8Rng) {
    let angle = rng.gen::<f32>() * std::f32::consts::TAU;
    entity.velocity = Vec2::from_angle(angle) * entity.speed;
}

/// Elastic bounce with a random initial heading
fn bounce(entity: &mut Entity, geom: &AreaGeometry, walls: &[Rect], rng: &mut ChaCha8Rng) {
    if entity.velocity == Vec2::ZERO && entity.speed > 0.0 {
        random_heading(entity, rng);
    }
    integrate(entity, geom, walls);
}

/// Read-only view of a player for behavior decisions
struct PlayerView {
    id: PlayerId,
    position: Vec2,
}

/// Read-only entity snapshot taken at the start of the update pass
struct EntityView {
    id: EntityId,
    kind: EntityKind,
    position: Vec2,
    velocity: Vec2,
    radius: f32,
}

/// Advance every entity in the area by one tick.
///
/// Behaviors read the start-of-pass snapshot for cross-entity decisions, so
/// iteration order cannot change what an entity sees.
pub fn update_entities(
    area: &mut Area,
    players: &mut AHashMap<PlayerId, Player>,
    config: &GameConfig,
    tick: Tick,
    rng: &mut ChaCha8Rng,
) -> Result<()> {
    let geom = area.geometry();
    let exclusions = area.exclusion_rects();
    let walls: Vec<Rect> = area
        .creations
        .iter()
        .filter_map(|c| c.wall_rect().copied())
        .collect();
    let region = area.region_name.clone();
    let index = area.index;
    let area_death_timer = area.death_timer;

    // Living players currently in this area
    let living: Vec<PlayerView> = area
        .players
        .iter()
        .filter_map(|id| players.get(id))
        .filter(|p| p.is_alive())
        .map(|p| PlayerView {
            id: p.id,
            position: p.position,
        })
        .collect();

    let views: Vec<EntityView> = area
        .entities
        .iter()
        .map(|e| EntityView {
            id: e.id,
            kind: e.kind,
            position: e.position,
            velocity: e.velocity,
            radius: e.radius,
        })
        .collect();

    // Hosts claimed by clingers searching in this pass. Only simultaneous
    // searchers exclude each other; a host that already carries a stuck
    // clinger can still be picked, so several may share one host.
    let mut claimed: AHashSet<EntityId> = AHashSet::new();

    pair_connectus(&mut area.entities, tick);

    // Partner resets deferred until after the pass (twin is another element)
    let mut unpair: Vec<(EntityId, Tick)> = Vec::new();

    let entity_count = area.entities.len();
    for i in 0..entity_count {
        // Fresh twin position for line growth, read before borrowing `i`
        let twin_pos = match &area.entities[i].state {
            BehaviorState::Connectus {
                twin: Some(tid), ..
            } => {
                let tid = *tid;
                area.entities
                    .iter()
                    .find(|e| e.id == tid)
                    .map(|e| e.position)
            }
            _ => None,
        };

        let entity = &mut area.entities[i];
        match entity.kind {
            EntityKind::Normal => bounce(entity, &geom, &walls, rng),

            EntityKind::Pulsar => {
                let BehaviorState::Pulsar { growing } = &mut entity.state else {
                    continue;
                };
                if *growing {
                    entity.radius += PULSAR_PULSE_RATE;
                    if entity.radius >= PULSAR_MAX_RADIUS {
                        *growing = false;
                    }
                } else {
                    entity.radius -= PULSAR_PULSE_RATE;
                    if entity.radius <= PULSAR_MIN_RADIUS {
                        *growing = true;
                    }
                }
                bounce(entity, &geom, &walls, rng);
            }

            EntityKind::Zigzag => {
                let BehaviorState::Zigzag { timer, direction } = &mut entity.state else {
                    continue;
                };
                *timer += 1;
                if *timer > ZIGZAG_FLIP_TICKS {
                    *timer = 0;
                    *direction = -*direction;
                }
                let phase = *timer as f32 * ZIGZAG_FREQUENCY;
                entity.velocity = Vec2::new(
                    entity.speed * phase.cos() * *direction,
                    entity.speed * phase.sin(),
                );
                integrate(entity, &geom, &walls);
            }

            EntityKind::Chaser => {
                let target = living
                    .iter()
                    .filter(|p| is_in_play_zone(&geom, p.position))
                    .min_by(|a, b| {
                        let da = a.position.distance(&entity.position);
                        let db = b.position.distance(&entity.position);
                        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                    });
                match target {
                    Some(p) if is_in_play_zone(&geom, entity.position) => {
                        entity.velocity =
                            (p.position - entity.position).normalize() * entity.speed;
                    }
                    _ => {
                        if entity.velocity == Vec2::ZERO {
                            random_heading(entity, rng);
                        }
                    }
                }
                integrate(entity, &geom, &walls);
            }

            EntityKind::Teleporter => {
                let BehaviorState::Teleporter { timer } = &mut entity.state else {
                    continue;
                };
                *timer += 1;
                if *timer > TELEPORT_INTERVAL_TICKS {
                    *timer = 0;
                    if entity.velocity == Vec2::ZERO {
                        random_heading(entity, rng);
                    }
                    let heading = entity.velocity.normalize();
                    let prev = entity.position;
                    let proposed = prev + heading * TELEPORT_DISTANCE;
                    let mut velocity = entity.velocity;
                    entity.position = resolve_movement(
                        &geom,
                        &walls,
                        prev,
                        entity.radius,
                        &mut velocity,
                        proposed,
                    );
                    entity.velocity = velocity;
                } else {
                    bounce(entity, &geom, &walls, rng);
                }
            }

            EntityKind::Ambusher => {
                let detected = living
                    .iter()
                    .min_by(|a, b| {
                        let da = a.position.distance(&entity.position);
                        let db = b.position.distance(&entity.position);
                        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .filter(|p| p.position.distance(&entity.position) < AMBUSHER_DETECTION_RANGE);
                let BehaviorState::Ambusher { hidden } = &mut entity.state else {
                    continue;
                };
                match detected {
                    Some(p) => {
                        *hidden = false;
                        entity.velocity =
                            (p.position - entity.position).normalize() * entity.speed;
                    }
                    None => {
                        *hidden = true;
                        entity.velocity = Vec2::ZERO;
                    }
                }
                integrate(entity, &geom, &walls);
            }

            EntityKind::Clinger => {
                update_clinger(entity, &views, &mut claimed, &geom);
                bounce(entity, &geom, &walls, rng);
            }

            EntityKind::Connectus => {
                bounce(entity, &geom, &walls, rng);
                let my_id = entity.id;
                let BehaviorState::Connectus {
                    twin,
                    started,
                    cooldown_until,
                    progress,
                    line,
                } = &mut entity.state
                else {
                    continue;
                };
                // The lower id of a pair owns the line and the completion
                let Some(tid) = *twin else { continue };
                if my_id.0 > tid.0 {
                    continue;
                }
                let Some(twin_pos) = twin_pos else {
                    // Partner vanished; drop the pairing
                    *twin = None;
                    *started = None;
                    *progress = 0.0;
                    *line = None;
                    continue;
                };
                let began = *started.get_or_insert(tick);
                let duration = config.ticks(CONNECTUS_DURATION_SECS);
                let p = (tick - began) as f32 / duration as f32;
                if p >= 1.0 {
                    *twin = None;
                    *started = None;
                    *cooldown_until = tick + duration;
                    *progress = 0.0;
                    *line = None;
                    unpair.push((tid, tick + duration));
                } else {
                    *progress = p;
                    *line = Some(connection_line(entity.position, twin_pos, p));
                }
            }

            EntityKind::Mine => {
                let BehaviorState::Mine { armed, rearm_at } = &mut entity.state else {
                    continue;
                };
                if *armed {
                    let victim = living
                        .iter()
                        .find(|p| p.position.distance(&entity.position) < MINE_DETECTION_RANGE);
                    if let Some(v) = victim {
                        if let Some(player) = players.get_mut(&v.id) {
                            if player.is_alive() {
                                player.death_timer = area_death_timer;
                            }
                        }
                        *armed = false;
                        *rearm_at = tick + config.ticks(MINE_RELOAD_SECS);
                    }
                } else if tick >= *rearm_at {
                    *armed = true;
                    entity.position = sample_position(
                        &geom.bounds,
                        &exclusions,
                        entity.radius,
                        config.position_sample_cap,
                        rng,
                    )
                    .ok_or_else(|| GameError::NoValidPosition {
                        region: region.clone(),
                        index,
                        attempts: config.position_sample_cap,
                    })?;
                }
            }

            // Pellets only react to pickups, handled in collision resolution
            EntityKind::Pellet => {}
        }
    }

    for (partner, cooldown_until) in unpair {
        if let Some(entity) = area.entities.iter_mut().find(|e| e.id == partner) {
            if let BehaviorState::Connectus {
                twin,
                started,
                cooldown_until: cd,
                progress,
                line,
            } = &mut entity.state
            {
                *twin = None;
                *started = None;
                *cd = cooldown_until;
                *progress = 0.0;
                *line = None;
            }
        }
    }

    Ok(())
}

/// Opportunistically pair unpaired Connectus entities, in roster order
fn pair_connectus(entities: &mut [Entity], tick: Tick) {
    let free: Vec<usize> = entities
        .iter()
        .enumerate()
        .filter(|(_, e)| {
            matches!(
                &e.state,
                BehaviorState::Connectus {
                    twin: None,
                    cooldown_until,
                    ..
                } if tick >= *cooldown_until
            )
        })
        .map(|(i, _)| i)
        .collect();

    for pair in free.chunks(2) {
        let [i, j] = pair else { continue };
        let id_i = entities[*i].id;
        let id_j = entities[*j].id;
        if let BehaviorState::Connectus { twin, .. } = &mut entities[*i].state {
            *twin = Some(id_j);
        }
        if let BehaviorState::Connectus { twin, .. } = &mut entities[*j].state {
            *twin = Some(id_i);
        }
    }
}

/// The two halves of a growing connection line, one from each endpoint
fn connection_line(a: Vec2, b: Vec2, progress: f32) -> [Segment; 2] {
    let length = a.distance(&b);
    let partial = length * progress / 2.0;
    let dir = (b - a).normalize();
    [
        Segment::new(a, a + dir * partial),
        Segment::new(b, b - dir * partial),
    ]
}

/// Retarget/approach/stick cycle for one clinger
fn update_clinger(
    entity: &mut Entity,
    views: &[EntityView],
    claimed: &mut AHashSet<EntityId>,
    geom: &AreaGeometry,
) {
    let my_id = entity.id;
    let pos = entity.position;
    let radius = entity.radius;
    let speed = entity.speed;

    let BehaviorState::Clinger {
        target,
        stick_timer,
        retarget_timer,
    } = &mut entity.state
    else {
        return;
    };

    *retarget_timer = retarget_timer.saturating_sub(1);
    if *retarget_timer == 0 || target.is_none() {
        let previous = *target;
        let new_target = views
            .iter()
            .filter(|v| {
                v.id != my_id
                    && Some(v.id) != previous
                    && v.kind != EntityKind::Pellet
                    && is_in_play_zone(geom, v.position)
                    && !claimed.contains(&v.id)
            })
            .min_by(|a, b| {
                let da = a.position.distance(&pos);
                let db = b.position.distance(&pos);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|v| v.id);
        *target = new_target;
        if let Some(t) = new_target {
            claimed.insert(t);
        }
        *retarget_timer = CLINGER_RETARGET_TICKS;
        *stick_timer = 0;
    }

    let Some(tid) = *target else { return };
    let Some(host) = views.iter().find(|v| v.id == tid) else {
        *target = None;
        return;
    };

    if *stick_timer > 0 {
        // Stuck phase: ride the host's circumference and co-move with it
        *stick_timer -= 1;
        let angle = (pos.y - host.position.y).atan2(pos.x - host.position.x);
        entity.position = host.position + Vec2::from_angle(angle) * (host.radius + radius);
        entity.velocity = host.velocity;
    } else {
        let delta = host.position - pos;
        let dist = delta.length();
        if dist <= radius + host.radius {
            *stick_timer = CLINGER_STICK_TICKS;
        } else if dist > 0.0 {
            entity.velocity = delta.normalize() * speed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_geom() -> AreaGeometry {
        AreaGeometry {
            bounds: Rect::new(0.0, 0.0, 1000.0, 480.0),
            start_zone: Rect::new(0.0, 0.0, 300.0, 480.0),
            finish_zone: Rect::new(700.0, 0.0, 300.0, 480.0),
        }
    }

    #[test]
    fn test_border_reflection_cancels_crossing_axis() {
        let geom = test_geom();
        let mut velocity = Vec2::new(5.0, 1.0);
        let new = resolve_movement(
            &geom,
            &[],
            Vec2::new(985.0, 240.0),
            10.0,
            &mut velocity,
            Vec2::new(993.0, 241.0),
        );
        assert_eq!(velocity.x, -5.0);
        assert_eq!(new.x, 985.0);
        assert_eq!(new.y, 241.0);
    }

    #[test]
    fn test_zone_reflection_pushes_back_to_entry_side() {
        let geom = test_geom();
        let mut velocity = Vec2::new(-2.0, 0.0);
        // Approaching the start zone from the play side
        let prev = Vec2::new(315.0, 240.0);
        let new = resolve_movement(
            &geom,
            &[],
            prev,
            10.0,
            &mut velocity,
            Vec2::new(305.0, 240.0),
        );
        assert_eq!(new.x, 310.0);
        assert!(velocity.x > 0.0);
    }

    #[test]
    fn test_wall_participates_in_resolution() {
        let geom = test_geom();
        let wall = Rect::new(500.0, 100.0, 10.0, 200.0);
        let mut velocity = Vec2::new(3.0, 0.0);
        let prev = Vec2::new(485.0, 200.0);
        let new = resolve_movement(
            &geom,
            &[wall],
            prev,
            10.0,
            &mut velocity,
            Vec2::new(495.0, 200.0),
        );
        assert_eq!(new.x, 490.0);
        assert!(velocity.x < 0.0);
    }

    #[test]
    fn test_result_always_inside_bounds() {
        let geom = test_geom();
        let mut velocity = Vec2::new(500.0, 500.0);
        let new = resolve_movement(
            &geom,
            &[],
            Vec2::new(400.0, 240.0),
            10.0,
            &mut velocity,
            Vec2::new(2000.0, 2000.0),
        );
        assert!(geom.bounds.contains_circle(new, 10.0));
    }

    #[test]
    fn test_play_zone_excludes_edge_bands() {
        let geom = test_geom();
        assert!(is_in_play_zone(&geom, Vec2::new(500.0, 240.0)));
        assert!(!is_in_play_zone(&geom, Vec2::new(150.0, 240.0)));
        assert!(!is_in_play_zone(&geom, Vec2::new(850.0, 240.0)));
    }

    #[test]
    fn test_connection_line_grows_from_both_ends() {
        let line = connection_line(Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0), 0.5);
        assert_eq!(line[0].a, Vec2::new(0.0, 0.0));
        assert_eq!(line[0].b, Vec2::new(25.0, 0.0));
        assert_eq!(line[1].a, Vec2::new(100.0, 0.0));
        assert_eq!(line[1].b, Vec2::new(75.0, 0.0));
    }

    #[test]
    fn test_pair_connectus_pairs_in_order() {
        use crate::core::types::EntityId;
        let mut entities = vec![
            Entity::spawn(EntityId(1), EntityKind::Connectus),
            Entity::spawn(EntityId(2), EntityKind::Normal),
            Entity::spawn(EntityId(3), EntityKind::Connectus),
            Entity::spawn(EntityId(4), EntityKind::Connectus),
        ];
        pair_connectus(&mut entities, 10);
        let twin_of = |i: usize| match &entities[i].state {
            BehaviorState::Connectus { twin, .. } => *twin,
            _ => None,
        };
        assert_eq!(twin_of(0), Some(EntityId(3)));
        assert_eq!(twin_of(2), Some(EntityId(1)));
        // Odd one out stays unpaired
        assert_eq!(twin_of(3), None);
    }
}
