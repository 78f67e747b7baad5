//! Per-tick simulation step
//!
//! For every loaded area, in order: player movement and rule evaluation,
//! collision resolution, ability creations, then entities, so behaviors see
//! same-tick hazard placement consistently. Queued transitions are applied
//! after every area has been stepped (once per tick per player), and the
//! consolidated per-area snapshots go out last.

use ahash::AHashMap;
use rand_chacha::ChaCha8Rng;

use crate::core::config::GameConfig;
use crate::core::error::{GameError, Result};
use crate::core::types::{circles_overlap, PlayerId, Tick};
use crate::entity::behavior::{update_entities, MINE_RELOAD_SECS};
use crate::entity::BehaviorState;
use crate::player::Player;
use crate::protocol::ServerEvent;
use crate::server::outbox::Outbox;
use crate::server::{GameServer, PendingMove, TransitionKind};
use crate::world::area::{sample_position, Area};

/// Run a single simulation tick over every loaded area
pub fn run_simulation_tick(server: &mut GameServer) -> Result<()> {
    server.current_tick += 1;
    let tick = server.current_tick;

    // Snapshot the keys up front: an area loaded by a transition this tick
    // is not stepped until the next one
    let keys = server.world.loaded_area_keys();
    let mut pending: Vec<PendingMove> = Vec::new();

    for (region_name, index) in &keys {
        let GameServer {
            config,
            world,
            players,
            rng,
            outbox,
            ..
        } = server;
        let Some(area) = world
            .region_mut(region_name)
            .and_then(|r| r.area_mut(*index))
        else {
            continue;
        };

        step_players(area, players, config, tick, &mut pending);
        resolve_combat(area, players, config, tick, rng, outbox)?;
        update_creations(area, players, tick);
        update_entities(area, players, config, tick, rng)?;
    }

    for mv in pending {
        server.apply_move(mv)?;
    }

    server.broadcast_area_snapshots();
    Ok(())
}

/// Consume buffered input, regenerate energy, and evaluate the
/// zone/transition/portal/death rules exactly once per player
fn step_players(
    area: &mut Area,
    players: &mut AHashMap<PlayerId, Player>,
    config: &GameConfig,
    tick: Tick,
    pending: &mut Vec<PendingMove>,
) {
    let roster = area.players.clone();
    let bounds = area.bounds;
    let start_zone = area.start_zone;
    let finish_zone = area.finish_zone;
    let next_zone = area.next_area_zone;
    let previous_zone = area.previous_area_zone;
    let portal_cooldown = config.ticks(config.portal_cooldown_secs);

    for pid in roster {
        let Some(player) = players.get_mut(&pid) else {
            continue;
        };

        if !player.is_alive() {
            player.death_timer -= 1;
            if player.death_timer <= 0 {
                pending.push(PendingMove {
                    player: pid,
                    kind: TransitionKind::Respawn,
                });
            }
            continue;
        }

        player.apply_movement(&bounds, &start_zone, &finish_zone, config);
        player.regen_energy(config);

        // Zone tests are inclusive with the player's radius as margin, so
        // overlapping the strip is enough to trigger
        if next_zone.overlaps_circle(player.position, player.radius) {
            pending.push(PendingMove {
                player: pid,
                kind: TransitionKind::NextArea,
            });
        } else if previous_zone
            .is_some_and(|zone| zone.overlaps_circle(player.position, player.radius))
        {
            pending.push(PendingMove {
                player: pid,
                kind: TransitionKind::PreviousArea,
            });
        } else {
            for portal in &mut area.portals {
                if portal.try_trigger(player.position, tick, portal_cooldown) {
                    pending.push(PendingMove {
                        player: pid,
                        kind: TransitionKind::Portal {
                            target_region: portal.target_region.clone(),
                            fraction: portal.span_fraction(player.position),
                        },
                    });
                    break;
                }
            }
        }
    }
}

/// Player-vs-player and player-vs-entity collision resolution.
///
/// A living player touching another living player kills the other; the
/// first-detected pair in roster order decides the victim. Lethal entities
/// start the toucher's death countdown; pellets pay out XP and relocate.
fn resolve_combat(
    area: &mut Area,
    players: &mut AHashMap<PlayerId, Player>,
    config: &GameConfig,
    tick: Tick,
    rng: &mut ChaCha8Rng,
    outbox: &Outbox,
) -> Result<()> {
    let roster = area.players.clone();
    let death_timer = area.death_timer;
    let bounds = area.bounds;
    let exclusions = area.exclusion_rects();
    let region = area.region_name.clone();
    let index = area.index;

    // Player vs player
    for i in 0..roster.len() {
        for j in (i + 1)..roster.len() {
            let (Some(a), Some(b)) = (players.get(&roster[i]), players.get(&roster[j])) else {
                continue;
            };
            if !a.is_alive() || !b.is_alive() {
                continue;
            }
            if circles_overlap(a.position, a.radius, b.position, b.radius) {
                if let Some(victim) = players.get_mut(&roster[j]) {
                    victim.death_timer = death_timer;
                }
            }
        }
    }

    // Player vs entity
    for pid in &roster {
        for entity in &mut area.entities {
            let Some(player) = players.get_mut(pid) else {
                break;
            };
            if !player.is_alive() {
                break;
            }
            if !entity.touches(player.position, player.radius) {
                continue;
            }

            match &mut entity.state {
                BehaviorState::Pellet { xp } => {
                    // Non-lethal: grant XP and relocate immediately
                    player.add_xp(*xp, config);
                    let delta = player.progress_delta(config);
                    outbox.to_player(*pid, ServerEvent::HeroUpdate(delta));
                    entity.position =
                        sample_position(
                            &bounds,
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
                BehaviorState::Mine { armed, rearm_at } => {
                    if *armed {
                        player.death_timer = death_timer;
                        *armed = false;
                        *rearm_at = tick + config.ticks(MINE_RELOAD_SECS);
                    }
                }
                _ => {
                    player.death_timer = death_timer;
                }
            }
        }
    }

    Ok(())
}

/// Expire creations past their countdown, then apply field effects so the
/// subsequent entity pass sees this tick's hazard state
fn update_creations(area: &mut Area, players: &AHashMap<PlayerId, Player>, tick: Tick) {
    let Area {
        creations,
        entities,
        ..
    } = area;

    creations.retain(|c| !c.expired(tick));
    for creation in creations.iter_mut() {
        if let Some(owner) = creation.field_owner() {
            let owner_position = players.get(&owner).map(|p| p.position);
            creation.apply_field(owner_position, entities);
        }
    }
}
