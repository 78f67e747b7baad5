//! Game server context and per-connection session handling
//!
//! One explicitly constructed `GameServer` owns the world, the player
//! registry, the RNG, the id allocator, and the outbox; it is mutated only by
//! inbound-command handlers and the tick function, in that order, so there is
//! exactly one writer and no hidden shared state.

pub mod outbox;

use std::sync::Arc;

use ahash::AHashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::ability::creation::AbilityCreation;
use crate::ability::{AbilityKind, TRACK_DURATION, TRACK_FIELD_RADIUS, TRACK_WALL_DURATION};
use crate::core::config::GameConfig;
use crate::core::error::Result;
use crate::core::types::{IdAllocator, PlayerId, Tick, Vec2};
use crate::player::heroes::HeroCatalog;
use crate::player::Player;
use crate::protocol::{ClientCommand, HeroDelta, InputState, LeaderboardEntry, ServerEvent};
use crate::server::outbox::Outbox;
use crate::world::template::WorldData;
use crate::world::World;

/// A transition decided during the player pass, applied after every area has
/// been stepped so no player can transition twice in one tick
#[derive(Debug, Clone)]
pub struct PendingMove {
    pub player: PlayerId,
    pub kind: TransitionKind,
}

#[derive(Debug, Clone)]
pub enum TransitionKind {
    NextArea,
    PreviousArea,
    Portal {
        target_region: String,
        /// Relative offset along the triggering portal's span
        fraction: f32,
    },
    /// Death countdown elapsed; return to area 0 of the player's region
    Respawn,
}

/// Where a relocated player re-enters the destination area
enum SpawnRule {
    /// Preserve relative Y; X a fixed safe distance from the crossed edge
    OffsetFromEdge { entered_from_left: bool },
    /// Map proportionally along the destination's return portal, if any
    PortalExit {
        origin_region: String,
        fraction: f32,
    },
    /// Fresh start in the start zone
    StartZone,
}

pub struct GameServer {
    pub config: GameConfig,
    pub world: World,
    pub players: AHashMap<PlayerId, Player>,
    pub heroes: HeroCatalog,
    pub ids: Arc<IdAllocator>,
    pub rng: ChaCha8Rng,
    pub outbox: Outbox,
    pub current_tick: Tick,
}

impl GameServer {
    pub fn new(config: GameConfig, world_data: WorldData, outbox: Outbox) -> Result<Self> {
        config.validate()?;
        let heroes = HeroCatalog::with_defaults();
        heroes.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        let world = World::new(world_data, &config)?;
        Ok(Self {
            config,
            world,
            players: AHashMap::new(),
            heroes,
            ids: Arc::new(IdAllocator::new()),
            rng,
            outbox,
            current_tick: 0,
        })
    }

    /// Shared id source for the transport adapter to allocate connection ids
    pub fn id_allocator(&self) -> Arc<IdAllocator> {
        Arc::clone(&self.ids)
    }

    /// Handle one inbound command. Runs to completion before the next tick,
    /// so every mutation here is serialized with the simulation.
    pub fn handle_command(&mut self, player: PlayerId, command: ClientCommand) -> Result<()> {
        match command {
            ClientCommand::Connect => self.handle_connect(player),
            ClientCommand::Spawn { nickname, hero } => self.handle_spawn(player, nickname, hero),
            ClientCommand::Input(input) => self.handle_input(player, input),
            ClientCommand::AbilityUse { slot } => self.handle_ability_use(player, slot),
            ClientCommand::Upgrade { slot } => self.handle_upgrade(player, slot),
            ClientCommand::Chat { message } => self.handle_chat(player, message),
            ClientCommand::Disconnect => self.handle_disconnect(player),
        }
    }

    fn handle_connect(&mut self, pid: PlayerId) -> Result<()> {
        let player = Player::new(
            pid,
            &self.world.start_region,
            self.heroes.default_hero(),
            &self.config,
        );
        self.players.insert(pid, player);
        tracing::info!(player = pid.0, "client connected");
        Ok(())
    }

    /// Attach the player to its area and run the initial sync
    fn handle_spawn(&mut self, pid: PlayerId, nickname: String, hero: String) -> Result<()> {
        let Self {
            config,
            world,
            players,
            heroes,
            ids,
            rng,
            outbox,
            ..
        } = self;

        let (region_name, area_index) = match players.get(&pid) {
            Some(p) if p.attached => {
                tracing::debug!(player = pid.0, "spawn ignored: already attached");
                return Ok(());
            }
            Some(p) => (p.region.clone(), p.area_index),
            None => return Ok(()),
        };

        let Some(region) = world.region_mut(&region_name) else {
            tracing::warn!(player = pid.0, region = %region_name, "spawn into unknown region");
            return Ok(());
        };
        let Some(area) = region.get_or_load(area_index, config, ids, rng)? else {
            tracing::warn!(player = pid.0, region = %region_name, area_index, "spawn into absent area");
            return Ok(());
        };

        let bounds = area.bounds;
        let spawn_position = Vec2::new(
            bounds.min_x() + rng.gen::<f32>() * bounds.size.width,
            bounds.min_y() + rng.gen::<f32>() * bounds.size.height,
        );
        if !area.players.contains(&pid) {
            area.players.push(pid);
        }
        let snapshot = area.snapshot();
        let roster = area.players.clone();

        let hero_def = heroes
            .by_name(&hero)
            .unwrap_or_else(|| heroes.default_hero());
        let Some(player) = players.get_mut(&pid) else {
            return Ok(());
        };
        player.name = nickname;
        player.assign_hero(hero_def);
        player.position = spawn_position;
        player.attached = true;
        let self_data = player.data();

        tracing::info!(player = pid.0, name = %self_data.name, region = %region_name, area_index, "player spawned");

        outbox.to_player(pid, ServerEvent::AreaData(snapshot));
        outbox.to_player(pid, ServerEvent::SelfId { id: pid });
        outbox.to_player(pid, ServerEvent::PlayerUpdate(self_data.clone()));
        outbox.to_area_except(
            &region_name,
            area_index,
            pid,
            ServerEvent::NewPlayer(self_data),
        );
        let existing: Vec<_> = roster
            .iter()
            .filter(|p| **p != pid)
            .filter_map(|p| players.get(p))
            .map(|p| p.data())
            .collect();
        outbox.to_player(pid, ServerEvent::ExistingPlayers(existing));
        outbox.to_all(ServerEvent::LeaderboardUpdate(leaderboard_entries(
            world, players,
        )));
        Ok(())
    }

    /// Latest input wins; consumed at the start of the next tick
    fn handle_input(&mut self, pid: PlayerId, input: InputState) -> Result<()> {
        if let Some(player) = self.players.get_mut(&pid) {
            player.input = input;
        }
        Ok(())
    }

    fn handle_ability_use(&mut self, pid: PlayerId, slot: usize) -> Result<()> {
        let Self {
            config,
            world,
            players,
            ids,
            current_tick,
            ..
        } = self;
        let tick = *current_tick;

        let Some(player) = players.get_mut(&pid) else {
            return Ok(());
        };
        if !player.attached || !player.is_alive() {
            return Ok(());
        }
        let Some(ability) = player.abilities.get(slot) else {
            tracing::debug!(player = pid.0, slot, "ability slot out of range");
            return Ok(());
        };
        if !ability.ready(tick, config) || player.energy < ability.energy_cost {
            return Ok(());
        }

        let Some(area) = world
            .region_mut(&player.region)
            .and_then(|r| r.area_mut(player.area_index))
        else {
            return Ok(());
        };

        let creation = match ability.kind {
            AbilityKind::IceWall => {
                let duration = ability.track_value(TRACK_WALL_DURATION).unwrap_or(3.0);
                AbilityCreation::wall(
                    ids.creation_id(),
                    player.position,
                    player.input.mouse,
                    config.ticks(duration),
                    tick,
                )
            }
            AbilityKind::Magnetize => {
                let radius = ability.track_value(TRACK_FIELD_RADIUS).unwrap_or(80.0);
                let duration = ability.track_value(TRACK_DURATION).unwrap_or(4.0);
                AbilityCreation::field(
                    ids.creation_id(),
                    pid,
                    player.position,
                    radius,
                    config.ticks(duration),
                    tick,
                )
            }
        };

        let cost = ability.energy_cost;
        if let Some(ability) = player.abilities.get_mut(slot) {
            ability.mark_used(tick);
        }
        player.energy -= cost;
        area.creations.push(creation);
        Ok(())
    }

    /// Spend one upgrade point on a stat or ability slot.
    ///
    /// Slots 0-2 are base speed, max energy, and energy regen (each capped);
    /// slots 3+ map to the hero's abilities. Out-of-range or capped requests
    /// are silently ignored and charge nothing.
    fn handle_upgrade(&mut self, pid: PlayerId, slot: usize) -> Result<()> {
        let Self {
            config,
            players,
            outbox,
            current_tick,
            ..
        } = self;
        let tick = *current_tick;

        let Some(player) = players.get_mut(&pid) else {
            return Ok(());
        };
        if let Some(last) = player.last_upgrade {
            if tick.saturating_sub(last) < config.upgrade_cooldown_ticks {
                return Ok(());
            }
        }
        if player.upgrade_points == 0 {
            tracing::debug!(player = pid.0, "upgrade ignored: no points available");
            return Ok(());
        }

        let mut delta = HeroDelta::default();
        match slot {
            0 => {
                if player.base_speed >= config.max_speed {
                    return Ok(());
                }
                player.base_speed += config.speed_upgrade_step;
                delta.speed = Some(player.base_speed);
            }
            1 => {
                if player.max_energy >= config.max_max_energy {
                    return Ok(());
                }
                player.max_energy += config.energy_upgrade_step;
                delta.max_energy = Some(player.max_energy);
            }
            2 => {
                if player.energy_regen >= config.max_energy_regen {
                    return Ok(());
                }
                player.energy_regen += config.regen_upgrade_step;
                delta.energy_regen = Some(player.energy_regen);
            }
            _ => {
                let index = slot - 3;
                let Some(ability) = player.abilities.get_mut(index) else {
                    tracing::debug!(player = pid.0, slot, "upgrade slot out of range");
                    return Ok(());
                };
                // Dry-run before the point is charged
                if !ability.upgrade(true) {
                    return Ok(());
                }
                ability.upgrade(false);
                delta.abilities = Some(player.abilities.iter().map(|a| a.data()).collect());
            }
        }

        player.upgrade_points -= 1;
        player.last_upgrade = Some(tick);
        delta.upgrade_points = Some(player.upgrade_points);
        outbox.to_player(pid, ServerEvent::HeroUpdate(delta));
        Ok(())
    }

    /// Chat is out-of-band: broadcast immediately, never batched into a tick
    fn handle_chat(&mut self, pid: PlayerId, message: String) -> Result<()> {
        let Some(player) = self.players.get(&pid) else {
            return Ok(());
        };
        self.outbox.to_all(ServerEvent::Chat {
            id: pid,
            name: player.name.clone(),
            color: player.color.clone(),
            message,
        });
        Ok(())
    }

    /// Synchronously detach the player before the next tick can run
    fn handle_disconnect(&mut self, pid: PlayerId) -> Result<()> {
        let Self {
            world,
            players,
            outbox,
            ..
        } = self;

        let Some(player) = players.remove(&pid) else {
            return Ok(());
        };
        tracing::info!(player = pid.0, "client disconnected");

        if player.attached {
            if let Some(region) = world.region_mut(&player.region) {
                if let Some(area) = region.area_mut(player.area_index) {
                    area.remove_player(pid);
                }
                region.sweep(&[player.area_index]);
            }
            outbox.to_all(ServerEvent::PlayerDisconnected { id: pid });
            outbox.to_all(ServerEvent::LeaderboardUpdate(leaderboard_entries(
                world, players,
            )));
        }
        Ok(())
    }

    /// Apply one queued transition: move the player between area rosters,
    /// place them by the rule for the transition kind, pay one-time
    /// completion XP, notify both audiences, and sweep the vacated and
    /// adjacent areas for unload.
    pub fn apply_move(&mut self, mv: PendingMove) -> Result<()> {
        let Self {
            config,
            world,
            players,
            ids,
            rng,
            outbox,
            current_tick,
            ..
        } = self;
        let tick = *current_tick;
        let pid = mv.player;

        let Some(player) = players.get(&pid) else {
            return Ok(());
        };
        if !player.attached {
            return Ok(());
        }
        // A death resolved later in the same tick cancels a queued zone or
        // portal move; only the respawn relocation runs for dead players
        if !player.is_alive() && !matches!(mv.kind, TransitionKind::Respawn) {
            return Ok(());
        }
        let origin_region = player.region.clone();
        let origin_index = player.area_index;
        let old_position = player.position;
        let radius = player.radius;

        let Some(origin_bounds) = world
            .region(&origin_region)
            .and_then(|r| r.area(origin_index))
            .map(|a| a.bounds)
        else {
            return Ok(());
        };

        // Resolve the destination; an impossible transition is ignored
        let (dest_region_name, dest_index, rule, award_completion, clear_death) = match mv.kind {
            TransitionKind::NextArea => {
                let dest = origin_index + 1;
                let exists = world
                    .region(&origin_region)
                    .is_some_and(|r| r.has_template(dest));
                if !exists {
                    tracing::debug!(player = pid.0, region = %origin_region, "no next area");
                    return Ok(());
                }
                (
                    origin_region.clone(),
                    dest,
                    SpawnRule::OffsetFromEdge {
                        entered_from_left: true,
                    },
                    Some((origin_region.clone(), origin_index)),
                    false,
                )
            }
            TransitionKind::PreviousArea => {
                let Some(dest) = origin_index.checked_sub(1) else {
                    return Ok(());
                };
                (
                    origin_region.clone(),
                    dest,
                    SpawnRule::OffsetFromEdge {
                        entered_from_left: false,
                    },
                    None,
                    false,
                )
            }
            TransitionKind::Portal {
                target_region,
                fraction,
            } => (
                target_region,
                0,
                SpawnRule::PortalExit {
                    origin_region: origin_region.clone(),
                    fraction,
                },
                None,
                false,
            ),
            TransitionKind::Respawn => {
                (origin_region.clone(), 0, SpawnRule::StartZone, None, true)
            }
        };

        // Vacate the origin roster first; the destination load below must
        // not see the player in two areas at once
        if let Some(area) = world
            .region_mut(&origin_region)
            .and_then(|r| r.area_mut(origin_index))
        {
            area.remove_player(pid);
        }

        let Some(dest_region) = world.region_mut(&dest_region_name) else {
            tracing::warn!(player = pid.0, region = %dest_region_name, "transition into unknown region");
            return Ok(());
        };
        let Some(dest) = dest_region.get_or_load(dest_index, config, ids, rng)? else {
            tracing::warn!(player = pid.0, region = %dest_region_name, dest_index, "transition into absent area");
            return Ok(());
        };

        let new_position = match rule {
            SpawnRule::OffsetFromEdge { entered_from_left } => {
                let fraction = ((old_position.y - origin_bounds.min_y())
                    / origin_bounds.size.height)
                    .clamp(0.0, 1.0);
                let y = dest.bounds.min_y() + fraction * dest.bounds.size.height;
                let x = if entered_from_left {
                    dest.bounds.min_x() + config.transition_offset
                } else {
                    dest.bounds.max_x() - config.transition_offset
                };
                Vec2::new(x, y)
            }
            SpawnRule::PortalExit {
                origin_region,
                fraction,
            } => {
                let exit = dest
                    .portals
                    .iter_mut()
                    .find(|p| p.target_region == origin_region)
                    .map(|p| {
                        // Arm the return portal so landing on it cannot
                        // bounce the player straight back
                        p.suppress(tick);
                        p.exit_point(fraction, radius)
                    });
                match exit {
                    Some(point) => dest.bounds.clamp_inside(point, radius),
                    None => dest.start_zone.center(),
                }
            }
            SpawnRule::StartZone => {
                let zone = dest.start_zone;
                Vec2::new(
                    zone.min_x() + radius + rng.gen::<f32>() * (zone.size.width - 2.0 * radius),
                    zone.min_y() + radius + rng.gen::<f32>() * (zone.size.height - 2.0 * radius),
                )
            }
        };

        dest.players.push(pid);
        let snapshot = dest.snapshot();
        let roster = dest.players.clone();

        let Some(player) = players.get_mut(&pid) else {
            return Ok(());
        };
        player.region = dest_region_name.clone();
        player.area_index = dest_index;
        player.position = new_position;
        if clear_death {
            player.death_timer = -1;
        }
        let mut completion_delta = None;
        if let Some(key) = award_completion {
            // One-time payout per (region, index); repeated traversal never
            // double-pays
            let cleared_index = key.1;
            if player.completed.insert(key) {
                player.add_xp(
                    config.area_completion_xp * (cleared_index as u32 + 1),
                    config,
                );
                completion_delta = Some(player.progress_delta(config));
            }
        }
        let self_data = player.data();

        tracing::debug!(
            player = pid.0,
            from = %format!("{origin_region}:{origin_index}"),
            to = %format!("{dest_region_name}:{dest_index}"),
            "player transitioned"
        );

        outbox.to_area(
            &origin_region,
            origin_index,
            ServerEvent::PlayerLeft { id: pid },
        );
        outbox.to_player(
            pid,
            ServerEvent::AreaChanged {
                area: snapshot,
                player: self_data.clone(),
            },
        );
        let existing: Vec<_> = roster
            .iter()
            .filter(|p| **p != pid)
            .filter_map(|p| players.get(p))
            .map(|p| p.data())
            .collect();
        outbox.to_player(pid, ServerEvent::ExistingPlayers(existing));
        outbox.to_area_except(
            &dest_region_name,
            dest_index,
            pid,
            ServerEvent::PlayerJoined(self_data),
        );
        if let Some(delta) = completion_delta {
            outbox.to_player(pid, ServerEvent::HeroUpdate(delta));
        }

        // Sweep the vacated area and the two areas adjacent to the
        // destination; `sweep` refuses anything occupied
        if let Some(region) = world.region_mut(&origin_region) {
            region.sweep(&[origin_index]);
        }
        if let Some(region) = world.region_mut(&dest_region_name) {
            let mut candidates = Vec::new();
            if let Some(below) = dest_index.checked_sub(1) {
                candidates.push(below);
            }
            candidates.push(dest_index + 1);
            region.sweep(&candidates);
        }

        outbox.to_all(ServerEvent::LeaderboardUpdate(leaderboard_entries(
            world, players,
        )));
        Ok(())
    }

    /// One consolidated snapshot per loaded area, sent to that area's
    /// audience after all areas have been stepped
    pub fn broadcast_area_snapshots(&self) {
        for region in self.world.regions() {
            for area in region.loaded_areas() {
                let players: Vec<_> = area
                    .players
                    .iter()
                    .filter_map(|p| self.players.get(p))
                    .map(|p| p.data())
                    .collect();
                let entities: Vec<_> = area.entities.iter().map(|e| e.data()).collect();
                let creations: Vec<_> = area.creations.iter().map(|c| c.data()).collect();
                self.outbox
                    .to_area(&region.name, area.index, ServerEvent::PlayersUpdate(players));
                self.outbox.to_area(
                    &region.name,
                    area.index,
                    ServerEvent::EntitiesUpdate(entities),
                );
                self.outbox.to_area(
                    &region.name,
                    area.index,
                    ServerEvent::CreationsUpdate(creations),
                );
            }
        }
    }
}

/// Current standings across all loaded areas, deepest area first
pub fn leaderboard_entries(
    world: &World,
    players: &AHashMap<PlayerId, Player>,
) -> Vec<LeaderboardEntry> {
    let mut entries = Vec::new();
    for region in world.regions() {
        for area in region.loaded_areas() {
            for pid in &area.players {
                if let Some(player) = players.get(pid) {
                    entries.push(LeaderboardEntry {
                        id: player.id,
                        name: player.name.clone(),
                        region_name: region.name.clone(),
                        area_number: area.index,
                        color: player.color.clone(),
                        score: player.score,
                    });
                }
            }
        }
    }
    entries.sort_by(|a, b| {
        b.area_number
            .cmp(&a.area_number)
            .then(b.score.cmp(&a.score))
    });
    entries
}
