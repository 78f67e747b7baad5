//! Per-connection player state and the movement/progression rules
//!
//! A player object lives for the duration of its connection; it is attached
//! to an area only after an explicit spawn request and moves between area
//! rosters on transitions. Death is a countdown (`death_timer >= 0`), with
//! `-1` meaning alive.

pub mod heroes;

use ahash::AHashSet;

use crate::ability::Ability;
use crate::core::config::GameConfig;
use crate::core::types::{PlayerId, Rect, Tick, Vec2};
use crate::player::heroes::HeroDef;
use crate::protocol::{HeroDelta, InputState, PlayerData};

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub hero: u8,
    pub color: String,

    /// Current location; meaningful once `attached`
    pub region: String,
    pub area_index: usize,
    /// Set when the player has spawned into an area roster
    pub attached: bool,

    pub position: Vec2,
    pub radius: f32,
    pub base_speed: f32,

    pub energy: f32,
    pub max_energy: f32,
    /// Points per second
    pub energy_regen: f32,

    pub level: u32,
    pub xp: u32,
    /// Total XP ever earned, for the leaderboard
    pub score: u64,
    pub upgrade_points: u32,
    pub last_upgrade: Option<Tick>,

    /// -1 = alive; otherwise ticks until respawn
    pub death_timer: i32,

    pub abilities: Vec<Ability>,
    /// (region, index) pairs already paid out for completion XP
    pub completed: AHashSet<(String, usize)>,

    /// Latest buffered input, consumed at the start of each tick
    pub input: InputState,
}

impl Player {
    pub fn new(id: PlayerId, start_region: &str, hero: &HeroDef, config: &GameConfig) -> Self {
        let mut player = Self {
            id,
            name: String::new(),
            hero: hero.id,
            color: hero.color.to_string(),
            region: start_region.to_string(),
            area_index: 0,
            attached: false,
            position: Vec2::ZERO,
            radius: config.player_radius,
            base_speed: config.base_speed,
            energy: config.base_max_energy,
            max_energy: config.base_max_energy,
            energy_regen: config.base_energy_regen,
            level: 1,
            xp: 0,
            score: 0,
            upgrade_points: 0,
            last_upgrade: None,
            death_timer: -1,
            abilities: Vec::new(),
            completed: AHashSet::new(),
            input: InputState::default(),
        };
        player.assign_hero(hero);
        player
    }

    pub fn assign_hero(&mut self, hero: &HeroDef) {
        self.hero = hero.id;
        self.color = hero.color.to_string();
        self.abilities = hero.abilities.iter().map(|k| Ability::new(*k)).collect();
    }

    pub fn is_alive(&self) -> bool {
        self.death_timer < 0
    }

    /// Interpret the buffered input into a movement step and clamp the
    /// result so the player stays inside the outer border or the start zone.
    ///
    /// Speed is boosted inside the start/finish bands; key movement
    /// normalizes diagonals; analog movement scales with drag length up to
    /// the player's speed.
    pub fn apply_movement(
        &mut self,
        bounds: &Rect,
        start_zone: &Rect,
        finish_zone: &Rect,
        config: &GameConfig,
    ) {
        let boosted =
            start_zone.contains(self.position) || finish_zone.contains(self.position);
        let speed = if boosted {
            self.base_speed * config.zone_speed_multiplier
        } else {
            self.base_speed
        };

        let delta = if self.input.mouse_movement {
            let aim = self.input.mouse;
            let distance = aim.length();
            if distance > 0.0 {
                let step = (distance / config.mouse_speed_divisor).min(speed);
                aim.normalize() * step
            } else {
                Vec2::ZERO
            }
        } else {
            let keys = self.input.keys;
            let dx = (keys.right as i32 - keys.left as i32) as f32;
            let dy = (keys.down as i32 - keys.up as i32) as f32;
            let direction = Vec2::new(dx, dy);
            if direction == Vec2::ZERO {
                Vec2::ZERO
            } else {
                direction.normalize() * speed
            }
        };

        let proposed = self.position + delta;
        // One containment test: inside the border OR inside the start zone;
        // snap to the nearest valid boundary point on violation
        self.position = if bounds.contains_circle(proposed, self.radius)
            || start_zone.contains_circle(proposed, self.radius)
        {
            proposed
        } else {
            bounds.clamp_inside(proposed, self.radius)
        };
    }

    /// Regenerate toward the cap; never exceeds it
    pub fn regen_energy(&mut self, config: &GameConfig) {
        self.energy =
            (self.energy + config.regen_per_tick(self.energy_regen)).min(self.max_energy);
    }

    pub fn xp_to_next_level(&self, config: &GameConfig) -> u32 {
        config.xp_base + (self.level - 1) * config.xp_per_level
    }

    /// Add XP, looping level-ups while the threshold keeps being cleared.
    /// Returns true if at least one level was gained.
    pub fn add_xp(&mut self, amount: u32, config: &GameConfig) -> bool {
        self.xp += amount;
        self.score += amount as u64;
        let mut leveled = false;
        while self.xp >= self.xp_to_next_level(config) {
            self.xp -= self.xp_to_next_level(config);
            self.level += 1;
            self.upgrade_points += 1;
            leveled = true;
        }
        leveled
    }

    /// Progression fields for a `heroUpdate` after an XP gain
    pub fn progress_delta(&self, config: &GameConfig) -> HeroDelta {
        HeroDelta {
            xp: Some(self.xp),
            level: Some(self.level),
            xp_to_next_level: Some(self.xp_to_next_level(config)),
            upgrade_points: Some(self.upgrade_points),
            ..HeroDelta::default()
        }
    }

    pub fn data(&self) -> PlayerData {
        PlayerData {
            id: self.id,
            name: self.name.clone(),
            position: self.position,
            radius: self.radius,
            speed: self.base_speed,
            color: self.color.clone(),
            hero: self.hero,
            death_timer: self.death_timer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::heroes::HeroCatalog;
    use crate::protocol::KeyState;

    fn test_player() -> (Player, GameConfig) {
        let config = GameConfig::default();
        let catalog = HeroCatalog::with_defaults();
        let player = Player::new(PlayerId(1), "Alpha", catalog.default_hero(), &config);
        (player, config)
    }

    fn test_rects() -> (Rect, Rect, Rect) {
        (
            Rect::new(0.0, 0.0, 1000.0, 480.0),
            Rect::new(0.0, 0.0, 300.0, 480.0),
            Rect::new(700.0, 0.0, 300.0, 480.0),
        )
    }

    #[test]
    fn test_key_movement_normalizes_diagonals() {
        let (mut player, config) = test_player();
        let (bounds, start, finish) = test_rects();
        player.position = Vec2::new(500.0, 240.0);
        player.input.keys = KeyState {
            down: true,
            right: true,
            ..KeyState::default()
        };
        player.apply_movement(&bounds, &start, &finish, &config);
        let moved = player.position - Vec2::new(500.0, 240.0);
        assert!((moved.length() - config.base_speed).abs() < 1e-4);
        assert!((moved.x - moved.y).abs() < 1e-4);
    }

    #[test]
    fn test_zone_speed_boost() {
        let (mut player, config) = test_player();
        let (bounds, start, finish) = test_rects();
        player.position = Vec2::new(150.0, 240.0); // inside start zone
        player.input.keys = KeyState {
            right: true,
            ..KeyState::default()
        };
        player.apply_movement(&bounds, &start, &finish, &config);
        let moved = player.position.x - 150.0;
        assert!((moved - config.base_speed * config.zone_speed_multiplier).abs() < 1e-4);
    }

    #[test]
    fn test_analog_movement_scales_with_drag() {
        let (mut player, config) = test_player();
        let (bounds, start, finish) = test_rects();
        player.position = Vec2::new(500.0, 240.0);
        player.input.mouse_movement = true;
        // Short drag: below one full speed step
        player.input.mouse = Vec2::new(10.0, 0.0);
        player.apply_movement(&bounds, &start, &finish, &config);
        assert!((player.position.x - 501.0).abs() < 1e-4);
        // Long drag caps at the player's speed
        player.input.mouse = Vec2::new(500.0, 0.0);
        player.apply_movement(&bounds, &start, &finish, &config);
        assert!((player.position.x - 501.0 - config.base_speed).abs() < 1e-4);
    }

    #[test]
    fn test_movement_clamps_at_border() {
        let (mut player, config) = test_player();
        let (bounds, start, finish) = test_rects();
        player.position = Vec2::new(990.0, 240.0);
        player.input.keys = KeyState {
            right: true,
            ..KeyState::default()
        };
        for _ in 0..10 {
            player.apply_movement(&bounds, &start, &finish, &config);
        }
        assert_eq!(player.position.x, 1000.0 - player.radius);
    }

    #[test]
    fn test_energy_never_exceeds_cap() {
        let (mut player, config) = test_player();
        player.energy = player.max_energy - 0.01;
        for _ in 0..1000 {
            player.regen_energy(&config);
            assert!(player.energy <= player.max_energy);
        }
        assert_eq!(player.energy, player.max_energy);
    }

    #[test]
    fn test_level_up_loop_carries_overflow() {
        let (mut player, config) = test_player();
        // Level 1 threshold 20, level 2 threshold 30; 55 XP clears both
        let leveled = player.add_xp(55, &config);
        assert!(leveled);
        assert_eq!(player.level, 3);
        assert_eq!(player.xp, 5);
        assert_eq!(player.upgrade_points, 2);
        assert_eq!(player.score, 55);
    }

    #[test]
    fn test_hero_assignment_builds_ability_slots() {
        let (mut player, _config) = test_player();
        let catalog = HeroCatalog::with_defaults();
        player.assign_hero(catalog.by_name("Warden").unwrap());
        assert_eq!(player.abilities.len(), 2);
        assert_eq!(player.color, "#5cb85c");
    }
}
