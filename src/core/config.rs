//! Simulation configuration with documented constants
//!
//! All tuning values are collected here with explanations of their purpose
//! and how they interact with each other. Timing fields are expressed in
//! seconds and converted to ticks through `ticks()`, so the same world feels
//! identical at any tick rate.

use serde::{Deserialize, Serialize};

/// Configuration for the simulation systems
///
/// These values have been tuned to produce reasonable pacing at 60 ticks per
/// second. Changing them will affect gameplay feel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    // === SIMULATION LOOP ===
    /// Fixed simulation rate in ticks per second
    pub tick_rate: u32,

    /// Seed for the server RNG; runs with the same seed and input stream
    /// replay identically
    pub rng_seed: u64,

    // === AREA LAYOUT ===
    /// Width of the start and finish bands at the area edges (world units)
    pub start_zone_width: f32,

    /// Width of the next/previous-area trigger strips (world units)
    ///
    /// Must stay below `transition_offset` or a transition would drop the
    /// player back inside the strip that just fired.
    pub transition_zone_width: f32,

    /// Passive pellets appended to every generated area population
    pub pellet_count: usize,

    /// Maximum rejection-sampling attempts for a free position before the
    /// area is declared misconfigured
    pub position_sample_cap: u32,

    /// Default death countdown in ticks for areas whose template omits one
    pub default_death_timer: i32,

    // === PLAYERS ===
    /// Collision radius of every player circle
    pub player_radius: f32,

    /// Starting movement speed in world units per tick
    pub base_speed: f32,

    /// Speed multiplier while inside the start or finish zone
    pub zone_speed_multiplier: f32,

    /// Divisor applied to the aim-vector length for analog movement; a short
    /// drag moves slower than a long one, capped at the player's speed
    pub mouse_speed_divisor: f32,

    /// Starting energy cap
    pub base_max_energy: f32,

    /// Starting energy regeneration in points per second
    pub base_energy_regen: f32,

    /// Horizontal distance from the crossed edge at which a transitioning
    /// player re-enters, far enough that the trigger strip cannot re-fire
    pub transition_offset: f32,

    // === PROGRESSION ===
    /// XP required from level 1 to level 2
    pub xp_base: u32,

    /// Additional XP required per level beyond the first
    pub xp_per_level: u32,

    /// XP awarded the first time a player clears an area, scaled by the
    /// cleared area's index + 1
    pub area_completion_xp: u32,

    /// Minimum ticks between two upgrade-point spends by the same player
    pub upgrade_cooldown_ticks: u64,

    /// Stat upgrade step sizes and caps
    pub speed_upgrade_step: f32,
    pub max_speed: f32,
    pub energy_upgrade_step: f32,
    pub max_max_energy: f32,
    pub regen_upgrade_step: f32,
    pub max_energy_regen: f32,

    // === PORTALS ===
    /// Seconds a portal refuses to re-trigger after teleporting someone
    pub portal_cooldown_secs: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            rng_seed: 0,

            start_zone_width: 300.0,
            transition_zone_width: 50.0,
            pellet_count: 10,
            position_sample_cap: 200,
            default_death_timer: 180,

            player_radius: 15.0,
            base_speed: 2.5,
            zone_speed_multiplier: 1.5,
            mouse_speed_divisor: 10.0,
            base_max_energy: 100.0,
            base_energy_regen: 1.0,
            transition_offset: 80.0,

            xp_base: 20,
            xp_per_level: 10,
            area_completion_xp: 10,
            upgrade_cooldown_ticks: 3,
            speed_upgrade_step: 0.5,
            max_speed: 6.0,
            energy_upgrade_step: 5.0,
            max_max_energy: 200.0,
            regen_upgrade_step: 0.5,
            max_energy_regen: 5.0,

            portal_cooldown_secs: 1.0,
        }
    }
}

impl GameConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML, falling back to defaults for absent fields
    pub fn from_toml(text: &str) -> crate::core::error::Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Convert a duration in seconds to whole ticks (at least 1)
    pub fn ticks(&self, seconds: f32) -> u64 {
        ((seconds * self.tick_rate as f32).round() as u64).max(1)
    }

    /// Energy regenerated per tick from a per-second rate
    pub fn regen_per_tick(&self, per_second: f32) -> f32 {
        per_second / self.tick_rate as f32
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> crate::core::error::Result<()> {
        use crate::core::error::GameError;

        if self.tick_rate == 0 {
            return Err(GameError::InvalidConfig("tick_rate must be > 0".into()));
        }

        // A transition must land the player outside the trigger strip,
        // including the radius margin used by the zone test.
        if self.transition_offset <= self.transition_zone_width + self.player_radius {
            return Err(GameError::InvalidConfig(format!(
                "transition_offset ({}) must exceed transition_zone_width + player_radius ({})",
                self.transition_offset,
                self.transition_zone_width + self.player_radius
            )));
        }

        if self.zone_speed_multiplier < 1.0 {
            return Err(GameError::InvalidConfig(
                "zone_speed_multiplier must be >= 1.0".into(),
            ));
        }

        if self.position_sample_cap == 0 {
            return Err(GameError::InvalidConfig(
                "position_sample_cap must be > 0".into(),
            ));
        }

        if self.xp_base == 0 {
            return Err(GameError::InvalidConfig("xp_base must be > 0".into()));
        }

        Ok(())
    }
}
