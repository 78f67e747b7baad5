//! Static world data: regions, area templates, entity populations, portals
//!
//! Templates are plain serde types loaded from JSON (or the built-in default
//! world). Everything is validated up front so a typo'd entity kind or a
//! portal to a missing region is a load-time error, never a silent runtime
//! skip.

use serde::{Deserialize, Serialize};

use crate::core::config::GameConfig;
use crate::core::error::{GameError, Result};
use crate::core::types::{Size, Vec2};
use crate::entity::EntityKind;

/// Complete static description of the game world
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldData {
    /// Region new players are placed in
    pub start_region: String,
    pub regions: Vec<RegionTemplate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionTemplate {
    pub name: String,
    /// Ordered sequence of areas forming the region's progression line
    pub areas: Vec<AreaTemplate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaTemplate {
    #[serde(default)]
    pub position: Vec2,
    pub size: Size,
    #[serde(default = "default_background")]
    pub background: String,
    /// Death countdown in ticks; falls back to the configured default
    #[serde(default)]
    pub death_timer: Option<i32>,
    #[serde(default)]
    pub entities: Vec<EntityTemplate>,
    #[serde(default)]
    pub portals: Vec<PortalTemplate>,
}

fn default_background() -> String {
    "black".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityTemplate {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    #[serde(default = "default_amount")]
    pub amount: u32,
    #[serde(default)]
    pub speed: Option<f32>,
    #[serde(default)]
    pub radius: Option<f32>,
    #[serde(default)]
    pub position: SpawnPosition,
}

fn default_amount() -> u32 {
    1
}

/// Starting-position policy: a keyword or a fixed point passed through
/// verbatim
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpawnPosition {
    Policy(PositionPolicy),
    Fixed(Vec2),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionPolicy {
    Random,
    Wall,
}

impl Default for SpawnPosition {
    fn default() -> Self {
        SpawnPosition::Policy(PositionPolicy::Random)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalTemplate {
    pub target_region: String,
    pub position: Vec2,
    #[serde(default = "default_portal_size")]
    pub size: Size,
    #[serde(default)]
    pub exit_offset_y: f32,
}

fn default_portal_size() -> Size {
    Size::new(250.0, 50.0)
}

impl WorldData {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Check cross-references and geometric feasibility before anything is
    /// instantiated
    pub fn validate(&self, config: &GameConfig) -> Result<()> {
        if self.regions.is_empty() {
            return Err(GameError::InvalidWorld("world has no regions".into()));
        }

        let mut names = std::collections::HashSet::new();
        for region in &self.regions {
            if !names.insert(region.name.as_str()) {
                return Err(GameError::InvalidWorld(format!(
                    "duplicate region name: {}",
                    region.name
                )));
            }
        }

        if !names.contains(self.start_region.as_str()) {
            return Err(GameError::InvalidWorld(format!(
                "start region {} does not exist",
                self.start_region
            )));
        }

        // Rejection sampling needs free interior outside the edge bands; the
        // retry cap in `sample_position` backstops anything this misses.
        let min_width = 2.0 * config.start_zone_width + 100.0;
        for region in &self.regions {
            if region.areas.is_empty() {
                return Err(GameError::InvalidWorld(format!(
                    "region {} has no areas",
                    region.name
                )));
            }
            for (index, area) in region.areas.iter().enumerate() {
                if area.size.width < min_width || area.size.height < 100.0 {
                    return Err(GameError::InvalidWorld(format!(
                        "region {} area {} is too small ({} x {}) for its reserved zones",
                        region.name, index, area.size.width, area.size.height
                    )));
                }
                if let Some(timer) = area.death_timer {
                    if timer <= 0 {
                        return Err(GameError::InvalidWorld(format!(
                            "region {} area {} has a non-positive death timer",
                            region.name, index
                        )));
                    }
                }
                for portal in &area.portals {
                    if !names.contains(portal.target_region.as_str()) {
                        return Err(GameError::InvalidWorld(format!(
                            "region {} area {} portal targets unknown region {}",
                            region.name, index, portal.target_region
                        )));
                    }
                    if portal.target_region == region.name {
                        return Err(GameError::InvalidWorld(format!(
                            "region {} area {} portal targets its own region",
                            region.name, index
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// The built-in two-region world used when no world file is given
    pub fn default_world() -> Self {
        let area = |entities: Vec<EntityTemplate>, portals: Vec<PortalTemplate>| AreaTemplate {
            position: Vec2::ZERO,
            size: Size::new(1000.0, 480.0),
            background: "black".to_string(),
            death_timer: None,
            entities,
            portals,
        };
        let pack = |kind: EntityKind, amount: u32| EntityTemplate {
            kind,
            amount,
            speed: None,
            radius: None,
            position: SpawnPosition::default(),
        };

        Self {
            start_region: "Alpha".to_string(),
            regions: vec![
                RegionTemplate {
                    name: "Alpha".to_string(),
                    areas: vec![
                        area(
                            vec![pack(EntityKind::Normal, 4), pack(EntityKind::Zigzag, 2)],
                            vec![],
                        ),
                        area(
                            vec![
                                pack(EntityKind::Chaser, 2),
                                pack(EntityKind::Pulsar, 2),
                                pack(EntityKind::Mine, 3),
                            ],
                            vec![],
                        ),
                        area(
                            vec![
                                pack(EntityKind::Teleporter, 2),
                                pack(EntityKind::Ambusher, 1),
                                pack(EntityKind::Clinger, 2),
                                pack(EntityKind::Normal, 3),
                            ],
                            vec![PortalTemplate {
                                target_region: "Beta".to_string(),
                                position: Vec2::new(375.0, 10.0),
                                size: default_portal_size(),
                                exit_offset_y: 0.0,
                            }],
                        ),
                        area(
                            vec![
                                pack(EntityKind::Connectus, 4),
                                pack(EntityKind::Chaser, 2),
                                pack(EntityKind::Mine, 2),
                            ],
                            vec![],
                        ),
                    ],
                },
                RegionTemplate {
                    name: "Beta".to_string(),
                    areas: vec![
                        area(
                            vec![pack(EntityKind::Normal, 4)],
                            vec![PortalTemplate {
                                target_region: "Alpha".to_string(),
                                position: Vec2::new(375.0, 10.0),
                                size: default_portal_size(),
                                exit_offset_y: 0.0,
                            }],
                        ),
                        area(
                            vec![pack(EntityKind::Pulsar, 3), pack(EntityKind::Ambusher, 1)],
                            vec![],
                        ),
                    ],
                },
            ],
        }
    }
}
