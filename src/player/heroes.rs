//! Static hero catalog
//!
//! Heroes bundle an identity (name, color) with an ordered ability list and
//! are assigned to a player at spawn time. The catalog is validated at
//! startup so a dangling hero reference cannot reach the session handlers.

use crate::ability::AbilityKind;
use crate::core::error::{GameError, Result};

#[derive(Debug, Clone)]
pub struct HeroDef {
    pub id: u8,
    pub name: &'static str,
    pub color: &'static str,
    pub abilities: Vec<AbilityKind>,
}

#[derive(Debug, Clone)]
pub struct HeroCatalog {
    heroes: Vec<HeroDef>,
}

impl HeroCatalog {
    pub fn with_defaults() -> Self {
        Self {
            heroes: vec![
                HeroDef {
                    id: 0,
                    name: "Vanguard",
                    color: "#4a90d9",
                    abilities: vec![AbilityKind::IceWall],
                },
                HeroDef {
                    id: 1,
                    name: "Tempest",
                    color: "#d94a90",
                    abilities: vec![AbilityKind::Magnetize],
                },
                HeroDef {
                    id: 2,
                    name: "Warden",
                    color: "#5cb85c",
                    abilities: vec![AbilityKind::IceWall, AbilityKind::Magnetize],
                },
            ],
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.heroes.is_empty() {
            return Err(GameError::InvalidConfig("hero catalog is empty".into()));
        }
        let mut ids = std::collections::HashSet::new();
        let mut names = std::collections::HashSet::new();
        for hero in &self.heroes {
            if !ids.insert(hero.id) {
                return Err(GameError::InvalidConfig(format!(
                    "duplicate hero id: {}",
                    hero.id
                )));
            }
            if !names.insert(hero.name) {
                return Err(GameError::InvalidConfig(format!(
                    "duplicate hero name: {}",
                    hero.name
                )));
            }
        }
        Ok(())
    }

    pub fn by_id(&self, id: u8) -> Option<&HeroDef> {
        self.heroes.iter().find(|h| h.id == id)
    }

    pub fn by_name(&self, name: &str) -> Option<&HeroDef> {
        self.heroes.iter().find(|h| h.name == name)
    }

    /// Assigned to freshly connected players before they pick one
    pub fn default_hero(&self) -> &HeroDef {
        &self.heroes[0]
    }
}
