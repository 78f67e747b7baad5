//! Region lifecycle: lazily loaded/unloaded areas over an ordered template
//! sequence
//!
//! Areas stream in and out based purely on occupancy, which bounds per-tick
//! work and memory to the areas that currently matter.

use ahash::AHashMap;
use rand_chacha::ChaCha8Rng;

use crate::core::config::GameConfig;
use crate::core::error::Result;
use crate::core::types::IdAllocator;
use crate::world::area::Area;
use crate::world::template::{AreaTemplate, RegionTemplate};

#[derive(Debug)]
pub struct Region {
    pub name: String,
    templates: Vec<AreaTemplate>,
    /// Loaded instances, sparse over the template indices
    areas: AHashMap<usize, Area>,
}

impl Region {
    pub fn new(template: RegionTemplate) -> Self {
        Self {
            name: template.name,
            templates: template.areas,
            areas: AHashMap::new(),
        }
    }

    pub fn area(&self, index: usize) -> Option<&Area> {
        self.areas.get(&index)
    }

    pub fn area_mut(&mut self, index: usize) -> Option<&mut Area> {
        self.areas.get_mut(&index)
    }

    pub fn has_template(&self, index: usize) -> bool {
        index < self.templates.len()
    }

    pub fn template(&self, index: usize) -> Option<&AreaTemplate> {
        self.templates.get(index)
    }

    /// Number of areas in the progression line
    pub fn area_count(&self) -> usize {
        self.templates.len()
    }

    /// Reconstruct the area from its template, regenerating the population
    /// and overwriting any prior instance. Returns `None` (with a warning)
    /// when no template exists at the index.
    pub fn load_area(
        &mut self,
        index: usize,
        config: &GameConfig,
        ids: &IdAllocator,
        rng: &mut ChaCha8Rng,
    ) -> Result<Option<&mut Area>> {
        let Some(template) = self.templates.get(index) else {
            tracing::warn!(region = %self.name, index, "no area template at requested index");
            return Ok(None);
        };
        tracing::debug!(region = %self.name, index, "loading area");
        let area = Area::from_template(template, &self.name, index, config, ids, rng)?;
        self.areas.insert(index, area);
        Ok(self.areas.get_mut(&index))
    }

    /// Existing instance if loaded, otherwise a fresh load
    pub fn get_or_load(
        &mut self,
        index: usize,
        config: &GameConfig,
        ids: &IdAllocator,
        rng: &mut ChaCha8Rng,
    ) -> Result<Option<&mut Area>> {
        if !self.areas.contains_key(&index) {
            return self.load_area(index, config, ids, rng);
        }
        Ok(self.areas.get_mut(&index))
    }

    /// Remove the area if it has no players; occupied or absent areas are a
    /// logged no-op, never an error.
    pub fn unload_area(&mut self, index: usize) {
        match self.areas.get(&index) {
            Some(area) if area.players.is_empty() => {
                tracing::debug!(region = %self.name, index, "unloading area");
                self.areas.remove(&index);
            }
            Some(area) => {
                tracing::debug!(
                    region = %self.name,
                    index,
                    players = area.players.len(),
                    "skipping unload of occupied area"
                );
            }
            None => {
                tracing::debug!(region = %self.name, index, "unload requested for unloaded area");
            }
        }
    }

    /// Unload every listed index that is loaded and empty
    pub fn sweep(&mut self, indices: &[usize]) {
        for &index in indices {
            if self.areas.contains_key(&index) {
                self.unload_area(index);
            }
        }
    }

    pub fn loaded_areas(&self) -> impl Iterator<Item = &Area> {
        self.areas.values()
    }

    pub fn loaded_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.areas.keys().copied().collect();
        indices.sort_unstable();
        indices
    }
}
