//! World registry: single source of truth for where everything is
//!
//! Owns every region; constructed once from validated static data and passed
//! by reference to whatever needs it. There is no hidden global world state.

pub mod area;
pub mod portal;
pub mod region;
pub mod template;

use ahash::AHashMap;

use crate::core::config::GameConfig;
use crate::core::error::Result;
use crate::world::region::Region;
use crate::world::template::WorldData;

#[derive(Debug)]
pub struct World {
    regions: AHashMap<String, Region>,
    /// Region names in template order, for stable iteration
    order: Vec<String>,
    pub start_region: String,
}

impl World {
    /// Validate the static data and build the (initially empty) regions
    pub fn new(data: WorldData, config: &GameConfig) -> Result<Self> {
        data.validate(config)?;
        let order: Vec<String> = data.regions.iter().map(|r| r.name.clone()).collect();
        let regions = data
            .regions
            .into_iter()
            .map(|template| (template.name.clone(), Region::new(template)))
            .collect();
        Ok(Self {
            regions,
            order,
            start_region: data.start_region,
        })
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.get(name)
    }

    pub fn region_mut(&mut self, name: &str) -> Option<&mut Region> {
        self.regions.get_mut(name)
    }

    /// All regions in template order
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.order.iter().filter_map(|name| self.regions.get(name))
    }

    /// (region, index) keys of every loaded area, in stable order; the
    /// simulation loop iterates this snapshot so transitions during a tick
    /// cannot double-step a player
    pub fn loaded_area_keys(&self) -> Vec<(String, usize)> {
        let mut keys = Vec::new();
        for name in &self.order {
            if let Some(region) = self.regions.get(name) {
                for index in region.loaded_indices() {
                    keys.push((name.clone(), index));
                }
            }
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::IdAllocator;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_world_builds_from_default_data() {
        let config = GameConfig::default();
        let world = World::new(WorldData::default_world(), &config).unwrap();
        assert!(world.region("Alpha").is_some());
        assert!(world.region("Beta").is_some());
        assert_eq!(world.start_region, "Alpha");
    }

    #[test]
    fn test_loaded_area_keys_in_stable_order() {
        let config = GameConfig::default();
        let ids = IdAllocator::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut world = World::new(WorldData::default_world(), &config).unwrap();

        world
            .region_mut("Beta")
            .unwrap()
            .load_area(1, &config, &ids, &mut rng)
            .unwrap();
        world
            .region_mut("Alpha")
            .unwrap()
            .load_area(2, &config, &ids, &mut rng)
            .unwrap();
        world
            .region_mut("Alpha")
            .unwrap()
            .load_area(0, &config, &ids, &mut rng)
            .unwrap();

        assert_eq!(
            world.loaded_area_keys(),
            vec![
                ("Alpha".to_string(), 0),
                ("Alpha".to_string(), 2),
                ("Beta".to_string(), 1),
            ]
        );
    }
}
