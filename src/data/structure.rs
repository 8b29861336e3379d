//! Resource fields and buildings.
//!
//! Structure metadata (cost, build time, level cap, population) lives in a
//! compile-time table indexed by the `Structure` discriminant, alongside the
//! level formulas shared by the ledger and the construction actions.

use serde::{Deserialize, Serialize};

use super::tribe::Tribe;
use crate::model::{ResourceKind, Resources};

/// Anything that can occupy a village slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Structure {
    Woodcutter = 0,
    ClayPit = 1,
    IronMine = 2,
    Cropland = 3,
    MainBuilding = 4,
    Warehouse = 5,
    Granary = 6,
    Barracks = 7,
    Stable = 8,
    Residence = 9,
    Marketplace = 10,
    RallyPoint = 11,
    CityWall = 12,
    EarthWall = 13,
    Palisade = 14,
    Trapper = 15,
    HorseDrinkingTrough = 16,
}

pub const STRUCTURE_COUNT: usize = 17;

pub const ALL_STRUCTURES: [Structure; STRUCTURE_COUNT] = [
    Structure::Woodcutter,
    Structure::ClayPit,
    Structure::IronMine,
    Structure::Cropland,
    Structure::MainBuilding,
    Structure::Warehouse,
    Structure::Granary,
    Structure::Barracks,
    Structure::Stable,
    Structure::Residence,
    Structure::Marketplace,
    Structure::RallyPoint,
    Structure::CityWall,
    Structure::EarthWall,
    Structure::Palisade,
    Structure::Trapper,
    Structure::HorseDrinkingTrough,
];

/// Static metadata for a structure.
#[derive(Debug, Clone, Copy)]
pub struct StructureInfo {
    pub name: &'static str,
    /// The resource this structure produces, for fields.
    pub produces: Option<ResourceKind>,
    /// Cost of level 1; higher levels scale from here.
    pub base_cost: Resources,
    /// Seconds to build level 1 at world speed 1 with a level-1 main building.
    pub base_secs: f64,
    pub max_level: u8,
    pub population_per_level: u32,
    /// Restricts construction to one tribe.
    pub tribe: Option<Tribe>,
}

const fn field(name: &'static str, kind: ResourceKind, cost: Resources, secs: f64) -> StructureInfo {
    StructureInfo {
        name,
        produces: Some(kind),
        base_cost: cost,
        base_secs: secs,
        max_level: 20,
        population_per_level: 1,
        tribe: None,
    }
}

const fn building(
    name: &'static str,
    cost: Resources,
    secs: f64,
    population_per_level: u32,
    tribe: Option<Tribe>,
) -> StructureInfo {
    StructureInfo {
        name,
        produces: None,
        base_cost: cost,
        base_secs: secs,
        max_level: 20,
        population_per_level,
        tribe,
    }
}

/// Structure table indexed by `Structure as usize`.
pub const STRUCTURE_INFO: [StructureInfo; STRUCTURE_COUNT] = [
    field("woodcutter", ResourceKind::Wood, Resources::new(40, 100, 50, 60), 260.0),
    field("clay_pit", ResourceKind::Clay, Resources::new(80, 40, 80, 50), 220.0),
    field("iron_mine", ResourceKind::Iron, Resources::new(100, 80, 30, 60), 450.0),
    field("cropland", ResourceKind::Crop, Resources::new(70, 90, 70, 20), 150.0),
    building("main_building", Resources::new(70, 40, 60, 20), 2620.0, 2, None),
    building("warehouse", Resources::new(130, 160, 90, 40), 2000.0, 1, None),
    building("granary", Resources::new(80, 100, 70, 20), 1600.0, 1, None),
    building("barracks", Resources::new(210, 140, 260, 120), 2000.0, 4, None),
    building("stable", Resources::new(260, 140, 220, 100), 2200.0, 5, None),
    building("residence", Resources::new(580, 460, 350, 180), 2000.0, 1, None),
    building("marketplace", Resources::new(80, 70, 120, 70), 1800.0, 4, None),
    building("rally_point", Resources::new(110, 160, 90, 70), 2000.0, 1, None),
    building("city_wall", Resources::new(70, 90, 170, 70), 2000.0, 0, Some(Tribe::Roman)),
    building("earth_wall", Resources::new(120, 200, 0, 80), 2000.0, 0, Some(Tribe::Teuton)),
    building("palisade", Resources::new(160, 100, 0, 60), 2000.0, 0, Some(Tribe::Gaul)),
    building("trapper", Resources::new(100, 100, 100, 100), 2000.0, 4, Some(Tribe::Gaul)),
    building(
        "horse_drinking_trough",
        Resources::new(780, 420, 660, 540),
        2200.0,
        5,
        Some(Tribe::Roman),
    ),
];

/// Hourly production of a field relative to its base rate, by level.
pub const LEVEL_FACTOR: [f64; 21] = [
    0.0, 1.0, 1.8, 3.0, 4.4, 6.6, 10.0, 14.0, 20.0, 29.0, 40.0, 56.0, 75.0, 99.0, 127.0, 160.0,
    200.0, 260.0, 320.0, 400.0, 490.0,
];

/// Hourly production of a level-1 field.
pub const FIELD_BASE_RATE: f64 = 5.0;

/// Storage of a village without a warehouse or granary.
pub const BASE_CAPACITY: u64 = 800;

/// Trap slots per Trapper level.
pub const TRAPS_PER_LEVEL: u32 = 10;

impl Structure {
    pub const fn info(self) -> &'static StructureInfo {
        &STRUCTURE_INFO[self as usize]
    }

    pub const fn is_field(self) -> bool {
        self.info().produces.is_some()
    }

    /// Parses a structure from its snake_case name.
    pub fn from_name(s: &str) -> Option<Structure> {
        ALL_STRUCTURES.iter().copied().find(|st| st.info().name == s)
    }

    /// Cost of raising this structure to `level`.
    pub fn cost(self, level: u8) -> Resources {
        let factor = 1.28f64.powi(i32::from(level.max(1)) - 1);
        self.info().base_cost.scaled(factor)
    }

    /// Seconds needed to raise this structure to `level`.
    pub fn build_secs(self, level: u8, main_building_level: u8, speed: f64) -> f64 {
        let level_factor = 1.16f64.powi(i32::from(level.max(1)) - 1);
        let main_factor = 0.964f64.powi(i32::from(main_building_level.max(1)) - 1);
        self.info().base_secs * level_factor * main_factor / speed
    }

    /// Total population supported by this structure at `level`.
    pub fn population(self, level: u8) -> u32 {
        self.info().population_per_level * u32::from(level)
    }
}

/// Hourly production of a field at `level` with the given base rate.
pub fn field_production(level: u8, base_rate: f64) -> f64 {
    let idx = usize::from(level).min(LEVEL_FACTOR.len() - 1);
    base_rate * LEVEL_FACTOR[idx]
}

/// Storage capacity of a warehouse or granary at `level`.
pub fn storage_capacity(level: u8) -> u64 {
    if level == 0 {
        return BASE_CAPACITY;
    }
    let hundreds = (21.2 * 1.2f64.powi(i32::from(level)) - 13.2).floor();
    hundreds as u64 * 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_in_discriminant_order() {
        for (i, st) in ALL_STRUCTURES.iter().enumerate() {
            assert_eq!(*st as usize, i);
            assert_eq!(Structure::from_name(st.info().name), Some(*st));
        }
    }

    #[test]
    fn only_fields_produce() {
        assert!(Structure::Cropland.is_field());
        assert!(!Structure::Warehouse.is_field());
        assert_eq!(Structure::IronMine.info().produces, Some(ResourceKind::Iron));
    }

    #[test]
    fn level_one_field_yields_base_rate() {
        assert_eq!(field_production(0, FIELD_BASE_RATE), 0.0);
        assert_eq!(field_production(1, FIELD_BASE_RATE), 5.0);
        assert_eq!(field_production(2, FIELD_BASE_RATE), 9.0);
    }

    #[test]
    fn capacity_grows_exponentially() {
        assert_eq!(storage_capacity(0), 800);
        assert_eq!(storage_capacity(1), 1200);
        assert_eq!(storage_capacity(2), 1700);
        assert_eq!(storage_capacity(20), 79900);
        for level in 1..20u8 {
            assert!(storage_capacity(level + 1) > storage_capacity(level));
        }
    }

    #[test]
    fn costs_scale_from_base() {
        assert_eq!(Structure::Woodcutter.cost(1), Resources::new(40, 100, 50, 60));
        assert_eq!(Structure::Woodcutter.cost(2), Resources::new(51, 128, 64, 76));
    }

    #[test]
    fn main_building_shortens_construction() {
        let slow = Structure::Warehouse.build_secs(3, 1, 1.0);
        let fast = Structure::Warehouse.build_secs(3, 10, 1.0);
        assert!(fast < slow);
        let doubled = Structure::Warehouse.build_secs(3, 1, 2.0);
        assert!((doubled * 2.0 - slow).abs() < 1e-9);
    }
}
