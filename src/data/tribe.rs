//! Tribes and their balance constants.
//!
//! Each tribe has its own wall, merchant profile, and (for Romans) a
//! building that lowers the crop upkeep of cavalry.

use serde::{Deserialize, Serialize};

use super::structure::Structure;

/// A playable tribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Tribe {
    Roman = 0,
    Teuton = 1,
    Gaul = 2,
}

/// All tribes, in discriminant order.
pub const ALL_TRIBES: [Tribe; 3] = [Tribe::Roman, Tribe::Teuton, Tribe::Gaul];

/// Per-tribe constants.
#[derive(Debug, Clone, Copy)]
pub struct TribeInfo {
    pub name: &'static str,
    pub wall: Structure,
    /// Defence multiplier base; raised to the wall level.
    pub wall_factor: f64,
    /// Structure whose level reduces cavalry upkeep, if the tribe has one.
    pub upkeep_building: Option<Structure>,
    /// Upkeep reduction per level of `upkeep_building`.
    pub cavalry_upkeep_reduction_per_level: f64,
    pub cavalry_upkeep_reduction_cap: f64,
    pub merchant_capacity: u64,
    /// Fields per hour.
    pub merchant_speed: f64,
}

/// Tribe table indexed by `Tribe as usize`.
pub const TRIBE_INFO: [TribeInfo; 3] = [
    TribeInfo {
        name: "roman",
        wall: Structure::CityWall,
        wall_factor: 1.030,
        upkeep_building: Some(Structure::HorseDrinkingTrough),
        cavalry_upkeep_reduction_per_level: 0.02,
        cavalry_upkeep_reduction_cap: 0.30,
        merchant_capacity: 500,
        merchant_speed: 16.0,
    },
    TribeInfo {
        name: "teuton",
        wall: Structure::EarthWall,
        wall_factor: 1.020,
        upkeep_building: None,
        cavalry_upkeep_reduction_per_level: 0.0,
        cavalry_upkeep_reduction_cap: 0.0,
        merchant_capacity: 1000,
        merchant_speed: 12.0,
    },
    TribeInfo {
        name: "gaul",
        wall: Structure::Palisade,
        wall_factor: 1.025,
        upkeep_building: None,
        cavalry_upkeep_reduction_per_level: 0.0,
        cavalry_upkeep_reduction_cap: 0.0,
        merchant_capacity: 750,
        merchant_speed: 24.0,
    },
];

impl Tribe {
    pub const fn info(self) -> &'static TribeInfo {
        &TRIBE_INFO[self as usize]
    }

    /// Parses a tribe from its lowercase name.
    pub fn from_name(s: &str) -> Option<Tribe> {
        ALL_TRIBES.iter().copied().find(|t| t.info().name == s)
    }

    /// Defence multiplier granted by a wall at `level`.
    pub fn wall_multiplier(self, level: u8) -> f64 {
        self.info().wall_factor.powi(i32::from(level))
    }

    /// Fraction of cavalry upkeep removed by the upkeep building at `level`.
    pub fn cavalry_upkeep_reduction(self, level: u8) -> f64 {
        let info = self.info();
        (info.cavalry_upkeep_reduction_per_level * f64::from(level))
            .min(info.cavalry_upkeep_reduction_cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for tribe in ALL_TRIBES {
            assert_eq!(Tribe::from_name(tribe.info().name), Some(tribe));
        }
        assert_eq!(Tribe::from_name("natar"), None);
    }

    #[test]
    fn wall_without_levels_is_neutral() {
        for tribe in ALL_TRIBES {
            assert!((tribe.wall_multiplier(0) - 1.0).abs() < 1e-12);
        }
        assert!((Tribe::Roman.wall_multiplier(2) - 1.0609).abs() < 1e-9);
    }

    #[test]
    fn cavalry_reduction_is_capped() {
        assert!((Tribe::Roman.cavalry_upkeep_reduction(5) - 0.10).abs() < 1e-12);
        assert!((Tribe::Roman.cavalry_upkeep_reduction(20) - 0.30).abs() < 1e-12);
        assert_eq!(Tribe::Teuton.cavalry_upkeep_reduction(20), 0.0);
    }
}
