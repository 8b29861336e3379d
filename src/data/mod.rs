//! Static game data.
//!
//! Immutable lookup tables for tribes, units, and structures, plus the level
//! formulas derived from them. Nothing here is part of the mutable world.

pub mod structure;
pub mod tribe;
pub mod unit;

pub use structure::{
    field_production, storage_capacity, Structure, StructureInfo, ALL_STRUCTURES,
    BASE_CAPACITY, FIELD_BASE_RATE, LEVEL_FACTOR, STRUCTURE_COUNT, STRUCTURE_INFO,
    TRAPS_PER_LEVEL,
};
pub use tribe::{Tribe, TribeInfo, ALL_TRIBES, TRIBE_INFO};
pub use unit::{UnitClass, UnitInfo, UnitType, ALL_UNITS, CHIEF_RESIDENCE_LEVEL, UNIT_COUNT, UNIT_INFO};
