//! Persistent entities.
//!
//! Villages with their slots, troop groups, attacks, battle reports, and the
//! `World` that holds them all together with the event queue.

pub mod attack;
pub mod resources;
pub mod troop;
pub mod village;
pub mod world;

use chrono::{DateTime, Utc};

pub use attack::{Attack, AttackKind, BattleReport, LoyaltyChange, ScoutIntel};
pub use resources::{ResourceKind, Resources, ALL_RESOURCES};
pub use troop::{Garrison, TroopGroup, TroopKey, TroopStatus, UnitCount};
pub use village::{
    Coordinates, Oasis, OasisBonus, Player, ProductionBoost, QueuedUpgrade, Slot, SlotArea,
    SlotRef, Village, FIELD_SLOTS, LAST_BUILDING_SLOT, MAX_LOYALTY, QUEUE_CAPACITY,
};
pub use world::World;

/// Wall-clock instant used for every schedule and checkpoint.
pub type Timestamp = DateTime<Utc>;

pub type PlayerId = u64;
pub type VillageId = u64;
pub type OasisId = u64;
pub type AttackId = u64;
pub type ReportId = u64;
pub type EventId = u64;
