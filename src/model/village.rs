//! Players, villages, slots, and bonus tiles.

use serde::{Deserialize, Serialize};

use super::resources::{ResourceKind, Resources};
use super::{EventId, OasisId, PlayerId, Timestamp, VillageId};
use crate::data::{storage_capacity, Structure, Tribe, BASE_CAPACITY, FIELD_BASE_RATE, TRAPS_PER_LEVEL};

/// Number of resource fields in a newly founded village.
pub const FIELD_SLOTS: u8 = 18;
/// Building slots are numbered after the fields, up to this index inclusive.
pub const LAST_BUILDING_SLOT: u8 = 40;
/// Extra upgrades a village may queue behind the active one.
pub const QUEUE_CAPACITY: usize = 1;
pub const MAX_LOYALTY: u8 = 100;

/// Field layout of a new village: 4 woodcutters, 4 clay pits, 4 iron mines, 6 croplands.
const FIELD_LAYOUT: [(Structure, u8); 4] = [
    (Structure::Woodcutter, 4),
    (Structure::ClayPit, 4),
    (Structure::IronMine, 4),
    (Structure::Cropland, 6),
];

/// A map position. Unique per village.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: i32,
    pub y: i32,
}

impl Coordinates {
    pub const fn new(x: i32, y: i32) -> Self {
        Coordinates { x, y }
    }

    /// Euclidean distance in fields.
    pub fn distance(&self, other: &Coordinates) -> f64 {
        let dx = (i64::from(self.x) - i64::from(other.x)) as f64;
        let dy = (i64::from(self.y) - i64::from(other.y)) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A time-limited production bonus bought by a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionBoost {
    pub resource: ResourceKind,
    pub percent: u32,
    pub expires_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub tribe: Tribe,
    /// Allows one upgrade to be queued behind the active one while in the future.
    pub queue_entitlement_until: Option<Timestamp>,
    pub boosts: Vec<ProductionBoost>,
}

impl Player {
    pub fn new(id: PlayerId, name: String, tribe: Tribe) -> Self {
        Player {
            id,
            name,
            tribe,
            queue_entitlement_until: None,
            boosts: Vec::new(),
        }
    }

    pub fn has_queue_entitlement(&self, now: Timestamp) -> bool {
        self.queue_entitlement_until.is_some_and(|until| until > now)
    }

    /// Sum of the active boost percentages for `resource`.
    pub fn boost_percent(&self, resource: ResourceKind, now: Timestamp) -> u32 {
        self.boosts
            .iter()
            .filter(|b| b.resource == resource && b.expires_at > now)
            .fold(0u32, |sum, b| sum.saturating_add(b.percent))
    }
}

/// A percentage production bonus granted by an oasis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OasisBonus {
    pub resource: ResourceKind,
    pub percent: u32,
}

/// A bonus-granting map tile that a village can own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Oasis {
    pub id: OasisId,
    pub coordinates: Coordinates,
    pub owner: Option<VillageId>,
    pub bonuses: Vec<OasisBonus>,
}

/// Which slot collection a slot index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotArea {
    Field,
    Building,
}

/// Addresses a single slot of a village.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    pub area: SlotArea,
    pub index: u8,
}

impl SlotRef {
    pub const fn field(index: u8) -> Self {
        SlotRef { area: SlotArea::Field, index }
    }

    pub const fn building(index: u8) -> Self {
        SlotRef { area: SlotArea::Building, index }
    }
}

/// A resource field or building slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: u64,
    pub index: u8,
    /// `None` for an empty building slot.
    pub structure: Option<Structure>,
    pub level: u8,
    /// Hourly production of a level-1 field.
    pub base_rate: f64,
    pub upgrade_started_at: Option<Timestamp>,
    pub upgrade_ends_at: Option<Timestamp>,
    /// Completion event of the running upgrade.
    pub upgrade_event: Option<EventId>,
    /// What the running upgrade was charged, refunded on cancel.
    pub upgrade_cost: Resources,
}

impl Slot {
    fn empty(id: u64, index: u8) -> Self {
        Slot {
            id,
            index,
            structure: None,
            level: 0,
            base_rate: FIELD_BASE_RATE,
            upgrade_started_at: None,
            upgrade_ends_at: None,
            upgrade_event: None,
            upgrade_cost: Resources::ZERO,
        }
    }

    pub fn is_upgrading(&self) -> bool {
        self.upgrade_ends_at.is_some()
    }

    pub(crate) fn clear_upgrade(&mut self) {
        self.upgrade_started_at = None;
        self.upgrade_ends_at = None;
        self.upgrade_event = None;
        self.upgrade_cost = Resources::ZERO;
    }
}

/// An upgrade waiting behind the active one. Its cost is already paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedUpgrade {
    pub slot: SlotRef,
    pub structure: Structure,
    pub level: u8,
    pub cost: Resources,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Village {
    pub id: VillageId,
    pub owner: PlayerId,
    pub name: String,
    pub coordinates: Coordinates,
    pub tribe: Tribe,
    pub population: u32,
    pub loyalty: u8,
    pub resources: Resources,
    pub warehouse_capacity: u64,
    pub granary_capacity: u64,
    pub resources_checkpoint_at: Timestamp,
    pub created_at: Timestamp,
    pub fields: Vec<Slot>,
    pub buildings: Vec<Slot>,
    pub build_queue: Vec<QueuedUpgrade>,
}

impl Village {
    /// Founds a village with level-0 fields and a level-1 main building.
    ///
    /// `next_id` hands out slot ids.
    pub fn found(
        id: VillageId,
        owner: PlayerId,
        name: String,
        coordinates: Coordinates,
        tribe: Tribe,
        now: Timestamp,
        mut next_id: impl FnMut() -> u64,
    ) -> Self {
        let mut fields = Vec::with_capacity(usize::from(FIELD_SLOTS));
        for (structure, count) in FIELD_LAYOUT {
            for _ in 0..count {
                let mut slot = Slot::empty(next_id(), fields.len() as u8 + 1);
                slot.structure = Some(structure);
                fields.push(slot);
            }
        }

        let mut buildings = Vec::new();
        for index in FIELD_SLOTS + 1..=LAST_BUILDING_SLOT {
            buildings.push(Slot::empty(next_id(), index));
        }
        buildings[0].structure = Some(Structure::MainBuilding);
        buildings[0].level = 1;

        let mut village = Village {
            id,
            owner,
            name,
            coordinates,
            tribe,
            population: 0,
            loyalty: MAX_LOYALTY,
            resources: Resources::ZERO,
            warehouse_capacity: BASE_CAPACITY,
            granary_capacity: BASE_CAPACITY,
            resources_checkpoint_at: now,
            created_at: now,
            fields,
            buildings,
            build_queue: Vec::new(),
        };
        village.recompute_population();
        village
    }

    pub fn slot(&self, slot: SlotRef) -> Option<&Slot> {
        let slots = match slot.area {
            SlotArea::Field => &self.fields,
            SlotArea::Building => &self.buildings,
        };
        slots.iter().find(|s| s.index == slot.index)
    }

    pub fn slot_mut(&mut self, slot: SlotRef) -> Option<&mut Slot> {
        let slots = match slot.area {
            SlotArea::Field => &mut self.fields,
            SlotArea::Building => &mut self.buildings,
        };
        slots.iter_mut().find(|s| s.index == slot.index)
    }

    /// The slot whose upgrade is currently running, if any.
    pub fn active_upgrade(&self) -> Option<SlotRef> {
        let field = self
            .fields
            .iter()
            .find(|s| s.is_upgrading())
            .map(|s| SlotRef::field(s.index));
        field.or_else(|| {
            self.buildings
                .iter()
                .find(|s| s.is_upgrading())
                .map(|s| SlotRef::building(s.index))
        })
    }

    /// Highest completed level of `structure` among the buildings.
    pub fn building_level(&self, structure: Structure) -> u8 {
        self.buildings
            .iter()
            .filter(|s| s.structure == Some(structure))
            .map(|s| s.level)
            .max()
            .unwrap_or(0)
    }

    pub fn main_building_level(&self) -> u8 {
        self.building_level(Structure::MainBuilding)
    }

    pub fn wall_multiplier(&self) -> f64 {
        self.tribe
            .wall_multiplier(self.building_level(self.tribe.info().wall))
    }

    pub fn trap_capacity(&self) -> u32 {
        u32::from(self.building_level(Structure::Trapper)) * TRAPS_PER_LEVEL
    }

    /// Recomputes the derived population from completed levels.
    pub fn recompute_population(&mut self) {
        self.population = self
            .fields
            .iter()
            .chain(self.buildings.iter())
            .filter_map(|s| s.structure.map(|st| st.population(s.level)))
            .sum();
    }

    /// Warehouse and granary capacity implied by the current building levels.
    pub fn storage_capacities(&self) -> (u64, u64) {
        let capacity_of = |structure: Structure| {
            let total: u64 = self
                .buildings
                .iter()
                .filter(|s| s.structure == Some(structure) && s.level > 0)
                .map(|s| storage_capacity(s.level))
                .sum();
            if total == 0 {
                BASE_CAPACITY
            } else {
                total
            }
        };
        (capacity_of(Structure::Warehouse), capacity_of(Structure::Granary))
    }

    /// Capacity that bounds `resource`.
    pub fn capacity_for(&self, resource: ResourceKind) -> u64 {
        match resource {
            ResourceKind::Crop => self.granary_capacity,
            _ => self.warehouse_capacity,
        }
    }
}
