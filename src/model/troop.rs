//! Troop groups and the arena that stores them.
//!
//! A group is identified by its full `TroopKey`: location, owner, unit type,
//! status and, for moving groups, destination and arrival time. Inserting a
//! quantity under an existing key merges into that group; removing the last
//! unit deletes it, so zero-quantity groups are never stored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Timestamp, VillageId};
use crate::data::UnitType;
use crate::error::{GameError, GameResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TroopStatus {
    Home,
    Attacking,
    Reinforcing,
    Returning,
    Trapped,
}

impl TroopStatus {
    /// Moving groups carry a destination and an arrival time.
    pub const fn is_travelling(self) -> bool {
        matches!(
            self,
            TroopStatus::Attacking | TroopStatus::Reinforcing | TroopStatus::Returning
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TroopKey {
    /// Where the group is, or where it set out from while moving.
    pub village: VillageId,
    /// The village the troops belong to.
    pub owner: VillageId,
    pub unit: UnitType,
    pub status: TroopStatus,
    pub destination: Option<VillageId>,
    pub arrives_at: Option<Timestamp>,
}

impl TroopKey {
    /// Troops at home in their own village.
    pub const fn home(village: VillageId, unit: UnitType) -> Self {
        Self::stationed(village, village, unit)
    }

    /// Troops idle at `host`, owned by `owner` (reinforcements when they differ).
    pub const fn stationed(host: VillageId, owner: VillageId, unit: UnitType) -> Self {
        TroopKey {
            village: host,
            owner,
            unit,
            status: TroopStatus::Home,
            destination: None,
            arrives_at: None,
        }
    }

    pub const fn trapped(host: VillageId, owner: VillageId, unit: UnitType) -> Self {
        TroopKey {
            village: host,
            owner,
            unit,
            status: TroopStatus::Trapped,
            destination: None,
            arrives_at: None,
        }
    }

    /// A group on the move from `from` to `destination`.
    pub fn travelling(
        from: VillageId,
        owner: VillageId,
        unit: UnitType,
        status: TroopStatus,
        destination: VillageId,
        arrives_at: Timestamp,
    ) -> Self {
        debug_assert!(status.is_travelling());
        TroopKey {
            village: from,
            owner,
            unit,
            status,
            destination: Some(destination),
            arrives_at: Some(arrives_at),
        }
    }

    /// Same key with a different unit type.
    pub fn with_unit(self, unit: UnitType) -> Self {
        TroopKey { unit, ..self }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopGroup {
    pub id: u64,
    pub key: TroopKey,
    pub quantity: u32,
}

/// A unit type and a count, as carried in attack manifests and battle reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitCount {
    pub unit: UnitType,
    pub quantity: u32,
}

impl UnitCount {
    pub const fn new(unit: UnitType, quantity: u32) -> Self {
        UnitCount { unit, quantity }
    }
}

/// Arena of troop groups keyed by their composite identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "GarrisonRepr", into = "GarrisonRepr")]
pub struct Garrison {
    groups: BTreeMap<TroopKey, TroopGroup>,
    next_id: u64,
}

#[derive(Serialize, Deserialize)]
struct GarrisonRepr {
    next_id: u64,
    groups: Vec<TroopGroup>,
}

impl From<GarrisonRepr> for Garrison {
    fn from(repr: GarrisonRepr) -> Self {
        let groups = repr.groups.into_iter().map(|g| (g.key, g)).collect();
        Garrison {
            groups,
            next_id: repr.next_id,
        }
    }
}

impl From<Garrison> for GarrisonRepr {
    fn from(garrison: Garrison) -> Self {
        GarrisonRepr {
            next_id: garrison.next_id,
            groups: garrison.groups.into_values().collect(),
        }
    }
}

impl Garrison {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `quantity` units under `key`, merging with an existing group.
    pub fn add(&mut self, key: TroopKey, quantity: u32) {
        if quantity == 0 {
            return;
        }
        if let Some(group) = self.groups.get_mut(&key) {
            group.quantity += quantity;
            return;
        }
        self.next_id += 1;
        self.groups.insert(
            key,
            TroopGroup {
                id: self.next_id,
                key,
                quantity,
            },
        );
    }

    /// Removes `quantity` units from the group under `key`.
    ///
    /// Fails without touching the group if it holds fewer units.
    pub fn remove(&mut self, key: &TroopKey, quantity: u32) -> GameResult<()> {
        let available = self.quantity(key);
        if available < quantity {
            return Err(GameError::InsufficientTroops {
                unit: key.unit,
                requested: quantity,
                available,
            });
        }
        if quantity == 0 {
            return Ok(());
        }
        if available == quantity {
            self.groups.remove(key);
        } else if let Some(group) = self.groups.get_mut(key) {
            group.quantity -= quantity;
        }
        Ok(())
    }

    /// Moves `quantity` units from one key to another.
    pub fn transfer(&mut self, from: &TroopKey, to: TroopKey, quantity: u32) -> GameResult<()> {
        self.remove(from, quantity)?;
        self.add(to, quantity);
        Ok(())
    }

    /// Removes and returns the whole group under `key`.
    pub fn take(&mut self, key: &TroopKey) -> Option<TroopGroup> {
        self.groups.remove(key)
    }

    pub fn quantity(&self, key: &TroopKey) -> u32 {
        self.groups.get(key).map_or(0, |g| g.quantity)
    }

    pub fn get(&self, key: &TroopKey) -> Option<&TroopGroup> {
        self.groups.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TroopGroup> {
        self.groups.values()
    }

    /// Groups located at `village`, in key order.
    pub fn at(&self, village: VillageId) -> impl Iterator<Item = &TroopGroup> {
        self.groups.values().filter(move |g| g.key.village == village)
    }

    /// Keys of every group matching `pred`.
    pub fn keys_where(&self, pred: impl Fn(&TroopKey) -> bool) -> Vec<TroopKey> {
        self.groups.keys().filter(|k| pred(k)).copied().collect()
    }

    /// Units at home in their own village.
    pub fn own_home_units(&self, village: VillageId) -> Vec<UnitCount> {
        self.at(village)
            .filter(|g| g.key.status == TroopStatus::Home && g.key.owner == village)
            .map(|g| UnitCount::new(g.key.unit, g.quantity))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
