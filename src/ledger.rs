//! Lazy resource ledger.
//!
//! A village's stock is only stored at its checkpoint. Current quantities are
//! integrated from the checkpoint to the requested instant using the hourly
//! rates implied by the village's fields, bonuses, population, and home
//! troops. Nothing advances resources in the background: callers `commit`
//! before any deduction or credit so that it applies to up-to-date totals.
//!
//! Quantities are fractional only while integrating; every value that leaves
//! this module is floored.

use rayon::prelude::*;
use serde::Serialize;

use crate::data::field_production;
use crate::error::{GameError, GameResult};
use crate::model::{
    Player, ResourceKind, Resources, Timestamp, TroopStatus, VillageId, World, ALL_RESOURCES,
};

/// Bonus tiles beyond this many owned ones are ignored.
pub const MAX_BONUS_TILES: usize = 3;

/// Signed hourly rates. Crop goes negative when upkeep exceeds production.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HourlyRates {
    pub wood: i64,
    pub clay: i64,
    pub iron: i64,
    pub crop: i64,
}

impl HourlyRates {
    pub fn get(&self, kind: ResourceKind) -> i64 {
        match kind {
            ResourceKind::Wood => self.wood,
            ResourceKind::Clay => self.clay,
            ResourceKind::Iron => self.iron,
            ResourceKind::Crop => self.crop,
        }
    }
}

/// A village's resources as of `at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSnapshot {
    pub village: VillageId,
    pub at: Timestamp,
    pub quantities: Resources,
    pub warehouse_capacity: u64,
    pub granary_capacity: u64,
    /// Hourly production after bonuses, before upkeep.
    pub production: Resources,
    pub net_rates: HourlyRates,
    pub crop_upkeep: u64,
}

/// Computes the village's resources at `now` without touching the world.
pub fn compute_current(world: &World, village_id: VillageId, now: Timestamp) -> GameResult<ResourceSnapshot> {
    let village = world.village(village_id)?;
    let player = world.player(village.owner)?;

    let mut gross = [0.0f64; 4];
    for slot in &village.fields {
        if slot.level == 0 || slot.is_upgrading() {
            continue;
        }
        if let Some(kind) = slot.structure.and_then(|s| s.info().produces) {
            gross[kind as usize] += field_production(slot.level, slot.base_rate);
        }
    }

    let mut tile_percent = [0u32; 4];
    for oasis in world
        .oases_of(village_id)
        .filter(|o| !o.bonuses.is_empty())
        .take(MAX_BONUS_TILES)
    {
        for bonus in &oasis.bonuses {
            let slot = &mut tile_percent[bonus.resource as usize];
            *slot = slot.saturating_add(bonus.percent);
        }
    }

    let production = boosted(&gross, &tile_percent, player, now);
    let crop_upkeep = crop_upkeep(world, village_id)?;
    let net_rates = net(&production, crop_upkeep);

    let (warehouse_capacity, granary_capacity) = village.storage_capacities();
    let capacity = |kind: ResourceKind| match kind {
        ResourceKind::Crop => granary_capacity,
        _ => warehouse_capacity,
    };
    let mut stock = [0.0f64; 4];
    for kind in ALL_RESOURCES {
        stock[kind as usize] = village.resources.get(kind).min(capacity(kind)) as f64;
    }

    // Rates only change inside the window when a boost lapses.
    let since = village.resources_checkpoint_at.max(village.created_at);
    let mut bounds: Vec<Timestamp> = player
        .boosts
        .iter()
        .map(|b| b.expires_at)
        .filter(|&t| t > since && t < now)
        .collect();
    bounds.sort();
    bounds.dedup();
    bounds.push(now);

    let mut start = since;
    for end in bounds {
        if end <= start {
            continue;
        }
        let rates = net(&boosted(&gross, &tile_percent, player, start), crop_upkeep);
        let hours = (end - start).num_milliseconds() as f64 / 3_600_000.0;
        for kind in ALL_RESOURCES {
            let level = &mut stock[kind as usize];
            *level = (*level + rates.get(kind) as f64 * hours).clamp(0.0, capacity(kind) as f64);
        }
        start = end;
    }
    let quantities = Resources::from_fn(|kind| stock[kind as usize].floor() as u64);

    Ok(ResourceSnapshot {
        village: village_id,
        at: now,
        quantities,
        warehouse_capacity,
        granary_capacity,
        production,
        net_rates,
        crop_upkeep,
    })
}

/// Hourly production with tile bonuses and the player's boosts active at `at`.
fn boosted(gross: &[f64; 4], tile_percent: &[u32; 4], player: &Player, at: Timestamp) -> Resources {
    Resources::from_fn(|kind| {
        let percent = tile_percent[kind as usize].saturating_add(player.boost_percent(kind, at));
        let factor = 1.0 + f64::from(percent) / 100.0;
        (gross[kind as usize] * factor).floor() as u64
    })
}

fn net(production: &Resources, crop_upkeep: u64) -> HourlyRates {
    HourlyRates {
        wood: production.wood as i64,
        clay: production.clay as i64,
        iron: production.iron as i64,
        crop: production.crop as i64 - crop_upkeep as i64,
    }
}

/// Population plus the upkeep of every group idle at the village.
///
/// Cavalry upkeep is reduced by the tribe's upkeep building, if any.
pub fn crop_upkeep(world: &World, village_id: VillageId) -> GameResult<u64> {
    let village = world.village(village_id)?;
    let info = village.tribe.info();
    let reduction = info
        .upkeep_building
        .map_or(0.0, |b| village.tribe.cavalry_upkeep_reduction(village.building_level(b)));

    let troops: f64 = world
        .troops
        .at(village_id)
        .filter(|g| g.key.status == TroopStatus::Home)
        .map(|g| {
            let per_unit = f64::from(g.key.unit.info().upkeep);
            let factor = if g.key.unit.is_cavalry() { 1.0 - reduction } else { 1.0 };
            per_unit * f64::from(g.quantity) * factor
        })
        .sum();

    Ok(u64::from(village.population) + troops.floor() as u64)
}

/// Persists the current quantities and capacities and moves the checkpoint to `now`.
pub fn commit(world: &mut World, village_id: VillageId, now: Timestamp) -> GameResult<ResourceSnapshot> {
    let snapshot = compute_current(world, village_id, now)?;
    apply(world, &snapshot)?;
    Ok(snapshot)
}

fn apply(world: &mut World, snapshot: &ResourceSnapshot) -> GameResult<()> {
    let village = world.village_mut(snapshot.village)?;
    village.resources = snapshot.quantities;
    village.warehouse_capacity = snapshot.warehouse_capacity;
    village.granary_capacity = snapshot.granary_capacity;
    village.resources_checkpoint_at = village.resources_checkpoint_at.max(snapshot.at);
    Ok(())
}

/// Deducts `cost`, failing without any change if a single resource falls short.
pub fn charge(world: &mut World, village_id: VillageId, cost: &Resources, now: Timestamp) -> GameResult<Resources> {
    let snapshot = compute_current(world, village_id, now)?;
    if !snapshot.quantities.covers(cost) {
        return Err(GameError::InsufficientResources {
            needed: *cost,
            available: snapshot.quantities,
        });
    }
    apply(world, &snapshot)?;
    let village = world.village_mut(village_id)?;
    village.resources = village.resources.saturating_sub(cost);
    Ok(village.resources)
}

/// Adds `amount`, clamping each resource at its capacity.
pub fn credit(world: &mut World, village_id: VillageId, amount: &Resources, now: Timestamp) -> GameResult<Resources> {
    commit(world, village_id, now)?;
    let village = world.village_mut(village_id)?;
    for kind in ALL_RESOURCES {
        let capacity = village.capacity_for(kind);
        let stored = village.resources.get_mut(kind);
        *stored = stored.saturating_add(amount.get(kind)).min(capacity);
    }
    Ok(village.resources)
}

/// Snapshots every village at `now`, in parallel.
pub fn compute_all(world: &World, now: Timestamp) -> GameResult<Vec<ResourceSnapshot>> {
    world
        .villages
        .par_iter()
        .map(|(&id, _)| compute_current(world, id, now))
        .collect()
}
