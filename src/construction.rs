//! Upgrading fields and buildings.
//!
//! One upgrade runs per village at a time. With a queueing entitlement the
//! owner may line up `QUEUE_CAPACITY` more; queued upgrades are paid for up
//! front and their duration is computed when they actually start.

use serde::Serialize;
use serde_json::json;

use crate::clock::after;
use crate::data::Structure;
use crate::error::{GameError, GameResult};
use crate::events::{Event, EventPayload, HandlerContext};
use crate::ledger;
use crate::model::{
    EventId, QueuedUpgrade, Resources, SlotArea, SlotRef, Timestamp, VillageId, World,
    QUEUE_CAPACITY,
};

/// What a client learns after ordering an upgrade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpgradeOrder {
    pub village: VillageId,
    pub slot: SlotRef,
    pub structure: Structure,
    pub level: u8,
    pub cost: Resources,
    pub queued: bool,
    pub ends_at: Option<Timestamp>,
}

/// Upgrades the structure in `slot` by one level, or queues the upgrade.
pub fn start_upgrade(
    world: &mut World,
    village_id: VillageId,
    slot: SlotRef,
    now: Timestamp,
    speed: f64,
) -> GameResult<UpgradeOrder> {
    let village = world.village(village_id)?;
    let target = village
        .slot(slot)
        .ok_or(GameError::not_found("slot", u64::from(slot.index)))?;
    let structure = target
        .structure
        .ok_or_else(|| GameError::invalid("slot is empty"))?;
    if target.is_upgrading() {
        return Err(GameError::invalid("slot is already upgrading"));
    }
    if village.build_queue.iter().any(|q| q.slot == slot) {
        return Err(GameError::invalid("slot is already queued"));
    }
    let level = target.level + 1;
    if level > structure.info().max_level {
        return Err(GameError::MaxLevel);
    }
    let cost = structure.cost(level);

    if village.active_upgrade().is_some() {
        let entitled = world.player(village.owner)?.has_queue_entitlement(now);
        if !entitled || village.build_queue.len() >= QUEUE_CAPACITY {
            return Err(GameError::QueueFull);
        }
        ledger::charge(world, village_id, &cost, now)?;
        world.village_mut(village_id)?.build_queue.push(QueuedUpgrade {
            slot,
            structure,
            level,
            cost,
        });
        tracing::info!(village = village_id, ?slot, ?structure, level, "upgrade queued");
        return Ok(UpgradeOrder {
            village: village_id,
            slot,
            structure,
            level,
            cost,
            queued: true,
            ends_at: None,
        });
    }

    ledger::charge(world, village_id, &cost, now)?;
    let ends_at = begin(world, village_id, slot, cost, now, speed)?;
    tracing::info!(village = village_id, ?slot, ?structure, level, %ends_at, "upgrade started");
    Ok(UpgradeOrder {
        village: village_id,
        slot,
        structure,
        level,
        cost,
        queued: false,
        ends_at: Some(ends_at),
    })
}

/// Places a new building on an empty building slot and starts level 1.
pub fn start_construction(
    world: &mut World,
    village_id: VillageId,
    index: u8,
    structure: Structure,
    now: Timestamp,
    speed: f64,
) -> GameResult<UpgradeOrder> {
    if structure.is_field() {
        return Err(GameError::invalid("resource fields cannot be built on building slots"));
    }
    let slot = SlotRef::building(index);
    let village = world.village(village_id)?;
    if let Some(tribe) = structure.info().tribe {
        if tribe != village.tribe {
            return Err(GameError::invalid(format!("{} is not available to this tribe", structure.info().name)));
        }
    }
    let unique = !matches!(structure, Structure::Warehouse | Structure::Granary);
    let already_built = village
        .buildings
        .iter()
        .any(|s| s.structure == Some(structure))
        || village.build_queue.iter().any(|q| q.structure == structure);
    if unique && already_built {
        return Err(GameError::invalid(format!("{} already exists", structure.info().name)));
    }
    let target = village
        .slot(slot)
        .ok_or(GameError::not_found("slot", u64::from(index)))?;
    if target.structure.is_some() {
        return Err(GameError::invalid("slot is occupied"));
    }

    set_structure(world, village_id, slot, Some(structure))?;
    let order = start_upgrade(world, village_id, slot, now, speed);
    if order.is_err() {
        set_structure(world, village_id, slot, None)?;
    }
    order
}

fn set_structure(world: &mut World, village_id: VillageId, slot: SlotRef, structure: Option<Structure>) -> GameResult<()> {
    world
        .village_mut(village_id)?
        .slot_mut(slot)
        .ok_or(GameError::not_found("slot", u64::from(slot.index)))?
        .structure = structure;
    Ok(())
}

/// Cancels a running or queued upgrade and refunds what it cost.
///
/// A running upgrade whose completion event has already been claimed can no
/// longer be cancelled.
pub fn cancel_upgrade(
    world: &mut World,
    village_id: VillageId,
    slot: SlotRef,
    now: Timestamp,
    speed: f64,
) -> GameResult<Resources> {
    let village = world.village_mut(village_id)?;

    if let Some(pos) = village.build_queue.iter().position(|q| q.slot == slot) {
        let queued = village.build_queue.remove(pos);
        clear_if_unbuilt(world, village_id, slot)?;
        ledger::credit(world, village_id, &queued.cost, now)?;
        tracing::info!(village = village_id, ?slot, "queued upgrade cancelled");
        return Ok(queued.cost);
    }

    let target = village
        .slot(slot)
        .ok_or(GameError::not_found("slot", u64::from(slot.index)))?;
    let event = match target.upgrade_event {
        Some(event) if target.is_upgrading() => event,
        _ => return Err(GameError::invalid("nothing to cancel")),
    };
    if !world.events.cancel(event) {
        return Err(GameError::invalid("upgrade is already completing"));
    }
    // Settle while the slot still counts as upgrading.
    ledger::commit(world, village_id, now)?;

    let village = world.village_mut(village_id)?;
    let target = village
        .slot_mut(slot)
        .ok_or(GameError::not_found("slot", u64::from(slot.index)))?;
    let refund = target.upgrade_cost;
    target.clear_upgrade();
    clear_if_unbuilt(world, village_id, slot)?;
    ledger::credit(world, village_id, &refund, now)?;
    tracing::info!(village = village_id, ?slot, event, "upgrade cancelled");
    advance_queue(world, village_id, now, speed)?;
    Ok(refund)
}

fn clear_if_unbuilt(world: &mut World, village_id: VillageId, slot: SlotRef) -> GameResult<()> {
    let village = world.village_mut(village_id)?;
    let unbuilt = slot.area == SlotArea::Building
        && village.slot(slot).is_some_and(|s| s.level == 0 && !s.is_upgrading());
    if unbuilt {
        set_structure(world, village_id, slot, None)?;
    }
    Ok(())
}

/// Starts the upgrade of `slot` at `start` and schedules its completion.
fn begin(
    world: &mut World,
    village_id: VillageId,
    slot: SlotRef,
    cost: Resources,
    start: Timestamp,
    speed: f64,
) -> GameResult<Timestamp> {
    let village = world.village(village_id)?;
    let main_building = village.main_building_level();
    let target = village
        .slot(slot)
        .ok_or(GameError::not_found("slot", u64::from(slot.index)))?;
    let structure = target
        .structure
        .ok_or_else(|| GameError::invariant("upgrading an empty slot"))?;
    let level = target.level + 1;
    let ends_at = after(start, structure.build_secs(level, main_building, speed))?;

    let payload = match slot.area {
        SlotArea::Field => EventPayload::FieldComplete { slot: slot.index },
        SlotArea::Building => EventPayload::ConstructionComplete { slot: slot.index },
    };
    let event = world.events.schedule(village_id, payload, ends_at);

    let target = world
        .village_mut(village_id)?
        .slot_mut(slot)
        .ok_or(GameError::not_found("slot", u64::from(slot.index)))?;
    target.upgrade_started_at = Some(start);
    target.upgrade_ends_at = Some(ends_at);
    target.upgrade_event = Some(event);
    target.upgrade_cost = cost;
    Ok(ends_at)
}

/// Starts the next queued upgrade if nothing is running.
pub(crate) fn advance_queue(
    world: &mut World,
    village_id: VillageId,
    at: Timestamp,
    speed: f64,
) -> GameResult<Option<Timestamp>> {
    let village = world.village_mut(village_id)?;
    if village.active_upgrade().is_some() || village.build_queue.is_empty() {
        return Ok(None);
    }
    let next = village.build_queue.remove(0);
    let ends_at = begin(world, village_id, next.slot, next.cost, at, speed)?;
    tracing::info!(village = village_id, slot = ?next.slot, level = next.level, %ends_at, "queued upgrade started");
    Ok(Some(ends_at))
}

/// Completes the upgrade whose event is `event`.
pub(crate) fn complete_upgrade(
    world: &mut World,
    event: &Event,
    slot: SlotRef,
    ctx: &mut HandlerContext<'_>,
) -> GameResult<()> {
    let village_id = event.village;
    let at = event.scheduled_for;
    let current: Option<EventId> = world
        .village(village_id)?
        .slot(slot)
        .ok_or(GameError::not_found("slot", u64::from(slot.index)))?
        .upgrade_event;
    if current != Some(event.id) {
        return Err(GameError::invariant(format!(
            "event {} does not match the upgrade running in slot {}",
            event.id, slot.index
        )));
    }

    // Settle production and upkeep under the old levels first.
    ledger::commit(world, village_id, at)?;

    let village = world.village_mut(village_id)?;
    let target = village
        .slot_mut(slot)
        .ok_or(GameError::not_found("slot", u64::from(slot.index)))?;
    target.level += 1;
    target.clear_upgrade();
    let level = target.level;
    let structure = target.structure;
    village.recompute_population();
    let (warehouse, granary) = village.storage_capacities();
    village.warehouse_capacity = warehouse;
    village.granary_capacity = granary;

    tracing::info!(village = village_id, ?slot, ?structure, level, "upgrade complete");
    ctx.outbox.village(
        village_id,
        event.kind(),
        json!({ "slot": slot, "structure": structure, "level": level }),
    );

    advance_queue(world, village_id, at, ctx.speed)?;
    Ok(())
}
