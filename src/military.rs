//! Training troops and moving them between villages.
//!
//! Every order here deducts what it spends and schedules the event that
//! completes it in the same call, so wrapping a call in one store
//! transaction makes the order all-or-nothing.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::clock::after;
use crate::data::{UnitType, CHIEF_RESIDENCE_LEVEL};
use crate::error::{GameError, GameResult};
use crate::events::EventPayload;
use crate::ledger;
use crate::model::{
    Attack, AttackId, AttackKind, Coordinates, EventId, Resources, Timestamp, TroopKey,
    TroopStatus, UnitCount, VillageId, World,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingOrder {
    pub village: VillageId,
    pub unit: UnitType,
    pub quantity: u32,
    pub cost: Resources,
    pub completes_at: Timestamp,
    pub event: EventId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movement {
    pub attack: AttackId,
    pub kind: AttackKind,
    pub arrives_at: Timestamp,
    /// True when the troops joined an attack already on its way.
    pub joined: bool,
}

/// Troops sent back to their owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Homecoming {
    pub owner: VillageId,
    pub units: Vec<UnitCount>,
    pub arrives_at: Timestamp,
}

/// Seconds a group moving at `slowest` fields per hour needs from `from` to `to`.
pub fn travel_secs(from: &Coordinates, to: &Coordinates, slowest: f64, speed: f64) -> f64 {
    from.distance(to) / slowest * 3600.0 / speed
}

/// Speed of the slowest unit type among `units`.
pub fn slowest_speed(units: &[UnitCount]) -> Option<f64> {
    units
        .iter()
        .map(|u| u.unit.info().speed)
        .min_by(|a, b| a.total_cmp(b))
}

/// Pays for `quantity` units and schedules their arrival at home.
pub fn train(
    world: &mut World,
    village_id: VillageId,
    unit: UnitType,
    quantity: u32,
    now: Timestamp,
    speed: f64,
) -> GameResult<TrainingOrder> {
    if quantity == 0 {
        return Err(GameError::invalid("quantity must be positive"));
    }
    let village = world.village(village_id)?;
    let info = unit.info();
    if info.tribe != village.tribe {
        return Err(GameError::invalid(format!("{} belongs to another tribe", info.name)));
    }
    let required = if info.chief { CHIEF_RESIDENCE_LEVEL } else { 1 };
    if village.building_level(info.trained_in) < required {
        return Err(GameError::invalid(format!(
            "{} requires {} level {}",
            info.name,
            info.trained_in.info().name,
            required
        )));
    }

    let completes_at = after(now, info.training_secs * f64::from(quantity) / speed)?;
    let cost = info.cost.times(u64::from(quantity));
    ledger::charge(world, village_id, &cost, now)?;
    let event = world.events.schedule(
        village_id,
        EventPayload::TrainingComplete { unit, quantity },
        completes_at,
    );
    tracing::info!(village = village_id, ?unit, quantity, %completes_at, "training started");
    Ok(TrainingOrder {
        village: village_id,
        unit,
        quantity,
        cost,
        completes_at,
        event,
    })
}

/// Merges duplicate unit types and rejects empty manifests.
fn normalize(manifest: &[UnitCount]) -> GameResult<Vec<UnitCount>> {
    let mut merged: BTreeMap<UnitType, u32> = BTreeMap::new();
    for entry in manifest {
        if entry.quantity == 0 {
            return Err(GameError::invalid("troop counts must be positive"));
        }
        *merged.entry(entry.unit).or_default() += entry.quantity;
    }
    if merged.is_empty() {
        return Err(GameError::invalid("no troops selected"));
    }
    Ok(merged.into_iter().map(|(unit, q)| UnitCount::new(unit, q)).collect())
}

/// Dispatches home troops from `from` towards `to`.
///
/// Troops arriving at the same instant as an unresolved movement between the
/// same villages join it instead of creating a second one.
pub fn send_troops(
    world: &mut World,
    from: VillageId,
    to: VillageId,
    kind: AttackKind,
    manifest: &[UnitCount],
    now: Timestamp,
    speed: f64,
) -> GameResult<Movement> {
    if from == to {
        return Err(GameError::invalid("cannot send troops to their own village"));
    }
    let manifest = normalize(manifest)?;
    let origin = world.village(from)?.coordinates;
    let target = world.village(to)?.coordinates;

    match kind {
        AttackKind::Scout if !manifest.iter().all(|u| u.unit.is_scout()) => {
            return Err(GameError::invalid("only scouts can go scouting"));
        }
        AttackKind::Conquest if !manifest.iter().any(|u| u.unit.info().chief) => {
            return Err(GameError::invalid("conquest needs a chief"));
        }
        _ => {}
    }
    for entry in &manifest {
        let available = world.troops.quantity(&TroopKey::home(from, entry.unit));
        if available < entry.quantity {
            return Err(GameError::InsufficientTroops {
                unit: entry.unit,
                requested: entry.quantity,
                available,
            });
        }
    }

    let slowest = slowest_speed(&manifest).ok_or_else(|| GameError::invalid("no troops selected"))?;
    let arrives_at = after(now, travel_secs(&origin, &target, slowest, speed))?;

    let existing = world
        .attacks
        .values()
        .find(|a| !a.resolved && a.attacker == from && a.defender == to && a.arrives_at == arrives_at)
        .map(|a| (a.id, a.kind));
    if let Some((_, existing_kind)) = existing {
        if existing_kind != kind {
            return Err(GameError::invalid("a different movement already arrives at that instant"));
        }
    }

    // Upkeep moves with the troops.
    ledger::commit(world, from, now)?;
    let status = kind.travelling_status();
    for entry in &manifest {
        world.troops.transfer(
            &TroopKey::home(from, entry.unit),
            TroopKey::travelling(from, from, entry.unit, status, to, arrives_at),
            entry.quantity,
        )?;
    }

    let (attack, joined) = match existing {
        Some((id, _)) => {
            world.attack_mut(id)?.merge_manifest(&manifest);
            (id, true)
        }
        None => {
            let id = world.allocate_id();
            world.attacks.insert(
                id,
                Attack {
                    id,
                    attacker: from,
                    defender: to,
                    kind,
                    manifest: manifest.clone(),
                    resolved: false,
                    sent_at: now,
                    arrives_at,
                },
            );
            world
                .events
                .schedule(to, EventPayload::AttackResolve { attack: id }, arrives_at);
            (id, false)
        }
    };

    tracing::info!(from, to, ?kind, attack, joined, %arrives_at, "troops sent");
    Ok(Movement {
        attack,
        kind,
        arrives_at,
        joined,
    })
}

/// Puts `units`, already removed from wherever they were, on the road home.
///
/// They leave `at_village` at `depart` and bring `plunder` with them.
pub(crate) fn send_home(
    world: &mut World,
    at_village: VillageId,
    owner: VillageId,
    units: &[UnitCount],
    plunder: Resources,
    depart: Timestamp,
    speed: f64,
) -> GameResult<Homecoming> {
    let slowest = slowest_speed(units).ok_or_else(|| GameError::invariant("sending nobody home"))?;
    let origin = world.village(at_village)?.coordinates;
    let home = world.village(owner)?.coordinates;
    let arrives_at = after(depart, travel_secs(&origin, &home, slowest, speed))?;

    for entry in units {
        world.troops.add(
            TroopKey::travelling(at_village, owner, entry.unit, TroopStatus::Returning, owner, arrives_at),
            entry.quantity,
        );
    }
    world.events.schedule(
        owner,
        EventPayload::TroopsReturn {
            from: at_village,
            arrives_at,
            units: units.to_vec(),
            plunder,
        },
        arrives_at,
    );
    Ok(Homecoming {
        owner,
        units: units.to_vec(),
        arrives_at,
    })
}

/// Removes every group matching `pred` and sums them per owner.
fn take_groups(world: &mut World, pred: impl Fn(&TroopKey) -> bool) -> BTreeMap<VillageId, Vec<UnitCount>> {
    let mut by_owner: BTreeMap<VillageId, Vec<UnitCount>> = BTreeMap::new();
    for key in world.troops.keys_where(pred) {
        if let Some(group) = world.troops.take(&key) {
            by_owner
                .entry(key.owner)
                .or_default()
                .push(UnitCount::new(key.unit, group.quantity));
        }
    }
    by_owner
}

/// Sends `owner`'s reinforcements stationed at `host` back home.
pub fn recall_reinforcements(
    world: &mut World,
    host: VillageId,
    owner: VillageId,
    now: Timestamp,
    speed: f64,
) -> GameResult<Homecoming> {
    if host == owner {
        return Err(GameError::invalid("troops at home cannot be recalled"));
    }
    world.village(owner)?;
    // The host stops feeding them.
    ledger::commit(world, host, now)?;
    let mut taken = take_groups(world, |k| {
        k.village == host && k.owner == owner && k.status == TroopStatus::Home
    });
    let units = taken
        .remove(&owner)
        .ok_or_else(|| GameError::invalid("no reinforcements to recall"))?;
    let homecoming = send_home(world, host, owner, &units, Resources::ZERO, now, speed)?;
    tracing::info!(host, owner, arrives_at = %homecoming.arrives_at, "reinforcements recalled");
    Ok(homecoming)
}

/// Frees every trapped group at `host` and sends them back to their owners.
pub fn release_trapped(world: &mut World, host: VillageId, now: Timestamp, speed: f64) -> GameResult<Vec<Homecoming>> {
    world.village(host)?;
    let taken = take_groups(world, |k| k.village == host && k.status == TroopStatus::Trapped);
    if taken.is_empty() {
        return Err(GameError::invalid("no trapped troops"));
    }
    let mut homecomings = Vec::with_capacity(taken.len());
    for (owner, units) in taken {
        homecomings.push(send_home(world, host, owner, &units, Resources::ZERO, now, speed)?);
    }
    tracing::info!(host, groups = homecomings.len(), "prisoners released");
    Ok(homecomings)
}

/// Kills every trapped group at `host`, returning what died.
pub fn destroy_trapped(world: &mut World, host: VillageId) -> GameResult<Vec<UnitCount>> {
    world.village(host)?;
    let taken = take_groups(world, |k| k.village == host && k.status == TroopStatus::Trapped);
    if taken.is_empty() {
        return Err(GameError::invalid("no trapped troops"));
    }
    let killed: Vec<UnitCount> = taken.into_values().flatten().collect();
    tracing::info!(host, killed = killed.len(), "prisoners executed");
    Ok(killed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Structure, Tribe};
    use crate::testing::{add_village, hours, t0, world_with_village};

    fn with_barracks(world: &mut World, v: VillageId) {
        let village = world.village_mut(v).unwrap();
        village.buildings[1].structure = Some(Structure::Barracks);
        village.buildings[1].level = 1;
        village.resources = Resources::new(800, 800, 800, 800);
    }

    #[test]
    fn training_needs_the_right_building_and_tribe() {
        let (mut world, v) = world_with_village(Tribe::Gaul);
        world.village_mut(v).unwrap().resources = Resources::new(800, 800, 800, 800);
        assert!(train(&mut world, v, UnitType::Phalanx, 1, t0(), 1.0).is_err());
        with_barracks(&mut world, v);
        assert!(train(&mut world, v, UnitType::Legionnaire, 1, t0(), 1.0).is_err());
        assert!(train(&mut world, v, UnitType::Chieftain, 1, t0(), 1.0).is_err());

        let order = train(&mut world, v, UnitType::Phalanx, 2, t0(), 1.0).unwrap();
        assert_eq!(order.cost, Resources::new(200, 260, 110, 60));
        assert_eq!(order.completes_at, t0() + chrono::Duration::seconds(2080));
        assert_eq!(world.events.get(order.event).unwrap().kind(), "training_complete");
    }

    #[test]
    fn travel_time_follows_the_slowest_unit() {
        let units = [UnitCount::new(UnitType::Phalanx, 1), UnitCount::new(UnitType::Chieftain, 1)];
        assert_eq!(slowest_speed(&units), Some(5.0));
        let secs = travel_secs(&Coordinates::new(0, 0), &Coordinates::new(3, 4), 5.0, 1.0);
        assert_eq!(secs, 3600.0);
        assert_eq!(travel_secs(&Coordinates::new(0, 0), &Coordinates::new(3, 4), 5.0, 2.0), 1800.0);
    }

    #[test]
    fn sending_moves_troops_and_schedules_resolution() {
        let mut world = World::new();
        let a = add_village(&mut world, Tribe::Teuton, Coordinates::new(0, 0));
        let d = add_village(&mut world, Tribe::Gaul, Coordinates::new(0, 7));
        world.troops.add(TroopKey::home(a, UnitType::Clubswinger), 30);

        let m = send_troops(&mut world, a, d, AttackKind::Raid, &[UnitCount::new(UnitType::Clubswinger, 20)], t0(), 1.0).unwrap();
        assert_eq!(m.arrives_at, t0() + hours(1));
        assert!(!m.joined);
        assert_eq!(world.troops.quantity(&TroopKey::home(a, UnitType::Clubswinger)), 10);
        let moving = TroopKey::travelling(a, a, UnitType::Clubswinger, TroopStatus::Attacking, d, m.arrives_at);
        assert_eq!(world.troops.quantity(&moving), 20);
        assert_eq!(world.events.pending_for(d).len(), 1);
    }

    #[test]
    fn simultaneous_arrivals_join_one_attack() {
        let mut world = World::new();
        let a = add_village(&mut world, Tribe::Teuton, Coordinates::new(0, 0));
        let d = add_village(&mut world, Tribe::Gaul, Coordinates::new(0, 7));
        world.troops.add(TroopKey::home(a, UnitType::Clubswinger), 30);
        let first = send_troops(&mut world, a, d, AttackKind::Raid, &[UnitCount::new(UnitType::Clubswinger, 10)], t0(), 1.0).unwrap();
        let err = send_troops(&mut world, a, d, AttackKind::Attack, &[UnitCount::new(UnitType::Clubswinger, 10)], t0(), 1.0).unwrap_err();
        assert!(matches!(err, GameError::InvalidOrder(_)));
        let second = send_troops(&mut world, a, d, AttackKind::Raid, &[UnitCount::new(UnitType::Clubswinger, 10)], t0(), 1.0).unwrap();
        assert!(second.joined);
        assert_eq!(second.attack, first.attack);
        assert_eq!(world.attack(first.attack).unwrap().manifest, vec![UnitCount::new(UnitType::Clubswinger, 20)]);
        assert_eq!(world.events.pending_for(d).len(), 1);
    }

    #[test]
    fn sending_more_than_home_fails_cleanly() {
        let mut world = World::new();
        let a = add_village(&mut world, Tribe::Teuton, Coordinates::new(0, 0));
        let d = add_village(&mut world, Tribe::Gaul, Coordinates::new(1, 1));
        world.troops.add(TroopKey::home(a, UnitType::Axeman), 5);
        let before = world.clone();
        let err = send_troops(
            &mut world,
            a,
            d,
            AttackKind::Attack,
            &[UnitCount::new(UnitType::Axeman, 3), UnitCount::new(UnitType::Axeman, 3)],
            t0(),
            1.0,
        )
        .unwrap_err();
        assert_eq!(
            err,
            GameError::InsufficientTroops { unit: UnitType::Axeman, requested: 6, available: 5 }
        );
        assert_eq!(world, before);
    }

    #[test]
    fn mission_rules() {
        let mut world = World::new();
        let a = add_village(&mut world, Tribe::Teuton, Coordinates::new(0, 0));
        let d = add_village(&mut world, Tribe::Gaul, Coordinates::new(1, 1));
        world.troops.add(TroopKey::home(a, UnitType::Axeman), 5);
        world.troops.add(TroopKey::home(a, UnitType::Scout), 5);
        let axe = [UnitCount::new(UnitType::Axeman, 1)];
        assert!(send_troops(&mut world, a, d, AttackKind::Scout, &axe, t0(), 1.0).is_err());
        assert!(send_troops(&mut world, a, d, AttackKind::Conquest, &axe, t0(), 1.0).is_err());
        assert!(send_troops(&mut world, a, a, AttackKind::Attack, &axe, t0(), 1.0).is_err());
        assert!(send_troops(&mut world, a, d, AttackKind::Attack, &[], t0(), 1.0).is_err());
        assert!(send_troops(&mut world, a, d, AttackKind::Scout, &[UnitCount::new(UnitType::Scout, 2)], t0(), 1.0).is_ok());
    }

    #[test]
    fn recall_sends_reinforcements_home() {
        let mut world = World::new();
        let host = add_village(&mut world, Tribe::Gaul, Coordinates::new(0, 0));
        let owner = add_village(&mut world, Tribe::Teuton, Coordinates::new(0, 9));
        world.troops.add(TroopKey::stationed(host, owner, UnitType::Spearman), 12);
        let back = recall_reinforcements(&mut world, host, owner, t0(), 1.0).unwrap();
        assert_eq!(back.units, vec![UnitCount::new(UnitType::Spearman, 12)]);
        assert_eq!(back.arrives_at, t0() + chrono::Duration::seconds(9 * 3600 / 7) + chrono::Duration::milliseconds(571));
        assert_eq!(world.troops.quantity(&TroopKey::stationed(host, owner, UnitType::Spearman)), 0);
        assert!(recall_reinforcements(&mut world, host, owner, t0(), 1.0).is_err());
    }

    #[test]
    fn trapped_troops_can_be_released_or_destroyed() {
        let mut world = World::new();
        let host = add_village(&mut world, Tribe::Gaul, Coordinates::new(0, 0));
        let a = add_village(&mut world, Tribe::Teuton, Coordinates::new(0, 7));
        let b = add_village(&mut world, Tribe::Roman, Coordinates::new(0, 12));
        world.troops.add(TroopKey::trapped(host, a, UnitType::Axeman), 3);
        world.troops.add(TroopKey::trapped(host, b, UnitType::Imperian), 4);

        let released = release_trapped(&mut world, host, t0(), 1.0).unwrap();
        assert_eq!(released.len(), 2);
        assert_eq!(world.events.pending_for(a).len(), 1);
        assert_eq!(world.events.pending_for(b).len(), 1);
        assert!(destroy_trapped(&mut world, host).is_err());

        world.troops.add(TroopKey::trapped(host, a, UnitType::Axeman), 2);
        assert_eq!(destroy_trapped(&mut world, host).unwrap(), vec![UnitCount::new(UnitType::Axeman, 2)]);
    }
}
