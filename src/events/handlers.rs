//! One handler per event kind.
//!
//! Handlers run inside the dispatcher's transaction. They settle the ledger
//! at the event's due time before changing anything that affects rates, and
//! report duplicate or stale events as `InvariantViolation` without touching
//! the world.

use serde_json::json;

use super::battle;
use super::queue::{Event, EventPayload};
use crate::construction;
use crate::data::UnitType;
use crate::error::{GameError, GameResult};
use crate::ledger;
use crate::model::{Resources, SlotRef, Timestamp, TroopKey, TroopStatus, UnitCount, VillageId, World};
use crate::notify::Outbox;

/// What a handler may use besides the world.
pub struct HandlerContext<'a> {
    pub now: Timestamp,
    pub speed: f64,
    pub outbox: &'a mut Outbox,
}

pub fn handle(world: &mut World, event: &Event, ctx: &mut HandlerContext<'_>) -> GameResult<()> {
    match &event.payload {
        &EventPayload::ConstructionComplete { slot } => {
            construction::complete_upgrade(world, event, SlotRef::building(slot), ctx)
        }
        &EventPayload::FieldComplete { slot } => {
            construction::complete_upgrade(world, event, SlotRef::field(slot), ctx)
        }
        &EventPayload::TrainingComplete { unit, quantity } => training_complete(world, event, unit, quantity, ctx),
        &EventPayload::AttackResolve { attack } => battle::resolve_attack(world, event, attack, ctx),
        EventPayload::TroopsReturn {
            from,
            arrives_at,
            units,
            plunder,
        } => troops_return(world, event, *from, *arrives_at, units, *plunder, ctx),
        &EventPayload::TradeArrive { from, resources, .. } => trade_arrive(world, event, from, resources, ctx),
    }
}

fn training_complete(
    world: &mut World,
    event: &Event,
    unit: UnitType,
    quantity: u32,
    ctx: &mut HandlerContext<'_>,
) -> GameResult<()> {
    ledger::commit(world, event.village, event.scheduled_for)?;
    world.troops.add(TroopKey::home(event.village, unit), quantity);
    tracing::info!(village = event.village, ?unit, quantity, "training complete");
    ctx.outbox.village(
        event.village,
        event.kind(),
        json!({ "unit": unit, "quantity": quantity }),
    );
    Ok(())
}

fn troops_return(
    world: &mut World,
    event: &Event,
    from: VillageId,
    arrives_at: Timestamp,
    units: &[UnitCount],
    plunder: Resources,
    ctx: &mut HandlerContext<'_>,
) -> GameResult<()> {
    let home = event.village;
    let trip = |unit| TroopKey::travelling(from, home, unit, TroopStatus::Returning, home, arrives_at);
    // Trips landing together share groups; each takes back only its own units.
    if let Some(missing) = units.iter().find(|u| world.troops.quantity(&trip(u.unit)) < u.quantity) {
        return Err(GameError::invariant(format!(
            "{} {:?} no longer returning to village {home} from {from}",
            missing.quantity, missing.unit
        )));
    }

    ledger::commit(world, home, event.scheduled_for)?;
    for entry in units {
        world.troops.transfer(&trip(entry.unit), TroopKey::home(home, entry.unit), entry.quantity)?;
    }
    if !plunder.is_zero() {
        ledger::credit(world, home, &plunder, event.scheduled_for)?;
    }

    tracing::info!(village = home, from, %plunder, "troops returned");
    ctx.outbox.village(
        home,
        event.kind(),
        json!({ "from": from, "units": units, "plunder": plunder }),
    );
    Ok(())
}

fn trade_arrive(
    world: &mut World,
    event: &Event,
    from: VillageId,
    resources: Resources,
    ctx: &mut HandlerContext<'_>,
) -> GameResult<()> {
    let stored = ledger::credit(world, event.village, &resources, event.scheduled_for)?;
    tracing::info!(village = event.village, from, %resources, %stored, "merchants arrived");
    let payload = json!({ "from": from, "to": event.village, "resources": resources });
    ctx.outbox.village(event.village, event.kind(), payload.clone());
    ctx.outbox.village(from, event.kind(), payload);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Tribe;
    use crate::events::EventQueue;
    use crate::military;
    use crate::model::{Coordinates, UnitCount};
    use crate::testing::{add_village, hours, t0, world_with_village};

    fn run(world: &mut World, id: u64) -> (GameResult<()>, Outbox) {
        let event = world.events.get(id).unwrap().clone();
        let mut outbox = Outbox::new();
        let mut ctx = HandlerContext { now: event.scheduled_for, speed: 1.0, outbox: &mut outbox };
        let result = handle(world, &event, &mut ctx);
        (result, outbox)
    }

    #[test]
    fn training_lands_troops_at_home() {
        let (mut world, v) = world_with_village(Tribe::Gaul);
        world.troops.add(TroopKey::home(v, UnitType::Phalanx), 4);
        let id = world.events.schedule(
            v,
            EventPayload::TrainingComplete { unit: UnitType::Phalanx, quantity: 6 },
            t0() + hours(1),
        );
        let (result, outbox) = run(&mut world, id);
        result.unwrap();
        assert_eq!(world.troops.quantity(&TroopKey::home(v, UnitType::Phalanx)), 10);
        assert_eq!(outbox.len(), 1);
        assert_eq!(world.village(v).unwrap().resources_checkpoint_at, t0() + hours(1));
    }

    #[test]
    fn returning_troops_merge_and_bring_plunder() {
        let mut world = World::new();
        let home = add_village(&mut world, Tribe::Teuton, Coordinates::new(0, 0));
        let away = add_village(&mut world, Tribe::Gaul, Coordinates::new(0, 7));
        world.troops.add(TroopKey::home(home, UnitType::Axeman), 2);
        let back = military::send_home(
            &mut world,
            away,
            home,
            &[UnitCount::new(UnitType::Axeman, 5)],
            Resources::new(100, 50, 0, 0),
            t0(),
            1.0,
        )
        .unwrap();
        let id = world.events.pending_for(home)[0].id;
        let (result, _) = run(&mut world, id);
        result.unwrap();

        assert_eq!(world.troops.quantity(&TroopKey::home(home, UnitType::Axeman)), 7);
        let returning = TroopKey::travelling(away, home, UnitType::Axeman, TroopStatus::Returning, home, back.arrives_at);
        assert_eq!(world.troops.quantity(&returning), 0);
        assert_eq!(world.village(home).unwrap().resources, Resources::new(100, 50, 0, 0));

        let (again, _) = run(&mut world, id);
        assert!(matches!(again, Err(GameError::InvariantViolation(_))));
        assert_eq!(world.village(home).unwrap().resources, Resources::new(100, 50, 0, 0));
    }

    #[test]
    fn trips_landing_together_each_bring_their_own_loot() {
        let mut world = World::new();
        let home = add_village(&mut world, Tribe::Teuton, Coordinates::new(0, 0));
        let away = add_village(&mut world, Tribe::Gaul, Coordinates::new(0, 7));
        let first = military::send_home(
            &mut world,
            away,
            home,
            &[UnitCount::new(UnitType::Clubswinger, 5)],
            Resources::new(100, 0, 0, 0),
            t0(),
            1.0,
        )
        .unwrap();
        let second = military::send_home(
            &mut world,
            away,
            home,
            &[UnitCount::new(UnitType::Clubswinger, 3)],
            Resources::new(0, 40, 20, 0),
            t0(),
            1.0,
        )
        .unwrap();
        assert_eq!(first.arrives_at, second.arrives_at);

        let ids: Vec<u64> = world.events.pending_for(home).iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), 2);
        let (result, _) = run(&mut world, ids[0]);
        result.unwrap();
        assert_eq!(world.troops.quantity(&TroopKey::home(home, UnitType::Clubswinger)), 5);
        let (result, _) = run(&mut world, ids[1]);
        result.unwrap();

        assert_eq!(world.troops.quantity(&TroopKey::home(home, UnitType::Clubswinger)), 8);
        assert_eq!(world.village(home).unwrap().resources, Resources::new(100, 40, 20, 0));
    }

    #[test]
    fn trade_arrival_credits_up_to_capacity() {
        let mut world = World::new();
        let a = add_village(&mut world, Tribe::Roman, Coordinates::new(0, 0));
        let b = add_village(&mut world, Tribe::Gaul, Coordinates::new(0, 16));
        world.village_mut(b).unwrap().resources = Resources::new(700, 0, 0, 0);
        let id = world.events.schedule(
            b,
            EventPayload::TradeArrive { from: a, resources: Resources::new(300, 10, 0, 0), merchants: 1 },
            t0(),
        );
        let (result, outbox) = run(&mut world, id);
        result.unwrap();
        assert_eq!(world.village(b).unwrap().resources, Resources::new(800, 10, 0, 0));
        assert_eq!(outbox.len(), 2);
    }

    #[test]
    fn queue_round_trips_through_json() {
        let (mut world, v) = world_with_village(Tribe::Roman);
        world.events.schedule(v, EventPayload::AttackResolve { attack: 3 }, t0());
        let json = serde_json::to_string(&world.events).unwrap();
        let back: EventQueue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, world.events);
    }
}
