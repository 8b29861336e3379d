//! Sending resources between villages by merchant.

use serde::Serialize;

use crate::clock::after;
use crate::data::Structure;
use crate::error::{GameError, GameResult};
use crate::events::EventPayload;
use crate::ledger;
use crate::model::{Resources, Timestamp, VillageId, World};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shipment {
    pub from: VillageId,
    pub to: VillageId,
    pub resources: Resources,
    pub merchants: u32,
    pub arrives_at: Timestamp,
}

/// Merchants of `village` currently on the road.
pub fn merchants_away(world: &World, village: VillageId) -> u32 {
    world
        .events
        .pending()
        .filter_map(|e| match e.payload {
            EventPayload::TradeArrive { from, merchants, .. } if from == village => Some(merchants),
            _ => None,
        })
        .sum()
}

/// Ships `resources` from `from` to `to`. Merchants are busy until the goods arrive.
pub fn send_resources(
    world: &mut World,
    from: VillageId,
    to: VillageId,
    resources: Resources,
    now: Timestamp,
    speed: f64,
) -> GameResult<Shipment> {
    if from == to {
        return Err(GameError::invalid("cannot trade with the same village"));
    }
    if resources.is_zero() {
        return Err(GameError::invalid("nothing to send"));
    }
    let origin = world.village(from)?;
    let target = world.village(to)?.coordinates;
    let tribe = origin.tribe.info();

    let owned = u32::from(origin.building_level(Structure::Marketplace));
    if owned == 0 {
        return Err(GameError::invalid("a marketplace is required"));
    }
    let needed = u32::try_from(resources.total().div_ceil(tribe.merchant_capacity))
        .map_err(|_| GameError::invalid("shipment too large"))?;
    let idle = owned.saturating_sub(merchants_away(world, from));
    if needed > idle {
        return Err(GameError::invalid(format!("needs {needed} merchants, {idle} available")));
    }

    let travel = origin.coordinates.distance(&target) / tribe.merchant_speed * 3600.0 / speed;
    let arrives_at = after(now, travel)?;

    ledger::charge(world, from, &resources, now)?;
    world.events.schedule(
        to,
        EventPayload::TradeArrive {
            from,
            resources,
            merchants: needed,
        },
        arrives_at,
    );
    tracing::info!(from, to, %resources, merchants = needed, %arrives_at, "resources sent");
    Ok(Shipment {
        from,
        to,
        resources,
        merchants: needed,
        arrives_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Tribe;
    use crate::model::Coordinates;
    use crate::testing::{add_village, hours, t0};

    fn market(world: &mut World, v: VillageId, level: u8) {
        let village = world.village_mut(v).unwrap();
        village.buildings[3].structure = Some(Structure::Marketplace);
        village.buildings[3].level = level;
        village.resources = Resources::new(800, 800, 800, 800);
    }

    #[test]
    fn shipment_charges_and_schedules_arrival() {
        let mut world = World::new();
        let a = add_village(&mut world, Tribe::Roman, Coordinates::new(0, 0));
        let b = add_village(&mut world, Tribe::Gaul, Coordinates::new(0, 16));
        market(&mut world, a, 2);

        let shipment = send_resources(&mut world, a, b, Resources::new(300, 300, 0, 0), t0(), 1.0).unwrap();
        assert_eq!(shipment.merchants, 2);
        assert_eq!(shipment.arrives_at, t0() + hours(1));
        assert_eq!(world.village(a).unwrap().resources, Resources::new(500, 500, 800, 800));
        assert_eq!(merchants_away(&world, a), 2);

        let err = send_resources(&mut world, a, b, Resources::new(10, 0, 0, 0), t0(), 1.0).unwrap_err();
        assert!(matches!(err, GameError::InvalidOrder(_)));
    }

    #[test]
    fn marketplace_is_required() {
        let mut world = World::new();
        let a = add_village(&mut world, Tribe::Roman, Coordinates::new(0, 0));
        let b = add_village(&mut world, Tribe::Gaul, Coordinates::new(0, 16));
        world.village_mut(a).unwrap().resources = Resources::new(800, 800, 800, 800);
        assert!(send_resources(&mut world, a, b, Resources::new(10, 0, 0, 0), t0(), 1.0).is_err());
        market(&mut world, a, 1);
        assert!(send_resources(&mut world, a, a, Resources::new(10, 0, 0, 0), t0(), 1.0).is_err());
        assert!(send_resources(&mut world, a, b, Resources::ZERO, t0(), 1.0).is_err());
    }

    #[test]
    fn oversized_or_endless_shipments_are_refused() {
        let mut world = World::new();
        let a = add_village(&mut world, Tribe::Roman, Coordinates::new(0, 0));
        let b = add_village(&mut world, Tribe::Gaul, Coordinates::new(i32::MAX, i32::MAX));
        market(&mut world, a, 20);

        let err = send_resources(&mut world, a, b, Resources::new(u64::MAX, 1, 0, 0), t0(), 1.0).unwrap_err();
        assert!(matches!(err, GameError::InvalidOrder(_)));

        let err = send_resources(&mut world, a, b, Resources::new(10, 0, 0, 0), t0(), 1e-9).unwrap_err();
        assert!(matches!(err, GameError::InvalidOrder(_)));
        assert_eq!(world.village(a).unwrap().resources, Resources::new(800, 800, 800, 800));
        assert_eq!(merchants_away(&world, a), 0);
    }
}
