//! Resolution of arriving movements.
//!
//! The attack's `resolved` flag is the idempotency guard: a second dispatch
//! for an attack that has already been resolved changes nothing.

use std::collections::BTreeMap;

use serde_json::json;

use super::handlers::HandlerContext;
use super::queue::Event;
use crate::combat::{self, Squad};
use crate::data::UnitType;
use crate::error::{GameError, GameResult};
use crate::ledger;
use crate::military;
use crate::model::{
    Attack, AttackId, AttackKind, BattleReport, LoyaltyChange, Resources, ScoutIntel, TroopKey,
    TroopStatus, UnitCount, World, MAX_LOYALTY,
};

/// Loyalty removed by each surviving chief.
pub const LOYALTY_PER_CHIEF: u8 = 20;

pub(crate) fn resolve_attack(
    world: &mut World,
    event: &Event,
    attack_id: AttackId,
    ctx: &mut HandlerContext<'_>,
) -> GameResult<()> {
    let attack = world.attack(attack_id)?.clone();
    if attack.resolved {
        return Err(GameError::invariant(format!("attack {attack_id} is already resolved")));
    }
    if event.village != attack.defender {
        return Err(GameError::invariant(format!(
            "event {} targets village {} but attack {attack_id} targets {}",
            event.id, event.village, attack.defender
        )));
    }

    let arriving = take_arriving(world, &attack);
    let report = if attack.kind == AttackKind::Reinforcement {
        station(world, &attack, &arriving)?;
        None
    } else {
        Some(fight(world, &attack, arriving, ctx)?)
    };
    world.attack_mut(attack_id)?.resolved = true;

    match report {
        Some(report) => {
            tracing::info!(
                attack = attack_id,
                kind = ?attack.kind,
                attacker = attack.attacker,
                defender = attack.defender,
                attacker_wins = report.attacker_wins,
                "battle resolved"
            );
            let payload = json!({ "report": report.id, "attack": attack_id, "attacker_wins": report.attacker_wins });
            notify_parties(world, &attack, "battle_report", payload, ctx)?;
            world.reports.push(report);
        }
        None => {
            tracing::info!(attack = attack_id, from = attack.attacker, to = attack.defender, "reinforcements arrived");
            let payload = json!({ "attack": attack_id, "units": attack.manifest });
            notify_parties(world, &attack, "reinforcement_arrived", payload, ctx)?;
        }
    }
    Ok(())
}

fn notify_parties(
    world: &World,
    attack: &Attack,
    event: &str,
    payload: serde_json::Value,
    ctx: &mut HandlerContext<'_>,
) -> GameResult<()> {
    for village in [attack.attacker, attack.defender] {
        let owner = world.village(village)?.owner;
        ctx.outbox.village(village, event, payload.clone());
        ctx.outbox.user(owner, event, payload.clone());
    }
    Ok(())
}

/// Removes the travelling groups that belong to `attack`.
fn take_arriving(world: &mut World, attack: &Attack) -> Vec<UnitCount> {
    let status = attack.kind.travelling_status();
    let keys = world.troops.keys_where(|k| {
        k.village == attack.attacker
            && k.owner == attack.attacker
            && k.status == status
            && k.destination == Some(attack.defender)
            && k.arrives_at == Some(attack.arrives_at)
    });
    // Keep the manifest order; it decides who walks into the traps first.
    let mut arriving: Vec<UnitCount> = Vec::with_capacity(keys.len());
    let mut by_unit: BTreeMap<UnitType, u32> = BTreeMap::new();
    for key in keys {
        if let Some(group) = world.troops.take(&key) {
            *by_unit.entry(key.unit).or_default() += group.quantity;
        }
    }
    for entry in &attack.manifest {
        if let Some(q) = by_unit.remove(&entry.unit) {
            arriving.push(UnitCount::new(entry.unit, q));
        }
    }
    arriving.extend(by_unit.into_iter().map(|(unit, q)| UnitCount::new(unit, q)));
    arriving
}

fn station(world: &mut World, attack: &Attack, arriving: &[UnitCount]) -> GameResult<()> {
    // The host starts feeding them.
    ledger::commit(world, attack.defender, attack.arrives_at)?;
    for entry in arriving {
        world.troops.add(
            TroopKey::stationed(attack.defender, attack.attacker, entry.unit),
            entry.quantity,
        );
    }
    Ok(())
}

/// Springs the defender's traps on `arriving`, in order, returning who is caught.
fn spring_traps(world: &mut World, attack: &Attack, arriving: &mut Vec<UnitCount>) -> GameResult<Vec<UnitCount>> {
    let defender = attack.defender;
    let capacity = world.village(defender)?.trap_capacity();
    let occupied: u32 = world
        .troops
        .at(defender)
        .filter(|g| g.key.status == TroopStatus::Trapped)
        .map(|g| g.quantity)
        .sum();
    let mut free = capacity.saturating_sub(occupied);
    let mut trapped = Vec::new();
    for entry in arriving.iter_mut() {
        if free == 0 {
            break;
        }
        let caught = free.min(entry.quantity);
        free -= caught;
        entry.quantity -= caught;
        world
            .troops
            .add(TroopKey::trapped(defender, attack.attacker, entry.unit), caught);
        trapped.push(UnitCount::new(entry.unit, caught));
    }
    arriving.retain(|u| u.quantity > 0);
    Ok(trapped)
}

fn fight(
    world: &mut World,
    attack: &Attack,
    mut arriving: Vec<UnitCount>,
    ctx: &mut HandlerContext<'_>,
) -> GameResult<BattleReport> {
    let at = attack.arrives_at;
    let defender_id = attack.defender;
    // Losses change the defender's upkeep and plunder needs current stock.
    let stock = ledger::commit(world, defender_id, at)?.quantities;

    let trapped = if attack.kind.can_be_trapped() {
        spring_traps(world, attack, &mut arriving)?
    } else {
        Vec::new()
    };
    let attackers: Vec<Squad> = arriving
        .iter()
        .map(|u| Squad::new(attack.attacker, u.unit, u.quantity))
        .collect();

    let garrison: Vec<Squad> = world
        .troops
        .at(defender_id)
        .filter(|g| g.key.status == TroopStatus::Home)
        .map(|g| Squad::new(g.key.owner, g.key.unit, g.quantity))
        .collect();
    // Scouts only meet scouts.
    let defenders: Vec<Squad> = if attack.kind == AttackKind::Scout {
        garrison.iter().copied().filter(|s| s.unit.is_scout()).collect()
    } else {
        garrison.clone()
    };

    let defender = world.village(defender_id)?;
    let wall = defender.wall_multiplier();
    let morale = combat::morale(world.village(attack.attacker)?.population, defender.population);

    let outcome = if attackers.is_empty() {
        None
    } else {
        Some(combat::resolve(&attackers, &defenders, attack.kind, wall, morale))
    };

    let mut report = BattleReport {
        id: world.allocate_id(),
        attack: attack.id,
        kind: attack.kind,
        attacker: attack.attacker,
        defender: defender_id,
        occurred_at: at,
        attacker_wins: false,
        attackers: arriving.clone(),
        attacker_losses: Vec::new(),
        defenders: counts(&defenders),
        defender_losses: Vec::new(),
        trapped,
        plunder: Resources::ZERO,
        loyalty: None,
        intel: None,
    };
    let Some(outcome) = outcome else {
        // Every attacker ended up in the traps.
        return Ok(report);
    };

    for loss in &outcome.defender_losses {
        world
            .troops
            .remove(&TroopKey::stationed(defender_id, loss.owner, loss.unit), loss.quantity)?;
    }
    report.attacker_wins = outcome.attacker_wins;
    report.attacker_losses = counts(&outcome.attacker_losses);
    report.defender_losses = counts(&outcome.defender_losses);
    let mut survivors = counts(&outcome.surviving_attackers);

    if outcome.attacker_wins {
        match attack.kind {
            AttackKind::Scout => {
                report.intel = Some(ScoutIntel {
                    resources: stock,
                    troops: counts(&garrison),
                });
            }
            AttackKind::Conquest => {
                report.loyalty = Some(erode_loyalty(world, attack, &mut survivors)?);
            }
            _ => {}
        }
        if attack.kind.plunders() && !survivors.is_empty() {
            let squads: Vec<Squad> = survivors
                .iter()
                .map(|u| Squad::new(attack.attacker, u.unit, u.quantity))
                .collect();
            let taken = combat::plunder(&stock, combat::carry_capacity(&squads));
            let village = world.village_mut(defender_id)?;
            village.resources = village.resources.saturating_sub(&taken);
            report.plunder = taken;
        }
    }

    if !survivors.is_empty() {
        military::send_home(world, defender_id, attack.attacker, &survivors, report.plunder, at, ctx.speed)?;
    }
    Ok(report)
}

/// Lowers the defender's loyalty by the surviving chiefs and transfers the
/// village once it reaches zero. Chiefs that take a village stay in it.
fn erode_loyalty(world: &mut World, attack: &Attack, survivors: &mut Vec<UnitCount>) -> GameResult<LoyaltyChange> {
    let chiefs: u32 = survivors
        .iter()
        .filter(|u| u.unit.info().chief)
        .map(|u| u.quantity)
        .sum();
    let new_owner = world.village(attack.attacker)?.owner;
    let village = world.village_mut(attack.defender)?;
    let before = village.loyalty;
    let drop = u32::from(LOYALTY_PER_CHIEF).saturating_mul(chiefs);
    let after = u32::from(before).saturating_sub(drop) as u8;

    if after > 0 || chiefs == 0 {
        village.loyalty = after;
        return Ok(LoyaltyChange {
            before,
            after,
            conquered: false,
        });
    }

    village.owner = new_owner;
    village.loyalty = MAX_LOYALTY;
    survivors.retain(|u| !u.unit.info().chief);
    tracing::info!(village = attack.defender, new_owner, "village conquered");
    Ok(LoyaltyChange {
        before,
        after: 0,
        conquered: true,
    })
}

/// Sums squads per unit type, keeping first-seen order.
fn counts(squads: &[Squad]) -> Vec<UnitCount> {
    let mut out: Vec<UnitCount> = Vec::new();
    for squad in squads {
        match out.iter_mut().find(|u| u.unit == squad.unit) {
            Some(entry) => entry.quantity += squad.quantity,
            None => out.push(UnitCount::new(squad.unit, squad.quantity)),
        }
    }
    out
}
