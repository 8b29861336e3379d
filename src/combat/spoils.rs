//! Inputs and outputs computed around a battle: attacker morale and plunder.

use super::resolver::Squad;
use crate::model::{Resources, ALL_RESOURCES};

/// Morale never drops below this.
pub const MORALE_FLOOR: f64 = 0.33;
const MORALE_EXPONENT: f64 = 0.2;

/// Offence multiplier that protects small defenders from much larger attackers.
pub fn morale(attacker_population: u32, defender_population: u32) -> f64 {
    if attacker_population >= defender_population {
        return 1.0;
    }
    let ratio = f64::from(attacker_population) / f64::from(defender_population);
    ratio.powf(MORALE_EXPONENT).max(MORALE_FLOOR)
}

/// Total resources the given squads can carry.
pub fn carry_capacity(squads: &[Squad]) -> u64 {
    squads
        .iter()
        .map(|s| s.unit.info().carry * u64::from(s.quantity))
        .sum()
}

/// Splits a pooled carry budget proportionally across the four resources.
///
/// Never takes more of a resource than is available, nor more in total than
/// `capacity`.
pub fn plunder(available: &Resources, capacity: u64) -> Resources {
    let total = available.total();
    if total == 0 || capacity == 0 {
        return Resources::ZERO;
    }
    let share = (capacity as f64 / total as f64).min(1.0);
    let mut taken = Resources::ZERO;
    for kind in ALL_RESOURCES {
        let amount = (available.get(kind) as f64 * share).floor() as u64;
        *taken.get_mut(kind) = amount.min(available.get(kind));
    }
    taken
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::UnitType;

    #[test]
    fn morale_is_neutral_for_bigger_attackers() {
        assert_eq!(morale(500, 500), 1.0);
        assert_eq!(morale(900, 10), 1.0);
    }

    #[test]
    fn morale_shrinks_with_population_gap() {
        let m = morale(100, 3200);
        assert!((m - (1.0f64 / 32.0).powf(0.2)).abs() < 1e-12);
        assert_eq!(morale(1, 1_000_000), MORALE_FLOOR);
    }

    #[test]
    fn carry_sums_units() {
        let squads = [
            Squad::new(1, UnitType::Clubswinger, 10),
            Squad::new(1, UnitType::Paladin, 2),
        ];
        assert_eq!(carry_capacity(&squads), 600 + 220);
    }

    #[test]
    fn plunder_takes_everything_when_capacity_suffices() {
        let available = Resources::new(100, 50, 10, 0);
        assert_eq!(plunder(&available, 1000), available);
    }

    #[test]
    fn plunder_splits_capacity_proportionally() {
        let available = Resources::new(300, 300, 200, 200);
        let taken = plunder(&available, 500);
        assert_eq!(taken, Resources::new(150, 150, 100, 100));
        assert!(taken.total() <= 500);
    }

    #[test]
    fn plunder_never_exceeds_budget_or_stock() {
        let available = Resources::new(333, 1, 77, 919);
        for capacity in [0, 1, 7, 100, 999, 1330, 5000] {
            let taken = plunder(&available, capacity);
            assert!(taken.total() <= capacity);
            assert!(available.covers(&taken));
        }
    }
}
