//! Combat resolution.
//!
//! The resolver turns two rosters into losses and survivors; the spoils
//! helpers compute the morale passed in and the plunder carried out.

pub mod resolver;
pub mod spoils;

pub use resolver::{resolve, BattleOutcome, Squad};
pub use spoils::{carry_capacity, morale, plunder, MORALE_FLOOR};
