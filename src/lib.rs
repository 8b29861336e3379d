//! Palisade: a village economy and combat simulation core.
//!
//! Resources are integrated lazily from a per-village checkpoint, deferred
//! consequences live in a durable event queue, and a polling dispatcher
//! drives every state transition through per-kind handlers, one of which
//! resolves battles.

pub mod clock;
pub mod combat;
pub mod config;
pub mod construction;
pub mod data;
pub mod error;
pub mod events;
pub mod game;
pub mod ledger;
pub mod military;
pub mod model;
pub mod notify;
pub mod protocol;
pub mod settlement;
pub mod store;
pub mod trade;

#[cfg(test)]
mod testing;

pub use error::{GameError, GameResult};
pub use game::Game;
