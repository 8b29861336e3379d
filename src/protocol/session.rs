//! Session state for the line protocol.
//!
//! Executes parsed commands against a `Game` and writes one response line
//! per command: `ok <json>` or `error <message>`.

use std::io::{self, Write};
use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use serde_json::{json, Value};

use super::parser::Command;
use crate::clock::ManualClock;
use crate::error::GameError;
use crate::events::Dispatcher;
use crate::game::Game;
use crate::model::Timestamp;
use crate::notify::MemoryNotifier;
use crate::store::Store;

/// Whether the main loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Session<S: Store> {
    game: Game<S>,
    dispatcher: Arc<Dispatcher<S>>,
    inbox: Arc<MemoryNotifier>,
    /// Present when time only moves on `advance`.
    manual_clock: Option<Arc<ManualClock>>,
}

fn to_json<T: Serialize>(value: T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

/// Writes an `error` response line.
pub fn write_error<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
    writeln!(out, "error {message}")?;
    out.flush()
}

fn hours_from_now<S: Store>(game: &Game<S>, hours: u32) -> Result<Timestamp, String> {
    Duration::try_hours(i64::from(hours))
        .and_then(|span| game.now().checked_add_signed(span))
        .ok_or_else(|| rejected(GameError::invalid(format!("{hours} hours from now is out of range"))))
}

fn rejected(err: GameError) -> String {
    tracing::info!(%err, "command rejected");
    err.to_string()
}

impl<S: Store> Session<S> {
    pub fn new(
        game: Game<S>,
        dispatcher: Arc<Dispatcher<S>>,
        inbox: Arc<MemoryNotifier>,
        manual_clock: Option<Arc<ManualClock>>,
    ) -> Self {
        Session {
            game,
            dispatcher,
            inbox,
            manual_clock,
        }
    }

    /// Runs `cmd` and writes its response line.
    pub fn handle<W: Write>(&mut self, cmd: Command, out: &mut W) -> io::Result<Flow> {
        if cmd == Command::Quit {
            writeln!(out, "ok {}", json!("bye"))?;
            out.flush()?;
            return Ok(Flow::Quit);
        }
        match self.execute(cmd) {
            Ok(value) => {
                writeln!(out, "ok {value}")?;
                out.flush()?;
            }
            Err(message) => write_error(out, &message)?,
        }
        Ok(Flow::Continue)
    }

    fn execute(&self, cmd: Command) -> Result<Value, String> {
        let game = &self.game;
        match cmd {
            Command::Player { name, tribe } => to_json(game.register_player(&name, tribe).map_err(rejected)?),
            Command::Found {
                player,
                coordinates,
                name,
            } => {
                let name = name.unwrap_or_else(|| format!("village {},{}", coordinates.x, coordinates.y));
                let id = game.found_village(player, &name, coordinates).map_err(rejected)?;
                Ok(json!({ "village": id }))
            }
            Command::Village { village } => to_json(game.village(village).map_err(rejected)?),
            Command::Resources { village: Some(v) } => to_json(game.resources(v).map_err(rejected)?),
            Command::Resources { village: None } => to_json(game.all_resources().map_err(rejected)?),
            Command::Upgrade { village, slot } => to_json(game.start_upgrade(village, slot).map_err(rejected)?),
            Command::Build {
                village,
                slot,
                structure,
            } => to_json(game.start_construction(village, slot, structure).map_err(rejected)?),
            Command::Cancel { village, slot } => {
                let refund = game.cancel_upgrade(village, slot).map_err(rejected)?;
                Ok(json!({ "refunded": refund }))
            }
            Command::Train {
                village,
                unit,
                quantity,
            } => to_json(game.train(village, unit, quantity).map_err(rejected)?),
            Command::Send {
                from,
                to,
                kind,
                troops,
            } => to_json(game.send_troops(from, to, kind, &troops).map_err(rejected)?),
            Command::Trade { from, to, resources } => {
                to_json(game.send_resources(from, to, resources).map_err(rejected)?)
            }
            Command::Recall { host, owner } => to_json(game.recall_reinforcements(host, owner).map_err(rejected)?),
            Command::Release { village } => to_json(game.release_trapped(village).map_err(rejected)?),
            Command::Destroy { village } => {
                let killed = game.destroy_trapped(village).map_err(rejected)?;
                Ok(json!({ "killed": killed }))
            }
            Command::Oasis {
                coordinates,
                bonuses,
            } => {
                let id = game.create_oasis(coordinates, bonuses).map_err(rejected)?;
                Ok(json!({ "oasis": id }))
            }
            Command::Claim { village, oasis } => {
                game.claim_oasis(village, oasis).map_err(rejected)?;
                Ok(json!({ "village": village, "oasis": oasis }))
            }
            Command::Boost {
                player,
                resource,
                percent,
                hours,
            } => {
                let until = hours_from_now(game, hours)?;
                game.grant_boost(player, resource, percent, until).map_err(rejected)?;
                Ok(json!({ "player": player, "until": until }))
            }
            Command::Entitle { player, hours } => {
                let until = hours_from_now(game, hours)?;
                game.grant_queue_entitlement(player, until).map_err(rejected)?;
                Ok(json!({ "player": player, "until": until }))
            }
            Command::Reports { village } => to_json(game.reports(village).map_err(rejected)?),
            Command::Events { village } => to_json(game.pending_events(village).map_err(rejected)?),
            Command::Inbox { recipient } => to_json(self.inbox.drain(recipient)),
            Command::Advance { secs } => {
                let clock = self
                    .manual_clock
                    .as_ref()
                    .ok_or_else(|| "advance needs a manual clock".to_string())?;
                let now = i64::try_from(secs)
                    .ok()
                    .and_then(Duration::try_seconds)
                    .and_then(|by| clock.try_advance(by))
                    .ok_or_else(|| rejected(GameError::invalid(format!("cannot advance {secs} seconds"))))?;
                let report = self.dispatcher.poll_once().map_err(rejected)?;
                Ok(json!({ "now": now, "poll": report }))
            }
            Command::Poll => to_json(self.dispatcher.poll_once().map_err(rejected)?),
            Command::Quit => Ok(Value::Null),
        }
    }
}
