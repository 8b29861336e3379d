//! Line command parser.
//!
//! Parses one line of the text protocol into a structured `Command` that the
//! session can dispatch on.

use crate::data::{Structure, Tribe, UnitType};
use crate::model::{
    AttackKind, Coordinates, OasisBonus, ResourceKind, Resources, SlotRef, UnitCount, FIELD_SLOTS,
    LAST_BUILDING_SLOT,
};
use crate::notify::Recipient;

/// Errors that can occur when parsing a command line.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("invalid {what}: '{value}'")]
    Invalid { what: &'static str, value: String },
}

/// A parsed client command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `player <name> <tribe>`
    Player { name: String, tribe: Tribe },
    /// `found <player> <x> <y> [name]`
    Found {
        player: u64,
        coordinates: Coordinates,
        name: Option<String>,
    },
    /// `village <id>`
    Village { village: u64 },
    /// `resources <village>`, or every village without an argument.
    Resources { village: Option<u64> },
    /// `upgrade <village> <slot>`
    Upgrade { village: u64, slot: SlotRef },
    /// `build <village> <slot> <structure>`
    Build {
        village: u64,
        slot: u8,
        structure: Structure,
    },
    /// `cancel <village> <slot>`
    Cancel { village: u64, slot: SlotRef },
    /// `train <village> <unit> <quantity>`
    Train {
        village: u64,
        unit: UnitType,
        quantity: u32,
    },
    /// `send <from> <to> <kind> <unit>:<n>...`
    Send {
        from: u64,
        to: u64,
        kind: AttackKind,
        troops: Vec<UnitCount>,
    },
    /// `trade <from> <to> <wood> <clay> <iron> <crop>`
    Trade {
        from: u64,
        to: u64,
        resources: Resources,
    },
    /// `recall <host> <owner>`
    Recall { host: u64, owner: u64 },
    /// `release <village>`
    Release { village: u64 },
    /// `destroy <village>`
    Destroy { village: u64 },
    /// `oasis <x> <y> <resource>:<percent>...`
    Oasis {
        coordinates: Coordinates,
        bonuses: Vec<OasisBonus>,
    },
    /// `claim <village> <oasis>`
    Claim { village: u64, oasis: u64 },
    /// `boost <player> <resource> <percent> <hours>`
    Boost {
        player: u64,
        resource: ResourceKind,
        percent: u32,
        hours: u32,
    },
    /// `entitle <player> <hours>`
    Entitle { player: u64, hours: u32 },
    /// `reports <village>`
    Reports { village: u64 },
    /// `events <village>`
    Events { village: u64 },
    /// `inbox village|user <id>`
    Inbox { recipient: Recipient },
    /// `advance <seconds>`: moves a manual clock forward, then polls.
    Advance { secs: u64 },
    /// `poll`: dispatches whatever is due now.
    Poll,
    Quit,
}

/// Parses a single line of input into a `Command`.
pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, args)) = tokens.split_first() else {
        return Err(CommandError::Empty);
    };

    match head {
        "player" => match args {
            [name, tribe] => Ok(Command::Player {
                name: name.to_string(),
                tribe: Tribe::from_name(tribe).ok_or_else(|| invalid("tribe", tribe))?,
            }),
            _ => Err(CommandError::Usage("player <name> <roman|teuton|gaul>")),
        },
        "found" => match args {
            [player, x, y, rest @ ..] => Ok(Command::Found {
                player: id(player)?,
                coordinates: Coordinates::new(number("x", x)?, number("y", y)?),
                name: (!rest.is_empty()).then(|| rest.join(" ")),
            }),
            _ => Err(CommandError::Usage("found <player> <x> <y> [name]")),
        },
        "village" => one_id(args, "village <id>").map(|village| Command::Village { village }),
        "resources" => match args {
            [] => Ok(Command::Resources { village: None }),
            [v] => Ok(Command::Resources { village: Some(id(v)?) }),
            _ => Err(CommandError::Usage("resources [village]")),
        },
        "upgrade" | "cancel" => match args {
            [village, slot] => {
                let village = id(village)?;
                let slot = slot_ref(slot)?;
                Ok(if head == "upgrade" {
                    Command::Upgrade { village, slot }
                } else {
                    Command::Cancel { village, slot }
                })
            }
            _ => Err(CommandError::Usage("upgrade|cancel <village> <slot>")),
        },
        "build" => match args {
            [village, slot, structure] => Ok(Command::Build {
                village: id(village)?,
                slot: number("slot", slot)?,
                structure: Structure::from_name(structure).ok_or_else(|| invalid("structure", structure))?,
            }),
            _ => Err(CommandError::Usage("build <village> <slot> <structure>")),
        },
        "train" => match args {
            [village, unit, quantity] => Ok(Command::Train {
                village: id(village)?,
                unit: UnitType::from_name(unit).ok_or_else(|| invalid("unit", unit))?,
                quantity: number("quantity", quantity)?,
            }),
            _ => Err(CommandError::Usage("train <village> <unit> <quantity>")),
        },
        "send" => match args {
            [from, to, kind, troops @ ..] if !troops.is_empty() => Ok(Command::Send {
                from: id(from)?,
                to: id(to)?,
                kind: AttackKind::from_name(kind).ok_or_else(|| invalid("movement", kind))?,
                troops: troops.iter().map(|t| unit_count(t)).collect::<Result<_, _>>()?,
            }),
            _ => Err(CommandError::Usage("send <from> <to> <kind> <unit>:<n>...")),
        },
        "trade" => match args {
            [from, to, wood, clay, iron, crop] => Ok(Command::Trade {
                from: id(from)?,
                to: id(to)?,
                resources: Resources::new(
                    number("wood", wood)?,
                    number("clay", clay)?,
                    number("iron", iron)?,
                    number("crop", crop)?,
                ),
            }),
            _ => Err(CommandError::Usage("trade <from> <to> <wood> <clay> <iron> <crop>")),
        },
        "recall" => match args {
            [host, owner] => Ok(Command::Recall {
                host: id(host)?,
                owner: id(owner)?,
            }),
            _ => Err(CommandError::Usage("recall <host> <owner>")),
        },
        "release" => one_id(args, "release <village>").map(|village| Command::Release { village }),
        "destroy" => one_id(args, "destroy <village>").map(|village| Command::Destroy { village }),
        "oasis" => match args {
            [x, y, bonuses @ ..] => Ok(Command::Oasis {
                coordinates: Coordinates::new(number("x", x)?, number("y", y)?),
                bonuses: bonuses.iter().map(|b| oasis_bonus(b)).collect::<Result<_, _>>()?,
            }),
            _ => Err(CommandError::Usage("oasis <x> <y> <resource>:<percent>...")),
        },
        "claim" => match args {
            [village, oasis] => Ok(Command::Claim {
                village: id(village)?,
                oasis: id(oasis)?,
            }),
            _ => Err(CommandError::Usage("claim <village> <oasis>")),
        },
        "boost" => match args {
            [player, resource, percent, hours] => Ok(Command::Boost {
                player: id(player)?,
                resource: ResourceKind::from_name(resource).ok_or_else(|| invalid("resource", resource))?,
                percent: number("percent", percent)?,
                hours: number("hours", hours)?,
            }),
            _ => Err(CommandError::Usage("boost <player> <resource> <percent> <hours>")),
        },
        "entitle" => match args {
            [player, hours] => Ok(Command::Entitle {
                player: id(player)?,
                hours: number("hours", hours)?,
            }),
            _ => Err(CommandError::Usage("entitle <player> <hours>")),
        },
        "reports" => one_id(args, "reports <village>").map(|village| Command::Reports { village }),
        "events" => one_id(args, "events <village>").map(|village| Command::Events { village }),
        "inbox" => match args {
            ["village", v] => Ok(Command::Inbox {
                recipient: Recipient::Village(id(v)?),
            }),
            ["user", u] => Ok(Command::Inbox {
                recipient: Recipient::User(id(u)?),
            }),
            _ => Err(CommandError::Usage("inbox village|user <id>")),
        },
        "advance" => match args {
            [secs] => Ok(Command::Advance {
                secs: number("seconds", secs)?,
            }),
            _ => Err(CommandError::Usage("advance <seconds>")),
        },
        "poll" => Ok(Command::Poll),
        "quit" => Ok(Command::Quit),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn invalid(what: &'static str, value: &str) -> CommandError {
    CommandError::Invalid {
        what,
        value: value.to_string(),
    }
}

fn number<T: std::str::FromStr>(what: &'static str, s: &str) -> Result<T, CommandError> {
    s.parse().map_err(|_| invalid(what, s))
}

fn id(s: &str) -> Result<u64, CommandError> {
    number("id", s)
}

fn one_id(args: &[&str], usage: &'static str) -> Result<u64, CommandError> {
    match args {
        [v] => id(v),
        _ => Err(CommandError::Usage(usage)),
    }
}

/// Slots 1-18 are fields, 19-40 buildings.
fn slot_ref(s: &str) -> Result<SlotRef, CommandError> {
    match number::<u8>("slot", s)? {
        n @ 1..=FIELD_SLOTS => Ok(SlotRef::field(n)),
        n if n <= LAST_BUILDING_SLOT => Ok(SlotRef::building(n)),
        _ => Err(invalid("slot", s)),
    }
}

fn unit_count(s: &str) -> Result<UnitCount, CommandError> {
    let (unit, quantity) = s.split_once(':').ok_or_else(|| invalid("troops", s))?;
    Ok(UnitCount::new(
        UnitType::from_name(unit).ok_or_else(|| invalid("unit", unit))?,
        number("quantity", quantity)?,
    ))
}

fn oasis_bonus(s: &str) -> Result<OasisBonus, CommandError> {
    let (resource, percent) = s.split_once(':').ok_or_else(|| invalid("bonus", s))?;
    Ok(OasisBonus {
        resource: ResourceKind::from_name(resource).ok_or_else(|| invalid("resource", resource))?,
        percent: number("percent", percent)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_line() {
        assert_eq!(parse_command(""), Err(CommandError::Empty));
        assert_eq!(parse_command(" \t "), Err(CommandError::Empty));
    }

    #[test]
    fn parse_unknown_command() {
        assert_eq!(parse_command("foobar 1"), Err(CommandError::Unknown("foobar".into())));
    }

    #[test]
    fn parse_player() {
        assert_eq!(
            parse_command("player ana gaul"),
            Ok(Command::Player { name: "ana".into(), tribe: Tribe::Gaul })
        );
        assert!(matches!(parse_command("player ana elves"), Err(CommandError::Invalid { what: "tribe", .. })));
    }

    #[test]
    fn parse_found_with_and_without_name() {
        assert_eq!(
            parse_command("found 1 -3 4"),
            Ok(Command::Found { player: 1, coordinates: Coordinates::new(-3, 4), name: None })
        );
        assert_eq!(
            parse_command("found 1 0 0 New Town"),
            Ok(Command::Found { player: 1, coordinates: Coordinates::new(0, 0), name: Some("New Town".into()) })
        );
    }

    #[test]
    fn slot_numbers_pick_the_area() {
        assert_eq!(parse_command("upgrade 5 18"), Ok(Command::Upgrade { village: 5, slot: SlotRef::field(18) }));
        assert_eq!(parse_command("cancel 5 19"), Ok(Command::Cancel { village: 5, slot: SlotRef::building(19) }));
        assert!(parse_command("upgrade 5 0").is_err());
        assert!(parse_command("upgrade 5 41").is_err());
    }

    #[test]
    fn parse_send_manifest() {
        assert_eq!(
            parse_command("send 2 3 raid clubswinger:10 axeman:4"),
            Ok(Command::Send {
                from: 2,
                to: 3,
                kind: AttackKind::Raid,
                troops: vec![UnitCount::new(UnitType::Clubswinger, 10), UnitCount::new(UnitType::Axeman, 4)],
            })
        );
        assert!(matches!(parse_command("send 2 3 raid"), Err(CommandError::Usage(_))));
        assert!(parse_command("send 2 3 raid clubswinger").is_err());
        assert!(parse_command("send 2 3 siege axeman:1").is_err());
    }

    #[test]
    fn parse_trade_and_bonuses() {
        assert_eq!(
            parse_command("trade 1 2 100 0 50 0"),
            Ok(Command::Trade { from: 1, to: 2, resources: Resources::new(100, 0, 50, 0) })
        );
        assert_eq!(
            parse_command("oasis 3 3 crop:25 wood:25"),
            Ok(Command::Oasis {
                coordinates: Coordinates::new(3, 3),
                bonuses: vec![
                    OasisBonus { resource: ResourceKind::Crop, percent: 25 },
                    OasisBonus { resource: ResourceKind::Wood, percent: 25 },
                ],
            })
        );
        assert_eq!(
            parse_command("boost 1 iron 25 24"),
            Ok(Command::Boost { player: 1, resource: ResourceKind::Iron, percent: 25, hours: 24 })
        );
    }

    #[test]
    fn parse_inbox_and_clock_commands() {
        assert_eq!(parse_command("inbox user 4"), Ok(Command::Inbox { recipient: Recipient::User(4) }));
        assert_eq!(parse_command("advance 3600"), Ok(Command::Advance { secs: 3600 }));
        assert_eq!(parse_command("poll"), Ok(Command::Poll));
        assert_eq!(parse_command("quit"), Ok(Command::Quit));
        assert!(parse_command("advance soon").is_err());
    }
}
