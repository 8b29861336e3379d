//! Text protocol spoken by the binary on stdin/stdout.

pub mod parser;
pub mod session;

pub use parser::{parse_command, Command, CommandError};
pub use session::{Flow, Session};
