//! Deferred state transitions: the durable queue, the handler for each
//! event kind, and the loop that dispatches due events.

mod battle;
pub mod dispatcher;
pub mod handlers;
pub mod queue;

pub use battle::LOYALTY_PER_CHIEF;
pub use dispatcher::{Dispatcher, PollReport};
pub use handlers::{handle, HandlerContext};
pub use queue::{Claim, Event, EventPayload, EventQueue};
