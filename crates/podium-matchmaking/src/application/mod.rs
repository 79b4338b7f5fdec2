//! Application layer of the matchmaking context.

pub mod command_handlers;
pub mod query_handlers;
