//! Application layer of the draft context.

pub mod command_handlers;
pub mod query_handlers;
