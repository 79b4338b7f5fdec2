//! Application layer of the session context.

pub mod archive;
pub mod command_handlers;
pub mod dto;
pub mod notifier;
pub mod query_handlers;
pub mod roster;
