//! Application layer of the competition context.

pub mod command_handlers;
pub mod query_handlers;
pub mod store;
