//! Podium Core — shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that all bounded
//! contexts depend on: the aggregate and event contracts, the stores the
//! orchestration spine is built on, and the generic aggregate repository.
//! It contains no infrastructure code.

pub mod aggregate;
pub mod bus;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod job;
pub mod kv;
pub mod repository;
pub mod rng;
