//! Core domain + application logic for the read adviser bot.
//!
//! This crate is framework-agnostic. Telegram and PostgreSQL live behind
//! ports (traits) implemented in adapter crates.

pub mod command;
pub mod config;
pub mod consumer;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod processor;
pub mod storage;

#[cfg(test)]
mod testing;

pub use errors::{Error, Result};
