//! Core domain + application logic for the grocery list bot.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! `MessagingPort` trait implemented in the adapter crate.

pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod grocery;
pub mod logging;
pub mod messaging;
pub mod router;
pub mod sync;

pub use errors::{Error, Result};
