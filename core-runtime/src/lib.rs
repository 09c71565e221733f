//! # Core Runtime Module
//!
//! Ambient infrastructure shared by the playback core:
//! - Logging and tracing setup ([`logging`])
//! - Host bridge injection ([`config`])
//! - Observer notification bus ([`events`])
//!
//! Nothing here knows about queues or engines; it only establishes the
//! logging conventions, dependency wiring and broadcast mechanism the
//! `core-playback` crate builds on.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
