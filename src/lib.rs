// Copyright 2026 pulseblaster-ind Contributors
// SPDX-License-Identifier: Apache-2.0

//! Independent per-channel programming for PulseBlaster TTL boards.
//!
//! Pulses are requested per channel, as if every output had its own
//! sequencer. The schedule compiler merges the channels into the single
//! instruction stream the board executes, where each instruction holds one
//! output bitmask for one duration.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            pbind CLI / plan files        │
//! ├─────────────────────────────────────────┤
//! │   Schedule ──compile──▶ Program          │
//! │   (per-channel timelines)                │
//! ├─────────────────────────────────────────┤
//! │   Board ──▶ PulseBlasterDriver           │
//! │             (vendor library / recorder)  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`timing`]: Channel timelines and the schedule compiler
//! - [`driver`]: Driver trait, board handle and recording driver
//! - [`plan`]: YAML schedule files
//! - [`validation`]: Pulse validation utilities
//! - [`error`]: Error types

pub mod config;
pub mod driver;
pub mod error;
pub mod plan;
pub mod timing;
pub mod validation;

pub use config::Config;
pub use error::{Error, Result};

#[cfg(test)]
pub mod test_utils;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
