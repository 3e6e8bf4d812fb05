// Copyright 2026 pulseblaster-ind Contributors
// SPDX-License-Identifier: Apache-2.0

//! Driver boundary.
//!
//! This module provides the [`PulseBlasterDriver`] trait the vendor library
//! is reached through, and:
//!
//! - [`Board`]: an opened board that programs compiled programs
//! - [`RecordingDriver`]: an in-memory driver for listings and tests

pub mod board;
pub mod recording;
pub mod r#trait;

pub use board::{Board, BoardState};
pub use r#trait::{Opcode, PulseBlasterDriver};
pub use recording::{DriverCall, RecordingDriver};
