// Copyright 2026 pulseblaster-ind Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pulse timelines and the schedule compiler.
//!
//! This module provides:
//!
//! - [`TimingSpec`] and [`Pulse`]: board timing parameters and pulse geometry
//! - [`ChannelTimeline`]: one channel's validated pulses
//! - [`Schedule`]: all channels over one cycle, compiled into a [`Program`]
//! - [`Instruction`], [`InstructionFlag`] and [`LoopCount`]: the program model

pub mod channel;
pub mod compiler;
pub mod program;
pub mod types;

pub use channel::ChannelTimeline;
pub use compiler::Schedule;
pub use program::{Instruction, InstructionFlag, LoopCount, Program};
pub use types::{ChannelId, Pulse, TimingSpec};
