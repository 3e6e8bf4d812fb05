// Copyright 2026 pulseblaster-ind Contributors
// SPDX-License-Identifier: Apache-2.0

//! PulseBlaster driver trait definition.

use std::fmt;

use crate::error::DriverError;

/// Instruction opcodes, numbered as the vendor library numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Opcode {
    /// Proceed to the next instruction
    Continue = 0,
    /// Halt the board
    Stop = 1,
    /// Open a loop; data is the repeat count
    Loop = 2,
    /// Close a loop; data is the address of the loop start
    EndLoop = 3,
    /// Jump; data is the target address
    Branch = 6,
}

impl Opcode {
    /// Numeric opcode passed to the vendor library.
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Continue => write!(f, "CONTINUE"),
            Opcode::Stop => write!(f, "STOP"),
            Opcode::Loop => write!(f, "LOOP"),
            Opcode::EndLoop => write!(f, "END_LOOP"),
            Opcode::Branch => write!(f, "BRANCH"),
        }
    }
}

/// The low-level calls a PulseBlaster board exposes.
///
/// Implementations wrap the vendor library or, like
/// [`RecordingDriver`](super::RecordingDriver), stand in for it.
pub trait PulseBlasterDriver: Send {
    /// Human-readable driver name.
    fn name(&self) -> &str;

    /// Select which board subsequent calls address.
    fn select_board(&mut self, index: u32) -> Result<(), DriverError>;

    /// Initialize the selected board.
    fn init(&mut self) -> Result<(), DriverError>;

    /// Tell the driver the board's core clock frequency.
    fn set_core_clock(&mut self, mhz: f64) -> Result<(), DriverError>;

    /// Return the board to the start of its program.
    fn reset(&mut self) -> Result<(), DriverError>;

    /// Open the pulse program memory for writing.
    fn start_programming(&mut self) -> Result<(), DriverError>;

    /// Write one instruction and return its address.
    fn instruction(
        &mut self,
        flags: u32,
        opcode: Opcode,
        data: u32,
        duration_ns: u64,
    ) -> Result<u32, DriverError>;

    /// Close the pulse program memory.
    fn stop_programming(&mut self) -> Result<(), DriverError>;

    /// Trigger program execution.
    fn start(&mut self) -> Result<(), DriverError>;

    /// Halt program execution.
    fn stop(&mut self) -> Result<(), DriverError>;

    /// Release the board.
    fn close(&mut self) -> Result<(), DriverError>;
}
