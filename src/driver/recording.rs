// Copyright 2026 pulseblaster-ind Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-memory driver that records every call.
//!
//! Used for debug listings and for exercising [`Board`](super::Board)
//! without hardware.

use std::fmt::Write as _;

use super::r#trait::{Opcode, PulseBlasterDriver};
use crate::error::DriverError;

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    SelectBoard(u32),
    Init,
    SetCoreClock(f64),
    Reset,
    StartProgramming,
    Instruction {
        address: u32,
        flags: u32,
        opcode: Opcode,
        data: u32,
        duration_ns: u64,
    },
    StopProgramming,
    Start,
    Stop,
    Close,
}

/// Driver that accepts every call and keeps a log of them.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    calls: Vec<DriverCall>,
    next_address: u32,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call in the order it was made.
    pub fn calls(&self) -> &[DriverCall] {
        &self.calls
    }

    /// Only the instruction writes.
    pub fn instructions(&self) -> impl Iterator<Item = &DriverCall> {
        self.calls
            .iter()
            .filter(|call| matches!(call, DriverCall::Instruction { .. }))
    }

    /// One `pb_inst_pbonly(...)` line per instruction written.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for call in self.instructions() {
            if let DriverCall::Instruction {
                flags,
                opcode,
                data,
                duration_ns,
                ..
            } = call
            {
                let _ = writeln!(
                    out,
                    "pb_inst_pbonly({:#08x}, {}, {}, {})",
                    flags, opcode, data, duration_ns
                );
            }
        }
        out
    }
}

impl PulseBlasterDriver for RecordingDriver {
    fn name(&self) -> &str {
        "recording"
    }

    fn select_board(&mut self, index: u32) -> Result<(), DriverError> {
        self.calls.push(DriverCall::SelectBoard(index));
        Ok(())
    }

    fn init(&mut self) -> Result<(), DriverError> {
        self.calls.push(DriverCall::Init);
        Ok(())
    }

    fn set_core_clock(&mut self, mhz: f64) -> Result<(), DriverError> {
        self.calls.push(DriverCall::SetCoreClock(mhz));
        Ok(())
    }

    fn reset(&mut self) -> Result<(), DriverError> {
        self.calls.push(DriverCall::Reset);
        Ok(())
    }

    fn start_programming(&mut self) -> Result<(), DriverError> {
        self.next_address = 0;
        self.calls.push(DriverCall::StartProgramming);
        Ok(())
    }

    fn instruction(
        &mut self,
        flags: u32,
        opcode: Opcode,
        data: u32,
        duration_ns: u64,
    ) -> Result<u32, DriverError> {
        let address = self.next_address;
        self.next_address += 1;
        self.calls.push(DriverCall::Instruction {
            address,
            flags,
            opcode,
            data,
            duration_ns,
        });
        Ok(address)
    }

    fn stop_programming(&mut self) -> Result<(), DriverError> {
        self.calls.push(DriverCall::StopProgramming);
        Ok(())
    }

    fn start(&mut self) -> Result<(), DriverError> {
        self.calls.push(DriverCall::Start);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        self.calls.push(DriverCall::Stop);
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.calls.push(DriverCall::Close);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses_restart_per_program() {
        let mut driver = RecordingDriver::new();
        driver.start_programming().unwrap();
        assert_eq!(driver.instruction(1, Opcode::Continue, 0, 100).unwrap(), 0);
        assert_eq!(driver.instruction(0, Opcode::Branch, 0, 100).unwrap(), 1);
        driver.stop_programming().unwrap();

        driver.start_programming().unwrap();
        assert_eq!(driver.instruction(1, Opcode::Continue, 0, 100).unwrap(), 0);
    }

    #[test]
    fn test_listing() {
        let mut driver = RecordingDriver::new();
        driver.start_programming().unwrap();
        driver.instruction(0x3, Opcode::Loop, 5, 100).unwrap();
        driver.instruction(0x0, Opcode::EndLoop, 0, 200).unwrap();
        driver.stop_programming().unwrap();

        assert_eq!(
            driver.listing(),
            "pb_inst_pbonly(0x000003, LOOP, 5, 100)\n\
             pb_inst_pbonly(0x000000, END_LOOP, 0, 200)\n"
        );
    }

    #[test]
    fn test_calls_in_order() {
        let mut driver = RecordingDriver::new();
        driver.select_board(1).unwrap();
        driver.init().unwrap();
        driver.close().unwrap();
        assert_eq!(
            driver.calls(),
            &[DriverCall::SelectBoard(1), DriverCall::Init, DriverCall::Close]
        );
        assert_eq!(driver.instructions().count(), 0);
    }
}
