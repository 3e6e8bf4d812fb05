// Copyright 2026 pulseblaster-ind Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared test utilities for driver and board tests.

use crate::driver::r#trait::{Opcode, PulseBlasterDriver};
use crate::driver::{DriverCall, RecordingDriver};
use crate::error::DriverError;
use crate::timing::{LoopCount, Program, Schedule, TimingSpec};

/// Driver call that [`FailingDriver`] refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Init,
    /// Fail when writing the instruction at this address.
    Instruction(u32),
    Start,
}

/// Driver that records like [`RecordingDriver`] but fails one chosen call.
pub struct FailingDriver {
    inner: RecordingDriver,
    fail_at: FailAt,
    next_address: u32,
}

impl FailingDriver {
    pub fn new(fail_at: FailAt) -> Self {
        Self {
            inner: RecordingDriver::new(),
            fail_at,
            next_address: 0,
        }
    }

    /// Calls that went through, in order.
    pub fn calls(&self) -> &[DriverCall] {
        self.inner.calls()
    }
}

impl PulseBlasterDriver for FailingDriver {
    fn name(&self) -> &str {
        "failing"
    }

    fn select_board(&mut self, index: u32) -> Result<(), DriverError> {
        self.inner.select_board(index)
    }

    fn init(&mut self) -> Result<(), DriverError> {
        if self.fail_at == FailAt::Init {
            return Err(DriverError::Unavailable("injected init failure".into()));
        }
        self.inner.init()
    }

    fn set_core_clock(&mut self, mhz: f64) -> Result<(), DriverError> {
        self.inner.set_core_clock(mhz)
    }

    fn reset(&mut self) -> Result<(), DriverError> {
        self.inner.reset()
    }

    fn start_programming(&mut self) -> Result<(), DriverError> {
        self.next_address = 0;
        self.inner.start_programming()
    }

    fn instruction(
        &mut self,
        flags: u32,
        opcode: Opcode,
        data: u32,
        duration_ns: u64,
    ) -> Result<u32, DriverError> {
        if self.fail_at == FailAt::Instruction(self.next_address) {
            return Err(DriverError::Programming(format!(
                "injected failure at address {}",
                self.next_address
            )));
        }
        self.next_address += 1;
        self.inner.instruction(flags, opcode, data, duration_ns)
    }

    fn stop_programming(&mut self) -> Result<(), DriverError> {
        self.inner.stop_programming()
    }

    fn start(&mut self) -> Result<(), DriverError> {
        if self.fail_at == FailAt::Start {
            return Err(DriverError::Unavailable("injected start failure".into()));
        }
        self.inner.start()
    }

    fn stop(&mut self) -> Result<(), DriverError> {
        self.inner.stop()
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.inner.close()
    }
}

/// A program that alternates channel 0 every `half_period_ns`.
pub fn square_wave_program(half_period_ns: u64, loops: LoopCount) -> Program {
    let mut schedule = Schedule::new(TimingSpec::default(), 2 * half_period_ns).unwrap();
    schedule.add_pulse(0, 0, half_period_ns).unwrap();
    schedule.compile(loops).unwrap()
}
