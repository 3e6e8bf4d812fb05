// Copyright 2026 pulseblaster-ind Contributors
// SPDX-License-Identifier: Apache-2.0

//! Board handle that programs compiled [`Program`]s through a driver.
//!
//! The handle is thread-safe: every driver call goes through one mutex, so
//! a shared board loads at most one program at a time.

use std::fmt;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::r#trait::{Opcode, PulseBlasterDriver};
use crate::config::BoardConfig;
use crate::error::{DriverError, Result};
use crate::timing::{InstructionFlag, Program};

/// Lifecycle of an opened board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardState {
    /// Initialized, nothing programmed yet
    Ready,
    /// A program is loaded and the board is idle
    Programmed,
    /// The loaded program is executing
    Running,
    /// The board was released
    Closed,
}

impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardState::Ready => write!(f, "ready"),
            BoardState::Programmed => write!(f, "programmed"),
            BoardState::Running => write!(f, "running"),
            BoardState::Closed => write!(f, "closed"),
        }
    }
}

struct Inner<D> {
    driver: D,
    state: BoardState,
}

impl<D> Inner<D> {
    fn ensure_open(&self) -> std::result::Result<(), DriverError> {
        if self.state == BoardState::Closed {
            return Err(DriverError::Unavailable("board is closed".into()));
        }
        Ok(())
    }
}

/// An opened PulseBlaster board.
///
/// # Example
///
/// ```ignore
/// use pulseblaster_ind::config::BoardConfig;
/// use pulseblaster_ind::driver::{Board, RecordingDriver};
///
/// let board = Board::open(RecordingDriver::new(), &BoardConfig::default())?;
/// board.load(&program)?;
/// board.start()?;
/// ```
pub struct Board<D: PulseBlasterDriver> {
    config: BoardConfig,
    inner: Mutex<Inner<D>>,
}

impl<D: PulseBlasterDriver> Board<D> {
    /// Select, initialize, clock and reset the board.
    pub fn open(mut driver: D, config: &BoardConfig) -> Result<Self> {
        config.validate()?;

        driver.select_board(config.index)?;
        driver.init().map_err(|e| match e {
            e @ DriverError::InitFailed { .. } => e,
            other => DriverError::InitFailed {
                board: config.index,
                message: other.to_string(),
            },
        })?;
        driver.set_core_clock(config.core_clock_mhz)?;
        driver.reset()?;

        info!(
            board = config.index,
            driver = driver.name(),
            core_clock_mhz = config.core_clock_mhz,
            "Opened board"
        );

        Ok(Self {
            config: config.clone(),
            inner: Mutex::new(Inner {
                driver,
                state: BoardState::Ready,
            }),
        })
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn state(&self) -> BoardState {
        self.inner.lock().state
    }

    /// Check `program` against the board and write it to program memory.
    ///
    /// Returns the number of instructions written.
    pub fn load(&self, program: &Program) -> Result<usize> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        inner.ensure_open()?;

        program
            .validate_for(self.config.num_channels)
            .map_err(DriverError::InvalidProgram)?;

        // Nothing valid is loaded until programming completes
        inner.state = BoardState::Ready;
        inner.driver.start_programming()?;

        if let Err(e) = write_instructions(&mut inner.driver, program) {
            if let Err(close_err) = inner.driver.stop_programming() {
                warn!(
                    board = self.config.index,
                    error = %close_err,
                    "Failed to close programming after a failed load"
                );
            }
            warn!(board = self.config.index, error = %e, "Program load failed");
            return Err(e.into());
        }

        inner.driver.stop_programming()?;
        inner.state = BoardState::Programmed;

        info!(
            board = self.config.index,
            instructions = program.len(),
            loops = %program.loops(),
            "Loaded program"
        );

        Ok(program.len())
    }

    /// Trigger the loaded program.
    pub fn start(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.ensure_open()?;
        if inner.state == BoardState::Ready {
            return Err(DriverError::Unavailable("no program loaded".into()).into());
        }

        inner.driver.start()?;
        inner.state = BoardState::Running;
        info!(board = self.config.index, "Started board");
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.ensure_open()?;

        inner.driver.stop()?;
        if inner.state == BoardState::Running {
            inner.state = BoardState::Programmed;
        }
        info!(board = self.config.index, "Stopped board");
        Ok(())
    }

    /// Return the board to the start of its program.
    pub fn reset(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.ensure_open()?;

        inner.driver.reset()?;
        if inner.state == BoardState::Running {
            inner.state = BoardState::Programmed;
        }
        debug!(board = self.config.index, "Reset board");
        Ok(())
    }

    /// Release the board. Later calls fail with [`DriverError::Unavailable`].
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.ensure_open()?;

        inner.driver.close()?;
        inner.state = BoardState::Closed;
        info!(board = self.config.index, "Closed board");
        Ok(())
    }

    /// Run `f` against the driver while holding the board lock.
    pub fn with_driver<R>(&self, f: impl FnOnce(&D) -> R) -> R {
        f(&self.inner.lock().driver)
    }

    pub fn into_driver(self) -> D {
        self.inner.into_inner().driver
    }
}

/// Write every instruction of `program`, mapping flags to opcodes.
fn write_instructions<D: PulseBlasterDriver>(
    driver: &mut D,
    program: &Program,
) -> std::result::Result<(), DriverError> {
    let mut first: Option<u32> = None;
    let mut loop_start: Option<u32> = None;
    for inst in program.instructions() {
        let (opcode, data) = match inst.flag {
            InstructionFlag::Normal => (Opcode::Continue, 0),
            InstructionFlag::LoopStart => {
                let count = program.loops().repeats().ok_or_else(|| {
                    DriverError::InvalidProgram("loop start in a program that loops forever".into())
                })?;
                (Opcode::Loop, count)
            }
            InstructionFlag::LoopEnd(_) => {
                let target = loop_start.ok_or_else(|| {
                    DriverError::InvalidProgram("loop end without a loop start".into())
                })?;
                (Opcode::EndLoop, target)
            }
            // Program memory starts at address 0
            InstructionFlag::Branch => (Opcode::Branch, first.unwrap_or(0)),
            InstructionFlag::Stop => (Opcode::Stop, 0),
        };

        let address = driver.instruction(inst.mask, opcode, data, inst.duration_ns)?;
        debug!(
            address,
            mask = inst.mask,
            %opcode,
            data,
            duration_ns = inst.duration_ns,
            "Wrote instruction"
        );

        first.get_or_insert(address);
        if inst.flag == InstructionFlag::LoopStart {
            loop_start = Some(address);
        }
    }
    Ok(())
}
