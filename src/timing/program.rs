// Copyright 2026 pulseblaster-ind Contributors
// SPDX-License-Identifier: Apache-2.0

//! Compiled instruction programs.
//!
//! A [`Program`] is what the schedule compiler hands to a board: an ordered
//! list of [`Instruction`]s, each holding the combined channel bitmask for
//! one interval, plus the loop semantics the flags encode.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::types::TimingSpec;

/// How many times the program body runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopCount {
    /// Branch back to the first instruction forever.
    Infinite,
    /// Run the body `n` times.
    Repeat(NonZeroU32),
}

impl LoopCount {
    /// Finite repeat count, `None` for an infinite loop.
    pub fn repeats(&self) -> Option<u32> {
        match self {
            LoopCount::Infinite => None,
            LoopCount::Repeat(n) => Some(n.get()),
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, LoopCount::Infinite)
    }
}

/// `0` means infinite.
impl From<u32> for LoopCount {
    fn from(count: u32) -> Self {
        match NonZeroU32::new(count) {
            Some(n) => LoopCount::Repeat(n),
            None => LoopCount::Infinite,
        }
    }
}

impl fmt::Display for LoopCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopCount::Infinite => write!(f, "infinite"),
            LoopCount::Repeat(n) => write!(f, "{}x", n),
        }
    }
}

/// Control-flow role of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionFlag {
    /// Continue to the next instruction.
    Normal,
    /// First instruction of a finite loop.
    LoopStart,
    /// Last instruction of a finite loop, with its repeat count.
    LoopEnd(u32),
    /// Branch back to the first instruction.
    Branch,
    /// Halt the board. Only appears as the trailing sentinel.
    Stop,
}

impl fmt::Display for InstructionFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstructionFlag::Normal => write!(f, "CONTINUE"),
            InstructionFlag::LoopStart => write!(f, "LOOP"),
            InstructionFlag::LoopEnd(count) => write!(f, "END_LOOP({})", count),
            InstructionFlag::Branch => write!(f, "BRANCH"),
            InstructionFlag::Stop => write!(f, "STOP"),
        }
    }
}

/// One hardware instruction: hold `mask` for `duration_ns`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Bit `n` set means channel `n` is high.
    pub mask: u32,
    pub duration_ns: u64,
    pub flag: InstructionFlag,
}

impl Instruction {
    pub fn new(mask: u32, duration_ns: u64) -> Self {
        Self {
            mask,
            duration_ns,
            flag: InstructionFlag::Normal,
        }
    }

    pub fn is_stop(&self) -> bool {
        self.flag == InstructionFlag::Stop
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#08x} {:>10}ns {}",
            self.mask, self.duration_ns, self.flag
        )
    }
}

/// An ordered instruction program ready for submission to a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    instructions: Vec<Instruction>,
    loops: LoopCount,
    cycle_length_ns: u64,
    timing: TimingSpec,
}

impl Program {
    pub(crate) fn new(
        instructions: Vec<Instruction>,
        loops: LoopCount,
        cycle_length_ns: u64,
        timing: TimingSpec,
    ) -> Self {
        Self {
            instructions,
            loops,
            cycle_length_ns,
            timing,
        }
    }

    /// All instructions, including a trailing STOP sentinel if present.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn loops(&self) -> LoopCount {
        self.loops
    }

    pub fn cycle_length_ns(&self) -> u64 {
        self.cycle_length_ns
    }

    pub fn timing(&self) -> &TimingSpec {
        &self.timing
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Instructions without the STOP sentinel.
    pub fn body(&self) -> &[Instruction] {
        match self.instructions.last() {
            Some(last) if last.is_stop() => &self.instructions[..self.instructions.len() - 1],
            _ => &self.instructions,
        }
    }

    pub fn has_stop(&self) -> bool {
        self.instructions.last().is_some_and(Instruction::is_stop)
    }

    /// Sum of the body durations for one pass.
    pub fn total_duration_ns(&self) -> u64 {
        self.body().iter().map(|inst| inst.duration_ns).sum()
    }

    /// Replay the body and return the mask active at `t_ns`.
    ///
    /// Returns `None` past the end of the body.
    pub fn mask_at(&self, t_ns: u64) -> Option<u32> {
        let mut elapsed = 0u64;
        for inst in self.body() {
            elapsed += inst.duration_ns;
            if t_ns < elapsed {
                return Some(inst.mask);
            }
        }
        None
    }

    /// Structural check a driver relies on before programming a board.
    ///
    /// Body durations must hold a minimum pulse (a single-instruction body
    /// is exempt) and every mask must fit in `num_channels` bits.
    pub fn validate_for(&self, num_channels: u8) -> Result<(), String> {
        let body = self.body();
        if body.is_empty() {
            return Err("program has no instructions".into());
        }

        let allowed: u32 = if num_channels >= 32 {
            u32::MAX
        } else {
            (1u32 << num_channels) - 1
        };

        for (i, inst) in self.instructions.iter().enumerate() {
            if inst.mask & !allowed != 0 {
                return Err(format!(
                    "instruction {} mask {:#x} exceeds the {}-channel bitmask",
                    i, inst.mask, num_channels
                ));
            }
        }

        if body.len() > 1 {
            if let Some((i, inst)) = body
                .iter()
                .enumerate()
                .find(|(_, inst)| inst.duration_ns < self.timing.minimum_pulse_ns)
            {
                return Err(format!(
                    "instruction {} lasts {}ns, shorter than the {}ns minimum pulse",
                    i, inst.duration_ns, self.timing.minimum_pulse_ns
                ));
            }
        }

        Ok(())
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "# {} instruction(s), cycle {}ns, loops {}",
            self.instructions.len(),
            self.cycle_length_ns,
            self.loops
        )?;
        for (i, inst) in self.instructions.iter().enumerate() {
            writeln!(f, "{:>4}  {}", i, inst)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(instructions: Vec<Instruction>, loops: LoopCount) -> Program {
        let cycle = instructions.iter().map(|i| i.duration_ns).sum();
        Program::new(instructions, loops, cycle, TimingSpec::default())
    }

    // =========================================================================
    // LoopCount
    // =========================================================================

    #[test]
    fn test_loop_count_zero_is_infinite() {
        assert_eq!(LoopCount::from(0), LoopCount::Infinite);
        assert!(LoopCount::from(0).is_infinite());
        assert_eq!(LoopCount::from(0).repeats(), None);
    }

    #[test]
    fn test_loop_count_repeat() {
        let loops = LoopCount::from(5);
        assert_eq!(loops.repeats(), Some(5));
        assert_eq!(loops.to_string(), "5x");
    }

    // =========================================================================
    // Display
    // =========================================================================

    #[test]
    fn test_instruction_display() {
        let inst = Instruction {
            mask: 0x3,
            duration_ns: 100,
            flag: InstructionFlag::LoopEnd(4),
        };
        assert_eq!(inst.to_string(), "0x000003        100ns END_LOOP(4)");
    }

    #[test]
    fn test_program_display_lists_every_instruction() {
        let p = program(
            vec![Instruction::new(1, 100), Instruction::new(0, 100)],
            LoopCount::Infinite,
        );
        let text = p.to_string();
        assert!(text.starts_with("# 2 instruction(s), cycle 200ns, loops infinite"));
        assert_eq!(text.lines().count(), 3);
    }

    // =========================================================================
    // Body and replay
    // =========================================================================

    #[test]
    fn test_body_strips_stop() {
        let stop = Instruction {
            mask: 0,
            duration_ns: 20,
            flag: InstructionFlag::Stop,
        };
        let p = program(
            vec![Instruction::new(1, 100), Instruction::new(0, 100), stop],
            LoopCount::from(1),
        );
        assert!(p.has_stop());
        assert_eq!(p.len(), 3);
        assert_eq!(p.body().len(), 2);
        assert_eq!(p.total_duration_ns(), 200);
    }

    #[test]
    fn test_mask_at_replay() {
        let p = program(
            vec![Instruction::new(1, 100), Instruction::new(3, 60)],
            LoopCount::Infinite,
        );
        assert_eq!(p.mask_at(0), Some(1));
        assert_eq!(p.mask_at(99), Some(1));
        assert_eq!(p.mask_at(100), Some(3));
        assert_eq!(p.mask_at(159), Some(3));
        assert_eq!(p.mask_at(160), None);
    }

    // =========================================================================
    // validate_for
    // =========================================================================

    #[test]
    fn test_validate_for_ok() {
        let p = program(
            vec![Instruction::new(1, 100), Instruction::new(0, 50)],
            LoopCount::Infinite,
        );
        assert!(p.validate_for(24).is_ok());
    }

    #[test]
    fn test_validate_for_mask_too_wide() {
        let p = program(vec![Instruction::new(1 << 5, 100)], LoopCount::Infinite);
        let err = p.validate_for(4).unwrap_err();
        assert!(err.contains("4-channel"));
        assert!(p.validate_for(32).is_ok());
    }

    #[test]
    fn test_validate_for_short_instruction() {
        let p = program(
            vec![Instruction::new(1, 100), Instruction::new(0, 30)],
            LoopCount::Infinite,
        );
        let err = p.validate_for(24).unwrap_err();
        assert!(err.contains("30ns"));
    }

    #[test]
    fn test_validate_for_single_short_instruction_allowed() {
        let p = program(vec![Instruction::new(0, 20)], LoopCount::Infinite);
        assert!(p.validate_for(24).is_ok());
    }

    #[test]
    fn test_validate_for_empty() {
        let p = program(vec![], LoopCount::Infinite);
        assert!(p.validate_for(24).is_err());
    }

    #[test]
    fn test_program_json_round_trip_keeps_flags() {
        let p = program(
            vec![
                Instruction {
                    mask: 1,
                    duration_ns: 100,
                    flag: InstructionFlag::LoopStart,
                },
                Instruction {
                    mask: 0,
                    duration_ns: 100,
                    flag: InstructionFlag::LoopEnd(3),
                },
            ],
            LoopCount::from(3),
        );
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"loop_end\":3"));
        let back: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
