// Copyright 2026 pulseblaster-ind Contributors
// SPDX-License-Identifier: Apache-2.0

//! Schedule compiler: independent channel timelines to one instruction stream.
//!
//! The board executes a single stream of (bitmask, duration) instructions,
//! but callers think per channel. [`Schedule`] collects the per-channel
//! pulses and [`Schedule::compile`] merges them:
//!
//! 1. Union every channel's boundaries with `0` and the cycle end.
//! 2. Reject any interval between consecutive boundaries that is shorter
//!    than the minimum pulse. Simultaneous changes collapse into one
//!    boundary, so they never conflict.
//! 3. Sample the combined bitmask at the start of each interval.
//! 4. Collapse consecutive intervals with the same bitmask.
//! 5. Mark loop control on the first/last instruction.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use super::channel::ChannelTimeline;
use super::program::{Instruction, InstructionFlag, LoopCount, Program};
use super::types::{ChannelId, Pulse, TimingSpec, MAX_CHANNELS};
use crate::error::{Error, MinimumPulseViolationError, Result};
use crate::validation;

/// Channel count of a standard 24-bit PulseBlaster.
pub const DEFAULT_NUM_CHANNELS: u8 = 24;

/// Per-channel pulse timelines over one program cycle.
///
/// # Builder pattern
///
/// Use [`add_pulse`](Schedule::add_pulse) and
/// [`make_clock`](Schedule::make_clock) to populate channels incrementally.
/// Each addition is validated on the spot; inter-channel conflicts are
/// detected by [`compile`](Schedule::compile).
#[derive(Debug, Clone)]
pub struct Schedule {
    timing: TimingSpec,
    cycle_length_ns: u64,
    num_channels: u8,
    auto_stop: bool,
    channels: BTreeMap<ChannelId, ChannelTimeline>,
}

impl Schedule {
    /// Create an empty schedule for a cycle of `cycle_length_ns`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the timing spec is invalid or the cycle
    /// length is zero or off the resolution grid.
    pub fn new(timing: TimingSpec, cycle_length_ns: u64) -> Result<Self> {
        timing.validate()?;
        if cycle_length_ns == 0 {
            return Err(Error::Config("cycle length must be positive".into()));
        }
        if !timing.is_aligned(cycle_length_ns) {
            return Err(Error::Config(format!(
                "cycle length {}ns is not a multiple of the {}ns resolution",
                cycle_length_ns, timing.resolution_ns
            )));
        }
        Ok(Self {
            timing,
            cycle_length_ns,
            num_channels: DEFAULT_NUM_CHANNELS,
            auto_stop: false,
            channels: BTreeMap::new(),
        })
    }

    /// Set the bitmask width of the target board.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `num_channels` is outside `1..=32` or a
    /// channel already registered would not fit.
    pub fn with_channel_count(mut self, num_channels: u8) -> Result<Self> {
        if num_channels == 0 || num_channels > MAX_CHANNELS {
            return Err(Error::Config(format!(
                "channel count must be between 1 and {}, got {}",
                MAX_CHANNELS, num_channels
            )));
        }
        if let Some(&highest) = self.channels.keys().next_back() {
            if highest >= num_channels {
                return Err(Error::Config(format!(
                    "channel {} already in use does not fit a {}-channel board",
                    highest, num_channels
                )));
            }
        }
        self.num_channels = num_channels;
        Ok(self)
    }

    /// Append a STOP sentinel after finite programs.
    pub fn with_auto_stop(mut self, auto_stop: bool) -> Self {
        self.auto_stop = auto_stop;
        self
    }

    pub fn timing(&self) -> &TimingSpec {
        &self.timing
    }

    pub fn cycle_length_ns(&self) -> u64 {
        self.cycle_length_ns
    }

    pub fn num_channels(&self) -> u8 {
        self.num_channels
    }

    /// Declare a channel, returning its timeline. Declaring twice is a no-op.
    ///
    /// Pulses are added through [`add_pulse`](Schedule::add_pulse) so every
    /// pulse is checked against the cycle.
    pub fn add_channel(&mut self, channel: ChannelId) -> Result<&ChannelTimeline> {
        self.check_channel(channel)?;
        let timing = self.timing;
        Ok(&*self
            .channels
            .entry(channel)
            .or_insert_with(|| ChannelTimeline::new(channel, timing)))
    }

    /// Register a high period on `channel`.
    ///
    /// Returns `&mut self` for chaining.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the channel is outside the bitmask
    /// - [`Error::InvalidTiming`] if the pulse is misaligned, too short,
    ///   overlaps the channel's pulses, or does not fit in the cycle
    pub fn add_pulse(
        &mut self,
        channel: ChannelId,
        start_ns: u64,
        duration_ns: u64,
    ) -> Result<&mut Self> {
        self.check_channel(channel)?;
        let pulse = Pulse::new(start_ns, duration_ns);
        validation::validate_pulse(channel, &pulse, &self.timing)?;
        validation::validate_within_cycle(channel, &pulse, self.cycle_length_ns)?;

        // A rejected pulse does not register its channel
        match self.channels.entry(channel) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().add_pulse(start_ns, duration_ns)?;
            }
            Entry::Vacant(entry) => {
                let mut timeline = ChannelTimeline::new(channel, self.timing);
                timeline.add_pulse(start_ns, duration_ns)?;
                entry.insert(timeline);
            }
        }
        Ok(self)
    }

    /// Drive `channel` with a 50% duty-cycle clock of `period_ns` from time
    /// zero, for as many whole periods as fit in the cycle.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidTiming`] if a half period is below the minimum
    ///   pulse or the period is not a multiple of twice the resolution
    /// - any error of [`add_pulse`](Schedule::add_pulse)
    ///
    /// Either every tick is added or the channel is left unchanged.
    pub fn make_clock(&mut self, channel: ChannelId, period_ns: u64) -> Result<&mut Self> {
        self.check_channel(channel)?;
        validation::validate_clock_period(channel, period_ns, &self.timing)?;

        let mut timeline = self
            .channels
            .get(&channel)
            .cloned()
            .unwrap_or_else(|| ChannelTimeline::new(channel, self.timing));

        let half = period_ns / 2;
        let mut cursor = 0;
        let mut ticks = 0u64;
        while cursor + period_ns <= self.cycle_length_ns {
            timeline.add_pulse(cursor, half)?;
            cursor += period_ns;
            ticks += 1;
        }

        if ticks > 0 {
            self.channels.insert(channel, timeline);
        }

        if ticks == 0 {
            warn!(
                channel,
                period_ns,
                cycle_length_ns = self.cycle_length_ns,
                "Clock period longer than the cycle, no ticks programmed"
            );
        } else {
            debug!(channel, period_ns, ticks, "Programmed clock");
        }
        Ok(self)
    }

    pub fn channel(&self, channel: ChannelId) -> Option<&ChannelTimeline> {
        self.channels.get(&channel)
    }

    /// Declared channels in ascending bit order.
    pub fn channels(&self) -> impl Iterator<Item = &ChannelTimeline> {
        self.channels.values()
    }

    /// All boundaries of the schedule, including `0` and the cycle end,
    /// sorted and deduplicated.
    pub fn boundaries(&self) -> Vec<u64> {
        let mut merged: BTreeSet<u64> = BTreeSet::from([0, self.cycle_length_ns]);
        for timeline in self.channels.values() {
            merged.extend(timeline.boundaries());
        }
        merged.into_iter().collect()
    }

    /// Combined bitmask of every channel at `t_ns`.
    pub fn mask_at(&self, t_ns: u64) -> u32 {
        self.channels
            .values()
            .filter(|timeline| timeline.value_at(t_ns))
            .fold(0, |mask, timeline| mask | (1u32 << timeline.id()))
    }

    /// Channels that flip at `t_ns` inside the cycle. Empty at the cycle
    /// start and end.
    fn changes_at(&self, t_ns: u64) -> Vec<ChannelId> {
        if t_ns == 0 || t_ns >= self.cycle_length_ns {
            return Vec::new();
        }
        self.channels
            .values()
            .filter(|timeline| timeline.changes_at(t_ns))
            .map(ChannelTimeline::id)
            .collect()
    }

    /// Compile the schedule into an instruction program.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MinimumPulseViolation`] for the shortest interval
    /// below the minimum pulse, the earliest one on a tie. A schedule whose
    /// outputs never change compiles to a single instruction and is exempt.
    pub fn compile(&self, loops: LoopCount) -> Result<Program> {
        let boundaries = self.boundaries();
        let single_interval = boundaries.len() == 2;

        debug!(
            channels = self.channels.len(),
            boundaries = boundaries.len(),
            cycle_length_ns = self.cycle_length_ns,
            "Merged channel boundaries"
        );

        if !single_interval {
            self.check_minimum_pulse(&boundaries)?;
        }

        let mut instructions: Vec<Instruction> = Vec::with_capacity(boundaries.len() - 1);
        for window in boundaries.windows(2) {
            let (start_ns, end_ns) = (window[0], window[1]);
            let duration_ns = end_ns - start_ns;
            let mask = self.mask_at(start_ns);
            match instructions.last_mut() {
                Some(last) if last.mask == mask => last.duration_ns += duration_ns,
                _ => instructions.push(Instruction::new(mask, duration_ns)),
            }
        }

        apply_loop_flags(&mut instructions, loops);

        if self.auto_stop && !loops.is_infinite() {
            instructions.push(Instruction {
                mask: 0,
                duration_ns: self.timing.stop_duration_ns(),
                flag: InstructionFlag::Stop,
            });
        }

        info!(
            instructions = instructions.len(),
            loops = %loops,
            cycle_length_ns = self.cycle_length_ns,
            "Compiled pulse schedule"
        );

        Ok(Program::new(
            instructions,
            loops,
            self.cycle_length_ns,
            self.timing,
        ))
    }

    /// Fail on the shortest interval between `boundaries` that is below the
    /// minimum pulse.
    fn check_minimum_pulse(&self, boundaries: &[u64]) -> Result<()> {
        let minimum_pulse_ns = self.timing.minimum_pulse_ns;
        let shortest = boundaries
            .windows(2)
            .map(|window| (window[0], window[1]))
            .filter(|&(start_ns, end_ns)| end_ns - start_ns < minimum_pulse_ns)
            .min_by_key(|&(start_ns, end_ns)| end_ns - start_ns);

        if let Some((start_ns, end_ns)) = shortest {
            let violation = MinimumPulseViolationError {
                start_ns,
                end_ns,
                minimum_pulse_ns,
                channels_at_start: self.changes_at(start_ns),
                channels_at_end: self.changes_at(end_ns),
                change_times_ns: boundaries[1..boundaries.len() - 1].to_vec(),
            };
            warn!(
                start_ns,
                end_ns,
                channels = ?violation.offending_channels(),
                "Instruction shorter than minimum pulse"
            );
            return Err(violation.into());
        }
        Ok(())
    }

    fn check_channel(&self, channel: ChannelId) -> Result<()> {
        if channel >= self.num_channels {
            return Err(Error::Config(format!(
                "channel {} is outside the {}-channel bitmask",
                channel, self.num_channels
            )));
        }
        Ok(())
    }
}

/// Mark loop control on a collapsed instruction body.
///
/// A hardware loop needs distinct first and last instructions, so a finite
/// repeat of a single instruction is unrolled into one long instruction.
fn apply_loop_flags(instructions: &mut [Instruction], loops: LoopCount) {
    match (loops, instructions) {
        (LoopCount::Infinite, [.., last]) => last.flag = InstructionFlag::Branch,
        (LoopCount::Repeat(n), [only]) => {
            only.duration_ns = only.duration_ns.saturating_mul(u64::from(n.get()));
        }
        (LoopCount::Repeat(n), [first, .., last]) => {
            first.flag = InstructionFlag::LoopStart;
            last.flag = InstructionFlag::LoopEnd(n.get());
        }
        _ => {}
    }
}
