// Copyright 2026 pulseblaster-ind Contributors
// SPDX-License-Identifier: Apache-2.0

//! Schedule plan files.
//!
//! A plan is a YAML description of one cycle:
//!
//! ```yaml
//! cycle_length_ns: 4000
//! loops: 0            # 0 repeats forever
//! auto_stop: false    # optional, defaults to the board setting
//! channels:
//!   - channel: 0
//!     pulses:
//!       - { start_ns: 0, duration_ns: 1000 }
//!   - channel: 3
//!     clock_period_ns: 200
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BoardConfig;
use crate::error::Result;
use crate::timing::{ChannelId, LoopCount, Pulse, Schedule, TimingSpec};

/// A schedule as written in a plan file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulePlan {
    /// Length of one cycle
    pub cycle_length_ns: u64,

    /// Cycle repetitions, 0 for infinite
    #[serde(default = "default_loops")]
    pub loops: u32,

    /// Overrides the board's auto-stop setting
    #[serde(default)]
    pub auto_stop: Option<bool>,

    /// Per-channel pulses
    #[serde(default)]
    pub channels: Vec<ChannelPlan>,
}

/// Pulses requested on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPlan {
    pub channel: ChannelId,

    #[serde(default)]
    pub pulses: Vec<Pulse>,

    /// Generate a 50% duty-cycle clock with this period
    #[serde(default)]
    pub clock_period_ns: Option<u64>,
}

fn default_loops() -> u32 {
    1
}

impl SchedulePlan {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn loop_count(&self) -> LoopCount {
        LoopCount::from(self.loops)
    }

    /// Build a validated schedule for `board`.
    ///
    /// The clock, if any, is generated before the channel's explicit pulses.
    pub fn build(&self, timing: &TimingSpec, board: &BoardConfig) -> Result<Schedule> {
        let mut schedule = Schedule::new(*timing, self.cycle_length_ns)?
            .with_channel_count(board.num_channels)?
            .with_auto_stop(self.auto_stop.unwrap_or(board.auto_stop));

        for plan in &self.channels {
            schedule.add_channel(plan.channel)?;
            if let Some(period_ns) = plan.clock_period_ns {
                schedule.make_clock(plan.channel, period_ns)?;
            }
            for pulse in &plan.pulses {
                schedule.add_pulse(plan.channel, pulse.start_ns, pulse.duration_ns)?;
            }
            debug!(
                channel = plan.channel,
                pulses = plan.pulses.len(),
                clock_period_ns = ?plan.clock_period_ns,
                "Added channel from plan"
            );
        }

        Ok(schedule)
    }
}
