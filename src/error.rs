// Copyright 2026 pulseblaster-ind Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for schedule compilation and board programming.

use std::fmt;

use crate::timing::types::ChannelId;

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate error types.
///
/// None of these are retried internally. Timing errors are programmer
/// errors: fix the schedule and compile again.
#[derive(Debug)]
pub enum Error {
    /// Configuration error (timing spec, cycle length, channel count)
    Config(String),
    /// A single pulse violates resolution, width, overlap or range rules
    InvalidTiming(InvalidTimingError),
    /// Two merged boundaries are closer than the minimum pulse
    MinimumPulseViolation(MinimumPulseViolationError),
    /// Driver boundary error
    Driver(DriverError),
    /// IO error
    Io(std::io::Error),
    /// Serialization error
    Serialization(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::InvalidTiming(e) => write!(f, "Invalid timing: {}", e),
            Error::MinimumPulseViolation(e) => write!(f, "Minimum pulse violation: {}", e),
            Error::Driver(e) => write!(f, "Driver error: {}", e),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::InvalidTiming(e) => Some(e),
            Error::MinimumPulseViolation(e) => Some(e),
            Error::Driver(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<InvalidTimingError> for Error {
    fn from(e: InvalidTimingError) -> Self {
        Error::InvalidTiming(e)
    }
}

impl From<MinimumPulseViolationError> for Error {
    fn from(e: MinimumPulseViolationError) -> Self {
        Error::MinimumPulseViolation(e)
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Error::Driver(e)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// A single pulse that cannot be registered on its channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidTimingError {
    /// Start, duration or period is off the resolution grid
    NotMultipleOfResolution {
        channel: ChannelId,
        field: &'static str,
        value_ns: u64,
        resolution_ns: u64,
    },
    /// Nonzero duration shorter than the minimum pulse
    BelowMinimumPulse {
        channel: ChannelId,
        duration_ns: u64,
        minimum_pulse_ns: u64,
    },
    /// New pulse intersects a pulse already on the channel
    Overlap {
        channel: ChannelId,
        start_ns: u64,
        end_ns: u64,
        existing_start_ns: u64,
        existing_end_ns: u64,
    },
    /// Pulse does not fit inside the program cycle
    OutOfRange {
        channel: ChannelId,
        start_ns: u64,
        end_ns: u64,
        cycle_length_ns: u64,
    },
    /// Clock period cannot be expressed on this board
    InvalidClockPeriod {
        channel: ChannelId,
        period_ns: u64,
        reason: String,
    },
}

impl fmt::Display for InvalidTimingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidTimingError::NotMultipleOfResolution {
                channel,
                field,
                value_ns,
                resolution_ns,
            } => write!(
                f,
                "channel {}: {} {}ns is not a multiple of the {}ns resolution",
                channel, field, value_ns, resolution_ns
            ),
            InvalidTimingError::BelowMinimumPulse {
                channel,
                duration_ns,
                minimum_pulse_ns,
            } => write!(
                f,
                "channel {}: duration {}ns is shorter than the {}ns minimum pulse",
                channel, duration_ns, minimum_pulse_ns
            ),
            InvalidTimingError::Overlap {
                channel,
                start_ns,
                end_ns,
                existing_start_ns,
                existing_end_ns,
            } => write!(
                f,
                "channel {}: pulse [{}ns, {}ns) overlaps existing pulse [{}ns, {}ns)",
                channel, start_ns, end_ns, existing_start_ns, existing_end_ns
            ),
            InvalidTimingError::OutOfRange {
                channel,
                start_ns,
                end_ns,
                cycle_length_ns,
            } => write!(
                f,
                "channel {}: pulse [{}ns, {}ns) falls outside the {}ns cycle",
                channel, start_ns, end_ns, cycle_length_ns
            ),
            InvalidTimingError::InvalidClockPeriod {
                channel,
                period_ns,
                reason,
            } => write!(
                f,
                "channel {}: clock period {}ns {}",
                channel, period_ns, reason
            ),
        }
    }
}

impl std::error::Error for InvalidTimingError {}

/// A merged instruction interval shorter than the minimum pulse.
///
/// `channels_at_start` lists the channels whose change opens the interval
/// (empty when the interval opens the cycle), `channels_at_end` the channels
/// whose change closes it (empty when it runs to the cycle end).
/// `change_times_ns` lists every time inside the cycle where an output
/// changes, in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinimumPulseViolationError {
    pub start_ns: u64,
    pub end_ns: u64,
    pub minimum_pulse_ns: u64,
    pub channels_at_start: Vec<ChannelId>,
    pub channels_at_end: Vec<ChannelId>,
    pub change_times_ns: Vec<u64>,
}

impl MinimumPulseViolationError {
    /// Length of the offending interval.
    pub fn duration_ns(&self) -> u64 {
        self.end_ns - self.start_ns
    }

    /// Every channel involved in the conflict, sorted and deduplicated.
    pub fn offending_channels(&self) -> Vec<ChannelId> {
        let mut channels: Vec<ChannelId> = self
            .channels_at_start
            .iter()
            .chain(&self.channels_at_end)
            .copied()
            .collect();
        channels.sort_unstable();
        channels.dedup();
        channels
    }
}

impl fmt::Display for MinimumPulseViolationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "instruction [{}ns, {}ns) lasts {}ns, shorter than the required {}ns; ",
            self.start_ns,
            self.end_ns,
            self.duration_ns(),
            self.minimum_pulse_ns
        )?;
        if self.channels_at_start.is_empty() {
            write!(f, "opened by the initial state, ")?;
        } else {
            write!(f, "opened by channel(s) {:?}, ", self.channels_at_start)?;
        }
        if self.channels_at_end.is_empty() {
            write!(f, "closed by the final state")
        } else {
            write!(f, "closed by channel(s) {:?}", self.channels_at_end)
        }
    }
}

impl std::error::Error for MinimumPulseViolationError {}

/// Errors reported across the driver boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Board could not be initialized
    InitFailed { board: u32, message: String },
    /// Driver refused an instruction or programming call
    Programming(String),
    /// Program does not fit the board
    InvalidProgram(String),
    /// Board handle no longer usable
    Unavailable(String),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::InitFailed { board, message } => {
                write!(f, "Board {} could not be initialized: {}", board, message)
            }
            DriverError::Programming(msg) => write!(f, "Programming failed: {}", msg),
            DriverError::InvalidProgram(msg) => write!(f, "Invalid program: {}", msg),
            DriverError::Unavailable(msg) => write!(f, "Board unavailable: {}", msg),
        }
    }
}

impl std::error::Error for DriverError {}
