// Copyright 2026 pulseblaster-ind Contributors
// SPDX-License-Identifier: Apache-2.0

//! Input validation for pulse registration.
//!
//! Every check fails with a typed [`InvalidTimingError`] carrying the
//! offending values. Nothing is rounded or clamped.

use crate::error::InvalidTimingError;
use crate::timing::types::{ChannelId, Pulse, TimingSpec};

/// Validate that a start/duration/period value lies on the resolution grid.
pub fn validate_resolution(
    channel: ChannelId,
    field: &'static str,
    value_ns: u64,
    timing: &TimingSpec,
) -> Result<(), InvalidTimingError> {
    if !timing.is_aligned(value_ns) {
        return Err(InvalidTimingError::NotMultipleOfResolution {
            channel,
            field,
            value_ns,
            resolution_ns: timing.resolution_ns,
        });
    }
    Ok(())
}

/// Validate a pulse against the resolution grid and the minimum width.
///
/// Zero-duration pulses pass the width check. A pulse whose end does not
/// fit in a `u64` is out of range.
pub fn validate_pulse(
    channel: ChannelId,
    pulse: &Pulse,
    timing: &TimingSpec,
) -> Result<(), InvalidTimingError> {
    validate_resolution(channel, "start", pulse.start_ns, timing)?;
    validate_resolution(channel, "duration", pulse.duration_ns, timing)?;

    if pulse.start_ns.checked_add(pulse.duration_ns).is_none() {
        return Err(InvalidTimingError::OutOfRange {
            channel,
            start_ns: pulse.start_ns,
            end_ns: u64::MAX,
            cycle_length_ns: u64::MAX,
        });
    }

    if !pulse.is_instant() && pulse.duration_ns < timing.minimum_pulse_ns {
        return Err(InvalidTimingError::BelowMinimumPulse {
            channel,
            duration_ns: pulse.duration_ns,
            minimum_pulse_ns: timing.minimum_pulse_ns,
        });
    }

    Ok(())
}

/// Validate that a pulse ends no later than the cycle.
pub fn validate_within_cycle(
    channel: ChannelId,
    pulse: &Pulse,
    cycle_length_ns: u64,
) -> Result<(), InvalidTimingError> {
    let end_ns = pulse.start_ns.saturating_add(pulse.duration_ns);
    if end_ns > cycle_length_ns || pulse.start_ns > cycle_length_ns {
        return Err(InvalidTimingError::OutOfRange {
            channel,
            start_ns: pulse.start_ns,
            end_ns,
            cycle_length_ns,
        });
    }
    Ok(())
}

/// Validate a 50% duty-cycle clock period.
///
/// Each half period must hold a minimum pulse, and the period must split
/// into two halves on the resolution grid.
pub fn validate_clock_period(
    channel: ChannelId,
    period_ns: u64,
    timing: &TimingSpec,
) -> Result<(), InvalidTimingError> {
    if period_ns / 2 < timing.minimum_pulse_ns {
        return Err(InvalidTimingError::InvalidClockPeriod {
            channel,
            period_ns,
            reason: format!(
                "is too short: less than {}ns",
                2 * timing.minimum_pulse_ns
            ),
        });
    }

    let step = 2 * timing.resolution_ns;
    if period_ns % step != 0 {
        return Err(InvalidTimingError::InvalidClockPeriod {
            channel,
            period_ns,
            reason: format!("is not a multiple of {}ns", step),
        });
    }

    Ok(())
}
