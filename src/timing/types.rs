// Copyright 2026 pulseblaster-ind Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core timing types: [`TimingSpec`] and [`Pulse`].
//!
//! All times are integer nanoseconds. A [`TimingSpec`] captures the two
//! board parameters every timing check is parameterized by: the resolution
//! of the instruction clock and the shortest instruction the board can hold.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Bit index of a TTL output channel in the instruction bitmask.
pub type ChannelId = u8;

/// Widest bitmask an instruction can carry.
pub const MAX_CHANNELS: u8 = 32;

/// Per-board timing parameters.
///
/// # Invariants
///
/// - `resolution_ns > 0`
/// - `minimum_pulse_ns > 0`
/// - `minimum_pulse_ns % resolution_ns == 0`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingSpec {
    /// Smallest increment accepted for start times and durations.
    #[serde(default = "default_resolution_ns")]
    pub resolution_ns: u64,
    /// Shortest duration a single instruction may hold.
    #[serde(default = "default_minimum_pulse_ns")]
    pub minimum_pulse_ns: u64,
}

impl TimingSpec {
    /// Create a validated timing spec.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any invariant is violated.
    pub fn new(resolution_ns: u64, minimum_pulse_ns: u64) -> Result<Self> {
        let spec = Self {
            resolution_ns,
            minimum_pulse_ns,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Check the invariants. Deserialized specs are not validated until
    /// this is called.
    pub fn validate(&self) -> Result<()> {
        if self.resolution_ns == 0 {
            return Err(Error::Config("resolution must be positive".into()));
        }
        if self.minimum_pulse_ns == 0 {
            return Err(Error::Config("minimum pulse must be positive".into()));
        }
        if self.minimum_pulse_ns % self.resolution_ns != 0 {
            return Err(Error::Config(format!(
                "minimum pulse {}ns is not a multiple of the {}ns resolution",
                self.minimum_pulse_ns, self.resolution_ns
            )));
        }
        Ok(())
    }

    /// Whether `value_ns` lies on the resolution grid.
    pub fn is_aligned(&self, value_ns: u64) -> bool {
        value_ns % self.resolution_ns == 0
    }

    /// Duration of the terminating STOP instruction.
    pub fn stop_duration_ns(&self) -> u64 {
        2 * self.resolution_ns
    }
}

impl Default for TimingSpec {
    fn default() -> Self {
        Self {
            resolution_ns: default_resolution_ns(),
            minimum_pulse_ns: default_minimum_pulse_ns(),
        }
    }
}

fn default_resolution_ns() -> u64 {
    10
}

fn default_minimum_pulse_ns() -> u64 {
    50
}

/// A high period on one channel, `[start_ns, start_ns + duration_ns)`.
///
/// A zero `duration_ns` is an instant: it is recorded on the channel but
/// never changes the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pulse {
    pub start_ns: u64,
    pub duration_ns: u64,
}

impl Pulse {
    pub fn new(start_ns: u64, duration_ns: u64) -> Self {
        Self {
            start_ns,
            duration_ns,
        }
    }

    /// Exclusive end time.
    pub fn end_ns(&self) -> u64 {
        self.start_ns + self.duration_ns
    }

    pub fn is_instant(&self) -> bool {
        self.duration_ns == 0
    }

    /// Whether `t_ns` falls inside the high period.
    pub fn contains(&self, t_ns: u64) -> bool {
        self.start_ns <= t_ns && t_ns < self.end_ns()
    }

    /// Half-open intersection test. Instants never overlap anything.
    pub fn overlaps(&self, other: &Pulse) -> bool {
        !self.is_instant()
            && !other.is_instant()
            && self.start_ns < other.end_ns()
            && other.start_ns < self.end_ns()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // TimingSpec construction
    // =========================================================================

    #[test]
    fn test_timing_spec_default() {
        let spec = TimingSpec::default();
        assert_eq!(spec.resolution_ns, 10);
        assert_eq!(spec.minimum_pulse_ns, 50);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_timing_spec_new_valid() {
        let spec = TimingSpec::new(5, 20).unwrap();
        assert_eq!(spec.resolution_ns, 5);
        assert_eq!(spec.minimum_pulse_ns, 20);
    }

    #[test]
    fn test_timing_spec_zero_resolution() {
        let err = TimingSpec::new(0, 50).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("resolution"));
    }

    #[test]
    fn test_timing_spec_zero_minimum_pulse() {
        let err = TimingSpec::new(10, 0).unwrap_err();
        assert!(err.to_string().contains("minimum pulse"));
    }

    #[test]
    fn test_timing_spec_minimum_not_multiple() {
        let err = TimingSpec::new(10, 55).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("not a multiple"));
    }

    #[test]
    fn test_timing_spec_alignment() {
        let spec = TimingSpec::default();
        assert!(spec.is_aligned(0));
        assert!(spec.is_aligned(4000));
        assert!(!spec.is_aligned(45));
    }

    #[test]
    fn test_stop_duration_is_two_ticks() {
        assert_eq!(TimingSpec::default().stop_duration_ns(), 20);
    }

    #[test]
    fn test_timing_spec_partial_yaml_uses_defaults() {
        let spec: TimingSpec = serde_yaml::from_str("resolution_ns: 5").unwrap();
        assert_eq!(spec.resolution_ns, 5);
        assert_eq!(spec.minimum_pulse_ns, 50);
    }

    // =========================================================================
    // Pulse geometry
    // =========================================================================

    #[test]
    fn test_pulse_end_and_contains() {
        let p = Pulse::new(100, 50);
        assert_eq!(p.end_ns(), 150);
        assert!(p.contains(100));
        assert!(p.contains(149));
        assert!(!p.contains(150));
        assert!(!p.contains(99));
    }

    #[test]
    fn test_pulse_overlap_half_open() {
        let a = Pulse::new(0, 100);
        assert!(a.overlaps(&Pulse::new(50, 100)));
        assert!(a.overlaps(&Pulse::new(0, 50)));
        // Abutting pulses share no instant
        assert!(!a.overlaps(&Pulse::new(100, 50)));
    }

    #[test]
    fn test_instant_never_overlaps() {
        let a = Pulse::new(0, 100);
        let instant = Pulse::new(50, 0);
        assert!(instant.is_instant());
        assert!(!a.overlaps(&instant));
        assert!(!instant.contains(50));
    }
}
