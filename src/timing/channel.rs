// Copyright 2026 pulseblaster-ind Contributors
// SPDX-License-Identifier: Apache-2.0

//! Single-channel pulse timeline.
//!
//! A [`ChannelTimeline`] owns the pulses requested for one TTL output and
//! answers two questions for the compiler: where does this output change
//! ([`boundaries`](ChannelTimeline::boundaries)) and what is its value at a
//! given time ([`value_at`](ChannelTimeline::value_at)).

use std::iter::{Filter, Peekable};
use std::slice;

use super::types::{ChannelId, Pulse, TimingSpec};
use crate::error::InvalidTimingError;
use crate::validation;

/// The pulses of one channel, sorted by start time and non-overlapping.
#[derive(Debug, Clone)]
pub struct ChannelTimeline {
    id: ChannelId,
    timing: TimingSpec,
    pulses: Vec<Pulse>,
}

impl ChannelTimeline {
    /// Create an empty timeline. An empty channel is low for the whole cycle.
    pub fn new(id: ChannelId, timing: TimingSpec) -> Self {
        Self {
            id,
            timing,
            pulses: Vec::new(),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Pulses in start order.
    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    /// Register a high period on this channel.
    ///
    /// Returns `&mut self` for chaining.
    ///
    /// # Errors
    ///
    /// - start or duration off the resolution grid
    /// - nonzero duration below the minimum pulse
    /// - overlap with a pulse already on the channel
    pub fn add_pulse(
        &mut self,
        start_ns: u64,
        duration_ns: u64,
    ) -> Result<&mut Self, InvalidTimingError> {
        let pulse = Pulse::new(start_ns, duration_ns);
        validation::validate_pulse(self.id, &pulse, &self.timing)?;

        if let Some(existing) = self.pulses.iter().find(|p| p.overlaps(&pulse)) {
            return Err(InvalidTimingError::Overlap {
                channel: self.id,
                start_ns: pulse.start_ns,
                end_ns: pulse.end_ns(),
                existing_start_ns: existing.start_ns,
                existing_end_ns: existing.end_ns(),
            });
        }

        let index = self.pulses.partition_point(|p| p.start_ns <= start_ns);
        self.pulses.insert(index, pulse);
        Ok(self)
    }

    /// Timestamps where the output changes, in ascending order.
    ///
    /// Abutting pulses form one high run, so the instant where one ends and
    /// the next begins is not a boundary. Instants contribute nothing.
    /// Each call returns a fresh iterator.
    pub fn boundaries(&self) -> Boundaries<'_> {
        Boundaries {
            pulses: self
                .pulses
                .iter()
                .filter(has_width as fn(&&Pulse) -> bool)
                .peekable(),
            open_end: None,
        }
    }

    /// Output value at `t_ns`.
    pub fn value_at(&self, t_ns: u64) -> bool {
        let index = self.pulses.partition_point(|p| p.start_ns <= t_ns);
        // Only the last pulse with width starting at or before t can cover it
        self.pulses[..index]
            .iter()
            .rev()
            .find(|p| !p.is_instant())
            .is_some_and(|p| p.contains(t_ns))
    }

    /// Whether the output flips exactly at `t_ns`.
    ///
    /// Time zero is never a change: the cycle starts from the first state.
    pub fn changes_at(&self, t_ns: u64) -> bool {
        t_ns > 0 && self.value_at(t_ns) != self.value_at(t_ns - 1)
    }
}

fn has_width(pulse: &&Pulse) -> bool {
    !pulse.is_instant()
}

type WidePulses<'a> = Peekable<Filter<slice::Iter<'a, Pulse>, fn(&&Pulse) -> bool>>;

/// Lazy iterator over the boundaries of one channel.
///
/// See [`ChannelTimeline::boundaries`].
#[derive(Debug, Clone)]
pub struct Boundaries<'a> {
    pulses: WidePulses<'a>,
    open_end: Option<u64>,
}

impl Iterator for Boundaries<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if let Some(mut end) = self.open_end.take() {
            while let Some(next) = self.pulses.next_if(|p| p.start_ns == end) {
                end = next.end_ns();
            }
            return Some(end);
        }

        let pulse = self.pulses.next()?;
        self.open_end = Some(pulse.end_ns());
        Some(pulse.start_ns)
    }
}
