//! Ring buffer of cumulative-tick observations
//!
//! Each observation stores `sum(tick * seconds)` up to its timestamp. The
//! buffer holds `cardinality` live slots and may pre-allocate up to
//! `cardinality_next`. Live capacity grows one slot per write until it reaches
//! the target, so the live region never contains unwritten slots.
//!
//! Timestamps are `u32` seconds and comparisons are wrap-aware, so the buffer
//! keeps working across the 2106 rollover as long as no two samples are more
//! than ~136 years apart.

use crate::error::{VammError, VammResult};
use tracing::debug;

/// Hard cap on buffer slots
pub const MAX_CARDINALITY: u16 = u16::MAX;

/// Timestamp written into pre-allocated slots
const PLACEHOLDER_TIMESTAMP: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Observation {
    pub block_timestamp: u32,
    pub tick_cumulative: i64,
    pub initialized: bool,
}

impl Observation {
    /// Extend `self` to `block_timestamp` assuming `tick` held since the last sample
    fn transform(&self, block_timestamp: u32, tick: i32) -> Self {
        let delta = i64::from(block_timestamp.wrapping_sub(self.block_timestamp));
        Self {
            block_timestamp,
            tick_cumulative: self.tick_cumulative.wrapping_add(i64::from(tick) * delta),
            initialized: true,
        }
    }
}

/// `a <= b` where both are at or before `time`, modulo 2^32
fn lte(time: u32, a: u32, b: u32) -> bool {
    if a <= time && b <= time {
        return a <= b;
    }
    // timestamps after `time` belong to the previous epoch
    let adjust = |t: u32| {
        if t > time {
            u64::from(t)
        } else {
            u64::from(t) + (1 << 32)
        }
    };
    adjust(a) <= adjust(b)
}

#[derive(Debug, Clone, Default)]
pub struct Oracle {
    observations: Vec<Observation>,
}

impl Oracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the buffer with one observation; returns `(cardinality, cardinality_next)`
    pub fn initialize(&mut self, time: u32) -> (u16, u16) {
        self.observations = vec![Observation {
            block_timestamp: time,
            tick_cumulative: 0,
            initialized: true,
        }];
        (1, 1)
    }

    pub fn get(&self, index: u16) -> Option<&Observation> {
        self.observations.get(usize::from(index))
    }

    /// Allocated slots, live or pre-allocated
    pub fn capacity(&self) -> usize {
        self.observations.len()
    }

    /// Append a sample for `tick` held since the sample at `index`.
    ///
    /// Returns the new `(index, cardinality)`. At most one sample per
    /// timestamp: a write at the last sample's timestamp is a no-op.
    pub fn write(
        &mut self,
        index: u16,
        time: u32,
        tick: i32,
        cardinality: u16,
        cardinality_next: u16,
    ) -> (u16, u16) {
        let last = match self.observations.get(usize::from(index)) {
            Some(last) => *last,
            None => return (index, cardinality),
        };
        if last.block_timestamp == time {
            return (index, cardinality);
        }

        let cardinality_updated = if cardinality_next > cardinality && index == cardinality - 1 {
            cardinality + 1
        } else {
            cardinality
        };

        let index_updated = ((u32::from(index) + 1) % u32::from(cardinality_updated)) as u16;
        let slot = usize::from(index_updated);
        let observation = last.transform(time, tick);
        if slot < self.observations.len() {
            self.observations[slot] = observation;
        } else {
            self.observations.push(observation);
        }
        (index_updated, cardinality_updated)
    }

    /// Raise the target capacity to `next`, pre-allocating placeholder slots
    pub fn grow(&mut self, current: u16, next: u16) -> VammResult<u16> {
        if current == 0 {
            return Err(VammError::OracleUninitialized);
        }
        if next <= current {
            return Ok(current);
        }
        let start = self.observations.len().max(usize::from(current));
        for _ in start..usize::from(next) {
            self.observations.push(Observation {
                block_timestamp: PLACEHOLDER_TIMESTAMP,
                tick_cumulative: 0,
                initialized: false,
            });
        }
        debug!(from = current, to = next, "Grew observation buffer");
        Ok(next)
    }

    /// Cumulative tick at `time - seconds_ago` for each lookback
    pub fn observe(
        &self,
        time: u32,
        seconds_agos: &[u32],
        tick: i32,
        index: u16,
        cardinality: u16,
    ) -> VammResult<Vec<i64>> {
        if cardinality == 0 {
            return Err(VammError::OracleUninitialized);
        }
        let mut cumulatives = Vec::with_capacity(seconds_agos.len());
        for &seconds_ago in seconds_agos {
            let cumulative = self.observe_single(time, seconds_ago, tick, index, cardinality)?;
            cumulatives.push(cumulative);
        }
        Ok(cumulatives)
    }

    /// Mean tick over the last `seconds_ago` seconds, rounded toward negative
    /// infinity. Zero lookback returns `tick`.
    pub fn arithmetic_mean_tick(
        &self,
        time: u32,
        seconds_ago: u32,
        tick: i32,
        index: u16,
        cardinality: u16,
    ) -> VammResult<i32> {
        if seconds_ago == 0 {
            return Ok(tick);
        }
        let cumulatives = self.observe(time, &[seconds_ago, 0], tick, index, cardinality)?;
        // cumulatives wrap, their difference over one window does not
        let delta = cumulatives[1].wrapping_sub(cumulatives[0]);
        let mean = delta.div_euclid(i64::from(seconds_ago));
        i32::try_from(mean).map_err(|_| VammError::ArithmeticOverflow {
            operation: "arithmetic_mean_tick",
        })
    }

    fn slot(&self, position: usize, cardinality: u16) -> Observation {
        self.observations
            .get(position % usize::from(cardinality))
            .copied()
            .unwrap_or_default()
    }

    fn observe_single(
        &self,
        time: u32,
        seconds_ago: u32,
        tick: i32,
        index: u16,
        cardinality: u16,
    ) -> VammResult<i64> {
        if seconds_ago == 0 {
            let last = self.slot(usize::from(index), cardinality);
            let last = if last.block_timestamp != time {
                last.transform(time, tick)
            } else {
                last
            };
            return Ok(last.tick_cumulative);
        }

        let target = time.wrapping_sub(seconds_ago);
        let (before, after) =
            self.get_surrounding_observations(time, target, tick, index, cardinality)?;

        if target == before.block_timestamp {
            Ok(before.tick_cumulative)
        } else if target == after.block_timestamp {
            Ok(after.tick_cumulative)
        } else {
            let observation_delta = after.block_timestamp.wrapping_sub(before.block_timestamp);
            let target_delta = target.wrapping_sub(before.block_timestamp);
            let cumulative_delta = after.tick_cumulative.wrapping_sub(before.tick_cumulative);
            let mean_tick = cumulative_delta / i64::from(observation_delta);
            let offset = mean_tick * i64::from(target_delta);
            Ok(before.tick_cumulative.wrapping_add(offset))
        }
    }

    fn get_surrounding_observations(
        &self,
        time: u32,
        target: u32,
        tick: i32,
        index: u16,
        cardinality: u16,
    ) -> VammResult<(Observation, Observation)> {
        let newest = self.slot(usize::from(index), cardinality);

        if lte(time, newest.block_timestamp, target) {
            if newest.block_timestamp == target {
                return Ok((newest, newest));
            }
            return Ok((newest, newest.transform(target, tick)));
        }

        let mut oldest = self.slot(usize::from(index) + 1, cardinality);
        if !oldest.initialized {
            oldest = self.slot(0, cardinality);
        }

        if !lte(time, oldest.block_timestamp, target) {
            return Err(VammError::ObservationTooOld {
                target,
                oldest: oldest.block_timestamp,
            });
        }

        Ok(self.binary_search(time, target, index, cardinality))
    }

    fn binary_search(
        &self,
        time: u32,
        target: u32,
        index: u16,
        cardinality: u16,
    ) -> (Observation, Observation) {
        let mut left = (usize::from(index) + 1) % usize::from(cardinality);
        let mut right = left + usize::from(cardinality) - 1;

        loop {
            let i = (left + right) / 2;
            let before = self.slot(i, cardinality);

            if !before.initialized {
                left = i + 1;
                continue;
            }

            let after = self.slot(i + 1, cardinality);
            let target_at_or_after = lte(time, before.block_timestamp, target);

            if target_at_or_after && lte(time, target, after.block_timestamp) {
                return (before, after);
            }

            if target_at_or_after {
                left = i + 1;
            } else {
                right = i - 1;
            }
        }
    }
}
