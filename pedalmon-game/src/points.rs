//! Caller-owned point pools.
//!
//! The engine only produces deltas; the ledger is where a host (or a
//! simulation driver) keeps the balances those deltas are applied to.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::Add;

use crate::conversion::{DailyPoints, WorkoutPoints, walk_points};

/// Three-channel training point triple. Used both as a pool and as a cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainingPoints {
    pub low: u32,
    pub mid: u32,
    pub high: u32,
}

impl TrainingPoints {
    #[must_use]
    pub const fn new(low: u32, mid: u32, high: u32) -> Self {
        Self { low, mid, high }
    }

    #[must_use]
    pub const fn total(&self) -> u32 {
        self.low.saturating_add(self.mid).saturating_add(self.high)
    }

    /// Every channel independently covers the matching channel of `cost`.
    #[must_use]
    pub const fn can_cover(&self, cost: &Self) -> bool {
        self.low >= cost.low && self.mid >= cost.mid && self.high >= cost.high
    }

    #[must_use]
    pub const fn saturating_sub(&self, cost: &Self) -> Self {
        Self {
            low: self.low.saturating_sub(cost.low),
            mid: self.mid.saturating_sub(cost.mid),
            high: self.high.saturating_sub(cost.high),
        }
    }
}

impl Add for TrainingPoints {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            low: self.low.saturating_add(rhs.low),
            mid: self.mid.saturating_add(rhs.mid),
            high: self.high.saturating_add(rhs.high),
        }
    }
}

/// Balances owned by the host between engine calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointLedger {
    pub training: TrainingPoints,
    /// Unchanneled points; must be split before they can be spent.
    pub base: u32,
    pub walk: u32,
    pub last_daily_grant: Option<NaiveDate>,
    /// Base points already granted for `last_daily_grant`.
    #[serde(default)]
    pub daily_credited: u32,
    /// Highest step count already converted to walk points that day.
    #[serde(default)]
    pub steps_credited: u32,
    #[serde(default)]
    pub processed_workouts: BTreeSet<String>,
}

impl PointLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn roll_day(&mut self, day: NaiveDate) {
        if self.last_daily_grant != Some(day) {
            self.last_daily_grant = Some(day);
            self.daily_credited = 0;
            self.steps_credited = 0;
        }
    }

    /// Top the day's load grant up to `daily.total`; returns the points added.
    ///
    /// Later syncs on the same day only credit what the best reading so far
    /// has not already paid out.
    pub fn credit_daily(&mut self, daily: &DailyPoints, day: NaiveDate) -> u32 {
        self.roll_day(day);
        let added = daily.total.saturating_sub(self.daily_credited);
        self.daily_credited = self.daily_credited.max(daily.total);
        self.base = self.base.saturating_add(added);
        added
    }

    /// Credit walk points for steps not yet counted on `day`; returns the points added.
    pub fn credit_steps(&mut self, steps: u32, day: NaiveDate) -> u32 {
        self.roll_day(day);
        let added = walk_points(steps, 0.0).saturating_sub(walk_points(self.steps_credited, 0.0));
        self.steps_credited = self.steps_credited.max(steps);
        self.credit_walk(added);
        added
    }

    /// Credit a workout's channels unless its id has been seen before.
    pub fn credit_workout(&mut self, workout: &WorkoutPoints) -> bool {
        if !self.processed_workouts.insert(workout.workout_id.clone()) {
            return false;
        }
        self.training = self.training + workout.channels;
        true
    }

    pub fn credit_base(&mut self, amount: u32) {
        self.base = self.base.saturating_add(amount);
    }

    pub fn credit_walk(&mut self, amount: u32) {
        self.walk = self.walk.saturating_add(amount);
    }

    /// Move base points into channels. Rejected if the split exceeds the balance.
    pub fn split_base(&mut self, split: TrainingPoints) -> bool {
        let requested = u64::from(split.low) + u64::from(split.mid) + u64::from(split.high);
        if requested > u64::from(self.base) {
            return false;
        }
        self.base -= split.total();
        self.training = self.training + split;
        true
    }

    #[must_use]
    pub const fn can_afford(&self, cost: &TrainingPoints) -> bool {
        self.training.can_cover(cost)
    }

    pub fn spend(&mut self, cost: &TrainingPoints) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        self.training = self.training.saturating_sub(cost);
        true
    }

    pub fn spend_walk(&mut self, cost: u32) -> bool {
        if self.walk < cost {
            return false;
        }
        self.walk -= cost;
        true
    }
}
