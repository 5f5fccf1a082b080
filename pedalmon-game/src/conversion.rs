//! Conversion of external fitness metrics into in-game currencies.
//!
//! Two independent pipelines feed the point pools: the daily load/steps
//! grant and the per-workout zone split. Inputs are clamped, never rejected,
//! because live fitness data is noisy.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    CTL_CEILING, CTL_FLOOR, DAILY_POINTS_BASE, KM_PER_WALK_POINT, LOAD_FACTOR_BASE,
    LOAD_FACTOR_CTL_WEIGHT, LOAD_FACTOR_TSB_WEIGHT, PSEUDO_LOAD_SCALE, RANK_A_CTL, RANK_A_TSB,
    RANK_B_CTL, RANK_B_TSB, RANK_C_CTL, RANK_C_TSB, SECONDS_PER_HOUR, STEPS_FACTOR_CAP,
    STEPS_PER_WALK_POINT, STEPS_REFERENCE, TSB_CEILING, TSB_FLOOR, ZONE_COEFFICIENTS, ZONE_COUNT,
    ZONE_HIGH_TIER_FROM, ZONE_MID_TIER_FROM,
};
use crate::numbers::{finite_or, floor_f64_to_u32, u32_to_f64};
use crate::points::TrainingPoints;

/// Daily fitness rank derived from (ctl, tsb). Feeds the discipline table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FitnessRank {
    A,
    B,
    C,
    D,
}

impl FitnessRank {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

impl fmt::Display for FitnessRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `0.5 + 0.7*ctlBonus + 0.3*tsbBonus`, always within `[0.5, 1.5]`.
#[must_use]
pub fn load_factor(ctl: f64, tsb: f64) -> f64 {
    let ctl = finite_or(ctl, CTL_FLOOR).clamp(CTL_FLOOR, CTL_CEILING);
    let tsb = finite_or(tsb, TSB_CEILING).clamp(TSB_FLOOR, TSB_CEILING);
    let ctl_bonus = (ctl - CTL_FLOOR) / (CTL_CEILING - CTL_FLOOR);
    let tsb_bonus = (TSB_CEILING - tsb) / (TSB_CEILING - TSB_FLOOR);
    LOAD_FACTOR_BASE + LOAD_FACTOR_CTL_WEIGHT * ctl_bonus + LOAD_FACTOR_TSB_WEIGHT * tsb_bonus
}

/// `min(steps / 10000, 1.5)`.
#[must_use]
pub fn steps_factor(steps: u32) -> f64 {
    (u32_to_f64(steps) / STEPS_REFERENCE).min(STEPS_FACTOR_CAP)
}

/// Threshold rank for (ctl, tsb); evaluated from A downwards.
#[must_use]
pub fn fitness_rank(ctl: f64, tsb: f64) -> FitnessRank {
    let ctl = finite_or(ctl, 0.0);
    let tsb = finite_or(tsb, f64::MAX);
    if ctl >= RANK_A_CTL && tsb <= RANK_A_TSB {
        FitnessRank::A
    } else if ctl >= RANK_B_CTL && tsb <= RANK_B_TSB {
        FitnessRank::B
    } else if ctl >= RANK_C_CTL && tsb <= RANK_C_TSB {
        FitnessRank::C
    } else {
        FitnessRank::D
    }
}

/// Split `total` evenly across the three channels; the remainder goes to low.
#[must_use]
pub const fn even_split(total: u32) -> TrainingPoints {
    let share = total / 3;
    TrainingPoints {
        low: share + total % 3,
        mid: share,
        high: share,
    }
}

/// Full daily delta surfaced to the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyPoints {
    pub total: u32,
    pub channels: TrainingPoints,
    pub rank: FitnessRank,
    pub load_factor: f64,
    pub steps_factor: f64,
}

/// Convert the day's load metrics and step count into points.
#[must_use]
pub fn daily_points(ctl: f64, tsb: f64, steps: u32) -> DailyPoints {
    let load = load_factor(ctl, tsb);
    let steps_f = steps_factor(steps);
    let total = floor_f64_to_u32(DAILY_POINTS_BASE * load * steps_f);
    DailyPoints {
        total,
        channels: even_split(total),
        rank: fitness_rank(ctl, tsb),
        load_factor: load,
        steps_factor: steps_f,
    }
}

/// Intensity tier of a heart-rate/power zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneTier {
    Low,
    Mid,
    High,
}

impl ZoneTier {
    #[must_use]
    pub fn for_coefficient(coefficient: f64) -> Self {
        if coefficient < ZONE_MID_TIER_FROM {
            Self::Low
        } else if coefficient < ZONE_HIGH_TIER_FROM {
            Self::Mid
        } else {
            Self::High
        }
    }
}

/// Per-zone pseudo load: `(seconds/3600) * coefficient^2 * 100`.
#[must_use]
pub fn zone_pseudo_loads(zone_seconds: &[f64; ZONE_COUNT]) -> [f64; ZONE_COUNT] {
    let mut loads = [0.0; ZONE_COUNT];
    for (idx, (seconds, coefficient)) in zone_seconds.iter().zip(ZONE_COEFFICIENTS).enumerate() {
        let seconds = finite_or(*seconds, 0.0).max(0.0);
        loads[idx] = (seconds / SECONDS_PER_HOUR) * coefficient * coefficient * PSEUDO_LOAD_SCALE;
    }
    loads
}

/// Per-workout delta surfaced to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutPoints {
    pub workout_id: String,
    pub channels: TrainingPoints,
    pub zone_loads: [f64; ZONE_COUNT],
}

/// Distribute `real_load` across channels by each tier's share of pseudo load.
///
/// Channels are floored independently, so their sum may fall short of
/// `real_load`; the shortfall is intentional and is not redistributed.
#[must_use]
pub fn workout_channels(zone_seconds: &[f64; ZONE_COUNT], real_load: f64) -> TrainingPoints {
    let loads = zone_pseudo_loads(zone_seconds);
    let real_load = finite_or(real_load, 0.0);
    let total: f64 = loads.iter().sum();
    if total <= 0.0 || real_load <= 0.0 {
        return TrainingPoints::default();
    }

    let mut tiers = [0.0_f64; 3];
    for (load, coefficient) in loads.iter().zip(ZONE_COEFFICIENTS) {
        let slot = match ZoneTier::for_coefficient(coefficient) {
            ZoneTier::Low => 0,
            ZoneTier::Mid => 1,
            ZoneTier::High => 2,
        };
        tiers[slot] += load;
    }

    TrainingPoints {
        low: floor_f64_to_u32(real_load * tiers[0] / total),
        mid: floor_f64_to_u32(real_load * tiers[1] / total),
        high: floor_f64_to_u32(real_load * tiers[2] / total),
    }
}

/// Per-workout conversion keyed by the workout's stable id.
#[must_use]
pub fn workout_points(
    workout_id: impl Into<String>,
    zone_seconds: &[f64; ZONE_COUNT],
    real_load: f64,
) -> WorkoutPoints {
    WorkoutPoints {
        workout_id: workout_id.into(),
        channels: workout_channels(zone_seconds, real_load),
        zone_loads: zone_pseudo_loads(zone_seconds),
    }
}

/// Walk points: one per thousand steps plus one per kilometre ridden.
#[must_use]
pub fn walk_points(steps: u32, distance_km: f64) -> u32 {
    let from_steps = floor_f64_to_u32(u32_to_f64(steps) / STEPS_PER_WALK_POINT);
    let from_distance = floor_f64_to_u32(finite_or(distance_km, 0.0).max(0.0) / KM_PER_WALK_POINT);
    from_steps.saturating_add(from_distance)
}
