//! Centralized balance and tuning constants for PedalMon game logic.
//!
//! These values define the deterministic math for the core simulation.
//! Keeping them together ensures that balance can only be adjusted via
//! code changes reviewed in version control, rather than through the
//! JSON tables that describe species, programs and worlds.

// Load -> points ------------------------------------------------------------
pub(crate) const CTL_FLOOR: f64 = 50.0;
pub(crate) const CTL_CEILING: f64 = 100.0;
pub(crate) const TSB_FLOOR: f64 = -30.0;
pub(crate) const TSB_CEILING: f64 = 15.0;
pub(crate) const LOAD_FACTOR_BASE: f64 = 0.5;
pub(crate) const LOAD_FACTOR_CTL_WEIGHT: f64 = 0.7;
pub(crate) const LOAD_FACTOR_TSB_WEIGHT: f64 = 0.3;
pub(crate) const STEPS_REFERENCE: f64 = 10_000.0;
pub(crate) const STEPS_FACTOR_CAP: f64 = 1.5;
pub(crate) const DAILY_POINTS_BASE: f64 = 8.0;

pub(crate) const RANK_A_CTL: f64 = 80.0;
pub(crate) const RANK_A_TSB: f64 = -15.0;
pub(crate) const RANK_B_CTL: f64 = 65.0;
pub(crate) const RANK_B_TSB: f64 = 0.0;
pub(crate) const RANK_C_CTL: f64 = 50.0;
pub(crate) const RANK_C_TSB: f64 = 15.0;

// Workout -> points ---------------------------------------------------------
pub(crate) const ZONE_COUNT: usize = 7;
pub(crate) const ZONE_COEFFICIENTS: [f64; ZONE_COUNT] = [0.55, 0.75, 0.90, 1.00, 1.10, 1.20, 1.30];
/// Coefficients below this belong to the low tier.
pub(crate) const ZONE_MID_TIER_FROM: f64 = 0.85;
/// Coefficients at or above this belong to the high tier.
pub(crate) const ZONE_HIGH_TIER_FROM: f64 = 1.05;
pub(crate) const SECONDS_PER_HOUR: f64 = 3_600.0;
pub(crate) const PSEUDO_LOAD_SCALE: f64 = 100.0;

// Walk points ---------------------------------------------------------------
pub(crate) const STEPS_PER_WALK_POINT: f64 = 1_000.0;
pub(crate) const KM_PER_WALK_POINT: f64 = 1.0;

// Provider fallbacks --------------------------------------------------------
pub(crate) const DEFAULT_CTL: f64 = 50.0;
pub(crate) const DEFAULT_TSB: f64 = 0.0;
pub(crate) const DEFAULT_STEPS: u32 = 5_000;

// Training ------------------------------------------------------------------
pub(crate) const TRAINING_GAIN_STEP: f64 = 0.1;
pub(crate) const FED_BONUS_MULTIPLIER: f64 = 1.1;

// Evolution -----------------------------------------------------------------
/// Minimum share of every channel, in percent, for the balanced branch.
pub(crate) const BALANCED_SHARE_PERCENT: u64 = 30;
pub(crate) const MAX_EVOLUTION_TARGETS: usize = 4;

// Battle --------------------------------------------------------------------
pub(crate) const SPEED_DIVISOR: f64 = 4.0;
pub(crate) const BASE_HIT_RATE: f64 = 0.90;
pub(crate) const HIT_RATE_PER_DISCIPLINE: f64 = 0.002;
pub(crate) const BASE_EVASION_RATE: f64 = 0.05;
pub(crate) const EVASION_RATE_PER_DISCIPLINE: f64 = 0.001;
pub(crate) const DISCIPLINE_PIVOT: f64 = 50.0;
pub(crate) const CRITICAL_CHANCE: f64 = 0.05;
pub(crate) const CRITICAL_MULTIPLIER: f64 = 1.5;
pub(crate) const DAMAGE_VARIANCE_MIN: f64 = 0.85;
pub(crate) const DAMAGE_VARIANCE_MAX: f64 = 1.15;
pub(crate) const DEFENSE_MITIGATION: f64 = 0.4;
pub(crate) const MIN_DAMAGE: i32 = 1;
pub(crate) const FIRST_STRIKE_SOFTENING: f64 = 20.0;
pub(crate) const MAX_BATTLE_TURNS: u32 = 100;
pub(crate) const LOSS_HP_FLOOR: i32 = 1;
pub(crate) const WILD_WIN_BASE_POINTS: u32 = 1;
pub(crate) const BOSS_WIN_BASE_POINTS: u32 = 5;
pub(crate) const ENEMY_DISCIPLINE: f64 = 50.0;

// World progression ---------------------------------------------------------
pub(crate) const BOSS_UNLOCK_KILLS: u32 = 5;
pub(crate) const ENCOUNTER_WALK_COST: u32 = 10;
pub(crate) const BOSS_WALK_COST: u32 = 30;

// Discipline & meals --------------------------------------------------------
pub(crate) const DISCIPLINE_MIN: f64 = 0.0;
pub(crate) const DISCIPLINE_MAX: f64 = 100.0;
pub(crate) const DISCIPLINE_START: f64 = 50.0;
pub(crate) const MAX_MEALS_PER_DAY: u8 = 3;
pub(crate) const RANK_DISCIPLINE_DELTA: [(crate::conversion::FitnessRank, f64); 4] = [
    (crate::conversion::FitnessRank::A, 3.0),
    (crate::conversion::FitnessRank::B, 2.0),
    (crate::conversion::FitnessRank::C, 1.0),
    (crate::conversion::FitnessRank::D, -1.0),
];
/// Discipline delta indexed by the number of meals eaten on the closed day.
pub(crate) const MEAL_DISCIPLINE_DELTA: [f64; MAX_MEALS_PER_DAY as usize + 1] = [-3.0, 0.0, 1.0, 2.0];

// Lifecycle -----------------------------------------------------------------
pub(crate) const HOURS_PER_DAY: f64 = 24.0;
pub(crate) const NEGLECT_DEATH_HOURS: f64 = 48.0;
pub(crate) const PASSIVE_REGEN_RATE: f64 = 0.10;
pub(crate) const NEGLECT_HP_MILD_HOURS: f64 = 12.0;
pub(crate) const NEGLECT_HP_SEVERE_HOURS: f64 = 24.0;
pub(crate) const NEGLECT_HP_MILD_SHARE: f64 = 0.20;
pub(crate) const NEGLECT_HP_SEVERE_SHARE: f64 = 0.50;
pub(crate) const NEGLECT_DISCIPLINE_LIGHT_HOURS: f64 = 8.0;
pub(crate) const NEGLECT_DISCIPLINE_MILD_HOURS: f64 = 12.0;
pub(crate) const NEGLECT_DISCIPLINE_SEVERE_HOURS: f64 = 24.0;
pub(crate) const NEGLECT_DISCIPLINE_LIGHT: (i64, i64) = (5, 10);
pub(crate) const NEGLECT_DISCIPLINE_MILD: (i64, i64) = (10, 15);
pub(crate) const NEGLECT_DISCIPLINE_SEVERE: i64 = 20;
pub(crate) const MEMORY_BONUS_SHARE: f64 = 0.2;
pub(crate) const LIFESPAN_PRECISION: u32 = 1;
pub(crate) const MEAL_EXTENSION_PRECISION: u32 = 2;

pub(crate) const BASE_LIFESPAN_BUCKETS: [crate::rng::WeightedBucket; 4] = [
    crate::rng::WeightedBucket::new(5.0, 7.0, 0.20),
    crate::rng::WeightedBucket::new(7.0, 10.0, 0.50),
    crate::rng::WeightedBucket::new(10.0, 14.0, 0.25),
    crate::rng::WeightedBucket::new(14.0, 20.0, 0.05),
];

pub(crate) const MEAL_EXTENSION_BUCKETS: [crate::rng::WeightedBucket; 3] = [
    crate::rng::WeightedBucket::new(0.03, 0.08, 0.60),
    crate::rng::WeightedBucket::new(0.08, 0.15, 0.30),
    crate::rng::WeightedBucket::new(0.15, 0.25, 0.10),
];

// Calendar ------------------------------------------------------------------
pub(crate) const DEFAULT_UTC_OFFSET_HOURS: i32 = 9;
pub(crate) const DEFAULT_ROLLOVER_HOUR: u32 = 4;

#[cfg(test)]
pub(crate) const FLOAT_EPSILON: f64 = 1e-9;
