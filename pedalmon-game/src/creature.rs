//! The creature record every engine operation reads or mutates.
//!
//! A `CreatureState` is a plain value owned by the caller. Operations that
//! change it take `&mut CreatureState` and document the mutation; nothing in
//! the engine keeps a second copy.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DISCIPLINE_MAX, DISCIPLINE_MIN, DISCIPLINE_START, HOURS_PER_DAY};
use crate::lifecycle::DeathCause;
use crate::numbers::{finite_or, i64_to_f64, round_to, u32_to_f64};
use crate::points::TrainingPoints;

/// Continuous stat triple at one-decimal resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub max_hp: f64,
    pub atk: f64,
    pub def: f64,
}

impl Stats {
    #[must_use]
    pub const fn new(max_hp: f64, atk: f64, def: f64) -> Self {
        Self { max_hp, atk, def }
    }

    /// Component-wise minimum against `caps`.
    #[must_use]
    pub fn clamped_to(self, caps: &Self) -> Self {
        Self {
            max_hp: round_to(self.max_hp.min(caps.max_hp), 1),
            atk: round_to(self.atk.min(caps.atk), 1),
            def: round_to(self.def.min(caps.def), 1),
        }
    }

    /// Component-wise maximum against `floor`.
    #[must_use]
    pub fn raised_to(self, floor: &Self) -> Self {
        Self {
            max_hp: self.max_hp.max(floor.max_hp),
            atk: self.atk.max(floor.atk),
            def: self.def.max(floor.def),
        }
    }
}

/// Flat stat add-ons inherited from the previous generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryBonus {
    pub hp: u32,
    pub atk: u32,
    pub def: u32,
}

/// Lifetime channel spend. Only ever grows; drives branch determination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelTotals {
    pub low: u64,
    pub mid: u64,
    pub high: u64,
}

impl ChannelTotals {
    pub fn accumulate(&mut self, cost: &TrainingPoints) {
        self.low = self.low.saturating_add(u64::from(cost.low));
        self.mid = self.mid.saturating_add(u64::from(cost.mid));
        self.high = self.high.saturating_add(u64::from(cost.high));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureState {
    pub name: String,
    pub species: String,
    pub stats: Stats,
    pub current_hp: f64,
    pub discipline: f64,
    pub totals: ChannelTotals,
    pub born_at: DateTime<Utc>,
    pub base_lifespan_days: f64,
    pub lifespan_extension_days: f64,
    pub generation: u32,
    /// Species ids this creature has evolved out of, oldest first.
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default)]
    pub memory: Option<MemoryBonus>,
    #[serde(default)]
    pub meals_today: u8,
    #[serde(default)]
    pub meal_day: Option<NaiveDate>,
    /// Count and day of the meal day before `meal_day`.
    #[serde(default)]
    pub previous_meals: u8,
    #[serde(default)]
    pub previous_meal_day: Option<NaiveDate>,
    #[serde(default)]
    pub last_daily_update_day: Option<NaiveDate>,
    pub last_activity_at: DateTime<Utc>,
    pub last_tick_at: DateTime<Utc>,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub neglect_tier_applied: u8,
    #[serde(default)]
    pub neglect_hp_applied: f64,
    #[serde(default)]
    pub neglect_discipline_applied: f64,
    pub alive: bool,
    #[serde(default)]
    pub cause_of_death: Option<DeathCause>,
}

impl CreatureState {
    /// A fresh, fully healed creature. Lifespan is supplied by the caller.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        species: impl Into<String>,
        stats: Stats,
        born_at: DateTime<Utc>,
        base_lifespan_days: f64,
    ) -> Self {
        Self {
            name: name.into(),
            species: species.into(),
            stats,
            current_hp: stats.max_hp,
            discipline: DISCIPLINE_START,
            totals: ChannelTotals::default(),
            born_at,
            base_lifespan_days,
            lifespan_extension_days: 0.0,
            generation: 1,
            history: Vec::new(),
            memory: None,
            meals_today: 0,
            meal_day: None,
            previous_meals: 0,
            previous_meal_day: None,
            last_daily_update_day: None,
            last_activity_at: born_at,
            last_tick_at: born_at,
            wins: 0,
            losses: 0,
            neglect_tier_applied: 0,
            neglect_hp_applied: 0.0,
            neglect_discipline_applied: 0.0,
            alive: true,
            cause_of_death: None,
        }
    }

    /// Own stats plus any inherited memory bonus.
    #[must_use]
    pub fn effective_stats(&self) -> Stats {
        let bonus = self.memory.unwrap_or_default();
        Stats {
            max_hp: self.stats.max_hp + u32_to_f64(bonus.hp),
            atk: self.stats.atk + u32_to_f64(bonus.atk),
            def: self.stats.def + u32_to_f64(bonus.def),
        }
    }

    /// Hp ceiling for healing, regeneration and battle.
    #[must_use]
    pub fn effective_max_hp(&self) -> f64 {
        self.effective_stats().max_hp
    }

    pub fn heal_full(&mut self) {
        self.current_hp = self.effective_max_hp();
    }

    /// Add `amount` hp without exceeding the effective maximum or dropping below 0.
    pub fn adjust_hp(&mut self, amount: f64) {
        let max = self.effective_max_hp();
        self.current_hp = (self.current_hp + finite_or(amount, 0.0)).clamp(0.0, max);
    }

    /// Add `delta` to discipline, clamped to its 0..100 domain.
    pub fn adjust_discipline(&mut self, delta: f64) {
        self.discipline =
            (self.discipline + finite_or(delta, 0.0)).clamp(DISCIPLINE_MIN, DISCIPLINE_MAX);
    }

    #[must_use]
    pub fn lifespan_days(&self) -> f64 {
        self.base_lifespan_days + self.lifespan_extension_days
    }

    #[must_use]
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        elapsed_hours(self.born_at, now) / HOURS_PER_DAY
    }

    #[must_use]
    pub fn hours_since_activity(&self, now: DateTime<Utc>) -> f64 {
        elapsed_hours(self.last_activity_at, now)
    }
}

/// Non-negative hours between two instants, at second resolution.
pub(crate) fn elapsed_hours(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let seconds = (to - from).num_seconds().max(0);
    i64_to_f64(seconds) / 3_600.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FLOAT_EPSILON;
    use chrono::{Duration, TimeZone};

    fn sample() -> CreatureState {
        let born = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        CreatureState::new("Tester", "cogling", Stats::new(50.0, 12.0, 10.0), born, 9.0)
    }

    #[test]
    fn effective_stats_include_memory() {
        let mut creature = sample();
        creature.memory = Some(MemoryBonus { hp: 34, atk: 11, def: 8 });
        let effective = creature.effective_stats();
        assert!((effective.max_hp - 84.0).abs() < FLOAT_EPSILON);
        assert!((effective.atk - 23.0).abs() < FLOAT_EPSILON);
        assert!((effective.def - 18.0).abs() < FLOAT_EPSILON);
        creature.heal_full();
        assert!((creature.current_hp - 84.0).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn hp_and_discipline_stay_in_range() {
        let mut creature = sample();
        creature.adjust_hp(1_000.0);
        assert!((creature.current_hp - 50.0).abs() < FLOAT_EPSILON);
        creature.adjust_hp(-1_000.0);
        assert!(creature.current_hp.abs() < FLOAT_EPSILON);
        creature.adjust_discipline(80.0);
        assert!((creature.discipline - 100.0).abs() < FLOAT_EPSILON);
        creature.adjust_discipline(-250.0);
        assert!(creature.discipline.abs() < FLOAT_EPSILON);
    }

    #[test]
    fn age_is_measured_in_days() {
        let creature = sample();
        let later = creature.born_at + Duration::hours(36);
        assert!((creature.age_days(later) - 1.5).abs() < FLOAT_EPSILON);
        assert!(creature.age_days(creature.born_at - Duration::hours(1)).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn stats_clamp_and_raise() {
        let stats = Stats::new(210.04, 30.0, 8.0);
        let caps = Stats::new(200.0, 60.0, 50.0);
        assert_eq!(stats.clamped_to(&caps), Stats::new(200.0, 30.0, 8.0));
        let floor = Stats::new(90.0, 22.0, 18.0);
        assert_eq!(stats.raised_to(&floor), Stats::new(210.04, 30.0, 18.0));
    }
}
