//! Feeding, daily discipline updates and player activity.
//!
//! Every once-per-day gate here goes through [`calendar_day_for`], so a
//! meal at 02:00 local counts towards the previous game day.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{MAX_MEALS_PER_DAY, MEAL_DISCIPLINE_DELTA, RANK_DISCIPLINE_DELTA};
use crate::conversion::FitnessRank;
use crate::creature::CreatureState;
use crate::day::{DayBoundary, calendar_day_for};
use crate::lifecycle::roll_meal_lifespan_extension;
use crate::numbers::round_to;
use crate::rng::RandomSource;

const EXTENSION_DECIMALS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedOutcome {
    Fed {
        extension_days: f64,
        meals_today: u8,
    },
    MealLimitReached,
    NotAlive,
}

/// Result of one daily discipline update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyUpdate {
    pub day: NaiveDate,
    pub rank: FitnessRank,
    pub rank_delta: f64,
    /// Meals eaten on the day that just closed.
    pub meals_counted: u8,
    pub meal_delta: f64,
    pub discipline: f64,
}

/// Record player activity. Clears the neglect tier bookkeeping.
pub fn touch(creature: &mut CreatureState, now: DateTime<Utc>) {
    creature.last_activity_at = now;
    creature.neglect_tier_applied = 0;
    creature.neglect_hp_applied = 0.0;
    creature.neglect_discipline_applied = 0.0;
}

fn roll_meal_day(creature: &mut CreatureState, today: NaiveDate) {
    if creature.meal_day == Some(today) {
        return;
    }
    if creature.meal_day.is_some() {
        creature.previous_meals = creature.meals_today;
        creature.previous_meal_day = creature.meal_day;
    }
    creature.meals_today = 0;
    creature.meal_day = Some(today);
}

/// Meals recorded for `day`, or 0 if that day is no longer tracked.
#[must_use]
pub fn meals_on(creature: &CreatureState, day: NaiveDate) -> u8 {
    if creature.meal_day == Some(day) {
        creature.meals_today
    } else if creature.previous_meal_day == Some(day) {
        creature.previous_meals
    } else {
        0
    }
}

/// The training "fed" flag for `day`.
#[must_use]
pub fn is_fed_on(creature: &CreatureState, day: NaiveDate) -> bool {
    meals_on(creature, day) > 0
}

/// Feed once. Each meal extends the lifespan and counts as activity.
pub fn feed<R: RandomSource>(
    creature: &mut CreatureState,
    now: DateTime<Utc>,
    boundary: DayBoundary,
    rng: &mut R,
) -> FeedOutcome {
    if !creature.alive {
        return FeedOutcome::NotAlive;
    }
    roll_meal_day(creature, calendar_day_for(now, boundary));
    if creature.meals_today >= MAX_MEALS_PER_DAY {
        return FeedOutcome::MealLimitReached;
    }
    let extension_days = roll_meal_lifespan_extension(rng);
    creature.lifespan_extension_days = round_to(
        creature.lifespan_extension_days + extension_days,
        EXTENSION_DECIMALS,
    );
    creature.meals_today += 1;
    touch(creature, now);
    FeedOutcome::Fed {
        extension_days,
        meals_today: creature.meals_today,
    }
}

#[must_use]
pub fn rank_discipline_delta(rank: FitnessRank) -> f64 {
    RANK_DISCIPLINE_DELTA
        .iter()
        .find(|(candidate, _)| *candidate == rank)
        .map_or(0.0, |(_, delta)| *delta)
}

#[must_use]
pub fn meal_discipline_delta(meals: u8) -> f64 {
    let idx = usize::from(meals.min(MAX_MEALS_PER_DAY));
    MEAL_DISCIPLINE_DELTA.get(idx).copied().unwrap_or(0.0)
}

/// Close the previous game day: adjust discipline and reset meal counters.
///
/// Runs at most once per game day and returns `None` when it did nothing.
/// On the creature's birth day there is no closed day to score; the day is
/// only marked as handled.
pub fn apply_daily_update(
    creature: &mut CreatureState,
    rank: FitnessRank,
    now: DateTime<Utc>,
    boundary: DayBoundary,
) -> Option<DailyUpdate> {
    let today = calendar_day_for(now, boundary);
    if !creature.alive || creature.last_daily_update_day == Some(today) {
        return None;
    }
    let first_update = creature.last_daily_update_day.is_none();
    creature.last_daily_update_day = Some(today);
    if first_update && calendar_day_for(creature.born_at, boundary) == today {
        return None;
    }

    let meals_counted = today
        .pred_opt()
        .map_or(0, |closed| meals_on(creature, closed));
    let rank_delta = rank_discipline_delta(rank);
    let meal_delta = meal_discipline_delta(meals_counted);
    creature.adjust_discipline(rank_delta + meal_delta);
    roll_meal_day(creature, today);

    Some(DailyUpdate {
        day: today,
        rank,
        rank_delta,
        meals_counted,
        meal_delta,
        discipline: creature.discipline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FLOAT_EPSILON;
    use crate::creature::Stats;
    use crate::rng::{ScriptedSource, SeededSource};
    use chrono::{Duration, FixedOffset, TimeZone};

    fn jst(d: u32, h: u32) -> DateTime<Utc> {
        FixedOffset::east_opt(9 * 3_600)
            .unwrap()
            .with_ymd_and_hms(2024, 6, d, h, 0, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn creature() -> CreatureState {
        CreatureState::new("Tester", "cogling", Stats::new(50.0, 12.0, 10.0), jst(1, 10), 9.0)
    }

    #[test]
    fn three_meals_per_game_day() {
        let boundary = DayBoundary::default();
        let mut state = creature();
        let mut rng = SeededSource::from_seed(3);
        for expected in 1..=3 {
            match feed(&mut state, jst(2, 12), boundary, &mut rng) {
                FeedOutcome::Fed { meals_today, extension_days } => {
                    assert_eq!(meals_today, expected);
                    assert!(extension_days > 0.0);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(
            feed(&mut state, jst(2, 20), boundary, &mut rng),
            FeedOutcome::MealLimitReached
        );
        // 03:00 on the 3rd still belongs to the 2nd.
        assert_eq!(
            feed(&mut state, jst(3, 3), boundary, &mut rng),
            FeedOutcome::MealLimitReached
        );
        assert!(matches!(
            feed(&mut state, jst(3, 5), boundary, &mut rng),
            FeedOutcome::Fed { meals_today: 1, .. }
        ));
        assert_eq!(meals_on(&state, day(2)), 3);
        assert_eq!(meals_on(&state, day(3)), 1);
    }

    #[test]
    fn feeding_extends_lifespan_and_refreshes_activity() {
        let mut state = creature();
        state.neglect_tier_applied = 2;
        let mut rng = ScriptedSource::new([0.0, 0.0]);
        let outcome = feed(&mut state, jst(2, 9), DayBoundary::default(), &mut rng);
        assert_eq!(
            outcome,
            FeedOutcome::Fed {
                extension_days: 0.03,
                meals_today: 1
            }
        );
        assert!((state.lifespan_extension_days - 0.03).abs() < FLOAT_EPSILON);
        assert_eq!(state.last_activity_at, jst(2, 9));
        assert_eq!(state.neglect_tier_applied, 0);
        assert!(is_fed_on(&state, day(2)));
        assert!(!is_fed_on(&state, day(3)));
    }

    #[test]
    fn dead_creatures_do_not_eat() {
        let mut state = creature();
        state.alive = false;
        assert_eq!(
            feed(
                &mut state,
                jst(2, 9),
                DayBoundary::default(),
                &mut ScriptedSource::constant(0.0)
            ),
            FeedOutcome::NotAlive
        );
    }

    #[test]
    fn delta_tables() {
        assert!((rank_discipline_delta(FitnessRank::A) - 3.0).abs() < FLOAT_EPSILON);
        assert!((rank_discipline_delta(FitnessRank::D) + 1.0).abs() < FLOAT_EPSILON);
        assert!((meal_discipline_delta(0) + 3.0).abs() < FLOAT_EPSILON);
        assert!(meal_discipline_delta(1).abs() < FLOAT_EPSILON);
        assert!((meal_discipline_delta(3) - 2.0).abs() < FLOAT_EPSILON);
        assert!((meal_discipline_delta(9) - 2.0).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn daily_update_scores_the_closed_day_once() {
        let boundary = DayBoundary::default();
        let mut state = creature();
        let mut rng = SeededSource::from_seed(1);

        assert!(apply_daily_update(&mut state, FitnessRank::A, jst(1, 12), boundary).is_none());

        feed(&mut state, jst(1, 18), boundary, &mut rng);
        feed(&mut state, jst(1, 19), boundary, &mut rng);
        let update = apply_daily_update(&mut state, FitnessRank::B, jst(2, 6), boundary).unwrap();
        assert_eq!(update.meals_counted, 2);
        assert!((update.discipline - 53.0).abs() < FLOAT_EPSILON);
        assert_eq!(state.meals_today, 0);
        assert!(apply_daily_update(&mut state, FitnessRank::B, jst(2, 23), boundary).is_none());

        let starved = apply_daily_update(&mut state, FitnessRank::D, jst(3, 6), boundary).unwrap();
        assert_eq!(starved.meals_counted, 0);
        assert!((starved.discipline - 49.0).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn meals_after_the_update_survive_until_next_close() {
        let boundary = DayBoundary::default();
        let mut state = creature();
        state.last_daily_update_day = Some(day(1));
        let mut rng = SeededSource::from_seed(8);
        feed(&mut state, jst(2, 5), boundary, &mut rng);
        apply_daily_update(&mut state, FitnessRank::C, jst(2, 7), boundary);
        assert_eq!(meals_on(&state, day(2)), 1);
        let next = apply_daily_update(&mut state, FitnessRank::C, jst(3, 7), boundary).unwrap();
        assert_eq!(next.meals_counted, 1);
    }

    #[test]
    fn discipline_is_clamped() {
        let boundary = DayBoundary::default();
        let mut state = creature();
        state.discipline = 99.0;
        state.last_daily_update_day = Some(day(1));
        state.meal_day = Some(day(1));
        state.meals_today = 3;
        let update =
            apply_daily_update(&mut state, FitnessRank::A, jst(1, 10) + Duration::days(1), boundary)
                .unwrap();
        assert!((update.discipline - 100.0).abs() < FLOAT_EPSILON);
    }
}
