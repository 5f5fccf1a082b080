//! Lifespan, neglect, passive regeneration and generation hand-off.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    BASE_LIFESPAN_BUCKETS, LIFESPAN_PRECISION, MEAL_EXTENSION_BUCKETS,
    MEAL_EXTENSION_PRECISION, MEMORY_BONUS_SHARE, NEGLECT_DEATH_HOURS, NEGLECT_DISCIPLINE_LIGHT,
    NEGLECT_DISCIPLINE_LIGHT_HOURS, NEGLECT_DISCIPLINE_MILD, NEGLECT_DISCIPLINE_MILD_HOURS,
    NEGLECT_DISCIPLINE_SEVERE, NEGLECT_DISCIPLINE_SEVERE_HOURS, NEGLECT_HP_MILD_HOURS,
    NEGLECT_HP_MILD_SHARE, NEGLECT_HP_SEVERE_HOURS, NEGLECT_HP_SEVERE_SHARE,
    PASSIVE_REGEN_RATE,
};
use crate::creature::{CreatureState, MemoryBonus, elapsed_hours};
use crate::error::EngineError;
use crate::numbers::{finite_or, floor_f64_to_u32, i64_to_f64};
use crate::rng::{RandomSource, validate_buckets};
use crate::species::SpeciesRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    OldAge,
    Neglect,
}

/// Base lifespan in days, two draws.
pub fn roll_base_lifespan<R: RandomSource>(rng: &mut R) -> f64 {
    debug_assert!(validate_buckets(&BASE_LIFESPAN_BUCKETS).is_ok());
    rng.weighted_bucket_sample(&BASE_LIFESPAN_BUCKETS, LIFESPAN_PRECISION)
}

/// Extension granted by one meal, in days. Always positive.
pub fn roll_meal_lifespan_extension<R: RandomSource>(rng: &mut R) -> f64 {
    debug_assert!(validate_buckets(&MEAL_EXTENSION_BUCKETS).is_ok());
    rng.weighted_bucket_sample(&MEAL_EXTENSION_BUCKETS, MEAL_EXTENSION_PRECISION)
}

#[must_use]
pub fn is_lifespan_reached(creature: &CreatureState, now: DateTime<Utc>) -> bool {
    creature.age_days(now) >= creature.lifespan_days()
}

#[must_use]
pub fn is_neglected(creature: &CreatureState, now: DateTime<Utc>) -> bool {
    creature.hours_since_activity(now) >= NEGLECT_DEATH_HOURS
}

/// `floor(max_hp * 0.10 * hours)`.
#[must_use]
pub fn passive_regen(max_hp: f64, hours: f64) -> f64 {
    let hours = finite_or(hours, 0.0).max(0.0);
    (max_hp * PASSIVE_REGEN_RATE * hours).floor()
}

/// Hp lost after `hours_absent`. The severe tier replaces the mild one.
#[must_use]
pub fn neglect_hp_penalty(max_hp: f64, hours_absent: f64) -> f64 {
    let share = if hours_absent >= NEGLECT_HP_SEVERE_HOURS {
        NEGLECT_HP_SEVERE_SHARE
    } else if hours_absent >= NEGLECT_HP_MILD_HOURS {
        NEGLECT_HP_MILD_SHARE
    } else {
        return 0.0;
    };
    (max_hp * share).floor()
}

/// Discipline lost after `hours_absent`. Draws once for the ranged tiers.
pub fn neglect_discipline_penalty<R: RandomSource>(hours_absent: f64, rng: &mut R) -> f64 {
    let amount = if hours_absent >= NEGLECT_DISCIPLINE_SEVERE_HOURS {
        NEGLECT_DISCIPLINE_SEVERE
    } else if hours_absent >= NEGLECT_DISCIPLINE_MILD_HOURS {
        rng.random_int(NEGLECT_DISCIPLINE_MILD.0, NEGLECT_DISCIPLINE_MILD.1)
    } else if hours_absent >= NEGLECT_DISCIPLINE_LIGHT_HOURS {
        rng.random_int(NEGLECT_DISCIPLINE_LIGHT.0, NEGLECT_DISCIPLINE_LIGHT.1)
    } else {
        0
    };
    i64_to_f64(amount)
}

/// Discipline neglect tier reached after `hours_absent`.
fn discipline_tier(hours_absent: f64) -> u8 {
    if hours_absent >= NEGLECT_DISCIPLINE_SEVERE_HOURS {
        3
    } else if hours_absent >= NEGLECT_DISCIPLINE_MILD_HOURS {
        2
    } else if hours_absent >= NEGLECT_DISCIPLINE_LIGHT_HOURS {
        1
    } else {
        0
    }
}

/// `floor((stat + active bonus) * 0.2)` per stat, from final effective stats.
#[must_use]
pub fn create_memory_bonus(creature: &CreatureState) -> MemoryBonus {
    let stats = creature.effective_stats();
    MemoryBonus {
        hp: floor_f64_to_u32(stats.max_hp * MEMORY_BONUS_SHARE),
        atk: floor_f64_to_u32(stats.atk * MEMORY_BONUS_SHARE),
        def: floor_f64_to_u32(stats.def * MEMORY_BONUS_SHARE),
    }
}

/// Fresh creature of `species` at its base stats with a rolled lifespan.
///
/// # Errors
///
/// Returns `UnknownSpecies` if `species` is not registered.
pub fn new_creature<R: RandomSource>(
    registry: &SpeciesRegistry,
    species: &str,
    name: &str,
    now: DateTime<Utc>,
    generation: u32,
    memory: Option<MemoryBonus>,
    rng: &mut R,
) -> Result<CreatureState, EngineError> {
    let def = registry.get(species)?;
    let lifespan = roll_base_lifespan(rng);
    let mut creature = CreatureState::new(name, def.id.clone(), def.base, now, lifespan);
    creature.generation = generation;
    creature.memory = memory;
    creature.heal_full();
    Ok(creature)
}

/// Next generation after `previous` died.
///
/// Picks a uniformly random starter, then rolls the lifespan. Everything
/// per-life is reset; only the name carries over and the memory bonus is
/// derived from `previous`.
///
/// # Errors
///
/// Returns `UnknownSpecies` if the registry has no starter species.
pub fn spawn_next_generation<R: RandomSource>(
    registry: &SpeciesRegistry,
    previous: &CreatureState,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<CreatureState, EngineError> {
    let starters = registry.starters();
    let starter = rng
        .random_pick(&starters)
        .ok_or_else(|| EngineError::UnknownSpecies("<starter>".to_string()))?;
    let memory = create_memory_bonus(previous);
    let next = new_creature(
        registry,
        &starter.id,
        &previous.name,
        now,
        previous.generation.saturating_add(1),
        Some(memory),
        rng,
    )?;
    log::debug!(
        "generation {} spawned as {} with memory {}/{}/{}",
        next.generation,
        next.species,
        memory.hp,
        memory.atk,
        memory.def
    );
    Ok(next)
}

/// Everything one lifecycle tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LifecycleTick {
    pub died: Option<DeathCause>,
    pub regenerated: f64,
    pub hp_penalty: f64,
    pub discipline_penalty: f64,
}

/// Periodic update, mutating `creature` in place.
///
/// Death is checked first (age, then neglect). A living creature then
/// regenerates and takes any neglect penalty it has newly crossed. A higher
/// tier only applies the difference to what earlier tiers already took.
///
/// Regeneration is `floor(max_hp * 0.10 * hours)` where `hours` is the time
/// since the previous tick (`last_tick_at`), not since the last player
/// activity. Measuring from activity would pay the same absent hours again
/// on every tick. Callers that tick once per activity window get the
/// activity-based figure.
pub fn tick<R: RandomSource>(
    creature: &mut CreatureState,
    now: DateTime<Utc>,
    rng: &mut R,
) -> LifecycleTick {
    let mut report = LifecycleTick::default();
    if !creature.alive {
        return report;
    }

    let cause = if is_lifespan_reached(creature, now) {
        Some(DeathCause::OldAge)
    } else if is_neglected(creature, now) {
        Some(DeathCause::Neglect)
    } else {
        None
    };
    if let Some(cause) = cause {
        creature.alive = false;
        creature.cause_of_death = Some(cause);
        creature.last_tick_at = now;
        report.died = Some(cause);
        log::debug!(
            "{} (generation {}) died: {cause:?} at {:.2} days",
            creature.name,
            creature.generation,
            creature.age_days(now)
        );
        return report;
    }

    let max_hp = creature.effective_max_hp();
    let since_tick = elapsed_hours(creature.last_tick_at, now);
    let before = creature.current_hp;
    creature.adjust_hp(passive_regen(max_hp, since_tick));
    report.regenerated = creature.current_hp - before;
    creature.last_tick_at = now;

    let absent = creature.hours_since_activity(now);
    let hp_target = neglect_hp_penalty(max_hp, absent);
    if hp_target > creature.neglect_hp_applied {
        let before = creature.current_hp;
        creature.adjust_hp(creature.neglect_hp_applied - hp_target);
        report.hp_penalty = before - creature.current_hp;
        creature.neglect_hp_applied = hp_target;
    }

    let tier = discipline_tier(absent);
    if tier > creature.neglect_tier_applied {
        let discipline_target = neglect_discipline_penalty(absent, rng);
        let discipline_due = (discipline_target - creature.neglect_discipline_applied).max(0.0);
        let before = creature.discipline;
        creature.adjust_discipline(-discipline_due);
        report.discipline_penalty = before - creature.discipline;
        creature.neglect_discipline_applied =
            creature.neglect_discipline_applied.max(discipline_target);
        creature.neglect_tier_applied = tier;
    }
    report
}

/// Days the creature has left, never negative.
#[must_use]
pub fn remaining_days(creature: &CreatureState, now: DateTime<Utc>) -> f64 {
    (creature.lifespan_days() - creature.age_days(now)).max(0.0)
}

/// Hours of absence before neglect death.
#[must_use]
pub fn hours_until_neglect(creature: &CreatureState, now: DateTime<Utc>) -> f64 {
    (NEGLECT_DEATH_HOURS - creature.hours_since_activity(now)).max(0.0)
}
