//! Species transitions: unlock checks and branch selection.

use serde::{Deserialize, Serialize};

use crate::constants::BALANCED_SHARE_PERCENT;
use crate::creature::{ChannelTotals, CreatureState};
use crate::error::EngineError;
use crate::species::{BranchType, EvolutionTarget, SpeciesDefinition, SpeciesRegistry};
use crate::world::WorldProgressMap;

/// Branch from lifetime channel totals.
///
/// All zero is `Hp`. Every share at or above 30% is `Balanced`. Otherwise
/// the weakly greatest channel wins, testing low, then mid, then high, so
/// ties go to the earlier channel.
#[must_use]
pub fn branch_type(low: u64, mid: u64, high: u64) -> BranchType {
    let total = u128::from(low) + u128::from(mid) + u128::from(high);
    if total == 0 {
        return BranchType::Hp;
    }
    // Integer shares keep the 30% line exact.
    let floor = total * u128::from(BALANCED_SHARE_PERCENT);
    if [low, mid, high]
        .into_iter()
        .all(|channel| u128::from(channel) * 100 >= floor)
    {
        return BranchType::Balanced;
    }
    if low >= mid && low >= high {
        BranchType::Hp
    } else if mid >= high {
        BranchType::Def
    } else {
        BranchType::Atk
    }
}

#[must_use]
pub fn branch_for_totals(totals: &ChannelTotals) -> BranchType {
    branch_type(totals.low, totals.mid, totals.high)
}

/// Effective stats meet the target's requirement. `false` without one.
#[must_use]
pub fn meets_stat_requirement(creature: &CreatureState, target: &SpeciesDefinition) -> bool {
    let Some(req) = target.requirement else {
        return false;
    };
    let stats = creature.effective_stats();
    stats.max_hp >= req.hp && stats.atk >= req.atk && stats.def >= req.def
}

/// `true` without a boss gate; otherwise the gated world's boss must be down.
#[must_use]
pub fn meets_boss_requirement(target: &SpeciesDefinition, worlds: &WorldProgressMap) -> bool {
    match target.requirement.and_then(|req| req.boss_world) {
        None => true,
        Some(world) => worlds.get(&world).is_some_and(|progress| progress.boss_defeated),
    }
}

/// Some target satisfies both the stat and the boss requirement.
///
/// # Errors
///
/// Returns `UnknownSpecies` if the creature's species or one of its targets
/// is missing from the registry.
pub fn can_evolve(
    creature: &CreatureState,
    registry: &SpeciesRegistry,
    worlds: &WorldProgressMap,
) -> Result<bool, EngineError> {
    let species = registry.get(&creature.species)?;
    for target in &species.targets {
        let def = registry.get(&target.species)?;
        if meets_stat_requirement(creature, def) && meets_boss_requirement(def, worlds) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Target tagged with the creature's branch, falling back to the first listed.
///
/// # Errors
///
/// Returns `UnknownSpecies` if the creature's species is not registered.
pub fn pick_target<'r>(
    creature: &CreatureState,
    registry: &'r SpeciesRegistry,
) -> Result<Option<&'r EvolutionTarget>, EngineError> {
    let species = registry.get(&creature.species)?;
    let branch = branch_for_totals(&creature.totals);
    Ok(species
        .target_for(branch)
        .or_else(|| species.targets.first()))
}

/// Switch species in place: record history, raise stats to the new base, heal.
pub fn apply_evolution(creature: &mut CreatureState, target: &SpeciesDefinition) {
    let previous = std::mem::replace(&mut creature.species, target.id.clone());
    creature.history.push(previous);
    creature.stats = creature.stats.raised_to(&target.base);
    creature.heal_full();
}

/// One species transition taken by [`try_evolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evolution {
    pub from: String,
    pub to: String,
    pub branch: BranchType,
}

/// Re-check after any stat or point-total change and evolve if unlocked.
///
/// When [`can_evolve`] holds, [`pick_target`]'s choice is applied as-is.
///
/// # Errors
///
/// Propagates unknown species ids from the registry.
pub fn try_evolve(
    creature: &mut CreatureState,
    registry: &SpeciesRegistry,
    worlds: &WorldProgressMap,
) -> Result<Option<Evolution>, EngineError> {
    if !creature.alive || !can_evolve(creature, registry, worlds)? {
        return Ok(None);
    }
    let Some(target) = pick_target(creature, registry)? else {
        return Ok(None);
    };
    let def = registry.get(&target.species)?;
    let evolution = Evolution {
        from: creature.species.clone(),
        to: def.id.clone(),
        branch: target.branch,
    };
    apply_evolution(creature, def);
    log::debug!(
        "{} evolved {} -> {} ({})",
        creature.name,
        evolution.from,
        evolution.to,
        evolution.branch
    );
    Ok(Some(evolution))
}
