//! A playthrough: one creature, its caller-owned pools and world progress.
//!
//! `Session` only composes the engine operations in the order a host would
//! call them. It does not decide *when* to call them; hosts and simulation
//! drivers supply the clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::battle::{BattleKind, BattleResult, BattleReward, apply_battle_result, resolve_battle};
use crate::battle::Combatant;
use crate::care::{DailyUpdate, FeedOutcome, apply_daily_update, feed, is_fed_on, touch};
use crate::conversion::FitnessRank;
use crate::creature::{CreatureState, MemoryBonus};
use crate::day::{DayBoundary, calendar_day_for};
use crate::error::{EngineError, RegistryError};
use crate::evolution::{Evolution, try_evolve};
use crate::lifecycle::{DeathCause, LifecycleTick, new_creature, spawn_next_generation, tick};
use crate::points::PointLedger;
use crate::rng::{RandomSource, RngBundle};
use crate::species::SpeciesRegistry;
use crate::sync::{DailySync, FitnessProvider, SyncReport};
use crate::training::{TrainingCatalog, TrainingResult, train};
use crate::world::{
    WorldProgressMap, WorldTable, boss_combatant, can_challenge_boss, pay_boss_challenge,
    pay_encounter, random_enemy, record_boss_defeat, record_kill,
};

/// The three static tables, validated against each other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameData {
    pub species: SpeciesRegistry,
    pub programs: TrainingCatalog,
    pub worlds: WorldTable,
}

impl GameData {
    /// # Errors
    ///
    /// Returns an error if any table fails validation or a species boss gate
    /// names a world the world table does not have.
    pub fn from_json(species: &str, programs: &str, worlds: &str) -> Result<Self, RegistryError> {
        let data = Self {
            species: SpeciesRegistry::from_json(species)?,
            programs: TrainingCatalog::from_json(programs)?,
            worlds: WorldTable::from_json(worlds)?,
        };
        let count = u32::try_from(data.worlds.len()).unwrap_or(u32::MAX);
        data.species.check_boss_worlds(count)?;
        Ok(data)
    }

    /// The embedded tables.
    #[must_use]
    pub fn embedded() -> &'static Self {
        static DATA: OnceLock<GameData> = OnceLock::new();
        DATA.get_or_init(|| Self {
            species: SpeciesRegistry::load_from_static(),
            programs: TrainingCatalog::load_from_static(),
            worlds: WorldTable::load_from_static(),
        })
    }
}

/// What a training request did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrainingOutcome {
    Trained {
        result: TrainingResult,
        evolution: Option<Evolution>,
    },
    CannotAfford,
    NotAlive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterReport {
    pub world: u32,
    pub kind: BattleKind,
    pub battle: BattleResult,
    pub reward: BattleReward,
    pub evolution: Option<Evolution>,
}

/// What a fight request did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EncounterOutcome {
    Fought(EncounterReport),
    WorldLocked,
    BossUnavailable,
    InsufficientWalkPoints,
    NotAlive,
}

/// A death and the generation that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationChange {
    pub cause: DeathCause,
    pub previous_generation: u32,
    pub memory: Option<MemoryBonus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: LifecycleTick,
    pub succession: Option<GenerationChange>,
}

pub struct Session<'d> {
    data: &'d GameData,
    boundary: DayBoundary,
    rng: RngBundle,
    pub creature: CreatureState,
    pub ledger: PointLedger,
    pub worlds: WorldProgressMap,
}

impl<'d> Session<'d> {
    /// Start generation 1. Without `starter` a random starter is picked.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSpecies` if `starter` is not registered or the
    /// registry has no starters.
    pub fn new(
        data: &'d GameData,
        name: &str,
        starter: Option<&str>,
        seed: u64,
        now: DateTime<Utc>,
    ) -> Result<Self, EngineError> {
        let mut rng = RngBundle::from_user_seed(seed);
        let species = match starter {
            Some(id) => data.species.get(id)?.id.clone(),
            None => {
                let starters = data.species.starters();
                rng.lifecycle()
                    .random_pick(&starters)
                    .map(|def| def.id.clone())
                    .ok_or_else(|| EngineError::UnknownSpecies("<starter>".to_string()))?
            }
        };
        let creature = new_creature(&data.species, &species, name, now, 1, None, rng.lifecycle())?;
        Ok(Self {
            data,
            boundary: DayBoundary::default(),
            rng,
            creature,
            ledger: PointLedger::new(),
            worlds: WorldProgressMap::new(),
        })
    }

    #[must_use]
    pub const fn with_boundary(mut self, boundary: DayBoundary) -> Self {
        self.boundary = boundary;
        self
    }

    #[must_use]
    pub const fn data(&self) -> &'d GameData {
        self.data
    }

    #[must_use]
    pub const fn boundary(&self) -> DayBoundary {
        self.boundary
    }

    /// Draws consumed across every stream so far.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.rng.total_draws()
    }

    fn evolve(&mut self) -> Result<Option<Evolution>, EngineError> {
        try_evolve(&mut self.creature, &self.data.species, &self.worlds)
    }

    /// Spend the program's cost from the ledger and train. Fed if any meal
    /// was eaten on the current game day.
    ///
    /// # Errors
    ///
    /// Returns `UnknownProgram` or `UnknownSpecies` for ids outside the tables.
    pub fn train(
        &mut self,
        program_id: &str,
        now: DateTime<Utc>,
    ) -> Result<TrainingOutcome, EngineError> {
        let program = self.data.programs.get(program_id)?;
        if !self.creature.alive {
            return Ok(TrainingOutcome::NotAlive);
        }
        let fed = is_fed_on(&self.creature, calendar_day_for(now, self.boundary));
        let Some(result) = train(
            &mut self.creature,
            &mut self.ledger.training,
            program,
            fed,
            &self.data.species,
            self.rng.training(),
        )?
        else {
            return Ok(TrainingOutcome::CannotAfford);
        };
        touch(&mut self.creature, now);
        let evolution = self.evolve()?;
        Ok(TrainingOutcome::Trained { result, evolution })
    }

    fn fight(
        &mut self,
        world: u32,
        kind: BattleKind,
        enemy: &Combatant,
        now: DateTime<Utc>,
    ) -> Result<EncounterReport, EngineError> {
        let player = Combatant::from_creature(&self.creature);
        let battle = resolve_battle(&player, enemy, self.rng.battle());
        let reward = apply_battle_result(&mut self.creature, &battle, kind);
        self.ledger.credit_base(reward.base_points);
        if reward.won {
            let progress = self.worlds.entry(world).or_default();
            *progress = match kind {
                BattleKind::Wild => record_kill(progress),
                BattleKind::Boss => {
                    log::debug!("{} defeated the world {world} boss", self.creature.name);
                    record_boss_defeat(progress)
                }
            };
        }
        touch(&mut self.creature, now);
        let evolution = self.evolve()?;
        Ok(EncounterReport {
            world,
            kind,
            battle,
            reward,
            evolution,
        })
    }

    /// Pay the encounter cost and fight a random wild enemy of `world`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownWorld` if `world` is not in the table.
    pub fn fight_wild(
        &mut self,
        world: u32,
        now: DateTime<Utc>,
    ) -> Result<EncounterOutcome, EngineError> {
        self.data.worlds.get(world)?;
        if !self.creature.alive {
            return Ok(EncounterOutcome::NotAlive);
        }
        if !self.data.worlds.available(&self.worlds).contains(&world) {
            return Ok(EncounterOutcome::WorldLocked);
        }
        if !pay_encounter(&mut self.ledger) {
            return Ok(EncounterOutcome::InsufficientWalkPoints);
        }
        let enemy = random_enemy(&self.data.worlds, world, self.rng.world())?;
        self.fight(world, BattleKind::Wild, &enemy, now)
            .map(EncounterOutcome::Fought)
    }

    /// Pay the boss cost and fight the boss of `world`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownWorld` if `world` is not in the table.
    pub fn fight_boss(
        &mut self,
        world: u32,
        now: DateTime<Utc>,
    ) -> Result<EncounterOutcome, EngineError> {
        let enemy = boss_combatant(&self.data.worlds, world)?;
        if !self.creature.alive {
            return Ok(EncounterOutcome::NotAlive);
        }
        if !self.data.worlds.available(&self.worlds).contains(&world) {
            return Ok(EncounterOutcome::WorldLocked);
        }
        let progress = self.worlds.get(&world).copied().unwrap_or_default();
        if !can_challenge_boss(&progress) {
            return Ok(EncounterOutcome::BossUnavailable);
        }
        if !pay_boss_challenge(&mut self.ledger, &progress) {
            return Ok(EncounterOutcome::InsufficientWalkPoints);
        }
        self.fight(world, BattleKind::Boss, &enemy, now)
            .map(EncounterOutcome::Fought)
    }

    pub fn feed(&mut self, now: DateTime<Utc>) -> FeedOutcome {
        feed(&mut self.creature, now, self.boundary, self.rng.lifecycle())
    }

    pub fn daily_update(&mut self, rank: FitnessRank, now: DateTime<Utc>) -> Option<DailyUpdate> {
        apply_daily_update(&mut self.creature, rank, now, self.boundary)
    }

    /// Run one sync round and close the game day with the fresh rank.
    pub fn sync<P: FitnessProvider>(
        &mut self,
        provider: &mut P,
        now: DateTime<Utc>,
    ) -> (SyncReport, Option<DailyUpdate>) {
        let report = DailySync::new(self.boundary).run(provider, &mut self.ledger, now);
        let update = self.daily_update(report.daily.rank, now);
        (report, update)
    }

    /// Lifecycle tick; on death the next generation replaces the creature.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSpecies` if no starter can be spawned.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Result<TickReport, EngineError> {
        let report = tick(&mut self.creature, now, self.rng.lifecycle());
        let Some(cause) = report.died else {
            return Ok(TickReport {
                tick: report,
                succession: None,
            });
        };
        let next =
            spawn_next_generation(&self.data.species, &self.creature, now, self.rng.lifecycle())?;
        let previous = std::mem::replace(&mut self.creature, next);
        Ok(TickReport {
            tick: report,
            succession: Some(GenerationChange {
                cause,
                previous_generation: previous.generation,
                memory: self.creature.memory,
            }),
        })
    }
}
