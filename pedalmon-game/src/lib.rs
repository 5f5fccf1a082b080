//! PedalMon Game Engine
//!
//! Platform-agnostic rules for the PedalMon cycling-fitness pet game.
//! Fitness data comes in through [`sync::FitnessProvider`]; training points,
//! creature stats, battles, evolution and generational succession come out.
//! The crate has no I/O, persistence or UI; hosts own every record and pass
//! it back in.

pub mod battle;
pub mod care;
pub mod constants;
pub mod conversion;
pub mod creature;
pub mod day;
pub mod error;
pub mod evolution;
pub mod lifecycle;
pub mod numbers;
pub mod points;
pub mod rng;
pub mod session;
pub mod species;
pub mod sync;
pub mod training;
pub mod world;

// Re-export commonly used types
pub use battle::{
    AttackOutcome, BattleAction, BattleKind, BattleResult, BattleReward, BattleTurn, Combatant,
    Side, apply_battle_result, calculate_damage, resolve_battle,
};
pub use care::{DailyUpdate, FeedOutcome, apply_daily_update, feed, is_fed_on, touch};
pub use conversion::{
    DailyPoints, FitnessRank, WorkoutPoints, daily_points, fitness_rank, walk_points,
    workout_points,
};
pub use creature::{ChannelTotals, CreatureState, MemoryBonus, Stats};
pub use day::{DayBoundary, calendar_day_for, is_same_day};
pub use error::{EngineError, RegistryError};
pub use evolution::{Evolution, branch_type, can_evolve, pick_target, try_evolve};
pub use lifecycle::{
    DeathCause, LifecycleTick, create_memory_bonus, new_creature, spawn_next_generation, tick,
};
pub use points::{PointLedger, TrainingPoints};
pub use rng::{RandomSource, RngBundle, RngSource, ScriptedSource, SeededSource};
pub use session::{
    EncounterOutcome, EncounterReport, GameData, GenerationChange, Session, TickReport,
    TrainingOutcome,
};
pub use species::{BranchType, SpeciesDefinition, SpeciesRegistry, default_registry};
pub use sync::{DailySync, FitnessProvider, FitnessSummary, SyncReport, WorkoutSummary};
pub use training::{TrainingCatalog, TrainingProgramDefinition, TrainingResult, train};
pub use world::{WorldDefinition, WorldProgress, WorldProgressMap, WorldTable};
