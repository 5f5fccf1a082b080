//! World tables, per-world progress and encounter gating.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::battle::Combatant;
use crate::constants::{BOSS_UNLOCK_KILLS, BOSS_WALK_COST, ENCOUNTER_WALK_COST, ENEMY_DISCIPLINE};
use crate::creature::Stats;
use crate::error::{EngineError, RegistryError};
use crate::numbers::{floor_f64_to_i32, i64_to_f64};
use crate::points::PointLedger;
use crate::rng::RandomSource;

const DEFAULT_WORLD_DATA: &str = include_str!("../data/worlds.json");
const TABLE: &str = "worlds";

/// Progress records keyed by world number.
pub type WorldProgressMap = BTreeMap<u32, WorldProgress>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldProgress {
    pub kills: u32,
    pub boss_defeated: bool,
}

#[must_use]
pub const fn can_challenge_boss(progress: &WorldProgress) -> bool {
    progress.kills >= BOSS_UNLOCK_KILLS && !progress.boss_defeated
}

#[must_use]
pub const fn record_kill(progress: &WorldProgress) -> WorldProgress {
    WorldProgress {
        kills: progress.kills.saturating_add(1),
        boss_defeated: progress.boss_defeated,
    }
}

#[must_use]
pub const fn record_boss_defeat(progress: &WorldProgress) -> WorldProgress {
    WorldProgress {
        kills: progress.kills,
        boss_defeated: true,
    }
}

/// World 1 plus every world whose predecessor's boss is down, ascending.
#[must_use]
pub fn available_worlds(progress: &WorldProgressMap) -> Vec<u32> {
    let mut worlds = vec![1];
    worlds.extend(
        progress
            .iter()
            .filter(|(_, record)| record.boss_defeated)
            .map(|(number, _)| number.saturating_add(1)),
    );
    worlds.sort_unstable();
    worlds.dedup();
    worlds
}

/// Spend walk points for a wild encounter.
pub fn pay_encounter(ledger: &mut PointLedger) -> bool {
    ledger.spend_walk(ENCOUNTER_WALK_COST)
}

/// Spend walk points for a boss fight, only if the boss is challengeable.
pub fn pay_boss_challenge(ledger: &mut PointLedger, progress: &WorldProgress) -> bool {
    can_challenge_boss(progress) && ledger.spend_walk(BOSS_WALK_COST)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRange {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemySlot {
    pub name: String,
    pub hp: StatRange,
    pub atk: StatRange,
    pub def: StatRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossDefinition {
    pub name: String,
    pub hp: i32,
    pub atk: i32,
    pub def: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldDefinition {
    pub number: u32,
    pub name: String,
    /// Creature power the world is balanced around.
    pub recommended: Stats,
    pub enemies: Vec<EnemySlot>,
    pub boss: BossDefinition,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WorldFile {
    #[serde(default)]
    worlds: Vec<WorldDefinition>,
}

/// Validated world table. Worlds are numbered `1..=n` in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldTable {
    worlds: Vec<WorldDefinition>,
}

impl WorldTable {
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_WORLD_DATA).unwrap_or_else(|err| {
            log::error!("embedded world table rejected: {err}");
            Self::default()
        })
    }

    #[must_use]
    pub fn default_table() -> &'static Self {
        static TABLE_CELL: OnceLock<WorldTable> = OnceLock::new();
        TABLE_CELL.get_or_init(Self::load_from_static)
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or the table is invalid.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let file: WorldFile = serde_json::from_str(json).map_err(|err| RegistryError::Parse {
            table: TABLE,
            message: err.to_string(),
        })?;
        Self::from_worlds(file.worlds)
    }

    /// # Errors
    ///
    /// Returns an error on gaps in numbering, empty worlds or inverted ranges.
    pub fn from_worlds(worlds: Vec<WorldDefinition>) -> Result<Self, RegistryError> {
        for (expected, world) in (1_u32..).zip(&worlds) {
            if world.number != expected {
                return Err(RegistryError::WorldNumbering {
                    found: world.number,
                    expected,
                });
            }
            if world.enemies.is_empty() {
                return Err(RegistryError::EmptyWorld(world.number));
            }
            for slot in &world.enemies {
                for (stat, range) in [("hp", slot.hp), ("atk", slot.atk), ("def", slot.def)] {
                    if range.min > range.max || range.min < 0 {
                        return Err(RegistryError::InvertedRange {
                            field: format!("{}.{stat}", slot.name),
                            min: i64_to_f64(range.min),
                            max: i64_to_f64(range.max),
                        });
                    }
                }
            }
        }
        Ok(Self { worlds })
    }

    /// # Errors
    ///
    /// Returns `UnknownWorld` if `number` is not in the table.
    pub fn get(&self, number: u32) -> Result<&WorldDefinition, EngineError> {
        number
            .checked_sub(1)
            .and_then(|idx| self.worlds.get(usize::try_from(idx).ok()?))
            .ok_or(EngineError::UnknownWorld(number))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorldDefinition> {
        self.worlds.iter()
    }

    /// [`available_worlds`] limited to worlds that exist in this table.
    #[must_use]
    pub fn available(&self, progress: &WorldProgressMap) -> Vec<u32> {
        available_worlds(progress)
            .into_iter()
            .filter(|number| self.get(*number).is_ok())
            .collect()
    }
}

fn draw_stat<R: RandomSource>(range: StatRange, rng: &mut R) -> i32 {
    i32::try_from(rng.random_int(range.min, range.max)).unwrap_or(i32::MAX)
}

/// Roll one enemy from a world's slot; hp, atk, def are drawn in that order.
///
/// # Errors
///
/// Returns `UnknownWorld` or `UnknownEnemySlot` for ids outside the table.
pub fn generate_enemy<R: RandomSource>(
    table: &WorldTable,
    world: u32,
    slot: usize,
    rng: &mut R,
) -> Result<Combatant, EngineError> {
    let def = table.get(world)?;
    let enemy = def
        .enemies
        .get(slot)
        .ok_or(EngineError::UnknownEnemySlot { world, slot })?;
    let hp = draw_stat(enemy.hp, rng);
    let atk = draw_stat(enemy.atk, rng);
    let def_stat = draw_stat(enemy.def, rng);
    Ok(Combatant::new(
        hp,
        hp,
        f64::from(atk),
        f64::from(def_stat),
        ENEMY_DISCIPLINE,
    ))
}

/// Uniformly pick a slot, then roll it.
///
/// # Errors
///
/// Returns `UnknownWorld` if `world` is not in the table.
pub fn random_enemy<R: RandomSource>(
    table: &WorldTable,
    world: u32,
    rng: &mut R,
) -> Result<Combatant, EngineError> {
    let slots = table.get(world)?.enemies.len();
    let last = i64::try_from(slots.saturating_sub(1)).unwrap_or(0);
    let slot = usize::try_from(rng.random_int(0, last)).unwrap_or(0);
    generate_enemy(table, world, slot, rng)
}

/// The world's fixed boss.
///
/// # Errors
///
/// Returns `UnknownWorld` if `world` is not in the table.
pub fn boss_combatant(table: &WorldTable, world: u32) -> Result<Combatant, EngineError> {
    let boss = &table.get(world)?.boss;
    Ok(Combatant::new(
        boss.hp,
        boss.hp,
        f64::from(boss.atk),
        f64::from(boss.def),
        ENEMY_DISCIPLINE,
    ))
}

/// A combatant at the world's recommended power, full hp, neutral discipline.
///
/// # Errors
///
/// Returns `UnknownWorld` if `world` is not in the table.
pub fn recommended_combatant(table: &WorldTable, world: u32) -> Result<Combatant, EngineError> {
    let stats = table.get(world)?.recommended;
    let hp = floor_f64_to_i32(stats.max_hp);
    Ok(Combatant::new(hp, hp, stats.atk, stats.def, ENEMY_DISCIPLINE))
}
