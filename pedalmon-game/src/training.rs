//! Training catalog and the spend → draw → apply pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::constants::{FED_BONUS_MULTIPLIER, TRAINING_GAIN_STEP};
use crate::creature::{CreatureState, Stats};
use crate::error::{EngineError, RegistryError};
use crate::numbers::{ceil_to, is_whole};
use crate::points::TrainingPoints;
use crate::rng::RandomSource;
use crate::species::SpeciesRegistry;

const DEFAULT_PROGRAM_DATA: &str = include_str!("../data/programs.json");
const TABLE: &str = "programs";

/// Continuous gain range, sampled in steps of 0.1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingProgramDefinition {
    pub id: String,
    pub name: String,
    pub cost: TrainingPoints,
    pub hp: GainRange,
    pub atk: GainRange,
    pub def: GainRange,
}

/// Drawn gains for one session. `fed` records whether the bonus was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingResult {
    pub program_id: String,
    pub hp: f64,
    pub atk: f64,
    pub def: f64,
    pub fed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProgramTable {
    #[serde(default)]
    programs: Vec<TrainingProgramDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingCatalog {
    programs: Vec<TrainingProgramDefinition>,
    index: HashMap<String, usize>,
}

impl TrainingCatalog {
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_PROGRAM_DATA).unwrap_or_else(|err| {
            log::error!("embedded program table rejected: {err}");
            Self::default()
        })
    }

    #[must_use]
    pub fn default_catalog() -> &'static Self {
        static CATALOG: OnceLock<TrainingCatalog> = OnceLock::new();
        CATALOG.get_or_init(Self::load_from_static)
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or a program is invalid.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let table: ProgramTable =
            serde_json::from_str(json).map_err(|err| RegistryError::Parse {
                table: TABLE,
                message: err.to_string(),
            })?;
        Self::from_programs(table.programs)
    }

    /// # Errors
    ///
    /// Returns an error on duplicate ids or inverted gain ranges.
    pub fn from_programs(programs: Vec<TrainingProgramDefinition>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(programs.len());
        for (idx, program) in programs.iter().enumerate() {
            for (stat, range) in [("hp", program.hp), ("atk", program.atk), ("def", program.def)] {
                if range.min > range.max || range.min < 0.0 {
                    return Err(RegistryError::InvertedRange {
                        field: format!("{}.{stat}", program.id),
                        min: range.min,
                        max: range.max,
                    });
                }
            }
            if index.insert(program.id.clone(), idx).is_some() {
                return Err(RegistryError::DuplicateId {
                    table: TABLE,
                    id: program.id.clone(),
                });
            }
        }
        Ok(Self { programs, index })
    }

    /// # Errors
    ///
    /// Returns `UnknownProgram` if `id` is not in the catalog.
    pub fn get(&self, id: &str) -> Result<&TrainingProgramDefinition, EngineError> {
        self.index
            .get(id)
            .and_then(|idx| self.programs.get(*idx))
            .ok_or_else(|| EngineError::UnknownProgram(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrainingProgramDefinition> {
        self.programs.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

/// Every channel of `pool` covers the program's cost; no cross-channel substitution.
#[must_use]
pub fn can_afford(program: &TrainingProgramDefinition, pool: &TrainingPoints) -> bool {
    pool.can_cover(&program.cost)
}

/// Fed bonus: ×1.1 rounded up at the gain's own resolution.
///
/// Whole gains stay whole (8 → 9); gains with a tenth round up to a tenth
/// (3.3 → 3.7). Any positive gain strictly increases.
#[must_use]
pub fn fed_gain(gain: f64) -> f64 {
    let boosted = gain * FED_BONUS_MULTIPLIER;
    if is_whole(gain) {
        ceil_to(boosted, 0)
    } else {
        ceil_to(boosted, 1)
    }
}

fn draw_gain<R: RandomSource>(range: GainRange, fed: bool, rng: &mut R) -> f64 {
    let gain = rng.random_decimal(range.min, range.max, TRAINING_GAIN_STEP);
    if fed { fed_gain(gain) } else { gain }
}

/// Draw hp, atk and def gains in that order. The fed bonus rounds up.
pub fn execute<R: RandomSource>(
    program: &TrainingProgramDefinition,
    fed: bool,
    rng: &mut R,
) -> TrainingResult {
    let hp = draw_gain(program.hp, fed, rng);
    let atk = draw_gain(program.atk, fed, rng);
    let def = draw_gain(program.def, fed, rng);
    TrainingResult {
        program_id: program.id.clone(),
        hp,
        atk,
        def,
        fed,
    }
}

/// Apply drawn gains in place.
///
/// Stats are clamped to the species caps and hp is fully restored. The
/// program's cost is added to the lifetime channel totals whatever was drawn.
///
/// # Errors
///
/// Returns `UnknownSpecies` if the creature's species is not registered.
pub fn apply(
    creature: &mut CreatureState,
    result: &TrainingResult,
    program: &TrainingProgramDefinition,
    registry: &SpeciesRegistry,
) -> Result<(), EngineError> {
    let species = registry.get(&creature.species)?;
    let grown = Stats {
        max_hp: creature.stats.max_hp + result.hp,
        atk: creature.stats.atk + result.atk,
        def: creature.stats.def + result.def,
    };
    creature.stats = grown.clamped_to(&species.caps);
    creature.heal_full();
    creature.totals.accumulate(&program.cost);
    Ok(())
}

/// Spend from `pool`, draw and apply. `Ok(None)` when the pool cannot afford it.
///
/// # Errors
///
/// Returns `UnknownSpecies` if the creature's species is not registered; the
/// pool is left untouched in that case.
pub fn train<R: RandomSource>(
    creature: &mut CreatureState,
    pool: &mut TrainingPoints,
    program: &TrainingProgramDefinition,
    fed: bool,
    registry: &SpeciesRegistry,
    rng: &mut R,
) -> Result<Option<TrainingResult>, EngineError> {
    registry.get(&creature.species)?;
    if !can_afford(program, pool) {
        return Ok(None);
    }
    *pool = pool.saturating_sub(&program.cost);
    let result = execute(program, fed, rng);
    apply(creature, &result, program, registry)?;
    log::trace!(
        "trained {} with {}: +{}/{}/{}",
        creature.name,
        program.id,
        result.hp,
        result.atk,
        result.def
    );
    Ok(Some(result))
}
