//! Static species table and its validated registry.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::OnceLock;

use crate::constants::MAX_EVOLUTION_TARGETS;
use crate::creature::Stats;
use crate::error::{EngineError, RegistryError};

const DEFAULT_SPECIES_DATA: &str = include_str!("../data/species.json");
const TABLE: &str = "species";

/// Evolution branch outcome selected from lifetime channel totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchType {
    Hp,
    Def,
    Atk,
    Balanced,
}

impl BranchType {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Hp => "hp",
            Self::Def => "def",
            Self::Atk => "atk",
            Self::Balanced => "balanced",
        }
    }
}

impl fmt::Display for BranchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Thresholds a creature must meet to evolve *into* the owning species.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvolutionRequirement {
    pub hp: f64,
    pub atk: f64,
    pub def: f64,
    #[serde(default)]
    pub boss_world: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvolutionTarget {
    pub species: String,
    pub branch: BranchType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesDefinition {
    pub id: String,
    pub name: String,
    pub stage: u8,
    #[serde(default)]
    pub starter: bool,
    pub base: Stats,
    pub caps: Stats,
    #[serde(default)]
    pub requirement: Option<EvolutionRequirement>,
    #[serde(default)]
    pub targets: Vec<EvolutionTarget>,
}

impl SpeciesDefinition {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.targets.is_empty()
    }

    /// Target tagged with `branch`, if any.
    #[must_use]
    pub fn target_for(&self, branch: BranchType) -> Option<&EvolutionTarget> {
        self.targets.iter().find(|target| target.branch == branch)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SpeciesTable {
    #[serde(default)]
    species: Vec<SpeciesDefinition>,
}

/// Immutable, validated species lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeciesRegistry {
    species: Vec<SpeciesDefinition>,
    index: HashMap<String, usize>,
}

impl SpeciesRegistry {
    /// Registry over the embedded species table.
    ///
    /// The embedded table is covered by tests; should it ever fail
    /// validation the error is logged and an empty registry is returned, so
    /// every lookup fails with `UnknownSpecies` instead of guessing.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_SPECIES_DATA).unwrap_or_else(|err| {
            log::error!("embedded species table rejected: {err}");
            Self::default()
        })
    }

    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or the table violates a
    /// registry invariant.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let table: SpeciesTable =
            serde_json::from_str(json).map_err(|err| RegistryError::Parse {
                table: TABLE,
                message: err.to_string(),
            })?;
        Self::from_definitions(table.species)
    }

    /// # Errors
    ///
    /// Returns an error if the definitions violate a registry invariant.
    pub fn from_definitions(species: Vec<SpeciesDefinition>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(species.len());
        for (idx, def) in species.iter().enumerate() {
            if index.insert(def.id.clone(), idx).is_some() {
                return Err(RegistryError::DuplicateId {
                    table: TABLE,
                    id: def.id.clone(),
                });
            }
        }
        let registry = Self { species, index };
        registry.validate()?;
        Ok(registry)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        let max_stage = self.species.iter().map(|def| def.stage).max().unwrap_or(0);
        let mut starters = Vec::new();

        for def in &self.species {
            check_range(&def.id, "max_hp", def.base.max_hp, def.caps.max_hp)?;
            check_range(&def.id, "atk", def.base.atk, def.caps.atk)?;
            check_range(&def.id, "def", def.base.def, def.caps.def)?;

            if def.starter {
                if def.stage != 1 {
                    return Err(RegistryError::StarterNotFirstStage(def.id.clone()));
                }
                starters.push(def.id.as_str());
            }
            if def.stage == max_stage && !def.targets.is_empty() {
                return Err(RegistryError::TerminalWithTargets(def.id.clone()));
            }
            if def.targets.len() > MAX_EVOLUTION_TARGETS {
                return Err(RegistryError::TooManyTargets {
                    species: def.id.clone(),
                    count: def.targets.len(),
                    max: MAX_EVOLUTION_TARGETS,
                });
            }

            let mut branches = HashSet::new();
            for target in &def.targets {
                if !branches.insert(target.branch) {
                    return Err(RegistryError::DuplicateBranch {
                        species: def.id.clone(),
                        branch: target.branch.to_string(),
                    });
                }
                let next = self.lookup(&target.species).ok_or_else(|| {
                    RegistryError::DanglingTarget {
                        species: def.id.clone(),
                        target: target.species.clone(),
                    }
                })?;
                if next.stage <= def.stage {
                    return Err(RegistryError::StageNotIncreasing {
                        species: def.id.clone(),
                        stage: def.stage,
                        target: next.id.clone(),
                        target_stage: next.stage,
                    });
                }
            }
        }

        if starters.is_empty() {
            return Err(RegistryError::NoStarters);
        }

        let reachable = self.reachable_from(&starters);
        if let Some(orphan) = self
            .species
            .iter()
            .find(|def| !reachable.contains(def.id.as_str()))
        {
            return Err(RegistryError::Unreachable(orphan.id.clone()));
        }
        Ok(())
    }

    fn reachable_from<'a>(&'a self, starters: &[&'a str]) -> HashSet<&'a str> {
        let mut seen: HashSet<&str> = starters.iter().copied().collect();
        let mut queue: VecDeque<&str> = starters.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            let Some(def) = self.lookup(id) else {
                continue;
            };
            for target in &def.targets {
                if seen.insert(target.species.as_str()) {
                    queue.push_back(target.species.as_str());
                }
            }
        }
        seen
    }

    /// Verify every boss gate names a world in `1..=world_count`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownBossWorld` for the first gate outside the range.
    pub fn check_boss_worlds(&self, world_count: u32) -> Result<(), RegistryError> {
        for def in &self.species {
            if let Some(world) = def.requirement.and_then(|req| req.boss_world)
                && (world == 0 || world > world_count)
            {
                return Err(RegistryError::UnknownBossWorld {
                    table: TABLE,
                    world,
                });
            }
        }
        Ok(())
    }

    fn lookup(&self, id: &str) -> Option<&SpeciesDefinition> {
        self.index.get(id).and_then(|idx| self.species.get(*idx))
    }

    /// # Errors
    ///
    /// Returns `UnknownSpecies` if `id` is not in the registry.
    pub fn get(&self, id: &str) -> Result<&SpeciesDefinition, EngineError> {
        self.lookup(id)
            .ok_or_else(|| EngineError::UnknownSpecies(id.to_string()))
    }

    /// Starter species in table order.
    #[must_use]
    pub fn starters(&self) -> Vec<&SpeciesDefinition> {
        self.species.iter().filter(|def| def.starter).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpeciesDefinition> {
        self.species.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.species.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}

fn check_range(id: &str, stat: &str, base: f64, cap: f64) -> Result<(), RegistryError> {
    if base > cap {
        return Err(RegistryError::InvertedRange {
            field: format!("{id}.{stat}"),
            min: base,
            max: cap,
        });
    }
    Ok(())
}

/// Process-wide registry over the embedded species table.
#[must_use]
pub fn default_registry() -> &'static SpeciesRegistry {
    static REGISTRY: OnceLock<SpeciesRegistry> = OnceLock::new();
    REGISTRY.get_or_init(SpeciesRegistry::load_from_static)
}
