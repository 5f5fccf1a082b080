//! Engine error taxonomy.
use thiserror::Error;

/// Programmer/data errors. These are never recovered from inside the engine:
/// a bad id is reported to the caller instead of being replaced by a default.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("unknown species id `{0}`")]
    UnknownSpecies(String),
    #[error("unknown world number {0}")]
    UnknownWorld(u32),
    #[error("unknown training program id `{0}`")]
    UnknownProgram(String),
    #[error("enemy slot {slot} does not exist in world {world}")]
    UnknownEnemySlot { world: u32, slot: usize },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Raised while validating static tables at load time.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    #[error("failed to parse {table} table: {message}")]
    Parse { table: &'static str, message: String },
    #[error("duplicate {table} id `{id}`")]
    DuplicateId { table: &'static str, id: String },
    #[error("species `{species}` targets unknown species `{target}`")]
    DanglingTarget { species: String, target: String },
    #[error("species `{species}` (stage {stage}) targets `{target}` at stage {target_stage}")]
    StageNotIncreasing {
        species: String,
        stage: u8,
        target: String,
        target_stage: u8,
    },
    #[error("terminal species `{0}` must not list evolution targets")]
    TerminalWithTargets(String),
    #[error("species `{species}` lists {count} targets (max {max})")]
    TooManyTargets {
        species: String,
        count: usize,
        max: usize,
    },
    #[error("species `{species}` tags branch {branch} more than once")]
    DuplicateBranch { species: String, branch: String },
    #[error("species `{0}` is unreachable from every starter")]
    Unreachable(String),
    #[error("species table has no starter species")]
    NoStarters,
    #[error("starter species `{0}` must be stage 1")]
    StarterNotFirstStage(String),
    #[error("{table} requirement references unknown world {world}")]
    UnknownBossWorld { table: &'static str, world: u32 },
    #[error("world table must number worlds 1..=n without gaps (found {found}, expected {expected})")]
    WorldNumbering { found: u32, expected: u32 },
    #[error("world {0} has no enemy slots")]
    EmptyWorld(u32),
    #[error("{field} range is inverted ({min} > {max})")]
    InvertedRange { field: String, min: f64, max: f64 },
    #[error("bucket weights sum to {sum:.6}, expected 1")]
    BucketWeights { sum: f64 },
}
