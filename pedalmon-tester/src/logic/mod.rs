pub mod balance;
pub mod policy;
pub mod reports;
pub mod scenarios;
pub mod seeds;
pub mod simulation;
pub mod tester;

pub use balance::{
    aggregate_strategies, boss_win_rates, lifespan_distribution, strategy_sweep,
    validate_balance_targets,
};
pub use reports::BalanceSummary;
pub use seeds::resolve_seed_inputs;
pub use tester::*;
