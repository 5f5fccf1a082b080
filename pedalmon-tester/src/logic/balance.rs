//! Monte-Carlo balance sweeps, parallel across seeds.

use anyhow::{Result, bail};
use pedalmon_game::lifecycle::{roll_base_lifespan, roll_meal_lifespan_extension};
use pedalmon_game::world::{boss_combatant, recommended_combatant};
use pedalmon_game::{GameData, RngSource, resolve_battle};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;
use serde::Serialize;

use crate::logic::policy::TrainingStrategy;
use crate::logic::simulation::{Simulation, SimulationConfig, SimulationSummary};
use crate::util::fraction;

/// Boss win rate band for a creature at exactly the recommended stats.
pub const BOSS_WIN_RATE_BAND: (f64, f64) = (0.25, 0.55);
pub const EXPECTED_MEAN_LIFESPAN: f64 = 9.3;
pub const LIFESPAN_TOLERANCE: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BossBalance {
    pub world: u32,
    pub boss: String,
    pub samples: usize,
    pub wins: usize,
    pub timeouts: usize,
    pub win_rate: f64,
    pub mean_turns: f64,
}

impl BossBalance {
    #[must_use]
    pub fn within_band(&self) -> bool {
        (BOSS_WIN_RATE_BAND.0..=BOSS_WIN_RATE_BAND.1).contains(&self.win_rate)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    samples: usize,
    wins: usize,
    timeouts: usize,
    turns: usize,
}

impl Tally {
    const fn merge(self, other: Self) -> Self {
        Self {
            samples: self.samples + other.samples,
            wins: self.wins + other.wins,
            timeouts: self.timeouts + other.timeouts,
            turns: self.turns + other.turns,
        }
    }
}

fn stream_seed(seed: u64, salt: u64) -> u64 {
    seed.rotate_left(17) ^ salt.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Recommended-stat creature against each world boss, `samples` fights per seed.
pub fn boss_win_rates(data: &GameData, seeds: &[u64], samples: usize) -> Result<Vec<BossBalance>> {
    let mut reports = Vec::with_capacity(data.worlds.len());
    for world in data.worlds.iter() {
        let player = recommended_combatant(&data.worlds, world.number)?;
        let boss = boss_combatant(&data.worlds, world.number)?;
        let tally = seeds
            .par_iter()
            .map(|&seed| {
                let mut rng = RngSource::new(ChaCha20Rng::seed_from_u64(stream_seed(
                    seed,
                    u64::from(world.number),
                )));
                let mut tally = Tally::default();
                for _ in 0..samples {
                    let result = resolve_battle(&player, &boss, &mut rng);
                    tally.samples += 1;
                    tally.wins += usize::from(result.player_won);
                    tally.timeouts += usize::from(result.timed_out);
                    tally.turns += result.turns.len();
                }
                tally
            })
            .reduce(Tally::default, Tally::merge);
        log::debug!(
            "world {} boss {}: {}/{} wins",
            world.number,
            world.boss.name,
            tally.wins,
            tally.samples
        );
        reports.push(BossBalance {
            world: world.number,
            boss: world.boss.name.clone(),
            samples: tally.samples,
            wins: tally.wins,
            timeouts: tally.timeouts,
            win_rate: fraction(tally.wins, tally.samples),
            mean_turns: if tally.samples == 0 {
                0.0
            } else {
                let turns = u32::try_from(tally.turns).unwrap_or(u32::MAX);
                let samples = u32::try_from(tally.samples).unwrap_or(u32::MAX);
                f64::from(turns) / f64::from(samples)
            },
        });
    }
    Ok(reports)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifespanBalance {
    pub samples: usize,
    pub mean_base_days: f64,
    pub min_base_days: f64,
    pub max_base_days: f64,
    pub mean_meal_extension_days: f64,
}

impl LifespanBalance {
    #[must_use]
    pub fn within_tolerance(&self) -> bool {
        (self.mean_base_days - EXPECTED_MEAN_LIFESPAN).abs() <= LIFESPAN_TOLERANCE
    }
}

/// Base lifespan and meal extension distributions, `samples` rolls per seed.
#[must_use]
pub fn lifespan_distribution(seeds: &[u64], samples: usize) -> LifespanBalance {
    let rolls: Vec<(f64, f64)> = seeds
        .par_iter()
        .flat_map_iter(|&seed| {
            let mut rng = RngSource::new(ChaCha20Rng::seed_from_u64(stream_seed(seed, 0x11FE)));
            (0..samples)
                .map(|_| {
                    let base = roll_base_lifespan(&mut rng);
                    (base, roll_meal_lifespan_extension(&mut rng))
                })
                .collect::<Vec<_>>()
        })
        .collect();

    let count = u32::try_from(rolls.len()).unwrap_or(u32::MAX).max(1);
    let (base_sum, meal_sum) = rolls
        .iter()
        .fold((0.0, 0.0), |(b, m), (base, meal)| (b + base, m + meal));
    LifespanBalance {
        samples: rolls.len(),
        mean_base_days: base_sum / f64::from(count),
        min_base_days: rolls.iter().map(|r| r.0).fold(f64::INFINITY, f64::min),
        max_base_days: rolls.iter().map(|r| r.0).fold(f64::NEG_INFINITY, f64::max),
        mean_meal_extension_days: meal_sum / f64::from(count),
    }
}

/// Every strategy against every seed.
pub fn strategy_sweep(data: &GameData, seeds: &[u64], days: u32) -> Result<Vec<SimulationSummary>> {
    let jobs: Vec<(TrainingStrategy, u64)> = TrainingStrategy::ALL
        .into_iter()
        .flat_map(|strategy| seeds.iter().map(move |&seed| (strategy, seed)))
        .collect();
    jobs.par_iter()
        .map(|&(strategy, seed)| {
            Simulation::new(data, SimulationConfig::new(strategy, seed).with_days(days)).run()
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyAggregate {
    pub strategy: String,
    pub runs: usize,
    pub mean_generation: f64,
    pub mean_evolutions: f64,
    pub max_stage: u8,
    pub win_rate: f64,
    pub neglect_deaths: usize,
    pub violations: usize,
}

#[must_use]
pub fn aggregate_strategies(summaries: &[SimulationSummary]) -> Vec<StrategyAggregate> {
    TrainingStrategy::ALL
        .into_iter()
        .filter_map(|strategy| {
            let runs: Vec<&SimulationSummary> = summaries
                .iter()
                .filter(|s| s.strategy == strategy.label())
                .collect();
            if runs.is_empty() {
                return None;
            }
            let n = f64::from(u32::try_from(runs.len()).unwrap_or(u32::MAX));
            let generations: u32 = runs.iter().map(|s| s.generation).sum();
            let evolutions: usize = runs.iter().map(|s| s.evolutions.len()).sum();
            let wins: u32 = runs.iter().map(|s| s.wins).sum();
            let fights: u32 = runs.iter().map(|s| s.wins + s.losses).sum();
            Some(StrategyAggregate {
                strategy: strategy.label().to_string(),
                runs: runs.len(),
                mean_generation: f64::from(generations) / n,
                mean_evolutions: f64::from(u32::try_from(evolutions).unwrap_or(u32::MAX)) / n,
                max_stage: runs.iter().map(|s| s.max_stage).max().unwrap_or(1),
                win_rate: if fights == 0 {
                    0.0
                } else {
                    f64::from(wins) / f64::from(fights)
                },
                neglect_deaths: runs
                    .iter()
                    .flat_map(|s| &s.deaths)
                    .filter(|cause| matches!(cause, pedalmon_game::DeathCause::Neglect))
                    .count(),
                violations: runs.iter().map(|s| s.violations.len()).sum(),
            })
        })
        .collect()
}

/// Fail on any boss outside the band or a drifted lifespan mean.
pub fn validate_balance_targets(
    bosses: &[BossBalance],
    lifespan: Option<&LifespanBalance>,
) -> Result<()> {
    let outliers: Vec<String> = bosses
        .iter()
        .filter(|b| !b.within_band())
        .map(|b| format!("world {} ({}) at {:.1}%", b.world, b.boss, b.win_rate * 100.0))
        .collect();
    if !outliers.is_empty() {
        bail!(
            "boss win rate outside {:.0}%..{:.0}%: {}",
            BOSS_WIN_RATE_BAND.0 * 100.0,
            BOSS_WIN_RATE_BAND.1 * 100.0,
            outliers.join(", ")
        );
    }
    if let Some(lifespan) = lifespan
        && !lifespan.within_tolerance()
    {
        bail!(
            "mean base lifespan {:.2} days drifted from {EXPECTED_MEAN_LIFESPAN}",
            lifespan.mean_base_days
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boss_rates_stay_in_band() {
        let data = GameData::embedded();
        let reports = boss_win_rates(data, &[1, 2, 3, 4], 250).unwrap();
        assert_eq!(reports.len(), 3);
        for report in &reports {
            assert_eq!(report.samples, 1_000);
            assert!(report.within_band(), "{report:?}");
        }
        validate_balance_targets(&reports, None).unwrap();
    }

    #[test]
    fn sweeps_are_seed_deterministic() {
        let data = GameData::embedded();
        let a = boss_win_rates(data, &[9], 50).unwrap();
        let b = boss_win_rates(data, &[9], 50).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn lifespan_mean_matches_buckets() {
        let report = lifespan_distribution(&[1, 2], 2_000);
        assert_eq!(report.samples, 4_000);
        assert!(report.within_tolerance(), "{report:?}");
        assert!(report.min_base_days >= 5.0 && report.max_base_days <= 20.0);
    }

    #[test]
    fn validation_flags_outliers() {
        let report = BossBalance {
            world: 1,
            boss: "Lock Keeper".to_string(),
            samples: 10,
            wins: 9,
            timeouts: 0,
            win_rate: 0.9,
            mean_turns: 4.0,
        };
        let err = validate_balance_targets(&[report], None).unwrap_err();
        assert!(err.to_string().contains("world 1"));
    }

    #[test]
    fn aggregates_group_by_strategy() {
        let data = GameData::embedded();
        let summaries = strategy_sweep(data, &[5], 10).unwrap();
        assert_eq!(summaries.len(), TrainingStrategy::ALL.len());
        let aggregates = aggregate_strategies(&summaries);
        assert_eq!(aggregates.len(), 4);
        assert!(aggregates.iter().all(|a| a.runs == 1 && a.violations == 0));
    }
}
