use anyhow::{Context, Result, bail, ensure};
use chrono::{Duration, TimeZone, Utc};
use pedalmon_game::numbers::floor_f64_to_u32;
use pedalmon_game::{
    DeathCause, EncounterOutcome, GameData, MemoryBonus, Session, TrainingOutcome, TrainingPoints,
};
use rayon::prelude::*;

use crate::logic::balance::{
    boss_win_rates, lifespan_distribution, validate_balance_targets,
};
use crate::logic::policy::TrainingStrategy;
use crate::logic::simulation::{Simulation, SimulationConfig};

const GENERATION_RUN_LENGTH: u32 = 50;

/// Inputs handed to every scenario check.
pub struct ScenarioCtx<'a> {
    pub data: &'a GameData,
    pub seed: u64,
    pub verbose: bool,
}

pub type ScenarioCheck = fn(&ScenarioCtx<'_>) -> Result<()>;

pub struct TestScenario {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub check: ScenarioCheck,
}

const CATALOG: &[TestScenario] = &[
    TestScenario {
        key: "smoke",
        name: "Smoke",
        description: "Create a creature, feed, train and fight once",
        check: smoke,
    },
    TestScenario {
        key: "campaign",
        name: "Campaign",
        description: "Sixty simulated days with every invariant checked",
        check: campaign,
    },
    TestScenario {
        key: "generations",
        name: "Generations",
        description: "Fifty generations per strategy with bounded memory bonuses",
        check: generations,
    },
    TestScenario {
        key: "branching",
        name: "Branching",
        description: "Each strategy evolves cogling along the branch it trains",
        check: branching,
    },
    TestScenario {
        key: "neglect",
        name: "Neglect",
        description: "An abandoned creature dies of neglect within three days",
        check: neglect,
    },
    TestScenario {
        key: "determinism",
        name: "Determinism",
        description: "Equal seeds replay identical runs",
        check: determinism,
    },
    TestScenario {
        key: "boss-winrate",
        name: "Boss Win Rate",
        description: "Recommended stats beat each boss 25-55% of the time",
        check: boss_winrate,
    },
    TestScenario {
        key: "lifespan",
        name: "Lifespan",
        description: "Base lifespan rolls average about 9.3 days",
        check: lifespan,
    },
];

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    CATALOG.iter().map(|s| (s.key, s.description)).collect()
}

#[must_use]
pub fn scenario_keys() -> Vec<String> {
    CATALOG.iter().map(|s| s.key.to_string()).collect()
}

#[must_use]
pub fn get_scenario(key: &str) -> Option<&'static TestScenario> {
    CATALOG.iter().find(|s| s.key.eq_ignore_ascii_case(key))
}

fn smoke(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let now = Utc
        .with_ymd_and_hms(2024, 7, 1, 1, 0, 0)
        .single()
        .context("smoke start")?;
    let mut session = Session::new(ctx.data, "Smoke", None, ctx.seed, now)?;
    session.ledger.training = TrainingPoints::new(6, 6, 6);
    session.ledger.credit_walk(10);
    session.feed(now);

    let outcome = session.train("brick", now)?;
    ensure!(
        matches!(outcome, TrainingOutcome::Trained { .. }),
        "brick should be affordable, got {outcome:?}"
    );
    ensure!(session.creature.totals.low == 2, "channel totals not accumulated");

    let fight = session.fight_wild(1, now)?;
    let EncounterOutcome::Fought(report) = fight else {
        bail!("expected a wild fight, got {fight:?}");
    };
    ensure!(!report.battle.turns.is_empty(), "battle log is empty");
    ensure!(session.ledger.walk == 0, "encounter cost not paid");
    Ok(())
}

fn campaign(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let config = SimulationConfig::new(TrainingStrategy::Balanced, ctx.seed).with_days(60);
    let summary = Simulation::new(ctx.data, config).run()?;
    ensure!(
        summary.violations.is_empty(),
        "invariant violations: {}",
        summary.violations.join("; ")
    );
    ensure!(!summary.evolutions.is_empty(), "no evolution in 60 days");
    ensure!(summary.wins > 0, "never won a fight");
    if ctx.verbose {
        println!(
            "     ↳ generation {} stage {} wins {} losses {} bosses {:?}",
            summary.generation, summary.max_stage, summary.wins, summary.losses,
            summary.bosses_defeated
        );
    }
    Ok(())
}

/// Memory converges to a quarter of the largest cap: `m = 0.2 * (cap + m)`.
fn memory_ceiling(data: &GameData) -> MemoryBonus {
    let quarter = |cap: f64| floor_f64_to_u32(cap / 4.0);
    data.species.iter().fold(MemoryBonus::default(), |ceiling, def| MemoryBonus {
        hp: ceiling.hp.max(quarter(def.caps.max_hp)),
        atk: ceiling.atk.max(quarter(def.caps.atk)),
        def: ceiling.def.max(quarter(def.caps.def)),
    })
}

fn generations(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let ceiling = memory_ceiling(ctx.data);
    let runs = TrainingStrategy::ALL
        .par_iter()
        .map(|&strategy| {
            let config = SimulationConfig::new(strategy, ctx.seed)
                .with_generation_target(GENERATION_RUN_LENGTH);
            Simulation::new(ctx.data, config).run()
        })
        .collect::<Result<Vec<_>>>()?;

    for summary in &runs {
        let strategy = &summary.strategy;
        ensure!(
            summary.violations.is_empty(),
            "{strategy}: {}",
            summary.violations.join("; ")
        );
        ensure!(
            u32::try_from(summary.deaths.len()).ok() == Some(GENERATION_RUN_LENGTH),
            "{strategy}: {} deaths in {} days",
            summary.deaths.len(),
            summary.days_played
        );
        ensure!(
            summary
                .deaths
                .iter()
                .all(|cause| *cause == DeathCause::OldAge),
            "{strategy}: attentive player lost a creature to neglect"
        );
        let expected: Vec<u32> = (1..=GENERATION_RUN_LENGTH).collect();
        ensure!(
            summary.ended_generations == expected,
            "{strategy}: generations ended out of order: {:?}",
            summary.ended_generations
        );
        ensure!(
            summary.generation == GENERATION_RUN_LENGTH + 1,
            "{strategy}: finished on generation {}",
            summary.generation
        );
        if let Some(memory) = summary.memories.iter().find(|m| {
            m.hp > ceiling.hp || m.atk > ceiling.atk || m.def > ceiling.def
        }) {
            bail!("{strategy}: memory {memory:?} above ceiling {ceiling:?}");
        }
        if ctx.verbose {
            let last = summary.memories.last().copied().unwrap_or_default();
            println!(
                "     ↳ {strategy}: {} days, final memory {}/{}/{}, stage ≤{}",
                summary.days_played, last.hp, last.atk, last.def, summary.max_stage
            );
        }
    }
    Ok(())
}

fn branching(ctx: &ScenarioCtx<'_>) -> Result<()> {
    for strategy in TrainingStrategy::ALL {
        let config = SimulationConfig::new(strategy, ctx.seed)
            .with_days(40)
            .with_starter("cogling");
        let summary = Simulation::new(ctx.data, config).run()?;
        ensure!(
            summary.violations.is_empty(),
            "{strategy}: {}",
            summary.violations.join("; ")
        );
        let first = summary
            .evolutions
            .first()
            .with_context(|| format!("{strategy}: cogling never evolved"))?;
        ensure!(
            first.branch == strategy.expected_branch(),
            "{strategy}: evolved {} -> {} via {}, expected {}",
            first.from,
            first.to,
            first.branch,
            strategy.expected_branch()
        );
        if ctx.verbose {
            let path: Vec<String> = summary
                .evolutions
                .iter()
                .map(|e| format!("{}->{} ({})", e.from, e.to, e.branch))
                .collect();
            println!("     ↳ {strategy}: {}", path.join(", "));
        }
    }
    Ok(())
}

fn neglect(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let config = SimulationConfig::new(TrainingStrategy::Balanced, ctx.seed)
        .with_days(3)
        .neglectful();
    let summary = Simulation::new(ctx.data, config).run()?;
    ensure!(
        summary.deaths.first() == Some(&DeathCause::Neglect),
        "expected a neglect death, got {:?}",
        summary.deaths
    );
    let now = Utc
        .with_ymd_and_hms(2024, 7, 1, 1, 0, 0)
        .single()
        .context("neglect start")?;
    let mut session = Session::new(ctx.data, "Lonely", None, ctx.seed, now)?;
    let report = session.tick(now + Duration::hours(47))?;
    ensure!(report.succession.is_none(), "died before 48 hours");
    Ok(())
}

fn determinism(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let config = SimulationConfig::new(TrainingStrategy::Power, ctx.seed).with_days(30);
    let first = Simulation::new(ctx.data, config).run()?;
    let second = Simulation::new(ctx.data, config).run()?;
    ensure!(first == second, "seed {} replayed differently", ctx.seed);
    Ok(())
}

fn boss_winrate(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let reports = boss_win_rates(ctx.data, &[ctx.seed], 400)?;
    if ctx.verbose {
        for report in &reports {
            println!(
                "     ↳ world {} {}: {:.1}%",
                report.world,
                report.boss,
                report.win_rate * 100.0
            );
        }
    }
    validate_balance_targets(&reports, None)
}

fn lifespan(ctx: &ScenarioCtx<'_>) -> Result<()> {
    let report = lifespan_distribution(&[ctx.seed], 2_000);
    validate_balance_targets(&[], Some(&report))
}
