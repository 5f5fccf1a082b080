use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use super::ScenarioResult;
use super::balance::{BossBalance, LifespanBalance, StrategyAggregate};
use super::simulation::SimulationSummary;
use crate::util::fraction;

/// Balance sweep output shown alongside scenario results.
#[derive(Debug, Clone, Default)]
pub struct BalanceSummary {
    pub bosses: Vec<BossBalance>,
    pub lifespan: Option<LifespanBalance>,
    pub strategies: Vec<StrategyAggregate>,
}

pub fn generate_console_report<W: Write>(
    out: &mut W,
    results: &[ScenarioResult],
    balance: Option<&BalanceSummary>,
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Logic Test Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==============================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "Total scenarios: {total_tests}")?;
    writeln!(out, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(out, "Failed: {}", failed_tests.to_string().red())?;
    let success_rate = fraction(passed_tests, total_tests) * 100.0;
    writeln!(out, "Success rate: {success_rate:.1}%")?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };
        writeln!(out, "{} {} (seed {})", status, result.scenario_name.bold(), result.seed)?;
        writeln!(
            out,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;
        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    if let (Some(fastest), Some(slowest)) = (
        results.iter().min_by_key(|r| r.average_duration),
        results.iter().max_by_key(|r| r.average_duration),
    ) {
        writeln!(out, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "=====================".yellow())?;
        writeln!(
            out,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.average_duration
        )?;
        writeln!(
            out,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.average_duration
        )?;
        writeln!(out)?;
    }

    match balance {
        Some(balance) => write_balance_console(out, balance)?,
        None => writeln!(out, "Balance data unavailable.")?,
    }
    Ok(())
}

fn write_balance_console<W: Write>(out: &mut W, balance: &BalanceSummary) -> Result<()> {
    writeln!(out, "{}", "⚖️  Balance Summary".bright_magenta().bold())?;
    writeln!(out, "{}", "==================".magenta())?;
    for boss in &balance.bosses {
        let rate = format!("{:.1}%", boss.win_rate * 100.0);
        let rate = if boss.within_band() {
            rate.green()
        } else {
            rate.red()
        };
        writeln!(
            out,
            "World {} {:<14} win {rate} over {} fights, {:.1} turns avg, {} timeouts",
            boss.world, boss.boss, boss.samples, boss.mean_turns, boss.timeouts
        )?;
    }
    if let Some(lifespan) = &balance.lifespan {
        writeln!(
            out,
            "Lifespan: mean {:.2} days (min {:.2}, max {:.2}) over {} rolls; meal +{:.3} days",
            lifespan.mean_base_days,
            lifespan.min_base_days,
            lifespan.max_base_days,
            lifespan.samples,
            lifespan.mean_meal_extension_days
        )?;
    }
    for strategy in &balance.strategies {
        writeln!(
            out,
            "{:<10} runs {:>3}  gen {:.2}  evolutions {:.2}  stage ≤{}  win {:.1}%  neglect {}  violations {}",
            strategy.strategy,
            strategy.runs,
            strategy.mean_generation,
            strategy.mean_evolutions,
            strategy.max_stage,
            strategy.win_rate * 100.0,
            strategy.neglect_deaths,
            strategy.violations
        )?;
    }
    Ok(())
}

pub fn generate_json_report<W: Write>(out: &mut W, results: &[ScenarioResult]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report<W: Write>(out: &mut W, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "# PedalMon Logic Test Results\n")?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total scenarios**: {total_tests}")?;
    writeln!(out, "- **Passed**: {passed_tests}")?;
    writeln!(out, "- **Failed**: {failed_tests}")?;
    let success_rate = fraction(passed_tests, total_tests) * 100.0;
    writeln!(out, "- **Success rate**: {success_rate:.1}%\n")?;

    writeln!(out, "## Detailed Results\n")?;
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };
        writeln!(out, "### {} {} (seed {})\n", status, result.scenario_name, result.seed)?;
        writeln!(
            out,
            "- **Iterations**: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "- **Average time**: {:?}", result.average_duration)?;
        if !result.failures.is_empty() {
            writeln!(out, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(out, "  - {failure}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

/// One row per simulated run.
pub fn generate_csv_report<W: Write>(out: &mut W, runs: &[SimulationSummary]) -> Result<()> {
    writeln!(
        out,
        "seed,strategy,days,generation,evolutions,max_stage,final_species,wins,losses,bosses,fallbacks,violations"
    )?;
    for run in runs {
        let bosses: Vec<String> = run.bosses_defeated.iter().map(u32::to_string).collect();
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{}",
            run.seed,
            run.strategy,
            run.days_played,
            run.generation,
            run.evolutions.len(),
            run.max_stage,
            run.final_species,
            run.wins,
            run.losses,
            bosses.join("|"),
            run.provider_fallbacks,
            run.violations.len()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "Smoke".to_string(),
            seed: 7,
            passed,
            iterations_run: 2,
            successful_iterations: if passed { 2 } else { 1 },
            failures: if passed {
                Vec::new()
            } else {
                vec!["Iteration 2 (seed 8): boom".to_string()]
            },
            average_duration: Duration::from_millis(3),
            performance_data: vec![Duration::from_millis(3)],
        }
    }

    #[test]
    fn markdown_lists_failures() {
        let mut buf = Vec::new();
        generate_markdown_report(&mut buf, &[sample_result(false)]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("# PedalMon Logic Test Results"));
        assert!(text.contains("boom"));
        assert!(text.contains("**Failed**: 1"));
    }

    #[test]
    fn console_without_balance_says_so() {
        let mut buf = Vec::new();
        generate_console_report(&mut buf, &[sample_result(true)], None, Duration::ZERO).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Balance data unavailable"));
        assert!(text.contains("Smoke"));
    }

    #[test]
    fn console_prints_balance_rows() {
        let balance = BalanceSummary {
            bosses: vec![BossBalance {
                world: 2,
                boss: "Summit Warden".to_string(),
                samples: 100,
                wins: 40,
                timeouts: 0,
                win_rate: 0.4,
                mean_turns: 6.5,
            }],
            lifespan: None,
            strategies: Vec::new(),
        };
        let mut buf = Vec::new();
        generate_console_report(&mut buf, &[], Some(&balance), Duration::ZERO).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Balance Summary"));
        assert!(text.contains("Summit Warden"));
    }

    #[test]
    fn csv_has_header_and_rows() {
        let run = SimulationSummary {
            seed: 3,
            strategy: "Tempo".to_string(),
            days_played: 10,
            generation: 1,
            deaths: Vec::new(),
            ended_generations: Vec::new(),
            memories: Vec::new(),
            evolutions: Vec::new(),
            max_stage: 2,
            final_species: "shellgear".to_string(),
            training_sessions: 40,
            wins: 5,
            losses: 1,
            bosses_defeated: vec![1],
            provider_fallbacks: 0,
            violations: Vec::new(),
            draws: 900,
        };
        let mut buf = Vec::new();
        generate_csv_report(&mut buf, &[run]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("seed,strategy,days"));
        assert!(text.contains("3,Tempo,10,1,0,2,shellgear,5,1,1,0,0"));
    }
}
