use std::collections::VecDeque;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use pedalmon_game::{
    DeathCause, EncounterOutcome, Evolution, FitnessProvider, FitnessSummary, GameData,
    MemoryBonus, Session, TrainingOutcome, WorkoutSummary, calendar_day_for,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;

use crate::logic::policy::TrainingStrategy;

const CTL_TIME_CONSTANT: f64 = 42.0;
const ATL_TIME_CONSTANT: f64 = 7.0;
const RECENT_RIDES: usize = 3;
const OUTAGE_CHANCE: f64 = 0.03;
const MEALS_PER_DAY: i64 = 3;
/// Day cap per requested generation when running to a generation target.
const DAYS_PER_GENERATION_CAP: u32 = 30;

/// Configuration for a simulated player.
#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    pub seed: u64,
    pub strategy: TrainingStrategy,
    pub days: u32,
    pub starter: Option<&'static str>,
    /// Feed and play every day; `false` abandons the creature after day one.
    pub attentive: bool,
    /// Stop once this many creatures have died.
    pub generation_target: Option<u32>,
}

impl SimulationConfig {
    #[must_use]
    pub fn new(strategy: TrainingStrategy, seed: u64) -> Self {
        Self {
            seed,
            strategy,
            days: 60,
            starter: None,
            attentive: true,
            generation_target: None,
        }
    }

    #[must_use]
    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    #[must_use]
    pub fn with_starter(mut self, starter: &'static str) -> Self {
        self.starter = Some(starter);
        self
    }

    /// Play until `deaths` creatures have died, bounded by a generous day cap.
    #[must_use]
    pub fn with_generation_target(mut self, deaths: u32) -> Self {
        self.generation_target = Some(deaths);
        self.days = deaths.saturating_mul(DAYS_PER_GENERATION_CAP);
        self
    }

    #[must_use]
    pub fn neglectful(mut self) -> Self {
        self.attentive = false;
        self
    }
}

/// Fitness provider driven by a simple impulse-response load model.
///
/// Every day is pre-rolled in [`SimulatedRider::prepare_day`], so the
/// provider calls themselves are pure reads.
pub struct SimulatedRider {
    rng: ChaCha20Rng,
    strategy: TrainingStrategy,
    ctl: f64,
    atl: f64,
    steps: u32,
    rides: VecDeque<WorkoutSummary>,
    outage: [bool; 3],
}

impl SimulatedRider {
    #[must_use]
    pub fn new(seed: u64, strategy: TrainingStrategy) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            strategy,
            ctl: 45.0,
            atl: 45.0,
            steps: 0,
            rides: VecDeque::new(),
            outage: [false; 3],
        }
    }

    fn intensity(&self) -> f64 {
        match self.strategy {
            TrainingStrategy::Balanced => 0.75,
            TrainingStrategy::Endurance => 0.65,
            TrainingStrategy::Tempo => 0.85,
            TrainingStrategy::Power => 0.8,
        }
    }

    pub fn prepare_day(&mut self, day: NaiveDate) {
        let mut load = 0.0;
        if self.rng.gen_bool(0.85) {
            let minutes = f64::from(self.rng.gen_range(45_u32..=150));
            let intensity = self.intensity();
            load = minutes / 60.0 * intensity * intensity * 100.0;
            self.rides.push_back(WorkoutSummary {
                date: day,
                name: format!("{} ride", self.strategy),
                load,
                intensity_factor: intensity,
                zone_seconds: self.strategy.zone_profile(minutes),
                distance_km: minutes / 60.0 * self.rng.gen_range(24.0..32.0),
                elevation_gain_m: self.rng.gen_range(50.0..900.0),
            });
            while self.rides.len() > RECENT_RIDES {
                self.rides.pop_front();
            }
        }
        self.ctl += (load - self.ctl) / CTL_TIME_CONSTANT;
        self.atl += (load - self.atl) / ATL_TIME_CONSTANT;
        self.steps = self.rng.gen_range(3_000..14_000);
        for slot in &mut self.outage {
            *slot = self.rng.gen_bool(OUTAGE_CHANCE);
        }
    }
}

impl FitnessProvider for SimulatedRider {
    type Error = String;

    fn fitness_summary(&mut self) -> Result<FitnessSummary, String> {
        if self.outage[0] {
            return Err("summary endpoint timed out".to_string());
        }
        Ok(FitnessSummary {
            ctl: self.ctl,
            atl: self.atl,
            tsb: self.ctl - self.atl,
            weekly_load: self.atl * 7.0,
            ftp: 250.0,
        })
    }

    fn recent_workouts(&mut self) -> Result<Vec<WorkoutSummary>, String> {
        if self.outage[1] {
            return Err("activity list unavailable".to_string());
        }
        Ok(self.rides.iter().cloned().collect())
    }

    fn daily_steps(&mut self, _day: NaiveDate) -> Result<u32, String> {
        if self.outage[2] {
            return Err("step counter not synced".to_string());
        }
        Ok(self.steps)
    }
}

/// Everything a simulated run is judged on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: String,
    pub days_played: u32,
    pub generation: u32,
    pub deaths: Vec<DeathCause>,
    /// Generation number of each creature that died, in order.
    pub ended_generations: Vec<u32>,
    /// Memory bonus handed to each successor.
    pub memories: Vec<MemoryBonus>,
    pub evolutions: Vec<Evolution>,
    pub max_stage: u8,
    pub final_species: String,
    pub training_sessions: u32,
    pub wins: u32,
    pub losses: u32,
    pub bosses_defeated: Vec<u32>,
    pub provider_fallbacks: u32,
    pub violations: Vec<String>,
    pub draws: u64,
}

/// Deterministic daily loop over one [`Session`].
pub struct Simulation<'d> {
    data: &'d GameData,
    config: SimulationConfig,
}

impl<'d> Simulation<'d> {
    #[must_use]
    pub const fn new(data: &'d GameData, config: SimulationConfig) -> Self {
        Self { data, config }
    }

    fn start() -> Result<DateTime<Utc>> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .context("simulation start instant")
    }

    pub fn run(&self) -> Result<SimulationSummary> {
        let start = Self::start()?;
        let mut session = Session::new(
            self.data,
            "Simmy",
            self.config.starter,
            self.config.seed,
            start,
        )?;
        let mut rider = SimulatedRider::new(self.config.seed, self.config.strategy);
        let mut summary = SimulationSummary {
            seed: self.config.seed,
            strategy: self.config.strategy.label().to_string(),
            days_played: 0,
            generation: 1,
            deaths: Vec::new(),
            ended_generations: Vec::new(),
            memories: Vec::new(),
            evolutions: Vec::new(),
            max_stage: 1,
            final_species: session.creature.species.clone(),
            training_sessions: 0,
            wins: 0,
            losses: 0,
            bosses_defeated: Vec::new(),
            provider_fallbacks: 0,
            violations: Vec::new(),
            draws: 0,
        };

        'days: for day in 0..i64::from(self.config.days) {
            let morning = start + Duration::days(day) + Duration::hours(1);
            if self.config.attentive || day == 0 {
                self.play_day(&mut session, &mut rider, morning, &mut summary)?;
            }
            for hour in [6, 12, 18, 24] {
                let report = session.tick(morning + Duration::hours(hour))?;
                if let Some(change) = report.succession {
                    log::debug!(
                        "seed {} day {day}: generation {} died ({:?})",
                        self.config.seed,
                        change.previous_generation,
                        change.cause
                    );
                    if session.creature.generation != change.previous_generation + 1 {
                        summary.violations.push(format!(
                            "generation {} succeeded by {}",
                            change.previous_generation, session.creature.generation
                        ));
                    }
                    summary.deaths.push(change.cause);
                    summary.ended_generations.push(change.previous_generation);
                    summary.memories.extend(change.memory);
                }
                self.check_invariants(&session, &mut summary);
            }
            summary.days_played += 1;
            if let Some(target) = self.config.generation_target
                && u32::try_from(summary.deaths.len()).unwrap_or(u32::MAX) >= target
            {
                break 'days;
            }
        }

        summary.generation = session.creature.generation;
        summary.final_species = session.creature.species.clone();
        summary.draws = session.draws();
        Ok(summary)
    }

    fn play_day(
        &self,
        session: &mut Session<'_>,
        rider: &mut SimulatedRider,
        morning: DateTime<Utc>,
        summary: &mut SimulationSummary,
    ) -> Result<()> {
        let strategy = self.config.strategy;
        rider.prepare_day(calendar_day_for(morning, session.boundary()));
        let (report, _) = session.sync(rider, morning);
        summary.provider_fallbacks += u32::from(report.summary_defaulted)
            + u32::from(report.steps_defaulted)
            + u32::from(report.workouts_failed);

        let base = session.ledger.base;
        session.ledger.split_base(strategy.split_base(base));

        // Breakfast before training so the sessions count as fed.
        session.feed(morning);

        'training: loop {
            for program in strategy.program_order() {
                match session.train(program, morning)? {
                    TrainingOutcome::Trained { evolution, .. } => {
                        summary.training_sessions += 1;
                        self.record_evolution(evolution, summary);
                        continue 'training;
                    }
                    TrainingOutcome::CannotAfford => {}
                    TrainingOutcome::NotAlive => break 'training,
                }
            }
            break;
        }

        let frontier = self
            .data
            .worlds
            .available(&session.worlds)
            .last()
            .copied()
            .unwrap_or(1);
        if let EncounterOutcome::Fought(report) = session.fight_boss(frontier, morning)? {
            self.record_fight(report.reward.won, report.evolution, summary);
            if report.reward.won {
                summary.bosses_defeated.push(frontier);
            }
        }
        while let EncounterOutcome::Fought(report) = session.fight_wild(frontier, morning)? {
            self.record_fight(report.reward.won, report.evolution, summary);
        }
        for meal in 1..MEALS_PER_DAY {
            session.feed(morning + Duration::hours(meal * 4));
        }
        self.check_invariants(session, summary);
        Ok(())
    }

    fn record_fight(&self, won: bool, evolution: Option<Evolution>, summary: &mut SimulationSummary) {
        if won {
            summary.wins += 1;
        } else {
            summary.losses += 1;
        }
        self.record_evolution(evolution, summary);
    }

    fn record_evolution(&self, evolution: Option<Evolution>, summary: &mut SimulationSummary) {
        let Some(evolution) = evolution else {
            return;
        };
        match (
            self.data.species.get(&evolution.from),
            self.data.species.get(&evolution.to),
        ) {
            (Ok(from), Ok(to)) => {
                if to.stage <= from.stage {
                    summary.violations.push(format!(
                        "evolution {} -> {} does not raise the stage",
                        evolution.from, evolution.to
                    ));
                }
                if from.target_for(evolution.branch).map(|t| t.species.as_str())
                    != Some(evolution.to.as_str())
                {
                    summary.violations.push(format!(
                        "evolution {} -> {} is not listed under branch {}",
                        evolution.from, evolution.to, evolution.branch
                    ));
                }
                summary.max_stage = summary.max_stage.max(to.stage);
            }
            _ => summary
                .violations
                .push(format!("evolution names unknown species: {evolution:?}")),
        }
        summary.evolutions.push(evolution);
    }

    fn check_invariants(&self, session: &Session<'_>, summary: &mut SimulationSummary) {
        let creature = &session.creature;
        let Ok(def) = self.data.species.get(&creature.species) else {
            summary
                .violations
                .push(format!("unknown species {}", creature.species));
            return;
        };
        let stats = creature.stats;
        if stats.max_hp > def.caps.max_hp || stats.atk > def.caps.atk || stats.def > def.caps.def {
            summary.violations.push(format!(
                "{} stats {:?} exceed caps {:?}",
                creature.species, stats, def.caps
            ));
        }
        if !(0.0..=100.0).contains(&creature.discipline) {
            summary
                .violations
                .push(format!("discipline out of range: {}", creature.discipline));
        }
        if creature.current_hp < 0.0 || creature.current_hp > creature.effective_max_hp() {
            summary
                .violations
                .push(format!("hp out of range: {}", creature.current_hp));
        }
        if !creature.alive {
            summary
                .violations
                .push("dead creature was not replaced".to_string());
        }
    }
}
