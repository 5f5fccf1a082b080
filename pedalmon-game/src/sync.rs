//! Boundary with external fitness providers.
//!
//! Providers are the host's concern. This module fixes the shape the engine
//! expects, derives stable workout ids, and folds one sync round into a
//! [`PointLedger`], substituting defaults for any provider that fails.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::{DEFAULT_CTL, DEFAULT_STEPS, DEFAULT_TSB, ZONE_COUNT};
use crate::conversion::{DailyPoints, WorkoutPoints, daily_points, walk_points, workout_points};
use crate::day::{DayBoundary, calendar_day_for};
use crate::points::PointLedger;

const WORKOUT_ID_HEX_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessSummary {
    pub ctl: f64,
    pub atl: f64,
    pub tsb: f64,
    pub weekly_load: f64,
    pub ftp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub date: NaiveDate,
    pub name: String,
    pub load: f64,
    pub intensity_factor: f64,
    pub zone_seconds: [f64; ZONE_COUNT],
    pub distance_km: f64,
    pub elevation_gain_m: f64,
}

impl WorkoutSummary {
    #[must_use]
    pub fn id(&self) -> String {
        workout_id(self.date, &self.name, self.load)
    }
}

/// Source of already-fetched fitness data. Failures are reported, not retried.
pub trait FitnessProvider {
    type Error: std::fmt::Display;

    /// # Errors
    ///
    /// Provider-specific failure; the caller substitutes defaults.
    fn fitness_summary(&mut self) -> Result<FitnessSummary, Self::Error>;

    /// # Errors
    ///
    /// Provider-specific failure; the caller skips workouts for this round.
    fn recent_workouts(&mut self) -> Result<Vec<WorkoutSummary>, Self::Error>;

    /// # Errors
    ///
    /// Provider-specific failure; the caller substitutes defaults.
    fn daily_steps(&mut self, day: NaiveDate) -> Result<u32, Self::Error>;
}

/// First 16 hex chars of SHA-256 over `"{date}|{name}|{load:.1}"`.
#[must_use]
pub fn workout_id(date: NaiveDate, name: &str, load: f64) -> String {
    let digest = Sha256::digest(format!("{date}|{name}|{load:.1}").as_bytes());
    digest
        .iter()
        .take(WORKOUT_ID_HEX_LEN / 2)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Everything one sync round produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub day: NaiveDate,
    pub daily: DailyPoints,
    /// Base points this round added on top of earlier syncs that day.
    pub base_credited: u32,
    pub workouts: Vec<WorkoutPoints>,
    pub walk_points: u32,
    pub summary_defaulted: bool,
    pub steps_defaulted: bool,
    pub workouts_failed: bool,
}

/// One sync round against a provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct DailySync {
    pub boundary: DayBoundary,
}

impl DailySync {
    #[must_use]
    pub const fn new(boundary: DayBoundary) -> Self {
        Self { boundary }
    }

    /// Pull from `provider` and credit `ledger`.
    ///
    /// The daily grant and step walk points track the best reading of the
    /// day, so a later sync pays out only what earlier ones missed. Workouts
    /// already in the ledger are skipped; newly credited workouts dated today
    /// add their distance to the walk points.
    pub fn run<P: FitnessProvider>(
        &self,
        provider: &mut P,
        ledger: &mut PointLedger,
        now: DateTime<Utc>,
    ) -> SyncReport {
        let day = calendar_day_for(now, self.boundary);

        let (ctl, tsb, summary_defaulted) = match provider.fitness_summary() {
            Ok(summary) => (summary.ctl, summary.tsb, false),
            Err(err) => {
                log::warn!("fitness summary unavailable, using defaults: {err}");
                (DEFAULT_CTL, DEFAULT_TSB, true)
            }
        };
        let (steps, steps_defaulted) = match provider.daily_steps(day) {
            Ok(steps) => (steps, false),
            Err(err) => {
                log::warn!("step count unavailable, using {DEFAULT_STEPS}: {err}");
                (DEFAULT_STEPS, true)
            }
        };
        let (recent, workouts_failed) = match provider.recent_workouts() {
            Ok(list) => (list, false),
            Err(err) => {
                log::warn!("recent workouts unavailable: {err}");
                (Vec::new(), true)
            }
        };

        let daily = daily_points(ctl, tsb, steps);
        let base_credited = ledger.credit_daily(&daily, day);

        let mut workouts = Vec::new();
        let mut distance_today = 0.0;
        for summary in &recent {
            let points = workout_points(summary.id(), &summary.zone_seconds, summary.load);
            if ledger.credit_workout(&points) {
                if summary.date == day {
                    distance_today += summary.distance_km.max(0.0);
                }
                workouts.push(points);
            }
        }

        let from_distance = walk_points(0, distance_today);
        ledger.credit_walk(from_distance);
        let walk = ledger.credit_steps(steps, day) + from_distance;

        SyncReport {
            day,
            daily,
            base_credited,
            workouts,
            walk_points: walk,
            summary_defaulted,
            steps_defaulted,
            workouts_failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::points::TrainingPoints;
    use chrono::TimeZone;

    struct FakeProvider {
        summary: Option<FitnessSummary>,
        steps: Option<u32>,
        workouts: Option<Vec<WorkoutSummary>>,
    }

    impl FitnessProvider for FakeProvider {
        type Error = String;

        fn fitness_summary(&mut self) -> Result<FitnessSummary, String> {
            self.summary.ok_or_else(|| "offline".to_string())
        }

        fn recent_workouts(&mut self) -> Result<Vec<WorkoutSummary>, String> {
            self.workouts.clone().ok_or_else(|| "offline".to_string())
        }

        fn daily_steps(&mut self, _day: NaiveDate) -> Result<u32, String> {
            self.steps.ok_or_else(|| "offline".to_string())
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, 3, 0, 0).unwrap()
    }

    fn ride(name: &str, load: f64) -> WorkoutSummary {
        WorkoutSummary {
            date: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            name: name.to_string(),
            load,
            intensity_factor: 0.8,
            zone_seconds: [1_800.0, 1_800.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            distance_km: 31.6,
            elevation_gain_m: 240.0,
        }
    }

    #[test]
    fn workout_ids_are_stable_and_short() {
        let date = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let a = workout_id(date, "Lunch Ride", 64.04);
        let b = workout_id(date, "Lunch Ride", 64.0);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, workout_id(date, "Lunch Ride", 64.1));
        assert_ne!(a, workout_id(date, "Evening Ride", 64.0));
    }

    #[test]
    fn failing_provider_uses_defaults() {
        let mut provider = FakeProvider {
            summary: None,
            steps: None,
            workouts: None,
        };
        let mut ledger = PointLedger::new();
        let report = DailySync::default().run(&mut provider, &mut ledger, noon());
        assert!(report.summary_defaulted && report.steps_defaulted && report.workouts_failed);
        assert_eq!(report.daily, daily_points(50.0, 0.0, 5_000));
        assert_eq!(ledger.base, report.daily.total);
        assert_eq!(ledger.walk, 5);
    }

    #[test]
    fn repeated_sync_is_a_no_op() {
        let mut provider = FakeProvider {
            summary: Some(FitnessSummary {
                ctl: 72.0,
                atl: 80.0,
                tsb: -8.0,
                weekly_load: 450.0,
                ftp: 250.0,
            }),
            steps: Some(12_000),
            workouts: Some(vec![ride("Lunch Ride", 60.0)]),
        };
        let mut ledger = PointLedger::new();
        let sync = DailySync::default();
        let first = sync.run(&mut provider, &mut ledger, noon());
        assert_eq!(first.base_credited, first.daily.total);
        assert_eq!(first.workouts.len(), 1);
        assert_eq!(first.walk_points, 12 + 31);
        assert_eq!(ledger.training, TrainingPoints::new(60, 0, 0));

        let snapshot = ledger.clone();
        let second = sync.run(&mut provider, &mut ledger, noon());
        assert_eq!(second.base_credited, 0);
        assert!(second.workouts.is_empty());
        assert_eq!(second.walk_points, 0);
        assert_eq!(ledger, snapshot);
    }

    #[test]
    fn later_sync_credits_steps_walked_since() {
        let summary = FitnessSummary {
            ctl: 72.0,
            atl: 80.0,
            tsb: -8.0,
            weekly_load: 450.0,
            ftp: 250.0,
        };
        let mut provider = FakeProvider {
            summary: Some(summary),
            steps: Some(300),
            workouts: Some(Vec::new()),
        };
        let mut ledger = PointLedger::new();
        let sync = DailySync::default();
        // 05:00 and 22:00 local on the same game day.
        let dawn = Utc.with_ymd_and_hms(2024, 4, 1, 20, 0, 0).unwrap();
        let night = Utc.with_ymd_and_hms(2024, 4, 2, 13, 0, 0).unwrap();

        let early = sync.run(&mut provider, &mut ledger, dawn);
        assert_eq!(early.base_credited, 0);
        assert_eq!(early.walk_points, 0);

        provider.steps = Some(12_000);
        let late = sync.run(&mut provider, &mut ledger, night);
        assert_eq!(late.day, early.day);
        assert_eq!(late.base_credited, daily_points(72.0, -8.0, 12_000).total);
        assert_eq!(late.walk_points, 12);
        assert_eq!(ledger.base, late.base_credited);
        assert_eq!(ledger.walk, 12);
    }
}
