use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use pedalmon_game::conversion::even_split;
use pedalmon_game::{
    EncounterOutcome, FitnessProvider, FitnessSummary, GameData, Session, TrainingOutcome,
    WorkoutSummary, calendar_day_for,
};

/// Steady rider: same fitness every day, one ride per game day.
struct SteadyRider {
    today: NaiveDate,
}

impl FitnessProvider for SteadyRider {
    type Error = String;

    fn fitness_summary(&mut self) -> Result<FitnessSummary, String> {
        Ok(FitnessSummary {
            ctl: 85.0,
            atl: 90.0,
            tsb: -5.0,
            weekly_load: 520.0,
            ftp: 265.0,
        })
    }

    fn recent_workouts(&mut self) -> Result<Vec<WorkoutSummary>, String> {
        Ok(vec![WorkoutSummary {
            date: self.today,
            name: "Morning Loop".to_string(),
            load: 70.0,
            intensity_factor: 0.82,
            zone_seconds: [1_200.0, 1_200.0, 900.0, 600.0, 300.0, 120.0, 60.0],
            distance_km: 38.0,
            elevation_gain_m: 410.0,
        }])
    }

    fn daily_steps(&mut self, _day: NaiveDate) -> Result<u32, String> {
        Ok(9_000)
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
}

fn check_invariants(session: &Session<'_>) {
    let creature = &session.creature;
    let def = session.data().species.get(&creature.species).unwrap();
    assert!(creature.stats.max_hp <= def.caps.max_hp);
    assert!(creature.stats.atk <= def.caps.atk);
    assert!(creature.stats.def <= def.caps.def);
    assert!((0.0..=100.0).contains(&creature.discipline));
    assert!(creature.current_hp >= 0.0);
    assert!(creature.current_hp <= creature.effective_max_hp());
    assert!(creature.meals_today <= 3);
}

/// One game day: sync, feed, spend everything, fight, then tick through the day.
fn play_day(session: &mut Session<'_>, rider: &mut SteadyRider, morning: DateTime<Utc>) -> u32 {
    let data = session.data();
    rider.today = calendar_day_for(morning, session.boundary());
    let (report, _) = session.sync(rider, morning);
    assert_eq!(report.day, rider.today);
    let base = session.ledger.base;
    assert!(session.ledger.split_base(even_split(base)));

    for meal in 0..3 {
        session.feed(morning + Duration::hours(meal * 4));
    }

    let mut evolutions = 0;
    let mut guard = 0;
    'training: loop {
        guard += 1;
        assert!(guard < 500, "training loop did not converge");
        for program in data.programs.iter() {
            match session.train(&program.id, morning).unwrap() {
                TrainingOutcome::Trained { evolution, .. } => {
                    if let Some(evolution) = evolution {
                        let from = data.species.get(&evolution.from).unwrap();
                        let to = data.species.get(&evolution.to).unwrap();
                        assert!(to.stage > from.stage);
                        evolutions += 1;
                    }
                    check_invariants(session);
                    continue 'training;
                }
                TrainingOutcome::CannotAfford => {}
                TrainingOutcome::NotAlive => break 'training,
            }
        }
        break;
    }

    let available = data.worlds.available(&session.worlds);
    let frontier = available.last().copied().unwrap_or(1);
    if let EncounterOutcome::Fought(report) = session.fight_boss(frontier, morning).unwrap() {
        assert_eq!(report.world, frontier);
    }
    while let EncounterOutcome::Fought(_) = session.fight_wild(frontier, morning).unwrap() {
        check_invariants(session);
    }

    for hour in (6..24).step_by(6) {
        session.tick(morning + Duration::hours(hour)).unwrap();
        check_invariants(session);
    }
    evolutions
}

#[test]
fn daily_rider_raises_several_generations() {
    let data = GameData::embedded();
    let mut session = Session::new(data, "Bidon", None, 0xC0FFEE, start()).unwrap();
    let mut rider = SteadyRider {
        today: calendar_day_for(start(), session.boundary()),
    };
    let mut evolutions = 0;
    let mut deaths = Vec::new();
    for day in 0..120 {
        let morning = start() + Duration::days(day) + Duration::hours(1);
        let generation = session.creature.generation;
        evolutions += play_day(&mut session, &mut rider, morning);
        if session.creature.generation > generation {
            deaths.push(session.creature.generation);
        }
    }

    assert!(session.creature.alive);
    assert!(session.creature.generation >= 2, "nobody ever died of old age");
    assert!(evolutions >= 1, "no evolution in 120 days");
    assert!(session.worlds.get(&1).is_some_and(|p| p.kills > 0));
    assert!(session.creature.memory.is_some());
    assert!(deaths.windows(2).all(|pair| pair[1] == pair[0] + 1));
}

#[test]
fn same_seed_same_campaign() {
    let data = GameData::embedded();
    let run = || {
        let mut session = Session::new(data, "Bidon", None, 99, start()).unwrap();
        let mut rider = SteadyRider {
            today: calendar_day_for(start(), session.boundary()),
        };
        for day in 0..20 {
            play_day(
                &mut session,
                &mut rider,
                start() + Duration::days(day) + Duration::hours(1),
            );
        }
        (session.creature.clone(), session.ledger.clone(), session.draws())
    };
    assert_eq!(run(), run());
}

#[test]
fn abandoned_creature_dies_of_neglect() {
    let data = GameData::embedded();
    let mut session = Session::new(data, "Bidon", Some("pebblet"), 4, start()).unwrap();
    let mut succession = None;
    for hour in (4..=60).step_by(4) {
        let report = session.tick(start() + Duration::hours(hour)).unwrap();
        if report.succession.is_some() {
            succession = report.succession;
            break;
        }
    }
    let change = succession.expect("neglect should be fatal within 60 hours");
    assert_eq!(change.cause, pedalmon_game::DeathCause::Neglect);
    assert_eq!(session.creature.generation, 2);
}
