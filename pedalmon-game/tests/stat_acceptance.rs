use pedalmon_game::lifecycle::{roll_base_lifespan, roll_meal_lifespan_extension};
use pedalmon_game::rng::{RandomSource, SeededSource};
use pedalmon_game::world::{WorldTable, boss_combatant, recommended_combatant};
use pedalmon_game::{GameData, resolve_battle};
use std::convert::TryFrom;

const SAMPLE_SIZE: usize = 5000;

fn ratio(count: usize, total: usize) -> f64 {
    let count = u32::try_from(count).expect("count fits u32");
    let total = u32::try_from(total).expect("total fits u32");
    f64::from(count) / f64::from(total)
}

#[test]
fn recommended_power_wins_a_fair_share_of_boss_fights() {
    let table = WorldTable::default_table();
    for world in table.iter().map(|def| def.number) {
        let player = recommended_combatant(table, world).unwrap();
        let boss = boss_combatant(table, world).unwrap();
        let mut rng = SeededSource::from_seed(0xB055 + u64::from(world));
        let wins = (0..SAMPLE_SIZE)
            .filter(|_| resolve_battle(&player, &boss, &mut rng).player_won)
            .count();
        let rate = ratio(wins, SAMPLE_SIZE);
        assert!(
            (0.25..=0.55).contains(&rate),
            "world {world} boss win rate out of band: {rate:.3}"
        );
    }
}

#[test]
fn boss_fights_never_run_past_the_turn_cap_at_recommended_power() {
    let table = WorldTable::default_table();
    let player = recommended_combatant(table, 1).unwrap();
    let boss = boss_combatant(table, 1).unwrap();
    let mut rng = SeededSource::from_seed(7);
    let timed_out = (0..500)
        .filter(|_| resolve_battle(&player, &boss, &mut rng).timed_out)
        .count();
    assert_eq!(timed_out, 0);
}

#[test]
fn base_lifespan_mean_and_range() {
    let mut rng = SeededSource::from_seed(0x11FE);
    let mut total = 0.0;
    for _ in 0..SAMPLE_SIZE {
        let days = roll_base_lifespan(&mut rng);
        assert!((5.0..=20.0).contains(&days), "lifespan {days} outside buckets");
        total += days;
    }
    let mean = total / f64::from(u32::try_from(SAMPLE_SIZE).unwrap());
    assert!((mean - 9.3).abs() < 0.2, "mean lifespan drifted: {mean:.3}");
}

#[test]
fn meal_extension_mean_and_range() {
    let mut rng = SeededSource::from_seed(0xFEED);
    let mut total = 0.0;
    for _ in 0..SAMPLE_SIZE {
        let days = roll_meal_lifespan_extension(&mut rng);
        assert!((0.03..=0.25).contains(&days), "extension {days} outside buckets");
        total += days;
    }
    let mean = total / f64::from(u32::try_from(SAMPLE_SIZE).unwrap());
    assert!((mean - 0.0875).abs() < 0.005, "mean extension drifted: {mean:.4}");
}

#[test]
fn random_int_is_roughly_uniform() {
    let mut rng = SeededSource::from_seed(3);
    let mut counts = [0usize; 6];
    for _ in 0..SAMPLE_SIZE * 2 {
        let value = rng.random_int(1, 6);
        counts[usize::try_from(value - 1).unwrap()] += 1;
    }
    for count in counts {
        let share = ratio(count, SAMPLE_SIZE * 2);
        assert!((share - 1.0 / 6.0).abs() < 0.025, "face share {share:.3}");
    }
}

#[test]
fn embedded_tables_are_mutually_consistent() {
    let data = GameData::embedded();
    let worlds = u32::try_from(data.worlds.len()).unwrap();
    data.species.check_boss_worlds(worlds).unwrap();
    assert_eq!(data.species.starters().len(), 3);
}
