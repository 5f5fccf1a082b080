//! Turn-based battle resolution.
//!
//! Turn order is fixed by a single first-strike roll. Each attack then draws,
//! in order: hit, evasion, critical, damage variance. A missed attack stops
//! drawing at the first failed roll.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::constants::{
    BASE_EVASION_RATE, BASE_HIT_RATE, BOSS_WIN_BASE_POINTS, CRITICAL_CHANCE, CRITICAL_MULTIPLIER,
    DAMAGE_VARIANCE_MAX, DAMAGE_VARIANCE_MIN, DEFENSE_MITIGATION, DISCIPLINE_MAX, DISCIPLINE_MIN,
    DISCIPLINE_PIVOT, EVASION_RATE_PER_DISCIPLINE, FIRST_STRIKE_SOFTENING, HIT_RATE_PER_DISCIPLINE,
    LOSS_HP_FLOOR, MAX_BATTLE_TURNS, MIN_DAMAGE, SPEED_DIVISOR, WILD_WIN_BASE_POINTS,
};
use crate::creature::CreatureState;
use crate::numbers::{finite_or, floor_f64_to_i32};
use crate::rng::RandomSource;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub hp: i32,
    pub max_hp: i32,
    pub atk: f64,
    pub def: f64,
    pub discipline: f64,
}

impl Combatant {
    /// Discipline is clamped to 0..100 and hp to `0..=max_hp`.
    #[must_use]
    pub fn new(hp: i32, max_hp: i32, atk: f64, def: f64, discipline: f64) -> Self {
        let max_hp = max_hp.max(0);
        Self {
            hp: hp.clamp(0, max_hp),
            max_hp,
            atk: finite_or(atk, 0.0).max(0.0),
            def: finite_or(def, 0.0).max(0.0),
            discipline: finite_or(discipline, DISCIPLINE_PIVOT).clamp(DISCIPLINE_MIN, DISCIPLINE_MAX),
        }
    }

    /// Effective stats, current hp and discipline of `creature`.
    #[must_use]
    pub fn from_creature(creature: &CreatureState) -> Self {
        let stats = creature.effective_stats();
        Self::new(
            floor_f64_to_i32(creature.current_hp),
            floor_f64_to_i32(stats.max_hp),
            stats.atk,
            stats.def,
            creature.discipline,
        )
    }

    #[must_use]
    pub fn speed(&self) -> f64 {
        (self.atk + self.def) / SPEED_DIVISOR
    }
}

#[must_use]
pub fn hit_rate(attacker_discipline: f64) -> f64 {
    BASE_HIT_RATE + (attacker_discipline - DISCIPLINE_PIVOT) * HIT_RATE_PER_DISCIPLINE
}

#[must_use]
pub fn evasion_rate(defender_discipline: f64) -> f64 {
    BASE_EVASION_RATE + (defender_discipline - DISCIPLINE_PIVOT) * EVASION_RATE_PER_DISCIPLINE
}

/// Probability that the player acts first. `speed_diff` is player minus enemy.
#[must_use]
pub fn first_strike_probability(speed_diff: f64) -> f64 {
    let diff = finite_or(speed_diff, 0.0);
    0.5 + (diff / (diff.abs() + FIRST_STRIKE_SOFTENING)) * 0.5
}

/// `max(1, floor(atk * variance [* 1.5] - def * 0.4))`. Consumes one draw.
pub fn calculate_damage<R: RandomSource>(atk: f64, def: f64, critical: bool, rng: &mut R) -> i32 {
    let variance = rng.random_float(DAMAGE_VARIANCE_MIN, DAMAGE_VARIANCE_MAX);
    let multiplier = if critical { CRITICAL_MULTIPLIER } else { 1.0 };
    let raw = atk * variance * multiplier - def * DEFENSE_MITIGATION;
    floor_f64_to_i32(raw).max(MIN_DAMAGE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Enemy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttackOutcome {
    Miss,
    Evaded,
    Hit { damage: i32, critical: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleAction {
    pub attacker: Side,
    pub outcome: AttackOutcome,
    pub defender_hp_after: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleTurn {
    pub turn: u32,
    pub actions: SmallVec<[BattleAction; 2]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleResult {
    pub player_won: bool,
    pub player_first: bool,
    pub player_remaining_hp: i32,
    pub enemy_remaining_hp: i32,
    /// The turn cap was reached with both sides standing.
    pub timed_out: bool,
    pub turns: Vec<BattleTurn>,
}

fn attack<R: RandomSource>(
    side: Side,
    attacker: &Combatant,
    defender: &mut Combatant,
    rng: &mut R,
) -> BattleAction {
    let outcome = if !rng.chance(hit_rate(attacker.discipline)) {
        AttackOutcome::Miss
    } else if rng.chance(evasion_rate(defender.discipline)) {
        AttackOutcome::Evaded
    } else {
        let critical = rng.chance(CRITICAL_CHANCE);
        let damage = calculate_damage(attacker.atk, defender.def, critical, rng);
        defender.hp = defender.hp.saturating_sub(damage).max(0);
        AttackOutcome::Hit { damage, critical }
    };
    BattleAction {
        attacker: side,
        outcome,
        defender_hp_after: defender.hp,
    }
}

/// Fight `player` against `enemy` to a result with the full turn log.
///
/// A player knocked to 0 hp is reported at exactly 1: battles never kill.
pub fn resolve_battle<R: RandomSource>(
    player: &Combatant,
    enemy: &Combatant,
    rng: &mut R,
) -> BattleResult {
    let mut player = *player;
    let mut enemy = *enemy;
    let player_first = rng.chance(first_strike_probability(player.speed() - enemy.speed()));
    let order = if player_first {
        [Side::Player, Side::Enemy]
    } else {
        [Side::Enemy, Side::Player]
    };

    let mut turns = Vec::new();
    let mut turn = 0;
    while turn < MAX_BATTLE_TURNS && player.hp > 0 && enemy.hp > 0 {
        turn += 1;
        let mut actions = SmallVec::new();
        for side in order {
            let action = match side {
                Side::Player => attack(side, &player, &mut enemy, rng),
                Side::Enemy => attack(side, &enemy, &mut player, rng),
            };
            actions.push(action);
            if action.defender_hp_after == 0 {
                break;
            }
        }
        turns.push(BattleTurn { turn, actions });
    }

    let player_won = player.hp > 0 && enemy.hp <= 0;
    let timed_out = player.hp > 0 && enemy.hp > 0;
    if player.hp <= 0 {
        player.hp = LOSS_HP_FLOOR;
    }
    log::debug!(
        "battle over after {turn} turns: player {} ({} hp left, enemy {})",
        if player_won { "won" } else { "lost" },
        player.hp,
        enemy.hp
    );
    BattleResult {
        player_won,
        player_first,
        player_remaining_hp: player.hp,
        enemy_remaining_hp: enemy.hp,
        timed_out,
        turns,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleKind {
    Wild,
    Boss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleReward {
    pub won: bool,
    /// Unchanneled points for the caller's ledger.
    pub base_points: u32,
}

/// Copy the outcome back onto the creature and compute its reward.
pub fn apply_battle_result(
    creature: &mut CreatureState,
    result: &BattleResult,
    kind: BattleKind,
) -> BattleReward {
    creature.current_hp = f64::from(result.player_remaining_hp).min(creature.effective_max_hp());
    if result.player_won {
        creature.wins = creature.wins.saturating_add(1);
    } else {
        creature.losses = creature.losses.saturating_add(1);
    }
    let base_points = match (result.player_won, kind) {
        (false, _) => 0,
        (true, BattleKind::Wild) => WILD_WIN_BASE_POINTS,
        (true, BattleKind::Boss) => BOSS_WIN_BASE_POINTS,
    };
    BattleReward {
        won: result.player_won,
        base_points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FLOAT_EPSILON;
    use crate::creature::Stats;
    use crate::rng::{ScriptedSource, SeededSource};
    use chrono::{TimeZone, Utc};

    #[test]
    fn damage_reference_values() {
        let mut rng = ScriptedSource::constant(0.5);
        assert_eq!(calculate_damage(30.0, 20.0, false, &mut rng), 22);
        assert_eq!(calculate_damage(30.0, 20.0, true, &mut rng), 37);
    }

    #[test]
    fn damage_never_drops_below_one() {
        for draw in [0.0, 0.5, 0.999] {
            let mut rng = ScriptedSource::constant(draw);
            assert_eq!(calculate_damage(1.0, 500.0, false, &mut rng), 1);
            assert_eq!(calculate_damage(0.0, 0.0, true, &mut rng), 1);
        }
    }

    #[test]
    fn rates_follow_discipline() {
        assert!((hit_rate(50.0) - 0.90).abs() < FLOAT_EPSILON);
        assert!((hit_rate(100.0) - 1.0).abs() < FLOAT_EPSILON);
        assert!((hit_rate(0.0) - 0.80).abs() < FLOAT_EPSILON);
        assert!((evasion_rate(50.0) - 0.05).abs() < FLOAT_EPSILON);
        assert!((evasion_rate(100.0) - 0.10).abs() < FLOAT_EPSILON);
        assert!(evasion_rate(0.0).abs() < FLOAT_EPSILON);
    }

    #[test]
    fn first_strike_is_even_at_equal_speed() {
        assert!((first_strike_probability(0.0) - 0.5).abs() < FLOAT_EPSILON);
        assert!((first_strike_probability(20.0) - 0.75).abs() < FLOAT_EPSILON);
        assert!((first_strike_probability(-20.0) - 0.25).abs() < FLOAT_EPSILON);
        assert!(first_strike_probability(1e9) <= 1.0);
    }

    #[test]
    fn overwhelming_player_wins_cleanly() {
        let player = Combatant::new(999, 999, 200.0, 100.0, 50.0);
        let enemy = Combatant::new(30, 30, 5.0, 2.0, 50.0);
        let mut rng = SeededSource::from_seed(7);
        for _ in 0..50 {
            let result = resolve_battle(&player, &enemy, &mut rng);
            assert!(result.player_won);
            assert_eq!(result.enemy_remaining_hp, 0);
            assert!(!result.timed_out);
        }
    }

    #[test]
    fn hopeless_player_is_left_at_the_floor() {
        let player = Combatant::new(10, 10, 1.0, 0.0, 50.0);
        let enemy = Combatant::new(999, 999, 300.0, 200.0, 50.0);
        let mut rng = SeededSource::from_seed(11);
        for _ in 0..50 {
            let result = resolve_battle(&player, &enemy, &mut rng);
            assert!(!result.player_won);
            assert_eq!(result.player_remaining_hp, LOSS_HP_FLOOR);
        }
    }

    #[test]
    fn killing_blow_ends_the_turn() {
        // Player first, hits, no evasion, no crit; enemy has 1 hp.
        let player = Combatant::new(50, 50, 30.0, 20.0, 50.0);
        let enemy = Combatant::new(1, 1, 1.0, 0.0, 50.0);
        let mut rng = ScriptedSource::new([0.0, 0.0, 0.99, 0.99, 0.5]);
        let result = resolve_battle(&player, &enemy, &mut rng);
        assert!(result.player_first);
        assert_eq!(result.turns.len(), 1);
        assert_eq!(result.turns[0].actions.len(), 1);
        assert_eq!(result.turns[0].actions[0].attacker, Side::Player);
        assert!(result.player_won);
    }

    #[test]
    fn every_miss_hits_the_turn_cap() {
        let player = Combatant::new(50, 50, 30.0, 20.0, 50.0);
        let enemy = Combatant::new(50, 50, 30.0, 20.0, 50.0);
        let result = resolve_battle(&player, &enemy, &mut ScriptedSource::constant(0.999));
        assert!(result.timed_out);
        assert!(!result.player_won);
        assert_eq!(result.turns.len(), MAX_BATTLE_TURNS as usize);
        assert_eq!(result.player_remaining_hp, 50);
        assert!(
            result
                .turns
                .iter()
                .flat_map(|turn| turn.actions.iter())
                .all(|action| action.outcome == AttackOutcome::Miss)
        );
    }

    #[test]
    fn apply_result_updates_record_and_reward() {
        let born = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut creature =
            CreatureState::new("Tester", "cogling", Stats::new(50.0, 12.0, 10.0), born, 9.0);
        let won = BattleResult {
            player_won: true,
            player_first: true,
            player_remaining_hp: 31,
            enemy_remaining_hp: 0,
            timed_out: false,
            turns: Vec::new(),
        };
        let reward = apply_battle_result(&mut creature, &won, BattleKind::Boss);
        assert_eq!(reward.base_points, 5);
        assert_eq!(creature.wins, 1);
        assert!((creature.current_hp - 31.0).abs() < FLOAT_EPSILON);

        let lost = BattleResult {
            player_won: false,
            player_remaining_hp: 1,
            ..won
        };
        let reward = apply_battle_result(&mut creature, &lost, BattleKind::Wild);
        assert_eq!(reward.base_points, 0);
        assert_eq!(creature.losses, 1);
    }

    #[test]
    fn combatant_uses_effective_stats() {
        let born = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut creature =
            CreatureState::new("Tester", "cogling", Stats::new(50.0, 12.0, 10.0), born, 9.0);
        creature.memory = Some(crate::creature::MemoryBonus { hp: 10, atk: 3, def: 2 });
        creature.heal_full();
        creature.discipline = 140.0;
        let combatant = Combatant::from_creature(&creature);
        assert_eq!(combatant.hp, 60);
        assert_eq!(combatant.max_hp, 60);
        assert!((combatant.atk - 15.0).abs() < FLOAT_EPSILON);
        assert!((combatant.discipline - 100.0).abs() < FLOAT_EPSILON);
    }
}
