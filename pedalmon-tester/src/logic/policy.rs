use std::fmt;

use pedalmon_game::{BranchType, TrainingPoints};
use pedalmon_game::conversion::even_split;

/// How an automated player rides and spends its points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrainingStrategy {
    /// Mixed riding, base points split evenly, full-spectrum programs.
    Balanced,
    /// Long easy rides, everything into the low channel.
    Endurance,
    /// Sweet-spot riding, everything into the mid channel.
    Tempo,
    /// Intervals, everything into the high channel.
    Power,
}

impl TrainingStrategy {
    pub const ALL: [Self; 4] = [Self::Balanced, Self::Endurance, Self::Tempo, Self::Power];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            TrainingStrategy::Balanced => "Balanced",
            TrainingStrategy::Endurance => "Endurance",
            TrainingStrategy::Tempo => "Tempo",
            TrainingStrategy::Power => "Power",
        }
    }

    /// Seconds per power zone for a ride of `minutes`.
    #[must_use]
    pub fn zone_profile(self, minutes: f64) -> [f64; 7] {
        let shares: [f64; 7] = match self {
            TrainingStrategy::Balanced => [0.25, 0.25, 0.15, 0.15, 0.1, 0.05, 0.05],
            TrainingStrategy::Endurance => [0.45, 0.45, 0.1, 0.0, 0.0, 0.0, 0.0],
            TrainingStrategy::Tempo => [0.15, 0.15, 0.35, 0.35, 0.0, 0.0, 0.0],
            TrainingStrategy::Power => [0.3, 0.1, 0.0, 0.0, 0.25, 0.2, 0.15],
        };
        shares.map(|share| share * minutes * 60.0)
    }

    /// How unchanneled base points are moved into channels.
    #[must_use]
    pub const fn split_base(self, total: u32) -> TrainingPoints {
        match self {
            TrainingStrategy::Balanced => even_split(total),
            TrainingStrategy::Endurance => TrainingPoints::new(total, 0, 0),
            TrainingStrategy::Tempo => TrainingPoints::new(0, total, 0),
            TrainingStrategy::Power => TrainingPoints::new(0, 0, total),
        }
    }

    /// Program ids the player trains, first affordable wins.
    ///
    /// Each list only spends its own channels, so lifetime totals lean the
    /// way the strategy intends.
    #[must_use]
    pub fn program_order(self) -> &'static [&'static str] {
        match self {
            TrainingStrategy::Balanced => &["race_sim", "brick"],
            TrainingStrategy::Endurance => &["endurance", "easy_spin"],
            TrainingStrategy::Tempo => &["threshold", "tempo"],
            TrainingStrategy::Power => &["vo2max", "sprint"],
        }
    }

    /// Branch the strategy's spending leads to.
    #[must_use]
    pub const fn expected_branch(self) -> BranchType {
        match self {
            TrainingStrategy::Balanced => BranchType::Balanced,
            TrainingStrategy::Endurance => BranchType::Hp,
            TrainingStrategy::Tempo => BranchType::Def,
            TrainingStrategy::Power => BranchType::Atk,
        }
    }
}

impl fmt::Display for TrainingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pedalmon_game::evolution::branch_for_totals;
    use pedalmon_game::{ChannelTotals, GameData};
    use std::collections::HashSet;

    #[test]
    fn strategies_cover_the_catalog() {
        let catalog = &GameData::embedded().programs;
        let mut seen = HashSet::new();
        for strategy in TrainingStrategy::ALL {
            for id in strategy.program_order() {
                assert!(catalog.get(id).is_ok(), "{strategy} lists unknown {id}");
                assert!(seen.insert(*id), "{id} listed twice");
            }
        }
        assert_eq!(seen.len(), catalog.len());
    }

    #[test]
    fn focused_spending_matches_the_expected_branch() {
        let catalog = &GameData::embedded().programs;
        for strategy in TrainingStrategy::ALL {
            let mut totals = ChannelTotals::default();
            for id in strategy.program_order() {
                totals.accumulate(&catalog.get(id).unwrap().cost);
            }
            assert_eq!(branch_for_totals(&totals), strategy.expected_branch(), "{strategy}");
        }
    }

    #[test]
    fn splits_preserve_the_total() {
        for strategy in TrainingStrategy::ALL {
            assert_eq!(strategy.split_base(17).total(), 17);
        }
    }

    #[test]
    fn zone_profiles_cover_the_ride() {
        for strategy in TrainingStrategy::ALL {
            let total: f64 = strategy.zone_profile(60.0).iter().sum();
            assert!((total - 3_600.0).abs() < 1e-6, "{strategy}: {total}");
        }
    }
}
