use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

pub const COMPOSITE_MAX: i32 = 800;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueTier {
    pub name: String,
    pub min_score: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueTable {
    pub tiers: Vec<LeagueTier>,
}

impl Default for LeagueTable {
    fn default() -> Self {
        let tiers = [
            ("Recreational", 0),
            ("Regional", 200),
            ("National", 400),
            ("Premier", 550),
            ("International", 700),
        ];
        Self {
            tiers: tiers
                .iter()
                .map(|(name, min_score)| LeagueTier {
                    name: name.to_string(),
                    min_score: *min_score,
                })
                .collect(),
        }
    }
}

impl LeagueTable {
    /// Tiers must start at 0, ascend strictly and stay within the scale.
    pub fn validate(&self) -> Result<()> {
        match self.tiers.first() {
            Some(first) if first.min_score == 0 => {}
            _ => {
                return Err(AnalyticsError::Config(
                    "league tiers must start at a tier with min_score 0".to_string(),
                ))
            }
        }

        for pair in self.tiers.windows(2) {
            if pair[1].min_score <= pair[0].min_score || pair[1].min_score > COMPOSITE_MAX {
                return Err(AnalyticsError::Config(format!(
                    "league tier {} has an invalid lower bound {}",
                    pair[1].name, pair[1].min_score
                )));
            }
        }
        Ok(())
    }

    pub fn tier_for(&self, composite: i32) -> Option<&LeagueTier> {
        let composite = composite.clamp(0, COMPOSITE_MAX);
        self.tiers
            .iter()
            .rev()
            .find(|tier| composite >= tier.min_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_valid() {
        assert!(LeagueTable::default().validate().is_ok());
    }

    #[test]
    fn boundaries_are_inclusive() {
        let table = LeagueTable::default();
        assert_eq!(table.tier_for(0).unwrap().name, "Recreational");
        assert_eq!(table.tier_for(199).unwrap().name, "Recreational");
        assert_eq!(table.tier_for(200).unwrap().name, "Regional");
        assert_eq!(table.tier_for(800).unwrap().name, "International");
        assert_eq!(table.tier_for(950).unwrap().name, "International");
    }

    #[test]
    fn unordered_tiers_are_rejected() {
        let mut table = LeagueTable::default();
        table.tiers.swap(1, 2);
        assert!(table.validate().is_err());
    }
}
