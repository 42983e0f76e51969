use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AnalyticsError, Result};
use crate::models::{PlayerProfile, SubAttributeRating, MAX_RATING};

pub const DEFAULT_TOP_N: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FocusCandidate {
    pub attribute: String,
    pub sub_attribute: String,
    pub current_value: i32,
    pub max_improvement: i32,
    pub weight: f64,
    pub impact_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttributeWeights {
    weights: HashMap<String, f64>,
}

impl AttributeWeights {
    /// Builds weights from position percentages, scaling them to sum to 1.0.
    pub fn from_percentages(
        position: &str,
        percentages: &BTreeMap<String, f64>,
    ) -> Result<Self> {
        if let Some((attribute, value)) = percentages.iter().find(|(_, v)| **v < 0.0) {
            return Err(AnalyticsError::InvalidWeightTable {
                position: position.to_string(),
                reason: format!("negative weight {value} for {attribute}"),
            });
        }

        let total: f64 = percentages.values().sum();
        if total <= 0.0 {
            return Err(AnalyticsError::InvalidWeightTable {
                position: position.to_string(),
                reason: "weights sum to zero".to_string(),
            });
        }

        Ok(Self {
            weights: percentages
                .iter()
                .map(|(attribute, value)| (attribute.clone(), value / total))
                .collect(),
        })
    }

    pub fn get(&self, attribute: &str) -> Option<f64> {
        self.weights.get(attribute).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionWeightTable {
    #[serde(flatten)]
    pub positions: BTreeMap<String, BTreeMap<String, f64>>,
}

impl PositionWeightTable {
    pub fn validate(&self) -> Result<()> {
        for (position, percentages) in &self.positions {
            AttributeWeights::from_percentages(position, percentages)?;
        }
        Ok(())
    }

    /// Weights for `position`. An unknown position yields empty weights, so
    /// every attribute falls back to an equal share.
    pub fn weights_for(&self, position: &str) -> Result<AttributeWeights> {
        match self.positions.get(position) {
            Some(percentages) => AttributeWeights::from_percentages(position, percentages),
            None => {
                warn!(position, "no weight table for position, using equal shares");
                Ok(AttributeWeights::default())
            }
        }
    }
}

pub trait PositionResolver {
    fn resolve(&self, profile: &PlayerProfile, current: &[SubAttributeRating]) -> String;
}

#[derive(Debug, Clone)]
pub struct FixedPosition {
    pub fallback: String,
}

impl PositionResolver for FixedPosition {
    fn resolve(&self, profile: &PlayerProfile, _current: &[SubAttributeRating]) -> String {
        profile
            .position
            .clone()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRule {
    pub attribute: String,
    pub min_rating: f64,
    pub position: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniversalRuleTable {
    pub rules: Vec<PositionRule>,
    pub fallback_position: String,
}

impl UniversalRuleTable {
    fn attribute_means(current: &[SubAttributeRating]) -> HashMap<&str, f64> {
        let mut sums: HashMap<&str, (i32, usize)> = HashMap::new();
        for rating in current {
            if let Some(value) = rating.value {
                let entry = sums.entry(rating.attribute.as_str()).or_insert((0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }

        sums.into_iter()
            .map(|(attribute, (sum, count))| (attribute, sum as f64 / count as f64))
            .collect()
    }
}

impl PositionResolver for UniversalRuleTable {
    fn resolve(&self, profile: &PlayerProfile, current: &[SubAttributeRating]) -> String {
        if let Some(position) = &profile.position {
            return position.clone();
        }

        let means = Self::attribute_means(current);
        let position = self
            .rules
            .iter()
            .find(|rule| {
                means
                    .get(rule.attribute.as_str())
                    .is_some_and(|mean| *mean >= rule.min_rating)
            })
            .map(|rule| rule.position.clone())
            .unwrap_or_else(|| self.fallback_position.clone());

        debug!(player_id = %profile.id, %position, "resolved universal player position");
        position
    }
}

/// Ranks sub-attributes by `(99 - current) * weight` and keeps the top `top_n`.
pub fn recommend(
    ratings: &[SubAttributeRating],
    weights: &AttributeWeights,
    top_n: usize,
) -> Vec<FocusCandidate> {
    let mut attributes: Vec<&str> = Vec::new();
    for rating in ratings {
        if !attributes.contains(&rating.attribute.as_str()) {
            attributes.push(rating.attribute.as_str());
        }
    }
    let equal_share = if attributes.is_empty() {
        0.0
    } else {
        1.0 / attributes.len() as f64
    };

    for attribute in &attributes {
        if weights.get(attribute).is_none() {
            warn!(attribute, equal_share, "missing attribute weight, using equal share");
        }
    }

    let mut candidates: Vec<FocusCandidate> = ratings
        .iter()
        .filter_map(|rating| {
            let current_value = rating.value?;
            let weight = weights.get(&rating.attribute).unwrap_or(equal_share);
            let max_improvement = (MAX_RATING - current_value).max(0);

            Some(FocusCandidate {
                attribute: rating.attribute.clone(),
                sub_attribute: rating.sub_attribute.clone(),
                current_value,
                max_improvement,
                weight,
                impact_score: max_improvement as f64 * weight,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.impact_score
            .partial_cmp(&a.impact_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(top_n);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn rating(attribute: &str, sub_attribute: &str, value: Option<i32>) -> SubAttributeRating {
        SubAttributeRating {
            attribute: attribute.to_string(),
            sub_attribute: sub_attribute.to_string(),
            value,
        }
    }

    fn weights(pairs: &[(&str, f64)]) -> AttributeWeights {
        let percentages: BTreeMap<String, f64> =
            pairs.iter().map(|(a, w)| (a.to_string(), *w)).collect();
        AttributeWeights::from_percentages("outside_hitter", &percentages).unwrap()
    }

    fn profile(position: Option<&str>) -> PlayerProfile {
        PlayerProfile {
            id: Uuid::new_v4(),
            full_name: "Mara Quist".to_string(),
            email: "mara.quist@example.com".to_string(),
            team_id: Uuid::new_v4(),
            position: position.map(str::to_string),
        }
    }

    #[test]
    fn percentages_are_normalized() {
        let w = weights(&[("attack", 40.0), ("serve", 20.0), ("reception", 40.0)]);
        assert!((w.get("attack").unwrap() - 0.4).abs() < 1e-9);
        assert!((w.get("serve").unwrap() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn invalid_percentages_are_rejected() {
        let zero: BTreeMap<String, f64> = [("attack".to_string(), 0.0)].into_iter().collect();
        assert!(AttributeWeights::from_percentages("setter", &zero).is_err());

        let negative: BTreeMap<String, f64> =
            [("attack".to_string(), 50.0), ("serve".to_string(), -10.0)]
                .into_iter()
                .collect();
        assert!(matches!(
            AttributeWeights::from_percentages("setter", &negative),
            Err(AnalyticsError::InvalidWeightTable { .. })
        ));
    }

    #[test]
    fn ranks_by_weighted_headroom() {
        let ratings = vec![
            rating("attack", "spike power", Some(60)),
            rating("serve", "float serve", Some(40)),
            rating("reception", "serve receive", Some(80)),
            rating("attack", "tip", Some(90)),
        ];
        let w = weights(&[("attack", 50.0), ("serve", 20.0), ("reception", 30.0)]);

        let ranked = recommend(&ratings, &w, DEFAULT_TOP_N);
        let names: Vec<&str> = ranked.iter().map(|c| c.sub_attribute.as_str()).collect();
        // spike 39*0.5=19.5, float 59*0.2=11.8, receive 19*0.3=5.7, tip 9*0.5=4.5
        assert_eq!(names, vec!["spike power", "float serve", "serve receive"]);
        assert_eq!(ranked[0].max_improvement, 39);
        assert!((ranked[0].impact_score - 19.5).abs() < 1e-9);
    }

    #[test]
    fn equal_scores_keep_declaration_order() {
        let ratings = vec![
            rating("block", "timing", Some(70)),
            rating("defense", "dig", Some(70)),
        ];
        let w = weights(&[("block", 50.0), ("defense", 50.0)]);

        let ranked = recommend(&ratings, &w, DEFAULT_TOP_N);
        assert_eq!(ranked[0].sub_attribute, "timing");
        assert_eq!(ranked[1].sub_attribute, "dig");
    }

    #[test]
    fn missing_weight_falls_back_to_equal_share() {
        let ratings = vec![
            rating("attack", "spike power", Some(50)),
            rating("setting", "jump set", Some(50)),
        ];
        let w = weights(&[("attack", 100.0)]);

        let ranked = recommend(&ratings, &w, DEFAULT_TOP_N);
        let setting = ranked.iter().find(|c| c.attribute == "setting").unwrap();
        assert!((setting.weight - 0.5).abs() < 1e-9);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn unrated_sub_attributes_are_skipped_and_output_truncated() {
        let ratings = vec![
            rating("serve", "jump serve", None),
            rating("serve", "float serve", Some(30)),
            rating("serve", "placement", Some(40)),
            rating("serve", "consistency", Some(50)),
            rating("serve", "power", Some(60)),
        ];
        let w = weights(&[("serve", 100.0)]);

        let ranked = recommend(&ratings, &w, 2);
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|c| c.sub_attribute != "jump serve"));
        assert_eq!(ranked[0].sub_attribute, "float serve");
    }

    #[test]
    fn maxed_out_values_have_no_headroom() {
        let ranked = recommend(
            &[rating("serve", "ace", Some(99))],
            &weights(&[("serve", 100.0)]),
            DEFAULT_TOP_N,
        );
        assert_eq!(ranked[0].max_improvement, 0);
        assert_eq!(ranked[0].impact_score, 0.0);
    }

    #[test]
    fn unknown_position_uses_empty_weights() {
        let table = PositionWeightTable::default();
        assert!(table.weights_for("libero").unwrap().is_empty());
    }

    #[test]
    fn fixed_position_prefers_recorded_position() {
        let resolver = FixedPosition {
            fallback: "outside_hitter".to_string(),
        };
        assert_eq!(resolver.resolve(&profile(Some("setter")), &[]), "setter");
        assert_eq!(resolver.resolve(&profile(None), &[]), "outside_hitter");
    }

    #[test]
    fn universal_rules_pick_first_satisfied_rule() {
        let table = UniversalRuleTable {
            rules: vec![
                PositionRule {
                    attribute: "setting".to_string(),
                    min_rating: 75.0,
                    position: "setter".to_string(),
                },
                PositionRule {
                    attribute: "block".to_string(),
                    min_rating: 70.0,
                    position: "middle_blocker".to_string(),
                },
            ],
            fallback_position: "outside_hitter".to_string(),
        };

        let blocker = vec![
            rating("setting", "hand set", Some(60)),
            rating("block", "timing", Some(72)),
            rating("block", "reach", Some(74)),
        ];
        assert_eq!(table.resolve(&profile(None), &blocker), "middle_blocker");
        assert_eq!(table.resolve(&profile(None), &[]), "outside_hitter");
        assert_eq!(table.resolve(&profile(Some("libero")), &blocker), "libero");
    }
}
