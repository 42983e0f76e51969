use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AnalyticsError, Result};
use crate::focus::{PositionRule, PositionWeightTable, UniversalRuleTable, DEFAULT_TOP_N};
use crate::league::LeagueTable;
use crate::percentile::DEFAULT_CACHE_TTL_SECS;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub database: DatabaseConfig,
    pub comparison: ComparisonConfig,
    pub focus: FocusConfig,
    pub league: LeagueTable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    pub cache_ttl_secs: i64,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusConfig {
    pub top_n: usize,
    pub weights: PositionWeightTable,
    pub universal: UniversalRuleTable,
}

fn percentages(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs
        .iter()
        .map(|(attribute, pct)| (attribute.to_string(), *pct))
        .collect()
}

impl Default for FocusConfig {
    fn default() -> Self {
        let mut positions = BTreeMap::new();
        positions.insert(
            "outside_hitter".to_string(),
            percentages(&[
                ("serve", 15.0),
                ("reception", 20.0),
                ("attack", 25.0),
                ("block", 10.0),
                ("setting", 5.0),
                ("defense", 15.0),
                ("athleticism", 5.0),
                ("mentality", 5.0),
            ]),
        );
        positions.insert(
            "opposite".to_string(),
            percentages(&[
                ("serve", 15.0),
                ("reception", 5.0),
                ("attack", 35.0),
                ("block", 20.0),
                ("setting", 5.0),
                ("defense", 10.0),
                ("athleticism", 5.0),
                ("mentality", 5.0),
            ]),
        );
        positions.insert(
            "middle_blocker".to_string(),
            percentages(&[
                ("serve", 10.0),
                ("reception", 0.0),
                ("attack", 25.0),
                ("block", 35.0),
                ("setting", 0.0),
                ("defense", 10.0),
                ("athleticism", 10.0),
                ("mentality", 10.0),
            ]),
        );
        positions.insert(
            "setter".to_string(),
            percentages(&[
                ("serve", 10.0),
                ("reception", 5.0),
                ("attack", 5.0),
                ("block", 10.0),
                ("setting", 45.0),
                ("defense", 10.0),
                ("athleticism", 5.0),
                ("mentality", 10.0),
            ]),
        );
        positions.insert(
            "libero".to_string(),
            percentages(&[
                ("serve", 0.0),
                ("reception", 35.0),
                ("attack", 0.0),
                ("block", 0.0),
                ("setting", 10.0),
                ("defense", 40.0),
                ("athleticism", 5.0),
                ("mentality", 10.0),
            ]),
        );

        let rule = |attribute: &str, min_rating: f64, position: &str| PositionRule {
            attribute: attribute.to_string(),
            min_rating,
            position: position.to_string(),
        };

        Self {
            top_n: DEFAULT_TOP_N,
            weights: PositionWeightTable { positions },
            universal: UniversalRuleTable {
                rules: vec![
                    rule("setting", 70.0, "setter"),
                    rule("block", 70.0, "middle_blocker"),
                    rule("reception", 72.0, "libero"),
                    rule("attack", 70.0, "opposite"),
                ],
                fallback_position: "outside_hitter".to_string(),
            },
        }
    }
}

impl AnalyticsConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AnalyticsConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// File (when given) or defaults, then environment overrides, validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                info!(path = %path.display(), "loading analytics config");
                Self::load_from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = Some(url);
        }

        if let Ok(ttl) = std::env::var("ANALYTICS_CACHE_TTL_SECS") {
            self.comparison.cache_ttl_secs = ttl.parse().map_err(|_| {
                AnalyticsError::Config(format!("ANALYTICS_CACHE_TTL_SECS is not a number: {ttl}"))
            })?;
        }

        if let Ok(top_n) = std::env::var("ANALYTICS_FOCUS_TOP_N") {
            self.focus.top_n = top_n.parse().map_err(|_| {
                AnalyticsError::Config(format!("ANALYTICS_FOCUS_TOP_N is not a number: {top_n}"))
            })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.comparison.cache_ttl_secs <= 0 {
            return Err(AnalyticsError::Config(
                "comparison.cache_ttl_secs must be positive".to_string(),
            ));
        }
        if self.focus.top_n == 0 {
            return Err(AnalyticsError::Config("focus.top_n must be at least 1".to_string()));
        }
        self.focus.weights.validate()?;
        self.league.validate()?;
        Ok(())
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.comparison.cache_ttl_secs)
    }

    pub fn database_url(&self) -> Result<&str> {
        self.database.url.as_deref().ok_or_else(|| {
            AnalyticsError::Config("DATABASE_URL must be set to a Postgres instance".to_string())
        })
    }
}
