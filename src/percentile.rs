use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::cache::{CacheKey, Lookup, SnapshotCache};
use crate::error::{AnalyticsError, Result};
use crate::models::{MemberRatings, TeamRatings};

pub const MIN_TEAM_SIZE: usize = 5;

pub const STRENGTH_PERCENTILE: u8 = 70;
pub const IMPROVEMENT_PERCENTILE: u8 = 30;

pub const DEFAULT_CACHE_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentileSnapshot {
    pub team_id: Uuid,
    pub player_id: Uuid,
    pub percentiles: BTreeMap<String, u8>,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub team_size: usize,
    pub computed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Share of the team strictly below `value`, rounded to 0-100. Teammates
/// missing from `team_values` (unrated) count as not below.
pub fn percentile_rank(value: i32, team_values: &[i32], team_size: usize) -> u8 {
    if team_size == 0 {
        return 0;
    }
    let below = team_values.iter().filter(|other| **other < value).count();
    (100.0 * below as f64 / team_size as f64).round() as u8
}

pub fn compute_percentiles(team: &TeamRatings, member: &MemberRatings) -> BTreeMap<String, u8> {
    let team_size = team.team_size();
    member
        .ratings
        .iter()
        .map(|(attribute, value)| {
            let team_values: Vec<i32> = team
                .members
                .iter()
                .filter_map(|other| other.ratings.get(attribute).copied())
                .collect();

            if team_values.len() < team_size {
                debug!(%attribute, rated = team_values.len(), team_size, "partially rated attribute");
            }

            (attribute.clone(), percentile_rank(*value, &team_values, team_size))
        })
        .collect()
}

fn validate_roster(team: &TeamRatings) -> Result<()> {
    let mut seen = HashSet::with_capacity(team.members.len());
    for member in &team.members {
        if !seen.insert(member.player_id) {
            return Err(AnalyticsError::DuplicateTeamMember {
                team_id: team.team_id,
                player_id: member.player_id,
            });
        }
    }
    Ok(())
}

#[derive(Debug)]
pub struct PercentileComparator {
    cache: SnapshotCache,
}

impl Default for PercentileComparator {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_CACHE_TTL_SECS))
    }
}

impl PercentileComparator {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: SnapshotCache::new(ttl),
        }
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub fn opt_out(&self, player_id: Uuid) {
        self.cache.opt_out(player_id);
    }

    pub fn opt_in(&self, player_id: Uuid) {
        self.cache.opt_in(player_id);
    }

    pub fn roster_changed(&self, team_id: Uuid) {
        self.cache.invalidate_team(team_id);
    }

    pub fn compute_snapshot(
        &self,
        team: &TeamRatings,
        player_id: Uuid,
    ) -> Result<Option<PercentileSnapshot>> {
        self.compute_snapshot_at(team, player_id, Utc::now())
    }

    pub fn compute_snapshot_at(
        &self,
        team: &TeamRatings,
        player_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<PercentileSnapshot>> {
        if self.cache.is_opted_out(player_id) {
            return Ok(None);
        }

        let flagged = team
            .members
            .iter()
            .any(|m| m.player_id == player_id && m.comparison_opt_out);
        if flagged {
            self.cache.opt_out(player_id);
            return Ok(None);
        }

        validate_roster(team)?;
        let member = team.member(player_id).ok_or(AnalyticsError::PlayerNotOnTeam {
            team_id: team.team_id,
            player_id,
        })?;

        if team.team_size() < MIN_TEAM_SIZE {
            self.cache.invalidate_team(team.team_id);
            return Ok(None);
        }

        let key = CacheKey {
            team_id: team.team_id,
            player_id,
        };
        let roster = team.roster();

        let ticket = match self.cache.lookup(key, &roster, now) {
            Lookup::OptedOut => return Ok(None),
            Lookup::Hit(snapshot) => return Ok(Some(snapshot)),
            Lookup::Miss(ticket) => ticket,
        };

        let percentiles = compute_percentiles(team, member);
        let strengths = percentiles
            .iter()
            .filter(|(_, pct)| **pct >= STRENGTH_PERCENTILE)
            .map(|(attribute, _)| attribute.clone())
            .collect();
        let improvements = percentiles
            .iter()
            .filter(|(_, pct)| **pct <= IMPROVEMENT_PERCENTILE)
            .map(|(attribute, _)| attribute.clone())
            .collect();

        let snapshot = PercentileSnapshot {
            team_id: team.team_id,
            player_id,
            percentiles,
            strengths,
            improvements,
            team_size: team.team_size(),
            computed_at: now,
            expires_at: now + self.cache.ttl(),
        };

        if self.cache.store(ticket, snapshot.clone(), roster) {
            return Ok(Some(snapshot));
        }

        // Consent changed while computing; only an opted-in player may see it.
        if self.cache.is_opted_out(player_id) {
            Ok(None)
        } else {
            Ok(Some(snapshot))
        }
    }
}
