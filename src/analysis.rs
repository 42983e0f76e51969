use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::milestones::{self, Milestone};
use crate::models::RatingSeries;
use crate::progression::{self, ProgressionStats};
use crate::trend::{self, TrendResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisWindow {
    pub since: Option<DateTime<Utc>>,
}

impl AnalysisWindow {
    pub fn all() -> Self {
        Self { since: None }
    }

    pub fn since(cutoff: DateTime<Utc>) -> Self {
        Self {
            since: Some(cutoff),
        }
    }

    pub fn last_days(days: i64, now: DateTime<Utc>) -> Self {
        Self::since(now - Duration::days(days.max(1)))
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.since.map_or(true, |cutoff| timestamp >= cutoff)
    }

    fn apply(&self, series: &RatingSeries) -> RatingSeries {
        match self.since {
            Some(cutoff) => series.since(cutoff),
            None => series.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttributeProgress {
    pub attribute: String,
    pub latest: Option<i32>,
    pub trend: TrendResult,
    pub stats: ProgressionStats,
    pub milestones: Vec<Milestone>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerProgress {
    pub player_id: Uuid,
    pub window: AnalysisWindow,
    pub attributes: Vec<AttributeProgress>,
    pub milestones: Vec<Milestone>,
}

impl PlayerProgress {
    /// Sum of the latest rating of every attribute, the composite used for
    /// league tiers.
    pub fn composite_score(&self) -> i32 {
        self.attributes.iter().filter_map(|a| a.latest).sum()
    }
}

pub fn analyze_series(series: &RatingSeries) -> AttributeProgress {
    AttributeProgress {
        attribute: series.attribute().to_string(),
        latest: series.last().map(|point| point.value),
        trend: trend::classify(series),
        stats: progression::compute_stats(series),
        milestones: milestones::detect_milestones(series),
    }
}

fn analyze_windowed(series: &RatingSeries, window: &AnalysisWindow) -> AttributeProgress {
    let mut progress = analyze_series(&window.apply(series));
    // first crossings come from the whole history; a threshold met before
    // the window opens never fires inside it
    progress.milestones = milestones::detect_milestones(series)
        .into_iter()
        .filter(|m| window.contains(m.achieved_at))
        .collect();
    progress
}

/// Runs every per-attribute analysis for one player over `window`.
/// Series belonging to other players are ignored.
pub fn analyze_player(
    player_id: Uuid,
    series: &[RatingSeries],
    window: AnalysisWindow,
) -> PlayerProgress {
    let attributes: Vec<AttributeProgress> = series
        .iter()
        .filter(|s| s.player_id() == player_id)
        .map(|s| analyze_windowed(s, &window))
        .collect();

    let milestones = milestones::merge_chronological(
        attributes.iter().map(|a| a.milestones.clone()).collect(),
    );

    debug!(
        %player_id,
        attributes = attributes.len(),
        milestones = milestones.len(),
        "analyzed player progress"
    );

    PlayerProgress {
        player_id,
        window,
        attributes,
        milestones,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RatingSeries;
    use crate::trend::TrendCategory;

    fn at(day: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-02T17:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::days(day)
    }

    fn series(player_id: Uuid, attribute: &str, values: &[(i64, i32)]) -> RatingSeries {
        let mut series = RatingSeries::new(player_id, attribute);
        for (day, value) in values {
            series.push(at(*day), *value, None).unwrap();
        }
        series
    }

    #[test]
    fn aggregates_each_attribute_and_merges_milestones() {
        let player = Uuid::new_v4();
        let history = vec![
            series(player, "serve", &[(0, 60), (7, 66), (14, 72), (21, 81)]),
            series(player, "block", &[(3, 68), (10, 71), (17, 70)]),
            series(Uuid::new_v4(), "serve", &[(0, 95)]),
        ];

        let progress = analyze_player(player, &history, AnalysisWindow::all());
        assert_eq!(progress.attributes.len(), 2);
        assert_eq!(progress.attributes[0].trend.category, TrendCategory::Improving);
        assert_eq!(progress.attributes[0].latest, Some(81));

        let order: Vec<(&str, i32)> = progress
            .milestones
            .iter()
            .map(|m| (m.attribute.as_str(), m.threshold))
            .collect();
        assert_eq!(order, vec![("block", 70), ("serve", 70), ("serve", 80)]);
        assert_eq!(progress.composite_score(), 151);
    }

    #[test]
    fn window_limits_history() {
        let player = Uuid::new_v4();
        let history = vec![series(player, "attack", &[(0, 40), (20, 60), (30, 61), (40, 63)])];

        let progress = analyze_player(player, &history, AnalysisWindow::since(at(15)));
        let attack = &progress.attributes[0];
        assert_eq!(attack.stats.count, 3);
        assert_eq!(attack.stats.total_improvement, 3);
        assert_eq!(attack.trend.category, TrendCategory::SlightlyImproving);
    }

    #[test]
    fn crossing_before_window_is_not_reported_again() {
        let player = Uuid::new_v4();
        let history = vec![series(player, "serve", &[(0, 75), (30, 60), (60, 72)])];

        let progress = analyze_player(player, &history, AnalysisWindow::since(at(20)));
        assert!(progress.milestones.is_empty());
        assert!(progress.attributes[0].milestones.is_empty());
        assert_eq!(progress.attributes[0].stats.count, 2);
    }

    #[test]
    fn crossing_inside_window_keeps_its_true_date() {
        let player = Uuid::new_v4();
        let history = vec![series(player, "serve", &[(0, 75), (30, 84), (60, 79)])];

        let progress = analyze_player(player, &history, AnalysisWindow::since(at(20)));
        let thresholds: Vec<(i32, DateTime<Utc>)> = progress
            .milestones
            .iter()
            .map(|m| (m.threshold, m.achieved_at))
            .collect();
        assert_eq!(thresholds, vec![(80, at(30))]);
    }

    #[test]
    fn last_days_clamps_to_one_day() {
        let now = at(10);
        assert_eq!(AnalysisWindow::last_days(0, now).since, Some(at(9)));
        assert_eq!(AnalysisWindow::last_days(7, now).since, Some(at(3)));
    }
}
