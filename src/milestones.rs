use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::RatingSeries;

pub const THRESHOLDS: [i32; 3] = [70, 80, 90];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneCategory {
    Good,
    Excellent,
    Elite,
}

impl MilestoneCategory {
    pub fn for_threshold(threshold: i32) -> Self {
        match threshold {
            90.. => MilestoneCategory::Elite,
            80..=89 => MilestoneCategory::Excellent,
            _ => MilestoneCategory::Good,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MilestoneCategory::Good => "good",
            MilestoneCategory::Excellent => "excellent",
            MilestoneCategory::Elite => "elite",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Milestone {
    pub attribute: String,
    pub threshold: i32,
    pub achieved_at: DateTime<Utc>,
    pub category: MilestoneCategory,
    pub value: i32,
}

/// First crossing of each threshold, in chronological order.
pub fn detect_milestones(series: &RatingSeries) -> Vec<Milestone> {
    let mut achieved = [false; THRESHOLDS.len()];
    let mut milestones = Vec::new();

    for point in series.points() {
        for (slot, threshold) in THRESHOLDS.iter().enumerate() {
            if achieved[slot] || point.value < *threshold {
                continue;
            }

            achieved[slot] = true;
            milestones.push(Milestone {
                attribute: series.attribute().to_string(),
                threshold: *threshold,
                achieved_at: point.timestamp,
                category: MilestoneCategory::for_threshold(*threshold),
                value: point.value,
            });
        }

        if achieved.iter().all(|done| *done) {
            break;
        }
    }

    milestones
}

/// Stable chronological merge of per-attribute milestone lists. Milestones
/// sharing a timestamp keep the order of the input lists.
pub fn merge_chronological(lists: Vec<Vec<Milestone>>) -> Vec<Milestone> {
    let mut merged: Vec<Milestone> = lists.into_iter().flatten().collect();
    merged.sort_by_key(|milestone| milestone.achieved_at);
    merged
}
