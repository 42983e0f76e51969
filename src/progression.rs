use serde::Serialize;

use crate::models::RatingSeries;

pub const PLATEAU_STEP_LIMIT: i32 = 3;

pub const PLATEAU_MIN_STEPS: usize = 3;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ProgressionStats {
    pub count: usize,
    pub average: f64,
    pub max: i32,
    pub min: i32,
    pub total_improvement: i32,
    pub average_step_change: f64,
    pub plateau_count: usize,
}

pub fn compute_stats(series: &RatingSeries) -> ProgressionStats {
    let points = series.points();
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return ProgressionStats::default(),
    };

    let total: i64 = points.iter().map(|p| p.value as i64).sum();
    let max = points.iter().map(|p| p.value).max().unwrap_or(0);
    let min = points.iter().map(|p| p.value).min().unwrap_or(0);

    let moves: Vec<i32> = points
        .iter()
        .filter_map(|p| p.change)
        .filter(|change| *change != 0)
        .collect();
    let average_step_change = if moves.is_empty() {
        0.0
    } else {
        moves.iter().map(|c| *c as f64).sum::<f64>() / moves.len() as f64
    };

    let steps: Vec<i32> = points.iter().filter_map(|p| p.change).collect();

    ProgressionStats {
        count: points.len(),
        average: total as f64 / points.len() as f64,
        max,
        min,
        total_improvement: last.value - first.value,
        average_step_change,
        plateau_count: count_plateaus(&steps),
    }
}

// a run still open at the end of the series counts
pub fn count_plateaus(steps: &[i32]) -> usize {
    let mut plateaus = 0;
    let mut run = 0usize;

    for step in steps {
        if step.abs() < PLATEAU_STEP_LIMIT {
            run += 1;
        } else {
            if run >= PLATEAU_MIN_STEPS {
                plateaus += 1;
            }
            run = 0;
        }
    }

    if run >= PLATEAU_MIN_STEPS {
        plateaus += 1;
    }

    plateaus
}
