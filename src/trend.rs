use serde::Serialize;

use crate::models::RatingSeries;

pub const TREND_WINDOW: usize = 5;

pub const SIGNIFICANT_CHANGE: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendCategory {
    Improving,
    SlightlyImproving,
    Stable,
    SlightlyDeclining,
    Declining,
}

impl TrendCategory {
    pub fn label(&self) -> &'static str {
        match self {
            TrendCategory::Improving => "improving",
            TrendCategory::SlightlyImproving => "slightly improving",
            TrendCategory::Stable => "stable",
            TrendCategory::SlightlyDeclining => "slightly declining",
            TrendCategory::Declining => "declining",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendResult {
    pub category: TrendCategory,
    pub total_change: i32,
    pub direction: Direction,
    /// Change per entry across the evaluation window.
    pub rate: f64,
}

impl TrendResult {
    pub fn neutral() -> Self {
        Self {
            category: TrendCategory::Stable,
            total_change: 0,
            direction: Direction::Stable,
            rate: 0.0,
        }
    }
}

pub fn classify(series: &RatingSeries) -> TrendResult {
    let points = series.points();
    if points.len() < 2 {
        return TrendResult::neutral();
    }

    let window = &points[points.len().saturating_sub(TREND_WINDOW)..];
    let total_change = window[window.len() - 1].value - window[0].value;

    let (positive_steps, negative_steps) =
        window
            .windows(2)
            .fold((0usize, 0usize), |(up, down), pair| {
                let step = pair[1].value - pair[0].value;
                match step.signum() {
                    1 => (up + 1, down),
                    -1 => (up, down + 1),
                    _ => (up, down),
                }
            });

    let (category, direction) = if total_change.abs() >= SIGNIFICANT_CHANGE {
        if total_change > 0 {
            (TrendCategory::Improving, Direction::Up)
        } else {
            (TrendCategory::Declining, Direction::Down)
        }
    } else if positive_steps > negative_steps {
        (TrendCategory::SlightlyImproving, Direction::Up)
    } else if negative_steps > positive_steps {
        (TrendCategory::SlightlyDeclining, Direction::Down)
    } else {
        (TrendCategory::Stable, Direction::Stable)
    };

    TrendResult {
        category,
        total_change,
        direction,
        rate: total_change as f64 / window.len() as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::series_from_values;

    #[test]
    fn short_series_are_stable() {
        assert_eq!(classify(&series_from_values(&[])), TrendResult::neutral());
        assert_eq!(classify(&series_from_values(&[72])), TrendResult::neutral());
    }

    #[test]
    fn large_window_change_is_improving() {
        let trend = classify(&series_from_values(&[50, 52, 53, 55, 57]));
        assert_eq!(trend.category, TrendCategory::Improving);
        assert_eq!(trend.direction, Direction::Up);
        assert_eq!(trend.total_change, 7);
        assert!((trend.rate - 1.4).abs() < 1e-9);
    }

    #[test]
    fn large_window_drop_is_declining() {
        let trend = classify(&series_from_values(&[70, 68, 64]));
        assert_eq!(trend.category, TrendCategory::Declining);
        assert_eq!(trend.direction, Direction::Down);
        assert_eq!(trend.total_change, -6);
        assert!((trend.rate + 2.0).abs() < 1e-9);
    }

    #[test]
    fn only_last_five_points_are_considered() {
        // 30 -> 60 happens before the window; window is 60,61,60,61,62
        let trend = classify(&series_from_values(&[30, 60, 61, 60, 61, 62]));
        assert_eq!(trend.total_change, 2);
        assert_eq!(trend.category, TrendCategory::SlightlyImproving);
    }

    #[test]
    fn more_drops_than_gains_is_slightly_declining() {
        let trend = classify(&series_from_values(&[60, 59, 60, 59, 58]));
        assert_eq!(trend.category, TrendCategory::SlightlyDeclining);
        assert_eq!(trend.direction, Direction::Down);
    }

    #[test]
    fn balanced_steps_are_stable() {
        let trend = classify(&series_from_values(&[60, 62, 60, 62, 60]));
        assert_eq!(trend.category, TrendCategory::Stable);
        assert_eq!(trend.direction, Direction::Stable);
        assert_eq!(trend.rate, 0.0);
    }

    #[test]
    fn flat_series_is_stable() {
        let trend = classify(&series_from_values(&[45, 45]));
        assert_eq!(trend.category, TrendCategory::Stable);
        assert_eq!(trend.total_change, 0);
    }
}
