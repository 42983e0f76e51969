//! Player performance analytics.
//!
//! Turns timestamped attribute ratings into trends, milestones, progression
//! statistics, focus-area recommendations and privacy-gated team percentile
//! comparisons. The analyses are pure functions over immutable inputs; the
//! percentile snapshot cache is the only shared state.

pub mod analysis;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod focus;
pub mod league;
pub mod milestones;
pub mod models;
pub mod percentile;
pub mod progression;
pub mod report;
pub mod trend;

pub use analysis::{analyze_player, AnalysisWindow, PlayerProgress};
pub use config::AnalyticsConfig;
pub use error::{AnalyticsError, Result};
pub use focus::{recommend, FocusCandidate, PositionResolver};
pub use milestones::{detect_milestones, Milestone};
pub use models::{RatingPoint, RatingRecord, RatingSeries, TeamRatings};
pub use percentile::{PercentileComparator, PercentileSnapshot};
pub use progression::{compute_stats, ProgressionStats};
pub use trend::{classify, TrendResult};
