use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Rating for {attribute} recorded at {timestamp} precedes previous point at {previous}")]
    NonMonotonicTimestamp {
        attribute: String,
        previous: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    #[error("Rating {value} for {attribute} is outside 1..=99")]
    RatingOutOfRange { attribute: String, value: i32 },

    #[error("Player {player_id} is not on team {team_id}")]
    PlayerNotOnTeam { team_id: Uuid, player_id: Uuid },

    #[error("Player {player_id} appears more than once on team {team_id}")]
    DuplicateTeamMember { team_id: Uuid, player_id: Uuid },

    #[error("Invalid weight table for position {position}: {reason}")]
    InvalidWeightTable { position: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<toml::de::Error> for AnalyticsError {
    fn from(err: toml::de::Error) -> Self {
        AnalyticsError::Config(err.to_string())
    }
}
