use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AnalyticsError, Result};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 99;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingRecord {
    pub player_id: Uuid,
    pub attribute: String,
    pub value: i32,
    pub timestamp: DateTime<Utc>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingPoint {
    pub timestamp: DateTime<Utc>,
    pub value: i32,
    pub change: Option<i32>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RatingSeries {
    player_id: Uuid,
    attribute: String,
    points: Vec<RatingPoint>,
}

impl RatingSeries {
    pub fn new(player_id: Uuid, attribute: impl Into<String>) -> Self {
        Self {
            player_id,
            attribute: attribute.into(),
            points: Vec::new(),
        }
    }

    pub fn push(
        &mut self,
        timestamp: DateTime<Utc>,
        value: i32,
        note: Option<String>,
    ) -> Result<()> {
        if !(MIN_RATING..=MAX_RATING).contains(&value) {
            return Err(AnalyticsError::RatingOutOfRange {
                attribute: self.attribute.clone(),
                value,
            });
        }

        let change = match self.points.last() {
            Some(previous) if timestamp < previous.timestamp => {
                return Err(AnalyticsError::NonMonotonicTimestamp {
                    attribute: self.attribute.clone(),
                    previous: previous.timestamp,
                    timestamp,
                });
            }
            Some(previous) => Some(value - previous.value),
            None => None,
        };

        self.points.push(RatingPoint {
            timestamp,
            value,
            change,
            note,
        });
        Ok(())
    }

    pub fn player_id(&self) -> Uuid {
        self.player_id
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn points(&self) -> &[RatingPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&RatingPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&RatingPoint> {
        self.points.last()
    }

    /// Points at or after `cutoff`; the first retained point has no `change`.
    pub fn since(&self, cutoff: DateTime<Utc>) -> RatingSeries {
        let mut points: Vec<RatingPoint> = self
            .points
            .iter()
            .filter(|point| point.timestamp >= cutoff)
            .cloned()
            .collect();

        if let Some(first) = points.first_mut() {
            first.change = None;
        }

        RatingSeries {
            player_id: self.player_id,
            attribute: self.attribute.clone(),
            points,
        }
    }
}

pub fn group_records(records: &[RatingRecord]) -> Result<Vec<RatingSeries>> {
    let mut index: std::collections::HashMap<(Uuid, &str), usize> =
        std::collections::HashMap::new();
    let mut series: Vec<RatingSeries> = Vec::new();

    for record in records {
        let slot = *index
            .entry((record.player_id, record.attribute.as_str()))
            .or_insert_with(|| {
                series.push(RatingSeries::new(record.player_id, record.attribute.clone()));
                series.len() - 1
            });

        series[slot].push(record.timestamp, record.value, record.note.clone())?;
    }

    Ok(series)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub team_id: Uuid,
    pub position: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubAttributeRating {
    pub attribute: String,
    pub sub_attribute: String,
    pub value: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRatings {
    pub player_id: Uuid,
    pub comparison_opt_out: bool,
    pub ratings: BTreeMap<String, i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRatings {
    pub team_id: Uuid,
    pub members: Vec<MemberRatings>,
}

impl TeamRatings {
    pub fn team_size(&self) -> usize {
        self.members.len()
    }

    pub fn member(&self, player_id: Uuid) -> Option<&MemberRatings> {
        self.members.iter().find(|member| member.player_id == player_id)
    }

    pub fn roster(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.members.iter().map(|member| member.player_id).collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
pub(crate) fn series_from_values(values: &[i32]) -> RatingSeries {
    attribute_series("serve", values)
}

#[cfg(test)]
pub(crate) fn attribute_series(attribute: &str, values: &[i32]) -> RatingSeries {
    let start = DateTime::parse_from_rfc3339("2026-01-05T18:00:00Z")
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap();
    let mut series = RatingSeries::new(Uuid::nil(), attribute);
    for (i, value) in values.iter().enumerate() {
        series
            .push(start + chrono::Duration::days(i as i64 * 7), *value, None)
            .unwrap();
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(day: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-02-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::days(day)
    }

    #[test]
    fn push_derives_change_from_previous_point() {
        let series = series_from_values(&[50, 55, 52]);
        let changes: Vec<Option<i32>> = series.points().iter().map(|p| p.change).collect();
        assert_eq!(changes, vec![None, Some(5), Some(-3)]);
    }

    #[test]
    fn push_rejects_earlier_timestamp() {
        let mut series = RatingSeries::new(Uuid::new_v4(), "defense");
        series.push(at(3), 60, None).unwrap();
        let err = series.push(at(1), 62, None).unwrap_err();
        assert!(matches!(err, AnalyticsError::NonMonotonicTimestamp { .. }));
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn push_accepts_equal_timestamps() {
        let mut series = RatingSeries::new(Uuid::new_v4(), "defense");
        series.push(at(3), 60, None).unwrap();
        series.push(at(3), 61, Some("same session".to_string())).unwrap();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn push_rejects_out_of_range_values() {
        let mut series = RatingSeries::new(Uuid::new_v4(), "attack");
        assert!(series.push(at(0), 0, None).is_err());
        assert!(series.push(at(0), 100, None).is_err());
        assert!(series.is_empty());
    }

    #[test]
    fn since_drops_change_of_first_retained_point() {
        let series = series_from_values(&[40, 45, 50, 58]);
        let cutoff = series.points()[2].timestamp;
        let windowed = series.since(cutoff);
        assert_eq!(windowed.len(), 2);
        assert_eq!(windowed.points()[0].change, None);
        assert_eq!(windowed.points()[1].change, Some(8));
    }

    #[test]
    fn group_records_splits_by_attribute() {
        let player_id = Uuid::new_v4();
        let records = vec![
            RatingRecord {
                player_id,
                attribute: "serve".to_string(),
                value: 60,
                timestamp: at(0),
                note: None,
            },
            RatingRecord {
                player_id,
                attribute: "block".to_string(),
                value: 45,
                timestamp: at(1),
                note: None,
            },
            RatingRecord {
                player_id,
                attribute: "serve".to_string(),
                value: 64,
                timestamp: at(2),
                note: None,
            },
        ];

        let series = group_records(&records).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].attribute(), "serve");
        assert_eq!(series[0].len(), 2);
        assert_eq!(series[0].last().map(|p| p.change), Some(Some(4)));
        assert_eq!(series[1].attribute(), "block");
    }
}
