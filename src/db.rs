use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AnalyticsError, Result};
use crate::models::{
    MemberRatings, PlayerProfile, RatingRecord, SubAttributeRating, TeamRatings, MAX_RATING,
    MIN_RATING,
};

pub async fn init_db(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn upsert_team(pool: &PgPool, name: &str) -> Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO performance_analytics.teams (id, name)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

async fn upsert_player(
    pool: &PgPool,
    id: Uuid,
    team_id: Uuid,
    full_name: &str,
    email: &str,
    position: Option<&str>,
) -> Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO performance_analytics.players (id, team_id, full_name, email, position)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name,
            team_id = EXCLUDED.team_id,
            position = EXCLUDED.position
        RETURNING id
        "#,
    )
    .bind(id)
    .bind(team_id)
    .bind(full_name)
    .bind(email)
    .bind(position)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

/// Inserts a rating entry; returns `false` when `source_key` was already
/// imported.
async fn insert_rating(
    pool: &PgPool,
    player_id: Uuid,
    attribute: &str,
    value: i32,
    note: Option<&str>,
    recorded_at: DateTime<Utc>,
    source_key: &str,
) -> Result<bool> {
    if !(MIN_RATING..=MAX_RATING).contains(&value) {
        return Err(AnalyticsError::RatingOutOfRange {
            attribute: attribute.to_string(),
            value,
        });
    }

    let result = sqlx::query(
        r#"
        INSERT INTO performance_analytics.rating_entries
        (id, player_id, attribute, value, note, recorded_at, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(player_id)
    .bind(attribute)
    .bind(value)
    .bind(note)
    .bind(recorded_at)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

async fn upsert_sub_attribute(
    pool: &PgPool,
    player_id: Uuid,
    attribute: &str,
    sub_attribute: &str,
    value: Option<i32>,
    display_order: i32,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO performance_analytics.sub_attribute_ratings
        (player_id, attribute, sub_attribute, value, display_order)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (player_id, attribute, sub_attribute) DO UPDATE
        SET value = EXCLUDED.value,
            display_order = EXCLUDED.display_order,
            updated_at = now()
        "#,
    )
    .bind(player_id)
    .bind(attribute)
    .bind(sub_attribute)
    .bind(value)
    .bind(display_order)
    .execute(pool)
    .await?;

    Ok(())
}

const SEED_ATTRIBUTES: [(&str, [&str; 2]); 6] = [
    ("serve", ["float serve", "jump serve"]),
    ("reception", ["serve receive", "platform control"]),
    ("attack", ["spike power", "shot selection"]),
    ("block", ["timing", "hand position"]),
    ("setting", ["hand set", "tempo"]),
    ("defense", ["dig", "court coverage"]),
];

pub async fn seed(pool: &PgPool) -> Result<()> {
    let team_id = upsert_team(pool, "Harbor City Volleyball").await?;

    // (id, name, email, position, starting rating per attribute, weekly drift)
    let players = vec![
        (
            Uuid::from_u128(0x6a1f0c1e_5b7d_4c58_9a7e_2f0d7c3b9e11),
            "Lena Okafor",
            "lena.okafor@harborcityvb.org",
            Some("outside_hitter"),
            [64, 61, 68, 52, 40, 58],
            [2, 1, 3, 0, 0, 1],
        ),
        (
            Uuid::from_u128(0xb3c9e2d4_7f01_4e6a_8d2c_91a4f6e0b7c2),
            "Tomas Reyes",
            "tomas.reyes@harborcityvb.org",
            Some("setter"),
            [58, 55, 45, 50, 74, 60],
            [1, 0, 0, 1, 2, 0],
        ),
        (
            Uuid::from_u128(0x0f7d4a8b_2c6e_4b19_a5d3_6e8c1b2f9a40),
            "Ines Duarte",
            "ines.duarte@harborcityvb.org",
            Some("middle_blocker"),
            [55, 42, 66, 75, 38, 47],
            [0, 1, 1, 2, 0, 0],
        ),
        (
            Uuid::from_u128(0x9d2e6b7a_4c3f_4a81_b0e5_3f7a2c8d1e95),
            "Kai Lindqvist",
            "kai.lindqvist@harborcityvb.org",
            Some("libero"),
            [60, 78, 35, 30, 55, 80],
            [0, 2, 0, 0, 0, 2],
        ),
        (
            Uuid::from_u128(0x4e8b1c3d_9a2f_4d67_8c1e_5b0a7f3e2d68),
            "Priya Nair",
            "priya.nair@harborcityvb.org",
            Some("opposite"),
            [70, 48, 77, 66, 42, 52],
            [-1, 0, 1, 1, 0, -1],
        ),
        (
            Uuid::from_u128(0xc7a3f5e1_2b8d_4f90_a6c4_8e1d3b5f7a02),
            "Noa Haddad",
            "noa.haddad@harborcityvb.org",
            None,
            [62, 63, 61, 60, 59, 64],
            [1, 1, 1, 1, 1, 1],
        ),
    ];

    let start = Utc
        .with_ymd_and_hms(2026, 1, 5, 18, 0, 0)
        .single()
        .ok_or_else(|| AnalyticsError::Config("invalid seed start date".to_string()))?;

    for (id, name, email, position, base, drift) in players {
        let player_id = upsert_player(pool, id, team_id, name, email, position).await?;

        for (slot, (attribute, sub_attributes)) in SEED_ATTRIBUTES.iter().enumerate() {
            for week in 0..6i32 {
                let value = (base[slot] + drift[slot] * week).clamp(MIN_RATING, MAX_RATING);
                let source_key = format!("seed-{email}-{attribute}-{week}");
                insert_rating(
                    pool,
                    player_id,
                    attribute,
                    value,
                    None,
                    start + Duration::weeks(week as i64),
                    &source_key,
                )
                .await?;
            }

            let current = base[slot] + drift[slot] * 5;
            for (order, sub_attribute) in sub_attributes.iter().enumerate() {
                let offset = if order == 0 { 3 } else { -3 };
                upsert_sub_attribute(
                    pool,
                    player_id,
                    attribute,
                    sub_attribute,
                    Some((current + offset).clamp(MIN_RATING, MAX_RATING)),
                    (slot * sub_attributes.len() + order) as i32,
                )
                .await?;
            }
        }
    }

    info!(%team_id, "seeded demo team");
    Ok(())
}

pub async fn fetch_player(pool: &PgPool, email: &str) -> Result<Option<PlayerProfile>> {
    let row = sqlx::query(
        "SELECT id, team_id, full_name, email, position \
         FROM performance_analytics.players WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| PlayerProfile {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        team_id: row.get("team_id"),
        position: row.get("position"),
    }))
}

pub async fn fetch_rating_history(pool: &PgPool, player_id: Uuid) -> Result<Vec<RatingRecord>> {
    let rows = sqlx::query(
        "SELECT player_id, attribute, value, note, recorded_at \
         FROM performance_analytics.rating_entries \
         WHERE player_id = $1 \
         ORDER BY recorded_at, created_at",
    )
    .bind(player_id)
    .fetch_all(pool)
    .await?;

    let records: Vec<RatingRecord> = rows
        .into_iter()
        .map(|row| RatingRecord {
            player_id: row.get("player_id"),
            attribute: row.get("attribute"),
            value: row.get("value"),
            timestamp: row.get("recorded_at"),
            note: row.get("note"),
        })
        .collect();

    debug!(%player_id, entries = records.len(), "fetched rating history");
    Ok(records)
}

pub async fn fetch_sub_attribute_ratings(
    pool: &PgPool,
    player_id: Uuid,
) -> Result<Vec<SubAttributeRating>> {
    let rows = sqlx::query(
        "SELECT attribute, sub_attribute, value \
         FROM performance_analytics.sub_attribute_ratings \
         WHERE player_id = $1 \
         ORDER BY display_order",
    )
    .bind(player_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| SubAttributeRating {
            attribute: row.get("attribute"),
            sub_attribute: row.get("sub_attribute"),
            value: row.get("value"),
        })
        .collect())
}

/// Roster of a team with each member's latest rating per attribute.
pub async fn fetch_team_ratings(pool: &PgPool, team_id: Uuid) -> Result<TeamRatings> {
    let members = sqlx::query(
        "SELECT id, comparison_opt_out FROM performance_analytics.players WHERE team_id = $1",
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;

    let latest = sqlx::query(
        "SELECT DISTINCT ON (r.player_id, r.attribute) r.player_id, r.attribute, r.value \
         FROM performance_analytics.rating_entries r \
         JOIN performance_analytics.players p ON p.id = r.player_id \
         WHERE p.team_id = $1 \
         ORDER BY r.player_id, r.attribute, r.recorded_at DESC, r.created_at DESC",
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;

    let mut ratings: BTreeMap<Uuid, BTreeMap<String, i32>> = BTreeMap::new();
    for row in latest {
        ratings
            .entry(row.get("player_id"))
            .or_default()
            .insert(row.get("attribute"), row.get("value"));
    }

    let members = members
        .into_iter()
        .map(|row| {
            let player_id: Uuid = row.get("id");
            MemberRatings {
                player_id,
                comparison_opt_out: row.get("comparison_opt_out"),
                ratings: ratings.remove(&player_id).unwrap_or_default(),
            }
        })
        .collect();

    Ok(TeamRatings { team_id, members })
}

pub async fn set_comparison_opt_out(pool: &PgPool, player_id: Uuid, opted_out: bool) -> Result<()> {
    sqlx::query("UPDATE performance_analytics.players SET comparison_opt_out = $2 WHERE id = $1")
        .bind(player_id)
        .bind(opted_out)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        team: String,
        position: Option<String>,
        attribute: String,
        value: i32,
        note: Option<String>,
        recorded_at: DateTime<Utc>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let team_id = upsert_team(pool, &row.team).await?;
        let player_id = upsert_player(
            pool,
            Uuid::new_v4(),
            team_id,
            &row.full_name,
            &row.email,
            row.position.as_deref(),
        )
        .await?;

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_rating(
            pool,
            player_id,
            &row.attribute,
            row.value,
            row.note.as_deref(),
            row.recorded_at,
            &source_key,
        )
        .await?
        {
            inserted += 1;
        }
    }

    info!(inserted, path = %csv_path.display(), "imported rating entries");
    Ok(inserted)
}
