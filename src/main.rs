use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

use player_performance_analytics::config::AnalyticsConfig;
use player_performance_analytics::focus::{self, FixedPosition, PositionResolver};
use player_performance_analytics::models::{self, PlayerProfile};
use player_performance_analytics::{db, report, AnalysisWindow, PercentileComparator};

#[derive(Parser)]
#[command(name = "player-analytics")]
#[command(about = "Player performance analytics for coaches and players", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo team with rating history
    Seed,
    /// Import rating entries from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Trends, progression statistics and milestones for a player
    Progress {
        #[arg(long)]
        email: String,
        /// Only consider ratings from the last N days
        #[arg(long)]
        since_days: Option<i64>,
        #[arg(long)]
        json: bool,
    },
    /// Recommend sub-attributes to focus on
    Focus {
        #[arg(long)]
        email: String,
        #[arg(long)]
        top: Option<usize>,
        /// Weight by the recorded position only, never inferred from ratings
        #[arg(long)]
        recorded_position: bool,
        #[arg(long)]
        json: bool,
    },
    /// Percentile comparison against the player's team
    Compare {
        #[arg(long)]
        email: String,
        #[arg(long)]
        json: bool,
    },
    /// Stop including a player in team comparisons
    OptOut {
        #[arg(long)]
        email: String,
    },
    /// Allow team comparisons for a player again
    OptIn {
        #[arg(long)]
        email: String,
    },
    /// Generate a markdown progress report
    Report {
        #[arg(long)]
        email: String,
        #[arg(long)]
        since_days: Option<i64>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

async fn require_player(pool: &PgPool, email: &str) -> anyhow::Result<PlayerProfile> {
    db::fetch_player(pool, email)
        .await?
        .with_context(|| format!("no player with email {email}"))
}

fn window_for(since_days: Option<i64>) -> AnalysisWindow {
    match since_days {
        Some(days) => AnalysisWindow::last_days(days, Utc::now()),
        None => AnalysisWindow::all(),
    }
}

async fn player_progress(
    pool: &PgPool,
    profile: &PlayerProfile,
    window: AnalysisWindow,
) -> anyhow::Result<player_performance_analytics::PlayerProgress> {
    let records = db::fetch_rating_history(pool, profile.id).await?;
    let series = models::group_records(&records)
        .context("stored rating history is not chronological")?;
    Ok(player_performance_analytics::analyze_player(profile.id, &series, window))
}

async fn focus_areas(
    pool: &PgPool,
    config: &AnalyticsConfig,
    profile: &PlayerProfile,
    top_n: usize,
    recorded_position: bool,
) -> anyhow::Result<Vec<focus::FocusCandidate>> {
    let current = db::fetch_sub_attribute_ratings(pool, profile.id).await?;
    let fixed = FixedPosition {
        fallback: config.focus.universal.fallback_position.clone(),
    };
    let resolver: &dyn PositionResolver = if recorded_position {
        &fixed
    } else {
        &config.focus.universal
    };
    let position = resolver.resolve(profile, &current);
    let weights = config.focus.weights.weights_for(&position)?;
    Ok(focus::recommend(&current, &weights, top_n))
}

async fn comparison(
    pool: &PgPool,
    comparator: &PercentileComparator,
    profile: &PlayerProfile,
) -> anyhow::Result<Option<player_performance_analytics::PercentileSnapshot>> {
    let team = db::fetch_team_ratings(pool, profile.team_id).await?;
    Ok(comparator.compute_snapshot(&team, profile.id)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AnalyticsConfig::load(cli.config.as_deref()).context("failed to load config")?;
    let database_url = config.database_url()?.to_string();

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    let comparator = PercentileComparator::new(config.cache_ttl());

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} rating entries from {}.", csv.display());
        }
        Commands::Progress {
            email,
            since_days,
            json,
        } => {
            let profile = require_player(&pool, &email).await?;
            let progress = player_progress(&pool, &profile, window_for(since_days)).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&progress)?);
                return Ok(());
            }

            if progress.attributes.is_empty() {
                println!("No ratings found for this window.");
                return Ok(());
            }

            println!("Progress for {}:", profile.full_name);
            for attribute in progress.attributes.iter() {
                println!(
                    "- {}: {} ({:+}), avg {:.1}, plateaus {}",
                    attribute.attribute,
                    attribute.trend.category.label(),
                    attribute.trend.total_change,
                    attribute.stats.average,
                    attribute.stats.plateau_count
                );
            }
            for milestone in progress.milestones.iter() {
                println!(
                    "* {} reached {} ({}) on {}",
                    milestone.attribute,
                    milestone.threshold,
                    milestone.category.label(),
                    milestone.achieved_at.date_naive()
                );
            }
        }
        Commands::Focus {
            email,
            top,
            recorded_position,
            json,
        } => {
            let profile = require_player(&pool, &email).await?;
            let top_n = top.unwrap_or(config.focus.top_n);
            let candidates =
                focus_areas(&pool, &config, &profile, top_n, recorded_position).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&candidates)?);
                return Ok(());
            }

            if candidates.is_empty() {
                println!("No rated sub-attributes found.");
                return Ok(());
            }

            println!("Recommended focus areas for {}:", profile.full_name);
            for candidate in candidates.iter() {
                println!(
                    "- {} / {}: current {}, impact {:.2}",
                    candidate.attribute,
                    candidate.sub_attribute,
                    candidate.current_value,
                    candidate.impact_score
                );
            }
        }
        Commands::Compare { email, json } => {
            let profile = require_player(&pool, &email).await?;
            let snapshot = comparison(&pool, &comparator, &profile).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
                return Ok(());
            }

            match snapshot {
                None => println!("Team comparison is not available."),
                Some(snapshot) => {
                    println!("Percentiles within team ({} players):", snapshot.team_size);
                    for (attribute, percentile) in snapshot.percentiles.iter() {
                        println!("- {attribute}: {percentile}");
                    }
                }
            }
        }
        Commands::OptOut { email } => {
            let profile = require_player(&pool, &email).await?;
            comparator.opt_out(profile.id);
            db::set_comparison_opt_out(&pool, profile.id, true).await?;
            println!("{} no longer appears in team comparisons.", profile.full_name);
        }
        Commands::OptIn { email } => {
            let profile = require_player(&pool, &email).await?;
            db::set_comparison_opt_out(&pool, profile.id, false).await?;
            comparator.opt_in(profile.id);
            println!("{} can see team comparisons again.", profile.full_name);
        }
        Commands::Report {
            email,
            since_days,
            out,
        } => {
            let profile = require_player(&pool, &email).await?;
            let progress = player_progress(&pool, &profile, window_for(since_days)).await?;
            let candidates = focus_areas(&pool, &config, &profile, config.focus.top_n, false).await?;
            let snapshot = comparison(&pool, &comparator, &profile).await?;

            let report = report::build_report(
                &profile,
                &progress,
                &candidates,
                snapshot.as_ref(),
                &config.league,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
