use std::fmt::Write;

use crate::analysis::PlayerProgress;
use crate::focus::FocusCandidate;
use crate::league::LeagueTable;
use crate::models::PlayerProfile;
use crate::percentile::PercentileSnapshot;

pub fn build_report(
    profile: &PlayerProfile,
    progress: &PlayerProgress,
    focus: &[FocusCandidate],
    comparison: Option<&PercentileSnapshot>,
    league: &LeagueTable,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Player Progress Report");
    let window_label = match progress.window.since {
        Some(since) => format!("ratings since {}", since.date_naive()),
        None => "full rating history".to_string(),
    };
    let _ = writeln!(
        output,
        "Generated for {} ({}, {})",
        profile.full_name,
        profile.position.as_deref().unwrap_or("universal"),
        window_label
    );

    let composite = progress.composite_score();
    if let Some(tier) = league.tier_for(composite) {
        let _ = writeln!(output, "Composite {} places in the {} tier.", composite, tier.name);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Attribute Trends");

    if progress.attributes.is_empty() {
        let _ = writeln!(output, "No ratings recorded for this window.");
    } else {
        for attribute in progress.attributes.iter() {
            let _ = writeln!(
                output,
                "- {}: {} ({:+} over recent entries, {:+.2} per entry), latest {}",
                attribute.attribute,
                attribute.trend.category.label(),
                attribute.trend.total_change,
                attribute.trend.rate,
                attribute
                    .latest
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "n/a".to_string())
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Progression");

    for attribute in progress.attributes.iter().filter(|a| a.stats.count > 0) {
        let stats = &attribute.stats;
        let _ = writeln!(
            output,
            "- {}: avg {:.1}, range {}-{}, total {:+}, avg move {:+.1}, plateaus {}",
            attribute.attribute,
            stats.average,
            stats.min,
            stats.max,
            stats.total_improvement,
            stats.average_step_change,
            stats.plateau_count
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Milestones");

    if progress.milestones.is_empty() {
        let _ = writeln!(output, "No milestones reached in this window.");
    } else {
        for milestone in progress.milestones.iter() {
            let _ = writeln!(
                output,
                "- {} reached {} ({}) on {}",
                milestone.attribute,
                milestone.threshold,
                milestone.category.label(),
                milestone.achieved_at.date_naive()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommended Focus Areas");

    if focus.is_empty() {
        let _ = writeln!(output, "No rated sub-attributes to recommend from.");
    } else {
        for (rank, candidate) in focus.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. {} / {}: current {}, headroom {}, impact {:.2}",
                rank + 1,
                candidate.attribute,
                candidate.sub_attribute,
                candidate.current_value,
                candidate.max_improvement,
                candidate.impact_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Team Comparison");

    match comparison {
        None => {
            let _ = writeln!(output, "Team comparison is not available.");
        }
        Some(snapshot) => {
            for (attribute, percentile) in snapshot.percentiles.iter() {
                let _ = writeln!(output, "- {}: {}th percentile", attribute, percentile);
            }
            if !snapshot.strengths.is_empty() {
                let _ = writeln!(output, "Strengths: {}", snapshot.strengths.join(", "));
            }
            if !snapshot.improvements.is_empty() {
                let _ = writeln!(output, "Room to grow: {}", snapshot.improvements.join(", "));
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze_player, AnalysisWindow};
    use crate::models::attribute_series;
    use uuid::Uuid;

    fn profile() -> PlayerProfile {
        PlayerProfile {
            id: Uuid::nil(),
            full_name: "Lena Okafor".to_string(),
            email: "lena.okafor@example.com".to_string(),
            team_id: Uuid::new_v4(),
            position: Some("outside_hitter".to_string()),
        }
    }

    #[test]
    fn report_lists_trends_and_milestones() {
        let history = vec![attribute_series("attack", &[64, 67, 70, 73, 76, 79])];
        let progress = analyze_player(Uuid::nil(), &history, AnalysisWindow::all());

        let report = build_report(&profile(), &progress, &[], None, &LeagueTable::default());
        assert!(report.contains("- attack: improving"));
        assert!(report.contains("attack reached 70 (good)"));
        assert!(report.contains("Team comparison is not available."));
        assert!(report.contains("Recreational tier"));
    }

    #[test]
    fn empty_progress_renders_placeholders() {
        let progress = analyze_player(Uuid::nil(), &[], AnalysisWindow::all());
        let report = build_report(&profile(), &progress, &[], None, &LeagueTable::default());
        assert!(report.contains("No ratings recorded for this window."));
        assert!(report.contains("No milestones reached in this window."));
    }
}
