//! Plain-text report rendering. Pure string building over the final
//! search state; all percentages and orderings are computed here, never
//! stored back into the state.

use std::fmt::Write;

use lens_core::{
    ActivityReport, ApiError, CategoryShare, CommunityReport, LanguageReport, ProfileReport,
    SearchState, Slot,
};

/// Byte-weighted language shares, largest first, as "Name xx.x%" lines.
pub fn language_lines(report: &LanguageReport) -> Vec<String> {
    if report.total_bytes == 0 {
        return Vec::new();
    }
    let mut entries: Vec<(&String, &u64)> = report.languages.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    entries
        .iter()
        .map(|(name, bytes)| {
            let pct = **bytes as f64 / report.total_bytes as f64 * 100.0;
            format!("{name} {pct:.1}%")
        })
        .collect()
}

pub fn profile_summary(report: &ProfileReport) -> String {
    let user = &report.user;
    let mut out = String::new();
    let display_name = user.name.as_deref().unwrap_or(&user.login);
    let _ = writeln!(out, "{display_name} (@{})", user.login);
    if let Some(company) = user.company.as_deref().filter(|c| !c.is_empty()) {
        let _ = writeln!(out, "  company:   {company}");
    }
    if let Some(location) = user.location.as_deref().filter(|l| !l.is_empty()) {
        let _ = writeln!(out, "  location:  {location}");
    }
    let _ = writeln!(out, "  followers: {}", user.followers);
    for repo in &report.repos {
        let language = repo.language.as_deref().unwrap_or("-");
        let _ = writeln!(
            out,
            "  {} ★{} ⑂{} [{language}]",
            repo.name, repo.stargazers_count, repo.forks_count
        );
    }
    out
}

fn traffic_glyph(light: Option<&str>) -> &'static str {
    match light {
        Some("green") => "●",
        Some("yellow") => "◐",
        Some("red") => "○",
        _ => "?",
    }
}

/// Community repos ordered by composite score, highest first.
pub fn community_lines(report: &CommunityReport) -> Vec<String> {
    let mut repos: Vec<_> = report.repos.iter().collect();
    repos.sort_by(|a, b| b.community_score.cmp(&a.community_score));
    repos
        .iter()
        .map(|repo| {
            format!(
                "{} {} score {}/100 (★{} ⑂{})",
                traffic_glyph(repo.traffic_light.as_deref()),
                repo.full_name,
                repo.community_score,
                repo.stars,
                repo.forks
            )
        })
        .collect()
}

pub fn activity_summary(report: &ActivityReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "window: {} days", report.window_days);
    match report.kpis.last_active_days_ago {
        Some(0) => {
            let _ = writeln!(out, "  last active: today");
        }
        Some(days) => {
            let _ = writeln!(out, "  last active: {days} days ago");
        }
        None => {
            let _ = writeln!(out, "  last active: no public activity");
        }
    }
    let _ = writeln!(
        out,
        "  active weeks (12w): {}",
        report.kpis.active_weeks_12w
    );
    let _ = writeln!(
        out,
        "  external work: {:.0}%",
        report.kpis.external_ratio_pct
    );
    let categories = &report.all_categories;
    let shares: [(&str, CategoryShare); 6] = [
        ("build", categories.build),
        ("review", categories.review),
        ("feedback", categories.feedback),
        ("explore", categories.explore),
        ("release", categories.release),
        ("admin", categories.admin),
    ];
    for (name, share) in shares {
        if share.count > 0 {
            let _ = writeln!(out, "  {name}: {} ({:.1}%)", share.count, share.pct_total);
        }
    }
    for collab in report.top_collabs.iter().take(3) {
        let _ = writeln!(
            out,
            "  ↳ {} (PRs {}, reviews {}, issues {})",
            collab.repo, collab.prs, collab.reviews, collab.issues
        );
    }
    out
}

fn section<T>(out: &mut String, title: &str, slot: &Slot<T>, render: impl Fn(&T) -> String) {
    let _ = writeln!(out, "== {title} ==");
    match (&slot.data, &slot.error) {
        (Some(data), _) => {
            let _ = writeln!(out, "{}", render(data).trim_end());
        }
        (None, Some(error)) => {
            let _ = writeln!(out, "error: {error}");
        }
        (None, None) => {
            let _ = writeln!(out, "(no data)");
        }
    }
    out.push('\n');
}

/// Full report for a settled search state, one section per slot, with a
/// per-slot error line where a fetch failed.
pub fn render_report(state: &SearchState) -> String {
    let mut out = String::new();
    if let Some(subject) = &state.subject {
        let _ = writeln!(out, "# {subject}\n");
    }
    section(&mut out, "Profile", &state.profile, profile_summary);
    section(&mut out, "Languages", &state.languages, |report| {
        language_lines(report).join("\n")
    });
    section(&mut out, "Community", &state.community, |report| {
        community_lines(report).join("\n")
    });
    section(&mut out, "Activity", &state.activity, activity_summary);
    section(&mut out, "AI Narrative", &state.narrative, |narrative| {
        narrative.analysis.clone()
    });
    out
}

/// Convenience for exit-code decisions in main.
pub fn failed_sections(state: &SearchState) -> Vec<(&'static str, &ApiError)> {
    let mut failed = Vec::new();
    if let Some(e) = &state.profile.error {
        failed.push(("profile", e));
    }
    if let Some(e) = &state.languages.error {
        failed.push(("languages", e));
    }
    if let Some(e) = &state.community.error {
        failed.push(("community", e));
    }
    if let Some(e) = &state.activity.error {
        failed.push(("activity", e));
    }
    if let Some(e) = &state.narrative.error {
        failed.push(("narrative", e));
    }
    failed
}
