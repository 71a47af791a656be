//! Legal: termination for breach and limitation of liability.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use clauselens_ai::Topic;
use clauselens_core::config::RiskThresholds;
use clauselens_core::model::RiskLevel;
use clauselens_core::text::{collapse_whitespace, contains_any, contains_term};

use super::{Assessment, TopicClauses, day_counts, first_day_count, worst_statement};

const NO_CLAUSE: &str =
    "No relevant clause identified for termination or limitation of liability in the provided text.";

static CAP_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:capped at|cap of|limited to|shall not exceed)\s+[^,.;]+")
        .expect("static regex")
});

static CARVE_OUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:except|excluding)\b[^.;]*").expect("static regex"));

static CURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcure[sd]?\b").expect("static regex"));

/// Bytes between two non-overlapping spans; zero when they touch or overlap.
fn distance(a: &Range<usize>, b: &Range<usize>) -> usize {
    if a.end <= b.start {
        b.start - a.end
    } else {
        a.start.saturating_sub(b.end)
    }
}

/// The day count written nearest to a "cure" mention, in either order
/// ("30 days cure", "fails to cure within 5 days").
fn cure_days(clause: &str) -> Option<u32> {
    let cures: Vec<Range<usize>> = CURE.find_iter(clause).map(|m| m.range()).collect();
    day_counts(clause)
        .into_iter()
        .filter_map(|(span, days)| {
            let nearest = cures.iter().map(|c| distance(&span, c)).min()?;
            Some((nearest, days))
        })
        .min_by_key(|(nearest, _)| *nearest)
        .map(|(_, days)| days)
}

fn termination_signal(clause: &str, t: &RiskThresholds) -> (RiskLevel, String) {
    let low = clause.to_lowercase();
    if contains_term(&low, "immediately") || low.contains("without notice") {
        return (
            RiskLevel::High,
            "Termination may take effect immediately or without notice.".into(),
        );
    }

    let grade = |d: u32| {
        if d < t.cure_high_below_days {
            RiskLevel::High
        } else if d < t.cure_medium_below_days {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    };
    if let Some(d) = cure_days(clause) {
        return (grade(d), format!("Termination provides a {d}-day cure period."));
    }
    match first_day_count(clause) {
        Some(d) => (grade(d), format!("Termination requires {d} days of notice.")),
        None => (
            RiskLevel::Low,
            "Termination for breach includes a cure/notice framework in the termination clause."
                .into(),
        ),
    }
}

fn quoted(re: &Regex, clause: &str) -> Option<String> {
    re.find(clause)
        .map(|m| collapse_whitespace(m.as_str()).trim_end().to_string())
        .filter(|s| !s.is_empty())
}

fn liability_signal(clause: &str) -> (RiskLevel, Vec<String>) {
    let low = clause.to_lowercase();
    let uncapped = contains_any(&low, &["uncapped", "unlimited"]);
    let carve_out = contains_any(&low, &["except", "excluding"]);
    let capped = contains_any(&low, &["cap", "capped", "fees paid"]);
    let cap = quoted(&CAP_PHRASE, clause);

    let level = if uncapped && !(carve_out && capped) {
        RiskLevel::High
    } else {
        RiskLevel::Medium
    };

    let mut findings = Vec::new();
    if let Some(cap) = &cap {
        findings.push(format!("Limitation of Liability sets a cap: \"{cap}\"."));
    }
    if uncapped {
        match quoted(&CARVE_OUT, clause).filter(|_| carve_out) {
            Some(exception) => findings.push(format!(
                "The liability cap has a carve-out: \"{exception}\"."
            )),
            None => findings.push("Liability is stated as uncapped or unlimited.".into()),
        }
    }
    if findings.is_empty() {
        findings.push("Limitation of Liability language is present in the provided text.".into());
    }
    (level, findings)
}

pub fn assess(clauses: &TopicClauses, t: &RiskThresholds) -> Assessment {
    let termination = worst_statement(clauses, Topic::Termination, |c| termination_signal(c, t));
    let liability = worst_statement(clauses, Topic::Liability, liability_signal);
    if termination.is_none() && liability.is_none() {
        return Assessment::no_clause(NO_CLAUSE);
    }

    let mut levels = Vec::new();
    let mut findings = Vec::new();
    let mut evidence = Vec::new();
    let mut basis = Vec::new();

    if let Some((clause, level, finding)) = termination {
        levels.push(level);
        findings.push(finding);
        evidence.push(Assessment::evidence(Topic::Termination.heading(), clause));
        basis.push("the termination-for-breach framework");
    }
    if let Some((clause, level, mut notes)) = liability {
        levels.push(level);
        findings.append(&mut notes);
        evidence.push(Assessment::evidence(Topic::Liability.heading(), clause));
        basis.push("the liability cap structure");
    }

    Assessment {
        level: RiskLevel::max_of(levels),
        findings,
        evidence,
        basis,
    }
}
