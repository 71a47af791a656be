//! Terminal output for pipeline results and memory logs.
//!
//! The report goes to stdout unchanged; run details are printed after it as a
//! short aligned card so the report itself stays copy-pasteable.

use clauselens_core::model::{FinalResult, MemoryRecord};

const MAX_QUESTION_CHARS: usize = 72;

// ── Public API ──

/// Print the rendered report followed by a details card.
pub fn print_result(result: &FinalResult, report: &str) {
    println!("{report}");
    println!();
    println!("--- details ---");

    let domains = result
        .selected_domains
        .iter()
        .map(|d| d.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let rows: Vec<(&str, String)> = vec![
        ("contract_id", result.contract_id.clone()),
        ("intent", result.intent.to_string()),
        ("evidence_score", fmt_score(result.evidence_score)),
        ("no_evidence", yes_no(result.no_evidence)),
        ("selected_domains", if domains.is_empty() { "-".into() } else { domains }),
        (
            "confidence",
            fmt_score(result.confidence.as_ref().and_then(|c| c.overall_avg)),
        ),
        ("high_risk_evidence", result.high_risk_evidence.len().to_string()),
        (
            "prior_records",
            result
                .memory
                .as_ref()
                .map_or_else(|| "-".into(), |m| m.prior_records.to_string()),
        ),
        (
            "closest_prior",
            fmt_score(result.memory.as_ref().and_then(|m| m.closest_prior_similarity)),
        ),
    ];
    print_rows(&rows);
}

/// Print every stored record for `contract_id` as a card.
pub fn print_memory(contract_id: &str, records: &[MemoryRecord]) {
    println!("=== {contract_id} ===");
    if records.is_empty() {
        println!("  (no records)");
        return;
    }
    println!("{} record(s)", records.len());

    for (i, record) in records.iter().enumerate() {
        println!();
        println!("Record {}", i + 1);
        let json = &record.final_json;
        let rows: Vec<(&str, String)> = vec![
            ("type", record.kind.clone()),
            ("timestamp", record.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
            ("question", clip(&record.question)),
            ("intent", json_str(json, "intent")),
            ("overall_risk", json_str(&json["analysis"], "overall_risk")),
            ("no_evidence", json_str(json, "no_evidence")),
        ];
        print_rows(&rows);
    }
}

// ── Formatting helpers ──

fn print_rows(rows: &[(&str, String)]) {
    for (key, value) in rows {
        println!("  {key:<26} {value}");
    }
}

fn fmt_score(score: Option<f32>) -> String {
    score.map_or_else(|| "-".into(), |s| format!("{s:.3}"))
}

fn yes_no(b: bool) -> String {
    (if b { "yes" } else { "no" }).to_string()
}

fn json_str(value: &serde_json::Value, key: &str) -> String {
    match &value[key] {
        serde_json::Value::Null => "-".into(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => yes_no(*b),
        other => other.to_string(),
    }
}

fn clip(s: &str) -> String {
    match s.char_indices().nth(MAX_QUESTION_CHARS) {
        Some((i, _)) => format!("{}...", &s[..i]),
        None => s.to_string(),
    }
}
