//! Topic rules: which clause statements belong to which clause family.
//!
//! Each [`Topic`] has an inclusion list (any term must match), an optional
//! qualifier list (any term must also match) and an exclusion list (no term may
//! match). Isolation is strict: every topic other than liability rejects
//! liability and cap vocabulary, and liability rejects termination, payment,
//! SLA and audit vocabulary, so one sentence never lands under two unrelated
//! headings.

use std::fmt;

use clauselens_core::model::RetrievalMatch;
use clauselens_core::text::{contains_any, tokenize, truncate_chars};

use crate::clauses::statements;

/// Longest topic statement kept, in characters.
pub const MAX_STATEMENT_CHARS: usize = 320;

const LIABILITY_MARKERS: &[&str] = &[
    "liabilit",
    "limitation of liability",
    "capped",
    "uncapped",
    "cap at",
    "cap of",
    "cap on",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    Privacy,
    Availability,
    Payment,
    LateFees,
    Termination,
    Liability,
    Sla,
    Audit,
    Compliance,
}

/// Inclusion, qualifier and exclusion terms for one topic.
#[derive(Debug)]
pub struct TopicRule {
    pub include: &'static [&'static str],
    pub qualifier: &'static [&'static str],
    pub exclude: &'static [&'static str],
    /// Whether liability vocabulary also excludes.
    pub exclude_liability: bool,
}

impl TopicRule {
    /// Every term that rejects a statement for this topic.
    pub fn exclusion_terms(&self) -> Vec<&'static str> {
        let mut terms = self.exclude.to_vec();
        if self.exclude_liability {
            terms.extend_from_slice(LIABILITY_MARKERS);
        }
        terms
    }
}

const PRIVACY: TopicRule = TopicRule {
    include: &["privacy", "data protection", "personal data", "customer data"],
    qualifier: &[],
    exclude: &[
        "payment", "late", "interest", "invoice", "terminat", "uptime", "availability", "sla",
        "audit",
    ],
    exclude_liability: true,
};

const AVAILABILITY: TopicRule = TopicRule {
    include: &[
        "service availability",
        "availability",
        "available",
        "uptime",
        "% of the time",
        "scheduled maintenance",
    ],
    qualifier: &[],
    exclude: &[
        "payment",
        "late",
        "interest",
        "invoice",
        "terminat",
        "compliance",
        "service credit",
    ],
    exclude_liability: true,
};

const PAYMENT: TopicRule = TopicRule {
    include: &["pay"],
    qualifier: &["invoic", "due", "within", "upon receipt", "net "],
    exclude: &["late", "interest", "penalt", "per month", "overdue"],
    exclude_liability: true,
};

const LATE_FEES: TopicRule = TopicRule {
    include: &["late", "overdue", "delinquent", "interest"],
    qualifier: &["interest", "%", "per month", "penalt", "charge"],
    exclude: &["undisputed", "interest-free", "interest free"],
    exclude_liability: true,
};

const TERMINATION: TopicRule = TopicRule {
    include: &["terminat", "breach", "cure"],
    qualifier: &[],
    exclude: &[
        "payment",
        "interest",
        "invoice",
        "uptime",
        "availability",
        "sla",
        "audit",
        "notif",
        "data breach",
        "security breach",
    ],
    exclude_liability: true,
};

const LIABILITY: TopicRule = TopicRule {
    include: &["liabilit", "limitation", "capped", "uncapped", "cap at", "cap of", "cap on", "unlimited"],
    qualifier: &[],
    exclude: &["terminat", "invoice", "late fee", "interest", "uptime", "service credit", "audit"],
    exclude_liability: false,
};

const SLA: TopicRule = TopicRule {
    include: &["sla", "uptime", "service credit", "service level"],
    qualifier: &[],
    exclude: &["payment", "invoice", "terminat"],
    exclude_liability: true,
};

const AUDIT: TopicRule = TopicRule {
    include: &["audit"],
    qualifier: &[],
    exclude: &["payment", "invoice", "terminat"],
    exclude_liability: true,
};

const COMPLIANCE: TopicRule = TopicRule {
    include: &[
        "privacy",
        "data protection",
        "personal data",
        "gdpr",
        "hipaa",
        "security",
        "incident",
        "breach",
        "notification",
        "retention",
        "subprocessor",
        "audit",
        "soc 2",
        "soc2",
        "iso 27001",
        "iso27001",
    ],
    qualifier: &[],
    exclude: &["terminat", "invoice", "payment"],
    exclude_liability: true,
};

impl Topic {
    pub const ALL: [Topic; 9] = [
        Topic::Privacy,
        Topic::Availability,
        Topic::Payment,
        Topic::LateFees,
        Topic::Termination,
        Topic::Liability,
        Topic::Sla,
        Topic::Audit,
        Topic::Compliance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Privacy => "privacy",
            Self::Availability => "availability",
            Self::Payment => "payment",
            Self::LateFees => "late_fees",
            Self::Termination => "termination",
            Self::Liability => "liability",
            Self::Sla => "sla",
            Self::Audit => "audit",
            Self::Compliance => "compliance",
        }
    }

    pub fn rule(&self) -> &'static TopicRule {
        match self {
            Self::Privacy => &PRIVACY,
            Self::Availability => &AVAILABILITY,
            Self::Payment => &PAYMENT,
            Self::LateFees => &LATE_FEES,
            Self::Termination => &TERMINATION,
            Self::Liability => &LIABILITY,
            Self::Sla => &SLA,
            Self::Audit => &AUDIT,
            Self::Compliance => &COMPLIANCE,
        }
    }

    /// Heading used for answer sections and evidence labels.
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Privacy => "Data Protection / Privacy",
            Self::Availability => "Service Availability",
            Self::Payment => "Payment Terms",
            Self::LateFees => "Late Fees",
            Self::Termination => "Termination",
            Self::Liability => "Limitation of Liability",
            Self::Sla => "Service Levels (SLA)",
            Self::Audit => "Audit Rights",
            Self::Compliance => "Compliance",
        }
    }

    /// Retrieval query a domain scorer uses to find this topic's chunks.
    pub fn query(&self) -> &'static str {
        match self {
            Self::Privacy => "privacy data protection personal data customer data",
            Self::Availability => {
                "service availability availability uptime % of the time scheduled maintenance"
            }
            Self::Payment => "payment terms invoice due within days undisputed amounts",
            Self::LateFees => "late fees interest overdue per month penalty",
            Self::Termination => "termination terminate material breach cure notice",
            Self::Liability => "limitation of liability liability cap capped uncapped",
            Self::Sla => "SLA uptime service credits service level",
            Self::Audit => "audit rights audit security controls records",
            Self::Compliance => {
                "privacy data protection security breach notification incident retention subprocessor audit"
            }
        }
    }

    /// Statements a domain scorer keeps for this topic.
    pub fn max_items(&self) -> usize {
        match self {
            Self::Liability | Self::Availability | Self::Sla => 2,
            _ => 3,
        }
    }

    /// Whether a single statement belongs to this topic.
    pub fn matches(&self, statement: &str) -> bool {
        let rule = self.rule();
        let s = statement.to_lowercase();
        if !contains_any(&s, rule.include) {
            return false;
        }
        if !rule.qualifier.is_empty() && !contains_any(&s, rule.qualifier) {
            return false;
        }
        if rule.exclude_liability && contains_any(&s, LIABILITY_MARKERS) {
            return false;
        }
        !contains_any(&s, rule.exclude)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Question vocabulary that requests each answer topic, in section order.
const QUESTION_TOPICS: &[(Topic, &[&str])] = &[
    (Topic::Privacy, &["privacy", "data protection", "personal data", "customer data"]),
    (
        Topic::Availability,
        &["service availability", "availability", "uptime", "scheduled maintenance", "% of the time"],
    ),
    (Topic::Payment, &["payment", "invoice", "due", "pay"]),
    (Topic::LateFees, &["late", "interest", "late fee", "penalt", "fee"]),
    (Topic::Termination, &["termination", "terminate", "breach", "cure"]),
    (Topic::Liability, &["liability", "indemn", "cap"]),
    (Topic::Sla, &["sla", "uptime", "service credit"]),
    (Topic::Audit, &["audit"]),
];

/// Topics that, once requested, replace every other requested topic.
const NARROWING_TOPICS: &[Topic] = &[Topic::Privacy, Topic::Availability, Topic::Termination];

/// Every topic whose vocabulary appears in a question, in section order.
pub fn mentioned_topics(question: &str) -> Vec<Topic> {
    let q = question.to_lowercase();
    QUESTION_TOPICS
        .iter()
        .filter(|(_, terms)| contains_any(&q, terms))
        .map(|(topic, _)| *topic)
        .collect()
}

/// Answer topics implied by a question.
pub fn requested_topics(question: &str) -> Vec<Topic> {
    let topics = mentioned_topics(question);
    match NARROWING_TOPICS.iter().find(|t| topics.contains(t)) {
        Some(narrow) => vec![*narrow],
        None => topics,
    }
}

/// Heading for an answer that names no clause family.
pub fn fact_summary_heading(question: &str) -> &'static str {
    let q = question.to_lowercase();
    let has = |terms: &[&str]| contains_any(&q, terms);
    if has(&["service availability", "availability", "uptime", "scheduled maintenance", "% of the time"]) {
        "Service Availability"
    } else if has(&["payment", "invoice", "due"]) {
        if has(&["late", "interest", "penalt", "fee"]) {
            "Payment Terms and Late Fees"
        } else {
            "Payment Terms"
        }
    } else if has(&["termination", "breach", "cure"]) {
        "Termination"
    } else if has(&["liability", "indemn", "cap"]) {
        "Liability"
    } else if has(&["sla", "service credit"]) {
        "Service Levels (SLA)"
    } else if has(&["audit"]) {
        "Audit Rights"
    } else {
        "Answer"
    }
}

const KEYWORD_STOPWORDS: &[&str] = &[
    "a", "about", "agreement", "an", "and", "are", "clause", "contract", "does", "explain", "for",
    "how", "in", "is", "of", "on", "or", "please", "summarize", "terms", "the", "there", "this",
    "to", "what", "when", "with",
];

/// Content words of a question (three or more characters, not stopwords).
///
/// Falls back to the first eight tokens when nothing survives filtering.
pub fn question_keywords(question: &str) -> Vec<String> {
    let tokens = tokenize(question);
    let keywords: Vec<String> = tokens
        .iter()
        .filter(|t| t.len() >= 3 && !KEYWORD_STOPWORDS.contains(&t.as_str()))
        .cloned()
        .collect();
    if keywords.is_empty() {
        tokens.into_iter().take(8).collect()
    } else {
        keywords
    }
}

/// Add `statement` unless it, or a longer statement containing it, is present.
///
/// A statement that contains an earlier, shorter one replaces it; chunk overlap
/// otherwise yields truncated copies of the same sentence.
pub fn push_unique(out: &mut Vec<String>, statement: &str) -> bool {
    let key = statement.to_lowercase();
    if out.iter().any(|s| s.to_lowercase().contains(&key)) {
        return false;
    }
    if let Some(pos) = out.iter().position(|s| key.contains(&s.to_lowercase())) {
        out[pos] = statement.to_string();
        return true;
    }
    out.push(statement.to_string());
    true
}

/// Statements from `matches` accepted under `topic`, best match first.
pub fn extract_topic_statements(
    matches: &[RetrievalMatch],
    topic: Topic,
    max_items: usize,
) -> Vec<String> {
    let mut out = Vec::new();
    for m in matches {
        for statement in statements(&m.text) {
            if !topic.matches(&statement) {
                continue;
            }
            let clipped = truncate_chars(&statement, MAX_STATEMENT_CHARS);
            push_unique(&mut out, clipped);
            if out.len() >= max_items {
                return out;
            }
        }
    }
    out
}
