//! Topic-scoped answers for factual questions.
//!
//! Bullets are whole statements lifted from the probe matches. A statement is
//! only used under a topic whose rule accepts it; a question that names no
//! topic gets a single section whose bullets must contain a question keyword.

use std::collections::HashSet;

use tracing::debug;

use clauselens_ai::clauses::statements;
use clauselens_ai::{Topic, requested_topics};
use clauselens_ai::topics::{fact_summary_heading, question_keywords};
use clauselens_core::model::{QaAnswer, QaSection, RetrievalMatch};
use clauselens_core::rewrite::{BulletRewriter, RewriteRequest, rewrite_or_keep};
use clauselens_core::text::{collapse_whitespace, truncate_chars};

use crate::gate::NO_EVIDENCE_MESSAGE;

const SOURCE_MATCHES: usize = 3;
const MAX_BULLETS: usize = 3;
const MAX_BULLET_CHARS: usize = 260;

/// Build the answer for `question` from the best probe matches, passing each
/// accepted bullet through `rewriter`.
pub async fn build_answer(
    question: &str,
    matches: &[RetrievalMatch],
    rewriter: &dyn BulletRewriter,
) -> QaAnswer {
    let question = question.trim();
    let mut qa = QaAnswer {
        question: question.to_string(),
        ..QaAnswer::default()
    };
    if question.is_empty() || matches.is_empty() {
        return qa;
    }

    let blob = matches
        .iter()
        .take(SOURCE_MATCHES)
        .map(|m| m.text.as_str())
        .filter(|t| !t.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let candidates = statements(&blob);

    let topics = requested_topics(question);
    let keywords = question_keywords(question);
    let mut seen: HashSet<String> = HashSet::new();

    let targets: Vec<(String, Option<Topic>)> = if topics.is_empty() {
        vec![(fact_summary_heading(question).to_string(), None)]
    } else {
        topics.iter().map(|t| (t.heading().to_string(), Some(*t))).collect()
    };

    for (heading, topic) in targets {
        let mut bullets = Vec::new();
        for candidate in &candidates {
            let accepted = match topic {
                Some(topic) => topic.matches(candidate),
                None => {
                    let low = candidate.to_lowercase();
                    keywords.is_empty() || keywords.iter().any(|k| low.contains(k.as_str()))
                }
            };
            if !accepted {
                continue;
            }
            let text = collapse_whitespace(candidate);
            if text.is_empty() || !seen.insert(text.to_lowercase()) {
                continue;
            }
            bullets.push(truncate_chars(&text, MAX_BULLET_CHARS).to_string());
            if bullets.len() >= MAX_BULLETS {
                break;
            }
        }
        if bullets.is_empty() {
            continue;
        }

        let mut rewritten = Vec::with_capacity(bullets.len());
        for clause in bullets {
            let request = RewriteRequest {
                question: question.to_string(),
                heading: heading.clone(),
                clause,
            };
            rewritten.push(rewrite_or_keep(rewriter, &request).await);
        }
        qa.sections.push(QaSection {
            heading,
            bullets: rewritten,
        });
    }

    qa.answer = answer_text(&qa.sections);
    debug!(sections = qa.sections.len(), rewriter = rewriter.name(), "built answer");
    qa
}

fn answer_text(sections: &[QaSection]) -> String {
    sections
        .iter()
        .map(|s| {
            let mut block = s.heading.clone();
            for b in &s.bullets {
                block.push_str("\n• ");
                block.push_str(b);
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Report text for a factual answer. An answer without sections renders the
/// no-evidence notice.
pub fn render_fact_report(qa: &QaAnswer) -> String {
    if qa.sections.is_empty() {
        return format!("Answer\n• {NO_EVIDENCE_MESSAGE}");
    }
    answer_text(&qa.sections)
}
