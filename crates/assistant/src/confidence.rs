//! Answer confidence scoring.
//!
//! A fixed heuristic: baseline 0.5 plus four additive factors, clamped to
//! [0, 1] only at the end.

use faqdesk_knowledge::RetrievalResult;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

pub const DEFAULT_THRESHOLD: f64 = 0.6;

const BASELINE: f64 = 0.5;

const DOUBT_PHRASES: &[&str] = &[
    "i don't have",
    "i do not have",
    "not sure",
    "unclear",
    "can't find",
    "cannot find",
    "no information",
    "unable to",
    "i don't know",
    "not certain",
    "uncertain",
];

/// A line opening with `- `, `1. ` or `2) `.
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(?:-|\d+[.)])[ \t]").expect("list item pattern"));

/// Action words as whole words; "go to" as two adjacent words.
static ACTION_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:step|first|then|click|navigate|go\s+to)\b").expect("action word pattern")
});

/// Minimum length of a word counted for context utilization.
const MIN_CONTENT_WORD: usize = 5;

/// Per-factor contributions, summed onto the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceBreakdown {
    pub retrieval: f64,
    pub uncertainty: f64,
    pub completeness: f64,
    pub utilization: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceResult {
    pub score: f64,
    pub threshold: f64,
    pub needs_escalation: bool,
    pub breakdown: ConfidenceBreakdown,
}

/// Scores answers against the context they were grounded on.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceEvaluator {
    threshold: f64,
}

impl Default for ConfidenceEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl ConfidenceEvaluator {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Score `answer` given the retrieved `context`. Pure and infallible.
    pub fn evaluate(&self, answer: &str, context: &[RetrievalResult]) -> ConfidenceResult {
        let normalized = answer.replace('\u{2019}', "'").to_lowercase();

        let breakdown = ConfidenceBreakdown {
            retrieval: retrieval_quality(context),
            uncertainty: uncertainty_penalty(&normalized),
            completeness: completeness(answer, &normalized),
            utilization: context_utilization(&normalized, context),
        };

        let raw = BASELINE
            + breakdown.retrieval
            + breakdown.uncertainty
            + breakdown.completeness
            + breakdown.utilization;
        let score = raw.clamp(0.0, 1.0);

        tracing::debug!(
            "Confidence {:.3} (raw {:.3}): retrieval {:+.3}, uncertainty {:+.3}, completeness {:+.3}, utilization {:+.3}",
            score,
            raw,
            breakdown.retrieval,
            breakdown.uncertainty,
            breakdown.completeness,
            breakdown.utilization
        );

        ConfidenceResult {
            score,
            threshold: self.threshold,
            needs_escalation: score < self.threshold,
            breakdown,
        }
    }
}

fn retrieval_quality(context: &[RetrievalResult]) -> f64 {
    if context.is_empty() {
        return -0.4;
    }

    let scores: Vec<f64> = context.iter().map(|r| r.similarity_score as f64).collect();
    let avg = scores.iter().sum::<f64>() / scores.len() as f64;
    let best = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    (avg - 0.5) * 0.6 + (best - 0.5) * 0.2
}

fn uncertainty_penalty(normalized: &str) -> f64 {
    let count = DOUBT_PHRASES
        .iter()
        .filter(|phrase| normalized.contains(*phrase))
        .count();
    -(count as f64 * 0.15).min(0.3)
}

fn completeness(answer: &str, normalized: &str) -> f64 {
    let length = answer.chars().count();
    let base = if length > 200 {
        0.15
    } else if length > 100 {
        0.05
    } else if length < 50 {
        -0.1
    } else {
        0.0
    };

    if has_actionable_marker(answer, normalized) {
        base + 0.05
    } else {
        base
    }
}

fn has_actionable_marker(answer: &str, normalized: &str) -> bool {
    LIST_ITEM.is_match(answer) || ACTION_WORD.is_match(normalized)
}

fn context_utilization(normalized: &str, context: &[RetrievalResult]) -> f64 {
    let context_words: HashSet<String> = context
        .iter()
        .flat_map(|r| {
            words(&r.content.to_lowercase())
                .filter(|w| w.chars().count() >= MIN_CONTENT_WORD)
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();

    let answer_words: HashSet<String> = words(normalized)
        .filter(|w| w.chars().count() >= MIN_CONTENT_WORD)
        .map(str::to_string)
        .collect();

    let overlap = answer_words.intersection(&context_words).count();

    if overlap > 8 {
        0.1
    } else if overlap > 4 {
        0.05
    } else {
        0.0
    }
}

/// Maximal runs of alphanumeric characters.
fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
}
