/// Boundary with the external English -> Persian translation service
///
/// The service receives `{texts, preservePlaceholders}` and answers with
/// `{translations: [{english, persian, warnings}]}` in input order. Failures
/// are classified so callers can tell a rate limit from an exhausted quota.
/// A missing translation always falls back to the source text.
pub mod client;
pub mod retry;

use crate::quality::{review_segment, SegmentLimits};
use crate::scanner::Record;
use crate::translation_map::TranslationMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use client::ServiceClient;

static NUMBERED_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s*").expect("valid numbered line regex"));

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("rate limit exceeded, try again later")]
    RateLimited { retry_after: Option<Duration> },
    #[error("payment required, add credits to the translation workspace")]
    PaymentRequired,
    #[error("translation failed: {message}")]
    Failure {
        status: Option<u16>,
        message: String,
    },
    #[error("invalid response from translation service: {0}")]
    InvalidResponse(String),
    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub texts: Vec<String>,
    #[serde(default = "default_preserve")]
    pub preserve_placeholders: bool,
}

fn default_preserve() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedText {
    pub english: String,
    pub persian: String,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translations: Vec<TranslatedText>,
}

/// Error body sent by the service alongside non-success statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ServiceErrorBody {
    pub error: String,
}

/// Prompt body listing a batch as `1. text` lines.
pub fn numbered_prompt(batch: &[String]) -> String {
    batch
        .iter()
        .enumerate()
        .map(|(idx, text)| format!("{}. {}", idx + 1, text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split raw model output into one translation per non-blank line, with
/// any leading `N.` numbering removed.
pub fn parse_numbered_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| NUMBERED_LINE_RE.replace(line, "").trim().to_string())
        .collect()
}

/// Pair each source text with its output by position. Missing or blank
/// outputs fall back to the source text; every pair is reviewed for
/// warnings.
pub fn assemble_batch(
    batch: &[String],
    outputs: &[String],
    preserve_placeholders: bool,
) -> Vec<TranslatedText> {
    let limits = SegmentLimits {
        check_placeholders: preserve_placeholders,
        ..SegmentLimits::default()
    };

    batch
        .iter()
        .enumerate()
        .map(|(idx, english)| {
            let persian = outputs
                .get(idx)
                .filter(|t| !t.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| english.clone());
            let warnings = review_segment(english, &persian, &limits).warnings;
            TranslatedText {
                english: english.clone(),
                persian,
                warnings,
            }
        })
        .collect()
}

/// Make a service response line up with `texts`: entries beyond the input
/// are dropped, missing entries become the untranslated source.
pub fn align_response(texts: &[String], response: TranslateResponse) -> Vec<TranslatedText> {
    let mut translations = response.translations.into_iter();
    texts
        .iter()
        .map(|english| match translations.next() {
            Some(found) if !found.persian.trim().is_empty() => TranslatedText {
                english: english.clone(),
                ..found
            },
            _ => TranslatedText {
                english: english.clone(),
                persian: english.clone(),
                warnings: Vec::new(),
            },
        })
        .collect()
}

/// Texts worth sending for a set of records: non-empty originals, in order.
pub fn texts_for_records(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .filter(|r| !r.original_text.trim().is_empty())
        .map(|r| r.original_text.clone())
        .collect()
}

/// Map service results back to terms. Records share a translation when they
/// share an original text; results equal to the source are not recorded.
pub fn translations_for_records(
    records: &[Record],
    translated: &[TranslatedText],
) -> TranslationMap {
    let mut map = TranslationMap::new();
    for record in records {
        let Some(found) = translated.iter().find(|t| t.english == record.original_text) else {
            continue;
        };
        if found.persian != found.english {
            map.insert(record.term.clone(), found.persian.clone());
        }
    }
    map
}
