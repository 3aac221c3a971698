use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// `{0}`-style indices, printf conversions and literal `\n` / `\t` escapes.
static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\d+\}|%[dsfx]|\\n|\\t").expect("valid placeholder regex"));

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentReview {
    pub placeholder_parity_ok: bool,
    pub length_ratio: f32,
    pub warnings: Vec<String>,
}

impl SegmentReview {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SegmentLimits {
    pub check_placeholders: bool,
    /// Warn when the translation is longer than this multiple of the source.
    pub warn_ratio: f32,
    /// Warn above this many characters regardless of the source.
    pub max_length: usize,
}

impl Default for SegmentLimits {
    fn default() -> Self {
        Self {
            check_placeholders: true,
            warn_ratio: 1.5,
            max_length: 200,
        }
    }
}

pub fn count_placeholders(text: &str) -> usize {
    PLACEHOLDER_REGEX.find_iter(text).count()
}

pub fn review_segment(source: &str, candidate: &str, limits: &SegmentLimits) -> SegmentReview {
    let mut warnings = Vec::new();

    let mut placeholder_parity_ok = true;
    if limits.check_placeholders {
        let expected = count_placeholders(source);
        let found = count_placeholders(candidate);
        if expected != found {
            placeholder_parity_ok = false;
            warnings.push(format!(
                "Placeholder mismatch: found {}, expected {}",
                found, expected
            ));
        }
    }

    let source_len = source.chars().count();
    let candidate_len = candidate.chars().count();
    let length_ratio = compute_length_ratio(source_len, candidate_len);

    if source_len > 0 && length_ratio > limits.warn_ratio {
        warnings.push(format!(
            "Translation is {}% of original length",
            (length_ratio * 100.0).round() as u32
        ));
    }

    if candidate_len > limits.max_length {
        warnings.push(format!(
            "Long translation ({} chars) may overflow UI",
            candidate_len
        ));
    }

    SegmentReview {
        placeholder_parity_ok,
        length_ratio,
        warnings,
    }
}

fn compute_length_ratio(source_len: usize, candidate_len: usize) -> f32 {
    let source_len = source_len.max(1) as f32;
    (candidate_len as f32 / source_len).max(0.0)
}
