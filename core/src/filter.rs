/// Advanced dump filter
///
/// Re-emits a dump keeping only the selected parts of each item and only the
/// selected language values. Output lines are trimmed; items are separated
/// by a blank line.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

static MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d+)\]$").expect("valid marker regex"));

static TERM_DATA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"TermData\s+data\s*$").expect("valid TermData regex"));

static TERM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"string\s+Term\s*=\s*"[^"]+""#).expect("valid term regex"));

static TERM_TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"int\s+TermType\s*=\s*\d+").expect("valid TermType regex"));

static DATA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"string\s+data\s*=\s*"[^"]*""#).expect("valid data regex"));

static INDEX_SEPARATORS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s,]+").expect("valid separator regex"));

/// Lines above a Term searched for `TermData` in the tolerant pass.
const TERM_DATA_LOOKBACK: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterOptions {
    pub include_term_data: bool,
    pub include_term: bool,
    pub include_term_type: bool,
    pub include_languages: bool,
    /// `None` keeps every language.
    pub language_indices: Option<BTreeSet<usize>>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            include_term_data: true,
            include_term: true,
            include_term_type: false,
            include_languages: true,
            language_indices: None,
        }
    }
}

impl FilterOptions {
    fn keeps_language(&self, index: usize) -> bool {
        self.language_indices
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&index))
    }
}

/// Parse a language index list such as `"0, 1 ،2؛3"`.
///
/// Commas, Persian comma and semicolon, ASCII semicolons and whitespace all
/// separate entries; anything that is not a plain non-negative integer is
/// ignored. Returns `None` (all languages) when nothing usable remains.
pub fn parse_indices(input: &str) -> Option<BTreeSet<usize>> {
    let normalized = input.replace(['،', '؛', ';'], ",");
    let indices: BTreeSet<usize> = INDEX_SEPARATORS_RE
        .split(normalized.trim())
        .filter(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|part| part.parse().ok())
        .collect();

    if indices.is_empty() {
        None
    } else {
        Some(indices)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOutcome {
    pub text: String,
    pub items: usize,
    /// No item block was recognized; items were keyed on Term lines.
    pub used_fallback: bool,
}

#[derive(Debug, Default)]
struct ItemParts<'a> {
    term_data: Option<&'a str>,
    term: Option<&'a str>,
    term_type: Option<&'a str>,
    languages: Vec<(usize, &'a str)>,
}

impl<'a> ItemParts<'a> {
    fn emit(&self, id: usize, options: &FilterOptions, out: &mut Vec<String>) {
        out.push(format!("[{}]", id));
        if options.include_term_data {
            out.extend(self.term_data.map(str::to_string));
        }
        if options.include_term {
            out.extend(self.term.map(str::to_string));
        }
        if options.include_term_type {
            out.extend(self.term_type.map(str::to_string));
        }
        if options.include_languages {
            for (index, content) in &self.languages {
                if options.keeps_language(*index) {
                    out.push(format!("[{}]", index));
                    out.push(content.to_string());
                }
            }
        }
        out.push(String::new());
    }
}

fn marker(line: &str) -> Option<usize> {
    MARKER_RE.captures(line).and_then(|caps| caps[1].parse().ok())
}

/// A language element is the marker directly above its value declaration;
/// every other bare marker starts an item.
fn is_language_marker(lines: &[&str], i: usize) -> bool {
    lines.get(i + 1).is_some_and(|next| DATA_RE.is_match(next))
}

fn language_value<'a>(lines: &[&'a str], i: usize) -> Option<(usize, &'a str)> {
    let index = marker(lines[i])?;
    let next = lines.get(i + 1)?;
    DATA_RE.is_match(next).then_some((index, *next))
}

pub fn filter_dump(text: &str, options: &FilterOptions) -> FilterOutcome {
    let lines: Vec<&str> = text.split('\n').map(str::trim).collect();
    let mut out = Vec::new();
    let mut items = 0;

    let mut i = 0;
    while i < lines.len() {
        let Some(id) = marker(lines[i]) else {
            i += 1;
            continue;
        };
        if is_language_marker(&lines, i) {
            i += 1;
            continue;
        }

        let mut parts = ItemParts::default();
        let mut j = i + 1;
        while j < lines.len() {
            let line = lines[j];
            if marker(line).is_some() {
                if !is_language_marker(&lines, j) {
                    break;
                }
                parts.languages.extend(language_value(&lines, j));
            } else if TERM_DATA_RE.is_match(line) {
                parts.term_data = Some(line);
            } else if TERM_RE.is_match(line) {
                parts.term = Some(line);
            } else if TERM_TYPE_RE.is_match(line) {
                parts.term_type = Some(line);
            }
            j += 1;
        }

        if parts.term_data.is_some() || parts.term.is_some() {
            parts.emit(id, options, &mut out);
            items += 1;
        }
        i = j;
    }

    if items > 0 {
        return FilterOutcome {
            text: out.join("\n"),
            items,
            used_fallback: false,
        };
    }

    let (text, items) = filter_by_terms(&lines, options);
    if items > 0 {
        log::debug!("filter found no item blocks; keyed {} items on Term lines", items);
    }
    FilterOutcome {
        text,
        items,
        used_fallback: items > 0,
    }
}

/// Tolerant pass: every Term line starts an item numbered from zero.
fn filter_by_terms(lines: &[&str], options: &FilterOptions) -> (String, usize) {
    let mut out = Vec::new();
    let mut items = 0;

    for (i, line) in lines.iter().enumerate() {
        if !TERM_RE.is_match(line) {
            continue;
        }

        let mut parts = ItemParts {
            term: Some(*line),
            term_data: lines[i.saturating_sub(TERM_DATA_LOOKBACK)..i]
                .iter()
                .rev()
                .find(|l| TERM_DATA_RE.is_match(l))
                .copied(),
            ..ItemParts::default()
        };

        for j in i + 1..lines.len() {
            if TERM_RE.is_match(lines[j]) {
                break;
            }
            if TERM_TYPE_RE.is_match(lines[j]) {
                parts.term_type = Some(lines[j]);
            }
            parts.languages.extend(language_value(lines, j));
        }

        parts.emit(items, options, &mut out);
        items += 1;
    }

    (out.join("\n"), items)
}
