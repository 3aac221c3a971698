/// Term -> translation store and the importers that fill it
///
/// The map is a plain value: merging produces a new map and engine functions
/// only ever borrow it.
use crate::scanner::Record;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

static CSV_PAIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^"(.+)"\s*,\s*"(.+)"$"#).expect("valid CSV pair regex"));

static CSV_SHAPED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^".*",".*"$"#).expect("valid CSV shape regex"));

static TERM_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^#Term:\s*").expect("valid term tag regex"));

static ORIGINAL_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^#Original:\s*").expect("valid original tag regex"));

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationMap {
    entries: BTreeMap<String, String>,
}

impl TranslationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, term: &str) -> Option<&str> {
        self.entries.get(term).map(String::as_str)
    }

    pub fn insert(&mut self, term: impl Into<String>, translation: impl Into<String>) {
        self.entries.insert(term.into(), translation.into());
    }

    /// Returns whether the term was present.
    pub fn remove(&mut self, term: &str) -> bool {
        self.entries.remove(term).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when the term maps to a non-blank translation.
    pub fn has_translation(&self, term: &str) -> bool {
        self.get(term).is_some_and(|t| !t.trim().is_empty())
    }

    /// New map holding both sides; entries from `other` win on conflict.
    pub fn merge(&self, other: &TranslationMap) -> TranslationMap {
        let mut merged = self.clone();
        for (term, translation) in other.iter() {
            merged.insert(term, translation);
        }
        merged
    }

    pub fn count_translated(&self, records: &[Record]) -> usize {
        records
            .iter()
            .filter(|r| self.has_translation(&r.term))
            .count()
    }

    pub fn quick_report(&self, records: &[Record]) -> QuickReport {
        QuickReport::new(records.len(), self.count_translated(records))
    }

    /// `Total,<n>,Translated,<n>,Percent,<p>%`
    pub fn one_line_csv_report(&self, records: &[Record]) -> String {
        let report = self.quick_report(records);
        format!(
            "Total,{},Translated,{},Percent,{}%",
            report.total, report.translated, report.percent
        )
    }
}

impl FromIterator<(String, String)> for TranslationMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<(String, String)> for TranslationMap {
    fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

impl IntoIterator for TranslationMap {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReport {
    pub total: usize,
    pub translated: usize,
    /// Rounded to the nearest whole percent; 0 when there are no records.
    pub percent: u32,
}

impl QuickReport {
    pub fn new(total: usize, translated: usize) -> Self {
        let percent = if total == 0 {
            0
        } else {
            ((translated as f64 / total as f64) * 100.0).round() as u32
        };
        Self {
            total,
            translated,
            percent,
        }
    }
}

/// Trim, lowercase and collapse internal whitespace.
pub fn normalize_key(key: &str) -> String {
    WHITESPACE_RE
        .replace_all(&key.trim().to_lowercase(), " ")
        .into_owned()
}

/// Case-insensitive search over term and original text. A blank query keeps
/// every record.
pub fn filter_records(records: &[Record], query: &str) -> Vec<Record> {
    if query.trim().is_empty() {
        return records.to_vec();
    }
    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|r| {
            r.term.to_lowercase().contains(&needle)
                || r.original_text.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// Parse a user-supplied translation file, sniffing its shape.
///
/// JSON (an array of `{term, translation}` or a flat object) is tried first;
/// invalid JSON falls through to the line formats: `#Term:`/`#Original:`
/// pairs, `"term","translation"` rows, then plain two-line pairs. Lines that
/// fit none of these are skipped.
pub fn parse_translations(content: &str) -> TranslationMap {
    let trimmed = content.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => return from_json_value(value),
            Err(err) => log::debug!("translation file is not JSON ({}), parsing as text", err),
        }
    }
    parse_text_lines(content)
}

fn from_json_value(value: Value) -> TranslationMap {
    let mut map = TranslationMap::new();
    match value {
        Value::Array(items) => {
            for item in items {
                let term = item.get("term").and_then(non_empty_string);
                let translation = item.get("translation").and_then(non_empty_string);
                if let (Some(term), Some(translation)) = (term, translation) {
                    map.insert(term, translation);
                }
            }
        }
        Value::Object(entries) => {
            for (term, value) in entries {
                map.insert(term, json_to_string(&value));
            }
        }
        _ => {}
    }
    map
}

fn non_empty_string(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        other => Some(json_to_string(other)),
    }
}

fn json_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_text_lines(content: &str) -> TranslationMap {
    let lines: Vec<&str> = content.lines().map(str::trim).collect();
    let mut map = TranslationMap::new();
    let mut i = 0;

    while i < lines.len() {
        let current = lines[i];
        let next = lines.get(i + 1).copied().filter(|l| !l.is_empty());
        i += 1;

        if current.is_empty() {
            continue;
        }

        if TERM_TAG_RE.is_match(current) {
            let term = TERM_TAG_RE.replace(current, "");
            if let Some(original) = next.filter(|n| ORIGINAL_TAG_RE.is_match(n)) {
                map.insert(term.into_owned(), ORIGINAL_TAG_RE.replace(original, ""));
                i += 1;
            }
            continue;
        }

        if let Some(caps) = CSV_PAIR_RE.captures(current) {
            map.insert(&caps[1], &caps[2]);
            continue;
        }

        if let Some(next) = next {
            if !next.starts_with('#') && !CSV_SHAPED_RE.is_match(next) {
                map.insert(current, next);
                i += 1;
            }
        }
    }

    map
}
