/// Record scanner for I2Languages text dumps
///
/// Each line is classified once into a [`LineClass`]; the primary scanner and
/// the fallback extractor are state machines over that classification.
/// Records keep the line index and the text preceding the value assignment
/// so the value line can later be rewritten without touching its layout.
use crate::config::ScannerOptions;
use crate::escape::unescape_value;
use crate::fallback;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::Range;

static INDEX_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\[(\d+)\]\s*$").expect("valid index marker regex"));

static TERM_DATA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\d+\s+)?TermData\s+data\s*$").expect("valid TermData regex")
});

static TERM_DECL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(?:\d+\s+)?string\s+Term\s*=\s*"((?:[^"\\]|\\.)+)""#)
        .expect("valid term declaration regex")
});

static VALUE_DECL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(\s*(?:\d+\s+)?string\s+)data\s*=\s*"((?:[^"\\]|\\.)*)""#)
        .expect("valid value declaration regex")
});

static ANY_TERM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"string\s+Term\s*=\s*"[^"]+""#).expect("valid term probe regex"));

static ANY_VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"string\s+data\s*=\s*"[^"]*""#).expect("valid value probe regex"));

static ANY_INDEX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d+)\]").expect("valid bracket regex"));

/// Lines inspected after a term by [`extract_strings`].
const STRING_SCAN_RANGE: usize = 20;

/// Classification of a single dump line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    /// `[n]`: an item header or a per-language array element.
    IndexMarker { index: usize },
    /// `0 TermData data`
    TermData,
    /// `1 string Term = "<term>"`, term unescaped.
    TermDecl { term: String },
    /// `1 string data = "<value>"`; `prefix` is everything before `data`.
    ValueDecl { prefix: String, value: String },
    Other,
}

/// Byte range of the escaped value between the quotes of a value line.
pub fn value_span(line: &str) -> Option<Range<usize>> {
    VALUE_DECL_RE
        .captures(line)
        .and_then(|caps| caps.get(2))
        .map(|m| m.range())
}

pub fn classify_line(line: &str) -> LineClass {
    if let Some(caps) = VALUE_DECL_RE.captures(line) {
        return LineClass::ValueDecl {
            prefix: caps[1].to_string(),
            value: unescape_value(&caps[2]),
        };
    }
    if let Some(caps) = TERM_DECL_RE.captures(line) {
        return LineClass::TermDecl {
            term: unescape_value(&caps[1]),
        };
    }
    if TERM_DATA_RE.is_match(line) {
        return LineClass::TermData;
    }
    if let Some(caps) = INDEX_MARKER_RE.captures(line) {
        if let Ok(index) = caps[1].parse::<usize>() {
            return LineClass::IndexMarker { index };
        }
    }
    LineClass::Other
}

/// Classify every line of `text`, split exactly like [`crate::lines::LineModel`].
pub fn classify_lines(text: &str) -> Vec<LineClass> {
    text.split('\n').map(classify_line).collect()
}

/// One translatable term discovered in a dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub term: String,
    pub original_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_line_index: Option<usize>,
    #[serde(default)]
    pub line_prefix: String,
}

impl Record {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            original_text: String::new(),
            data_line_index: None,
            line_prefix: String::new(),
        }
    }

    /// Whether the record points at a value line and can be substituted.
    pub fn is_addressable(&self) -> bool {
        self.data_line_index.is_some()
    }
}

/// Primary scan: one record per term declaration, in file order.
///
/// A record stays open until the next term declaration or end of input.
/// While open, `[n]` markers update the current language index; when it
/// equals `language_index` the following line is tested for a value
/// declaration. Only the first match is captured.
pub fn scan_records(text: &str, language_index: usize) -> Vec<Record> {
    let classes = classify_lines(text);
    scan_classified(&classes, language_index)
}

pub(crate) fn scan_classified(classes: &[LineClass], language_index: usize) -> Vec<Record> {
    let mut records = Vec::new();
    let mut current: Option<Record> = None;
    let mut captured = false;
    let mut bracket: Option<usize> = None;

    for (i, class) in classes.iter().enumerate() {
        match class {
            LineClass::TermDecl { term } => {
                if let Some(done) = current.take() {
                    records.push(done);
                }
                current = Some(Record::new(term.clone()));
                captured = false;
                bracket = None;
            }
            LineClass::IndexMarker { index } if current.is_some() => {
                bracket = Some(*index);
            }
            _ => {}
        }

        let Some(record) = current.as_mut() else {
            continue;
        };
        if captured || bracket != Some(language_index) {
            continue;
        }
        if let Some(LineClass::ValueDecl { prefix, value }) = classes.get(i + 1) {
            record.original_text = value.clone();
            record.data_line_index = Some(i + 1);
            record.line_prefix = prefix.clone();
            captured = true;
        }
    }

    if let Some(done) = current {
        records.push(done);
    }
    records
}

/// Result of [`extract_records`].
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub records: Vec<Record>,
    pub used_fallback: bool,
}

impl Extraction {
    pub fn addressable_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_addressable()).count()
    }
}

/// Primary scan, falling back to the multi-shape extractor when the primary
/// pass produced no addressable record.
pub fn extract_records(text: &str, options: &ScannerOptions) -> Extraction {
    let classes = classify_lines(text);
    let records = scan_classified(&classes, options.language_index);
    let usable = records.iter().filter(|r| r.is_addressable()).count();

    if usable == 0 && options.enable_fallback {
        let shaped = fallback::extract_classified(
            &classes,
            options.language_index,
            options.effective_window(),
        );
        if !shaped.is_empty() {
            log::debug!(
                "primary scan found {} records without values; fallback extracted {}",
                records.len(),
                shaped.len()
            );
            return Extraction {
                records: shaped.into_iter().map(|s| s.record).collect(),
                used_fallback: true,
            };
        }
    }

    log::debug!("extracted {} records ({} with values)", records.len(), usable);
    Extraction {
        records,
        used_fallback: false,
    }
}

/// Term/value pair from the permissive listing pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermString {
    pub term: String,
    pub data: String,
    /// Leading path segment of the term (`"UI/Start"` -> `"UI"`).
    pub group: Option<String>,
}

/// Pair each term with the first value declared within the next 20 lines,
/// ignoring language blocks entirely.
pub fn extract_strings(text: &str) -> Vec<TermString> {
    let mut results = Vec::new();
    let mut current: Option<String> = None;
    let mut scanned = 0usize;

    for line in text.lines() {
        if let LineClass::TermDecl { term } = classify_line(line) {
            current = Some(term);
            scanned = 0;
            continue;
        }
        let Some(term) = current.as_ref() else {
            continue;
        };
        if scanned >= STRING_SCAN_RANGE {
            continue;
        }
        if let LineClass::ValueDecl { value, .. } = classify_line(line) {
            let group = term.split_once('/').map(|(head, _)| head.to_string());
            results.push(TermString {
                term: term.clone(),
                data: value,
                group,
            });
            current = None;
        } else {
            scanned += 1;
        }
    }

    results
}

/// Whether the text contains at least one term and one value declaration.
pub fn is_valid_dump(text: &str) -> bool {
    ANY_TERM_RE.is_match(text) && ANY_VALUE_RE.is_match(text)
}

/// Distinct bracket indices appearing anywhere in the dump, ascending.
pub fn available_languages(text: &str) -> Vec<usize> {
    let mut found = BTreeSet::new();
    for line in text.lines() {
        if let Some(index) = ANY_INDEX_RE
            .captures(line)
            .and_then(|caps| caps[1].parse::<usize>().ok())
        {
            found.insert(index);
        }
    }
    found.into_iter().collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DumpDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: Vec<String>,
}

/// Compare the term sets of two dumps.
pub fn diff_dumps(old: &str, new: &str) -> DumpDiff {
    let old_terms = unique_terms(old);
    let new_terms = unique_terms(new);
    let old_set: HashSet<&String> = old_terms.iter().collect();
    let new_set: HashSet<&String> = new_terms.iter().collect();

    DumpDiff {
        added: new_terms
            .iter()
            .filter(|t| !old_set.contains(t))
            .cloned()
            .collect(),
        removed: old_terms
            .iter()
            .filter(|t| !new_set.contains(t))
            .cloned()
            .collect(),
        unchanged: old_terms
            .iter()
            .filter(|t| new_set.contains(t))
            .cloned()
            .collect(),
    }
}

fn unique_terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    extract_strings(text)
        .into_iter()
        .filter_map(|s| seen.insert(s.term.clone()).then_some(s.term))
        .collect()
}

/// Whether two dumps carry the same term -> value mapping. Later duplicates
/// of a term override earlier ones.
pub fn translations_equal(a: &str, b: &str) -> bool {
    let map_a: HashMap<String, String> = extract_strings(a)
        .into_iter()
        .map(|s| (s.term, s.data))
        .collect();
    let map_b: HashMap<String, String> = extract_strings(b)
        .into_iter()
        .map(|s| (s.term, s.data))
        .collect();
    map_a == map_b
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str =
        "\n[0]\n0 TermData data\n  1 string Term = \"Hello\"\n[0]\n  1 string data = \"Hi there\"\n";

    #[test]
    fn scans_reference_scenario() {
        let records = scan_records(NESTED, 0);
        assert_eq!(
            records,
            vec![Record {
                term: "Hello".into(),
                original_text: "Hi there".into(),
                data_line_index: Some(5),
                line_prefix: "  1 string ".into(),
            }]
        );
    }

    #[test]
    fn classifies_lines() {
        assert_eq!(classify_line("   [12]"), LineClass::IndexMarker { index: 12 });
        assert_eq!(classify_line("     0 TermData data"), LineClass::TermData);
        assert_eq!(
            classify_line("string Term = \"A/B\""),
            LineClass::TermDecl { term: "A/B".into() }
        );
        assert_eq!(
            classify_line("\t1  string data=\"x \\\"y\\\"\""),
            LineClass::ValueDecl {
                prefix: "\t1  string ".into(),
                value: "x \"y\"".into()
            }
        );
        assert_eq!(classify_line("  1 string data = \"\""), LineClass::ValueDecl {
            prefix: "  1 string ".into(),
            value: String::new()
        });
        assert_eq!(classify_line("  0 int TermType = 0"), LineClass::Other);
    }

    #[test]
    fn picks_requested_language_block() {
        let text = "\
[0]
 0 TermData data
  1 string Term = \"Start\"
  0 Array Languages
   [0]
    1 string data = \"Start\"
   [1]
    1 string data = \"Commencer\"
";
        let english = scan_records(text, 0);
        assert_eq!(english[0].original_text, "Start");
        assert_eq!(english[0].data_line_index, Some(5));

        let french = scan_records(text, 1);
        assert_eq!(french[0].original_text, "Commencer");
        assert_eq!(french[0].data_line_index, Some(7));
        assert_eq!(french[0].line_prefix, "    1 string ");
    }

    #[test]
    fn first_match_wins_per_record() {
        let text = "\
  1 string Term = \"Dup\"
[0]
  1 string data = \"first\"
[0]
  1 string data = \"second\"
";
        let records = scan_records(text, 0);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].original_text, "first");
        assert_eq!(records[0].data_line_index, Some(2));
    }

    #[test]
    fn term_without_marker_is_still_emitted() {
        let text = "  1 string Term = \"Lonely\"\n  1 string data = \"unreached\"\n  1 string Term = \"Next\"";
        let records = scan_records(text, 0);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].term, "Lonely");
        assert!(records[0].original_text.is_empty());
        assert_eq!(records[0].data_line_index, None);
        assert_eq!(records[1].term, "Next");
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(scan_records("", 0).is_empty());
        assert!(extract_records("no dump here", &ScannerOptions::default())
            .records
            .is_empty());
    }

    #[test]
    fn extract_records_falls_back_for_flat_dumps() {
        let flat = "\
[0]
 0 TermData data
  1 string Term = \"Menu/Start\"
  1 string data = \"Start\"
[1]
 0 TermData data
  1 string Term = \"Menu/Quit\"
  1 string data = \"Quit\"
";
        assert_eq!(
            scan_records(flat, 0)
                .iter()
                .filter(|r| r.is_addressable())
                .count(),
            0
        );

        let extraction = extract_records(flat, &ScannerOptions::default());
        assert!(extraction.used_fallback);
        assert_eq!(extraction.records.len(), 2);
        assert_eq!(extraction.records[0].term, "Menu/Start");
        assert_eq!(extraction.records[0].original_text, "Start");
        assert_eq!(extraction.records[1].data_line_index, Some(7));
    }

    #[test]
    fn fallback_can_be_disabled() {
        let flat = "[0]\n  1 string Term = \"A\"\n  1 string data = \"B\"\n";
        let options = ScannerOptions {
            enable_fallback: false,
            ..ScannerOptions::default()
        };
        let extraction = extract_records(flat, &options);
        assert!(!extraction.used_fallback);
        assert_eq!(extraction.addressable_count(), 0);
        assert_eq!(extraction.records.len(), 1);
    }

    #[test]
    fn lists_strings_with_groups() {
        let strings = extract_strings(NESTED);
        assert_eq!(strings.len(), 1);
        assert_eq!(strings[0].data, "Hi there");
        assert_eq!(strings[0].group, None);

        let grouped = extract_strings("string Term = \"UI/Start\"\n[0]\nstring data = \"Go\"");
        assert_eq!(grouped[0].group.as_deref(), Some("UI"));
    }

    #[test]
    fn lists_languages_and_validity() {
        let text = "[3]\n[0]\n  [1]\n  1 string Term = \"A\"\n[0]\n 1 string data = \"B\"";
        assert_eq!(available_languages(text), vec![0, 1, 3]);
        assert!(is_valid_dump(text));
        assert!(!is_valid_dump("[0]\n  1 string Term = \"A\""));
    }

    #[test]
    fn diffs_and_compares_dumps() {
        let old = "string Term = \"A\"\nstring data = \"1\"\nstring Term = \"B\"\nstring data = \"2\"";
        let new = "string Term = \"B\"\nstring data = \"2\"\nstring Term = \"C\"\nstring data = \"3\"";
        let diff = diff_dumps(old, new);
        assert_eq!(diff.added, vec!["C".to_string()]);
        assert_eq!(diff.removed, vec!["A".to_string()]);
        assert_eq!(diff.unchanged, vec!["B".to_string()]);

        assert!(translations_equal(old, old));
        assert!(!translations_equal(old, new));
    }
}
