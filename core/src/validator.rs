/// Structural diagnostics and canonical re-indentation for dumps
///
/// The analyzer never blocks extraction or substitution; it only reports.
/// `auto_fix` is a blind canonicalization pass and does not consult the
/// analyzer's findings.
use crate::config::ValidatorOptions;
use crate::scanner::{classify_line, LineClass};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static FIX_TERM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:\d+\s+)?string\s+Term\s*=\s*"((?:[^"\\]|\\.)*)""#)
        .expect("valid term fix regex")
});

static FIX_DATA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:\d+\s+)?string\s+data\s*=\s*"((?:[^"\\]|\\.)*)""#)
        .expect("valid data fix regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureIssue {
    pub severity: Severity,
    /// 1-based line number.
    pub line: usize,
    /// Item number the issue belongs to, when it belongs to one.
    pub item: Option<usize>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureReport {
    /// No error-severity issue was found.
    pub is_valid: bool,
    pub issues: Vec<StructureIssue>,
    pub total_items: usize,
    /// Items with all of TermData, Term, nested `[0]` and data present.
    pub valid_items: usize,
}

impl StructureReport {
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

/// How a bare `[n]` line is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    /// Starts a new item.
    Item(usize),
    /// Language array element: the next line is a value declaration.
    Nested(usize),
}

fn classify_markers(classes: &[LineClass]) -> Vec<Option<Marker>> {
    classes
        .iter()
        .enumerate()
        .map(|(i, class)| match class {
            LineClass::IndexMarker { index } => {
                if matches!(classes.get(i + 1), Some(LineClass::ValueDecl { .. })) {
                    Some(Marker::Nested(*index))
                } else {
                    Some(Marker::Item(*index))
                }
            }
            _ => None,
        })
        .collect()
}

#[derive(Debug, Default)]
struct ItemShape {
    term_data: bool,
    term: bool,
    nested_array: bool,
    data: bool,
}

impl ItemShape {
    fn is_complete(&self) -> bool {
        self.term_data && self.term && self.nested_array && self.data
    }
}

pub fn analyze_structure(text: &str, options: &ValidatorOptions) -> StructureReport {
    let lines: Vec<&str> = text.split('\n').collect();
    let classes: Vec<LineClass> = lines.iter().map(|l| classify_line(l)).collect();
    let markers = classify_markers(&classes);

    let mut issues = Vec::new();
    let mut total_items = 0;
    let mut valid_items = 0;
    let expected_prefix = format!("{}[", options.item_indent);

    for (i, line) in lines.iter().enumerate() {
        if let Some(Marker::Item(item)) = markers[i] {
            total_items += 1;
            let line_no = i + 1;

            if !line.starts_with(&expected_prefix) {
                issues.push(StructureIssue {
                    severity: Severity::Warning,
                    line: line_no,
                    item: Some(item),
                    message: format!("Item [{}] has incorrect indentation", item),
                });
            }

            let end = (i + 1 + options.lookahead).min(lines.len());
            let mut shape = ItemShape::default();
            for j in i + 1..end {
                if let Some(Marker::Item(_)) = markers[j] {
                    break;
                }
                match &classes[j] {
                    LineClass::TermData => shape.term_data = true,
                    LineClass::TermDecl { .. } => shape.term = true,
                    LineClass::ValueDecl { .. } => shape.data = true,
                    _ => {}
                }
                if markers[j] == Some(Marker::Nested(0)) {
                    shape.nested_array = true;
                }
            }

            let missing = [
                (shape.term_data, Severity::Error, "Missing \"0 TermData data\""),
                (shape.term, Severity::Error, "Missing \"1 string Term\""),
                (shape.nested_array, Severity::Warning, "Missing nested [0] array"),
                (shape.data, Severity::Warning, "Missing \"1 string data\""),
            ];
            for (present, severity, what) in missing {
                if !present {
                    issues.push(StructureIssue {
                        severity,
                        line: line_no,
                        item: Some(item),
                        message: format!("{} at item [{}]", what, item),
                    });
                }
            }

            if shape.is_complete() {
                valid_items += 1;
            }
        }

        let trimmed = line.trim();
        if trimmed.contains("string") && trimmed.contains('=') && unescaped_quotes(trimmed) % 2 != 0
        {
            issues.push(StructureIssue {
                severity: Severity::Error,
                line: i + 1,
                item: None,
                message: "Unmatched quotes in string declaration".to_string(),
            });
        }
    }

    let is_valid = !issues.iter().any(|i| i.severity == Severity::Error);
    StructureReport {
        is_valid,
        issues,
        total_items,
        valid_items,
    }
}

fn unescaped_quotes(line: &str) -> usize {
    let mut count = 0;
    let mut escaped = false;
    for ch in line.chars() {
        match ch {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => count += 1,
            _ => escaped = false,
        }
    }
    count
}

/// Rewrite recognized lines with canonical indentation.
///
/// Item markers, language markers, `TermData`, `Term` and `data` lines are
/// re-emitted at the configured widths with quoted values kept verbatim.
/// Unrecognized non-empty lines pass through unchanged; empty lines are
/// dropped.
pub fn auto_fix(text: &str, options: &ValidatorOptions) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let classes: Vec<LineClass> = lines.iter().map(|l| classify_line(l)).collect();
    let markers = classify_markers(&classes);
    let indent = &options.fix_indent;
    let pad = |width: usize| " ".repeat(width);

    let mut fixed = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let rewritten = match (markers[i], &classes[i]) {
            (Some(Marker::Item(n)), _) => Some(format!("{}[{}]", pad(indent.item), n)),
            (Some(Marker::Nested(n)), _) => Some(format!("{}[{}]", pad(indent.nested_array), n)),
            (None, LineClass::TermData) => Some(format!("{}0 TermData data", pad(indent.term_data))),
            (None, LineClass::TermDecl { .. }) => FIX_TERM_RE.captures(trimmed).map(|caps| {
                format!("{}1 string Term = \"{}\"", pad(indent.term), &caps[1])
            }),
            (None, LineClass::ValueDecl { .. }) => FIX_DATA_RE.captures(trimmed).map(|caps| {
                format!("{}1 string data = \"{}\"", pad(indent.data), &caps[1])
            }),
            _ => None,
        };

        fixed.push(rewritten.unwrap_or_else(|| line.to_string()));
    }

    fixed.join("\n")
}
