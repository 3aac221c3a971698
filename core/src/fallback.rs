/// Multi-shape extraction for dumps the primary scanner cannot address
///
/// Records appear in two shapes in the wild:
///
/// ```text
/// nested                         flat
/// [0]                            [0]
///  0 TermData data                0 TermData data
///   1 string Term = "Start"        1 string Term = "Start"
///   [0]                            1 string data = "Start"
///    1 string data = "Start"
/// ```
///
/// The shape is decided per item block, so one file may mix both. Every
/// probe is limited to a fixed window of lines after the block header.
use crate::category::Category;
use crate::scanner::{classify_lines, LineClass, Record};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RecordShape {
    /// Value sits under a `[array_index]` element after the term.
    Nested {
        array_index: usize,
        value_line: usize,
    },
    /// Value line follows the term line, before any array element.
    Flat { value_line: usize },
}

impl RecordShape {
    pub fn value_line(&self) -> usize {
        match self {
            RecordShape::Nested { value_line, .. } | RecordShape::Flat { value_line } => {
                *value_line
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapedRecord {
    pub record: Record,
    pub shape: RecordShape,
    pub category: Category,
}

/// Decide the shape from the classified lines following a term line.
///
/// `first_line` is the absolute index of `after_term[0]`. Scanning stops at
/// the next term or `TermData` line, which belongs to another item.
pub fn detect_shape(
    after_term: &[LineClass],
    first_line: usize,
    language_index: usize,
) -> Option<RecordShape> {
    let mut in_array = false;
    for (offset, class) in after_term.iter().enumerate() {
        match class {
            LineClass::TermDecl { .. } | LineClass::TermData => return None,
            LineClass::IndexMarker { index } => {
                let holds_value =
                    matches!(after_term.get(offset + 1), Some(LineClass::ValueDecl { .. }));
                if *index == language_index && holds_value {
                    return Some(RecordShape::Nested {
                        array_index: *index,
                        value_line: first_line + offset + 1,
                    });
                }
                in_array = true;
            }
            LineClass::ValueDecl { .. } if !in_array => {
                return Some(RecordShape::Flat {
                    value_line: first_line + offset,
                });
            }
            _ => {}
        }
    }

    None
}

pub fn fallback_extract(text: &str, language_index: usize, window: usize) -> Vec<ShapedRecord> {
    let classes = classify_lines(text);
    extract_classified(&classes, language_index, window)
}

pub(crate) fn extract_classified(
    classes: &[LineClass],
    language_index: usize,
    window: usize,
) -> Vec<ShapedRecord> {
    let mut shaped = Vec::new();
    let mut cursor = 0;

    while cursor < classes.len() {
        if let LineClass::IndexMarker { .. } = classes[cursor] {
            if let Some(found) = probe_block(classes, cursor, language_index, window) {
                cursor = found.shape.value_line() + 1;
                shaped.push(found);
                continue;
            }
        }
        cursor += 1;
    }

    shaped
}

fn probe_block(
    classes: &[LineClass],
    header: usize,
    language_index: usize,
    window: usize,
) -> Option<ShapedRecord> {
    let end = (header + 1 + window).min(classes.len());

    let mut term_hit = None;
    for line in header + 1..end {
        match &classes[line] {
            LineClass::TermDecl { term } => {
                term_hit = Some((line, term.clone()));
                break;
            }
            // another marker before any term: not an item header
            LineClass::IndexMarker { .. } => return None,
            _ => {}
        }
    }
    let (term_line, term) = term_hit?;

    let shape = detect_shape(&classes[term_line + 1..end], term_line + 1, language_index)?;
    let LineClass::ValueDecl { prefix, value } = &classes[shape.value_line()] else {
        return None;
    };

    let category = Category::infer(&term);
    Some(ShapedRecord {
        record: Record {
            term,
            original_text: value.clone(),
            data_line_index: Some(shape.value_line()),
            line_prefix: prefix.clone(),
        },
        shape,
        category,
    })
}
