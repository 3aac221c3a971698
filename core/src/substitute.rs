/// In-place substitution of translated values into a dump
///
/// Only the value lines addressed by records are rewritten. The line count
/// never changes, so every other record's `data_line_index` stays valid.
use crate::config::RtlOptions;
use crate::escape::escape_value;
use crate::lines::LineModel;
use crate::rtl::format_rtl;
use crate::scanner::{value_span, Record};
use crate::translation_map::TranslationMap;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstitutionOutcome {
    pub text: String,
    /// Number of lines whose content actually changed.
    pub changed: usize,
}

/// Render a value line the way the scanner will read it back.
pub fn render_value_line(line_prefix: &str, value: &str) -> String {
    format!("{}data = \"{}\"", line_prefix, escape_value(value))
}

/// Replace only the quoted value of `current`, keeping its spacing and
/// whatever follows the closing quote (a `\r`, a trailing comment).
fn rewrite_value_line(current: Option<&str>, line_prefix: &str, value: &str) -> String {
    match current.and_then(|line| value_span(line).map(|span| (line, span))) {
        Some((line, span)) => format!(
            "{}{}{}",
            &line[..span.start],
            escape_value(value),
            &line[span.end..]
        ),
        None => render_value_line(line_prefix, value),
    }
}

pub fn apply_translations(
    text: &str,
    records: &[Record],
    translations: &TranslationMap,
) -> SubstitutionOutcome {
    substitute_with(text, records, translations, |value| value.to_string())
}

/// Substitute every translation after passing it through the RTL formatter.
pub fn generate_reversed(
    text: &str,
    records: &[Record],
    translations: &TranslationMap,
    options: &RtlOptions,
) -> SubstitutionOutcome {
    substitute_with(text, records, translations, |value| format_rtl(value, options))
}

fn substitute_with<F>(
    text: &str,
    records: &[Record],
    translations: &TranslationMap,
    transform: F,
) -> SubstitutionOutcome
where
    F: Fn(&str) -> String,
{
    let mut model = LineModel::from_text(text);
    let mut changed = 0;

    for record in records {
        let Some(index) = record.data_line_index else {
            continue;
        };
        let Some(translation) = translations.get(&record.term).filter(|t| !t.is_empty()) else {
            continue;
        };

        let value = transform(translation);
        let line = rewrite_value_line(model.get(index), &record.line_prefix, &value);
        if model.get(index) == Some(line.as_str()) {
            continue;
        }
        if model.replace(index, line) {
            changed += 1;
        } else {
            log::warn!(
                "record {:?} points past the end of the dump (line {})",
                record.term,
                index
            );
        }
    }

    log::debug!("substituted {} value lines", changed);
    SubstitutionOutcome {
        text: model.to_text(),
        changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan_records;

    const NESTED: &str =
        "\n[0]\n0 TermData data\n  1 string Term = \"Hello\"\n[0]\n  1 string data = \"Hi there\"\n";

    fn map(pairs: &[(&str, &str)]) -> TranslationMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn rewrites_only_the_addressed_line() {
        let records = scan_records(NESTED, 0);
        let outcome = apply_translations(NESTED, &records, &map(&[("Hello", "سلام")]));

        assert_eq!(outcome.changed, 1);
        let before: Vec<&str> = NESTED.split('\n').collect();
        let after: Vec<&str> = outcome.text.split('\n').collect();
        assert_eq!(before.len(), after.len());
        for (i, (old, new)) in before.iter().zip(&after).enumerate() {
            if i == 5 {
                assert_eq!(*new, "  1 string data = \"سلام\"");
            } else {
                assert_eq!(old, new);
            }
        }
    }

    #[test]
    fn identity_translation_round_trips() {
        let records = scan_records(NESTED, 0);
        let outcome = apply_translations(NESTED, &records, &map(&[("Hello", "Hi there")]));
        assert_eq!(outcome.changed, 0);
        assert_eq!(outcome.text, NESTED);
        assert_eq!(scan_records(&outcome.text, 0), records);
    }

    #[test]
    fn escapes_special_characters() {
        let records = scan_records(NESTED, 0);
        let tricky = "say \"hi\"\n\tback\\slash";
        let outcome = apply_translations(NESTED, &records, &map(&[("Hello", tricky)]));

        assert_eq!(
            outcome.text.split('\n').nth(5),
            Some("  1 string data = \"say \\\"hi\\\"\\n\\tback\\\\slash\"")
        );
        let rescanned = scan_records(&outcome.text, 0);
        assert_eq!(rescanned[0].original_text, tricky);
    }

    #[test]
    fn skips_records_without_translation_or_line() {
        let mut records = scan_records(NESTED, 0);
        records.push(Record::new("Orphan"));
        records.push(Record {
            data_line_index: Some(99),
            ..Record::new("OutOfRange")
        });

        let outcome = apply_translations(
            NESTED,
            &records,
            &map(&[("Orphan", "x"), ("OutOfRange", "y")]),
        );
        assert_eq!(outcome.changed, 0);
        assert_eq!(outcome.text, NESTED);
    }

    #[test]
    fn keeps_text_after_the_closing_quote() {
        let text = "[0]\r\n0 TermData data\r\n  1 string Term = \"Hello\"\r\n[0]\r\n  1 string data = \"Hi\"\r\n";
        let records = scan_records(text, 0);
        let outcome = apply_translations(text, &records, &map(&[("Hello", "Salam")]));
        assert_eq!(outcome.changed, 1);
        assert_eq!(outcome.text, text.replace("\"Hi\"", "\"Salam\""));

        let commented = "[0]\n0 TermData data\n  1 string Term = \"Hello\"\n[0]\n  1 string data=\"Hi\" // keep me";
        let records = scan_records(commented, 0);
        let outcome = apply_translations(commented, &records, &map(&[("Hello", "Salam")]));
        assert_eq!(
            outcome.text.split('\n').nth(4),
            Some("  1 string data=\"Salam\" // keep me")
        );
    }

    #[test]
    fn reversed_generation_formats_values() {
        let records = scan_records(NESTED, 0);
        let outcome = generate_reversed(
            NESTED,
            &records,
            &map(&[("Hello", "\u{0633}\u{0644}\u{0627}\u{0645}")]),
            &RtlOptions::plain(),
        );
        assert_eq!(
            outcome.text.split('\n').nth(5),
            Some("  1 string data = \"\u{0645}\u{0627}\u{0644}\u{0633}\"")
        );
    }
}
