/// CSV export: `Term,Original Text,Translation`
use super::{translation_or_empty, ExportFormat, FormatError, FormatHandler, Imported};
use crate::scanner::Record;
use crate::translation_map::TranslationMap;

pub const HEADER: &str = "Term,Original Text,Translation";

pub struct CsvHandler;

impl CsvHandler {
    pub fn new() -> Self {
        Self
    }
}

impl FormatHandler for CsvHandler {
    fn export(
        &self,
        records: &[Record],
        translations: &TranslationMap,
    ) -> Result<String, FormatError> {
        let mut out = String::from(HEADER);
        for record in records {
            out.push('\n');
            out.push_str(&escape_field(&record.term));
            out.push(',');
            out.push_str(&escape_field(&record.original_text));
            out.push(',');
            out.push_str(&escape_field(translation_or_empty(translations, &record.term)));
        }
        Ok(out)
    }

    fn import(&self, content: &str) -> Result<Imported, FormatError> {
        let mut rows = parse_rows(content)?.into_iter();
        let mut imported = Imported::default();

        let Some(first) = rows.next() else {
            return Ok(imported);
        };
        let data_rows = if first.join(",") == HEADER {
            None
        } else {
            Some(first)
        };

        for row in data_rows.into_iter().chain(rows) {
            let mut fields = row.into_iter();
            let Some(term) = fields.next().filter(|t| !t.is_empty()) else {
                continue;
            };
            let original = fields.next().unwrap_or_default();
            let translation = fields.next().unwrap_or_default();

            if !translation.is_empty() {
                imported.translations.insert(term.clone(), translation);
            }
            imported.records.push(Record {
                original_text: original,
                ..Record::new(term)
            });
        }
        Ok(imported)
    }

    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }
}

/// Quote a field when it contains a quote, comma or newline.
pub fn escape_field(text: &str) -> String {
    if text.contains('"') || text.contains(',') || text.contains('\n') {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// Split CSV content into rows of unquoted fields. Quoted fields may span
/// lines; `""` inside quotes is a literal quote.
fn parse_rows(content: &str) -> Result<Vec<Vec<String>>, FormatError> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            '"' if field.is_empty() => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err(FormatError::ParseError(
            "unterminated quoted field".to_string(),
        ));
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows.retain(|r| !(r.len() == 1 && r[0].is_empty()));
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<Record> {
        vec![
            Record {
                original_text: "Hello, world".into(),
                ..Record::new("Greeting")
            },
            Record {
                original_text: "Say \"hi\"".into(),
                ..Record::new("Quote")
            },
            Record {
                original_text: "Line\nbreak".into(),
                ..Record::new("Multi")
            },
        ]
    }

    #[test]
    fn exports_with_header_and_escaping() {
        let mut map = TranslationMap::new();
        map.insert("Greeting", "سلام");

        let csv = CsvHandler::new().export(&records(), &map).unwrap();
        let expected = "Term,Original Text,Translation\n\
Greeting,\"Hello, world\",سلام\n\
Quote,\"Say \"\"hi\"\"\",\n\
Multi,\"Line\nbreak\",";
        assert_eq!(csv, expected);
    }

    #[test]
    fn import_reads_back_export() {
        let mut map = TranslationMap::new();
        map.insert("Quote", "\"x\", y");
        let handler = CsvHandler::new();
        let csv = handler.export(&records(), &map).unwrap();

        let imported = handler.import(&csv).unwrap();
        assert_eq!(imported.records.len(), 3);
        assert_eq!(imported.records[2].original_text, "Line\nbreak");
        assert_eq!(imported.translations.len(), 1);
        assert_eq!(imported.translations.get("Quote"), Some("\"x\", y"));
    }

    #[test]
    fn rejects_unterminated_quotes() {
        assert!(CsvHandler::new().import("A,\"broken\n").is_err());
    }
}
