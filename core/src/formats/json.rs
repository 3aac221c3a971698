/// JSON export: a pretty-printed array of `{term, originalText, translation}`
use super::{translation_or_empty, ExportFormat, FormatError, FormatHandler, Imported};
use crate::scanner::Record;
use crate::translation_map::TranslationMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonRecord {
    term: String,
    #[serde(default)]
    original_text: String,
    #[serde(default)]
    translation: Option<String>,
}

pub struct JsonHandler;

impl JsonHandler {
    pub fn new() -> Self {
        Self
    }
}

impl FormatHandler for JsonHandler {
    fn export(
        &self,
        records: &[Record],
        translations: &TranslationMap,
    ) -> Result<String, FormatError> {
        let rows: Vec<JsonRecord> = records
            .iter()
            .map(|r| JsonRecord {
                term: r.term.clone(),
                original_text: r.original_text.clone(),
                translation: Some(translation_or_empty(translations, &r.term).to_string()),
            })
            .collect();

        serde_json::to_string_pretty(&rows)
            .map_err(|e| FormatError::SerializationError(e.to_string()))
    }

    fn import(&self, content: &str) -> Result<Imported, FormatError> {
        import_records(content)
    }

    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }
}

/// Parse `[{term, originalText, translation?}]`. Imported records carry no
/// line address; empty translations are not added to the map.
pub fn import_records(content: &str) -> Result<Imported, FormatError> {
    let rows: Vec<JsonRecord> =
        serde_json::from_str(content).map_err(|e| FormatError::ParseError(e.to_string()))?;

    let mut imported = Imported::default();
    for row in rows {
        if let Some(translation) = row.translation.filter(|t| !t.is_empty()) {
            imported.translations.insert(row.term.clone(), translation);
        }
        imported.records.push(Record {
            original_text: row.original_text,
            ..Record::new(row.term)
        });
    }
    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_pretty_array_in_record_order() {
        let records = vec![
            Record {
                original_text: "Start".into(),
                ..Record::new("Menu/Start")
            },
            Record::new("Empty"),
        ];
        let mut map = TranslationMap::new();
        map.insert("Menu/Start", "شروع");

        let json = JsonHandler::new().export(&records, &map).unwrap();
        assert!(json.starts_with("[\n  {\n    \"term\": \"Menu/Start\""));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["originalText"], "Start");
        assert_eq!(value[0]["translation"], "شروع");
        assert_eq!(value[1]["translation"], "");
    }

    #[test]
    fn imports_records_and_translations() {
        let imported = import_records(
            r#"[{"term":"A","originalText":"a","translation":"x"},{"term":"B","originalText":"b"}]"#,
        )
        .unwrap();

        assert_eq!(imported.records.len(), 2);
        assert_eq!(imported.records[1].original_text, "b");
        assert_eq!(imported.records[1].data_line_index, None);
        assert_eq!(imported.translations.len(), 1);
        assert_eq!(imported.translations.get("A"), Some("x"));
    }

    #[test]
    fn rejects_non_array_input() {
        assert!(matches!(
            import_records("{\"A\": \"x\"}"),
            Err(FormatError::ParseError(_))
        ));
    }
}
