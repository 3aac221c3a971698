/// Unity-style text output
///
/// Each item is written as a minimal dump block followed by its English
/// source on an `EN:` line, so the result can be scanned again.
use super::{ExportFormat, FormatError, FormatHandler, Imported};
use crate::category::Category;
use crate::config::RtlOptions;
use crate::escape::{escape_value, unescape_value};
use crate::lines::LineModel;
use crate::rtl::format_rtl;
use crate::scanner::{scan_records, Record};
use crate::translation_map::TranslationMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const ENGLISH_TAG: &str = "EN: ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxtItem {
    pub term: String,
    pub english: String,
    pub persian: String,
    /// Inferred from the term when absent.
    #[serde(default)]
    pub category: Option<Category>,
}

impl TxtItem {
    /// Build items from records; records without a translation keep their
    /// original text.
    pub fn from_records(records: &[Record], translations: &TranslationMap) -> Vec<TxtItem> {
        records
            .iter()
            .map(|r| TxtItem {
                term: r.term.clone(),
                english: r.original_text.clone(),
                persian: translations
                    .get(&r.term)
                    .filter(|t| !t.is_empty())
                    .unwrap_or(&r.original_text)
                    .to_string(),
                category: None,
            })
            .collect()
    }

    pub fn category(&self) -> Category {
        self.category.unwrap_or_else(|| Category::infer(&self.term))
    }
}

/// Render items as dump blocks, optionally RTL-formatting the values.
pub fn generate_txt_output(items: &[TxtItem], rtl: Option<&RtlOptions>) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(items.len() * 7);
    for (idx, item) in items.iter().enumerate() {
        let value = match rtl {
            Some(options) => format_rtl(&item.persian, options),
            None => item.persian.clone(),
        };
        lines.push(format!("[{}]", idx));
        lines.push("0 TermData data".to_string());
        lines.push(format!("  1 string Term = \"{}\"", escape_value(&item.term)));
        lines.push("[0]".to_string());
        lines.push(format!("  1 string data = \"{}\"", escape_value(&value)));
        lines.push(format!("{}{}", ENGLISH_TAG, escape_value(&item.english)));
        lines.push(String::new());
    }
    lines.join("\n")
}

/// One output per category, keyed `"<Category>.txt"`.
pub fn generate_categorized_files(
    items: &[TxtItem],
    rtl: Option<&RtlOptions>,
) -> BTreeMap<String, String> {
    let mut grouped: BTreeMap<Category, Vec<TxtItem>> = BTreeMap::new();
    for item in items {
        grouped.entry(item.category()).or_default().push(item.clone());
    }

    grouped
        .into_iter()
        .map(|(category, items)| (category.file_name(), generate_txt_output(&items, rtl)))
        .collect()
}

pub struct TxtHandler {
    rtl: Option<RtlOptions>,
}

impl TxtHandler {
    pub fn new() -> Self {
        Self { rtl: None }
    }

    pub fn with_rtl(options: RtlOptions) -> Self {
        Self { rtl: Some(options) }
    }
}

impl FormatHandler for TxtHandler {
    fn export(
        &self,
        records: &[Record],
        translations: &TranslationMap,
    ) -> Result<String, FormatError> {
        let items = TxtItem::from_records(records, translations);
        Ok(generate_txt_output(&items, self.rtl.as_ref()))
    }

    /// Values followed by an `EN:` line are read as translations of that
    /// English text; other values are taken as original text.
    fn import(&self, content: &str) -> Result<Imported, FormatError> {
        let model = LineModel::from_text(content);
        let mut imported = Imported::default();

        for record in scan_records(content, 0) {
            let english = record
                .data_line_index
                .and_then(|i| model.get(i + 1))
                .and_then(|line| line.strip_prefix(ENGLISH_TAG))
                .map(unescape_value);

            let record = match english {
                Some(english) => {
                    if !record.original_text.is_empty() {
                        imported
                            .translations
                            .insert(record.term.clone(), record.original_text.clone());
                    }
                    Record {
                        original_text: english,
                        ..record
                    }
                }
                None => record,
            };
            imported.records.push(record);
        }
        Ok(imported)
    }

    fn format(&self) -> ExportFormat {
        ExportFormat::Txt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<TxtItem> {
        vec![
            TxtItem {
                term: "MainMenu/Play".into(),
                english: "Play".into(),
                persian: "بازی".into(),
                category: None,
            },
            TxtItem {
                term: "Credits".into(),
                english: "Credits".into(),
                persian: "سازندگان".into(),
                category: None,
            },
        ]
    }

    #[test]
    fn renders_dump_blocks() {
        let output = generate_txt_output(&items()[..1], None);
        assert_eq!(
            output,
            "[0]\n0 TermData data\n  1 string Term = \"MainMenu/Play\"\n[0]\n  1 string data = \"بازی\"\nEN: Play\n"
        );
    }

    #[test]
    fn rtl_option_formats_values() {
        let output = generate_txt_output(&items()[..1], Some(&RtlOptions::plain()));
        assert!(output.contains("  1 string data = \"یزاب\""));
    }

    #[test]
    fn groups_by_category() {
        let files = generate_categorized_files(&items(), None);
        assert_eq!(
            files.keys().cloned().collect::<Vec<_>>(),
            vec!["Menu.txt".to_string(), "Misc.txt".to_string()]
        );
        assert!(files["Misc.txt"].contains("Credits"));
        assert!(files["Menu.txt"].starts_with("[0]\n"));
    }

    #[test]
    fn import_reads_back_export() {
        let records = vec![
            Record {
                original_text: "Play".into(),
                ..Record::new("MainMenu/Play")
            },
            Record {
                original_text: "Quit".into(),
                ..Record::new("MainMenu/Quit")
            },
        ];
        let mut map = TranslationMap::new();
        map.insert("MainMenu/Play", "بازی");

        let handler = TxtHandler::new();
        let text = handler.export(&records, &map).unwrap();
        let imported = handler.import(&text).unwrap();

        assert_eq!(imported.records.len(), 2);
        assert_eq!(imported.records[0].original_text, "Play");
        assert_eq!(imported.records[0].data_line_index, Some(4));
        assert_eq!(imported.translations.get("MainMenu/Play"), Some("بازی"));
        // untranslated items were written with their original text
        assert_eq!(imported.translations.get("MainMenu/Quit"), Some("Quit"));
    }
}
