/// Gettext PO export and import
///
/// Each record becomes `#: <term>` / `msgid` / `msgstr` followed by a blank
/// line. Quoted strings use the same escaping as dump values.
use super::{translation_or_empty, ExportFormat, FormatError, FormatHandler, Imported};
use crate::escape::{escape_value, unescape_value};
use crate::scanner::Record;
use crate::translation_map::TranslationMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoEntry {
    /// Term taken from the `#:` reference comment.
    pub reference: Option<String>,
    pub msgid: String,
    pub msgstr: String,
}

pub struct PoHandler;

impl PoHandler {
    pub fn new() -> Self {
        Self
    }
}

impl FormatHandler for PoHandler {
    fn export(
        &self,
        records: &[Record],
        translations: &TranslationMap,
    ) -> Result<String, FormatError> {
        let mut po = String::new();
        for record in records {
            po.push_str(&format!("#: {}\n", record.term));
            po.push_str(&format!("msgid \"{}\"\n", escape_value(&record.original_text)));
            po.push_str(&format!(
                "msgstr \"{}\"\n\n",
                escape_value(translation_or_empty(translations, &record.term))
            ));
        }
        Ok(po)
    }

    /// Entries without a `#:` reference use their msgid as the term.
    fn import(&self, content: &str) -> Result<Imported, FormatError> {
        let mut imported = Imported::default();
        for entry in parse_po(content) {
            let term = entry.reference.unwrap_or_else(|| entry.msgid.clone());
            if term.is_empty() {
                continue;
            }
            if !entry.msgstr.trim().is_empty() {
                imported.translations.insert(term.clone(), entry.msgstr);
            }
            imported.records.push(Record {
                original_text: entry.msgid,
                ..Record::new(term)
            });
        }
        Ok(imported)
    }

    fn format(&self) -> ExportFormat {
        ExportFormat::Po
    }
}

/// Map each msgid to its msgstr, keeping only non-blank translations.
pub fn import_po(content: &str) -> TranslationMap {
    parse_po(content)
        .into_iter()
        .filter(|e| !e.msgid.is_empty() && !e.msgstr.trim().is_empty())
        .map(|e| (e.msgid, e.msgstr))
        .collect()
}

/// Parse PO content into entries. Blank lines end an entry; continuation
/// lines (`"..."`) extend the last directive.
pub fn parse_po(content: &str) -> Vec<PoEntry> {
    let mut entries = Vec::new();
    let mut entry = PoEntry::default();
    let mut seen_msgid = false;
    let mut current_field: Option<&str> = None;

    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() {
            if seen_msgid {
                entries.push(std::mem::take(&mut entry));
            }
            entry = PoEntry::default();
            seen_msgid = false;
            current_field = None;
            continue;
        }

        if let Some(reference) = line.strip_prefix("#:") {
            entry.reference = Some(reference.trim().to_string());
        } else if line.starts_with('#') {
            continue;
        } else if let Some(rest) = line.strip_prefix("msgid ") {
            entry.msgid = unquote(rest);
            seen_msgid = true;
            current_field = Some("msgid");
        } else if let Some(rest) = line.strip_prefix("msgstr ") {
            entry.msgstr = unquote(rest);
            current_field = Some("msgstr");
        } else if line.starts_with('"') {
            let continued = unquote(line);
            match current_field {
                Some("msgid") => entry.msgid.push_str(&continued),
                Some("msgstr") => entry.msgstr.push_str(&continued),
                _ => {}
            }
        }
    }

    if seen_msgid {
        entries.push(entry);
    }
    entries
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    let s = s.strip_prefix('"').unwrap_or(s);
    let s = s.strip_suffix('"').unwrap_or(s);
    unescape_value(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_blocks_per_record() {
        let records = vec![Record {
            original_text: "Say \"hi\"\nnow".into(),
            ..Record::new("Greeting")
        }];
        let mut map = TranslationMap::new();
        map.insert("Greeting", "سلام");

        let po = PoHandler::new().export(&records, &map).unwrap();
        assert_eq!(
            po,
            "#: Greeting\nmsgid \"Say \\\"hi\\\"\\nnow\"\nmsgstr \"سلام\"\n\n"
        );
    }

    #[test]
    fn import_po_keeps_non_empty_msgstr() {
        let content = "msgid \"\"\nmsgstr \"Content-Type: text/plain\"\n\n\
#: A\nmsgid \"Hello\"\nmsgstr \"سلام\"\n\n\
#: B\nmsgid \"Bye\"\nmsgstr \"\"\n\n\
msgid \"Long\"\nmsgstr \"\"\n\"continued\"\n";
        let map = import_po(content);
        assert_eq!(map.get("Hello"), Some("سلام"));
        assert!(map.get("Bye").is_none());
        assert_eq!(map.get("Long"), Some("continued"));
    }

    #[test]
    fn handler_import_uses_references() {
        let handler = PoHandler::new();
        let records = vec![
            Record {
                original_text: "Play".into(),
                ..Record::new("Menu/Play")
            },
            Record {
                original_text: "Quit".into(),
                ..Record::new("Menu/Quit")
            },
        ];
        let mut map = TranslationMap::new();
        map.insert("Menu/Play", "بازی");

        let po = handler.export(&records, &map).unwrap();
        let imported = handler.import(&po).unwrap();
        assert_eq!(imported.records, records);
        assert_eq!(imported.translations, map);
    }
}
