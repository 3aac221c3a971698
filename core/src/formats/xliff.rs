/// XLIFF 1.2 export and import
use super::{translation_or_empty, ExportFormat, FormatError, FormatHandler, Imported};
use crate::scanner::Record;
use crate::translation_map::TranslationMap;
use once_cell::sync::Lazy;
use regex::Regex;

const VERSION: &str = "1.2";
const XMLNS: &str = "urn:oasis:names:tc:xliff:document:1.2";

static TRANS_UNIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<trans-unit\s+id="([^"]*)"\s*>\s*<source>(.*?)</source>\s*(?:<target>(.*?)</target>|<target\s*/>)?\s*</trans-unit>"#,
    )
    .expect("valid trans-unit regex")
});

pub struct XliffHandler {
    source_language: String,
    target_language: String,
}

impl XliffHandler {
    /// English source, Persian target.
    pub fn new() -> Self {
        Self::with_languages("en", "fa")
    }

    pub fn with_languages(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_language: source.into(),
            target_language: target.into(),
        }
    }
}

impl FormatHandler for XliffHandler {
    fn export(
        &self,
        records: &[Record],
        translations: &TranslationMap,
    ) -> Result<String, FormatError> {
        let mut xliff = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<xliff version=\"{VERSION}\" xmlns=\"{XMLNS}\">\n  \
<file original=\"unity\" source-language=\"{}\" target-language=\"{}\" datatype=\"plaintext\">\n    \
<body>",
            escape_xml(&self.source_language),
            escape_xml(&self.target_language),
        );

        for record in records {
            xliff.push_str(&format!(
                "\n      <trans-unit id=\"{}\">\n        <source>{}</source>\n        <target>{}</target>\n      </trans-unit>",
                escape_xml(&record.term),
                escape_xml(&record.original_text),
                escape_xml(translation_or_empty(translations, &record.term)),
            ));
        }

        xliff.push_str("\n    </body>\n  </file>\n</xliff>");
        Ok(xliff)
    }

    fn import(&self, content: &str) -> Result<Imported, FormatError> {
        if !content.contains("<xliff") {
            return Err(FormatError::ParseError("missing <xliff> root".to_string()));
        }

        let mut imported = Imported::default();
        for caps in TRANS_UNIT_RE.captures_iter(content) {
            let term = unescape_xml(&caps[1]);
            let source = unescape_xml(&caps[2]);
            let target = caps.get(3).map(|m| unescape_xml(m.as_str())).unwrap_or_default();

            if !target.is_empty() {
                imported.translations.insert(term.clone(), target);
            }
            imported.records.push(Record {
                original_text: source,
                ..Record::new(term)
            });
        }
        Ok(imported)
    }

    fn format(&self) -> ExportFormat {
        ExportFormat::Xliff
    }
}

pub fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Inverse of [`escape_xml`]; `&amp;` last so `&amp;lt;` stays `&lt;`.
pub fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Vec<Record>, TranslationMap) {
        let records = vec![
            Record {
                original_text: "Fish & <Chips>".into(),
                ..Record::new("Food/Dish")
            },
            Record {
                original_text: "It's \"done\"".into(),
                ..Record::new("Status")
            },
        ];
        let mut map = TranslationMap::new();
        map.insert("Food/Dish", "ماهی");
        (records, map)
    }

    #[test]
    fn exports_xliff_document() {
        let (records, map) = sample();
        let xliff = XliffHandler::new().export(&records, &map).unwrap();

        assert!(xliff.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<xliff version=\"1.2\""));
        assert!(xliff.contains(
            "<file original=\"unity\" source-language=\"en\" target-language=\"fa\" datatype=\"plaintext\">"
        ));
        assert!(xliff.contains("<trans-unit id=\"Food/Dish\">"));
        assert!(xliff.contains("<source>Fish &amp; &lt;Chips&gt;</source>"));
        assert!(xliff.contains("<source>It&#39;s &quot;done&quot;</source>"));
        assert!(xliff.contains("<target></target>"));
        assert!(xliff.ends_with("</body>\n  </file>\n</xliff>"));
    }

    #[test]
    fn import_reads_back_export() {
        let (records, map) = sample();
        let handler = XliffHandler::with_languages("en", "ar");
        let xliff = handler.export(&records, &map).unwrap();
        assert!(xliff.contains("target-language=\"ar\""));

        let imported = handler.import(&xliff).unwrap();
        assert_eq!(imported.records, records);
        assert_eq!(imported.translations, map);
    }

    #[test]
    fn import_requires_root() {
        assert!(XliffHandler::new().import("<doc/>").is_err());
    }
}
