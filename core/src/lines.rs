/// Line model for I2Languages text dumps
///
/// Every operation on a dump is addressed by line index, so the model keeps
/// a 1:1 mapping with the input split on `\n`. Lines are replaced in place,
/// never inserted or removed.
use once_cell::sync::Lazy;
use regex::Regex;

static BLOCK_COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid block comment regex"));

static LINE_COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)//.*$").expect("valid line comment regex"));

const BOM: char = '\u{FEFF}';

/// Remove a leading byte-order mark and convert CRLF line endings to LF.
pub fn normalize_content(content: &str) -> String {
    content.trim_start_matches(BOM).replace("\r\n", "\n")
}

/// Strip `/* ... */` and `// ...` comments, then trim the result.
pub fn strip_comments(content: &str) -> String {
    let cleaned = BLOCK_COMMENT_RE.replace_all(content, "");
    let cleaned = LINE_COMMENT_RE.replace_all(&cleaned, "");
    cleaned.trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineModel {
    lines: Vec<String>,
}

impl LineModel {
    /// Split text on `\n`. A trailing newline yields a final empty line, so
    /// `to_text` reproduces the input byte for byte.
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(str::to_string).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// Replace the content of one line. Returns `false` when the index is out
    /// of range; the model is left untouched in that case.
    pub fn replace(&mut self, index: usize, content: String) -> bool {
        match self.lines.get_mut(index) {
            Some(slot) => {
                *slot = content;
                true
            }
            None => false,
        }
    }

    pub fn to_text(&self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_text_with_trailing_newline() {
        let text = "a\n  b\n\nc\n";
        let model = LineModel::from_text(text);
        assert_eq!(model.len(), 5);
        assert_eq!(model.get(4), Some(""));
        assert_eq!(model.to_text(), text);
    }

    #[test]
    fn replace_keeps_line_count() {
        let mut model = LineModel::from_text("one\ntwo\nthree");
        assert!(model.replace(1, "TWO".into()));
        assert!(!model.replace(7, "nope".into()));
        assert_eq!(model.len(), 3);
        assert_eq!(model.to_text(), "one\nTWO\nthree");
    }

    #[test]
    fn normalizes_bom_and_crlf() {
        let raw = "\u{FEFF}[0]\r\n  1 string Term = \"A\"\r\n";
        assert_eq!(normalize_content(raw), "[0]\n  1 string Term = \"A\"\n");
    }

    #[test]
    fn strips_comments() {
        let raw = "/* header\nblock */\n[0] // item\n  1 string Term = \"A\"";
        assert_eq!(strip_comments(raw), "[0] \n  1 string Term = \"A\"");
    }
}
