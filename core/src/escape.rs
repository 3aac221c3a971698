/// Escaping for quoted values in Unity text dumps and PO files.

/// Escape a value for a double-quoted field.
///
/// Order matters: backslashes first so the escapes added afterwards are not
/// doubled again.
pub fn escape_value(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Inverse of [`escape_value`]. Unknown escape sequences are kept verbatim,
/// a dangling trailing backslash is kept as-is.
pub fn unescape_value(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            output.push(ch);
            continue;
        }

        match chars.next() {
            Some('\\') => output.push('\\'),
            Some('"') => output.push('"'),
            Some('n') => output.push('\n'),
            Some('r') => output.push('\r'),
            Some('t') => output.push('\t'),
            Some(other) => {
                output.push('\\');
                output.push(other);
            }
            None => output.push('\\'),
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_in_fixed_order() {
        assert_eq!(escape_value(r#"a\b"#), r#"a\\b"#);
        assert_eq!(escape_value("say \"hi\""), r#"say \"hi\""#);
        assert_eq!(escape_value("line1\nline2\r\tend"), r"line1\nline2\r\tend");
    }

    #[test]
    fn unescape_inverts_escape() {
        let samples = [
            "",
            "plain",
            "back\\slash",
            "\\n literal backslash-n",
            "quote \" and \\\" mixed",
            "tabs\tand\nnewlines\r\n",
            "trailing backslash \\",
            "سلام {0}\n%d",
        ];
        for sample in samples {
            assert_eq!(unescape_value(&escape_value(sample)), sample, "sample: {sample:?}");
        }
    }

    #[test]
    fn keeps_unknown_escapes() {
        assert_eq!(unescape_value(r"A \x"), r"A \x");
        assert_eq!(unescape_value("end\\"), "end\\");
    }
}
