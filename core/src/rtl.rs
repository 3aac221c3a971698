/// Right-to-left preparation of Persian text for Unity's legacy text renderer
///
/// The renderer draws glyphs strictly left to right and does no shaping, so
/// Persian runs are stored reversed (and optionally as presentation-form
/// glyphs). Latin words, digits and placeholders embedded in the sentence
/// keep their natural order; only the RTL runs are reversed.
use crate::config::RtlOptions;

pub const RIGHT_TO_LEFT_OVERRIDE: char = '\u{202E}';
pub const ZERO_WIDTH_NON_JOINER: char = '\u{200C}';

const PERSIAN_DIGITS: [char; 10] = ['۰', '۱', '۲', '۳', '۴', '۵', '۶', '۷', '۸', '۹'];

/// Arabic letter variants mapped to their Persian canonical letters.
const NORMALIZATION: &[(char, char)] = &[
    ('\u{0643}', '\u{06A9}'), // kaf -> keheh
    ('\u{064A}', '\u{06CC}'), // yeh -> farsi yeh
    ('\u{0629}', '\u{0647}'), // teh marbuta -> heh
    ('\u{0623}', '\u{0627}'), // alef with hamza above
    ('\u{0625}', '\u{0627}'), // alef with hamza below
    ('\u{0624}', '\u{0648}'), // waw with hamza
];

/// Isolated presentation forms for the Persian alphabet.
const PRESENTATION_FORMS: &[(char, char)] = &[
    ('\u{0622}', '\u{FE81}'),
    ('\u{0627}', '\u{FE8D}'),
    ('\u{0628}', '\u{FE8F}'),
    ('\u{067E}', '\u{FB56}'),
    ('\u{062A}', '\u{FE95}'),
    ('\u{062B}', '\u{FE99}'),
    ('\u{062C}', '\u{FE9D}'),
    ('\u{0686}', '\u{FB7A}'),
    ('\u{062D}', '\u{FEA1}'),
    ('\u{062E}', '\u{FEA5}'),
    ('\u{062F}', '\u{FEA9}'),
    ('\u{0630}', '\u{FEAB}'),
    ('\u{0631}', '\u{FEAD}'),
    ('\u{0632}', '\u{FEAF}'),
    ('\u{0698}', '\u{FB8A}'),
    ('\u{0633}', '\u{FEB1}'),
    ('\u{0634}', '\u{FEB5}'),
    ('\u{0635}', '\u{FEB9}'),
    ('\u{0636}', '\u{FEBD}'),
    ('\u{0637}', '\u{FEC1}'),
    ('\u{0638}', '\u{FEC5}'),
    ('\u{0639}', '\u{FEC9}'),
    ('\u{063A}', '\u{FECD}'),
    ('\u{0641}', '\u{FED1}'),
    ('\u{0642}', '\u{FED5}'),
    ('\u{06A9}', '\u{FB8E}'),
    ('\u{06AF}', '\u{FB92}'),
    ('\u{0644}', '\u{FEDD}'),
    ('\u{0645}', '\u{FEE1}'),
    ('\u{0646}', '\u{FEE5}'),
    ('\u{0648}', '\u{FEED}'),
    ('\u{0647}', '\u{FEE9}'),
    ('\u{06CC}', '\u{FBFC}'),
];

pub fn normalize_persian(text: &str) -> String {
    text.chars()
        .map(|ch| {
            NORMALIZATION
                .iter()
                .find(|(from, _)| *from == ch)
                .map(|(_, to)| *to)
                .unwrap_or(ch)
        })
        .collect()
}

pub fn strip_zero_width_non_joiners(text: &str) -> String {
    text.chars().filter(|ch| *ch != ZERO_WIDTH_NON_JOINER).collect()
}

/// Arabic, Arabic Presentation Forms-A and Presentation Forms-B blocks.
pub fn is_rtl_char(ch: char) -> bool {
    matches!(ch, '\u{0600}'..='\u{06FF}' | '\u{FB50}'..='\u{FDFF}' | '\u{FE70}'..='\u{FEFF}')
}

pub fn presentation_form(ch: char) -> char {
    PRESENTATION_FORMS
        .iter()
        .find(|(letter, _)| *letter == ch)
        .map(|(_, glyph)| *glyph)
        .unwrap_or(ch)
}

/// A maximal run of characters sharing one direction class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidiRun {
    pub text: String,
    pub rtl: bool,
}

pub fn segment_runs(text: &str) -> Vec<BidiRun> {
    let mut runs: Vec<BidiRun> = Vec::new();
    for ch in text.chars() {
        let rtl = is_rtl_char(ch);
        match runs.last_mut() {
            Some(run) if run.rtl == rtl => run.text.push(ch),
            _ => runs.push(BidiRun {
                text: ch.to_string(),
                rtl,
            }),
        }
    }
    runs
}

/// Prepare `text` for the legacy renderer.
///
/// Steps: letter normalization, optional ZWNJ removal, run segmentation,
/// reversal of RTL runs (optionally mapped to presentation forms), optional
/// Persian digits, optional leading U+202E. Empty input stays empty.
pub fn format_rtl(text: &str, options: &RtlOptions) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut normalized = normalize_persian(text);
    if options.strip_zero_width_non_joiner {
        normalized = strip_zero_width_non_joiners(&normalized);
    }

    let mut output = String::with_capacity(normalized.len() + 3);
    if options.override_mark {
        output.push(RIGHT_TO_LEFT_OVERRIDE);
    }

    for run in segment_runs(&normalized) {
        if !run.rtl {
            output.push_str(&run.text);
            continue;
        }
        for ch in run.text.chars().rev() {
            if options.presentation_forms {
                output.push(presentation_form(ch));
            } else {
                output.push(ch);
            }
        }
    }

    if options.persian_digits {
        output = to_persian_digits(&output);
    }
    output
}

/// Bare variant: normalization plus per-run reversal, nothing else.
pub fn reverse_rtl_runs(text: &str) -> String {
    format_rtl(text, &RtlOptions::plain())
}

pub fn to_persian_digits(text: &str) -> String {
    text.chars()
        .map(|ch| match ch.to_digit(10) {
            Some(d) if ch.is_ascii_digit() => PERSIAN_DIGITS[d as usize],
            _ => ch,
        })
        .collect()
}

pub fn contains_persian(text: &str) -> bool {
    text.chars().any(|ch| ('\u{0600}'..='\u{06FF}').contains(&ch))
}

/// Whole-string reversal with no segmentation.
pub fn simple_reverse(text: &str) -> String {
    text.chars().rev().collect()
}
