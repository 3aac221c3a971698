/// Dump file I/O preserving byte-order mark and line endings
///
/// Dumps are scanned as LF-only text; the original layout is restored when
/// the substituted dump is written back.
use std::fs;
use std::path::Path;
use thiserror::Error;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("dump is not valid {0} text")]
    InvalidText(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    /// Bytes that are not UTF-8, read one byte per code point.
    Latin1,
}

impl Encoding {
    fn label(self) -> &'static str {
        match self {
            Encoding::Utf8 | Encoding::Utf8Bom => "UTF-8",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Utf16Be => "UTF-16BE",
            Encoding::Latin1 => "Latin-1",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Newline {
    Lf,
    Crlf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    pub encoding: Encoding,
    pub newline: Newline,
}

impl Default for FileMetadata {
    fn default() -> Self {
        Self {
            encoding: Encoding::Utf8,
            newline: Newline::Lf,
        }
    }
}

impl FileMetadata {
    pub fn detect(content: &[u8]) -> Self {
        let encoding = if content.starts_with(&UTF8_BOM) {
            Encoding::Utf8Bom
        } else if content.starts_with(&UTF16_LE_BOM) {
            Encoding::Utf16Le
        } else if content.starts_with(&UTF16_BE_BOM) {
            Encoding::Utf16Be
        } else if std::str::from_utf8(content).is_ok() {
            Encoding::Utf8
        } else {
            Encoding::Latin1
        };

        let newline = if content.windows(2).any(|w| w == b"\r\n") {
            Newline::Crlf
        } else {
            Newline::Lf
        };

        Self { encoding, newline }
    }

    pub fn has_bom(&self) -> bool {
        matches!(
            self.encoding,
            Encoding::Utf8Bom | Encoding::Utf16Le | Encoding::Utf16Be
        )
    }
}

/// Dump text with LF line endings and no BOM, plus how it was stored.
#[derive(Debug, Clone)]
pub struct DumpText {
    pub text: String,
    pub metadata: FileMetadata,
}

pub fn decode_dump(bytes: &[u8]) -> Result<DumpText, EncodingError> {
    let metadata = FileMetadata::detect(bytes);
    let invalid = || EncodingError::InvalidText(metadata.encoding.label());

    let decoded = match metadata.encoding {
        Encoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|_| invalid())?,
        Encoding::Utf8Bom => String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).map_err(|_| invalid())?,
        Encoding::Utf16Le | Encoding::Utf16Be => {
            let units: Vec<u16> = bytes[2..]
                .chunks_exact(2)
                .map(|pair| match metadata.encoding {
                    Encoding::Utf16Le => u16::from_le_bytes([pair[0], pair[1]]),
                    _ => u16::from_be_bytes([pair[0], pair[1]]),
                })
                .collect();
            String::from_utf16(&units).map_err(|_| invalid())?
        }
        Encoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
    };

    Ok(DumpText {
        text: decoded.replace("\r\n", "\n"),
        metadata,
    })
}

/// Encode LF text back into the layout described by `metadata`. Characters
/// outside Latin-1 become `?` when the dump was not Unicode.
pub fn encode_dump(text: &str, metadata: &FileMetadata) -> Vec<u8> {
    let text = match metadata.newline {
        Newline::Lf => text.replace("\r\n", "\n"),
        Newline::Crlf => text.replace("\r\n", "\n").replace('\n', "\r\n"),
    };

    match metadata.encoding {
        Encoding::Utf8 => text.into_bytes(),
        Encoding::Utf8Bom => {
            let mut bytes = UTF8_BOM.to_vec();
            bytes.extend_from_slice(text.as_bytes());
            bytes
        }
        Encoding::Utf16Le => {
            let mut bytes = UTF16_LE_BOM.to_vec();
            bytes.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
            bytes
        }
        Encoding::Utf16Be => {
            let mut bytes = UTF16_BE_BOM.to_vec();
            bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
            bytes
        }
        Encoding::Latin1 => text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect(),
    }
}

pub fn read_dump(path: &Path) -> Result<DumpText, EncodingError> {
    let bytes = fs::read(path).map_err(|source| EncodingError::Io {
        path: path.display().to_string(),
        source,
    })?;
    decode_dump(&bytes)
}

pub fn write_dump(path: &Path, text: &str, metadata: &FileMetadata) -> Result<(), EncodingError> {
    fs::write(path, encode_dump(text, metadata)).map_err(|source| EncodingError::Io {
        path: path.display().to_string(),
        source,
    })
}
