/// Content hashing, duplicate detection, output names and bundles
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Write};
use thiserror::Error;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lowercase hex SHA-256 of the UTF-8 bytes of `content`.
pub fn hash_content(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

/// Names of files sharing identical content, grouped by hash.
///
/// Only groups with at least two members are returned, ordered by the
/// position of their first member; names keep input order.
pub fn find_duplicates<'a, I>(files: I) -> Vec<Vec<String>>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<String>> = HashMap::new();

    for (name, content) in files {
        let hash = hash_content(content);
        let members = groups.entry(hash.clone()).or_default();
        if members.is_empty() {
            order.push(hash);
        }
        members.push(name.to_string());
    }

    order
        .into_iter()
        .filter_map(|hash| groups.remove(&hash))
        .filter(|members| members.len() >= 2)
        .collect()
}

/// `name.ext` + suffix becomes `name<suffix>.ext`. A name without an
/// extension (or a leading-dot name) gets the suffix appended; an empty
/// name becomes `output<suffix>.txt`.
pub fn generate_output_file_name(original: &str, suffix: &str) -> String {
    if original.is_empty() {
        return format!("output{}.txt", suffix);
    }
    match original.rfind('.') {
        Some(dot) if dot > 0 => format!("{}{}{}", &original[..dot], suffix, &original[dot..]),
        _ => format!("{}{}", original, suffix),
    }
}

/// Concatenate files into one text, each preceded by a
/// `========== <name> ==========` header.
pub fn text_bundle(files: &BTreeMap<String, String>) -> String {
    let mut parts = Vec::with_capacity(files.len() * 2);
    for (name, content) in files {
        parts.push(format!("\n========== {} ==========\n", name));
        parts.push(content.clone());
    }
    parts.join("\n")
}

/// Deflated ZIP archive holding one entry per file.
pub fn zip_bundle(files: &BTreeMap<String, String>) -> Result<Vec<u8>, BundleError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::<()>::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for (name, content) in files {
        writer.start_file(name.as_str(), options.clone())?;
        writer.write_all(content.as_bytes())?;
    }

    let cursor = writer.finish()?;
    log::debug!("bundled {} files into zip", files.len());
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn hashes_as_lowercase_hex() {
        assert_eq!(
            hash_content("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash_content("").len(), 64);
    }

    #[test]
    fn groups_identical_files() {
        let files = [
            ("a.txt", "same"),
            ("b.txt", "other"),
            ("c.txt", "same"),
            ("d.txt", "unique"),
            ("e.txt", "other"),
        ];
        assert_eq!(
            find_duplicates(files),
            vec![
                vec!["a.txt".to_string(), "c.txt".to_string()],
                vec!["b.txt".to_string(), "e.txt".to_string()],
            ]
        );
        assert!(find_duplicates([("x", "1"), ("y", "2")]).is_empty());
    }

    #[test]
    fn output_names() {
        assert_eq!(generate_output_file_name("I2Languages.txt", "_fa"), "I2Languages_fa.txt");
        assert_eq!(generate_output_file_name("dump.v2.txt", "_rtl"), "dump.v2_rtl.txt");
        assert_eq!(generate_output_file_name("README", "_fa"), "README_fa");
        assert_eq!(generate_output_file_name(".hidden", "_fa"), ".hidden_fa");
        assert_eq!(generate_output_file_name("", "_fa"), "output_fa.txt");
    }

    #[test]
    fn text_bundle_uses_headers() {
        let mut files = BTreeMap::new();
        files.insert("Menu.txt".to_string(), "m".to_string());
        files.insert("Misc.txt".to_string(), "x".to_string());
        assert_eq!(
            text_bundle(&files),
            "\n========== Menu.txt ==========\n\nm\n\n========== Misc.txt ==========\n\nx"
        );
    }

    #[test]
    fn zip_bundle_is_readable() {
        let mut files = BTreeMap::new();
        files.insert("Menu.txt".to_string(), "[0]\nسلام".to_string());
        files.insert("Misc.txt".to_string(), String::new());

        let bytes = zip_bundle(&files).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut content = String::new();
        archive
            .by_name("Menu.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "[0]\nسلام");
    }
}
