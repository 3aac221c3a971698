/// File-level entry points tying the engine together
///
/// Read a dump, extract its records, translate or load translations,
/// substitute and write the result next to a backup.
use crate::ai::ServiceClient;
use crate::backup::{write_dump_with_backup, BackupOutcome};
use crate::config::EngineConfig;
use crate::encoding::{read_dump, DumpText};
use crate::files::{text_bundle, zip_bundle};
use crate::formats::txt::{generate_categorized_files, TxtItem};
use crate::formats::{get_handler, handler_for_path, ExportFormat};
use crate::scanner::{extract_records, Extraction};
use crate::substitute::{apply_translations, generate_reversed, SubstitutionOutcome};
use crate::translation_map::{parse_translations, TranslationMap};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Summary of one [`translate_dump_file`] run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub records: usize,
    pub used_fallback: bool,
    pub changed_lines: usize,
    pub output: PathBuf,
    pub backup: Option<PathBuf>,
}

pub fn load_dump(path: &Path) -> Result<DumpText> {
    if !path.exists() {
        bail!("dump not found: {}", path.display());
    }
    read_dump(path).with_context(|| format!("failed to read dump {}", path.display()))
}

pub fn extract_dump_file(path: &Path, config: &EngineConfig) -> Result<(DumpText, Extraction)> {
    let dump = load_dump(path)?;
    let extraction = extract_records(&dump.text, &config.scanner);
    log::info!(
        "{}: {} records{}",
        path.display(),
        extraction.records.len(),
        if extraction.used_fallback {
            " (fallback)"
        } else {
            ""
        }
    );
    Ok((dump, extraction))
}

/// Load translations from any exported format, falling back to the
/// free-form parser for unknown extensions.
pub fn load_translations(path: &Path) -> Result<TranslationMap> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read translations {}", path.display()))?;

    match handler_for_path(path) {
        Ok(handler) if handler.format() != ExportFormat::Txt => {
            let imported = handler
                .import(&content)
                .with_context(|| format!("failed to import {}", path.display()))?;
            Ok(imported.translations)
        }
        _ => Ok(parse_translations(&content)),
    }
}

fn finish(
    extraction: &Extraction,
    outcome: &SubstitutionOutcome,
    dump: &DumpText,
    output: &Path,
) -> Result<PipelineReport> {
    let BackupOutcome {
        backup_path,
        final_path,
    } = write_dump_with_backup(output, &outcome.text, &dump.metadata)
        .with_context(|| format!("failed to write {}", output.display()))?;

    log::info!(
        "wrote {} ({} of {} records substituted)",
        final_path.display(),
        outcome.changed,
        extraction.records.len()
    );
    Ok(PipelineReport {
        records: extraction.records.len(),
        used_fallback: extraction.used_fallback,
        changed_lines: outcome.changed,
        output: final_path,
        backup: backup_path,
    })
}

/// Substitute `translations` into the dump at `input` and write `output`.
pub fn translate_dump_file(
    input: &Path,
    output: &Path,
    translations: &TranslationMap,
    config: &EngineConfig,
) -> Result<PipelineReport> {
    let (dump, extraction) = extract_dump_file(input, config)?;
    let outcome = apply_translations(&dump.text, &extraction.records, translations);
    finish(&extraction, &outcome, &dump, output)
}

/// Like [`translate_dump_file`] with every value RTL-formatted first.
pub fn reverse_dump_file(
    input: &Path,
    output: &Path,
    translations: &TranslationMap,
    config: &EngineConfig,
) -> Result<PipelineReport> {
    let (dump, extraction) = extract_dump_file(input, config)?;
    let outcome = generate_reversed(&dump.text, &extraction.records, translations, &config.rtl);
    finish(&extraction, &outcome, &dump, output)
}

/// Translate every record through the configured service, then substitute.
pub async fn translate_dump_with_service(
    input: &Path,
    output: &Path,
    config: &EngineConfig,
) -> Result<(TranslationMap, PipelineReport)> {
    let (dump, extraction) = extract_dump_file(input, config)?;
    if extraction.addressable_count() == 0 {
        bail!("no translatable records in {}", input.display());
    }

    let client = ServiceClient::new(config.service.clone())?;
    let translations = client.translate_records(&extraction.records).await?;
    let outcome = apply_translations(&dump.text, &extraction.records, &translations);
    let report = finish(&extraction, &outcome, &dump, output)?;
    Ok((translations, report))
}

/// Export the dump's records with their translations in `format`.
pub fn export_dump_file(
    input: &Path,
    output: &Path,
    translations: &TranslationMap,
    format: ExportFormat,
    config: &EngineConfig,
) -> Result<()> {
    let (_, extraction) = extract_dump_file(input, config)?;
    let rendered = get_handler(format).export(&extraction.records, translations)?;
    fs::write(output, rendered).with_context(|| format!("failed to write {}", output.display()))?;
    log::info!("exported {} records to {}", extraction.records.len(), output.display());
    Ok(())
}

/// Write per-category text files as one bundle: a ZIP archive when the
/// output ends in `.zip`, otherwise a concatenated text file.
pub fn write_category_bundle(
    extraction: &Extraction,
    translations: &TranslationMap,
    output: &Path,
    config: &EngineConfig,
) -> Result<usize> {
    let items = TxtItem::from_records(&extraction.records, translations);
    let files = generate_categorized_files(&items, Some(&config.rtl));

    let is_zip = output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    let bytes = if is_zip {
        zip_bundle(&files)?
    } else {
        text_bundle(&files).into_bytes()
    };

    fs::write(output, bytes).with_context(|| format!("failed to write {}", output.display()))?;
    log::info!("bundled {} category files into {}", files.len(), output.display());
    Ok(files.len())
}
