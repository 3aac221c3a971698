pub mod ai;
pub mod backup;
pub mod category;
pub mod config;
pub mod encoding;
pub mod escape;
pub mod fallback;
pub mod files;
pub mod filter;
pub mod formats;
pub mod lines;
pub mod pipeline;
pub mod quality;
pub mod rtl;
pub mod scanner;
pub mod substitute;
pub mod translation_map;
pub mod validator;
pub mod worker;

pub use ai::{ServiceClient, TranslatedText, TranslationError};
pub use category::Category;
pub use config::{
    ConfigError, EngineConfig, RtlOptions, ScannerOptions, ServiceOptions, ValidatorOptions,
    WorkerOptions,
};
pub use fallback::{fallback_extract, RecordShape, ShapedRecord};
pub use filter::{filter_dump, parse_indices, FilterOptions, FilterOutcome};
pub use formats::{export_records, get_handler, ExportFormat, FormatError, FormatHandler};
pub use lines::LineModel;
pub use pipeline::PipelineReport;
pub use rtl::format_rtl;
pub use scanner::{extract_records, scan_records, Extraction, Record};
pub use substitute::{apply_translations, generate_reversed, SubstitutionOutcome};
pub use translation_map::{QuickReport, TranslationMap};
pub use validator::{analyze_structure, auto_fix, Severity, StructureIssue, StructureReport};
pub use worker::{EngineWorker, Operation, WorkerError, WorkerRequest, WorkerResponse};
