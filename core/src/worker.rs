/// Off-thread execution of engine operations
///
/// Requests travel over an mpsc channel to a single worker task; each one
/// carries a correlation id and a oneshot sender, so it resolves exactly
/// once. Callers wait with a timeout. Dropping the pending future is the
/// cancellation: the worker's reply is discarded.
use crate::config::{EngineConfig, RtlOptions, WorkerOptions};
use crate::rtl::format_rtl;
use crate::scanner::{extract_records, Extraction, Record};
use crate::substitute::{apply_translations, generate_reversed, SubstitutionOutcome};
use crate::translation_map::TranslationMap;
use crate::validator::{analyze_structure, auto_fix, StructureReport};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("request {id} timed out after {after_ms} ms")]
    Timeout { id: Uuid, after_ms: u64 },
    #[error("worker is not running")]
    Closed,
    #[error("worker failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone)]
pub enum Operation {
    Extract {
        language_index: usize,
    },
    Apply {
        records: Vec<Record>,
        translations: TranslationMap,
    },
    GenerateReversed {
        records: Vec<Record>,
        translations: TranslationMap,
        rtl: Option<RtlOptions>,
    },
    FormatRtl {
        rtl: Option<RtlOptions>,
    },
    Validate,
    AutoFix,
}

impl Operation {
    pub fn tag(&self) -> &'static str {
        match self {
            Operation::Extract { .. } => "extract",
            Operation::Apply { .. } => "apply",
            Operation::GenerateReversed { .. } => "generate_reversed",
            Operation::FormatRtl { .. } => "format_rtl",
            Operation::Validate => "validate",
            Operation::AutoFix => "auto_fix",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub id: Uuid,
    pub operation: Operation,
    pub text: String,
}

impl WorkerRequest {
    pub fn new(operation: Operation, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum WorkerPayload {
    Extraction(Extraction),
    Substitution(SubstitutionOutcome),
    Text(String),
    Structure(StructureReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerResponse {
    pub id: Uuid,
    pub status: WorkerStatus,
    pub payload: Option<WorkerPayload>,
    pub error: Option<String>,
}

impl WorkerResponse {
    fn success(id: Uuid, payload: WorkerPayload) -> Self {
        Self {
            id,
            status: WorkerStatus::Success,
            payload: Some(payload),
            error: None,
        }
    }

    fn failure(id: Uuid, error: impl Into<String>) -> Self {
        Self {
            id,
            status: WorkerStatus::Error,
            payload: None,
            error: Some(error.into()),
        }
    }

    pub fn into_payload(self) -> Result<WorkerPayload, WorkerError> {
        match (self.status, self.payload) {
            (WorkerStatus::Success, Some(payload)) => Ok(payload),
            (_, _) => Err(WorkerError::Failed(
                self.error.unwrap_or_else(|| "missing payload".to_string()),
            )),
        }
    }
}

/// Run one request synchronously.
pub fn execute(request: &WorkerRequest, config: &EngineConfig) -> WorkerResponse {
    let text = request.text.as_str();
    let payload = match &request.operation {
        Operation::Extract { language_index } => {
            let mut scanner = config.scanner.clone();
            scanner.language_index = *language_index;
            WorkerPayload::Extraction(extract_records(text, &scanner))
        }
        Operation::Apply {
            records,
            translations,
        } => WorkerPayload::Substitution(apply_translations(text, records, translations)),
        Operation::GenerateReversed {
            records,
            translations,
            rtl,
        } => WorkerPayload::Substitution(generate_reversed(
            text,
            records,
            translations,
            rtl.as_ref().unwrap_or(&config.rtl),
        )),
        Operation::FormatRtl { rtl } => {
            WorkerPayload::Text(format_rtl(text, rtl.as_ref().unwrap_or(&config.rtl)))
        }
        Operation::Validate => {
            WorkerPayload::Structure(analyze_structure(text, &config.validator))
        }
        Operation::AutoFix => WorkerPayload::Text(auto_fix(text, &config.validator)),
    };
    WorkerResponse::success(request.id, payload)
}

struct Envelope {
    request: WorkerRequest,
    reply: oneshot::Sender<WorkerResponse>,
}

/// Handle to the worker task. Cheap to clone.
#[derive(Clone)]
pub struct EngineWorker {
    tx: mpsc::Sender<Envelope>,
    options: WorkerOptions,
}

impl EngineWorker {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(config: EngineConfig) -> Self {
        let options = config.worker.clone();
        let (tx, mut rx) = mpsc::channel::<Envelope>(options.queue_depth.max(1));
        let config = Arc::new(config);

        tokio::spawn(async move {
            while let Some(Envelope { request, reply }) = rx.recv().await {
                let id = request.id;
                let tag = request.operation.tag();
                let shared = Arc::clone(&config);

                let response =
                    match tokio::task::spawn_blocking(move || execute(&request, &shared)).await {
                        Ok(response) => response,
                        Err(join_err) => {
                            log::warn!("worker operation {} ({}) panicked: {}", tag, id, join_err);
                            WorkerResponse::failure(id, join_err.to_string())
                        }
                    };

                if reply.send(response).is_err() {
                    log::debug!("request {} ({}) was abandoned by its caller", id, tag);
                }
            }
            log::debug!("engine worker stopped");
        });

        Self { tx, options }
    }

    /// Send a request and wait for its response. The timeout covers both
    /// queueing and execution.
    pub async fn submit(&self, request: WorkerRequest) -> Result<WorkerResponse, WorkerError> {
        let id = request.id;
        log::debug!("dispatching {} request {}", request.operation.tag(), id);

        let (reply, rx) = oneshot::channel();
        let exchange = async {
            self.tx
                .send(Envelope { request, reply })
                .await
                .map_err(|_| WorkerError::Closed)?;
            rx.await.map_err(|_| WorkerError::Closed)
        };

        let after_ms = self.options.request_timeout_ms;
        let response = match tokio::time::timeout(Duration::from_millis(after_ms), exchange).await {
            Ok(result) => result?,
            Err(_) => {
                log::warn!("request {} timed out after {} ms", id, after_ms);
                return Err(WorkerError::Timeout { id, after_ms });
            }
        };

        if response.id != id {
            return Err(WorkerError::Failed(format!(
                "response {} does not match request {}",
                response.id, id
            )));
        }
        Ok(response)
    }

    pub async fn extract(
        &self,
        text: impl Into<String>,
        language_index: usize,
    ) -> Result<Extraction, WorkerError> {
        let request = WorkerRequest::new(Operation::Extract { language_index }, text);
        match self.submit(request).await?.into_payload()? {
            WorkerPayload::Extraction(extraction) => Ok(extraction),
            other => Err(unexpected(other)),
        }
    }

    pub async fn apply(
        &self,
        text: impl Into<String>,
        records: Vec<Record>,
        translations: TranslationMap,
    ) -> Result<SubstitutionOutcome, WorkerError> {
        let request = WorkerRequest::new(
            Operation::Apply {
                records,
                translations,
            },
            text,
        );
        match self.submit(request).await?.into_payload()? {
            WorkerPayload::Substitution(outcome) => Ok(outcome),
            other => Err(unexpected(other)),
        }
    }

    pub async fn validate(&self, text: impl Into<String>) -> Result<StructureReport, WorkerError> {
        let request = WorkerRequest::new(Operation::Validate, text);
        match self.submit(request).await?.into_payload()? {
            WorkerPayload::Structure(report) => Ok(report),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(payload: WorkerPayload) -> WorkerError {
    WorkerError::Failed(format!("unexpected payload: {:?}", payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str =
        "\n[0]\n0 TermData data\n  1 string Term = \"Hello\"\n[0]\n  1 string data = \"Hi there\"\n";

    #[tokio::test]
    async fn extracts_and_applies_off_thread() {
        let worker = EngineWorker::spawn(EngineConfig::default());

        let extraction = worker.extract(NESTED, 0).await.unwrap();
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].data_line_index, Some(5));

        let mut map = TranslationMap::new();
        map.insert("Hello", "سلام");
        let outcome = worker
            .apply(NESTED, extraction.records, map)
            .await
            .unwrap();
        assert_eq!(outcome.changed, 1);
        assert!(outcome.text.contains("  1 string data = \"سلام\""));
    }

    #[tokio::test]
    async fn responses_carry_the_request_id() {
        let worker = EngineWorker::spawn(EngineConfig::default());
        let request = WorkerRequest::new(Operation::FormatRtl { rtl: Some(RtlOptions::plain()) }, "ab");
        let id = request.id;

        let response = worker.submit(request).await.unwrap();
        assert_eq!(response.id, id);
        assert_eq!(response.status, WorkerStatus::Success);
        assert!(matches!(response.payload, Some(WorkerPayload::Text(ref t)) if t == "ab"));
    }

    #[tokio::test]
    async fn validates_structure() {
        let worker = EngineWorker::spawn(EngineConfig::default());
        let report = worker.validate(NESTED).await.unwrap();
        assert_eq!(report.total_items, 1);
        assert_eq!(report.valid_items, 1);
    }

    #[tokio::test]
    async fn unanswered_request_times_out() {
        let (tx, _rx) = mpsc::channel(1);
        let worker = EngineWorker {
            tx,
            options: WorkerOptions {
                request_timeout_ms: 20,
                queue_depth: 1,
            },
        };

        let request = WorkerRequest::new(Operation::Validate, "");
        let id = request.id;
        match worker.submit(request).await {
            Err(WorkerError::Timeout { id: timed_out, after_ms }) => {
                assert_eq!(timed_out, id);
                assert_eq!(after_ms, 20);
            }
            other => panic!("expected timeout, got {:?}", other.map(|r| r.status)),
        }
    }

    #[tokio::test]
    async fn full_queue_counts_against_the_timeout() {
        let (tx, _rx) = mpsc::channel(1);
        let (reply, _pending) = oneshot::channel();
        tx.try_send(Envelope {
            request: WorkerRequest::new(Operation::Validate, ""),
            reply,
        })
        .unwrap();
        let worker = EngineWorker {
            tx,
            options: WorkerOptions {
                request_timeout_ms: 50,
                queue_depth: 1,
            },
        };

        let started = tokio::time::Instant::now();
        let result = worker
            .submit(WorkerRequest::new(Operation::Validate, ""))
            .await;
        assert!(matches!(result, Err(WorkerError::Timeout { after_ms: 50, .. })));
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn stopped_worker_reports_closed() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let worker = EngineWorker {
            tx,
            options: WorkerOptions::default(),
        };
        assert!(matches!(
            worker.submit(WorkerRequest::new(Operation::AutoFix, "")).await,
            Err(WorkerError::Closed)
        ));
    }

    #[test]
    fn failed_response_becomes_error() {
        let response = WorkerResponse::failure(Uuid::new_v4(), "boom");
        assert!(matches!(response.into_payload(), Err(WorkerError::Failed(m)) if m == "boom"));
    }
}
