use super::retry::{next_step, retry_after_from_headers, Backoff, Failure, RetryStep};
use super::{
    align_response, assemble_batch, parse_numbered_lines, texts_for_records,
    translations_for_records, ServiceErrorBody, TranslateRequest, TranslateResponse,
    TranslatedText, TranslationError,
};
use crate::config::ServiceOptions;
use crate::scanner::Record;
use crate::translation_map::TranslationMap;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

/// HTTP client for the translation service.
pub struct ServiceClient {
    http: Client,
    options: ServiceOptions,
}

impl ServiceClient {
    pub fn new(options: ServiceOptions) -> Result<Self, TranslationError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()
            .map_err(|e| TranslationError::Network(e.to_string()))?;
        Ok(Self { http, options })
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// Translate `texts` in fixed-size batches with a pause between batches.
    /// The first failing batch aborts the run with its classified error.
    pub async fn translate_all(
        &self,
        texts: &[String],
    ) -> Result<Vec<TranslatedText>, TranslationError> {
        let batch_size = self.options.batch_size.max(1);
        let batch_count = texts.len().div_ceil(batch_size);
        let mut results = Vec::with_capacity(texts.len());

        for (idx, batch) in texts.chunks(batch_size).enumerate() {
            log::debug!("translating batch {}/{} ({} texts)", idx + 1, batch_count, batch.len());
            let translated = self.translate_with_retry(batch).await?;
            results.extend(translated);

            if idx + 1 < batch_count && self.options.batch_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.options.batch_delay_ms)).await;
            }
        }

        log::info!("translated {} texts in {} batches", results.len(), batch_count);
        Ok(results)
    }

    /// Translate the records' original texts and map the results to terms.
    pub async fn translate_records(
        &self,
        records: &[Record],
    ) -> Result<TranslationMap, TranslationError> {
        let mut seen = HashSet::new();
        let texts: Vec<String> = texts_for_records(records)
            .into_iter()
            .filter(|t| seen.insert(t.clone()))
            .collect();
        let translated = self.translate_all(&texts).await?;
        Ok(translations_for_records(records, &translated))
    }

    async fn translate_with_retry(
        &self,
        batch: &[String],
    ) -> Result<Vec<TranslatedText>, TranslationError> {
        let backoff = Backoff::with_attempts(self.options.max_retries);
        let mut retries = 0;

        loop {
            let error = match self.translate_batch(batch).await {
                Ok(translated) => return Ok(translated),
                Err(error) => error,
            };

            let delay = match next_step(failure_of(&error), &backoff, retries) {
                RetryStep::Wait { delay, .. } => delay,
                RetryStep::GiveUp => {
                    if matches!(
                        error,
                        TranslationError::RateLimited { .. } | TranslationError::PaymentRequired
                    ) {
                        log::warn!("translation service refused the batch: {}", error);
                    }
                    return Err(error);
                }
            };

            retries += 1;
            log::warn!(
                "translation batch failed ({}), retry {} in {} ms",
                error,
                retries,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// One request for one batch.
    pub async fn translate_batch(
        &self,
        batch: &[String],
    ) -> Result<Vec<TranslatedText>, TranslationError> {
        let request = TranslateRequest {
            texts: batch.to_vec(),
            preserve_placeholders: self.options.preserve_placeholders,
        };

        let mut builder = self.http.post(&self.options.endpoint).json(&request);
        if let Some(key) = self.options.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            builder = builder.bearer_auth(key.trim());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TranslationError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TranslationError::RateLimited {
                retry_after: retry_after_from_headers(response.headers()),
            });
        }
        if status == StatusCode::PAYMENT_REQUIRED {
            return Err(TranslationError::PaymentRequired);
        }

        let body = response
            .text()
            .await
            .map_err(|e| TranslationError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ServiceErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| format!("service returned {}", status));
            return Err(TranslationError::Failure {
                status: Some(status.as_u16()),
                message,
            });
        }

        parse_body(batch, &body, self.options.preserve_placeholders)
    }
}

/// Accept the JSON contract, or raw numbered lines from a bare model.
fn parse_body(
    batch: &[String],
    body: &str,
    preserve_placeholders: bool,
) -> Result<Vec<TranslatedText>, TranslationError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(TranslationError::InvalidResponse("empty body".to_string()));
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => {
            let response: TranslateResponse = serde_json::from_value(value)
                .map_err(|e| TranslationError::InvalidResponse(e.to_string()))?;
            Ok(align_response(batch, response))
        }
        Err(_) => {
            let lines = parse_numbered_lines(trimmed);
            Ok(assemble_batch(batch, &lines, preserve_placeholders))
        }
    }
}

fn failure_of(error: &TranslationError) -> Failure {
    match error {
        TranslationError::RateLimited { retry_after } => Failure::Status {
            status: StatusCode::TOO_MANY_REQUESTS,
            retry_after: *retry_after,
        },
        TranslationError::Failure {
            status: Some(code), ..
        } => StatusCode::from_u16(*code)
            .map(|status| Failure::Status {
                status,
                retry_after: None,
            })
            .unwrap_or(Failure::Permanent),
        TranslationError::Network(_) => Failure::Transport,
        _ => Failure::Permanent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn options(server: &MockServer) -> ServiceOptions {
        ServiceOptions {
            endpoint: format!("{}/translate", server.uri()),
            batch_delay_ms: 0,
            ..ServiceOptions::default()
        }
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn posts_contract_and_reads_translations() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .and(header("authorization", "Bearer secret"))
            .and(body_json(json!({"texts": ["Hello"], "preservePlaceholders": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "translations": [{"english": "Hello", "persian": "سلام", "warnings": []}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ServiceClient::new(ServiceOptions {
            api_key: Some("secret".into()),
            ..options(&server)
        })
        .unwrap();
        let result = client.translate_all(&texts(&["Hello"])).await.unwrap();
        assert_eq!(result[0].persian, "سلام");
    }

    #[tokio::test]
    async fn accepts_numbered_plain_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("1. سلام\n2. امتیاز: %d"))
            .mount(&server)
            .await;

        let client = ServiceClient::new(options(&server)).unwrap();
        let result = client
            .translate_batch(&texts(&["Hello", "Score: %d", "Bye"]))
            .await
            .unwrap();
        assert_eq!(result[1].persian, "امتیاز: %d");
        assert_eq!(result[2].persian, "Bye");
    }

    #[tokio::test]
    async fn classifies_rate_limit_and_payment() {
        let server = MockServer::start().await;
        Mock::given(path("/limited"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&server)
            .await;
        Mock::given(path("/broke"))
            .respond_with(ResponseTemplate::new(402))
            .mount(&server)
            .await;

        let limited = ServiceClient::new(ServiceOptions {
            endpoint: format!("{}/limited", server.uri()),
            ..ServiceOptions::default()
        })
        .unwrap();
        match limited.translate_all(&texts(&["Hi"])).await {
            Err(TranslationError::RateLimited { retry_after }) => {
                assert_eq!(retry_after, Some(Duration::from_secs(7)))
            }
            other => panic!("expected rate limit, got {:?}", other),
        }

        let broke = ServiceClient::new(ServiceOptions {
            endpoint: format!("{}/broke", server.uri()),
            ..ServiceOptions::default()
        })
        .unwrap();
        assert!(matches!(
            broke.translate_all(&texts(&["Hi"])).await,
            Err(TranslationError::PaymentRequired)
        ));
    }

    #[tokio::test]
    async fn generic_failure_carries_service_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"error": "AI translation failed"})),
            )
            .mount(&server)
            .await;

        let client = ServiceClient::new(options(&server)).unwrap();
        match client.translate_batch(&texts(&["Hi"])).await {
            Err(TranslationError::Failure { status, message }) => {
                assert_eq!(status, Some(500));
                assert_eq!(message, "AI translation failed");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn splits_into_fixed_batches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"translations": []})))
            .expect(3)
            .mount(&server)
            .await;

        let client = ServiceClient::new(ServiceOptions {
            batch_size: 5,
            ..options(&server)
        })
        .unwrap();
        let input: Vec<String> = (0..12).map(|i| format!("Line {}", i)).collect();
        let result = client.translate_all(&input).await.unwrap();

        assert_eq!(result.len(), 12);
        assert!(result.iter().all(|t| t.persian == t.english));
    }

    #[tokio::test]
    async fn retries_rate_limit_when_enabled() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "translations": [{"english": "Hi", "persian": "سلام"}]
            })))
            .mount(&server)
            .await;

        let client = ServiceClient::new(ServiceOptions {
            max_retries: 1,
            ..options(&server)
        })
        .unwrap();
        let result = client.translate_all(&texts(&["Hi"])).await.unwrap();
        assert_eq!(result[0].persian, "سلام");
    }

    #[test]
    fn rejects_unexpected_json() {
        assert!(matches!(
            parse_body(&texts(&["Hi"]), r#"{"unexpected": true}"#, true),
            Err(TranslationError::InvalidResponse(_))
        ));
        assert!(parse_body(&texts(&["Hi"]), "  ", true).is_err());
    }
}
