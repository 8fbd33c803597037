use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{multipart, Client};
use serde::Deserialize;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::errors::StudyError;
use crate::log_extraction;

/// Bounded polling schedule for a parsing job
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub backoff_factor: f64,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(3),
            max_interval: Duration::from_secs(15),
            backoff_factor: 1.5,
            timeout: Duration::from_secs(300),
        }
    }
}

impl PollPolicy {
    /// Interval to wait after `current`, capped at `max_interval`
    pub fn next_interval(&self, current: Duration) -> Duration {
        current.mul_f64(self.backoff_factor.max(1.0)).min(self.max_interval)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    #[serde(alias = "SUCCESS")]
    Completed,
    #[serde(alias = "ERROR")]
    Failed,
    Cancelled,
    #[serde(other)]
    Pending,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct JobStatusResponse {
    status: JobStatus,
}

#[derive(Debug, Deserialize)]
struct TextResultResponse {
    text: String,
}

/// Turns a PDF into plain text through a remote document-parsing service.
///
/// The file is uploaded to obtain a job id, the job is polled with geometric
/// backoff until it reaches a terminal status, and the text result is then
/// downloaded. The whole sequence is bounded by the policy timeout and can be
/// aborted through a cancellation future.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    policy: PollPolicy,
}

impl ContentExtractor {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>, policy: PollPolicy) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            policy,
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Extract plain text from a base64-encoded PDF
    pub async fn extract_text(&self, pdf_base64: &str) -> Result<String, StudyError> {
        self.extract_text_until(pdf_base64, std::future::pending::<()>())
            .await
    }

    /// Like [`extract_text`](Self::extract_text), but gives up as soon as `cancel` resolves
    pub async fn extract_text_until<F>(&self, pdf_base64: &str, cancel: F) -> Result<String, StudyError>
    where
        F: Future<Output = ()>,
    {
        let pdf_bytes = decode_pdf(pdf_base64)?;
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            StudyError::UpstreamError(
                "PDF parser API key is not configured (set PDF_PARSER_API_KEY)".to_string(),
            )
        })?;

        let started = Instant::now();
        let job = tokio::time::timeout(self.policy.timeout, self.run_job(api_key, pdf_bytes));

        tokio::pin!(cancel);
        let outcome = tokio::select! {
            _ = &mut cancel => {
                log_extraction!(failed, reason = "cancelled by caller");
                return Err(StudyError::ExtractionFailed("parsing was cancelled".to_string()));
            }
            finished = job => finished,
        };

        let (job_id, text) = match outcome {
            Ok(result) => result?,
            Err(_) => {
                log_extraction!(failed, reason = "timed out");
                return Err(StudyError::ExtractionFailed(format!(
                    "parsing did not finish within {}s",
                    self.policy.timeout.as_secs_f64()
                )));
            }
        };

        log_extraction!(
            completed,
            job_id = job_id,
            text_length = text.len(),
            duration_ms = started.elapsed().as_millis() as u64
        );

        Ok(text)
    }

    /// Upload, wait for a terminal status, then download the text. Unbounded on its own.
    async fn run_job(&self, api_key: &str, pdf_bytes: Vec<u8>) -> Result<(String, String), StudyError> {
        let byte_count = pdf_bytes.len();
        let job_id = self.upload(api_key, pdf_bytes).await?;
        log_extraction!(submitted, job_id = job_id, bytes = byte_count);

        match self.wait_for_job(api_key, &job_id).await? {
            JobStatus::Completed => {}
            other => {
                log_extraction!(failed, job_id = job_id, reason = format!("{:?}", other));
                return Err(StudyError::ExtractionFailed(format!(
                    "parsing job {} finished with status {:?}",
                    job_id, other
                )));
            }
        }

        let text = self.fetch_text(api_key, &job_id).await?;
        Ok((job_id, text))
    }

    async fn upload(&self, api_key: &str, pdf_bytes: Vec<u8>) -> Result<String, StudyError> {
        let part = multipart::Part::bytes(pdf_bytes)
            .file_name("upload.pdf")
            .mime_str("application/pdf")?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(format!("{}/api/parsing/upload", self.base_url))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;

        let upload: UploadResponse = check_status(response).await?.json().await?;
        Ok(upload.id)
    }

    /// Poll until the job reaches a terminal status
    async fn wait_for_job(&self, api_key: &str, job_id: &str) -> Result<JobStatus, StudyError> {
        let mut interval = self.policy.initial_interval;

        loop {
            let response = self
                .client
                .get(format!("{}/api/parsing/job/{}", self.base_url, job_id))
                .bearer_auth(api_key)
                .send()
                .await?;

            let job: JobStatusResponse = check_status(response).await?.json().await?;
            if job.status != JobStatus::Pending {
                return Ok(job.status);
            }

            log_extraction!(
                poll,
                job_id = job_id,
                status = job.status,
                next_poll_ms = interval.as_millis() as u64
            );
            sleep(interval).await;
            interval = self.policy.next_interval(interval);
        }
    }

    async fn fetch_text(&self, api_key: &str, job_id: &str) -> Result<String, StudyError> {
        let response = self
            .client
            .get(format!("{}/api/parsing/job/{}/result/text", self.base_url, job_id))
            .bearer_auth(api_key)
            .send()
            .await?;

        let result: TextResultResponse = check_status(response).await?.json().await?;
        Ok(result.text)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StudyError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(StudyError::UpstreamError(format!(
        "PDF parser request failed with status {}: {}",
        status, body
    )))
}

/// Decode a base64 PDF payload, tolerating whitespace and a `data:` URI prefix
pub fn decode_pdf(pdf_base64: &str) -> Result<Vec<u8>, StudyError> {
    let trimmed = pdf_base64.trim();
    let payload = match trimmed.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => trimmed,
    };
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| StudyError::ValidationError(format!("pdf_base64 is not valid base64: {}", e)))?;

    if bytes.is_empty() {
        return Err(StudyError::ValidationError("pdf_base64 decodes to an empty file".to_string()));
    }

    Ok(bytes)
}
