use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{PixelsError, Result};
use crate::models::JobId;

/// One event from `/submit` or `/poll/{id}`, discriminated by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PolledResponse {
    Update(JobUpdate),
    Result(JobResult),
}

impl PolledResponse {
    pub fn id(&self) -> &JobId {
        match self {
            PolledResponse::Update(update) => &update.id,
            PolledResponse::Result(result) => &result.id,
        }
    }

    pub fn status(&self) -> &str {
        match self {
            PolledResponse::Update(update) => &update.status,
            PolledResponse::Result(result) => &result.status,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PolledResponse::Result(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobUpdate {
    pub id: JobId,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobResult {
    pub id: JobId,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResultData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ResultData {
    Url { url: String },
    Inline { base64: String },
}

impl ResultData {
    pub fn url(&self) -> Option<&str> {
        match self {
            ResultData::Url { url } => Some(url),
            ResultData::Inline { .. } => None,
        }
    }

    /// Decodes inline content. URL references have nothing to decode.
    pub fn decode_inline(&self) -> Result<Option<Vec<u8>>> {
        match self {
            ResultData::Url { .. } => Ok(None),
            ResultData::Inline { base64 } => STANDARD
                .decode(base64)
                .map(Some)
                .map_err(|e| {
                    PixelsError::SerializationError(format!("invalid base64 data: {}", e))
                }),
        }
    }
}

/// Failure reported by the server for a finished job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "RawJobError")]
pub struct JobError {
    pub message: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

// Older workers send the error as a bare string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawJobError {
    Message(String),
    Detailed {
        message: String,
        #[serde(default)]
        kind: Option<String>,
        #[serde(default)]
        code: Option<String>,
    },
}

impl From<RawJobError> for JobError {
    fn from(raw: RawJobError) -> Self {
        match raw {
            RawJobError::Message(message) => JobError {
                message,
                kind: "unknown".to_string(),
                code: None,
            },
            RawJobError::Detailed {
                message,
                kind,
                code,
            } => JobError {
                message,
                kind: kind.unwrap_or_else(|| "unknown".to_string()),
                code,
            },
        }
    }
}

/// What [`crate::PixelsClient::run`] hands back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Outcome {
    pub id: JobId,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResultData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

/// Terminal status the server reports for a job that produced its output.
pub const SUCCESS_STATUS: &str = "success";

impl Outcome {
    /// True only for a `success` status with no error attached. A failure
    /// status without an error payload is still a failure.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.status == SUCCESS_STATUS
    }
}

impl From<JobResult> for Outcome {
    fn from(result: JobResult) -> Self {
        Outcome {
            id: result.id,
            status: result.status,
            data: result.data,
            error: result.error,
        }
    }
}
