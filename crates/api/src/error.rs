use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use checker::EvaluationError;
use ingest::FetchError;
use serde::Serialize;

/// Error body: what went wrong, a stable cause code and what to do about it.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub cause: String,
    pub remedy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn bad_upload(reason: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: format!("upload_base64 is not valid base64: {}", reason),
                cause: "invalid_upload".to_string(),
                remedy: "Send the PDF bytes base64 encoded (standard alphabet, with padding).".to_string(),
                raw: None,
            },
        }
    }
}

pub fn status_for(err: &EvaluationError) -> StatusCode {
    match err {
        EvaluationError::MissingInput(_) => StatusCode::BAD_REQUEST,
        EvaluationError::OracleUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        EvaluationError::Fetch(FetchError::Transport(_)) | EvaluationError::OracleTransport(_) => {
            StatusCode::BAD_GATEWAY
        }
        EvaluationError::Fetch(_)
        | EvaluationError::Read(_)
        | EvaluationError::Unextractable
        | EvaluationError::OracleContract { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl From<EvaluationError> for ApiError {
    fn from(err: EvaluationError) -> Self {
        Self {
            status: status_for(&err),
            body: ErrorBody {
                error: err.to_string(),
                cause: err.cause().to_string(),
                remedy: err.remedy().to_string(),
                raw: err.raw_output().map(str::to_string),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
