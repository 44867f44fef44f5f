use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    /// A required request field is missing or empty.
    #[error("Missing {0} field")]
    InvalidInput(&'static str),
    /// The requested offer/answer has not been published yet.
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Unknown role: {0}")]
    UnknownRole(String),
    #[error("Malformed request body: {0}")]
    MalformedBody(#[from] serde_json::Error),
    #[error("{0}")]
    InvalidQuery(#[from] QueryRejection),
    #[error("{0}")]
    InvalidPath(#[from] PathRejection),

    #[error("Std IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::InvalidInput(_)
            | RelayError::MalformedBody(_)
            | RelayError::InvalidQuery(_)
            | RelayError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            RelayError::NotFound(_) | RelayError::UnknownRole(_) => StatusCode::NOT_FOUND,
            RelayError::IoError(_) | RelayError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::RelayError;

    #[test]
    fn error_messages() {
        assert_eq!(
            RelayError::InvalidInput("sdp").to_string(),
            "Missing sdp field"
        );
        assert_eq!(
            RelayError::InvalidInput("candidate or mid").to_string(),
            "Missing candidate or mid field"
        );
        assert_eq!(
            RelayError::NotFound("Answer").to_string(),
            "Answer not found"
        );
        assert_eq!(
            RelayError::NotFound("Offer").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RelayError::InvalidInput("sdp").status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
