use crate::{models::descriptor::DescriptorError, services::uploader::UploadError};
use axum::{
    extract::multipart::MultipartError,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::fmt;

/// A lightweight wrapper for request errors that keeps the message local.
///
/// Rendered as a plain-text body: the error message and nothing else.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.message,
        )
            .into_response()
    }
}

impl From<DescriptorError> for AppError {
    fn from(err: DescriptorError) -> Self {
        AppError::bad_request(err.to_string())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::new(err.status(), err.body_text())
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        let status = match &err {
            UploadError::AlreadyExists(_) => StatusCode::CONFLICT,
            UploadError::BackendUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            UploadError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            UploadError::CopyFailed { .. } | UploadError::CommitFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        AppError::new(status, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::descriptor::RawUploadForm, storage::BackendError};
    use std::{io, time::Duration};

    fn key() -> crate::models::object_key::ObjectKey {
        RawUploadForm {
            study: Some("computer-science".into()),
            year: Some("master".into()),
            code: Some("CS9000".into()),
            kind: Some("summary".into()),
            ..Default::default()
        }
        .validate()
        .unwrap()
        .object_key()
    }

    #[test]
    fn upload_errors_map_to_distinct_statuses() {
        let cases = [
            (UploadError::AlreadyExists(key()), StatusCode::CONFLICT),
            (
                UploadError::BackendUnavailable {
                    key: key(),
                    source: BackendError::Io(io::Error::new(io::ErrorKind::Other, "dns")),
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                UploadError::Timeout {
                    key: key(),
                    after: Duration::from_secs(50),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                UploadError::CommitFailed {
                    key: key(),
                    source: BackendError::Io(io::Error::new(io::ErrorKind::Other, "eof")),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            let message = err.to_string();
            let app_err = AppError::from(err);
            assert_eq!(app_err.status, status);
            assert_eq!(app_err.message, message);
        }
    }

    #[test]
    fn timeout_message_names_key_and_deadline() {
        let err = UploadError::Timeout {
            key: key(),
            after: Duration::from_secs(50),
        };
        assert_eq!(
            err.to_string(),
            "upload of `uploads/computer-science/master/CS9000/summary.pdf` timed out after 50s"
        );
    }

    #[test]
    fn descriptor_errors_are_client_errors() {
        let app_err = AppError::from(DescriptorError::MissingField("study"));
        assert_eq!(app_err.status, StatusCode::BAD_REQUEST);
        assert_eq!(app_err.message, "missing form field `study`");
    }
}
