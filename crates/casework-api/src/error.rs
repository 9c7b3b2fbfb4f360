//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use casework_core::Error as CaseError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Case(#[from] CaseError),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Case(e) => match e {
        CaseError::UnknownAuditEntry(_)
        | CaseError::NoMapping(_)
        | CaseError::UnknownForm(_) => StatusCode::NOT_FOUND,
        CaseError::RejectedProtectedField(_)
        | CaseError::EditingDisabled
        | CaseError::NotEditing
        | CaseError::NothingToResubmit => StatusCode::CONFLICT,
        CaseError::UnknownSection(_) | CaseError::InvalidRoute(_) => {
          StatusCode::BAD_REQUEST
        }
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    tracing::debug!(%status, error = %self, "request rejected");
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}
