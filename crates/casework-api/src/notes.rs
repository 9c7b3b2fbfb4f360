//! Handlers for `/notes` and `/rules` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/notes` | User and system notes, newest first |
//! | `POST` | `/notes` | Body: [`NewCaseNote`]; returns 201 + the note |
//! | `PUT`  | `/rules/:rule_id` | Body: [`RuleDecisionBody`]; returns the rule's note or `null` |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use casework_core::notes::{CaseNote, NewCaseNote, RuleDecision};
use serde::Deserialize;

use crate::{SharedWorkspace, error::ApiError};

/// `GET /notes`
pub async fn list(State(ws): State<SharedWorkspace>) -> Json<Vec<CaseNote>> {
  let ws = ws.lock().await;
  Json(ws.notes().notes().into_iter().cloned().collect())
}

/// `POST /notes`
pub async fn create(
  State(ws): State<SharedWorkspace>,
  Json(body): Json<NewCaseNote>,
) -> Result<impl IntoResponse, ApiError> {
  if body.content.trim().is_empty() {
    return Err(ApiError::BadRequest("note content is empty".into()));
  }
  let note = ws.lock().await.add_case_note(body);
  Ok((StatusCode::CREATED, Json(note)))
}

#[derive(Debug, Deserialize)]
pub struct RuleDecisionBody {
  pub decision:     RuleDecision,
  #[serde(default)]
  pub reason_codes: Vec<String>,
}

/// `PUT /rules/:rule_id`
pub async fn rule_decision(
  State(ws): State<SharedWorkspace>,
  Path(rule_id): Path<String>,
  Json(body): Json<RuleDecisionBody>,
) -> Json<Option<CaseNote>> {
  let note = ws
    .lock()
    .await
    .record_rule_decision(&rule_id, body.decision, body.reason_codes);
  Json(note)
}
