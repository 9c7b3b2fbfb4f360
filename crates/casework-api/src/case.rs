//! Handlers for the `/case` edit-state endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/case` | [`CaseSummary`] |
//! | `POST` | `/case/editing` | Body: `{"enabled":true}` |
//! | `POST` | `/case/edit-mode` | 409 when editing is disabled |
//! | `POST` | `/case/save` | Returns [`SaveOutcome`] |
//! | `POST` | `/case/resubmit` | Returns [`SaveOutcome`] with the new version |
//! | `POST` | `/case/exit` | Keeps edits |
//! | `POST` | `/case/cancel` | Restores pre-edit values |

use axum::{Json, extract::State};
use casework_core::workspace::{CaseSummary, SaveOutcome};
use serde::Deserialize;

use crate::{SharedWorkspace, error::ApiError};

/// `GET /case`
pub async fn summary(State(ws): State<SharedWorkspace>) -> Json<CaseSummary> {
  Json(ws.lock().await.summary())
}

#[derive(Debug, Deserialize)]
pub struct EditingBody {
  pub enabled: bool,
}

/// `POST /case/editing`, body `{"enabled":bool}`
pub async fn set_editing(
  State(ws): State<SharedWorkspace>,
  Json(body): Json<EditingBody>,
) -> Json<CaseSummary> {
  let mut ws = ws.lock().await;
  ws.set_editing_enabled(body.enabled);
  Json(ws.summary())
}

/// `POST /case/edit-mode`
pub async fn enter_edit_mode(
  State(ws): State<SharedWorkspace>,
) -> Result<Json<CaseSummary>, ApiError> {
  let mut ws = ws.lock().await;
  ws.enter_edit_mode()?;
  Ok(Json(ws.summary()))
}

/// `POST /case/save`
pub async fn save(
  State(ws): State<SharedWorkspace>,
) -> Result<Json<SaveOutcome>, ApiError> {
  Ok(Json(ws.lock().await.save_changes()?))
}

/// `POST /case/resubmit`
pub async fn resubmit(
  State(ws): State<SharedWorkspace>,
) -> Result<Json<SaveOutcome>, ApiError> {
  Ok(Json(ws.lock().await.save_and_resubmit()?))
}

/// `POST /case/exit`
pub async fn exit(State(ws): State<SharedWorkspace>) -> Json<CaseSummary> {
  let mut ws = ws.lock().await;
  ws.exit_edit_mode();
  Json(ws.summary())
}

/// `POST /case/cancel`
pub async fn cancel(State(ws): State<SharedWorkspace>) -> Json<CaseSummary> {
  let mut ws = ws.lock().await;
  ws.cancel_and_exit_edit_mode();
  Json(ws.summary())
}
