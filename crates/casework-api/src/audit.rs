//! Handlers for `/audit` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/audit` | Newest first; optional `?field=` and `?session=` |
//! | `POST` | `/audit/:id/revert` | Returns the new revert entry |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use casework_core::{
  audit::AuditEntry,
  ids::{EntryId, SessionId},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{SharedWorkspace, error::ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub field:   Option<String>,
  pub session: Option<Uuid>,
}

/// `GET /audit[?field=...][&session=...]`
pub async fn list(
  State(ws): State<SharedWorkspace>,
  Query(params): Query<ListParams>,
) -> Json<Vec<AuditEntry>> {
  let ws = ws.lock().await;
  let session = params.session.map(SessionId::from);
  let entries = ws
    .ledger()
    .entries()
    .filter(|e| params.field.as_deref().is_none_or(|f| e.field == f))
    .filter(|e| session.is_none_or(|s| e.session_id == Some(s)))
    .cloned()
    .collect();
  Json(entries)
}

/// `POST /audit/:id/revert`
pub async fn revert(
  State(ws): State<SharedWorkspace>,
  Path(id): Path<Uuid>,
) -> Result<Json<AuditEntry>, ApiError> {
  Ok(Json(ws.lock().await.revert_entry(EntryId::from(id))?))
}
