//! Handlers for `/fields` and `/sync` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/fields` | Every field with its modified marker |
//! | `GET`  | `/fields/:key` | Unknown keys read as `""` |
//! | `PUT`  | `/fields/:key` | Body: [`UpdateBody`]; 409 for protected keys |
//! | `POST` | `/fields/:key/reset` | Back to the boot value |
//! | `GET`  | `/fields/:key/counterpart` | 404 when the key has no mapping |
//! | `POST` | `/sync/data-capture` | Body: `{"key":"value",...}` |
//! | `POST` | `/sync/read-only` | Body: `{"key":"value",...}` |

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, State},
};
use casework_core::fields::{FieldView, FieldWrite, SyncReport};
use serde::{Deserialize, Serialize};

use crate::{SharedWorkspace, error::ApiError};

/// Section label used when neither the body nor the mapping table names one.
pub const SUMMARY_SECTION: &str = "Case Summary";

/// `GET /fields`
pub async fn list(State(ws): State<SharedWorkspace>) -> Json<Vec<FieldView>> {
  Json(ws.lock().await.store().views())
}

/// `GET /fields/:key`
pub async fn get_one(
  State(ws): State<SharedWorkspace>,
  Path(key): Path<String>,
) -> Json<FieldView> {
  Json(ws.lock().await.store().view(&key))
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub value:   String,
  /// Audit section label; defaults to the mapped section of the key.
  pub section: Option<String>,
}

/// `PUT /fields/:key`
pub async fn update(
  State(ws): State<SharedWorkspace>,
  Path(key): Path<String>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<FieldWrite>, ApiError> {
  let mut ws = ws.lock().await;
  let section = body.section.unwrap_or_else(|| {
    ws.store()
      .mappings()
      .row(&key)
      .map_or(SUMMARY_SECTION, |row| row.section.label())
      .to_owned()
  });
  Ok(Json(ws.update_field(&key, &body.value, &section)?))
}

/// `POST /fields/:key/reset`
pub async fn reset(
  State(ws): State<SharedWorkspace>,
  Path(key): Path<String>,
) -> Result<Json<FieldWrite>, ApiError> {
  Ok(Json(ws.lock().await.reset_field(&key)?))
}

#[derive(Debug, Serialize)]
pub struct Counterpart {
  pub key:         String,
  pub counterpart: String,
  pub value:       String,
}

/// `GET /fields/:key/counterpart`
pub async fn counterpart(
  State(ws): State<SharedWorkspace>,
  Path(key): Path<String>,
) -> Result<Json<Counterpart>, ApiError> {
  let ws = ws.lock().await;
  let other = ws.store().counterpart(&key)?;
  Ok(Json(Counterpart {
    value:       ws.store().get_field_value(other).to_owned(),
    counterpart: other.to_owned(),
    key,
  }))
}

/// `POST /sync/data-capture`
pub async fn sync_data_capture(
  State(ws): State<SharedWorkspace>,
  Json(data): Json<BTreeMap<String, String>>,
) -> Result<Json<SyncReport>, ApiError> {
  Ok(Json(ws.lock().await.sync_from_data_capture(&data)?))
}

/// `POST /sync/read-only`
pub async fn sync_read_only(
  State(ws): State<SharedWorkspace>,
  Json(data): Json<BTreeMap<String, String>>,
) -> Result<Json<SyncReport>, ApiError> {
  Ok(Json(ws.lock().await.sync_from_read_only(&data)?))
}
