//! Handlers for the `/data-capture` form endpoints.
//!
//! Opening a route binds the form if needed. Case-level sections ignore the
//! applicant segment.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/data-capture[/:section[/:applicant]]` | [`FormView`] |
//! | `PUT`   | `/data-capture/:section/:applicant/fields/:key` | Write through; body `{"value":"..."}` |
//! | `PATCH` | `/data-capture/:section/:applicant/fields/:key` | Stage until the next save |

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use casework_core::{
  fields::FieldWrite,
  section::{FormRoute, Section},
  sync::FieldSyncBridge,
};
use serde::{Deserialize, Serialize};

use crate::{SharedWorkspace, error::ApiError};

/// A bound form as returned to clients.
#[derive(Debug, Serialize)]
pub struct FormView {
  pub route:   String,
  pub section: String,
  pub enabled: bool,
  pub values:  BTreeMap<String, String>,
}

impl From<&FieldSyncBridge> for FormView {
  fn from(bridge: &FieldSyncBridge) -> Self {
    FormView {
      route:   bridge.route().to_string(),
      section: bridge.section().to_owned(),
      enabled: bridge.is_enabled(),
      values:  bridge.values().clone(),
    }
  }
}

fn route_for(section: &str, applicant: Option<&str>) -> Result<FormRoute, ApiError> {
  let applicant = applicant
    .map(|n| {
      n.parse::<u8>()
        .map_err(|_| ApiError::BadRequest(format!("invalid applicant number {n:?}")))
    })
    .transpose()?;
  Ok(FormRoute::new(Section::parse(section)?, applicant)?)
}

async fn open_route(ws: &SharedWorkspace, route: FormRoute) -> Json<FormView> {
  let mut ws = ws.lock().await;
  Json(FormView::from(ws.open_form(route)))
}

/// `GET /data-capture`
pub async fn open_default(
  State(ws): State<SharedWorkspace>,
) -> Result<Json<FormView>, ApiError> {
  let route = FormRoute::new(Section::PersonalDetails, None)?;
  Ok(open_route(&ws, route).await)
}

/// `GET /data-capture/:section`
pub async fn open_section(
  State(ws): State<SharedWorkspace>,
  Path(section): Path<String>,
) -> Result<Json<FormView>, ApiError> {
  let route = route_for(&section, None)?;
  Ok(open_route(&ws, route).await)
}

/// `GET /data-capture/:section/:applicant`
pub async fn open(
  State(ws): State<SharedWorkspace>,
  Path((section, applicant)): Path<(String, String)>,
) -> Result<Json<FormView>, ApiError> {
  let route = route_for(&section, Some(&applicant))?;
  Ok(open_route(&ws, route).await)
}

#[derive(Debug, Deserialize)]
pub struct EditBody {
  pub value: String,
}

/// `PUT /data-capture/:section/:applicant/fields/:key`
pub async fn edit(
  State(ws): State<SharedWorkspace>,
  Path((section, applicant, key)): Path<(String, String, String)>,
  Json(body): Json<EditBody>,
) -> Result<Json<FieldWrite>, ApiError> {
  let route = route_for(&section, Some(&applicant))?;
  Ok(Json(ws.lock().await.edit_field(route, &key, &body.value)?))
}

/// `PATCH /data-capture/:section/:applicant/fields/:key`. Answers 202 once staged.
pub async fn stage(
  State(ws): State<SharedWorkspace>,
  Path((section, applicant, key)): Path<(String, String, String)>,
  Json(body): Json<EditBody>,
) -> Result<StatusCode, ApiError> {
  let route = route_for(&section, Some(&applicant))?;
  ws.lock().await.stage_field(route, &key, &body.value)?;
  Ok(StatusCode::ACCEPTED)
}
