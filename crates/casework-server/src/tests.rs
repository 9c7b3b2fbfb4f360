use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use casework_api::shared;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use super::*;

fn app() -> Router { router(shared(ServerConfig::default().workspace())) }

async fn send(
  app: &Router,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(json) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes)
      .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
  };
  (status, value)
}

// ── Case state ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
  let (status, body) = send(&app(), "GET", "/health", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, Value::String("ok".into()));
}

#[tokio::test]
async fn fresh_case_is_viewing_and_clean() {
  let (status, body) = send(&app(), "GET", "/api/case", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["phase"], "viewing");
  assert_eq!(body["display"]["state"], "clean");
  assert_eq!(body["case_reference"], DEMO_CASE_REFERENCE);
  assert_eq!(body["state"]["case_version"], 0);
}

#[tokio::test]
async fn form_edit_then_save_leaves_a_draft() {
  let app = app();
  let (status, write) = send(
    &app,
    "PUT",
    "/api/data-capture/loan-details/1/fields/loanAmount",
    Some(json!({ "value": "£180,000" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{write}");
  assert_eq!(write["old_value"], "£175,000");
  assert_eq!(write["mirrored"], "requestedLoanAmount");

  let (_, summary) = send(&app, "GET", "/api/case", None).await;
  assert_eq!(summary["phase"], "dirty");

  let (status, outcome) = send(&app, "POST", "/api/case/save", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(outcome["state"]["has_saved_changes"], true);
  assert_eq!(outcome["state"]["has_unsaved_changes"], false);
  assert_eq!(outcome["affordability_warning"]["type"], "system");

  let (_, audit) = send(&app, "GET", "/api/audit?field=loanAmount", None).await;
  assert_eq!(audit.as_array().unwrap().len(), 1);
  assert_eq!(audit[0]["section"], "Loan Details");

  let (_, field) = send(&app, "GET", "/api/fields/requestedLoanAmount", None).await;
  assert_eq!(field["value"], "£180,000");
  assert_eq!(field["modified"], true);
}

#[tokio::test]
async fn cancel_restores_values_and_purges_audit() {
  let app = app();
  let (status, _) = send(
    &app,
    "PUT",
    "/api/fields/ltv",
    Some(json!({ "value": "75.00%" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (_, summary) = send(&app, "POST", "/api/case/cancel", None).await;
  assert_eq!(summary["phase"], "viewing");
  assert_eq!(summary["audit_entries"], 0);

  let (_, field) = send(&app, "GET", "/api/fields/ltv", None).await;
  assert_eq!(field["value"], "70.00%");
}

#[tokio::test]
async fn resubmit_bumps_version() {
  let app = app();
  send(
    &app,
    "PUT",
    "/api/data-capture/loan-details/1/fields/repaymentType",
    Some(json!({ "value": "Interest only" })),
  )
  .await;

  let (status, outcome) = send(&app, "POST", "/api/case/resubmit", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(outcome["state"]["case_version"], 1);
  assert_eq!(outcome["state"]["is_edit_mode"], false);
  assert!(outcome["affordability_warning"].is_null());

  let (_, summary) = send(&app, "GET", "/api/case", None).await;
  assert_eq!(summary["display"], json!({ "state": "resubmitted", "version": 1 }));
}

#[tokio::test]
async fn resubmit_without_changes_conflicts() {
  let (status, body) = send(&app(), "POST", "/api/case/resubmit", None).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(body["error"].as_str().unwrap().contains("no changes"));
}

// ── Fields ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn protected_field_write_conflicts() {
  let app = app();
  let (status, body) = send(
    &app,
    "PUT",
    "/api/fields/creditScore",
    Some(json!({ "value": "900" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(body["error"].as_str().unwrap().contains("protected"));

  let (_, field) = send(&app, "GET", "/api/fields/creditScore", None).await;
  assert_eq!(field["value"], "742");
  assert_eq!(field["protected"], true);
}

#[tokio::test]
async fn bulk_sync_reports_rejected_keys() {
  let (status, report) = send(
    &app(),
    "POST",
    "/api/sync/read-only",
    Some(json!({ "purchasePrice": "£260,000", "maximumLoanAmount": "£1" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(report["applied"], json!(["purchasePrice"]));
  assert_eq!(report["mirrored"], json!(["propertyValue"]));
  assert_eq!(report["rejected"], json!(["maximumLoanAmount"]));
}

#[tokio::test]
async fn counterpart_of_unmapped_field_is_not_found() {
  let app = app();
  let (status, body) = send(&app, "GET", "/api/fields/loanTerm/counterpart", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["counterpart"], "mortgageTerm");

  let (status, _) = send(&app, "GET", "/api/fields/creditScore/counterpart", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reset_returns_field_to_boot_value() {
  let app = app();
  send(&app, "PUT", "/api/fields/loanTerm", Some(json!({ "value": "30 years" }))).await;
  let (status, write) = send(&app, "POST", "/api/fields/loanTerm/reset", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(write["new_value"], "25 years");

  let (_, field) = send(&app, "GET", "/api/fields/loanTerm", None).await;
  assert_eq!(field["modified"], false);
}

// ── Forms ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn bare_data_capture_route_opens_first_applicant() {
  let (status, form) = send(&app(), "GET", "/api/data-capture", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(form["route"], "/data-capture/personal-details/1");
  assert_eq!(form["values"]["app1FirstName"], "James");
  assert_eq!(form["enabled"], false);
}

#[tokio::test]
async fn invalid_routes_are_bad_requests() {
  let app = app();
  let (status, _) = send(&app, "GET", "/api/data-capture/pets", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = send(&app, "GET", "/api/data-capture/income/3", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  let (status, _) = send(&app, "GET", "/api/data-capture/income/two", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn staged_edit_is_written_on_save() {
  let app = app();
  send(&app, "POST", "/api/case/edit-mode", None).await;
  send(&app, "GET", "/api/data-capture/income/2", None).await;

  let (status, _) = send(
    &app,
    "PATCH",
    "/api/data-capture/income/2/fields/app2Bonus",
    Some(json!({ "value": "£2,500" })),
  )
  .await;
  assert_eq!(status, StatusCode::ACCEPTED);
  let (_, field) = send(&app, "GET", "/api/fields/applicant2BonusIncome", None).await;
  assert_eq!(field["value"], "£0");

  send(&app, "POST", "/api/case/save", None).await;
  let (_, field) = send(&app, "GET", "/api/fields/applicant2BonusIncome", None).await;
  assert_eq!(field["value"], "£2,500");
}

// ── Audit ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn revert_round_trip() {
  let app = app();
  let (_, write) = send(
    &app,
    "PUT",
    "/api/fields/propertyPostcode",
    Some(json!({ "value": "LS1 4AP" })),
  )
  .await;
  let id = write["entry"].as_str().unwrap().to_owned();

  let (status, revert) =
    send(&app, "POST", &format!("/api/audit/{id}/revert"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(revert["section"], "Property (Reverted)");
  assert_eq!(revert["new_value"], "LS6 2QT");

  let (_, field) = send(&app, "GET", "/api/fields/securityPostcode", None).await;
  assert_eq!(field["value"], "LS6 2QT");
}

#[tokio::test]
async fn revert_of_unknown_entry_is_not_found() {
  let (status, _) = send(
    &app(),
    "POST",
    "/api/audit/00000000-0000-4000-8000-000000000000/revert",
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Notes ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn notes_and_rule_decisions() {
  let app = app();
  let (status, note) = send(
    &app,
    "POST",
    "/api/notes",
    Some(json!({ "author": "Underwriter", "content": "Bank statements checked" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(note["type"], "user");

  let (_, rule) = send(
    &app,
    "PUT",
    "/api/rules/LTV-01",
    Some(json!({ "decision": "refer", "reason_codes": ["R12"] })),
  )
  .await;
  assert_eq!(rule["rule_id"], "LTV-01");

  let (_, notes) = send(&app, "GET", "/api/notes", None).await;
  assert_eq!(notes.as_array().unwrap().len(), 2);

  let (_, rule) = send(
    &app,
    "PUT",
    "/api/rules/LTV-01",
    Some(json!({ "decision": "accept" })),
  )
  .await;
  assert!(rule.is_null());
  let (_, notes) = send(&app, "GET", "/api/notes", None).await;
  assert_eq!(notes.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_note_is_rejected() {
  let (status, _) = send(
    &app(),
    "POST",
    "/api/notes",
    Some(json!({ "author": "Underwriter", "content": "  " })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn locked_case_rejects_edits() {
  let app = app();
  let (_, summary) = send(
    &app,
    "POST",
    "/api/case/editing",
    Some(json!({ "enabled": false })),
  )
  .await;
  assert_eq!(summary["phase"], "locked");

  let (status, _) = send(
    &app,
    "PUT",
    "/api/fields/loanTerm",
    Some(json!({ "value": "30 years" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
}
