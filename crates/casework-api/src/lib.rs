//! JSON REST API for the casework review workspace.
//!
//! Exposes an axum [`Router`] over a single shared
//! [`CaseWorkspace`](casework_core::workspace::CaseWorkspace). Transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", casework_api::api_router(workspace.clone()))
//! ```

pub mod audit;
pub mod case;
pub mod error;
pub mod fields;
pub mod forms;
pub mod notes;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use casework_core::workspace::CaseWorkspace;
use tokio::sync::Mutex;

pub use error::ApiError;

/// The workspace shared by every handler. All mutation happens under the
/// lock, so each request sees the case as one consistent state.
pub type SharedWorkspace = Arc<Mutex<CaseWorkspace>>;

pub fn shared(workspace: CaseWorkspace) -> SharedWorkspace {
  Arc::new(Mutex::new(workspace))
}

/// Build the API router for `workspace`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router(workspace: SharedWorkspace) -> Router<()> {
  Router::new()
    // Case state machine
    .route("/case", get(case::summary))
    .route("/case/editing", post(case::set_editing))
    .route("/case/edit-mode", post(case::enter_edit_mode))
    .route("/case/save", post(case::save))
    .route("/case/resubmit", post(case::resubmit))
    .route("/case/exit", post(case::exit))
    .route("/case/cancel", post(case::cancel))
    // Unified fields
    .route("/fields", get(fields::list))
    .route("/fields/{key}", get(fields::get_one).put(fields::update))
    .route("/fields/{key}/reset", post(fields::reset))
    .route("/fields/{key}/counterpart", get(fields::counterpart))
    .route("/sync/data-capture", post(fields::sync_data_capture))
    .route("/sync/read-only", post(fields::sync_read_only))
    // Data-capture forms
    .route("/data-capture", get(forms::open_default))
    .route("/data-capture/{section}", get(forms::open_section))
    .route("/data-capture/{section}/{applicant}", get(forms::open))
    .route(
      "/data-capture/{section}/{applicant}/fields/{key}",
      put(forms::edit).patch(forms::stage),
    )
    // Audit
    .route("/audit", get(audit::list))
    .route("/audit/{id}/revert", post(audit::revert))
    // Notes
    .route("/notes", get(notes::list).post(notes::create))
    .route("/rules/{rule_id}", put(notes::rule_decision))
    .with_state(workspace)
}
