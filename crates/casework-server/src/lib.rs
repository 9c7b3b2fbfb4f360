//! HTTP server for the casework review workspace.
//!
//! Boots the demo case in memory and serves the JSON API under `/api`.
//! Nothing is persisted; every restart starts from the seeded case.

use axum::{Router, routing::get};
use casework_api::SharedWorkspace;
use casework_core::{
  audit::DEFAULT_AUDIT_USER,
  seed::DEMO_CASE_REFERENCE,
  workspace::{CaseWorkspace, WorkspaceConfig},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CASEWORK_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  #[serde(default = "default_case_reference")]
  pub case_reference:  String,
  /// Name recorded on every audit entry.
  #[serde(default = "default_audit_user")]
  pub audit_user:      String,
  #[serde(default = "default_editing_enabled")]
  pub editing_enabled: bool,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 5240 }

fn default_case_reference() -> String { DEMO_CASE_REFERENCE.to_string() }

fn default_audit_user() -> String { DEFAULT_AUDIT_USER.to_string() }

fn default_editing_enabled() -> bool { true }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:            default_host(),
      port:            default_port(),
      case_reference:  default_case_reference(),
      audit_user:      default_audit_user(),
      editing_enabled: default_editing_enabled(),
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn workspace(&self) -> CaseWorkspace {
    CaseWorkspace::new(WorkspaceConfig {
      case_reference:  self.case_reference.clone(),
      audit_user:      self.audit_user.clone(),
      editing_enabled: self.editing_enabled,
    })
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router(workspace: SharedWorkspace) -> Router {
  Router::new()
    .route("/health", get(|| async { "ok" }))
    .nest("/api", casework_api::api_router(workspace))
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests;
