//! Per-form adapter between a form's local values and the unified store.
//!
//! Every edit goes through [`FieldSyncBridge::sync_field`], which writes to the
//! store immediately. Values staged locally without syncing are only pushed
//! at the explicit flush boundary, the [`EditSignal::BeforeSave`] signal.
//!
//! [`EditSignal::BeforeSave`]: crate::session::EditSignal::BeforeSave

use std::collections::{BTreeMap, BTreeSet};

use crate::{
  Result,
  audit::AuditLedger,
  fields::{FieldWrite, UnifiedFieldStore},
  section::FormRoute,
  session::{EditSignal, OriginalSnapshot},
};

/// Mutable access to what a flush writes into.
pub struct SyncTarget<'a> {
  pub store:  &'a mut UnifiedFieldStore,
  pub ledger: &'a mut AuditLedger,
}

/// Implemented by anything that must react to case-level edit transitions.
pub trait EditListener {
  /// Roll local values back to the given pre-edit values.
  fn on_restore(&mut self, snapshot: &OriginalSnapshot);

  /// Push anything held locally into the store.
  fn on_before_save(&mut self, _target: &mut SyncTarget<'_>) {}

  fn on_resubmit(&mut self, _version: u32) {}

  fn dispatch(&mut self, signal: &EditSignal, target: &mut SyncTarget<'_>) {
    match signal {
      EditSignal::Restore(snapshot) => self.on_restore(snapshot),
      EditSignal::BeforeSave => self.on_before_save(target),
      EditSignal::Resubmit { version } => self.on_resubmit(*version),
    }
  }
}

// ─── Bridge ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FieldSyncBridge {
  route:   FormRoute,
  section: String,
  local:   BTreeMap<String, String>,
  /// Keys changed locally but not yet written to the store.
  pending: BTreeSet<String>,
  /// True only while the case is in edit mode.
  enabled: bool,
}

impl FieldSyncBridge {
  /// Bind a form showing `fields`, seeding local values from `store`.
  pub fn bind<'a>(
    route: FormRoute,
    fields: impl IntoIterator<Item = &'a str>,
    store: &UnifiedFieldStore,
  ) -> Self {
    Self {
      section: route.audit_section(),
      local: store.snapshot(fields),
      pending: BTreeSet::new(),
      enabled: false,
      route,
    }
  }

  pub fn route(&self) -> FormRoute { self.route }

  pub fn section(&self) -> &str { &self.section }

  pub fn values(&self) -> &BTreeMap<String, String> { &self.local }

  pub fn value(&self, field: &str) -> Option<&str> {
    self.local.get(field).map(String::as_str)
  }

  pub fn owns(&self, field: &str) -> bool { self.local.contains_key(field) }

  pub fn is_enabled(&self) -> bool { self.enabled }

  pub fn set_enabled(&mut self, enabled: bool) {
    if !enabled && !self.pending.is_empty() {
      tracing::debug!(
        form = %self.route,
        pending = self.pending.len(),
        "form disabled with unflushed values"
      );
    }
    self.enabled = enabled;
  }

  /// Write one field through to the store immediately. Returns `Ok(None)`
  /// without doing anything while the bridge is disabled.
  pub fn sync_field(
    &mut self,
    field: &str,
    value: &str,
    target: &mut SyncTarget<'_>,
  ) -> Result<Option<FieldWrite>> {
    if !self.enabled {
      return Ok(None);
    }
    let write =
      target.store.update_field(field, value, &self.section, target.ledger)?;
    self.local.insert(field.to_owned(), value.to_owned());
    self.pending.remove(field);
    Ok(Some(write))
  }

  /// Change a local value without writing it through. It reaches the store
  /// on the next flush. Returns whether the value was staged.
  pub fn stage(&mut self, field: &str, value: &str) -> bool {
    if !self.enabled {
      return false;
    }
    self.local.insert(field.to_owned(), value.to_owned());
    self.pending.insert(field.to_owned());
    true
  }

  pub fn has_pending(&self) -> bool { !self.pending.is_empty() }

  /// Write every staged value to the store. Protected keys are dropped from
  /// the form and reloaded from the store.
  pub fn flush(&mut self, target: &mut SyncTarget<'_>) -> Vec<FieldWrite> {
    if !self.enabled {
      return Vec::new();
    }
    let mut writes = Vec::new();
    for field in std::mem::take(&mut self.pending) {
      let value = self.local.get(&field).cloned().unwrap_or_default();
      match target.store.update_field(&field, &value, &self.section, target.ledger)
      {
        Ok(write) => writes.push(write),
        Err(error) => {
          tracing::warn!(form = %self.route, %field, %error, "flush skipped field");
          let stored = target.store.get_field_value(&field).to_owned();
          self.local.insert(field, stored);
        }
      }
    }
    writes
  }

  /// Reload every non-pending local value from the store, picking up writes
  /// made through other forms or mapped counterparts.
  pub fn refresh(&mut self, store: &UnifiedFieldStore) {
    for (key, value) in &mut self.local {
      if !self.pending.contains(key) {
        store.get_field_value(key).clone_into(value);
      }
    }
  }
}

impl EditListener for FieldSyncBridge {
  fn on_restore(&mut self, snapshot: &OriginalSnapshot) {
    for (key, value) in snapshot.iter() {
      if let Some(local) = self.local.get_mut(key) {
        value.clone_into(local);
        self.pending.remove(key);
      }
    }
    // Anything still staged was never written; drop it with the session.
    self.pending.clear();
  }

  fn on_before_save(&mut self, target: &mut SyncTarget<'_>) {
    let writes = self.flush(target);
    if !writes.is_empty() {
      tracing::debug!(form = %self.route, flushed = writes.len(), "form flushed before save");
    }
  }
}
