//! [`CaseWorkspace`] wires one case together: its controller, ledgers,
//! field store and bound forms.
//!
//! An edit opens the case's edit session if needed, writes through the form's
//! bridge into the store, and records an audit entry under the session.
//! Committing closes the audit session and raises an affordability note when
//! any affordability-relevant field was touched; cancelling puts every
//! pre-edit value back and purges the session's audit entries.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::{
  Error, Result,
  audit::{AuditEntry, AuditLedger, DEFAULT_AUDIT_USER},
  fields::{FieldWrite, SyncReport, UnifiedFieldStore},
  ids::{EntryId, SessionId},
  mapping::FieldMappings,
  notes::{CaseNote, CaseNotesLedger, NewCaseNote, RuleDecision},
  section::FormRoute,
  seed::{self, DEMO_CASE_REFERENCE},
  session::{
    CaseEditState, DisplayState, EditPhase, EditSessionController, EditSignal,
    OriginalSnapshot, Transition,
  },
  sync::{EditListener as _, FieldSyncBridge, SyncTarget},
};

/// Rule id of the system note raised when affordability inputs change.
pub const AFFORDABILITY_RULE_ID: &str = "AFFORDABILITY-RECHECK";

/// Reason code attached to the affordability note.
pub const AFFORDABILITY_REASON_CODE: &str = "AFFORDABILITY_INPUTS_CHANGED";

#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
  pub case_reference:  String,
  /// Name recorded as the user on every audit entry.
  pub audit_user:      String,
  pub editing_enabled: bool,
}

impl Default for WorkspaceConfig {
  fn default() -> Self {
    Self {
      case_reference:  DEMO_CASE_REFERENCE.to_owned(),
      audit_user:      DEFAULT_AUDIT_USER.to_owned(),
      editing_enabled: true,
    }
  }
}

/// The case banner: flags, derived phase and counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseSummary {
  pub case_reference: String,
  pub state:          CaseEditState,
  pub phase:          EditPhase,
  pub display:        DisplayState,
  pub session:        Option<SessionId>,
  pub audit_entries:  usize,
  pub notes:          usize,
}

/// What a save or resubmit committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
  pub state:                 CaseEditState,
  /// The audit session that was closed.
  pub session:               Option<SessionId>,
  /// The affordability note raised by this commit, if any.
  pub affordability_warning: Option<CaseNote>,
}

// ─── Workspace ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CaseWorkspace {
  case_reference: String,
  controller:     EditSessionController,
  ledger:         AuditLedger,
  store:          UnifiedFieldStore,
  notes:          CaseNotesLedger,
  forms:          BTreeMap<FormRoute, FieldSyncBridge>,
}

impl CaseWorkspace {
  /// Boot the demo case.
  pub fn new(config: WorkspaceConfig) -> Self {
    let mappings = FieldMappings::standard();
    let values = seed::demo_case(&config.case_reference, &mappings);
    Self::with_store(config, UnifiedFieldStore::new(values, mappings))
  }

  pub fn with_store(config: WorkspaceConfig, store: UnifiedFieldStore) -> Self {
    tracing::info!(case = %config.case_reference, "case workspace opened");
    Self {
      case_reference: config.case_reference,
      controller: EditSessionController::new(config.editing_enabled),
      ledger: AuditLedger::new(config.audit_user),
      store,
      notes: CaseNotesLedger::new(),
      forms: BTreeMap::new(),
    }
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub fn state(&self) -> CaseEditState { self.controller.state() }

  pub fn summary(&self) -> CaseSummary {
    let state = self.state();
    CaseSummary {
      case_reference: self.case_reference.clone(),
      state,
      phase: state.phase(),
      display: state.display_state(),
      session: self.ledger.current_session(),
      audit_entries: self.ledger.len(),
      notes: self.notes.len(),
    }
  }

  pub fn ledger(&self) -> &AuditLedger { &self.ledger }

  pub fn store(&self) -> &UnifiedFieldStore { &self.store }

  pub fn notes(&self) -> &CaseNotesLedger { &self.notes }

  pub fn form(&self, route: &FormRoute) -> Option<&FieldSyncBridge> {
    self.forms.get(route)
  }

  /// Bind the form at `route` if it is not bound yet.
  pub fn open_form(&mut self, route: FormRoute) -> &FieldSyncBridge {
    let enabled = self.state().is_edit_mode;
    let store = &self.store;
    self.forms.entry(route).or_insert_with(|| {
      let fields = store.mappings().form_fields(&route);
      let mut bridge = FieldSyncBridge::bind(route, fields, store);
      bridge.set_enabled(enabled);
      tracing::debug!(form = %route, "form bound");
      bridge
    })
  }

  // ── Edit mode ─────────────────────────────────────────────────────────────

  pub fn set_editing_enabled(&mut self, enabled: bool) {
    let transition = self.controller.set_editing_enabled(enabled);
    self.apply(transition);
  }

  /// Enter edit mode, opening the audit session and snapshotting every
  /// editable value.
  pub fn enter_edit_mode(&mut self) -> Result<SessionId> {
    let values = self.store.values().clone();
    self.open_session(values)
  }

  /// Open the edit session with `values` as the pre-edit state. Keeps the
  /// open session if there is one.
  fn open_session(&mut self, values: BTreeMap<String, String>) -> Result<SessionId> {
    if !self.state().is_editing_enabled {
      return Err(Error::EditingDisabled);
    }
    if let Some(session) = self.controller.session() {
      return Ok(session.audit_session);
    }
    let audit_session = self.ledger.ensure_session();
    let originals: BTreeMap<String, String> = values
      .into_iter()
      .filter(|(k, _)| !self.store.is_protected(k))
      .collect();
    self
      .controller
      .enter_edit_mode(audit_session, OriginalSnapshot::from(originals))?;
    self.sync_forms();
    Ok(audit_session)
  }

  /// Open edit mode on the first edit of a viewing case.
  fn begin_edit(&mut self) -> Result<()> {
    if !self.state().is_edit_mode {
      self.enter_edit_mode()?;
    }
    Ok(())
  }

  fn record_edit(&mut self, field: &str, value_before: &str) -> Result<()> {
    self.controller.store_original_state(field, value_before);
    self.controller.mark_dirty(field)
  }

  // ── Field writes ──────────────────────────────────────────────────────────

  /// Edit a field on the form at `route`.
  pub fn edit_field(
    &mut self,
    route: FormRoute,
    field: &str,
    value: &str,
  ) -> Result<FieldWrite> {
    if !self.open_form(route).owns(field) {
      return Err(Error::NoMapping(field.to_owned()));
    }
    if self.store.is_protected(field) {
      tracing::warn!(form = %route, field, "rejected edit of protected field");
      return Err(Error::RejectedProtectedField(field.to_owned()));
    }
    self.begin_edit()?;
    let before = self.store.get_field_value(field).to_owned();

    let Some(bridge) = self.forms.get_mut(&route) else {
      return Err(Error::UnknownForm(route.to_string()));
    };
    let mut target = SyncTarget { store: &mut self.store, ledger: &mut self.ledger };
    let write = bridge
      .sync_field(field, value, &mut target)?
      .ok_or(Error::NotEditing)?;

    if write.entry.is_some() {
      self.record_edit(field, &before)?;
    }
    self.refresh_forms();
    Ok(write)
  }

  /// Change a value on a bound form without writing it through. Staged
  /// values reach the store when the case is saved or resubmitted.
  pub fn stage_field(
    &mut self,
    route: FormRoute,
    field: &str,
    value: &str,
  ) -> Result<()> {
    let Some(bridge) = self.forms.get_mut(&route) else {
      return Err(Error::UnknownForm(route.to_string()));
    };
    if !bridge.owns(field) {
      return Err(Error::NoMapping(field.to_owned()));
    }
    if self.store.is_protected(field) {
      return Err(Error::RejectedProtectedField(field.to_owned()));
    }
    if !bridge.stage(field, value) {
      return Err(Error::NotEditing);
    }
    self.controller.mark_dirty(field)
  }

  /// Edit a field directly on the unified store, as a read-only page does.
  pub fn update_field(
    &mut self,
    field: &str,
    value: &str,
    section: &str,
  ) -> Result<FieldWrite> {
    if self.store.is_protected(field) {
      tracing::warn!(field, section, "rejected write to protected field");
      return Err(Error::RejectedProtectedField(field.to_owned()));
    }
    self.begin_edit()?;
    let before = self.store.get_field_value(field).to_owned();
    let write = self.store.update_field(field, value, section, &mut self.ledger)?;
    if write.entry.is_some() {
      self.record_edit(field, &before)?;
    }
    self.refresh_forms();
    Ok(write)
  }

  pub fn reset_field(&mut self, field: &str) -> Result<FieldWrite> {
    if self.store.is_protected(field) {
      tracing::warn!(field, "rejected reset of protected field");
      return Err(Error::RejectedProtectedField(field.to_owned()));
    }
    self.begin_edit()?;
    let before = self.store.get_field_value(field).to_owned();
    let write = self.store.reset_field(field, &mut self.ledger)?;
    if write.entry.is_some() {
      self.record_edit(field, &before)?;
    }
    self.refresh_forms();
    Ok(write)
  }

  pub fn sync_from_data_capture(
    &mut self,
    data: &BTreeMap<String, String>,
  ) -> Result<SyncReport> {
    self.bulk_sync(data, UnifiedFieldStore::sync_from_data_capture)
  }

  pub fn sync_from_read_only(
    &mut self,
    data: &BTreeMap<String, String>,
  ) -> Result<SyncReport> {
    self.bulk_sync(data, UnifiedFieldStore::sync_from_read_only)
  }

  /// Merge a bulk payload. Edit mode opens only when something changed, and
  /// every changed key has its pre-sync value registered for cancel.
  fn bulk_sync(
    &mut self,
    data: &BTreeMap<String, String>,
    merge: fn(&mut UnifiedFieldStore, &BTreeMap<String, String>) -> SyncReport,
  ) -> Result<SyncReport> {
    if !self.state().is_editing_enabled {
      return Err(Error::EditingDisabled);
    }
    let before = self.store.values().clone();
    let report = merge(&mut self.store, data);
    if report.applied.is_empty() && report.mirrored.is_empty() {
      return Ok(report);
    }

    if !self.state().is_edit_mode {
      self.open_session(before.clone())?;
    }
    for key in report.applied.iter().chain(&report.mirrored) {
      let old = before.get(key).map_or("", String::as_str);
      self.controller.store_original_state(key, old);
    }
    for field in &report.applied {
      self.controller.mark_dirty(field)?;
    }
    self.refresh_forms();
    Ok(report)
  }

  /// Undo one audited change. The revert is itself audited.
  pub fn revert_entry(&mut self, entry_id: EntryId) -> Result<AuditEntry> {
    if self.ledger.get(entry_id).is_none() {
      tracing::warn!(entry = %entry_id, "revert requested for unknown audit entry");
      return Err(Error::UnknownAuditEntry(entry_id));
    }
    self.begin_edit()?;

    let snapshot = self.store.values().clone();
    let store = &mut self.store;
    let revert = self
      .ledger
      .revert_single_change(entry_id, &snapshot, |restored| {
        let changed: BTreeMap<String, String> = restored
          .into_iter()
          .filter(|(k, v)| snapshot.get(k) != Some(v))
          .collect();
        store.restore_values(&changed);
      })?
      .clone();

    self.controller.mark_dirty(&revert.field)?;
    self.refresh_forms();
    Ok(revert)
  }

  // ── Commit / cancel ───────────────────────────────────────────────────────

  /// Save the session's edits as a draft.
  pub fn save_changes(&mut self) -> Result<SaveOutcome> {
    let transition = self.controller.save_changes()?;
    Ok(self.commit(transition))
  }

  /// Save and resubmit the case, bumping its version.
  pub fn save_and_resubmit(&mut self) -> Result<SaveOutcome> {
    let transition = self.controller.save_and_resubmit()?;
    Ok(self.commit(transition))
  }

  /// Leave edit mode keeping every edit. The audit session is committed.
  pub fn exit_edit_mode(&mut self) -> Option<SessionId> {
    let transition = self.controller.exit_edit_mode();
    self.apply(transition)
  }

  /// Leave edit mode, restore every pre-edit value and purge the session's
  /// audit entries.
  pub fn cancel_and_exit_edit_mode(&mut self) -> Option<SessionId> {
    let transition = self.controller.cancel_and_exit_edit_mode();
    self.apply(transition)
  }

  fn commit(&mut self, transition: Transition) -> SaveOutcome {
    let session = self.apply(transition);
    let affordability_warning =
      session.and_then(|sid| self.raise_affordability_warning(sid));
    SaveOutcome { state: self.state(), session, affordability_warning }
  }

  /// Dispatch a transition's signals and settle the audit session. Returns
  /// the audit session that was closed.
  fn apply(&mut self, transition: Transition) -> Option<SessionId> {
    let mut cancelled = false;
    for signal in &transition.signals {
      if let EditSignal::Restore(snapshot) = signal {
        self.store.restore_values(snapshot.as_map());
        cancelled = true;
      }
      let mut target = SyncTarget { store: &mut self.store, ledger: &mut self.ledger };
      for form in self.forms.values_mut() {
        form.dispatch(signal, &mut target);
      }
    }

    let closed = transition.closed.map(|s| s.audit_session);
    if cancelled {
      self.ledger.cancel_session();
    } else if closed.is_some() {
      self.ledger.end_session();
    }
    self.sync_forms();
    closed
  }

  /// Raise or refresh the affordability note when `session` touched any
  /// affordability-relevant field.
  fn raise_affordability_warning(&mut self, session: SessionId) -> Option<CaseNote> {
    let mappings = self.store.mappings();
    let touched: BTreeSet<&str> = self
      .ledger
      .entries_for_session(session)
      .map(|e| e.field.as_str())
      .filter(|f| mappings.affects_affordability(f))
      .collect();
    if touched.is_empty() {
      return None;
    }
    let fields = touched.into_iter().collect::<Vec<_>>().join(", ");
    tracing::info!(%session, fields = %fields, "affordability inputs changed");
    let note = self.notes.upsert_system_note(
      AFFORDABILITY_RULE_ID,
      format!(
        "Affordability-relevant fields changed ({fields}). The affordability \
         assessment must be re-run before the case proceeds."
      ),
      vec![AFFORDABILITY_REASON_CODE.to_owned()],
    );
    Some(note.clone())
  }

  // ── Notes ─────────────────────────────────────────────────────────────────

  pub fn add_case_note(&mut self, note: NewCaseNote) -> CaseNote {
    self.notes.add_case_note(note).clone()
  }

  pub fn record_rule_decision(
    &mut self,
    rule_id: &str,
    decision: RuleDecision,
    reason_codes: Vec<String>,
  ) -> Option<CaseNote> {
    self
      .notes
      .record_rule_decision(rule_id, decision, reason_codes)
      .cloned()
  }

  // ── Forms ─────────────────────────────────────────────────────────────────

  fn refresh_forms(&mut self) {
    for form in self.forms.values_mut() {
      form.refresh(&self.store);
    }
  }

  /// Match every form's enabled flag to edit mode and reload its values.
  fn sync_forms(&mut self) {
    let enabled = self.state().is_edit_mode;
    for form in self.forms.values_mut() {
      form.set_enabled(enabled);
      form.refresh(&self.store);
    }
  }
}

impl Default for CaseWorkspace {
  fn default() -> Self { Self::new(WorkspaceConfig::default()) }
}
