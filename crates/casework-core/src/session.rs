//! The edit-session state machine governing the whole case.
//!
//! The controller owns the case's edit flags and the open [`EditSession`],
//! which carries the pre-edit values of every field touched during the
//! session. It holds no form data itself; rollback and flushing are expressed
//! as [`EditSignal`]s that the caller dispatches to every bound form through
//! [`EditListener`](crate::sync::EditListener).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, ids::SessionId};

// ─── State ───────────────────────────────────────────────────────────────────

/// The case-level edit flags.
///
/// Invariant: `is_edit_mode` implies `is_editing_enabled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseEditState {
  pub is_editing_enabled:  bool,
  pub is_edit_mode:        bool,
  pub has_unsaved_changes: bool,
  pub has_saved_changes:   bool,
  pub case_version:        u32,
}

/// The state-machine position derived from [`CaseEditState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditPhase {
  Locked,
  Viewing,
  Editing,
  Dirty,
  Draft,
  Resubmitted,
}

/// The single status banner shown for the case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DisplayState {
  Clean,
  Unsaved,
  Draft,
  Resubmitted { version: u32 },
}

impl CaseEditState {
  pub fn phase(&self) -> EditPhase {
    match self {
      Self { is_editing_enabled: false, .. } => EditPhase::Locked,
      Self { is_edit_mode: true, has_unsaved_changes: true, .. } => {
        EditPhase::Dirty
      }
      Self { is_edit_mode: true, .. } => EditPhase::Editing,
      Self { has_saved_changes: true, .. } => EditPhase::Draft,
      Self { case_version, .. } if *case_version > 0 => EditPhase::Resubmitted,
      _ => EditPhase::Viewing,
    }
  }

  /// At most one of unsaved, draft and resubmitted is shown at a time, in
  /// that order of precedence.
  pub fn display_state(&self) -> DisplayState {
    if self.has_unsaved_changes {
      DisplayState::Unsaved
    } else if self.has_saved_changes {
      DisplayState::Draft
    } else if self.case_version > 0 {
      DisplayState::Resubmitted { version: self.case_version }
    } else {
      DisplayState::Clean
    }
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// Pre-edit values keyed by field. The first value recorded for a key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginalSnapshot(BTreeMap<String, String>);

impl OriginalSnapshot {
  pub fn new() -> Self { Self::default() }

  /// Record `value` for `key` unless a value is already held. Returns whether
  /// it was recorded.
  pub fn record(&mut self, key: &str, value: &str) -> bool {
    if self.0.contains_key(key) {
      return false;
    }
    self.0.insert(key.to_owned(), value.to_owned());
    true
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.get(key).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn as_map(&self) -> &BTreeMap<String, String> { &self.0 }

  pub fn into_inner(self) -> BTreeMap<String, String> { self.0 }
}

impl From<BTreeMap<String, String>> for OriginalSnapshot {
  fn from(map: BTreeMap<String, String>) -> Self { Self(map) }
}

/// A bounded span of edits, correlated with an audit-ledger session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditSession {
  pub audit_session: SessionId,
  pub started_at:    DateTime<Utc>,
  pub originals:     OriginalSnapshot,
  /// Every field edited during the session.
  pub touched:       BTreeSet<String>,
}

// ─── Signals ─────────────────────────────────────────────────────────────────

/// A message the controller emits for every bound form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditSignal {
  /// Put these pre-edit values back.
  Restore(OriginalSnapshot),
  /// Push any locally-held values into the field store now.
  BeforeSave,
  /// The case was resubmitted as `version`.
  Resubmit { version: u32 },
}

/// What a transition produced: the session it closed, if any, and the
/// signals to dispatch in order.
#[derive(Debug, Default)]
pub struct Transition {
  pub closed:  Option<EditSession>,
  pub signals: Vec<EditSignal>,
}

// ─── Controller ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct EditSessionController {
  state:   CaseEditState,
  session: Option<EditSession>,
}

impl EditSessionController {
  pub fn new(editing_enabled: bool) -> Self {
    Self {
      state:   CaseEditState {
        is_editing_enabled: editing_enabled,
        ..CaseEditState::default()
      },
      session: None,
    }
  }

  pub fn state(&self) -> CaseEditState { self.state }

  pub fn session(&self) -> Option<&EditSession> { self.session.as_ref() }

  /// Toggle whether the case may be edited at all.
  ///
  /// Disabling mid-edit first cancels the session so every form receives a
  /// restore, then drops the edit flags.
  pub fn set_editing_enabled(&mut self, enabled: bool) -> Transition {
    if enabled {
      self.state.is_editing_enabled = true;
      tracing::info!("case editing enabled");
      return Transition::default();
    }
    let transition = if self.state.is_edit_mode || self.session.is_some() {
      self.cancel_and_exit_edit_mode()
    } else {
      Transition::default()
    };
    self.state.is_editing_enabled = false;
    self.state.is_edit_mode = false;
    self.state.has_unsaved_changes = false;
    tracing::info!("case editing disabled");
    transition
  }

  /// Enter edit mode, opening a session that holds `originals`. Entering while
  /// already editing keeps the open session.
  pub fn enter_edit_mode(
    &mut self,
    audit_session: SessionId,
    originals: OriginalSnapshot,
  ) -> Result<()> {
    if !self.state.is_editing_enabled {
      return Err(Error::EditingDisabled);
    }
    if self.session.is_none() {
      self.session = Some(EditSession {
        audit_session,
        started_at: Utc::now(),
        originals,
        touched: BTreeSet::new(),
      });
      tracing::info!(session = %audit_session, "edit session opened");
    }
    self.state.is_edit_mode = true;
    Ok(())
  }

  /// Note that `field` was edited, moving the case to dirty.
  pub fn mark_dirty(&mut self, field: &str) -> Result<()> {
    if !self.state.is_edit_mode {
      return Err(Error::NotEditing);
    }
    let Some(session) = self.session.as_mut() else {
      return Err(Error::NotEditing);
    };
    session.touched.insert(field.to_owned());
    self.state.has_unsaved_changes = true;
    Ok(())
  }

  /// Register a pre-edit value for `key`. The first registration per key wins;
  /// without an open session nothing is recorded.
  pub fn store_original_state(&mut self, key: &str, value: &str) -> bool {
    self
      .session
      .as_mut()
      .is_some_and(|s| s.originals.record(key, value))
  }

  /// Take every registered pre-edit value, leaving the session's snapshot
  /// empty.
  pub fn restore_all_original_state(&mut self) -> OriginalSnapshot {
    self
      .session
      .as_mut()
      .map(|s| std::mem::take(&mut s.originals))
      .unwrap_or_default()
  }

  /// Save a draft: the case leaves edit mode with saved changes.
  pub fn save_changes(&mut self) -> Result<Transition> {
    if !self.state.is_edit_mode {
      return Err(Error::NotEditing);
    }
    self.state.is_edit_mode = false;
    self.state.has_unsaved_changes = false;
    self.state.has_saved_changes = true;
    tracing::info!("case saved as draft");
    Ok(Transition {
      closed:  self.session.take(),
      signals: vec![EditSignal::BeforeSave],
    })
  }

  /// Finalise the edits: bump the case version and clear every flag.
  pub fn save_and_resubmit(&mut self) -> Result<Transition> {
    if !self.state.is_editing_enabled {
      return Err(Error::EditingDisabled);
    }
    if !self.state.is_edit_mode && !self.state.has_saved_changes {
      return Err(Error::NothingToResubmit);
    }
    self.state.is_edit_mode = false;
    self.state.has_unsaved_changes = false;
    self.state.has_saved_changes = false;
    self.state.case_version += 1;
    let version = self.state.case_version;
    tracing::info!(version, "case resubmitted");
    Ok(Transition {
      closed:  self.session.take(),
      signals: vec![EditSignal::BeforeSave, EditSignal::Resubmit { version }],
    })
  }

  /// Leave edit mode keeping the edited values. A saved draft stays a draft.
  pub fn exit_edit_mode(&mut self) -> Transition {
    self.state.is_edit_mode = false;
    self.state.has_unsaved_changes = false;
    Transition { closed: self.session.take(), signals: Vec::new() }
  }

  /// Leave edit mode and roll every form back to its pre-edit values.
  pub fn cancel_and_exit_edit_mode(&mut self) -> Transition {
    let snapshot = self.restore_all_original_state();
    self.state.is_edit_mode = false;
    self.state.has_unsaved_changes = false;
    tracing::info!(restored = snapshot.len(), "edit session cancelled");
    Transition {
      closed:  self.session.take(),
      signals: vec![EditSignal::Restore(snapshot)],
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn editing() -> EditSessionController {
    let mut c = EditSessionController::new(true);
    c.enter_edit_mode(SessionId::new(), OriginalSnapshot::new()).unwrap();
    c
  }

  #[test]
  fn locked_case_cannot_enter_edit_mode() {
    let mut c = EditSessionController::new(false);
    assert_eq!(c.state().phase(), EditPhase::Locked);
    assert_eq!(
      c.enter_edit_mode(SessionId::new(), OriginalSnapshot::new()),
      Err(Error::EditingDisabled)
    );
  }

  #[test]
  fn phases_follow_transitions() {
    let mut c = EditSessionController::new(true);
    assert_eq!(c.state().phase(), EditPhase::Viewing);

    c.enter_edit_mode(SessionId::new(), OriginalSnapshot::new()).unwrap();
    assert_eq!(c.state().phase(), EditPhase::Editing);

    c.mark_dirty("loanAmount").unwrap();
    assert_eq!(c.state().phase(), EditPhase::Dirty);
    assert_eq!(c.state().display_state(), DisplayState::Unsaved);

    let t = c.save_changes().unwrap();
    assert_eq!(t.signals, [EditSignal::BeforeSave]);
    assert!(t.closed.unwrap().touched.contains("loanAmount"));
    assert_eq!(c.state().phase(), EditPhase::Draft);

    c.save_and_resubmit().unwrap();
    assert_eq!(c.state().phase(), EditPhase::Resubmitted);
    assert_eq!(
      c.state().display_state(),
      DisplayState::Resubmitted { version: 1 }
    );
  }

  #[test]
  fn mark_dirty_requires_edit_mode() {
    let mut c = EditSessionController::new(true);
    assert_eq!(c.mark_dirty("ltv"), Err(Error::NotEditing));
  }

  #[test]
  fn original_state_is_first_write_wins() {
    let mut c = editing();
    assert!(c.store_original_state("ltv", "70.00%"));
    assert!(!c.store_original_state("ltv", "75.00%"));

    let snapshot = c.restore_all_original_state();
    assert_eq!(snapshot.get("ltv"), Some("70.00%"));
    assert!(c.restore_all_original_state().is_empty());
  }

  #[test]
  fn original_state_needs_an_open_session() {
    let mut c = EditSessionController::new(true);
    assert!(!c.store_original_state("ltv", "70.00%"));
  }

  #[test]
  fn cancel_emits_restore_with_originals() {
    let mut c = editing();
    c.store_original_state("ltv", "70.00%");
    c.mark_dirty("ltv").unwrap();

    let t = c.cancel_and_exit_edit_mode();
    let [EditSignal::Restore(snapshot)] = t.signals.as_slice() else {
      panic!("expected a single restore signal, got {:?}", t.signals);
    };
    assert_eq!(snapshot.get("ltv"), Some("70.00%"));
    assert!(!c.state().is_edit_mode);
    assert!(!c.state().has_unsaved_changes);
    assert!(c.session().is_none());
  }

  #[test]
  fn exit_keeps_saved_draft() {
    let mut c = editing();
    c.mark_dirty("ltv").unwrap();
    c.save_changes().unwrap();
    c.enter_edit_mode(SessionId::new(), OriginalSnapshot::new()).unwrap();

    c.exit_edit_mode();
    assert!(c.state().has_saved_changes);
    assert_eq!(c.state().phase(), EditPhase::Draft);
  }

  #[test]
  fn resubmit_from_dirty_bumps_version() {
    let mut c = editing();
    c.mark_dirty("loanAmount").unwrap();

    let t = c.save_and_resubmit().unwrap();
    assert_eq!(
      t.signals,
      [EditSignal::BeforeSave, EditSignal::Resubmit { version: 1 }]
    );
    let s = c.state();
    assert_eq!(s.case_version, 1);
    assert!(!s.is_edit_mode && !s.has_unsaved_changes && !s.has_saved_changes);
  }

  #[test]
  fn resubmit_needs_edits_or_a_draft() {
    let mut c = EditSessionController::new(true);
    assert_eq!(c.save_and_resubmit().unwrap_err(), Error::NothingToResubmit);
  }

  #[test]
  fn disabling_mid_edit_broadcasts_restore() {
    let mut c = editing();
    c.store_original_state("ltv", "70.00%");
    c.mark_dirty("ltv").unwrap();

    let t = c.set_editing_enabled(false);
    assert!(matches!(t.signals.as_slice(), [EditSignal::Restore(_)]));
    assert_eq!(c.state().phase(), EditPhase::Locked);
    assert!(!c.state().is_edit_mode);
  }
}
