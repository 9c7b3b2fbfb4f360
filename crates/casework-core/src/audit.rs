//! The audit ledger: an append-only, newest-first log of field changes.
//!
//! Entries are immutable. A revert is recorded as a new entry with the old and
//! new values swapped; nothing is ever edited in place. The only deletion is
//! [`AuditLedger::cancel_session`], which purges every entry written by the
//! current edit session.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  ids::{EntryId, SessionId},
};

/// Attributed to every entry when no reviewer name is configured.
pub const DEFAULT_AUDIT_USER: &str = "Case Reviewer";

/// Appended to the section label of an entry that records a revert.
pub const REVERTED_SUFFIX: &str = " (Reverted)";

/// One recorded field change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
  pub id:         EntryId,
  pub timestamp:  DateTime<Utc>,
  pub field:      String,
  pub old_value:  String,
  pub new_value:  String,
  /// Human label of the section the change was made in.
  pub section:    String,
  pub user:       String,
  pub session_id: Option<SessionId>,
}

impl AuditEntry {
  /// Whether this entry records a revert of an earlier change.
  pub fn is_revert(&self) -> bool { self.section.contains("Reverted") }
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AuditLedger {
  entries: VecDeque<AuditEntry>,
  current: Option<SessionId>,
  user:    String,
}

impl AuditLedger {
  pub fn new(user: impl Into<String>) -> Self {
    Self { entries: VecDeque::new(), current: None, user: user.into() }
  }

  /// Record a change. Returns `None`, and records nothing, when the value did
  /// not actually change.
  pub fn add_entry(
    &mut self,
    field: &str,
    old_value: &str,
    new_value: &str,
    section: &str,
  ) -> Option<&AuditEntry> {
    if old_value == new_value {
      return None;
    }
    let entry = AuditEntry {
      id:         EntryId::new(),
      timestamp:  Utc::now(),
      field:      field.to_owned(),
      old_value:  old_value.to_owned(),
      new_value:  new_value.to_owned(),
      section:    section.to_owned(),
      user:       self.user.clone(),
      session_id: self.current,
    };
    tracing::debug!(
      entry = %entry.id,
      field,
      old_value,
      new_value,
      section,
      "audit entry recorded"
    );
    self.entries.push_front(entry);
    self.entries.front()
  }

  /// Open a fresh session and make it current. Existing entries are kept.
  pub fn start_session(&mut self) -> SessionId {
    let id = SessionId::new();
    if let Some(previous) = self.current.replace(id) {
      tracing::debug!(%previous, "audit session replaced without being closed");
    }
    tracing::info!(session = %id, "audit session started");
    id
  }

  /// Open a session only if none is current.
  pub fn ensure_session(&mut self) -> SessionId {
    match self.current {
      Some(id) => id,
      None => self.start_session(),
    }
  }

  /// Close the current session. Its entries stay in the ledger for good.
  pub fn end_session(&mut self) -> Option<SessionId> {
    let ended = self.current.take();
    if let Some(id) = ended {
      tracing::info!(session = %id, "audit session committed");
    }
    ended
  }

  /// Delete every entry tagged with the current session, then close it.
  /// Returns the number of entries removed.
  pub fn cancel_session(&mut self) -> usize {
    let Some(id) = self.current.take() else {
      return 0;
    };
    let before = self.entries.len();
    self.entries.retain(|e| e.session_id != Some(id));
    let removed = before - self.entries.len();
    tracing::info!(session = %id, removed, "audit session cancelled");
    removed
  }

  /// Undo a single recorded change.
  ///
  /// `apply` receives `snapshot` with the entry's field set back to its old
  /// value. The revert itself is then recorded as a new entry, so reverting
  /// the same entry twice flips the value back again.
  pub fn revert_single_change<F>(
    &mut self,
    entry_id: EntryId,
    snapshot: &BTreeMap<String, String>,
    apply: F,
  ) -> Result<&AuditEntry>
  where
    F: FnOnce(BTreeMap<String, String>),
  {
    let Some(entry) = self.get(entry_id).cloned() else {
      tracing::warn!(entry = %entry_id, "revert requested for unknown audit entry");
      return Err(Error::UnknownAuditEntry(entry_id));
    };

    let mut restored = snapshot.clone();
    restored.insert(entry.field.clone(), entry.old_value.clone());
    apply(restored);

    tracing::debug!(reverts = %entry_id, field = %entry.field, "reverting audit entry");
    let section = format!("{}{REVERTED_SUFFIX}", entry.section);
    // A recorded entry never has equal values, so the swap is always kept.
    self
      .add_entry(&entry.field, &entry.new_value, &entry.old_value, &section)
      .ok_or(Error::UnknownAuditEntry(entry_id))
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub fn get(&self, id: EntryId) -> Option<&AuditEntry> {
    self.entries.iter().find(|e| e.id == id)
  }

  /// All entries, newest first.
  pub fn entries(&self) -> impl Iterator<Item = &AuditEntry> {
    self.entries.iter()
  }

  pub fn entries_for_session(
    &self,
    session: SessionId,
  ) -> impl Iterator<Item = &AuditEntry> {
    self.entries.iter().filter(move |e| e.session_id == Some(session))
  }

  pub fn entries_for_field<'a>(
    &'a self,
    field: &'a str,
  ) -> impl Iterator<Item = &'a AuditEntry> {
    self.entries.iter().filter(move |e| e.field == field)
  }

  pub fn current_session(&self) -> Option<SessionId> { self.current }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl Default for AuditLedger {
  fn default() -> Self { Self::new(DEFAULT_AUDIT_USER) }
}
