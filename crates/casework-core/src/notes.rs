//! Case notes: free-text reviewer notes plus system notes raised by policy
//! rule decisions.
//!
//! User notes form an ordered, append-only list. System notes are keyed by
//! rule id, so each rule has at most one active note which later decisions
//! replace or withdraw.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::NoteId;

/// Author recorded on system-generated notes.
pub const SYSTEM_AUTHOR: &str = "System";

/// Display format of [`CaseNote::date`].
pub const NOTE_DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
  User,
  System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseNote {
  pub id:           NoteId,
  pub author:       String,
  /// `created_at` rendered with [`NOTE_DATE_FORMAT`].
  pub date:         String,
  pub created_at:   DateTime<Utc>,
  pub content:      String,
  #[serde(rename = "type")]
  pub kind:         NoteKind,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub reason_codes: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rule_id:      Option<String>,
}

/// Input to [`CaseNotesLedger::add_case_note`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewCaseNote {
  pub author:       String,
  pub content:      String,
  #[serde(default)]
  pub reason_codes: Vec<String>,
}

/// The outcome a reviewer recorded against a policy rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleDecision {
  Accept,
  Refer,
  Decline,
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct CaseNotesLedger {
  user:   VecDeque<CaseNote>,
  system: BTreeMap<String, CaseNote>,
}

impl CaseNotesLedger {
  pub fn new() -> Self { Self::default() }

  /// Add a reviewer note at the front of the list.
  pub fn add_case_note(&mut self, input: NewCaseNote) -> &CaseNote {
    let now = Utc::now();
    let note = CaseNote {
      id:           NoteId::new(),
      author:       input.author,
      date:         now.format(NOTE_DATE_FORMAT).to_string(),
      created_at:   now,
      content:      input.content,
      kind:         NoteKind::User,
      reason_codes: input.reason_codes,
      rule_id:      None,
    };
    tracing::debug!(note = %note.id, "case note added");
    self.user.push_front(note);
    &self.user[0]
  }

  /// Create or replace the system note for `rule_id`. A replaced note keeps
  /// its id.
  pub fn upsert_system_note(
    &mut self,
    rule_id: &str,
    content: String,
    reason_codes: Vec<String>,
  ) -> &CaseNote {
    let now = Utc::now();
    let id = self.system.get(rule_id).map_or_else(NoteId::new, |n| n.id);
    let note = CaseNote {
      id,
      author: SYSTEM_AUTHOR.to_owned(),
      date: now.format(NOTE_DATE_FORMAT).to_string(),
      created_at: now,
      content,
      kind: NoteKind::System,
      reason_codes,
      rule_id: Some(rule_id.to_owned()),
    };
    tracing::debug!(note = %id, rule_id, "system note written");
    self.system.insert(rule_id.to_owned(), note);
    &self.system[rule_id]
  }

  pub fn remove_system_note(&mut self, rule_id: &str) -> Option<CaseNote> {
    let removed = self.system.remove(rule_id);
    if removed.is_some() {
      tracing::debug!(rule_id, "system note withdrawn");
    }
    removed
  }

  /// Apply a policy rule decision. Referrals and declines raise (or refresh)
  /// the rule's system note; an acceptance withdraws it.
  pub fn record_rule_decision(
    &mut self,
    rule_id: &str,
    decision: RuleDecision,
    reason_codes: Vec<String>,
  ) -> Option<&CaseNote> {
    let verb = match decision {
      RuleDecision::Accept => {
        self.remove_system_note(rule_id);
        return None;
      }
      RuleDecision::Refer => "referred",
      RuleDecision::Decline => "declined",
    };
    let mut content = format!("Policy rule {rule_id} {verb}");
    if !reason_codes.is_empty() {
      content.push_str(&format!(" (reason codes: {})", reason_codes.join(", ")));
    }
    Some(self.upsert_system_note(rule_id, content, reason_codes))
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub fn system_note(&self, rule_id: &str) -> Option<&CaseNote> {
    self.system.get(rule_id)
  }

  /// Reviewer notes, newest first.
  pub fn user_notes(&self) -> impl Iterator<Item = &CaseNote> { self.user.iter() }

  /// Every note, newest first.
  pub fn notes(&self) -> Vec<&CaseNote> {
    let mut all: Vec<&CaseNote> =
      self.user.iter().chain(self.system.values()).collect();
    all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    all
  }

  pub fn len(&self) -> usize { self.user.len() + self.system.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}
