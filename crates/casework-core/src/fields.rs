//! The unified field store: the single flat key/value table that every
//! differently-shaped form reads from and writes into.
//!
//! Protection is checked at every mutation entry point. A protected key keeps
//! the value it was booted with for the lifetime of the store.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
  Error, Result,
  audit::AuditLedger,
  ids::EntryId,
  mapping::FieldMappings,
};

/// Section label recorded when a field is reset to its boot value.
pub const RESET_SECTION: &str = "Reset";

/// The outcome of a single accepted [`UnifiedFieldStore::update_field`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldWrite {
  pub field:     String,
  pub old_value: String,
  pub new_value: String,
  /// The mapped key that received the same value, if any.
  pub mirrored:  Option<&'static str>,
  /// The audit entry recorded for the write; `None` when the value was
  /// unchanged.
  pub entry:     Option<EntryId>,
}

/// The outcome of a bulk sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
  /// Keys whose stored value changed.
  pub applied:  Vec<String>,
  /// Mapped counterparts written alongside applied keys.
  pub mirrored: Vec<String>,
  /// Protected keys that were skipped.
  pub rejected: Vec<String>,
}

/// A field as shown on a read-only page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldView {
  pub key:         String,
  pub value:       String,
  pub protected:   bool,
  pub modified:    bool,
  pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
enum Origin {
  DataCapture,
  ReadOnly,
  Either,
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct UnifiedFieldStore {
  values:     BTreeMap<String, String>,
  /// Boot-time values; the target of [`Self::reset_field`].
  originals:  BTreeMap<String, String>,
  modified:   BTreeSet<String>,
  timestamps: BTreeMap<String, DateTime<Utc>>,
  mappings:   FieldMappings,
}

impl UnifiedFieldStore {
  /// Boot a store. Initial values bypass protection; this is the only way a
  /// protected key ever receives a value.
  pub fn new<I, K, V>(initial: I, mappings: FieldMappings) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    let values: BTreeMap<String, String> = initial
      .into_iter()
      .map(|(k, v)| (k.into(), v.into()))
      .collect();
    Self {
      originals: values.clone(),
      values,
      modified: BTreeSet::new(),
      timestamps: BTreeMap::new(),
      mappings,
    }
  }

  pub fn mappings(&self) -> &FieldMappings { &self.mappings }

  pub fn is_protected(&self, field: &str) -> bool {
    self.mappings.is_protected(field)
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  /// Write a single field, recording the change in `ledger` and mirroring the
  /// value into the field's mapped counterpart.
  pub fn update_field(
    &mut self,
    field: &str,
    value: &str,
    section: &str,
    ledger: &mut AuditLedger,
  ) -> Result<FieldWrite> {
    if self.is_protected(field) {
      tracing::warn!(field, section, "rejected write to protected field");
      return Err(Error::RejectedProtectedField(field.to_owned()));
    }

    let old_value = self.get_field_value(field).to_owned();
    self.write(field, value);
    let entry = ledger
      .add_entry(field, &old_value, value, section)
      .map(|e| e.id);

    let mirrored = self.mirror_target(field, Origin::Either);
    if let Some(target) = mirrored {
      self.write(target, value);
    }
    tracing::debug!(field, ?mirrored, "field updated");

    Ok(FieldWrite {
      field: field.to_owned(),
      old_value,
      new_value: value.to_owned(),
      mirrored,
      entry,
    })
  }

  /// Merge a whole data-capture form into the store without auditing.
  pub fn sync_from_data_capture(
    &mut self,
    data: &BTreeMap<String, String>,
  ) -> SyncReport {
    self.merge(data, Origin::DataCapture)
  }

  /// Merge a whole read-only page into the store without auditing.
  pub fn sync_from_read_only(
    &mut self,
    data: &BTreeMap<String, String>,
  ) -> SyncReport {
    self.merge(data, Origin::ReadOnly)
  }

  /// Put values back without auditing, e.g. after a cancelled session or an
  /// audit revert. Keys that end up at their boot value lose their modified
  /// marker.
  pub fn restore_values(&mut self, data: &BTreeMap<String, String>) -> SyncReport {
    let report = self.merge(data, Origin::Either);
    for key in report.applied.iter().chain(&report.mirrored) {
      if self.original_value(key) == self.get_field_value(key) {
        self.clear_modified(key);
      }
    }
    report
  }

  /// Reset a field to its boot value. The reset is audited under the
  /// [`RESET_SECTION`] label and the field's modified marker is cleared.
  pub fn reset_field(
    &mut self,
    field: &str,
    ledger: &mut AuditLedger,
  ) -> Result<FieldWrite> {
    if self.is_protected(field) {
      tracing::warn!(field, "rejected reset of protected field");
      return Err(Error::RejectedProtectedField(field.to_owned()));
    }
    let original = self.original_value(field).to_owned();
    let write = self.update_field(field, &original, RESET_SECTION, ledger)?;
    self.clear_modified(field);
    Ok(write)
  }

  fn merge(&mut self, data: &BTreeMap<String, String>, origin: Origin) -> SyncReport {
    let mut report = SyncReport::default();
    for (key, value) in data {
      if self.is_protected(key) {
        tracing::warn!(field = %key, "bulk sync skipped protected field");
        report.rejected.push(key.clone());
        continue;
      }
      if self.write(key, value) {
        report.applied.push(key.clone());
      }
      if let Some(target) = self.mirror_target(key, origin)
        && self.write(target, value)
      {
        report.mirrored.push(target.to_owned());
      }
    }
    if !report.applied.is_empty() || !report.rejected.is_empty() {
      tracing::debug!(
        applied = report.applied.len(),
        mirrored = report.mirrored.len(),
        rejected = report.rejected.len(),
        "bulk sync merged"
      );
    }
    report
  }

  /// The mapped key that should receive a mirrored write of `field`.
  fn mirror_target(&self, field: &str, origin: Origin) -> Option<&'static str> {
    let target = match origin {
      Origin::DataCapture => self.mappings.from_data_capture(field),
      Origin::ReadOnly => self.mappings.from_read_only(field),
      Origin::Either => self.mappings.counterpart(field),
    }?;
    (target != field && !self.is_protected(target)).then_some(target)
  }

  /// Store a value and mark it modified. Returns whether the value changed.
  fn write(&mut self, field: &str, value: &str) -> bool {
    if self.values.get(field).is_some_and(|v| v == value) {
      return false;
    }
    self.values.insert(field.to_owned(), value.to_owned());
    self.modified.insert(field.to_owned());
    self.timestamps.insert(field.to_owned(), Utc::now());
    true
  }

  fn clear_modified(&mut self, field: &str) {
    self.modified.remove(field);
    self.timestamps.remove(field);
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// The stored value, or the empty string for an unknown key.
  pub fn get_field_value(&self, field: &str) -> &str {
    self.values.get(field).map(String::as_str).unwrap_or_default()
  }

  /// The value the field was booted with, or the empty string.
  pub fn original_value(&self, field: &str) -> &str {
    self.originals.get(field).map(String::as_str).unwrap_or_default()
  }

  /// The mapped counterpart of `field`.
  pub fn counterpart(&self, field: &str) -> Result<&'static str> {
    self
      .mappings
      .counterpart(field)
      .ok_or_else(|| Error::NoMapping(field.to_owned()))
  }

  pub fn is_modified(&self, field: &str) -> bool { self.modified.contains(field) }

  pub fn modified_at(&self, field: &str) -> Option<DateTime<Utc>> {
    self.timestamps.get(field).copied()
  }

  pub fn modified_fields(&self) -> impl Iterator<Item = &str> {
    self.modified.iter().map(String::as_str)
  }

  pub fn view(&self, field: &str) -> FieldView {
    FieldView {
      key:         field.to_owned(),
      value:       self.get_field_value(field).to_owned(),
      protected:   self.is_protected(field),
      modified:    self.is_modified(field),
      modified_at: self.modified_at(field),
    }
  }

  /// Every stored field, in key order.
  pub fn views(&self) -> Vec<FieldView> {
    self.values.keys().map(|k| self.view(k)).collect()
  }

  /// Copy out the current values of `keys`. Unknown keys map to `""`.
  pub fn snapshot<'a>(
    &self,
    keys: impl IntoIterator<Item = &'a str>,
  ) -> BTreeMap<String, String> {
    keys
      .into_iter()
      .map(|k| (k.to_owned(), self.get_field_value(k).to_owned()))
      .collect()
  }

  /// Every stored value.
  pub fn values(&self) -> &BTreeMap<String, String> { &self.values }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn store() -> UnifiedFieldStore {
    UnifiedFieldStore::new(
      [
        ("loanAmount", "£175,000"),
        ("requestedLoanAmount", "£175,000"),
        ("monthlyPayment", "£1,024.56"),
        ("calculatedMonthlyPayment", "£1,024.56"),
        ("creditScore", "742"),
      ],
      FieldMappings::standard(),
    )
  }

  fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
      .iter()
      .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
      .collect()
  }

  #[test]
  fn update_records_entry_and_mirrors() {
    let mut s = store();
    let mut ledger = AuditLedger::default();

    let write = s
      .update_field("loanAmount", "£180,000", "Loan Details", &mut ledger)
      .unwrap();

    assert_eq!(write.old_value, "£175,000");
    assert_eq!(write.mirrored, Some("requestedLoanAmount"));
    assert_eq!(s.get_field_value("requestedLoanAmount"), "£180,000");
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.entries_for_field("requestedLoanAmount").count(), 0);
    assert!(s.is_modified("loanAmount"));
    assert!(s.modified_at("loanAmount").is_some());
  }

  #[test]
  fn protected_update_is_rejected_without_side_effects() {
    let mut s = store();
    let mut ledger = AuditLedger::default();

    let err = s
      .update_field("creditScore", "800", "Credit", &mut ledger)
      .unwrap_err();
    assert_eq!(err, Error::RejectedProtectedField("creditScore".into()));
    assert_eq!(s.get_field_value("creditScore"), "742");
    assert!(ledger.is_empty());
    assert!(!s.is_modified("creditScore"));
  }

  #[test]
  fn unknown_field_reads_as_empty() {
    assert_eq!(store().get_field_value("nope"), "");
  }

  #[test]
  fn bulk_sync_skips_protected_and_writes_counterparts_silently() {
    let mut s = store();
    let report = s.sync_from_data_capture(&map(&[
      ("loanAmount", "£190,000"),
      ("monthlyPayment", "£0"),
    ]));

    assert_eq!(report.applied, ["loanAmount"]);
    assert_eq!(report.mirrored, ["requestedLoanAmount"]);
    assert_eq!(report.rejected, ["monthlyPayment"]);
    assert_eq!(s.get_field_value("requestedLoanAmount"), "£190,000");
    assert_eq!(s.get_field_value("monthlyPayment"), "£1,024.56");
  }

  #[test]
  fn read_only_sync_mirrors_into_data_capture_name() {
    let mut s = store();
    s.sync_from_read_only(&map(&[("requestedLoanAmount", "£200,000")]));
    assert_eq!(s.get_field_value("loanAmount"), "£200,000");
  }

  #[test]
  fn read_only_sync_never_mirrors_into_a_protected_counterpart() {
    let mut s = store();
    let report =
      s.sync_from_read_only(&map(&[("calculatedMonthlyPayment", "£1")]));
    assert_eq!(report.rejected, ["calculatedMonthlyPayment"]);
    assert_eq!(s.get_field_value("monthlyPayment"), "£1,024.56");
  }

  #[test]
  fn reset_restores_boot_value_and_clears_marker() {
    let mut s = store();
    let mut ledger = AuditLedger::default();
    s.update_field("loanAmount", "£180,000", "Loan Details", &mut ledger)
      .unwrap();

    let write = s.reset_field("loanAmount", &mut ledger).unwrap();
    assert_eq!(write.new_value, "£175,000");
    assert_eq!(s.get_field_value("loanAmount"), "£175,000");
    assert!(!s.is_modified("loanAmount"));
    assert_eq!(ledger.entries().next().unwrap().section, RESET_SECTION);
  }

  #[test]
  fn reset_of_protected_field_is_rejected() {
    let mut s = store();
    let mut ledger = AuditLedger::default();
    assert!(matches!(
      s.reset_field("monthlyPayment", &mut ledger),
      Err(Error::RejectedProtectedField(_))
    ));
  }

  #[test]
  fn restore_clears_markers_for_values_back_at_boot() {
    let mut s = store();
    let mut ledger = AuditLedger::default();
    s.update_field("loanAmount", "£180,000", "Loan Details", &mut ledger)
      .unwrap();

    s.restore_values(&map(&[("loanAmount", "£175,000")]));
    assert!(!s.is_modified("loanAmount"));
    assert!(!s.is_modified("requestedLoanAmount"));
    assert_eq!(ledger.len(), 1);
  }

  #[test]
  fn counterpart_reports_missing_mapping() {
    let s = store();
    assert_eq!(s.counterpart("loanAmount"), Ok("requestedLoanAmount"));
    assert_eq!(s.counterpart("creditScore"), Err(Error::NoMapping("creditScore".into())));
  }
}
