//! The static field-mapping table.
//!
//! Data-capture forms and the read-only summary pages name the same facts
//! differently. Each [`FieldMapping`] row correlates the two names within a
//! section. Rows flagged protected are system-calculated values that no
//! external write may change; [`PROTECTED_FIELDS`] adds keys that have no
//! mapping at all.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::section::{FormRoute, Section};

/// One row of the mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldMapping {
  pub section:               Section,
  /// `Some(n)` when the row belongs to applicant `n`'s form.
  pub applicant:             Option<u8>,
  pub data_capture:          &'static str,
  pub read_only:             &'static str,
  pub is_protected:          bool,
  /// Changing this field invalidates the affordability assessment.
  pub affects_affordability: bool,
}

impl FieldMapping {
  const fn case(
    section: Section,
    data_capture: &'static str,
    read_only: &'static str,
  ) -> Self {
    Self {
      section,
      applicant: None,
      data_capture,
      read_only,
      is_protected: false,
      affects_affordability: false,
    }
  }

  const fn applicant(
    n: u8,
    section: Section,
    data_capture: &'static str,
    read_only: &'static str,
  ) -> Self {
    let mut row = Self::case(section, data_capture, read_only);
    row.applicant = Some(n);
    row
  }

  const fn protected(mut self) -> Self {
    self.is_protected = true;
    self
  }

  const fn affordability(mut self) -> Self {
    self.affects_affordability = true;
    self
  }

  /// Whether `key` is either name of this row.
  pub fn names(&self, key: &str) -> bool {
    self.data_capture == key || self.read_only == key
  }

  /// The other name of this row, if `key` is one of its names.
  pub fn counterpart_of(&self, key: &str) -> Option<&'static str> {
    if self.data_capture == key {
      Some(self.read_only)
    } else if self.read_only == key {
      Some(self.data_capture)
    } else {
      None
    }
  }
}

use Section::*;

#[rustfmt::skip]
pub static FIELD_MAPPINGS: &[FieldMapping] = &[
  // ── Personal details ──────────────────────────────────────────────────────
  FieldMapping::applicant(1, PersonalDetails, "app1FirstName",   "applicant1FirstName"),
  FieldMapping::applicant(1, PersonalDetails, "app1LastName",    "applicant1Surname"),
  FieldMapping::applicant(1, PersonalDetails, "app1DateOfBirth", "applicant1Dob"),
  FieldMapping::applicant(2, PersonalDetails, "app2FirstName",   "applicant2FirstName"),
  FieldMapping::applicant(2, PersonalDetails, "app2LastName",    "applicant2Surname"),
  FieldMapping::applicant(2, PersonalDetails, "app2DateOfBirth", "applicant2Dob"),

  // ── Employment ────────────────────────────────────────────────────────────
  FieldMapping::applicant(1, Employment, "app1EmploymentStatus", "applicant1EmploymentStatus"),
  FieldMapping::applicant(1, Employment, "app1EmployerName",     "applicant1Employer"),
  FieldMapping::applicant(2, Employment, "app2EmploymentStatus", "applicant2EmploymentStatus"),
  FieldMapping::applicant(2, Employment, "app2EmployerName",     "applicant2Employer"),

  // ── Income ────────────────────────────────────────────────────────────────
  FieldMapping::applicant(1, Income, "app1GrossIncome", "applicant1AnnualIncome").affordability(),
  FieldMapping::applicant(1, Income, "app1Bonus",       "applicant1BonusIncome").affordability(),
  FieldMapping::applicant(2, Income, "app2GrossIncome", "applicant2AnnualIncome").affordability(),
  FieldMapping::applicant(2, Income, "app2Bonus",       "applicant2BonusIncome").affordability(),

  // ── Commitments ───────────────────────────────────────────────────────────
  FieldMapping::applicant(1, Commitments, "app1MonthlyCommitments", "applicant1TotalCommitments").affordability(),
  FieldMapping::applicant(1, Commitments, "app1CreditCardBalance",  "applicant1CreditCards"),
  FieldMapping::applicant(2, Commitments, "app2MonthlyCommitments", "applicant2TotalCommitments").affordability(),
  FieldMapping::applicant(2, Commitments, "app2CreditCardBalance",  "applicant2CreditCards"),

  // ── Property ──────────────────────────────────────────────────────────────
  FieldMapping::case(Property, "propertyValue",    "purchasePrice").affordability(),
  FieldMapping::case(Property, "propertyPostcode", "securityPostcode"),
  FieldMapping::case(Property, "propertyType",     "propertyType"),

  // ── Loan details ──────────────────────────────────────────────────────────
  FieldMapping::case(LoanDetails, "loanAmount",    "requestedLoanAmount").affordability(),
  FieldMapping::case(LoanDetails, "loanTerm",      "mortgageTerm").affordability(),
  FieldMapping::case(LoanDetails, "repaymentType", "repaymentMethod"),
  FieldMapping::case(LoanDetails, "ltv",           "loanToValue").affordability(),

  // ── Affordability (calculated) ────────────────────────────────────────────
  FieldMapping::case(Affordability, "monthlyPayment",     "calculatedMonthlyPayment").protected(),
  FieldMapping::case(Affordability, "maxBorrowing",       "maximumLoanAmount").protected(),
  FieldMapping::case(Affordability, "affordabilityRatio", "incomeMultiple").protected(),
];

/// Keys that are protected without appearing in [`FIELD_MAPPINGS`].
pub static PROTECTED_FIELDS: &[&str] = &[
  "caseReference",
  "creditScore",
  "affordabilityScore",
  "stressedMonthlyPayment",
  "policyOutcome",
];

// ─── Lookup ──────────────────────────────────────────────────────────────────

/// Indexed view over a mapping table and a protected denylist.
#[derive(Debug, Clone)]
pub struct FieldMappings {
  rows:         &'static [FieldMapping],
  denylist:     &'static [&'static str],
  by_capture:   BTreeMap<&'static str, usize>,
  by_read_only: BTreeMap<&'static str, usize>,
}

impl FieldMappings {
  pub fn new(
    rows: &'static [FieldMapping],
    denylist: &'static [&'static str],
  ) -> Self {
    let mut by_capture = BTreeMap::new();
    let mut by_read_only = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
      by_capture.entry(row.data_capture).or_insert(i);
      by_read_only.entry(row.read_only).or_insert(i);
    }
    Self { rows, denylist, by_capture, by_read_only }
  }

  /// The table shipped with the demo case.
  pub fn standard() -> Self { Self::new(FIELD_MAPPINGS, PROTECTED_FIELDS) }

  pub fn rows(&self) -> &'static [FieldMapping] { self.rows }

  /// The row naming `key`, looking at data-capture names first.
  pub fn row(&self, key: &str) -> Option<&'static FieldMapping> {
    self
      .by_capture
      .get(key)
      .or_else(|| self.by_read_only.get(key))
      .map(|&i| &self.rows[i])
  }

  /// The read-only name for a data-capture key.
  pub fn from_data_capture(&self, key: &str) -> Option<&'static str> {
    self.by_capture.get(key).map(|&i| self.rows[i].read_only)
  }

  /// The data-capture name for a read-only key.
  pub fn from_read_only(&self, key: &str) -> Option<&'static str> {
    self.by_read_only.get(key).map(|&i| self.rows[i].data_capture)
  }

  /// The other name for `key` in either direction.
  pub fn counterpart(&self, key: &str) -> Option<&'static str> {
    self.row(key).and_then(|row| row.counterpart_of(key))
  }

  pub fn is_protected(&self, key: &str) -> bool {
    self.denylist.contains(&key)
      || self.rows.iter().any(|row| row.is_protected && row.names(key))
  }

  pub fn affects_affordability(&self, key: &str) -> bool {
    self.row(key).is_some_and(|row| row.affects_affordability)
  }

  /// The data-capture keys shown on the form at `route`.
  pub fn form_fields(&self, route: &FormRoute) -> Vec<&'static str> {
    self
      .rows
      .iter()
      .filter(|row| row.section == route.section && row.applicant == route.applicant)
      .map(|row| row.data_capture)
      .collect()
  }
}

impl Default for FieldMappings {
  fn default() -> Self { Self::standard() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn counterpart_resolves_in_both_directions() {
    let m = FieldMappings::standard();
    assert_eq!(m.counterpart("loanAmount"), Some("requestedLoanAmount"));
    assert_eq!(m.counterpart("requestedLoanAmount"), Some("loanAmount"));
    assert_eq!(m.from_data_capture("ltv"), Some("loanToValue"));
    assert_eq!(m.from_read_only("ltv"), None);
    assert_eq!(m.counterpart("notes"), None);
  }

  #[test]
  fn protection_covers_denylist_and_flagged_rows() {
    let m = FieldMappings::standard();
    assert!(m.is_protected("creditScore"));
    assert!(m.is_protected("monthlyPayment"));
    assert!(m.is_protected("calculatedMonthlyPayment"));
    assert!(!m.is_protected("loanAmount"));
  }

  #[test]
  fn form_fields_follow_section_and_applicant() {
    let m = FieldMappings::standard();
    let route = FormRoute::new(Section::Income, Some(2)).unwrap();
    assert_eq!(m.form_fields(&route), vec!["app2GrossIncome", "app2Bonus"]);

    let loan = FormRoute::new(Section::LoanDetails, None).unwrap();
    assert_eq!(
      m.form_fields(&loan),
      vec!["loanAmount", "loanTerm", "repaymentType", "ltv"]
    );
  }

  #[test]
  fn every_row_has_distinct_names_within_its_direction() {
    let m = FieldMappings::standard();
    assert_eq!(m.by_capture.len(), FIELD_MAPPINGS.len());
    assert_eq!(m.by_read_only.len(), FIELD_MAPPINGS.len());
  }
}
