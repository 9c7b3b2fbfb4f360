//! The fictitious two-applicant case the workspace boots with.

use std::collections::BTreeMap;

use crate::mapping::FieldMappings;

pub const DEMO_CASE_REFERENCE: &str = "MC-2024-00187";

/// Boot values keyed by data-capture name, or by the bare key for fields
/// without a mapping. Mapped read-only names receive the same value.
#[rustfmt::skip]
pub static DEMO_VALUES: &[(&str, &str)] = &[
  ("app1FirstName",          "James"),
  ("app1LastName",           "Whitfield"),
  ("app1DateOfBirth",        "14/03/1986"),
  ("app2FirstName",          "Sarah"),
  ("app2LastName",           "Whitfield"),
  ("app2DateOfBirth",        "02/09/1988"),
  ("app1EmploymentStatus",   "Employed"),
  ("app1EmployerName",       "Northgate Engineering Ltd"),
  ("app2EmploymentStatus",   "Self-employed"),
  ("app2EmployerName",       "S Whitfield Design"),
  ("app1GrossIncome",        "£52,000"),
  ("app1Bonus",              "£4,000"),
  ("app2GrossIncome",        "£31,500"),
  ("app2Bonus",              "£0"),
  ("app1MonthlyCommitments", "£320"),
  ("app1CreditCardBalance",  "£1,150"),
  ("app2MonthlyCommitments", "£180"),
  ("app2CreditCardBalance",  "£0"),
  ("propertyValue",          "£250,000"),
  ("propertyPostcode",       "LS6 2QT"),
  ("propertyType",           "Semi-detached house"),
  ("loanAmount",             "£175,000"),
  ("loanTerm",               "25 years"),
  ("repaymentType",          "Capital and interest"),
  ("ltv",                    "70.00%"),
  ("monthlyPayment",         "£1,024.56"),
  ("maxBorrowing",           "£375,750"),
  ("affordabilityRatio",     "2.10"),
  ("creditScore",            "742"),
  ("affordabilityScore",     "Pass"),
  ("stressedMonthlyPayment", "£1,356.20"),
  ("policyOutcome",          "Accept"),
];

/// Every boot value for the demo case, with mapped names filled in.
pub fn demo_case(
  case_reference: &str,
  mappings: &FieldMappings,
) -> BTreeMap<String, String> {
  let mut values = BTreeMap::new();
  for &(key, value) in DEMO_VALUES {
    values.insert(key.to_owned(), value.to_owned());
    if let Some(other) = mappings.counterpart(key) {
      values.insert(other.to_owned(), value.to_owned());
    }
  }
  values.insert("caseReference".to_owned(), case_reference.to_owned());
  values
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn every_mapped_name_is_seeded() {
    let mappings = FieldMappings::standard();
    let values = demo_case(DEMO_CASE_REFERENCE, &mappings);
    for row in mappings.rows() {
      assert!(values.contains_key(row.data_capture), "{}", row.data_capture);
      assert_eq!(values[row.data_capture], values[row.read_only]);
    }
    assert_eq!(values["caseReference"], DEMO_CASE_REFERENCE);
  }
}
