//! Case sections and the data-capture route that selects which form is bound.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator as _};

use crate::{Error, Result};

/// The applicants on a case. The demo case always has two.
pub const APPLICANT_COUNT: u8 = 2;

/// A section of the case. The kebab-case name is used in routes; the human
/// label is what the audit ledger records.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Section {
  PersonalDetails,
  Employment,
  Income,
  Commitments,
  Property,
  LoanDetails,
  Affordability,
}

impl Section {
  pub fn label(self) -> &'static str {
    match self {
      Self::PersonalDetails => "Personal Details",
      Self::Employment => "Employment",
      Self::Income => "Income",
      Self::Commitments => "Commitments",
      Self::Property => "Property",
      Self::LoanDetails => "Loan Details",
      Self::Affordability => "Affordability",
    }
  }

  /// Whether the section holds one form per applicant rather than one per
  /// case.
  pub fn is_per_applicant(self) -> bool {
    matches!(
      self,
      Self::PersonalDetails | Self::Employment | Self::Income | Self::Commitments
    )
  }

  /// Resolve a section from its route name, falling back to a match on the
  /// human label.
  pub fn parse(name: &str) -> Result<Self> {
    Self::from_str(name).or_else(|_| {
      Self::iter()
        .find(|s| s.label().eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::UnknownSection(name.to_owned()))
    })
  }
}

impl fmt::Display for Section {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

// ─── Route ───────────────────────────────────────────────────────────────────

/// A parsed `/data-capture/:section?/:applicantNumber?` route.
///
/// Per-applicant sections always carry an applicant (defaulting to 1);
/// case-level sections never do.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize,
)]
pub struct FormRoute {
  pub section:   Section,
  pub applicant: Option<u8>,
}

impl FormRoute {
  pub const PREFIX: &'static str = "data-capture";

  pub fn new(section: Section, applicant: Option<u8>) -> Result<Self> {
    let applicant = if section.is_per_applicant() {
      let n = applicant.unwrap_or(1);
      if !(1..=APPLICANT_COUNT).contains(&n) {
        return Err(Error::InvalidRoute(format!("{section:?}/{n}")));
      }
      Some(n)
    } else {
      None
    };
    Ok(Self { section, applicant })
  }

  /// Parse a route path. Leading and trailing slashes are ignored.
  pub fn parse(path: &str) -> Result<Self> {
    let invalid = || Error::InvalidRoute(path.to_owned());
    let mut parts = path.trim_matches('/').split('/').filter(|p| !p.is_empty());

    if parts.next() != Some(Self::PREFIX) {
      return Err(invalid());
    }
    let section = match parts.next() {
      Some(name) => Section::parse(name)?,
      None => Section::PersonalDetails,
    };
    let applicant = parts
      .next()
      .map(|n| n.parse::<u8>().map_err(|_| invalid()))
      .transpose()?;
    if parts.next().is_some() {
      return Err(invalid());
    }
    Self::new(section, applicant).map_err(|_| invalid())
  }

  /// The section label written into audit entries for edits on this form.
  pub fn audit_section(&self) -> String {
    match self.applicant {
      Some(n) => format!("{} (Applicant {n})", self.section.label()),
      None => self.section.label().to_owned(),
    }
  }
}

impl fmt::Display for FormRoute {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "/{}/{}", Self::PREFIX, self.section.as_ref())?;
    if let Some(n) = self.applicant {
      write!(f, "/{n}")?;
    }
    Ok(())
  }
}

impl FromStr for FormRoute {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::parse(s) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bare_route_defaults_to_first_applicant_personal_details() {
    let route = FormRoute::parse("/data-capture").unwrap();
    assert_eq!(route.section, Section::PersonalDetails);
    assert_eq!(route.applicant, Some(1));
  }

  #[test]
  fn parses_section_and_applicant() {
    let route = FormRoute::parse("/data-capture/income/2/").unwrap();
    assert_eq!(route.section, Section::Income);
    assert_eq!(route.applicant, Some(2));
    assert_eq!(route.to_string(), "/data-capture/income/2");
    assert_eq!(route.audit_section(), "Income (Applicant 2)");
  }

  #[test]
  fn case_level_section_drops_applicant() {
    let route = FormRoute::parse("/data-capture/loan-details/1").unwrap();
    assert_eq!(route.applicant, None);
    assert_eq!(route.audit_section(), "Loan Details");
  }

  #[test]
  fn rejects_out_of_range_applicant() {
    assert_eq!(
      FormRoute::parse("/data-capture/income/3"),
      Err(Error::InvalidRoute("/data-capture/income/3".into()))
    );
  }

  #[test]
  fn rejects_unknown_section_and_prefix() {
    assert!(matches!(
      FormRoute::parse("/data-capture/pets"),
      Err(Error::UnknownSection(_))
    ));
    assert!(matches!(
      FormRoute::parse("/summary/income"),
      Err(Error::InvalidRoute(_))
    ));
  }

  #[test]
  fn section_parses_from_label() {
    assert_eq!(Section::parse("Loan Details").unwrap(), Section::LoanDetails);
  }
}
