//! Error types for `casework-core`.

use thiserror::Error;

use crate::ids::EntryId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  #[error("field {0:?} is protected and cannot be written")]
  RejectedProtectedField(String),

  #[error("audit entry not found: {0}")]
  UnknownAuditEntry(EntryId),

  #[error("no field mapping for {0:?}")]
  NoMapping(String),

  #[error("editing is disabled for this case")]
  EditingDisabled,

  #[error("the case is not in edit mode")]
  NotEditing,

  #[error("there are no changes to resubmit")]
  NothingToResubmit,

  #[error("no form is bound for {0}")]
  UnknownForm(String),

  #[error("unknown section: {0:?}")]
  UnknownSection(String),

  #[error("invalid data-capture route: {0:?}")]
  InvalidRoute(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
