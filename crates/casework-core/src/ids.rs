//! Typed identifiers for ledger entries, edit sessions and case notes.
//!
//! All three wrap a v4 UUID. Keeping them distinct stops a note id from being
//! handed to the audit ledger by accident.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
      Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub Uuid);

    impl $name {
      pub fn new() -> Self { Self(Uuid::new_v4()) }
    }

    impl Default for $name {
      fn default() -> Self { Self::new() }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
      }
    }

    impl From<Uuid> for $name {
      fn from(id: Uuid) -> Self { Self(id) }
    }
  };
}

uuid_id!(
  /// Identifies a single [`AuditEntry`](crate::audit::AuditEntry).
  EntryId
);

uuid_id!(
  /// Correlates every audit entry written during one edit session.
  SessionId
);

uuid_id!(
  /// Identifies a [`CaseNote`](crate::notes::CaseNote).
  NoteId
);
