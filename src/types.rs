use std::{fmt, ops::AddAssign, str::FromStr};

use serde::{Deserialize, Serialize};

/// How the server reconciles the uploaded set with what it already holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
   /// Add or update; nothing is deleted server-side.
   #[default]
   Merge,
   /// The server collection becomes exactly the uploaded set.
   Replace,
}

impl SyncMode {
   pub const fn as_str(self) -> &'static str {
      match self {
         Self::Merge => "merge",
         Self::Replace => "replace",
      }
   }
}

impl fmt::Display for SyncMode {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_str())
   }
}

impl FromStr for SyncMode {
   type Err = String;

   fn from_str(s: &str) -> Result<Self, Self::Err> {
      match s.trim().to_ascii_lowercase().as_str() {
         "merge" => Ok(Self::Merge),
         "replace" => Ok(Self::Replace),
         other => Err(format!("unknown sync mode '{other}' (expected merge or replace)")),
      }
   }
}

/// Lifecycle of a single sync session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
   Created,
   Uploading,
   Committing,
   Committed,
   Failed,
   Cancelled,
}

impl SessionStatus {
   pub const fn is_terminal(self) -> bool {
      matches!(self, Self::Committed | Self::Failed | Self::Cancelled)
   }

   pub const fn can_transition_to(self, next: Self) -> bool {
      matches!(
         (self, next),
         (Self::Created, Self::Uploading | Self::Failed)
            | (Self::Uploading, Self::Committing | Self::Failed | Self::Cancelled)
            | (Self::Committing, Self::Committed | Self::Failed)
      )
   }

   pub const fn as_str(self) -> &'static str {
      match self {
         Self::Created => "created",
         Self::Uploading => "uploading",
         Self::Committing => "committing",
         Self::Committed => "committed",
         Self::Failed => "failed",
         Self::Cancelled => "cancelled",
      }
   }
}

impl fmt::Display for SessionStatus {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_str())
   }
}

/// One catalog entry as sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRecord {
   pub identifier: String,
}

impl ItemRecord {
   pub fn new(identifier: impl Into<String>) -> Self {
      Self { identifier: identifier.into() }
   }
}

/// Accepted / duplicate / invalid counts for a chunk or a whole session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tallies {
   pub accepted:   u64,
   pub duplicates: u64,
   pub invalid:    u64,
}

impl Tallies {
   pub const fn new(accepted: u64, duplicates: u64, invalid: u64) -> Self {
      Self { accepted, duplicates, invalid }
   }

   pub const fn total(&self) -> u64 {
      self.accepted + self.duplicates + self.invalid
   }
}

impl AddAssign for Tallies {
   fn add_assign(&mut self, rhs: Self) {
      self.accepted += rhs.accepted;
      self.duplicates += rhs.duplicates;
      self.invalid += rhs.invalid;
   }
}
