//! Daily traffic records as GitHub reports them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One day's aggregate traffic of a single kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficRecord {
    pub count: u64,
    pub timestamp: DateTime<Utc>,
    pub uniques: u64,
}

/// Which traffic endpoint a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficKind {
    Views,
    Clones,
}

impl TrafficKind {
    /// Endpoint segment under `repos/{org}/{repo}/traffic/`, which is also
    /// the key of the record array in the response body.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Views => "views",
            Self::Clones => "clones",
        }
    }
}

impl fmt::Display for TrafficKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
