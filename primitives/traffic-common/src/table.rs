//! Time-indexed table of view and clone counts.
//!
//! A [`TrafficTable`] holds one [`TrafficRow`] per day. Rows produced from a
//! single fetch cycle come from an outer join of the view and clone records,
//! so a day reported by only one endpoint keeps `None` in the other columns.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{TrafficKind, TrafficRecord};

/// Views and clones recorded for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficRow {
    pub timestamp: DateTime<Utc>,
    pub count_view: Option<u64>,
    pub uniques_view: Option<u64>,
    pub count_clone: Option<u64>,
    pub uniques_clone: Option<u64>,
}

impl TrafficRow {
    /// A row with no counts for either kind.
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            count_view: None,
            uniques_view: None,
            count_clone: None,
            uniques_clone: None,
        }
    }

    fn fill(&mut self, kind: TrafficKind, record: &TrafficRecord) {
        match kind {
            TrafficKind::Views => {
                self.count_view = Some(record.count);
                self.uniques_view = Some(record.uniques);
            }
            TrafficKind::Clones => {
                self.count_clone = Some(record.count);
                self.uniques_clone = Some(record.uniques);
            }
        }
    }
}

/// Ordered rows keyed by timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrafficTable {
    rows: Vec<TrafficRow>,
}

impl TrafficTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<TrafficRow>) -> Self {
        Self { rows }
    }

    /// Joins view and clone records on their timestamp, keeping days that
    /// only one side reported.
    ///
    /// Rows appear in the order their timestamp is first seen, views before
    /// clones. A timestamp repeated within one side keeps its first record.
    pub fn outer_join(views: &[TrafficRecord], clones: &[TrafficRecord]) -> Self {
        let mut rows: Vec<TrafficRow> = Vec::with_capacity(views.len().max(clones.len()));
        let mut index: HashMap<DateTime<Utc>, usize> = HashMap::new();
        let mut seen: HashSet<(TrafficKind, DateTime<Utc>)> = HashSet::new();

        for (kind, records) in [(TrafficKind::Views, views), (TrafficKind::Clones, clones)] {
            for record in records {
                if !seen.insert((kind, record.timestamp)) {
                    tracing::warn!(
                        kind = %kind,
                        timestamp = %record.timestamp,
                        "duplicate traffic record ignored"
                    );
                    continue;
                }

                let slot = *index.entry(record.timestamp).or_insert_with(|| {
                    rows.push(TrafficRow::empty(record.timestamp));
                    rows.len() - 1
                });
                rows[slot].fill(kind, record);
            }
        }

        Self { rows }
    }

    /// Sorts rows by ascending timestamp. Equal timestamps keep their order.
    pub fn sort_by_timestamp(&mut self) {
        self.rows.sort_by_key(|row| row.timestamp);
    }

    /// Removes and returns the last row.
    pub fn drop_last(&mut self) -> Option<TrafficRow> {
        self.rows.pop()
    }

    /// Appends `newer` after `self` and drops every row whose timestamp has
    /// already been seen, so rows from `self` win on overlap.
    pub fn merge(self, newer: TrafficTable) -> TrafficTable {
        let mut seen = HashSet::with_capacity(self.rows.len() + newer.rows.len());
        let rows = self
            .rows
            .into_iter()
            .chain(newer.rows)
            .filter(|row| seen.insert(row.timestamp))
            .collect();

        TrafficTable { rows }
    }

    /// Rows whose timestamp does not appear in `other`.
    pub fn rows_not_in(&self, other: &TrafficTable) -> Vec<TrafficRow> {
        let known: HashSet<DateTime<Utc>> = other.timestamps().collect();
        self.rows
            .iter()
            .filter(|row| !known.contains(&row.timestamp))
            .copied()
            .collect()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.rows.iter().map(|row| row.timestamp)
    }

    pub fn rows(&self) -> &[TrafficRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
