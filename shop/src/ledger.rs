//! Sales Ledger: append-only record of completed sales.

use crate::types::{SaleId, SaleRecord};
use serde::{Deserialize, Serialize};

/// Completed-sale lines in the order they were appended
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SalesLedger {
    records: Vec<SaleRecord>,
}

impl SalesLedger {
    /// Creates an empty ledger
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Creates a ledger from previously stored records
    #[must_use]
    pub const fn from_records(records: Vec<SaleRecord>) -> Self {
        Self { records }
    }

    /// All records in append order
    #[must_use]
    pub fn records(&self) -> &[SaleRecord] {
        &self.records
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true when no sale has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Id of the most recently appended record
    ///
    /// Together with [`SalesLedger::len`] this identifies a ledger version:
    /// records are never removed or edited, and ids are unique.
    #[must_use]
    pub fn last_id(&self) -> Option<&SaleId> {
        self.records.last().map(|r| &r.id)
    }

    /// Appends a batch of records in one step
    pub(crate) fn append(&mut self, batch: Vec<SaleRecord>) {
        self.records.extend(batch);
    }
}
