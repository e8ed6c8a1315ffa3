//! Day digests.
//!
//! A digest is one field (note or to-do) collected across every row a user
//! stored on a given date, rendered as `- ` bullets joined with CRLF. Rows
//! keep store order.

use std::sync::Arc;

use crate::domain::{Field, RecordDate, UserRecord, NO_DATA};
use crate::store::{RecordStore, StoreError};

/// Builds day digests from stored rows.
#[derive(Clone)]
pub struct DigestAggregator {
    store: Arc<dyn RecordStore>,
}

impl DigestAggregator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Digest of one field for one user and date. A date with no rows
    /// yields an empty string, not an error.
    pub async fn digest(
        &self,
        user_id: &str,
        date: &RecordDate,
        field: Field,
    ) -> Result<String, StoreError> {
        let rows = self.store.records_for_date(user_id, date).await?;
        Ok(collect_digest(&rows, field))
    }
}

/// Fold rows into bullet lines. Rows whose field is absent, or whose value
/// carries the no-data sentinel, are skipped.
pub fn collect_digest(rows: &[UserRecord], field: Field) -> String {
    let mut digest = String::new();
    for row in rows {
        let value = match field {
            Field::Note => row.note.as_deref(),
            Field::Todo => row.todo.as_deref(),
        };
        if let Some(text) = value {
            if !text.contains(NO_DATA) {
                digest.push_str("- ");
                digest.push_str(text);
                digest.push_str("\r\n");
            }
        }
    }
    digest
}
