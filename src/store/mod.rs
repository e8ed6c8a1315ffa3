//! Remote tabular store: one table per user, rows keyed by record date.
//!
//! The store is reached through [`RecordStore`] so the core never sees
//! transport details and tests can swap in an in-memory fake. The REST
//! implementation lives in [`rest`].

pub mod rest;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{RecordDate, UserProfile, UserRecord};

// Re-export the concrete client
pub use rest::TableStoreClient;

/// Column names of a user partition.
pub const FIELD_USER_NAME: &str = "用戶名稱";
pub const FIELD_USER_ID: &str = "用戶編號";
pub const FIELD_RECORD_DATE: &str = "記錄時間";
pub const FIELD_TODO: &str = "待辦";
pub const FIELD_NOTE: &str = "記事";

/// Column holding the registered address in the profile table.
pub const FIELD_EMAIL: &str = "Email";

/// Description attached to newly created partitions.
pub const PARTITION_DESCRIPTION: &str = "記事與待辦事項";

/// Failures surfaced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never produced a decodable response
    #[error("store transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The store answered with an error body
    #[error("store rejected {operation}: {kind}: {message}")]
    Api {
        operation: &'static str,
        kind: String,
        message: String,
    },

    /// The response decoded but did not match the expected shape
    #[error("malformed store response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Typed access to the remote tabular store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create the user's partition if it does not exist yet. Idempotent by
    /// name check; see the implementation for the known provisioning race.
    async fn ensure_partition(&self, user_id: &str) -> Result<(), StoreError>;

    /// Append one classified row. Absent fields are omitted entirely, never
    /// written as empty strings.
    async fn append(
        &self,
        user_id: &str,
        date: &RecordDate,
        note: Option<&str>,
        todo: Option<&str>,
    ) -> Result<(), StoreError>;

    /// All rows of the user's partition for one day, in store order.
    async fn records_for_date(
        &self,
        user_id: &str,
        date: &RecordDate,
    ) -> Result<Vec<UserRecord>, StoreError>;

    /// The user's registered mail address, if any.
    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    /// Insert or update the user's registered mail address.
    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), StoreError>;
}
