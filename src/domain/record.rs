//! Stored records, record dates, and user profiles.

use std::fmt;

use chrono::{Days, Local};

/// A storage day key in `YYYYMMDD` form.
///
/// Digest commands carry user-typed dates; anything that is not exactly eight
/// ASCII digits is rejected up front, so unvetted text never reaches a store
/// filter formula. An invalid date behaves like a date with no stored rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDate(String);

impl RecordDate {
    /// Parse a `YYYYMMDD` string. Returns `None` for anything else.
    pub fn new(raw: &str) -> Option<Self> {
        if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(raw.to_string()))
        } else {
            None
        }
    }

    /// Today's date by the local clock.
    pub fn today() -> Self {
        Self(Local::now().date_naive().format("%Y%m%d").to_string())
    }

    /// Yesterday's date by the local clock.
    pub fn yesterday() -> Self {
        let yesterday = Local::now().date_naive() - Days::new(1);
        Self(yesterday.format("%Y%m%d").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which stored column a digest reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Note,
    Todo,
}

/// One row of a user's partition.
///
/// `note`/`todo` stay `None` when the classifier produced no section for them;
/// a present field may still hold the model's explicit no-data answer. The two
/// cases are distinct and must stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: String,
    pub record_date: String,
    pub note: Option<String>,
    pub todo: Option<String>,
}

impl UserRecord {
    pub fn new(user_id: &str, record_date: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            record_date: record_date.to_string(),
            note: None,
            todo: None,
        }
    }

    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.to_string());
        self
    }

    pub fn with_todo(mut self, todo: &str) -> Self {
        self.todo = Some(todo.to_string());
        self
    }
}

/// A user's registered mail address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: String,
    pub email: String,
}

impl UserProfile {
    pub fn new(user_id: &str, email: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            email: email.to_string(),
        }
    }
}
