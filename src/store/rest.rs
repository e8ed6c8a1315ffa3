//! REST implementation of the record store.
//!
//! Endpoints (Airtable-shaped):
//!   GET/POST {api_base}/v0/{base_id}/{table}          rows
//!   PATCH    {api_base}/v0/{base_id}/{table}/{row}    one row
//!   GET/POST {api_base}/v0/meta/bases/{base_id}/tables  schema
//! Auth: Bearer token.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::domain::{RecordDate, UserProfile, UserRecord};
use crate::store::{
    RecordStore, StoreError, FIELD_NOTE, FIELD_RECORD_DATE, FIELD_TODO, FIELD_USER_ID,
    FIELD_USER_NAME, PARTITION_DESCRIPTION,
};

/// REST client for the tabular store
pub struct TableStoreClient {
    api_base: String,
    base_id: String,
    token: String,
    profile_table: String,
    client: reqwest::Client,
}

/// Body for row insertion
#[derive(Debug, Serialize)]
struct InsertRequest<'a> {
    records: [InsertRecord<'a>; 1],
}

#[derive(Debug, Serialize)]
struct InsertRecord<'a> {
    fields: NewFields<'a>,
}

/// Fields of a new partition row. Absent note/todo are omitted from the JSON.
#[derive(Debug, Serialize)]
struct NewFields<'a> {
    #[serde(rename = "用戶名稱")]
    user_name: &'a str,
    #[serde(rename = "用戶編號")]
    user_id: &'a str,
    #[serde(rename = "記錄時間")]
    record_date: &'a str,
    #[serde(rename = "待辦", skip_serializing_if = "Option::is_none")]
    todo: Option<&'a str>,
    #[serde(rename = "記事", skip_serializing_if = "Option::is_none")]
    note: Option<&'a str>,
}

/// Body for a profile insert or patch
#[derive(Debug, Serialize)]
struct ProfileFields<'a> {
    #[serde(rename = "用戶編號", skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
    #[serde(rename = "Email")]
    email: &'a str,
}

/// Body for creating a user partition
#[derive(Debug, Serialize)]
struct CreateTableRequest<'a> {
    description: &'a str,
    fields: Vec<FieldSpec>,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct FieldSpec {
    name: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Schema listing response
#[derive(Debug, Deserialize)]
struct TableList {
    #[serde(default)]
    tables: Vec<TableInfo>,
}

#[derive(Debug, Deserialize)]
struct TableInfo {
    id: String,
    name: String,
}

/// Row query response
#[derive(Debug, Deserialize)]
struct RowSet {
    #[serde(default)]
    records: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    id: String,
    #[serde(default)]
    fields: RowFields,
}

/// Stored fields; the store omits empty columns from its responses.
#[derive(Debug, Default, Deserialize)]
struct RowFields {
    #[serde(rename = "用戶編號", default)]
    user_id: Option<String>,
    #[serde(rename = "記錄時間", default)]
    record_date: Option<String>,
    #[serde(rename = "待辦", default)]
    todo: Option<String>,
    #[serde(rename = "記事", default)]
    note: Option<String>,
    #[serde(rename = "Email", default)]
    email: Option<String>,
}

/// Filter formula matching one record date.
pub(crate) fn date_formula(date: &RecordDate) -> String {
    format!("{{{}}}='{}'", FIELD_RECORD_DATE, date)
}

/// Filter formula matching one user id.
pub(crate) fn user_formula(user_id: &str) -> String {
    format!("{{{}}}='{}'", FIELD_USER_ID, user_id)
}

impl TableStoreClient {
    /// Create a new client
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            base_id: config.base_id.clone(),
            token: config.token.clone(),
            profile_table: config.profile_table.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// URL of a table's rows
    fn table_url(&self, table: &str) -> String {
        format!("{}/v0/{}/{}", self.api_base, self.base_id, table)
    }

    /// URL of the base's schema
    fn schema_url(&self) -> String {
        format!("{}/v0/meta/bases/{}/tables", self.api_base, self.base_id)
    }

    /// Decode a response, surfacing the store's `error` member when present.
    async fn decode<T: DeserializeOwned>(
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        let body: Value = response.json().await?;

        if let Some(error) = body.get("error") {
            let (kind, message) = match error {
                Value::String(kind) => (kind.clone(), String::new()),
                other => (
                    other
                        .get("type")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string(),
                    other
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                ),
            };
            warn!(operation, kind = %kind, message = %message, "store rejected request");
            return Err(StoreError::Api {
                operation,
                kind,
                message,
            });
        }

        Ok(serde_json::from_value(body)?)
    }

    async fn list_tables(&self) -> Result<Vec<TableInfo>, StoreError> {
        let response = self
            .client
            .get(self.schema_url())
            .bearer_auth(&self.token)
            .send()
            .await?;
        let list: TableList = Self::decode("list tables", response).await?;
        Ok(list.tables)
    }

    async fn create_partition(&self, user_id: &str) -> Result<(), StoreError> {
        let body = CreateTableRequest {
            description: PARTITION_DESCRIPTION,
            fields: partition_schema(),
            name: user_id,
        };
        let response = self
            .client
            .post(self.schema_url())
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        Self::decode::<Value>("create table", response).await?;
        info!(user = %user_id, "partition created");
        Ok(())
    }

    async fn query_rows(&self, table: &str, formula: &str) -> Result<RowSet, StoreError> {
        let response = self
            .client
            .get(self.table_url(table))
            .bearer_auth(&self.token)
            .query(&[("filterByFormula", formula)])
            .send()
            .await?;
        Self::decode("query table", response).await
    }
}

/// The five single-line-text columns of a user partition.
fn partition_schema() -> Vec<FieldSpec> {
    [
        FIELD_USER_NAME,
        FIELD_USER_ID,
        FIELD_RECORD_DATE,
        FIELD_TODO,
        FIELD_NOTE,
    ]
    .into_iter()
    .map(|name| FieldSpec {
        name,
        kind: "singleLineText",
    })
    .collect()
}

#[async_trait]
impl RecordStore for TableStoreClient {
    async fn ensure_partition(&self, user_id: &str) -> Result<(), StoreError> {
        let tables = self.list_tables().await?;
        if let Some(table) = tables.iter().find(|table| table.name == user_id) {
            debug!(user = %user_id, table = %table.id, "partition already exists");
            return Ok(());
        }

        // The existence check and the create are separate remote calls; two
        // concurrent first messages can both reach the create and the store
        // keeps whatever tables result.
        self.create_partition(user_id).await
    }

    async fn append(
        &self,
        user_id: &str,
        date: &RecordDate,
        note: Option<&str>,
        todo: Option<&str>,
    ) -> Result<(), StoreError> {
        let body = InsertRequest {
            records: [InsertRecord {
                fields: NewFields {
                    user_name: user_id,
                    user_id,
                    record_date: date.as_str(),
                    todo,
                    note,
                },
            }],
        };
        let response = self
            .client
            .post(self.table_url(user_id))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        Self::decode::<Value>("insert row", response).await?;
        debug!(user = %user_id, date = %date, "row appended");
        Ok(())
    }

    async fn records_for_date(
        &self,
        user_id: &str,
        date: &RecordDate,
    ) -> Result<Vec<UserRecord>, StoreError> {
        let rows = self.query_rows(user_id, &date_formula(date)).await?;

        Ok(rows
            .records
            .into_iter()
            .map(|row| UserRecord {
                user_id: row.fields.user_id.unwrap_or_else(|| user_id.to_string()),
                record_date: row
                    .fields
                    .record_date
                    .unwrap_or_else(|| date.as_str().to_string()),
                note: row.fields.note,
                todo: row.fields.todo,
            })
            .collect())
    }

    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let rows = self
            .query_rows(&self.profile_table, &user_formula(user_id))
            .await?;

        Ok(rows
            .records
            .into_iter()
            .next()
            .and_then(|row| row.fields.email)
            .map(|email| UserProfile {
                user_id: user_id.to_string(),
                email,
            }))
    }

    async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let existing = self
            .query_rows(&self.profile_table, &user_formula(&profile.user_id))
            .await?;

        match existing.records.into_iter().next() {
            Some(row) => {
                let body = serde_json::json!({
                    "fields": ProfileFields {
                        user_id: None,
                        email: &profile.email,
                    }
                });
                let url = format!("{}/{}", self.table_url(&self.profile_table), row.id);
                let response = self
                    .client
                    .patch(&url)
                    .bearer_auth(&self.token)
                    .json(&body)
                    .send()
                    .await?;
                Self::decode::<Value>("patch profile", response).await?;
            }
            None => {
                let body = serde_json::json!({
                    "records": [{
                        "fields": ProfileFields {
                            user_id: Some(&profile.user_id),
                            email: &profile.email,
                        }
                    }]
                });
                let response = self
                    .client
                    .post(self.table_url(&self.profile_table))
                    .bearer_auth(&self.token)
                    .json(&body)
                    .send()
                    .await?;
                Self::decode::<Value>("insert profile", response).await?;
            }
        }

        debug!(user = %profile.user_id, "profile upserted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> TableStoreClient {
        TableStoreClient::new(&StoreConfig {
            api_base: "https://api.airtable.com/".to_string(),
            base_id: "appBASE".to_string(),
            token: "TK".to_string(),
            profile_table: "profiles".to_string(),
        })
    }

    #[test]
    fn test_urls() {
        let client = test_client();
        assert_eq!(
            client.table_url("U_alice"),
            "https://api.airtable.com/v0/appBASE/U_alice"
        );
        assert_eq!(
            client.schema_url(),
            "https://api.airtable.com/v0/meta/bases/appBASE/tables"
        );
    }

    #[test]
    fn test_formulas() {
        let date = RecordDate::new("20230502").unwrap();
        assert_eq!(date_formula(&date), "{記錄時間}='20230502'");
        assert_eq!(user_formula("U_alice"), "{用戶編號}='U_alice'");
    }

    #[test]
    fn test_absent_fields_are_omitted_from_insert() {
        let body = InsertRequest {
            records: [InsertRecord {
                fields: NewFields {
                    user_name: "U_x",
                    user_id: "U_x",
                    record_date: "20230502",
                    todo: None,
                    note: Some("買牛奶"),
                },
            }],
        };
        let value = serde_json::to_value(&body).unwrap();
        let fields = &value["records"][0]["fields"];

        assert_eq!(fields["記事"], "買牛奶");
        assert!(fields.get("待辦").is_none());
        assert_eq!(fields["用戶名稱"], "U_x");
        assert_eq!(fields["記錄時間"], "20230502");
    }

    #[test]
    fn test_partition_schema_has_five_text_columns() {
        let fields = partition_schema();
        let names: Vec<&str> = fields.iter().map(|f| f.name).collect();

        assert_eq!(
            names,
            vec!["用戶名稱", "用戶編號", "記錄時間", "待辦", "記事"]
        );
        assert!(fields.iter().all(|f| f.kind == "singleLineText"));
    }

    #[test]
    fn test_rows_deserialize_with_missing_columns() {
        let rows: RowSet = serde_json::from_value(serde_json::json!({
            "records": [
                { "id": "rec1", "fields": { "記事": "甲", "記錄時間": "20230502" } },
                { "id": "rec2", "fields": { "待辦": "沒有資料" } }
            ]
        }))
        .unwrap();

        assert_eq!(rows.records.len(), 2);
        assert_eq!(rows.records[0].fields.note.as_deref(), Some("甲"));
        assert!(rows.records[0].fields.todo.is_none());
        assert_eq!(rows.records[1].fields.todo.as_deref(), Some("沒有資料"));
    }
}
