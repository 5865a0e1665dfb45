use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use shared_models::Record;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{model} not found: {id}")]
    NotFound { model: &'static str, id: String },

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub limit: Option<usize>,
    pub next_token: Option<String>,
    pub sort_order: SortOrder,
}

impl QueryOptions {
    pub fn limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Offset encoded in `next_token`; malformed tokens restart from the beginning.
    pub fn offset(&self) -> usize {
        self.next_token
            .as_deref()
            .and_then(|token| token.parse().ok())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
    pub count: usize,
}

impl<T> QueryResult<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_token: None,
            count: 0,
        }
    }
}

/// Equality lookup against a named secondary index.
#[derive(Debug, Clone)]
pub struct IndexQuery {
    pub index: String,
    pub key: Vec<(String, Value)>,
    pub options: QueryOptions,
}

impl IndexQuery {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            key: Vec::new(),
            options: QueryOptions::default(),
        }
    }

    pub fn key(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.key.push((field.into(), value.into()));
        self
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.key
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }
}

/// Predicate pushed down to the store on scans.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Lt(String, Value),
    /// Case-sensitive substring match on a string field.
    Contains(String, String),
    NotExists(String),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Lt(field.into(), value.into())
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Filter::Contains(field.into(), needle.into())
    }

    pub fn not_exists(field: impl Into<String>) -> Self {
        Filter::NotExists(field.into())
    }

    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And(filters.into_iter().collect())
    }

    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::Eq(field, expected) => document.get(field) == Some(expected),
            Filter::Lt(field, bound) => document
                .get(field)
                .and_then(|actual| compare_values(actual, bound))
                .is_some_and(|ordering| ordering == Ordering::Less),
            Filter::Contains(field, needle) => document
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|actual| actual.contains(needle.as_str())),
            Filter::NotExists(field) => document.get(field).map_or(true, Value::is_null),
            Filter::And(filters) => filters.iter().all(|filter| filter.matches(document)),
        }
    }

    /// Flattens nested conjunctions into leaf predicates.
    pub fn leaves(&self) -> Vec<&Filter> {
        match self {
            Filter::And(filters) => filters.iter().flat_map(Filter::leaves).collect(),
            leaf => vec![leaf],
        }
    }
}

/// Orders numbers numerically, RFC 3339 strings as instants, other strings lexically.
fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => {
            match (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
                (Ok(a), Ok(b)) => Some(a.cmp(&b)),
                _ => Some(a.cmp(b)),
            }
        }
        _ => None,
    }
}

/// Timestamp written into `createdAt`/`updatedAt`/`deletedAt`.
pub fn store_timestamp() -> String {
    Utc::now().to_rfc3339()
}

pub fn as_object(value: Value, what: &str) -> Result<Map<String, Value>, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!(
            "{} must be a JSON object, got {}",
            what, other
        ))),
    }
}

/// Generic document-store contract shared by every entity table.
#[async_trait]
pub trait DocumentStore<T: Record>: Send + Sync {
    fn table_name(&self) -> &str;

    /// Inserts `fields`, assigning `id`, `createdAt` and `updatedAt`.
    async fn create(&self, fields: Value) -> Result<T, StoreError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<T>, StoreError>;

    /// Merges `patch` onto the stored document; `id` and `createdAt` are immutable.
    async fn update(&self, id: &str, patch: Value) -> Result<T, StoreError>;

    async fn soft_delete(&self, id: &str) -> Result<bool, StoreError>;

    async fn query_by_index(&self, query: IndexQuery) -> Result<QueryResult<T>, StoreError>;

    async fn scan(
        &self,
        filter: Option<Filter>,
        options: QueryOptions,
    ) -> Result<QueryResult<T>, StoreError>;

    async fn batch_get(&self, ids: &[String]) -> Result<Vec<T>, StoreError>;

    /// Whether the backing table is reachable.
    async fn check_table(&self) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lt_compares_instants_across_offsets() {
        let doc = json!({"appointmentDateTime": "2025-01-23T10:00:00+09:00"});

        // 01:00Z is 10:00+09:00, so not strictly less
        assert!(!Filter::lt("appointmentDateTime", "2025-01-23T01:00:00Z").matches(&doc));
        assert!(Filter::lt("appointmentDateTime", "2025-01-23T01:00:01+00:00").matches(&doc));
    }

    #[test]
    fn not_exists_treats_null_as_missing() {
        assert!(Filter::not_exists("deletedAt").matches(&json!({})));
        assert!(Filter::not_exists("deletedAt").matches(&json!({"deletedAt": null})));
        assert!(!Filter::not_exists("deletedAt").matches(&json!({"deletedAt": "2025-01-01T00:00:00Z"})));
    }

    #[test]
    fn contains_matches_substrings_of_strings_only() {
        let filter = Filter::contains("name", "Gil");

        assert!(filter.matches(&json!({"name": "Hong Gildong"})));
        assert!(!filter.matches(&json!({"name": "hong gildong"})));
        assert!(!filter.matches(&json!({"name": 42})));
        assert!(!filter.matches(&json!({})));
    }

    #[test]
    fn and_requires_every_leaf() {
        let filter = Filter::and([
            Filter::eq("status", "CONFIRMED"),
            Filter::and([Filter::lt("n", 10), Filter::not_exists("deletedAt")]),
        ]);

        assert!(filter.matches(&json!({"status": "CONFIRMED", "n": 3})));
        assert!(!filter.matches(&json!({"status": "CANCELLED", "n": 3})));
        assert!(!filter.matches(&json!({"status": "CONFIRMED", "n": 30})));
        assert_eq!(filter.leaves().len(), 3);
    }

    #[test]
    fn index_query_matches_all_key_fields() {
        let query = IndexQuery::new("doctorId-appointmentDate-index")
            .key("doctorId", "D1")
            .key("appointmentDate", "2025-01-23");

        assert!(query.matches(&json!({"doctorId": "D1", "appointmentDate": "2025-01-23"})));
        assert!(!query.matches(&json!({"doctorId": "D2", "appointmentDate": "2025-01-23"})));
    }

    #[test]
    fn malformed_token_restarts_at_zero() {
        let mut options = QueryOptions::limit(10);
        options.next_token = Some("garbage".to_string());
        assert_eq!(options.offset(), 0);
        options.next_token = Some("20".to_string());
        assert_eq!(options.offset(), 20);
    }
}
