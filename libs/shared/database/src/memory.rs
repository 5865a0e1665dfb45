use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::Record;

use crate::store::{
    as_object, store_timestamp, DocumentStore, Filter, IndexQuery, QueryOptions, QueryResult,
    SortOrder, StoreError,
};

struct StoredDocument {
    seq: u64,
    document: Value,
}

/// Document store kept in process memory, one instance per table.
///
/// Backs local runs and tests; every instance is owned by whoever built it,
/// there is no shared registry.
pub struct InMemoryStore<T: Record> {
    table: String,
    documents: RwLock<HashMap<String, StoredDocument>>,
    next_seq: AtomicU64,
    writes: AtomicUsize,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> InMemoryStore<T> {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            documents: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            writes: AtomicUsize::new(0),
            _record: PhantomData,
        }
    }

    /// Number of create/update/delete operations applied so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Stores a complete document as-is, bypassing id and timestamp assignment.
    /// Does not count as a write.
    pub async fn put_document(&self, document: Value) -> Result<T, StoreError> {
        let record: T = serde_json::from_value(document.clone())?;
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.documents
            .write()
            .await
            .insert(record.id().to_string(), StoredDocument { seq, document });
        Ok(record)
    }

    fn select(
        &self,
        documents: &HashMap<String, StoredDocument>,
        predicate: impl Fn(&Value) -> bool,
        options: &QueryOptions,
    ) -> Result<QueryResult<T>, StoreError> {
        let mut matching: Vec<&StoredDocument> = documents
            .values()
            .filter(|stored| predicate(&stored.document))
            .collect();

        matching.sort_by_key(|stored| stored.seq);
        if options.sort_order == SortOrder::Desc {
            matching.reverse();
        }

        let offset = options.offset();
        let remaining = matching.len().saturating_sub(offset);
        let take = options.limit.unwrap_or(remaining).min(remaining);

        let items = matching
            .into_iter()
            .skip(offset)
            .take(take)
            .map(|stored| serde_json::from_value(stored.document.clone()))
            .collect::<Result<Vec<T>, _>>()?;

        let next_token = (take < remaining).then(|| (offset + take).to_string());

        Ok(QueryResult {
            count: items.len(),
            items,
            next_token,
        })
    }
}

#[async_trait]
impl<T: Record> DocumentStore<T> for InMemoryStore<T> {
    fn table_name(&self) -> &str {
        &self.table
    }

    async fn create(&self, fields: Value) -> Result<T, StoreError> {
        let mut document = as_object(fields, "create fields")?;
        let id = format!("{}-{}", T::MODEL_TYPE, Uuid::new_v4());
        let now = store_timestamp();

        document.insert("id".to_string(), json!(id));
        document.insert("createdAt".to_string(), json!(now));
        document.insert("updatedAt".to_string(), json!(now));

        let document = Value::Object(document);
        let record: T = serde_json::from_value(document.clone())?;

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.documents
            .write()
            .await
            .insert(id.clone(), StoredDocument { seq, document });
        self.writes.fetch_add(1, Ordering::SeqCst);

        debug!("[{}] Created: {}", T::MODEL_TYPE, id);
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<T>, StoreError> {
        let documents = self.documents.read().await;
        documents
            .get(id)
            .map(|stored| serde_json::from_value(stored.document.clone()))
            .transpose()
            .map_err(StoreError::from)
    }

    async fn update(&self, id: &str, patch: Value) -> Result<T, StoreError> {
        let patch = as_object(patch, "update patch")?;
        let mut documents = self.documents.write().await;

        let stored = documents.get_mut(id).ok_or_else(|| StoreError::NotFound {
            model: T::MODEL_TYPE,
            id: id.to_string(),
        })?;

        let mut merged = as_object(stored.document.clone(), "stored document")?;
        for (field, value) in patch {
            if field == "id" || field == "createdAt" {
                continue;
            }
            merged.insert(field, value);
        }
        merged.insert("updatedAt".to_string(), json!(store_timestamp()));

        let merged = Value::Object(merged);
        let record: T = serde_json::from_value(merged.clone())?;
        stored.document = merged;
        self.writes.fetch_add(1, Ordering::SeqCst);

        debug!("[{}] Updated: {}", T::MODEL_TYPE, id);
        Ok(record)
    }

    async fn soft_delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut documents = self.documents.write().await;
        let Some(stored) = documents.get_mut(id) else {
            return Ok(false);
        };

        let now = store_timestamp();
        if let Value::Object(fields) = &mut stored.document {
            fields.insert("deletedAt".to_string(), json!(now));
            fields.insert("updatedAt".to_string(), json!(now));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);

        debug!("[{}] Deleted: {}", T::MODEL_TYPE, id);
        Ok(true)
    }

    async fn query_by_index(&self, query: IndexQuery) -> Result<QueryResult<T>, StoreError> {
        let documents = self.documents.read().await;
        self.select(&documents, |document| query.matches(document), &query.options)
    }

    async fn scan(
        &self,
        filter: Option<Filter>,
        options: QueryOptions,
    ) -> Result<QueryResult<T>, StoreError> {
        let documents = self.documents.read().await;
        self.select(
            &documents,
            |document| filter.as_ref().map_or(true, |filter| filter.matches(document)),
            &options,
        )
    }

    async fn batch_get(&self, ids: &[String]) -> Result<Vec<T>, StoreError> {
        let documents = self.documents.read().await;
        let mut seen: HashSet<&String> = HashSet::new();

        ids.iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| documents.get(id))
            .map(|stored| serde_json::from_value(stored.document.clone()).map_err(StoreError::from))
            .collect()
    }

    async fn check_table(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
