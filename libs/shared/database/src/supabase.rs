use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::Record;

use crate::store::{
    as_object, store_timestamp, DocumentStore, Filter, IndexQuery, QueryOptions, QueryResult,
    SortOrder, StoreError,
};

/// Non-success response from the PostgREST API.
#[derive(Debug)]
pub struct SupabaseApiError {
    pub status: StatusCode,
    pub body: String,
}

impl fmt::Display for SupabaseApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status.as_u16() {
            401 | 403 => write!(f, "Authentication error: {}", self.body),
            404 => write!(f, "Resource not found: {}", self.body),
            _ => write!(f, "API error ({}): {}", self.status, self.body),
        }
    }
}

impl std::error::Error for SupabaseApiError {}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_base_url(&config.supabase_url, &config.supabase_anon_key)
    }

    pub fn with_base_url(base_url: &str, anon_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    fn get_headers(&self, return_representation: bool) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.anon_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if return_representation {
            headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let return_representation = matches!(method, Method::POST | Method::PATCH);
        let headers = self.get_headers(return_representation)?;

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);
            return Err(SupabaseApiError {
                status,
                body: error_text,
            }
            .into());
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

/// PostgREST-backed document store for one table.
pub struct SupabaseStore<T: Record> {
    client: Arc<SupabaseClient>,
    table: String,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> SupabaseStore<T> {
    pub fn new(client: Arc<SupabaseClient>, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
            _record: PhantomData,
        }
    }

    fn table_path(&self, params: &[(String, String)]) -> String {
        let mut path = format!("/rest/v1/{}", urlencoding::encode(&self.table));
        if !params.is_empty() {
            let query = params
                .iter()
                .map(|(field, value)| {
                    format!("{}={}", urlencoding::encode(field), urlencoding::encode(value))
                })
                .collect::<Vec<_>>()
                .join("&");
            path.push('?');
            path.push_str(&query);
        }
        path
    }

    async fn fetch(&self, mut params: Vec<(String, String)>, options: &QueryOptions) -> Result<QueryResult<T>, StoreError> {
        let direction = match options.sort_order {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        };
        params.push(("order".to_string(), format!("createdAt.{}", direction)));

        let offset = options.offset();
        if let Some(limit) = options.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if offset > 0 {
            params.push(("offset".to_string(), offset.to_string()));
        }

        let rows: Vec<Value> = self
            .client
            .request(Method::GET, &self.table_path(&params), None)
            .await
            .map_err(backend_error)?;

        let items = decode_rows::<T>(rows)?;
        let next_token = options
            .limit
            .filter(|limit| items.len() == *limit && *limit > 0)
            .map(|limit| (offset + limit).to_string());

        Ok(QueryResult {
            count: items.len(),
            items,
            next_token,
        })
    }
}

fn backend_error(e: anyhow::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn decode_rows<T: Record>(rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(StoreError::from))
        .collect()
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Translates a filter into PostgREST horizontal filtering parameters.
pub fn filter_params(filter: &Filter) -> Vec<(String, String)> {
    filter
        .leaves()
        .into_iter()
        .filter_map(|leaf| match leaf {
            Filter::Eq(field, value) => Some((field.clone(), format!("eq.{}", literal(value)))),
            Filter::Lt(field, value) => Some((field.clone(), format!("lt.{}", literal(value)))),
            Filter::Contains(field, needle) => {
                // `*` is the PostgREST wildcard; strip it so the needle stays literal
                Some((field.clone(), format!("like.*{}*", needle.replace('*', ""))))
            }
            Filter::NotExists(field) => Some((field.clone(), "is.null".to_string())),
            Filter::And(_) => None,
        })
        .collect()
}

#[async_trait]
impl<T: Record> DocumentStore<T> for SupabaseStore<T> {
    fn table_name(&self) -> &str {
        &self.table
    }

    async fn create(&self, fields: Value) -> Result<T, StoreError> {
        let mut document = as_object(fields, "create fields")?;
        let now = store_timestamp();
        document.insert("id".to_string(), json!(format!("{}-{}", T::MODEL_TYPE, Uuid::new_v4())));
        document.insert("createdAt".to_string(), json!(now));
        document.insert("updatedAt".to_string(), json!(now));

        let rows: Vec<Value> = self
            .client
            .request(Method::POST, &self.table_path(&[]), Some(Value::Object(document)))
            .await
            .map_err(backend_error)?;

        let record = decode_rows::<T>(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend(format!("Failed to create {}", T::MODEL_TYPE)))?;

        debug!("[{}] Created: {}", T::MODEL_TYPE, record.id());
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<T>, StoreError> {
        let params = [("id".to_string(), format!("eq.{}", id))];
        let rows: Vec<Value> = self
            .client
            .request(Method::GET, &self.table_path(&params), None)
            .await
            .map_err(backend_error)?;

        Ok(decode_rows::<T>(rows)?.into_iter().next())
    }

    async fn update(&self, id: &str, patch: Value) -> Result<T, StoreError> {
        let mut patch = as_object(patch, "update patch")?;
        patch.remove("id");
        patch.remove("createdAt");
        patch.insert("updatedAt".to_string(), json!(store_timestamp()));

        let params = [("id".to_string(), format!("eq.{}", id))];
        let rows: Vec<Value> = self
            .client
            .request(Method::PATCH, &self.table_path(&params), Some(Value::Object(patch)))
            .await
            .map_err(backend_error)?;

        let record = decode_rows::<T>(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound {
                model: T::MODEL_TYPE,
                id: id.to_string(),
            })?;

        debug!("[{}] Updated: {}", T::MODEL_TYPE, id);
        Ok(record)
    }

    async fn soft_delete(&self, id: &str) -> Result<bool, StoreError> {
        let now = store_timestamp();
        let params = [("id".to_string(), format!("eq.{}", id))];
        let rows: Vec<Value> = self
            .client
            .request(
                Method::PATCH,
                &self.table_path(&params),
                Some(json!({"deletedAt": now, "updatedAt": now})),
            )
            .await
            .map_err(backend_error)?;

        Ok(!rows.is_empty())
    }

    async fn query_by_index(&self, query: IndexQuery) -> Result<QueryResult<T>, StoreError> {
        debug!("[{}] Query by index {}", T::MODEL_TYPE, query.index);
        let params = query
            .key
            .iter()
            .map(|(field, value)| (field.clone(), format!("eq.{}", literal(value))))
            .collect();
        self.fetch(params, &query.options).await
    }

    async fn scan(
        &self,
        filter: Option<Filter>,
        options: QueryOptions,
    ) -> Result<QueryResult<T>, StoreError> {
        let params = filter.as_ref().map(filter_params).unwrap_or_default();
        self.fetch(params, &options).await
    }

    async fn batch_get(&self, ids: &[String]) -> Result<Vec<T>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let quoted = ids
            .iter()
            .map(|id| format!("\"{}\"", id.replace('"', "")))
            .collect::<Vec<_>>()
            .join(",");
        let params = [("id".to_string(), format!("in.({})", quoted))];

        let rows: Vec<Value> = self
            .client
            .request(Method::GET, &self.table_path(&params), None)
            .await
            .map_err(backend_error)?;

        decode_rows(rows)
    }

    async fn check_table(&self) -> Result<bool, StoreError> {
        let params = [("limit".to_string(), "1".to_string())];
        match self
            .client
            .request::<Vec<Value>>(Method::GET, &self.table_path(&params), None)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => match e.downcast_ref::<SupabaseApiError>() {
                Some(api) if api.status == StatusCode::NOT_FOUND => {
                    debug!("[{}] Table not found: {}", T::MODEL_TYPE, self.table);
                    Ok(false)
                }
                _ => Err(backend_error(e)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_sweep_filter_to_postgrest() {
        let filter = Filter::and([
            Filter::eq("status", "CONFIRMED"),
            Filter::lt("appointmentDateTime", "2025-01-23T10:00:00+09:00"),
            Filter::not_exists("deletedAt"),
        ]);

        assert_eq!(
            filter_params(&filter),
            vec![
                ("status".to_string(), "eq.CONFIRMED".to_string()),
                ("appointmentDateTime".to_string(), "lt.2025-01-23T10:00:00+09:00".to_string()),
                ("deletedAt".to_string(), "is.null".to_string()),
            ]
        );
    }

    #[test]
    fn translates_name_search_to_like_pattern() {
        let filter = Filter::and([Filter::contains("name", "Kim*"), Filter::not_exists("deletedAt")]);

        assert_eq!(
            filter_params(&filter),
            vec![
                ("name".to_string(), "like.*Kim*".to_string()),
                ("deletedAt".to_string(), "is.null".to_string()),
            ]
        );
    }
}
