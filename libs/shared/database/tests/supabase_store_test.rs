use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_database::{
    DocumentStore, Filter, IndexQuery, QueryOptions, StoreError, SupabaseClient, SupabaseStore,
};
use shared_models::{Doctor, Record};

const TABLE: &str = "appointment-doctors-test";
const TABLE_PATH: &str = "/rest/v1/appointment-doctors-test";

fn doctor_row(id: &str, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "createdAt": "2025-01-22T09:00:00+09:00",
        "updatedAt": "2025-01-22T09:00:00+09:00"
    })
}

fn store_for(server: &MockServer) -> SupabaseStore<Doctor> {
    let client = Arc::new(SupabaseClient::with_base_url(&server.uri(), "test-anon-key"));
    SupabaseStore::new(client, TABLE)
}

#[tokio::test]
async fn create_posts_document_and_returns_representation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(header("apikey", "test-anon-key"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({"name": "Dr. Kim"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            doctor_row("doctor-1", "Dr. Kim")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let doctor = store_for(&mock_server)
        .create(json!({"name": "Dr. Kim"}))
        .await
        .unwrap();

    assert_eq!(doctor.id, "doctor-1");
    assert_eq!(doctor.name, "Dr. Kim");
}

#[tokio::test]
async fn get_by_id_returns_none_for_empty_result() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.doctor-missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let found = store_for(&mock_server).get_by_id("doctor-missing").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn update_of_missing_row_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.doctor-missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = store_for(&mock_server)
        .update("doctor-missing", json!({"name": "Dr. Lee"}))
        .await;

    assert_matches!(result, Err(StoreError::NotFound { model: "doctor", .. }));
}

#[tokio::test]
async fn query_by_index_sends_equality_filters_and_paginates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("specialization", "eq.Acupuncture"))
        .and(query_param("limit", "2"))
        .and(query_param("order", "createdAt.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            doctor_row("doctor-1", "Dr. Kim"),
            doctor_row("doctor-2", "Dr. Lee")
        ])))
        .mount(&mock_server)
        .await;

    let result = store_for(&mock_server)
        .query_by_index(
            IndexQuery::new("specialization-index")
                .key("specialization", "Acupuncture")
                .with_options(QueryOptions::limit(2)),
        )
        .await
        .unwrap();

    assert_eq!(result.count, 2);
    assert_eq!(result.next_token.as_deref(), Some("2"));
}

#[tokio::test]
async fn scan_pushes_filter_down() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("isActive", "eq.true"))
        .and(query_param("deletedAt", "is.null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            doctor_row("doctor-1", "Dr. Kim")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let filter = Filter::and([Filter::eq("isActive", true), Filter::not_exists("deletedAt")]);
    let result = store_for(&mock_server)
        .scan(Some(filter), QueryOptions::default())
        .await
        .unwrap();

    assert_eq!(result.items[0].id(), "doctor-1");
    assert!(result.next_token.is_none());
}

#[tokio::test]
async fn batch_get_uses_in_filter() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "in.(\"doctor-1\",\"doctor-2\")"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            doctor_row("doctor-1", "Dr. Kim")
        ])))
        .mount(&mock_server)
        .await;

    let doctors = store_for(&mock_server)
        .batch_get(&["doctor-1".to_string(), "doctor-2".to_string()])
        .await
        .unwrap();

    assert_eq!(doctors.len(), 1);
}

#[tokio::test]
async fn check_table_distinguishes_missing_table_from_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_string("relation does not exist"))
        .mount(&mock_server)
        .await;

    assert!(!store_for(&mock_server).check_table().await.unwrap());

    let failing = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&failing)
        .await;

    assert_matches!(store_for(&failing).check_table().await, Err(StoreError::Backend(_)));
}
