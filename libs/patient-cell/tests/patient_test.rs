use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use patient_cell::models::{
    CreatePatientRequest, PatientError, SearchPatientsRequest, UpdatePatientRequest,
};
use patient_cell::router::{patient_routes, PatientState};
use patient_cell::services::PatientService;
use shared_database::{DocumentStore, InMemoryStore, SupabaseClient, SupabaseStore};
use shared_models::Patient;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};
use shared_utils::{AesGcmEncryptor, Encryptor};

struct Harness {
    service: PatientService,
    store: Arc<InMemoryStore<Patient>>,
    encryptor: Arc<AesGcmEncryptor>,
}

fn harness() -> Harness {
    let config = TestConfig::default().to_app_config();
    let store = Arc::new(InMemoryStore::new(config.patient_table.clone()));
    let encryptor = Arc::new(AesGcmEncryptor::new(&config.encryption_key).unwrap());

    Harness {
        service: PatientService::new(store.clone(), encryptor.clone()),
        store,
        encryptor,
    }
}

fn patient(name: &str, phone: &str) -> CreatePatientRequest {
    CreatePatientRequest {
        name: name.to_string(),
        phone_number: phone.to_string(),
        ..Default::default()
    }
}

fn by_phone(phone: &str) -> SearchPatientsRequest {
    SearchPatientsRequest {
        phone_number: Some(phone.to_string()),
        ..Default::default()
    }
}

fn by_name(name: &str) -> SearchPatientsRequest {
    SearchPatientsRequest {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

// ==============================================================================
// SERVICE
// ==============================================================================

#[tokio::test]
async fn personal_fields_are_encrypted_at_rest() {
    let h = harness();

    let created = h
        .service
        .create_patient(CreatePatientRequest {
            ssn: Some("900101-1234567".to_string()),
            birth_year_month: Some("199001".to_string()),
            ..patient("Hong Gildong", "010-1234-5678")
        })
        .await
        .unwrap();

    assert_eq!(created.phone_number.as_deref(), Some("010-1234-5678"));
    assert_eq!(created.ssn.as_deref(), Some("900101-1234567"));
    assert_eq!(created.phone_number_hash, None);

    let stored = h.store.get_by_id(&created.id).await.unwrap().unwrap();
    let cipher = stored.phone_number.unwrap();
    assert_ne!(cipher, "010-1234-5678");
    assert_eq!(h.encryptor.decrypt(&cipher).unwrap(), "010-1234-5678");
    assert_ne!(stored.ssn.as_deref(), Some("900101-1234567"));
    assert_eq!(stored.phone_number_hash, Some(h.encryptor.hash("01012345678")));
    assert_eq!(stored.birth_year_month.as_deref(), Some("199001"));
}

#[tokio::test]
async fn create_requires_name_and_phone() {
    let h = harness();

    assert_matches!(
        h.service.create_patient(patient("", "010-1234-5678")).await,
        Err(PatientError::InvalidInput(_))
    );
    assert_matches!(
        h.service.create_patient(patient("Hong Gildong", " ")).await,
        Err(PatientError::InvalidInput(_))
    );
    assert_matches!(
        h.service.create_patient(patient("Hong Gildong", "no digits")).await,
        Err(PatientError::InvalidInput(_))
    );
    assert_matches!(
        h.service
            .create_patient(CreatePatientRequest {
                birth_year_month: Some("1990-01".to_string()),
                ..patient("Hong Gildong", "010-1234-5678")
            })
            .await,
        Err(PatientError::InvalidInput(_))
    );
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn phone_search_ignores_formatting() {
    let h = harness();
    let hong = h.service.create_patient(patient("Hong Gildong", "010-1234-5678")).await.unwrap();
    h.service.create_patient(patient("Kim Minsu", "010-9999-0000")).await.unwrap();

    let found = h.service.search_patients(by_phone("01012345678")).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, hong.id);
    assert_eq!(found[0].phone_number.as_deref(), Some("010-1234-5678"));
    assert!(h.service.search_patients(by_phone("010-0000-0000")).await.unwrap().is_empty());
}

#[tokio::test]
async fn phone_takes_precedence_over_name() {
    let h = harness();
    h.service.create_patient(patient("Hong Gildong", "010-1234-5678")).await.unwrap();

    let request = SearchPatientsRequest {
        name: Some("Hong".to_string()),
        phone_number: Some("010-5555-5555".to_string()),
    };
    assert!(h.service.search_patients(request).await.unwrap().is_empty());
}

#[tokio::test]
async fn name_search_skips_deleted_and_empty_criteria_finds_nothing() {
    let h = harness();
    h.service.create_patient(patient("Hong Gildong", "010-1234-5678")).await.unwrap();
    let gone = h.service.create_patient(patient("Hong Sora", "010-2222-3333")).await.unwrap();
    h.service.delete_patient(&gone.id).await.unwrap();

    let found = h.service.search_patients(by_name("Hong")).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Hong Gildong");

    assert!(h.service.search_patients(by_phone("010-2222-3333")).await.unwrap().is_empty());
    assert!(h.service.search_patients(SearchPatientsRequest::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn phone_update_rehashes_and_ssn_can_be_cleared() {
    let h = harness();
    let created = h
        .service
        .create_patient(CreatePatientRequest {
            ssn: Some("900101-1234567".to_string()),
            ..patient("Hong Gildong", "010-1234-5678")
        })
        .await
        .unwrap();

    let updated = h
        .service
        .update_patient(
            &created.id,
            UpdatePatientRequest {
                phone_number: Some("010-7777-8888".to_string()),
                ssn: Some(String::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.phone_number.as_deref(), Some("010-7777-8888"));
    assert_eq!(updated.ssn, None);
    assert_eq!(updated.name, "Hong Gildong");
    assert!(h.service.search_patients(by_phone("010-1234-5678")).await.unwrap().is_empty());
    assert_eq!(h.service.search_patients(by_phone("01077778888")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn deleted_patient_reads_as_missing() {
    let h = harness();
    let created = h.service.create_patient(patient("Hong Gildong", "010-1234-5678")).await.unwrap();

    h.service.delete_patient(&created.id).await.unwrap();

    assert_matches!(h.service.get_patient(&created.id).await, Err(PatientError::NotFound));
    assert_matches!(
        h.service.update_patient(&created.id, UpdatePatientRequest::default()).await,
        Err(PatientError::NotFound)
    );
    assert!(h.service.list_patients(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn undecryptable_phone_is_dropped_from_output() {
    let h = harness();
    h.store
        .put_document(json!({
            "id": "patient-foreign",
            "name": "Hong Gildong",
            "phoneNumber": "not-a-ciphertext",
            "createdAt": "2025-01-01T00:00:00+00:00",
            "updatedAt": "2025-01-01T00:00:00+00:00"
        }))
        .await
        .unwrap();

    let patient = h.service.get_patient("patient-foreign").await.unwrap();

    assert_eq!(patient.name, "Hong Gildong");
    assert_eq!(patient.phone_number, None);
}

#[tokio::test]
async fn phone_search_queries_the_hash_column() {
    let server = MockServer::start().await;
    let config = TestConfig::default().supabase(&server.uri());
    let encryptor = Arc::new(AesGcmEncryptor::new(&config.encryption_key).unwrap());
    let digest = encryptor.hash("01012345678");

    let mut row = MockSupabaseResponses::patient_row("patient-1", "Hong Gildong");
    row["phoneNumber"] = json!(encryptor.encrypt("010-1234-5678").unwrap());

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointment-patients-test"))
        .and(query_param("phoneNumberHash", format!("eq.{}", digest)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .expect(1)
        .mount(&server)
        .await;

    let store = SupabaseStore::new(Arc::new(SupabaseClient::new(&config)), config.patient_table.clone());
    let service = PatientService::new(Arc::new(store), encryptor);

    let found = service.search_patients(by_phone("010-1234-5678")).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].phone_number.as_deref(), Some("010-1234-5678"));
}

// ==============================================================================
// HTTP
// ==============================================================================

fn app() -> Router {
    patient_routes(PatientState::new(Arc::new(harness().service)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map_or_else(Body::empty, |body| Body::from(body.to_string())))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn patient_crud_over_http() {
    let app = app();

    let (status, created) = send(
        &app,
        "POST",
        "/",
        Some(json!({"name": "Hong Gildong", "phoneNumber": "010-1234-5678"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["phoneNumber"], "010-1234-5678");
    assert!(created.get("phoneNumberHash").is_none());
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = send(&app, "PUT", &format!("/{}", id), Some(json!({"notes": "allergic to penicillin"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["notes"], "allergic to penicillin");

    let (status, found) = send(&app, "POST", "/search", Some(json!({"phoneNumber": "01012345678"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["count"], 1);
    assert_eq!(found["items"][0]["id"], id.as_str());

    let (status, list) = send(&app, "GET", "/?limit=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["count"], 1);

    let (status, _) = send(&app, "DELETE", &format!("/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", &format!("/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "E_NOT_FOUND");
}

#[tokio::test]
async fn http_create_without_phone_is_400() {
    let (status, body) = send(&app(), "POST", "/", Some(json!({"name": "Hong Gildong"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "E_INVALID_INPUT");
}
