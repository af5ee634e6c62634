//! Integration tests for the resource lifecycle and reference resolution.
//!
//! These tests verify save (create vs. update), delete-with-eviction, cache
//! registration, reference resolution from cache vs. network, and the
//! schema gate end to end.

use std::collections::{HashMap, HashSet};

use fhir_client::{Client, Entity, Error, Schema};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> Client {
    Client::builder(server.uri())
        .with_cache(true)
        .build()
        .unwrap()
}

// ============================================================================
// save
// ============================================================================

#[tokio::test]
async fn test_save_without_id_creates_and_adopts_server_identity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Patient"))
        .and(body_json(json!({
            "resourceType": "Patient",
            "name": [{"family": "Doe"}],
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "resourceType": "Patient",
            "id": "server-id",
            "meta": {"versionId": "1"},
            "name": [{"family": "Doe"}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut patient = client
        .resource("Patient", json!({"name": [{"family": "Doe"}]}))
        .unwrap();
    patient.save().await.unwrap();

    assert_eq!(patient.id(), Some("server-id"));
    assert_eq!(
        patient.get_by_path("meta.versionId").unwrap().unwrap().as_str(),
        Some("1")
    );
}

#[tokio::test]
async fn test_save_with_id_issues_a_full_replace() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/Patient/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Patient",
            "id": "1",
            "meta": {"versionId": "2"},
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut patient = client
        .resource("Patient", json!({"id": "1", "active": true}))
        .unwrap();
    patient.save().await.unwrap();

    assert_eq!(patient.id(), Some("1"));
    assert_eq!(
        patient.get_by_path("meta.versionId").unwrap().unwrap().as_str(),
        Some("2")
    );
}

#[tokio::test]
async fn test_save_registers_the_resource_in_the_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Patient"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "resourceType": "Patient",
            "id": "7",
        })))
        .mount(&server)
        .await;
    // Resolution after save must not fetch.
    Mock::given(method("GET"))
        .and(path("/Patient/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Patient",
            "id": "7",
        })))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut patient = client.resource("Patient", json!({})).unwrap();
    patient.save().await.unwrap();

    let resolved = client
        .local_reference("Patient", "7")
        .to_resource()
        .await
        .unwrap();
    assert_eq!(resolved, patient);
}

#[tokio::test]
async fn test_save_serializes_nested_resources_as_pointers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/Observation"))
        .and(body_json(json!({
            "resourceType": "Observation",
            "status": "final",
            "subject": {"reference": "Patient/1"},
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "resourceType": "Observation",
            "id": "obs-1",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let patient = client.resource("Patient", json!({"id": "1"})).unwrap();
    let mut observation = client
        .resource("Observation", json!({"status": "final"}))
        .unwrap();
    observation.set("subject", patient).unwrap();

    observation.save().await.unwrap();
    assert_eq!(observation.id(), Some("obs-1"));
}

// ============================================================================
// delete
// ============================================================================

#[tokio::test]
async fn test_delete_issues_the_request_and_evicts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Patient/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Patient",
            "id": "1",
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/Patient/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    // First fetch caches; the cached entry satisfies the next resolution.
    let patient = client.resources("Patient").get("1").await.unwrap();
    let reference = client.local_reference("Patient", "1");
    reference.to_resource().await.unwrap();

    patient.delete().await.unwrap();

    // The entry is gone, so resolution must fetch again.
    reference.to_resource().await.unwrap();
}

#[tokio::test]
async fn test_delete_evicts_even_when_the_server_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Patient/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Patient",
            "id": "1",
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/Patient/1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let patient = client.resources("Patient").get("1").await.unwrap();

    let result = patient.delete().await;
    assert!(matches!(
        result,
        Err(Error::OperationOutcome { status: 500, .. })
    ));

    // Eviction happened before the failing call.
    client
        .local_reference("Patient", "1")
        .to_resource()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_delete_without_id_fails_fast() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let unsaved = client.resource("Patient", json!({})).unwrap();

    let result = unsaved.delete().await;
    assert!(matches!(result, Err(Error::Argument(_))));
    // No request reached the server: nothing was mounted, nothing expected.
}

// ============================================================================
// Reference Resolution
// ============================================================================

#[tokio::test]
async fn test_reference_resolution_fetches_on_cache_miss_then_caches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Patient/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Patient",
            "id": "1",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let reference = client.local_reference("Patient", "1");

    let first = reference.to_resource().await.unwrap();
    let second = reference.to_resource().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_uncached_resolution_always_fetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Patient/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Patient",
            "id": "1",
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let reference = client.local_reference("Patient", "1");

    reference.to_resource().await.unwrap();
    reference.to_resource_uncached().await.unwrap();
}

#[tokio::test]
async fn test_non_local_reference_never_resolves() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let external = client.reference("https://other.example.com/fhir/Patient/1");
    let result = external.to_resource().await;

    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_materialized_references_resolve_through_the_owning_client() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Observation/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Observation",
            "id": "9",
            "subject": {"reference": "Patient/1", "display": "John Doe"},
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Patient/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceType": "Patient",
            "id": "1",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let observation = client.resources("Observation").get("9").await.unwrap();

    let subject = observation.get("subject").unwrap().unwrap();
    let subject = subject.as_reference().expect("subject should be a reference");
    assert_eq!(subject.resource_type(), Some("Patient"));

    let patient = subject.to_resource().await.unwrap();
    assert_eq!(patient.id(), Some("1"));
}

// ============================================================================
// Schema Gate
// ============================================================================

#[tokio::test]
async fn test_schema_gate_rejects_unknown_fields_end_to_end() {
    let server = MockServer::start().await;
    let schema: Schema = HashMap::from([(
        "Patient".to_string(),
        HashSet::from(["name".to_string(), "birthDate".to_string()]),
    )]);
    let client = Client::builder(server.uri()).schema(schema).build().unwrap();

    let result = client.resource("Patient", json!({"name": "X", "zzz": "Y"}));
    match result {
        Err(Error::InvalidField { key, allowed }) => {
            assert_eq!(key, "zzz");
            assert_eq!(allowed, "birthDate, extension, id, meta, name, resourceType");
        }
        other => panic!("expected an invalid-field error, got {other:?}"),
    }
}
