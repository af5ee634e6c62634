//! Tests for search query construction.
//!
//! These tests verify the chainable refinement API: immutability of prior
//! query values, override/append parameter semantics, and the exact
//! parameter shapes each refinement produces. No network is involved;
//! fetching behavior is covered by the client tests.

use fhir_client::{Client, Error, SearchSet};

fn client() -> Client {
    Client::builder("https://fhir.example.com").build().unwrap()
}

fn values(set: &SearchSet, key: &str) -> Vec<String> {
    set.params().get(key).unwrap_or_default().to_vec()
}

// ============================================================================
// Immutability
// ============================================================================

#[test]
fn test_refinements_return_new_instances() {
    let base = client().resources("Patient").search([("name", "John")]);

    // Branch several queries off the same base.
    let limited = base.limit(5);
    let sorted = base.sort(&["-birthDate"]);
    let narrowed = base.search([("gender", "male")]);

    // The base never changes.
    assert_eq!(values(&base, "name"), ["John"]);
    assert!(base.params().get("_count").is_none());
    assert!(base.params().get("_sort").is_none());
    assert!(base.params().get("gender").is_none());

    // Each branch carries only its own refinement.
    assert_eq!(values(&limited, "_count"), ["5"]);
    assert!(limited.params().get("_sort").is_none());
    assert_eq!(values(&sorted, "_sort"), ["-birthDate"]);
    assert_eq!(values(&narrowed, "gender"), ["male"]);
}

#[test]
fn test_branched_queries_do_not_share_parameter_storage() {
    let base = client().resources("Patient").search([("name", "a")]);
    let branch = base.search([("name", "b")]);

    assert_eq!(values(&base, "name"), ["a"]);
    assert_eq!(values(&branch, "name"), ["a", "b"]);
}

// ============================================================================
// Parameter Shapes
// ============================================================================

#[test]
fn test_limit_and_page_compose_regardless_of_order() {
    let a = client().resources("Patient").limit(5).page(2);
    let b = client().resources("Patient").page(2).limit(5);

    for set in [a, b] {
        assert_eq!(values(&set, "_count"), ["5"]);
        assert_eq!(values(&set, "page"), ["2"]);
    }
}

#[test]
fn test_elements_always_carries_identity_fields() {
    let set = client().resources("Patient").elements(&["name", "birthDate"], false);
    assert_eq!(values(&set, "_elements"), ["name,birthDate,id,resourceType"]);
}

#[test]
fn test_elements_exclude_never_carries_identity_fields() {
    let set = client().resources("Patient").elements(&["name"], true);
    assert_eq!(values(&set, "_elements"), ["-name"]);
}

#[test]
fn test_include_key_variants() {
    let plain = client()
        .resources("Patient")
        .include("Observation", "patient", None, false);
    assert_eq!(values(&plain, "_include"), ["Observation:patient"]);

    let targeted = client()
        .resources("Patient")
        .include("Observation", "patient", Some("Patient"), false);
    assert_eq!(values(&targeted, "_include"), ["Observation:patient:Patient"]);

    let recursive = client()
        .resources("Patient")
        .include("Observation", "patient", None, true);
    assert_eq!(
        values(&recursive, "_include:recursive"),
        ["Observation:patient"]
    );
}

#[test]
fn test_has_chains_pairs_into_the_key() {
    let set = client()
        .resources("Patient")
        .has(&["Observation", "patient"], &[("code", "8867-4")])
        .unwrap();
    assert_eq!(values(&set, "_has:Observation:patient:code"), ["8867-4"]);
}

#[test]
fn test_has_with_odd_arguments_fails_without_a_request() {
    let result = client()
        .resources("Patient")
        .has(&["Observation", "patient", "AuditEvent"], &[("user", "id")]);

    assert!(matches!(result, Err(Error::Argument(_))));
}

#[test]
fn test_revinclude_always_fails() {
    let result = client()
        .resources("Patient")
        .revinclude("Observation", "patient", false);

    assert!(matches!(result, Err(Error::NotSupported("revinclude"))));
}

#[test]
fn test_sort_overrides_prior_sort() {
    let set = client()
        .resources("Patient")
        .sort(&["name"])
        .sort(&["-birthDate", "name"]);
    assert_eq!(values(&set, "_sort"), ["-birthDate,name"]);
}

#[test]
fn test_display_encodes_current_params() {
    let set = client()
        .resources("Patient")
        .search([("name", "John")])
        .limit(5)
        .page(2);
    assert_eq!(
        set.to_string(),
        "<SearchSet Patient?name=John&_count=5&page=2>"
    );
}
