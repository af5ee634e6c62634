//! # FHIR Client SDK
//!
//! A Rust client SDK for FHIR-style REST APIs: typed key/value resource
//! documents identified by `(resourceType, id)`, retrievable, searchable and
//! mutable through a JSON-over-HTTP API that returns paginated Bundle
//! envelopes.
//!
//! ## Overview
//!
//! This SDK provides:
//! - A [`Client`] façade owning the connection settings and resource cache,
//!   built via [`ClientBuilder`]
//! - An immutable, chainable [`SearchSet`] query builder with lazy fetches
//! - A [`Resource`]/[`Reference`] object model with schema-validated field
//!   access and recursive (de)serialization between nested resource graphs
//!   and flat reference pointers
//! - A per-client resource cache that resolves references without
//!   re-fetching
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fhir_client::{Client, Entity};
//!
//! let client = Client::builder("https://fhir.example.com")
//!     .authorization("Bearer token")
//!     .with_cache(true)
//!     .build()?;
//!
//! // Search with chainable refinements; nothing is fetched until a
//! // terminal operation runs.
//! let patients = client
//!     .resources("Patient")
//!     .search([("name", "John")])
//!     .sort(&["-birthDate"])
//!     .limit(10)
//!     .fetch()
//!     .await?;
//!
//! // Create and persist a resource.
//! let mut patient = client.resource(
//!     "Patient",
//!     serde_json::json!({"name": [{"family": "Doe", "given": ["John"]}]}),
//! )?;
//! patient.save().await?;
//!
//! // Nested reference-shaped documents become live references.
//! let observation = client
//!     .resources("Observation")
//!     .first()
//!     .await?
//!     .expect("no observations");
//! if let Some(subject) = observation.get("subject")?.and_then(|v| v.as_reference()) {
//!     let linked = subject.to_resource().await?; // cache hit: no round trip
//!     println!("subject: {linked}");
//! }
//! ```
//!
//! ## Schema Validation
//!
//! Attaching a [`Schema`] to the client turns on strict top-level field
//! validation for every entity it creates: any key outside the permitted set
//! (the schema's fields plus the always-present `resourceType`, `id`, `meta`
//! and `extension`) fails with [`Error::InvalidField`]. Without a schema,
//! any key is accepted.
//!
//! ## Design Principles
//!
//! - **No global state**: configuration is instance-based; the client is a
//!   cheap-clone handle entities reference but never own
//! - **Immutable queries**: every [`SearchSet`] refinement returns a new
//!   instance, so branching from a shared base query is always safe
//! - **Errors surface unrecovered**: no retries, no silent degradation;
//!   every failure carries the context needed to diagnose it
//! - **Thread-safe**: all public types are `Send + Sync`
//! - **Async-first**: designed for use with the Tokio async runtime

pub mod client;
pub mod error;
pub mod model;
pub mod search;

// Re-export public types at crate root for convenience
pub use client::{Client, ClientBuilder, Schema};
pub use error::{Error, Result};
pub use model::{Entity, Map, Reference, Resource, Value};
pub use search::{SearchParams, SearchSet};
