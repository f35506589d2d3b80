//! Crossbar - schema-driven biomedical knowledge graph builder
//!
//! Maps raw biomedical records onto node and edge types declared in a schema
//! document, resolves their Biolink ancestry, and writes the resulting graph
//! to Neo4j.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod context;
pub mod di;
pub mod error;
pub mod graph;
pub mod models;
pub mod repositories;
pub mod services;

// Generated `FromRef` impls name the trait at the crate root
pub use di::FromRef;
