//! Application error types.

use thiserror::Error;

/// Application-level errors for Crossbar.
#[derive(Error, Debug)]
pub enum AppError {
    // Schema errors
    #[error("Failed to parse schema: {0}")]
    SchemaParse(#[from] serde_yaml::Error),

    #[error("Duplicate entity name: {0}")]
    DuplicateEntity(String),

    #[error("Invalid entry {entity}: {message}")]
    InvalidEntry { entity: String, message: String },

    #[error("Invalid represented_as '{value}' for {entity}: expected 'node' or 'edge'")]
    InvalidRepresentation { entity: String, value: String },

    #[error("Missing required field '{field}' for {entity}")]
    MissingField { entity: String, field: String },

    #[error("Entity not found in schema: {0}")]
    EntityNotFound(String),

    #[error("Unresolved {side} type '{name}' on edge {edge}")]
    UnresolvedEndpoint {
        edge: String,
        side: String,
        name: String,
    },

    // Ontology errors
    #[error("Unknown ontology class: {0}")]
    UnknownOntologyClass(String),

    #[error("Cycle in ontology hierarchy at: {0}")]
    OntologyCycle(String),

    #[error("Schema validation failed with {0} error(s)")]
    Validation(usize),

    // Input/output errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid record at line {line}: {message}")]
    Record { line: usize, message: String },

    // Neo4j errors
    #[error("Neo4j error: {0}")]
    Neo4j(#[from] neo4rs::Error),

    #[error("Cypher statement failed: {message}")]
    Query { message: String, cypher: String },

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}
