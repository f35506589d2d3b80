//! Application context shared by the CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{AliasPolicy, Config};
use crate::di::Context as ContextDerive;
use crate::error::AppError;
use crate::models::{OntologyModel, Schema};
use crate::repositories::{load_ontology, load_schema};
use crate::services::ResolveOptions;

/// Root application context.
///
/// Each field type is extractable with `FromRef`, so services deriving
/// `FromContext` are assembled from it directly:
///
/// ```ignore
/// let resolver = HierarchyResolver::from_ref(&ctx);
/// let validator = ValidationService::from_ref(&ctx);
/// ```
#[derive(ContextDerive, Clone)]
pub struct Context {
    pub config: Arc<Config>,
    pub schema: Arc<Schema>,
    pub ontology: Arc<OntologyModel>,
    pub resolve_options: ResolveOptions,
    pub endpoint_aliases: AliasPolicy,
}

impl Context {
    /// Creates a new context; resolution switches are read from `config.schema`.
    pub fn new(config: Config, schema: Schema, ontology: Arc<OntologyModel>) -> Self {
        Self {
            resolve_options: ResolveOptions::from(&config.schema),
            endpoint_aliases: config.schema.endpoint_aliases,
            config: Arc::new(config),
            schema: Arc::new(schema),
            ontology,
        }
    }

    /// Loads the schema and ontology named by `config`.
    ///
    /// # Arguments
    ///
    /// * `config` - loaded configuration
    /// * `schema_path` - overrides `schema.path` when given
    ///
    /// # Errors
    ///
    /// Fails when the schema document or the ontology cannot be read or parsed.
    pub fn load(mut config: Config, schema_path: Option<PathBuf>) -> Result<Self, AppError> {
        if let Some(path) = schema_path {
            config.schema.path = path;
        }
        let schema = load_schema(&config.schema.path)?;
        let ontology = load_ontology(config.schema.ontology.as_deref())?;
        Ok(Self::new(config, schema, ontology))
    }
}
