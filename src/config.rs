//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/crossbar/config.toml` (XDG) or platform config dir
//! 2. Project config: `.crossbar.toml`
//! 3. Environment variables: `CROSSBAR_*` (nested keys separated by `__`)
//!
//! Every key has a default, so the tool runs without any configuration file.
//!
//! # Example
//!
//! **Project config** (`.crossbar.toml`):
//! ```toml
//! [schema]
//! path = "config/schema_config.yaml"
//! ontology = "biolink-model.yaml"
//! endpoint_aliases = "deny"
//!
//! [output]
//! dir = "crossbar-out"
//! delimiter = "\t"
//! array_delimiter = "|"
//! quote_char = "'"
//!
//! [neo4j]
//! uri = "bolt://localhost:7687"
//! user = "neo4j"
//! password = "secret"
//! ```
//!
//! `CROSSBAR_NEO4J__PASSWORD=secret` overrides `neo4j.password`.

use std::ops::Deref;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schema: SchemaConfig,
    pub output: OutputConfig,
    pub neo4j: Neo4jConfig,
    pub go: GoConfig,
}

/// How an edge endpoint that only matches a node's `label_in_input` is treated.
///
/// Such a name is not a declared node type, so accepting it means reading the
/// alias as the type it labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasPolicy {
    /// Reject the endpoint.
    Deny,
    /// Accept the endpoint and report a warning.
    #[default]
    Warn,
    /// Accept the endpoint silently.
    Allow,
}

/// Schema and ontology settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Path to the schema mapping document.
    pub path: PathBuf,
    /// Optional Biolink model YAML. The embedded subset is used when unset.
    pub ontology: Option<PathBuf>,
    /// Fail when a leaf type cannot be found in the ontology.
    pub strict_ontology: bool,
    /// Add Biolink mixins to the emitted label set.
    pub include_mixins: bool,
    /// Treatment of edge endpoints that name an input label alias.
    pub endpoint_aliases: AliasPolicy,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("config/schema_config.yaml"),
            ontology: None,
            strict_ontology: false,
            include_mixins: false,
            endpoint_aliases: AliasPolicy::default(),
        }
    }
}

/// Offline (`neo4j-admin import`) output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Base directory; each build writes into a timestamped subdirectory.
    pub dir: PathBuf,
    pub delimiter: char,
    pub array_delimiter: char,
    pub quote_char: char,
    /// Target database name for the import call.
    pub database: String,
    /// Path of the `neo4j-admin` executable used in the import call.
    pub import_binary: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("crossbar-out"),
            delimiter: '\t',
            array_delimiter: '|',
            quote_char: '\'',
            database: "neo4j".to_string(),
            import_binary: "bin/neo4j-admin".to_string(),
        }
    }
}

impl OutputConfig {
    /// Returns `(delimiter, array_delimiter, quote)` as single bytes.
    ///
    /// The CSV writer works on bytes, so each character must be ASCII.
    pub fn ascii_delimiters(&self) -> Result<(u8, u8, u8), AppError> {
        let byte = |name: &str, c: char| {
            if c.is_ascii() {
                Ok(c as u8)
            } else {
                Err(AppError::InvalidConfig(format!(
                    "output.{} must be a single ASCII character, got {:?}",
                    name, c
                )))
            }
        };
        Ok((
            byte("delimiter", self.delimiter)?,
            byte("array_delimiter", self.array_delimiter)?,
            byte("quote_char", self.quote_char)?,
        ))
    }
}

/// Online Neo4j settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    pub password: Option<String>,
    /// Delete all nodes and relationships before writing.
    pub wipe: bool,
    /// Rows per `UNWIND` statement.
    pub batch_size: usize,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: None,
            wipe: false,
            batch_size: 1000,
        }
    }
}

/// Gene Ontology adapter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoConfig {
    /// Evidence codes whose protein annotations are dropped.
    pub removed_evidence: Vec<String>,
}

impl Default for GoConfig {
    fn default() -> Self {
        Self {
            // electronic annotations
            removed_evidence: vec!["IEA".to_string()],
        }
    }
}

impl Config {
    /// Load config with layered resolution (defaults → user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// The layered provider chain used by [`Config::load`].
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            // Layer 1: User config (lowest priority)
            .merge(Toml::file(Self::user_config_path()))
            // Layer 2: Project config
            .merge(Toml::file(".crossbar.toml"))
            // Layer 3: Environment variables (highest priority)
            .merge(Env::prefixed("CROSSBAR_").split("__"))
    }

    /// User config path: ~/.config/crossbar/config.toml (XDG) or platform config dir.
    fn user_config_path() -> PathBuf {
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("crossbar").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        dirs::config_dir()
            .map(|p| p.join("crossbar").join("config.toml"))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_admin_import_conventions() {
        let config = Config::default();
        assert_eq!(config.output.delimiter, '\t');
        assert_eq!(config.output.array_delimiter, '|');
        assert_eq!(config.output.quote_char, '\'');
        assert_eq!(config.output.database, "neo4j");
        assert_eq!(config.schema.endpoint_aliases, AliasPolicy::Warn);
        assert_eq!(config.go.removed_evidence, ["IEA"]);
    }

    #[test]
    fn test_toml_layer_overrides_defaults() {
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                [schema]
                path = "other.yaml"
                endpoint_aliases = "deny"

                [neo4j]
                batch_size = 50

                [go]
                removed_evidence = ["IEA", "ND"]
                "#,
            ))
            .extract()
            .unwrap();

        assert_eq!(config.schema.path, PathBuf::from("other.yaml"));
        assert_eq!(config.schema.endpoint_aliases, AliasPolicy::Deny);
        assert_eq!(config.neo4j.batch_size, 50);
        assert_eq!(config.go.removed_evidence, ["IEA", "ND"]);
        // untouched keys keep their defaults
        assert_eq!(config.neo4j.user, "neo4j");
    }

    #[test]
    fn test_ascii_delimiters_rejects_multibyte() {
        let output = OutputConfig {
            delimiter: '¦',
            ..OutputConfig::default()
        };
        assert!(output.ascii_delimiters().is_err());

        let (d, a, q) = OutputConfig::default().ascii_delimiters().unwrap();
        assert_eq!((d, a, q), (b'\t', b'|', b'\''));
    }
}
