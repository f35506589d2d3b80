//! CLI module for Crossbar.
//!
//! Subcommands:
//! - `validate`: Check the schema document and report issues
//! - `show`: Print one schema entity
//! - `resolve`: Print resolved Biolink label chains
//! - `build`: Map input records and write the graph

mod build;
mod resolve;
mod show;
mod validate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::context::Context;

pub use build::BuildCommand;

/// Crossbar - schema-driven biomedical knowledge graph builder
#[derive(Parser)]
#[command(name = "crossbar")]
#[command(about = "Schema-driven biomedical knowledge graph builder")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Schema document, overriding `schema.path` from the config
    #[arg(long, global = true)]
    pub schema: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate the schema document; exits non-zero when errors are found
    Validate,

    /// Print one schema entity as JSON
    Show {
        /// Entity name, e.g. `Protein`
        name: String,
    },

    /// Print the resolved label chain of one entity, or of all entities
    Resolve {
        /// Entity name; all entities when omitted
        name: Option<String>,
    },

    /// Map input records onto the schema and write the graph
    Build(BuildCommand),
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> color_eyre::Result<()> {
        match &self.command {
            Command::Validate => self.run_validate(),
            Command::Show { name } => self.run_show(name),
            Command::Resolve { name } => self.run_resolve(name.as_deref()),
            Command::Build(cmd) => cmd.run(self.context()?).await,
        }
    }

    /// Loads configuration, then the schema and ontology it names.
    fn context(&self) -> color_eyre::Result<Context> {
        let config = Config::load()?;
        let ctx = Context::load(config, self.schema.clone())?;
        tracing::info!(
            "Loaded {} schema entities from {}",
            ctx.schema.len(),
            ctx.config.schema.path.display()
        );
        Ok(ctx)
    }
}

/// Prints a value as pretty JSON on stdout.
fn print_json<T: serde::Serialize>(value: &T) -> color_eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
