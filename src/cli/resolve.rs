//! Resolve command handler.

use color_eyre::Result;

use crate::error::AppError;
use crate::services::HierarchyResolver;
use crate::FromRef;

use super::{print_json, App};

impl App {
    /// Print resolved label chains, leaf first.
    pub fn run_resolve(&self, name: Option<&str>) -> Result<()> {
        let ctx = self.context()?;
        let resolver = HierarchyResolver::from_ref(&ctx);

        match name {
            Some(name) => {
                let entity = ctx
                    .schema
                    .get(name)
                    .ok_or_else(|| AppError::EntityNotFound(name.to_string()))?;
                print_json(&resolver.resolve(&ctx.schema, entity)?)
            }
            None => {
                let resolved = resolver.resolve_all(&ctx.schema)?;
                print_json(&resolved.iter().collect::<Vec<_>>())
            }
        }
    }
}
