//! Show command handler.

use color_eyre::Result;

use crate::error::AppError;

use super::{print_json, App};

impl App {
    pub fn run_show(&self, name: &str) -> Result<()> {
        let ctx = self.context()?;
        let entity = ctx
            .schema
            .get(name)
            .ok_or_else(|| AppError::EntityNotFound(name.to_string()))?;
        print_json(entity)
    }
}
