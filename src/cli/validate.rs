//! Validate command handler.

use color_eyre::Result;

use crate::services::{fail_on_errors, ValidationService};
use crate::FromRef;

use super::{print_json, App};

impl App {
    /// Run schema validation and print the issues.
    ///
    /// # Errors
    ///
    /// Fails with `AppError::Validation` after printing when any issue has
    /// error severity; warnings alone pass.
    pub fn run_validate(&self) -> Result<()> {
        let ctx = self.context()?;
        let issues = ValidationService::from_ref(&ctx).validate();
        print_json(&issues)?;
        fail_on_errors(&issues)?;
        tracing::info!("Schema is valid");
        Ok(())
    }
}
