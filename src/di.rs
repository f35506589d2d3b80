//! Compile-time wiring of services from the root [`Context`](crate::context::Context).
//!
//! `#[derive(Context)]` makes each context field extractable, and
//! `#[derive(FromContext)]` assembles a service from those fields:
//!
//! ```ignore
//! let validator = ValidationService::from_ref(&ctx);
//! ```

/// Extracts a value from a reference to `T`.
pub trait FromRef<T> {
    fn from_ref(input: &T) -> Self;
}

impl<T: Clone> FromRef<T> for T {
    fn from_ref(input: &T) -> Self {
        input.clone()
    }
}

pub use di_macros::{Context, FromContext};
