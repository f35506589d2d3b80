//! Context derive macros for crossbar.
//!
//! - `#[derive(Context)]` exposes every field of a root context through `FromRef`
//! - `#[derive(FromContext)]` builds a service by pulling each field from a context
//!
//! Generated code names `crate::FromRef`, so the consuming crate re-exports the
//! trait at its root.

use proc_macro::TokenStream;
use syn::punctuated::Punctuated;
use syn::token::Comma;
use syn::{Data, DeriveInput, Field, Fields};

mod context;
mod from_context;

/// Derives `FromRef<Self>` for the type of each field.
///
/// Field types must be distinct and `Clone`; two fields of the same type would
/// produce conflicting impls.
///
/// # Example
///
/// ```ignore
/// #[derive(Context, Clone)]
/// pub struct Context {
///     pub schema: Arc<Schema>,
///     pub ontology: Arc<OntologyModel>,
///     pub endpoint_aliases: AliasPolicy,
/// }
///
/// // impl FromRef<Context> for Arc<Schema>, Arc<OntologyModel>, AliasPolicy
/// ```
#[proc_macro_derive(Context)]
pub fn derive_context(input: TokenStream) -> TokenStream {
    context::expand(input)
}

/// Derives `FromRef<Context>` by resolving every field from the context.
///
/// The context type is `Context` as seen from the deriving module. Another
/// type can be named with `#[from_context(Context = "path::To")]`.
///
/// # Example
///
/// ```ignore
/// #[derive(FromContext, Clone)]
/// pub struct ValidationService {
///     schema: Arc<Schema>,          // Arc<Schema>::from_ref(ctx)
///     resolver: HierarchyResolver,  // itself derived with FromContext
///     policy: AliasPolicy,
/// }
/// ```
#[proc_macro_derive(FromContext, attributes(from_context))]
pub fn derive_from_context(input: TokenStream) -> TokenStream {
    from_context::expand(input)
}

/// Named fields of a struct, or a spanned error naming the derive.
fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &str,
) -> Result<&'a Punctuated<Field, Comma>, syn::Error> {
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(&fields.named),
            _ => Err(syn::Error::new_spanned(
                input,
                format!("{derive} needs a struct with named fields"),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            input,
            format!("{derive} can only be derived for structs"),
        )),
    }
}
