//! Derive macros for BurrowDB record types.

use proc_macro::TokenStream;

mod model;

/// Derive `Schema`, `FieldValues`, and `Model`.
///
/// Field attributes: `#[burrow(id)]`, `#[burrow(unique)]`,
/// `#[burrow(index)]`, `#[burrow(inline)]`, and `#[burrow(skip)]`.
/// The bucket name defaults to the struct name and can be set with
/// `#[burrow(name = "...")]` on the struct.
#[proc_macro_derive(Model, attributes(burrow))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    model::derive(input.into(), true).into()
}

/// Derive `Schema` and `FieldValues` for a struct embedded with
/// `#[burrow(inline)]`.
#[proc_macro_derive(Schema, attributes(burrow))]
pub fn derive_schema(input: TokenStream) -> TokenStream {
    model::derive(input.into(), false).into()
}
