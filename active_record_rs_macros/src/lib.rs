mod model;

use proc_macro::TokenStream;

/// Derive macro for the `Model` trait.
///
/// # Usage
///
/// ```ignore
/// #[derive(Serialize, Deserialize, Model)]
/// #[model(name = "Post")]
/// struct Post {
///     pub id: Option<i64>,
///     pub label: String,
///     #[model(transient)]
///     pub preview: Option<String>,
/// }
/// ```
///
/// - `#[model(name = "...")]` sets the model type name.
///   If omitted, defaults to the struct name.
/// - `#[model(id)]` marks the identifier field.
///   If omitted, defaults to a field named `id`.
/// - `#[model(transient)]` keeps a field on the record but out of storage.
///
/// Fields appear in the field table in declaration order.
#[proc_macro_derive(Model, attributes(model))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    model::derive_model(input)
}
