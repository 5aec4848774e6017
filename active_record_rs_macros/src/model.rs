use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr};

pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

struct FieldDef {
    name: String,
    id: bool,
    transient: bool,
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let type_name = extract_type_name(input)?;
    let fields = extract_fields(input)?;

    let id_field = match fields.iter().find(|f| f.id) {
        Some(field) => field.name.clone(),
        None if fields.iter().any(|f| f.name == "id") => "id".to_string(),
        None => {
            return Err(syn::Error::new_spanned(
                ident,
                "Model derive: no field marked with #[model(id)] and no field named `id`",
            ))
        }
    };

    let entries = fields.iter().map(|field| {
        let name = &field.name;
        if field.transient {
            quote! { ::active_record_rs::Field::transient(#name) }
        } else {
            quote! { ::active_record_rs::Field::stored(#name) }
        }
    });

    Ok(quote! {
        impl ::active_record_rs::Model for #ident {
            fn model_type() -> &'static ::active_record_rs::ModelType {
                static MODEL_TYPE: ::active_record_rs::ModelType =
                    ::active_record_rs::ModelType::new(#type_name, &[#(#entries),*])
                        .with_id_field(#id_field);
                &MODEL_TYPE
            }
        }
    })
}

fn extract_type_name(input: &DeriveInput) -> syn::Result<String> {
    for attr in &input.attrs {
        if !attr.path().is_ident("model") {
            continue;
        }

        let mut name = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                name = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported model attribute"))
            }
        })?;

        if let Some(name) = name {
            return Ok(name);
        }
    }

    Ok(input.ident.to_string())
}

fn extract_fields(input: &DeriveInput) -> syn::Result<Vec<FieldDef>> {
    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Model derive requires a struct with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Model derive requires a struct",
            ))
        }
    };

    let mut out = Vec::with_capacity(named.len());
    for field in named {
        let Some(ident) = &field.ident else {
            continue;
        };
        let mut def = FieldDef {
            name: ident.to_string().trim_start_matches("r#").to_string(),
            id: false,
            transient: false,
        };

        for attr in &field.attrs {
            if !attr.path().is_ident("model") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    def.id = true;
                    Ok(())
                } else if meta.path.is_ident("transient") {
                    def.transient = true;
                    Ok(())
                } else {
                    Err(meta.error("unsupported model field attribute"))
                }
            })?;
        }

        if def.id && def.transient {
            return Err(syn::Error::new_spanned(
                ident,
                "the identifier field cannot be transient",
            ));
        }
        out.push(def);
    }
    Ok(out)
}
