use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    Data, DeriveInput, Error, Field, Fields, Ident, LitStr, Type, Visibility, ext::IdentExt,
};

///
/// FieldKind
///

enum FieldKind {
    Plain(Option<String>),
    Inline,
    Skip,
}

///
/// ModelField
///

struct ModelField<'a> {
    ident: &'a Ident,
    name: String,
    ty: &'a Type,
    public: bool,
    kind: FieldKind,
}

impl ModelField<'_> {
    const fn visible(&self) -> bool {
        self.public && !matches!(self.kind, FieldKind::Skip)
    }

    fn spec(&self) -> TokenStream {
        let name = &self.name;
        let ty = self.ty;

        if !self.visible() {
            return quote!(::burrowdb::model::FieldSpec::private(#name));
        }

        match &self.kind {
            FieldKind::Inline => quote! {
                ::burrowdb::model::FieldSpec::inline(
                    #name,
                    <#ty as ::burrowdb::traits::Schema>::FIELDS,
                )
            },
            FieldKind::Plain(Some(annotation)) => {
                quote!(::burrowdb::model::FieldSpec::new(#name, Some(#annotation)))
            }
            FieldKind::Plain(None) | FieldKind::Skip => {
                quote!(::burrowdb::model::FieldSpec::new(#name, None))
            }
        }
    }
}

// derive
pub fn derive(input: TokenStream, with_model: bool) -> TokenStream {
    expand(input, with_model).unwrap_or_else(|err| err.to_compile_error())
}

fn expand(input: TokenStream, with_model: bool) -> Result<TokenStream, Error> {
    let input: DeriveInput = syn::parse2(input)?;
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = named_fields(&input)?
        .into_iter()
        .map(parse_field)
        .collect::<Result<Vec<_>, _>>()?;

    let specs = fields.iter().map(ModelField::spec);

    let plain: Vec<_> = fields
        .iter()
        .filter(|f| f.visible() && matches!(f.kind, FieldKind::Plain(_)))
        .collect();
    let plain_names: Vec<_> = plain.iter().map(|f| &f.name).collect();
    let plain_idents: Vec<_> = plain.iter().map(|f| f.ident).collect();

    let inline_idents: Vec<_> = fields
        .iter()
        .filter(|f| f.visible() && matches!(f.kind, FieldKind::Inline))
        .map(|f| f.ident)
        .collect();

    let model_impl = if with_model {
        let name = model_name(&input)?;
        quote! {
            impl #impl_generics ::burrowdb::traits::Model for #ident #ty_generics #where_clause {
                const NAME: &'static str = #name;
            }
        }
    } else {
        quote!()
    };

    Ok(quote! {
        impl #impl_generics ::burrowdb::traits::Schema for #ident #ty_generics #where_clause {
            const FIELDS: &'static [::burrowdb::model::FieldSpec] = &[
                #(#specs),*
            ];
        }

        impl #impl_generics ::burrowdb::traits::FieldValues for #ident #ty_generics #where_clause {
            #[allow(clippy::match_single_binding)]
            fn get_value(&self, field: &str) -> Option<::burrowdb::value::Value> {
                match field {
                    #(
                        #plain_names => {
                            return Some(::burrowdb::traits::FieldValue::to_value(&self.#plain_idents));
                        }
                    )*
                    _ => {}
                }
                #(
                    if let Some(value) = ::burrowdb::traits::FieldValues::get_value(&self.#inline_idents, field) {
                        return Some(value);
                    }
                )*

                None
            }

            #[allow(clippy::match_single_binding)]
            fn set_value(&mut self, field: &str, value: &::burrowdb::value::Value) -> bool {
                match field {
                    #(
                        #plain_names => {
                            return match ::burrowdb::traits::FieldValue::from_value(value) {
                                Some(v) => {
                                    self.#plain_idents = v;
                                    true
                                }
                                None => false,
                            };
                        }
                    )*
                    _ => {}
                }
                #(
                    if ::burrowdb::traits::FieldValues::set_value(&mut self.#inline_idents, field, value) {
                        return true;
                    }
                )*

                false
            }
        }

        #model_impl
    })
}

fn named_fields(input: &DeriveInput) -> Result<Vec<&Field>, Error> {
    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(
            &input.ident,
            "burrowdb models must be structs with named fields",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(Error::new_spanned(
            &data.fields,
            "burrowdb models must be structs with named fields",
        ));
    };

    Ok(named.named.iter().collect())
}

fn parse_field(field: &Field) -> Result<ModelField<'_>, Error> {
    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| Error::new_spanned(field, "expected a named field"))?;

    let mut kind = FieldKind::Plain(None);
    let mut seen = false;

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("burrow")) {
        attr.parse_nested_meta(|meta| {
            if seen {
                return Err(meta.error("a field takes a single burrow annotation"));
            }
            seen = true;

            let word = meta
                .path
                .get_ident()
                .ok_or_else(|| meta.error("expected an annotation name"))?
                .to_string();
            kind = match word.as_str() {
                "inline" => FieldKind::Inline,
                "skip" => FieldKind::Skip,
                _ => FieldKind::Plain(Some(word.clone())),
            };

            Ok(())
        })?;
    }

    Ok(ModelField {
        ident,
        name: ident.unraw().to_string(),
        ty: &field.ty,
        public: matches!(field.vis, Visibility::Public(_)),
        kind,
    })
}

fn model_name(input: &DeriveInput) -> Result<String, Error> {
    let mut name = None;

    for attr in input.attrs.iter().filter(|a| a.path().is_ident("burrow")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                name = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("unsupported burrow attribute"))
            }
        })?;
    }

    Ok(name.unwrap_or_else(|| input.ident.unraw().to_string()))
}
