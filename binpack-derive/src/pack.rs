use {
    crate::common::{Field, PackArgs, ensure_not_repr_packed, get_crate_name},
    darling::{Error, FromDeriveInput, Result, ast::Data},
    proc_macro2::TokenStream,
    quote::quote,
    syn::{DeriveInput, Generics, Path, parse_quote},
};

/// Add the bounds a generic struct needs: `'static` on every type parameter (`Pack: Any`), and
/// `Pack` on every encoded field type.
fn bounded_generics(args: &PackArgs, crate_name: &Path, fields: &[&Field]) -> Generics {
    let mut generics = args.generics.clone();
    if args.generics.type_params().next().is_none() {
        return generics;
    }
    let ident = &args.ident;
    let (_, ty_generics, _) = args.generics.split_for_impl();
    let where_clause = generics.make_where_clause();
    for param in args.generics.type_params() {
        let param = &param.ident;
        where_clause.predicates.push(parse_quote!(#param: 'static));
    }
    if args.marshal {
        where_clause
            .predicates
            .push(parse_quote!(#ident #ty_generics: #crate_name::BinaryMarshal));
    } else {
        for field in fields.iter().filter(|field| field.is_encoded()) {
            let ty = &field.ty;
            where_clause
                .predicates
                .push(parse_quote!(#ty: #crate_name::Pack));
        }
    }
    generics
}

/// The struct kind: one description per field, skipped fields included so slots stay stable.
fn struct_kind(crate_name: &Path, fields: &[&Field]) -> TokenStream {
    let descs = fields.iter().enumerate().map(|(slot, field)| {
        let name = field.name(slot);
        if field.is_encoded() {
            let ty = &field.ty;
            quote! { #crate_name::FieldDesc::new(#name, #slot, <#ty as Pack>::type_desc) }
        } else {
            quote! { #crate_name::FieldDesc::skipped(#name, #slot) }
        }
    });
    quote! {
        Kind::Struct {
            fields: ::std::vec![#(#descs),*],
        }
    }
}

/// `StructRef` and `StructMut` bodies, dispatching on the slot of each encoded field.
fn field_access(fields: &[&Field]) -> (TokenStream, TokenStream) {
    let encoded = fields
        .iter()
        .enumerate()
        .filter(|(_, field)| field.is_encoded())
        .map(|(slot, field)| (slot, field.member(slot)))
        .collect::<Vec<_>>();
    let slots = encoded.iter().map(|(slot, _)| slot).collect::<Vec<_>>();
    let members = encoded.iter().map(|(_, member)| member).collect::<Vec<_>>();
    (
        quote! {
            match slot {
                #( #slots => ::core::option::Option::Some(&self.#members as &dyn Pack), )*
                _ => ::core::option::Option::None,
            }
        },
        quote! {
            match slot {
                #( #slots => ::core::option::Option::Some(&mut self.#members as &mut dyn Pack), )*
                _ => ::core::option::Option::None,
            }
        },
    )
}

pub(crate) fn generate(input: DeriveInput) -> Result<TokenStream> {
    ensure_not_repr_packed(&input)?;
    let args = PackArgs::from_derive_input(&input)?;
    if let Some(lifetime) = args.generics.lifetimes().next() {
        return Err(
            Error::custom("`Pack` cannot be derived for types with lifetime parameters")
                .with_span(&lifetime.lifetime),
        );
    }
    let fields = match &args.data {
        Data::Struct(fields) => fields.iter().collect::<Vec<_>>(),
        Data::Enum(_) => return Err(Error::unsupported_shape("enum")),
    };

    let crate_name = get_crate_name(&args);
    let ident = &args.ident;
    let generics = bounded_generics(&args, &crate_name, &fields);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    if args.marshal {
        return Ok(quote! {
            const _: () = {
                use #crate_name::{Kind, Pack, TypeDesc, ValueMut, ValueRef};

                #[automatically_derived]
                impl #impl_generics Pack for #ident #ty_generics #where_clause {
                    #[inline]
                    fn type_desc() -> TypeDesc {
                        TypeDesc::of::<Self>(Kind::Custom)
                    }

                    #[inline]
                    fn view(&self) -> ValueRef<'_> {
                        ValueRef::Custom(self)
                    }

                    #[inline]
                    fn view_mut(&mut self) -> ValueMut<'_> {
                        ValueMut::Custom(self)
                    }
                }
            };
        });
    }

    let kind = struct_kind(&crate_name, &fields);
    let (field_impl, field_mut_impl) = field_access(&fields);
    Ok(quote! {
        const _: () = {
            use #crate_name::{Kind, Pack, StructMut, StructRef, TypeDesc, ValueMut, ValueRef};

            #[automatically_derived]
            impl #impl_generics Pack for #ident #ty_generics #where_clause {
                fn type_desc() -> TypeDesc {
                    TypeDesc::of::<Self>(#kind)
                }

                #[inline]
                fn view(&self) -> ValueRef<'_> {
                    ValueRef::Struct(self)
                }

                #[inline]
                fn view_mut(&mut self) -> ValueMut<'_> {
                    ValueMut::Struct(self)
                }
            }

            #[automatically_derived]
            impl #impl_generics StructRef for #ident #ty_generics #where_clause {
                #[allow(clippy::match_single_binding)]
                fn field(&self, slot: usize) -> ::core::option::Option<&dyn Pack> {
                    #field_impl
                }
            }

            #[automatically_derived]
            impl #impl_generics StructMut for #ident #ty_generics #where_clause {
                #[allow(clippy::match_single_binding)]
                fn field_mut(&mut self, slot: usize) -> ::core::option::Option<&mut dyn Pack> {
                    #field_mut_impl
                }
            }
        };
    })
}
