use {
    darling::{
        FromDeriveInput, FromField, Result,
        ast::Data,
        util::Ignored,
    },
    proc_macro2::TokenStream,
    syn::{DeriveInput, Generics, Ident, Member, Path, Type, ext::IdentExt, parse_quote},
};

#[derive(FromField)]
#[darling(attributes(pack))]
pub(crate) struct Field {
    pub(crate) ident: Option<Ident>,
    pub(crate) ty: Type,

    /// Leave the field out of the encoding.
    ///
    /// ```ignore
    /// struct Foo {
    ///     #[pack(skip)]
    ///     cache: HashMap<u64, String>,
    /// }
    /// ```
    #[darling(default)]
    pub(crate) skip: bool,
}

impl Field {
    /// Get the identifier for a struct member.
    ///
    /// If the field has a named identifier, return it.
    /// Otherwise (tuple struct), return an anonymous identifier with the given index.
    pub(crate) fn member(&self, index: usize) -> Member {
        match &self.ident {
            Some(ident) => ident.clone().into(),
            None => index.into(),
        }
    }

    /// The field name as it appears in descriptions. Tuple fields use their index.
    pub(crate) fn name(&self, index: usize) -> String {
        match &self.ident {
            Some(ident) => ident.unraw().to_string(),
            None => index.to_string(),
        }
    }

    /// Named fields starting with `_` are placeholders and never encoded.
    pub(crate) fn is_placeholder(&self) -> bool {
        self.ident
            .as_ref()
            .is_some_and(|ident| ident.unraw().to_string().starts_with('_'))
    }

    pub(crate) fn is_encoded(&self) -> bool {
        !self.skip && !self.is_placeholder()
    }
}

#[derive(FromDeriveInput)]
#[darling(attributes(pack), supports(struct_any))]
pub(crate) struct PackArgs {
    pub(crate) ident: Ident,
    pub(crate) generics: Generics,
    pub(crate) data: Data<Ignored, Field>,

    /// Used to determine the `binpack` path.
    ///
    /// If `internal` is `true`, the generated code will use the `crate::` path.
    /// Otherwise, it will use the `binpack` path.
    #[darling(default)]
    pub(crate) internal: bool,
    /// Encode the type through its `BinaryMarshal` impl rather than field by field.
    #[darling(default)]
    pub(crate) marshal: bool,
}

/// Get the path to `binpack` based on the `internal` flag.
pub(crate) fn get_crate_name(args: &PackArgs) -> Path {
    if args.internal {
        parse_quote!(crate)
    } else {
        parse_quote!(::binpack)
    }
}

/// Reject deriving on `#[repr(packed)]` types; their fields cannot be borrowed.
pub(crate) fn ensure_not_repr_packed(input: &DeriveInput) -> Result<()> {
    for attr in &input.attrs {
        if !attr.path().is_ident("repr") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("packed") {
                return Err(meta.error(
                    "`Pack` cannot be derived for types annotated with `#[repr(packed)]` \
                     or `#[repr(packed(n))]`",
                ));
            }

            // Parse left over input for `align(n)`
            let _ = meta.input.parse::<TokenStream>();

            Ok(())
        })?;
    }
    Ok(())
}
