//! Derive macro for `binpack`'s `Pack` trait.
//!
//! Refer to the [`binpack`](https://docs.rs/binpack) crate for examples.
use {
    proc_macro::TokenStream,
    syn::{DeriveInput, parse_macro_input},
};

mod common;
mod pack;

/// Implement `Pack` for a struct.
///
/// Every field is encoded in declaration order unless it is marked `#[pack(skip)]` or its name
/// starts with `_`. With `#[pack(marshal)]` on the struct, the type is encoded through its
/// `BinaryMarshal` impl instead.
#[proc_macro_derive(Pack, attributes(pack))]
pub fn derive_pack(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match pack::generate(input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.write_errors().into(),
    }
}
