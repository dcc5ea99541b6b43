mod resource_id;
mod slot;

use proc_macro::TokenStream;



/// Packs a single `u32` tuple field into an `index` (bits 0..=23) and a `version` (bits 24..=31).
#[proc_macro_derive(ResourceId)]
pub fn resource_id_derive(input: TokenStream) -> TokenStream {
    let ast: syn::DeriveInput = syn::parse(input).expect("ResourceId derive input should parse.");

    resource_id::impl_resource_id(&ast)
}

/// Exposes the `zombie` flag of a resource slot to the slot pool.
#[proc_macro_derive(Slot)]
pub fn slot_derive(input: TokenStream) -> TokenStream {
    let ast: syn::DeriveInput = syn::parse(input).expect("Slot derive input should parse.");

    slot::impl_slot(&ast)
}
