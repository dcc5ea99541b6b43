use proc_macro::TokenStream;
use quote::quote;



pub fn impl_resource_id(ast: &syn::DeriveInput) -> TokenStream {
    let name = &ast.ident;

    if let Err(error) = validate_fields(&ast.data, name) {
        return error.to_compile_error().into();
    }

    let gen = quote! {
        ::bitfield::bitfield_bitrange! { struct #name(u32) }

        impl ResourceId for #name {
            ::bitfield::bitfield_fields! {
                u32;
                #[inline]
                index, set_index: 23, 0;
                #[inline]
                u8, version, set_version: 31, 24;
            }

            #[inline]
            fn is_empty(&self) -> bool {
                self.version() == 0
            }
        }

        impl ::std::fmt::Display for #name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "idx: {}, ver: {}", self.index(), self.version())
            }
        }
    };
    gen.into()
}

fn validate_fields(data: &syn::Data, name: &syn::Ident) -> syn::Result<()> {
    let syn::Data::Struct(data) = data else {
        return Err(syn::Error::new(name.span(), "Types deriving ResourceId should be structs."));
    };

    match &data.fields {
        syn::Fields::Unnamed(fields) if fields.unnamed.len() == 1 && is_type(&fields.unnamed[0].ty, "u32") => Ok(()),
        _ => Err(syn::Error::new(name.span(), "Structs deriving ResourceId should have a single unnamed u32 field."))
    }
}

fn is_type(ty: &syn::Type, target: &str) -> bool {
    match ty {
        syn::Type::Path(p) => p.path.segments.len() == 1 && p.path.segments[0].ident == target,
        _ => false
    }
}
