use proc_macro::TokenStream;
use quote::quote;



pub fn impl_slot(ast: &syn::DeriveInput) -> TokenStream {
    let name = &ast.ident;

    if let Err(error) = validate_fields(&ast.data, name) {
        return error.to_compile_error().into();
    }

    let gen = quote! {
        impl Slot for #name {
            #[inline]
            fn is_zombie(&self) -> bool {
                self.zombie
            }
        }
    };
    gen.into()
}

fn validate_fields(data: &syn::Data, name: &syn::Ident) -> syn::Result<()> {
    let syn::Data::Struct(data) = data else {
        return Err(syn::Error::new(name.span(), "Types deriving Slot should be structs."));
    };

    let has_zombie_field = match &data.fields {
        syn::Fields::Named(fields) => fields.named.iter().any(|field| {
            field.ident.as_ref().is_some_and(|ident| ident == "zombie") && is_type(&field.ty, "bool")
        }),
        _ => false
    };

    match has_zombie_field {
        true => Ok(()),
        false => Err(syn::Error::new(name.span(), "Structs deriving Slot should have a bool field named 'zombie'."))
    }
}

fn is_type(ty: &syn::Type, target: &str) -> bool {
    match ty {
        syn::Type::Path(p) => p.path.segments.len() == 1 && p.path.segments[0].ident == target,
        _ => false
    }
}
