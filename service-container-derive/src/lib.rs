//! Derive macros for service-container
//!
//! - `#[derive(Activatable)]` - Declare a single constructor whose parameters
//!   are the struct's `#[inject]` fields
//!
//! # Example
//!
//! ```rust,ignore
//! use service_container::{Activatable, ServiceCollection};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! #[derive(Activatable)]
//! struct UserRepository {
//!     #[inject]
//!     db: Arc<Database>,
//!     // Non-injected fields use Default
//!     query_count: u64,
//! }
//!
//! let mut services = ServiceCollection::new();
//! services
//!     .add_singleton_instance(Arc::new(Database { url: "postgres://localhost".into() }))
//!     .add_transient_type::<UserRepository>();
//!
//! let repository = services.build().get_required_service::<UserRepository>().unwrap();
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Type, parse_macro_input};

/// Widest parameter list a constructor can declare
const MAX_DEPENDENCIES: usize = 12;

/// Derive `Activatable` with one constructor.
///
/// # Attributes
///
/// - `#[inject]` - Resolve the field from the provider. The field type must be
///   `Arc<T>`; `T` may be a `dyn Trait` contract.
///
/// Fields without `#[inject]` are initialized with `Default::default()`.
/// Parameters are declared in field order.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Activatable)]
/// struct Checkout {
///     #[inject]
///     payments: Arc<dyn PaymentGateway>,
///     #[inject]
///     inventory: Arc<Inventory>,
///     attempts: u32,
/// }
/// ```
#[proc_macro_derive(Activatable, attributes(inject))]
pub fn derive_activatable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return syn::Error::new_spanned(
                    &input,
                    "Activatable can only be derived for structs with named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new_spanned(&input, "Activatable can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    let mut param_names = Vec::new();
    let mut param_types = Vec::new();
    let mut field_inits = Vec::new();

    for field in fields.iter() {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let field_type = &field.ty;

        if has_inject_attr(&field.attrs) {
            if extract_arc_inner_type(field_type).is_none() {
                return syn::Error::new_spanned(
                    field_type,
                    "Fields marked with #[inject] must have type Arc<T>",
                )
                .to_compile_error()
                .into();
            }
            param_names.push(field_name);
            param_types.push(field_type);
            field_inits.push(quote! { #field_name });
        } else {
            field_inits.push(quote! {
                #field_name: ::std::default::Default::default()
            });
        }
    }

    if param_names.len() > MAX_DEPENDENCIES {
        return syn::Error::new_spanned(
            name,
            format!("Activatable supports at most {MAX_DEPENDENCIES} #[inject] fields"),
        )
        .to_compile_error()
        .into();
    }

    let expanded = quote! {
        impl #impl_generics ::service_container::Activatable for #name #ty_generics #where_clause {
            fn constructors() -> ::std::vec::Vec<::service_container::Constructor<Self>> {
                ::std::vec![::service_container::Constructor::new(
                    |(#(#param_names,)*): (#(#param_types,)*)| Self {
                        #(#field_inits),*
                    }
                )]
            }
        }
    };

    TokenStream::from(expanded)
}

/// Find the #[inject] attribute
fn has_inject_attr(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident("inject"))
}

/// Extract T from Arc<T>
fn extract_arc_inner_type(ty: &Type) -> Option<&Type> {
    if let Type::Path(type_path) = ty {
        let segment = type_path.path.segments.last()?;
        if segment.ident == "Arc" {
            if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                    return Some(inner);
                }
            }
        }
    }
    None
}
