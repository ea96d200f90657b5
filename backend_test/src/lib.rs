use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Run an asynchronous test against a fresh server backed by an in-memory
/// store, injecting dependencies by parameter type.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// `MemoryStore` (the store behind the client), `FakeGateway` (the payment
/// gateway behind the client) and [`rocket::http::Header`] (a bearer token
/// for the signed-in user).
///
/// An optional argument of `member`, `pro_user`, `surveyor` or `admin` creates
/// a user with that role, `<role>@example.com`, before the test runs.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);
    let role = parse_macro_input!(args as Option<Ident>);

    // Extract type information and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone(), role.is_some()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Sign in as the requested role, if any.
    let maybe_login = match role {
        Some(role) => match login(&role) {
            Ok(login) => login,
            Err(err) => return err.into_compile_error().into(),
        },
        None => TokenStream2::new(),
    };

    // Rewrite the test function.
    quote! {
        #[rocket::async_test]
        #[allow(unused_variables)]
        async fn #name() {
            /// The test itself.
            #item_fn

            let store = crate::store::memory::MemoryStore::new();
            let gateway = crate::payment::fake::FakeGateway::default();
            let config = crate::Config::example();
            let rocket_client = rocket::local::asynchronous::Client::tracked(crate::rocket_for(
                config.clone(),
                crate::store::Storage::new(store.clone()),
                crate::payment::Payments::new(gateway.clone()),
            ))
            .await
            .unwrap();

            #maybe_login

            #new_name(#(#test_args),*).await;
        }
    }
    .into()
}

/// Setup code inserting a user with the given role and minting its token.
fn login(role: &Ident) -> Result<TokenStream2, syn::Error> {
    let variant = match role.to_string().as_str() {
        "member" => quote! { User },
        "pro_user" => quote! { ProUser },
        "surveyor" => quote! { Surveyor },
        "admin" => quote! { Admin },
        _ => {
            return Err(syn::Error::new(
                role.span(),
                "Expected one of `member`, `pro_user`, `surveyor` or `admin`",
            ))
        }
    };
    let email = format!("{role}@example.com");
    Ok(quote! {
        crate::store::Store::insert_user(
            &store,
            &crate::model::db::user::NewUser::example(
                #email,
                crate::model::common::role::Role::#variant,
            ),
        )
        .await
        .unwrap();
        let auth_header = crate::model::api::auth::bearer_header(#email, &config).unwrap();
    })
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature, signed_in: bool) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                // Valid as the last path segment for any type is itself
                let type_ident = &type_path.path.segments.last().unwrap().ident;
                if type_ident == "Client" {
                    if has_client {
                        return Err(syn::Error::new(
                            input.span(),
                            "Test cannot accept more than one `rocket::local::asynchronous::Client`",
                        ));
                    }
                    has_client = true;
                    args.push(quote! { rocket_client });
                    continue;
                } else if type_ident == "MemoryStore" {
                    args.push(quote! { store.clone() });
                    continue;
                } else if type_ident == "FakeGateway" {
                    args.push(quote! { gateway.clone() });
                    continue;
                } else if type_ident == "Header" {
                    if !signed_in {
                        return Err(syn::Error::new(
                            input.span(),
                            "A `Header` needs a role, e.g. `#[backend_test(member)]`",
                        ));
                    }
                    args.push(quote! { auth_header.clone() });
                    continue;
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client: Client`, `store: MemoryStore`, `gateway: FakeGateway` or `auth: Header`",
        ));
    }

    Ok(args)
}
