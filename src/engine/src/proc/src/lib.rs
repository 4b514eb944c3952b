extern crate proc_macro;
use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::token::Comma;
use syn::{parse_macro_input, FnArg, Ident, ItemFn, LitStr, Pat, PatType, Path, ReturnType};

/// Options shared by both attributes. Only `crate = "path"` is supported,
/// for using the macros through a crate that re-exports `monocle`.
struct Options {
    krate: Path,
}

impl Options {
    fn parse(attr: TokenStream) -> syn::Result<Self> {
        let mut krate: Path = syn::parse_quote!(::monocle);
        let parser = syn::meta::parser(|meta| {
            if meta.path.is_ident("crate") {
                let path: LitStr = meta.value()?.parse()?;
                krate = path.parse()?;
                Ok(())
            } else {
                Err(meta.error("unsupported property, expected `crate = \"path\"`"))
            }
        });
        syn::parse::Parser::parse(parser, attr)?;

        Ok(Self { krate })
    }
}

/// Splits the inputs of `async fn f(co: Co, a: A, ..)` into the `co` parameter and the rest.
///
/// Every other parameter gets a plain name to forward it with: its own identifier,
/// or a generated one for destructuring patterns.
fn split_inputs(input: &ItemFn) -> syn::Result<(Option<PatType>, Vec<(Ident, PatType)>)> {
    let mut co = None;
    let mut rest = Vec::new();

    for (index, arg) in input.sig.inputs.iter().enumerate() {
        let FnArg::Typed(typed) = arg else {
            return Err(syn::Error::new_spanned(arg, "an oroutine cannot take `self`"));
        };

        if index == 0 {
            co = Some(typed.clone());
            continue;
        }

        let name = match typed.pat.as_ref() {
            Pat::Ident(pat) => pat.ident.clone(),
            _ => format_ident!("__oroutine_arg{}", index),
        };
        rest.push((name, typed.clone()));
    }

    Ok((co, rest))
}

fn check_async(input: &ItemFn, attribute: &str) -> syn::Result<()> {
    if input.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            input.sig.fn_token,
            format!("#[{attribute}] requires an `async fn`"),
        ));
    }
    Ok(())
}

/// Builds the inner `async fn` with the signature and body as written, and the expression
/// that awaits it and converts its return into a completion.
fn body_and_completion(input: &ItemFn, krate: &Path, forwarded: &[Ident], with_co: bool) -> (TokenStream2, TokenStream2) {
    let body_ident = Ident::new("__oroutine_body", Span::mixed_site());
    let mut body = input.clone();
    body.sig.ident = body_ident.clone();
    body.attrs.clear();
    body.vis = syn::Visibility::Inherited;

    let co_arg = with_co.then(|| quote!(co,));
    let call = quote!(#body_ident(#co_arg #(#forwarded),*).await);
    let completion = match &input.sig.output {
        ReturnType::Default => quote! {{
            #call;
            ::core::result::Result::Ok(#krate::Value::Null)
        }},
        ReturnType::Type(..) => quote!(#krate::IntoCompletion::into_completion(#call)),
    };

    (quote!(#body), completion)
}

/// Turns an `async fn` taking a [`Co`] first into a function that starts a coroutine.
///
/// ```ignore
/// #[oroutine]
/// async fn add(_co: Co, a: i64, b: i64) -> Result<i64> {
///     Ok(a + b)
/// }
///
/// // `add` is now `fn add(a: i64, b: i64) -> Unit`
/// assert_eq!(block_on(add(3, 6)), Ok(Value::from(9)));
/// ```
///
/// The function starts the body bound to the current context and returns its `Unit` right away.
/// The body may return `Result<T>` for any serializable `T`; the value becomes the completion of the unit.
/// Parameters must be owned: the body outlives the call.
#[proc_macro_attribute]
pub fn oroutine(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    match expand_oroutine(attr, input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_oroutine(attr: TokenStream, input: ItemFn) -> syn::Result<TokenStream2> {
    let Options { krate } = Options::parse(attr)?;
    check_async(&input, "oroutine")?;

    let (co, rest) = split_inputs(&input)?;
    if co.is_none() {
        return Err(syn::Error::new_spanned(
            &input.sig,
            "an oroutine takes the `Co` handle as its first parameter",
        ));
    }

    let forwarded: Vec<Ident> = rest.iter().map(|(name, _)| name.clone()).collect();
    let params: Punctuated<TokenStream2, Comma> = rest
        .iter()
        .map(|(name, typed)| {
            let ty = &typed.ty;
            quote!(#name: #ty)
        })
        .collect();

    let (body, completion) = body_and_completion(&input, &krate, &forwarded, true);
    let attrs = &input.attrs;
    let vis = &input.vis;
    let ident = &input.sig.ident;
    let generics = &input.sig.generics;
    let where_clause = &input.sig.generics.where_clause;

    Ok(quote! {
        #(#attrs)*
        #vis fn #ident #generics (#params) -> #krate::Unit #where_clause {
            #body

            #krate::run(move |co: #krate::Co| async move { #completion })
        }
    })
}

/// Turns an `async fn` into a test that runs it as a coroutine on the event loop of the test thread.
///
/// ```ignore
/// #[oroutine_test]
/// async fn test_sleep(co: Co) -> Result<()> {
///     co.wait(sleep(Duration::from_millis(10))).await?;
///     Ok(())
/// }
/// ```
///
/// The function may take the `Co` handle or nothing. The test fails with the error message
/// if the body fails, or if the event loop goes idle before the body completes.
#[proc_macro_attribute]
pub fn oroutine_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    match expand_oroutine_test(attr, input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_oroutine_test(attr: TokenStream, input: ItemFn) -> syn::Result<TokenStream2> {
    let Options { krate } = Options::parse(attr)?;
    check_async(&input, "oroutine_test")?;

    let (co, rest) = split_inputs(&input)?;
    if let Some((_, extra)) = rest.first() {
        return Err(syn::Error::new_spanned(extra, "an oroutine test takes at most the `Co` handle"));
    }

    let (body, completion) = body_and_completion(&input, &krate, &[], co.is_some());
    let attrs = &input.attrs;
    let ident = &input.sig.ident;

    Ok(quote! {
        #[test]
        #(#attrs)*
        fn #ident() {
            #body

            let unit = #krate::run(move |co: #krate::Co| async move {
                let _ = &co;
                #completion
            });
            if let ::core::result::Result::Err(err) = #krate::block_on(unit) {
                ::core::panic!("oroutine test failed: {}", err);
            }
        }
    })
}
