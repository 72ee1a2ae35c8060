use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, ItemFn};

/// Marks an `async fn` as a test driven by `core_async::runtime`.
///
/// `#[core_async::test(start_paused)]` runs the body with the runtime clock
/// paused so long sleeps and timeouts complete without wall-clock waiting.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, MacroKind::Test)
}

#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, MacroKind::Main)
}

enum MacroKind {
    Test,
    Main,
}

#[derive(Default)]
struct MacroArgs {
    start_paused: bool,
}

fn parse_args(attr: TokenStream, kind: &MacroKind) -> Result<MacroArgs, syn::Error> {
    let mut args = MacroArgs::default();
    if attr.is_empty() {
        return Ok(args);
    }

    let tokens = TokenStream2::from(attr);
    let ident: syn::Ident = syn::parse2(tokens.clone())
        .map_err(|_| syn::Error::new_spanned(&tokens, "expected a single flag argument"))?;

    match (ident.to_string().as_str(), kind) {
        ("start_paused", MacroKind::Test) => args.start_paused = true,
        _ => {
            return Err(syn::Error::new_spanned(
                ident,
                "unsupported core_async attribute argument",
            ))
        }
    }

    Ok(args)
}

fn expand(attr: TokenStream, item: TokenStream, kind: MacroKind) -> TokenStream {
    let args = match parse_args(attr, &kind) {
        Ok(args) => args,
        Err(err) => return err.to_compile_error().into(),
    };

    let input = parse_macro_input!(item as ItemFn);

    if input.sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            input.sig.fn_token,
            "core_async attribute macros require `async fn`",
        )
        .to_compile_error()
        .into();
    }

    let mut sync_sig = input.sig.clone();
    sync_sig.asyncness = None;

    let attrs = input.attrs;
    let vis = input.vis;
    let block = input.block;

    let runner = if args.start_paused {
        quote!(core_async::runtime::block_on_paused)
    } else {
        quote!(core_async::runtime::block_on)
    };

    let test_attr = match kind {
        MacroKind::Test => quote!(#[test]),
        MacroKind::Main => TokenStream2::new(),
    };

    quote! {
        #(#attrs)*
        #test_attr
        #vis #sync_sig {
            #runner(async move #block)
        }
    }
    .into()
}
