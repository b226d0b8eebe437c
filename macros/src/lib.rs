//! Augment the development of primitives with procedural macros.

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream, Result},
    parse_macro_input, Block, Expr, ItemFn, LitStr, Pat, Token,
};

/// Run a test function with a [tracing_subscriber](https://docs.rs/tracing-subscriber) that
/// captures logs at the provided level (`DEBUG` if none is provided).
///
/// Output is routed through the test writer, so logs are only shown for failing tests (or when
/// running with `--nocapture`).
///
/// # Example
/// ```rust,ignore
/// use shardbft_macros::test_traced;
/// use tracing::{debug, info};
///
/// #[test_traced("INFO")]
/// fn test_info_level() {
///     info!("This is an info log");
///     debug!("This is a debug log (won't be shown)");
///     assert_eq!(2 + 2, 4);
/// }
/// ```
#[proc_macro_attribute]
pub fn test_traced(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    // Parse the level
    let level = if attr.is_empty() {
        "DEBUG".to_string()
    } else {
        parse_macro_input!(attr as LitStr).value()
    };
    let level = match level.to_uppercase().as_str() {
        "TRACE" => quote! { tracing::Level::TRACE },
        "DEBUG" => quote! { tracing::Level::DEBUG },
        "INFO" => quote! { tracing::Level::INFO },
        "WARN" => quote! { tracing::Level::WARN },
        "ERROR" => quote! { tracing::Level::ERROR },
        _ => {
            return syn::Error::new_spanned(
                &input.sig.ident,
                "invalid log level: expected TRACE, DEBUG, INFO, WARN, or ERROR",
            )
            .to_compile_error()
            .into();
        }
    };

    // Extract function components
    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;

    // Create output
    let expanded = quote! {
        #[test]
        #(#attrs)*
        #vis #sig {
            // Create a subscriber that writes to the test output
            let subscriber = tracing_subscriber::fmt()
                .with_test_writer()
                .with_max_level(#level)
                .with_line_number(true)
                .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
                .finish();

            // Run the test with the subscriber installed for this thread only
            let dispatcher = tracing::Dispatch::new(subscriber);
            tracing::dispatcher::with_default(&dispatcher, || #block)
        }
    };
    TokenStream::from(expanded)
}

struct SelectInput {
    branches: Vec<Branch>,
}

struct Branch {
    pattern: Pat,
    future: Expr,
    block: Block,
}

impl Parse for SelectInput {
    fn parse(input: ParseStream<'_>) -> Result<Self> {
        let mut branches = Vec::new();
        while !input.is_empty() {
            let pattern = input.parse::<Pat>()?;
            input.parse::<Token![=]>()?;
            let future = input.parse::<Expr>()?;
            input.parse::<Token![=>]>()?;
            let block = input.parse::<Block>()?;
            branches.push(Branch {
                pattern,
                future,
                block,
            });
            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }
        if branches.is_empty() {
            return Err(input.error("select! requires at least one branch"));
        }
        Ok(SelectInput { branches })
    }
}

/// Select the first future that completes (biased by order).
///
/// Each branch is written `pattern = future => { block }` (trailing commas optional). Futures
/// are fused and polled in the order they are listed, so earlier branches take priority when
/// more than one is ready.
///
/// # Example
///
/// ```rust,ignore
/// use shardbft_macros::select;
/// use futures::{channel::mpsc, StreamExt};
///
/// let (tx, mut rx) = mpsc::unbounded::<u64>();
/// select! {
///     _ = shutdown => {
///         return;
///     },
///     msg = rx.next() => {
///         println!("received: {:?}", msg);
///     },
/// };
/// ```
#[proc_macro]
pub fn select(input: TokenStream) -> TokenStream {
    let SelectInput { branches } = parse_macro_input!(input as SelectInput);

    // Fuse each future and generate its branch
    let arms = branches.into_iter().map(
        |Branch {
             pattern,
             future,
             block,
         }| {
            quote! {
                #pattern = (#future).fuse() => #block,
            }
        },
    );

    let expanded = quote! {
        {
            use ::futures::FutureExt as _;
            ::futures::select_biased! {
                #(#arms)*
            }
        }
    };
    TokenStream::from(expanded)
}
