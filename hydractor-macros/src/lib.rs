//! Attribute macro that turns a plain `impl` block into a registry-ready
//! [`Behavior`](https://docs.rs/hydractor/latest/hydractor/behavior/trait.Behavior.html).
//!
//! Mirrors the dispatch-table codegen the framework family already uses for
//! typed message enums (match over a discriminant, one arm per listed
//! variant), except the discriminant here is the wire `topic` string rather
//! than a generated enum, since behaviors route on topic names rather than
//! on Rust types.
extern crate proc_macro;

use quote::quote;
use syn::parse::{Parse, ParseStream, Result};
use syn::punctuated::Punctuated;
use syn::token::Comma;
use syn::{Ident, ItemImpl, Type};

struct Topics {
    names: Vec<Ident>,
}

impl Parse for Topics {
    fn parse(input: ParseStream) -> Result<Self> {
        let idents = Punctuated::<Ident, Comma>::parse_terminated(input)?;
        Ok(Topics {
            names: idents.into_iter().collect(),
        })
    }
}

/// `#[behavior(topic1, topic2, ...)]` applied to `impl SomeStruct { ... }`.
///
/// For every listed topic, the struct must define an inherent async method
/// of the same name taking `(&mut self, payload: serde_json::Value, ctx:
/// &hydractor::behavior::ActorContext) -> Result<serde_json::Value,
/// hydractor::error::ActorError>`. The macro leaves those methods in place
/// and appends a `Behavior` impl that dispatches `handle(topic, ...)` to
/// them by name, plus a `type_name()` override so config-key lookup and the
/// forked-worker factory registry agree on the same string.
#[proc_macro_attribute]
pub fn behavior(
    attr: proc_macro::TokenStream,
    input: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let topics = syn::parse_macro_input!(attr as Topics);
    let item = syn::parse_macro_input!(input as ItemImpl);

    let self_ty = item.self_ty.clone();
    let struct_name = match struct_ident(&self_ty) {
        Some(ident) => ident,
        None => {
            return syn::Error::new_spanned(self_ty, "#[behavior] requires a named impl target")
                .to_compile_error()
                .into()
        }
    };

    let type_name = decapitalize(&struct_name.to_string());

    let arms = topics.names.iter().map(|topic| {
        let method = topic;
        let literal = topic.to_string();
        quote! {
            #literal => self.#method(payload, ctx).await,
        }
    });

    let expanded = quote! {
        #item

        #[async_trait::async_trait]
        impl hydractor::behavior::Behavior for #self_ty {
            fn type_name(&self) -> &'static str {
                #type_name
            }

            async fn handle(
                &mut self,
                topic: &str,
                payload: serde_json::Value,
                ctx: &hydractor::behavior::ActorContext,
            ) -> Result<serde_json::Value, hydractor::error::ActorError> {
                match topic {
                    #(#arms)*
                    other => Err(hydractor::error::ActorError::Handler(format!(
                        "{} has no handler for topic '{}'",
                        #type_name, other
                    ))),
                }
            }
        }
    };

    expanded.into()
}

fn struct_ident(ty: &Type) -> Option<Ident> {
    match ty {
        Type::Path(path) => path.path.segments.last().map(|seg| seg.ident.clone()),
        _ => None,
    }
}

fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
