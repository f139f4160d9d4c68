//! Procedural macros for the localrpc framework.
//!
//! This crate provides the `#[local_service]` attribute macro that generates
//! proxies, invokers and interface descriptors from service trait
//! definitions.
//!
//! # Example
//!
//! ```ignore
//! use localrpc::local_service;
//! use std::sync::Arc;
//!
//! #[local_service]
//! pub trait UserService: Send + Sync {
//!     fn count(&self, group: String) -> Result<u64, UserError>;
//!
//!     // The session handle is moved to the implementation without copying.
//!     fn attach(&self, #[bypass] handle: Arc<SessionHandle>) -> Result<(), UserError>;
//! }
//! ```
//!
//! This will generate:
//! - A `USER_SERVICE_INTERFACE` descriptor constant
//! - A `UserServiceProxy` struct implementing `UserService` by dispatching calls
//! - A `UserServiceInvoker` struct that executes calls against an implementation
//! - `impl LocalService for dyn UserService`, used by `ProxyFactory::create`

use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemTrait, Meta, Token, parse_macro_input, punctuated::Punctuated};

mod generate;
mod parse;

/// The main `#[local_service]` attribute macro.
///
/// # Attributes
///
/// - `name`: Interface name recorded in the descriptor (default: trait name)
///
/// # Method Signatures
///
/// Every method must:
///
/// - take `&self`
/// - have no generic parameters
/// - take owned parameters with simple names
/// - return `Result<T, E>`, where `E: From<localrpc::InvocationError>` and is
///   serializable, so that infrastructure failures can be reported through
///   the method's own error type
///
/// Parameters of type `Option<T>` may be passed as null.
///
/// # Bypass
///
/// `#[bypass]` on a parameter moves the argument to the implementation
/// instead of serializing it. `#[bypass]` on a method does the same for its
/// `Ok` value. Bypassed types must be `Any + Send`.
///
/// # Example
///
/// ```ignore
/// #[local_service(name = "core.Inventory")]
/// pub trait Inventory: Send + Sync {
///     fn stock(&self, sku: String, warehouse: Option<u32>) -> Result<u64, InventoryError>;
///
///     #[bypass]
///     fn snapshot(&self) -> Result<Arc<StockTable>, InventoryError>;
/// }
/// ```
#[proc_macro_attribute]
pub fn local_service(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemTrait);

    // Parse attribute arguments
    let attr_args = if attr.is_empty() {
        Vec::new()
    } else {
        match syn::parse::Parser::parse(Punctuated::<Meta, Token![,]>::parse_terminated, attr) {
            Ok(args) => args.into_iter().collect(),
            Err(err) => return err.to_compile_error().into(),
        }
    };

    // Parse the service definition
    let service = match parse::parse_service(&input, &attr_args) {
        Ok(service) => service,
        Err(err) => return err.to_compile_error().into(),
    };

    let service_trait = &service.trait_def;
    let descriptor = generate::generate_descriptor(&service);
    let proxy = generate::generate_proxy(&service);
    let invoker = generate::generate_invoker(&service);

    let expanded = quote! {
        #service_trait

        #descriptor

        #proxy

        #invoker
    };

    TokenStream::from(expanded)
}
