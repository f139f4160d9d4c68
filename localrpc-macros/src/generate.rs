//! Code generation for the `#[local_service]` macro.
//!
//! This module generates:
//! - The `{TRAIT}_INTERFACE` descriptor constant
//! - The `{Trait}Proxy` calling-side stub
//! - The `{Trait}Invoker` receiving-side adapter
//! - `impl LocalService for dyn Trait`

use crate::parse::{MethodDef, ParamDef, ServiceDef};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::Ident;

/// Name of the descriptor constant for a service.
fn descriptor_ident(service: &ServiceDef) -> Ident {
    format_ident!("{}_INTERFACE", screaming_snake(&service.name.to_string()))
}

/// Generate the static interface descriptor.
pub fn generate_descriptor(service: &ServiceDef) -> TokenStream {
    let vis = &service.vis;
    let descriptor = descriptor_ident(service);
    let service_name = &service.name;
    let interface_name = &service.interface_name;

    let methods: Vec<_> = service
        .methods
        .iter()
        .map(|method| {
            let method_name = method.name.to_string();
            let result_bypass = method.result_bypass;
            let parameters: Vec<_> = method
                .params
                .iter()
                .map(|param| {
                    let name = param.name.to_string();
                    let bypass = param.bypass;
                    let optional = param.optional.is_some();
                    quote! {
                        ::localrpc::proxy::ParameterDescriptor {
                            name: #name,
                            bypass: #bypass,
                            optional: #optional,
                        }
                    }
                })
                .collect();
            quote! {
                ::localrpc::proxy::MethodDescriptor {
                    name: #method_name,
                    parameters: &[#(#parameters),*],
                    result_bypass: #result_bypass,
                }
            }
        })
        .collect();

    quote! {
        #[doc = concat!("Interface descriptor of the `", stringify!(#service_name), "` service")]
        #vis const #descriptor: ::localrpc::proxy::ServiceInterface = ::localrpc::proxy::ServiceInterface {
            name: #interface_name,
            methods: &[#(#methods),*],
        };
    }
}

/// Generate the proxy struct and its trait implementation.
///
/// Each proxy method resolves the target, marshals its arguments in
/// declaration order and completes the call. Failures that happen before the
/// service runs are converted into the method's error type with `From`.
pub fn generate_proxy(service: &ServiceDef) -> TokenStream {
    let vis = &service.vis;
    let service_name = &service.name;
    let proxy_name = format_ident!("{}Proxy", service.name);
    let descriptor = descriptor_ident(service);

    let methods: Vec<_> = service.methods.iter().map(generate_proxy_method).collect();

    quote! {
        #[doc = concat!("Proxy for the `", stringify!(#service_name), "` service")]
        #[doc = ""]
        #[doc = "Forwards every method to the deployment block that registered the"]
        #[doc = "service, serializing arguments and results."]
        #[derive(Clone)]
        #vis struct #proxy_name<C: ::localrpc::codec::Codec = ::localrpc::codec::PostcardCodec> {
            dispatcher: ::localrpc::dispatcher::Dispatcher<C>,
        }

        impl<C: ::localrpc::codec::Codec> #proxy_name<C> {
            /// Create a proxy that calls through `dispatcher`.
            pub fn new(dispatcher: ::localrpc::dispatcher::Dispatcher<C>) -> Self {
                Self { dispatcher }
            }

            /// Return the dispatcher used by this proxy.
            pub fn dispatcher(&self) -> &::localrpc::dispatcher::Dispatcher<C> {
                &self.dispatcher
            }

            /// Return a copy of this proxy that attaches `context` to every call.
            pub fn with_security_context(&self, context: ::localrpc::context::SecurityContext) -> Self {
                Self {
                    dispatcher: self.dispatcher.clone().with_security_context(context),
                }
            }
        }

        impl<C: ::localrpc::codec::Codec> ::std::fmt::Debug for #proxy_name<C> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(stringify!(#proxy_name))
                    .field("dispatcher", &self.dispatcher)
                    .finish()
            }
        }

        impl<C: ::localrpc::codec::Codec> #service_name for #proxy_name<C> {
            #(#methods)*
        }

        impl ::localrpc::proxy::LocalService for dyn #service_name {
            const INTERFACE: &'static ::localrpc::proxy::ServiceInterface = &#descriptor;

            fn from_dispatcher<C: ::localrpc::codec::Codec>(
                dispatcher: ::localrpc::dispatcher::Dispatcher<C>,
            ) -> ::std::sync::Arc<Self> {
                ::std::sync::Arc::new(#proxy_name::new(dispatcher))
            }
        }
    }
}

/// Generate a single proxy method.
fn generate_proxy_method(method: &MethodDef) -> TokenStream {
    let method_name = &method.name;
    let method_str = method.name.to_string();
    let output = &method.output;
    let ok_type = &method.ok_type;
    let err_type = &method.err_type;

    let params: Vec<_> = method
        .params
        .iter()
        .map(|param| {
            let name = &param.name;
            let ty = &param.ty;
            quote! { #name: #ty }
        })
        .collect();

    let marshal: Vec<_> = method.params.iter().map(marshal_argument).collect();

    let complete = if method.result_bypass {
        quote! { call.invoke_bypass::<#ok_type, #err_type>() }
    } else {
        quote! { call.invoke::<#ok_type, #err_type>() }
    };

    quote! {
        fn #method_name(&self, #(#params),*) #output {
            let call = self.dispatcher.call(#method_str)
                #(.and_then(|call| #marshal))*;
            match call {
                ::core::result::Result::Ok(call) => #complete,
                ::core::result::Result::Err(error) => ::core::result::Result::Err(
                    <#err_type as ::core::convert::From<::localrpc::InvocationError>>::from(error),
                ),
            }
        }
    }
}

/// Generate the expression that appends one argument to `call`.
fn marshal_argument(param: &ParamDef) -> TokenStream {
    let name = &param.name;
    let ty = &param.ty;
    match (&param.optional, param.bypass) {
        (None, false) => quote! { call.argument::<#ty>(&#name) },
        (Some(inner), false) => quote! { call.optional_argument::<#inner>(#name.as_ref()) },
        (None, true) => quote! { call.bypass_argument::<#ty>(#name) },
        (Some(inner), true) => quote! { call.optional_bypass_argument::<#inner>(#name) },
    }
}

/// Generate the invoker adapter.
///
/// The invoker checks the record against the method signature, unmarshals
/// the arguments and calls the implementation.
pub fn generate_invoker(service: &ServiceDef) -> TokenStream {
    let vis = &service.vis;
    let service_name = &service.name;
    let invoker_name = format_ident!("{}Invoker", service.name);
    let interface_name = &service.interface_name;

    let arms: Vec<_> = service.methods.iter().map(generate_invoke_arm).collect();

    quote! {
        #[doc = concat!("Invoker for implementations of the `", stringify!(#service_name), "` service")]
        #[doc = ""]
        #[doc = "Register it in a deployment block to make the implementation callable"]
        #[doc = "through proxies."]
        #vis struct #invoker_name<T: ?Sized, C: ::localrpc::codec::Codec = ::localrpc::codec::PostcardCodec> {
            service: ::std::sync::Arc<T>,
            codec: C,
        }

        impl<T: ?Sized> #invoker_name<T, ::localrpc::codec::PostcardCodec> {
            /// Create an invoker using the default codec.
            pub fn new(service: ::std::sync::Arc<T>) -> Self {
                Self {
                    service,
                    codec: ::localrpc::codec::PostcardCodec::default(),
                }
            }
        }

        impl<T: ?Sized, C: ::localrpc::codec::Codec> #invoker_name<T, C> {
            /// Create an invoker using `codec`.
            pub fn with_codec(service: ::std::sync::Arc<T>, codec: C) -> Self {
                Self { service, codec }
            }

            /// Return the service implementation.
            pub fn service(&self) -> &::std::sync::Arc<T> {
                &self.service
            }
        }

        impl<T: ?Sized, C: ::localrpc::codec::Codec> ::core::clone::Clone for #invoker_name<T, C> {
            fn clone(&self) -> Self {
                Self {
                    service: ::std::sync::Arc::clone(&self.service),
                    codec: self.codec.clone(),
                }
            }
        }

        impl<T, C> ::localrpc::invoker::Invoker for #invoker_name<T, C>
        where
            T: #service_name + ?Sized + Send + Sync + 'static,
            C: ::localrpc::codec::Codec,
        {
            fn invoke(
                &self,
                invocation: ::localrpc::invocation::Invocation,
            ) -> ::localrpc::invocation::InvocationResult {
                let codec = &self.codec;
                let service = &self.service;
                ::localrpc::invoker::execute(codec, invocation, |invocation| {
                    let method = invocation.method_name().to_owned();
                    match method.as_str() {
                        #(#arms)*
                        other => ::core::result::Result::Err(
                            ::localrpc::invoker::unknown_method(#interface_name, other),
                        ),
                    }
                })
            }
        }
    }
}

/// Generate the invoke arm for one method.
fn generate_invoke_arm(method: &MethodDef) -> TokenStream {
    let method_name = &method.name;
    let method_str = method.name.to_string();
    let result_bypass = method.result_bypass;
    let param_types: Vec<_> = method.params.iter().map(|p| &p.ty).collect();
    let param_names: Vec<_> = method.params.iter().map(|p| &p.name).collect();

    let unmarshal: Vec<_> = method
        .params
        .iter()
        .enumerate()
        .map(|(index, param)| {
            let name = &param.name;
            let ty = &param.ty;
            let value = match (&param.optional, param.bypass) {
                (None, false) => quote! { invocation.argument::<#ty, C>(#index, codec)? },
                (Some(inner), false) => {
                    quote! { invocation.optional_argument::<#inner, C>(#index, codec)? }
                }
                (None, true) => quote! { invocation.take_bypass::<#ty>(#index)? },
                (Some(inner), true) => quote! { invocation.take_optional_bypass::<#inner>(#index)? },
            };
            quote! { let #name = #value; }
        })
        .collect();

    let encode = if method.result_bypass {
        quote! { ::localrpc::invoker::encode_bypass }
    } else {
        quote! { ::localrpc::invoker::encode_value }
    };

    quote! {
        #method_str => {
            invocation.expect_signature(
                &[#(::std::any::type_name::<#param_types>()),*],
                #result_bypass,
            )?;
            #(#unmarshal)*
            #encode(codec, service.#method_name(#(#param_names),*))
        }
    }
}

/// Convert PascalCase to SCREAMING_SNAKE_CASE.
fn screaming_snake(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut previous_lower = false;
    for c in s.chars() {
        if c.is_uppercase() && previous_lower {
            out.push('_');
        }
        previous_lower = c.is_lowercase() || c.is_ascii_digit();
        out.extend(c.to_uppercase());
    }
    out
}
