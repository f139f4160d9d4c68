//! Parsing logic for the `#[local_service]` macro.
//!
//! This module validates the annotated trait and extracts what the generators
//! need: method names, parameters with their bypass and optional flags, and
//! the `Ok` and `Err` types of each method's `Result`.

use syn::{
    Attribute, Error, Expr, FnArg, GenericArgument, Ident, ItemTrait, Lit, Meta, MetaNameValue,
    Pat, PatType, PathArguments, Result, ReturnType, TraitItem, TraitItemFn, Type, Visibility,
};

/// Name of the marker attribute for by-reference parameters and results.
const BYPASS: &str = "bypass";

/// Parsed service definition.
#[derive(Debug)]
pub struct ServiceDef {
    /// The trait with all `#[bypass]` markers removed
    pub trait_def: ItemTrait,
    /// Trait name
    pub name: Ident,
    /// Trait visibility, reused for generated items
    pub vis: Visibility,
    /// Interface name recorded in the descriptor
    pub interface_name: String,
    /// Service methods
    pub methods: Vec<MethodDef>,
}

/// Parsed method definition.
#[derive(Debug)]
pub struct MethodDef {
    /// Method name
    pub name: Ident,
    /// Method parameters (excluding self)
    pub params: Vec<ParamDef>,
    /// Return type as written
    pub output: ReturnType,
    /// `T` of `Result<T, E>`
    pub ok_type: Type,
    /// `E` of `Result<T, E>`
    pub err_type: Type,
    /// Whether the result is passed by reference
    pub result_bypass: bool,
}

/// Parsed parameter definition.
#[derive(Debug)]
pub struct ParamDef {
    /// Parameter name
    pub name: Ident,
    /// Parameter type
    pub ty: Type,
    /// Whether the argument is passed by reference
    pub bypass: bool,
    /// `T` if the parameter type is `Option<T>`
    pub optional: Option<Type>,
}

/// Parse the annotated trait and the attribute arguments.
pub fn parse_service(trait_def: &ItemTrait, attr_args: &[Meta]) -> Result<ServiceDef> {
    let name = trait_def.ident.clone();
    let mut interface_name = name.to_string();

    for meta in attr_args {
        match meta {
            Meta::NameValue(MetaNameValue {
                path,
                value: Expr::Lit(expr_lit),
                ..
            }) if path.is_ident("name") => {
                if let Lit::Str(lit_str) = &expr_lit.lit {
                    interface_name = lit_str.value();
                } else {
                    return Err(Error::new_spanned(
                        expr_lit,
                        "name attribute must be a string literal",
                    ));
                }
            }
            _ => {
                return Err(Error::new_spanned(
                    meta,
                    "Unknown attribute. Supported: name",
                ));
            }
        }
    }

    if !trait_def.generics.params.is_empty() || trait_def.generics.where_clause.is_some() {
        return Err(Error::new_spanned(
            &trait_def.generics,
            "Local service traits cannot be generic",
        ));
    }

    let mut methods = Vec::new();
    for item in &trait_def.items {
        match item {
            TraitItem::Fn(method) => methods.push(parse_method(method)?),
            other => {
                return Err(Error::new_spanned(
                    other,
                    "Local service traits may only contain methods",
                ));
            }
        }
    }

    if methods.is_empty() {
        return Err(Error::new_spanned(
            trait_def,
            "Service trait must have at least one method",
        ));
    }

    let mut trait_def = trait_def.clone();
    strip_bypass_markers(&mut trait_def);

    Ok(ServiceDef {
        vis: trait_def.vis.clone(),
        trait_def,
        name,
        interface_name,
        methods,
    })
}

/// Parse a trait method.
fn parse_method(method: &TraitItemFn) -> Result<MethodDef> {
    let sig = &method.sig;
    let name = sig.ident.clone();

    if sig.asyncness.is_some() {
        return Err(Error::new_spanned(
            sig,
            "Local service methods are synchronous; remove `async`",
        ));
    }
    if !sig.generics.params.is_empty() || sig.generics.where_clause.is_some() {
        return Err(Error::new_spanned(
            &sig.generics,
            "Local service methods cannot be generic",
        ));
    }
    match sig.receiver() {
        Some(receiver)
            if receiver.reference.is_some()
                && receiver.mutability.is_none()
                && receiver.colon_token.is_none() => {}
        _ => {
            return Err(Error::new_spanned(
                sig,
                "Local service methods must take `&self`",
            ));
        }
    }

    let mut params = Vec::new();
    for arg in &sig.inputs {
        match arg {
            FnArg::Receiver(_) => continue,
            FnArg::Typed(PatType { pat, ty, attrs, .. }) => {
                let Pat::Ident(pat_ident) = &**pat else {
                    return Err(Error::new_spanned(
                        pat,
                        "Only simple parameter names are supported",
                    ));
                };
                if pat_ident.by_ref.is_some() || pat_ident.subpat.is_some() {
                    return Err(Error::new_spanned(
                        pat,
                        "Only simple parameter names are supported",
                    ));
                }
                if matches!(**ty, Type::Reference(_) | Type::ImplTrait(_)) {
                    return Err(Error::new_spanned(
                        ty,
                        "Local service parameters must be owned values",
                    ));
                }
                params.push(ParamDef {
                    name: pat_ident.ident.clone(),
                    ty: (**ty).clone(),
                    bypass: has_bypass(attrs),
                    optional: is_optional(ty),
                });
            }
        }
    }

    let (ok_type, err_type) = match &sig.output {
        ReturnType::Type(_, ty) => result_types(ty),
        ReturnType::Default => None,
    }
    .ok_or_else(|| {
        Error::new_spanned(
            &sig.output,
            "Local service methods must return `Result<T, E>`",
        )
    })?;

    Ok(MethodDef {
        name,
        params,
        output: sig.output.clone(),
        ok_type,
        err_type,
        result_bypass: has_bypass(&method.attrs),
    })
}

fn has_bypass(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(BYPASS))
}

/// Remove `#[bypass]` from methods and parameters so the emitted trait
/// compiles.
fn strip_bypass_markers(trait_def: &mut ItemTrait) {
    for item in &mut trait_def.items {
        if let TraitItem::Fn(method) = item {
            method.attrs.retain(|attr| !attr.path().is_ident(BYPASS));
            for arg in &mut method.sig.inputs {
                if let FnArg::Typed(pat_type) = arg {
                    pat_type.attrs.retain(|attr| !attr.path().is_ident(BYPASS));
                }
            }
        }
    }
}

/// Returns `T` if `ty` is written as `Option<T>`.
fn is_optional(ty: &Type) -> Option<Type> {
    let mut types = generic_types(ty, "Option")?;
    if types.len() != 1 {
        return None;
    }
    types.pop()
}

/// Returns `(T, E)` if `ty` is written as `Result<T, E>`.
fn result_types(ty: &Type) -> Option<(Type, Type)> {
    let mut types = generic_types(ty, "Result")?.into_iter();
    match (types.next(), types.next(), types.next()) {
        (Some(ok), Some(err), None) => Some((ok, err)),
        _ => None,
    }
}

/// Returns the generic type arguments of `ty` if its last path segment is
/// `ident`.
fn generic_types(ty: &Type, ident: &str) -> Option<Vec<Type>> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    if type_path.qself.is_some() {
        return None;
    }
    let segment = type_path.path.segments.last()?;
    if segment.ident != ident {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args
        .iter()
        .map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty.clone()),
            _ => None,
        })
        .collect()
}
