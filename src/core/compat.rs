//! CP-004: Type compatibility: identity, assignability, convertibility.
//!
//! Default semantics behind [`TypeProvider`]'s capability queries. Only
//! `lookup` is used, so any provider gets a working checker for free.
//! Predeclared basic types count as named types for assignability.

use super::provider::{MethodSig, TypeDef, TypeProvider};
use super::types::{BasicKind, HostType, StructField};
use rustc_hash::FxHashSet;

/// Upper bound on alias / named-type expansion. Chains longer than this
/// are treated as unresolvable.
pub const MAX_EXPANSION_DEPTH: usize = 64;

/// Resolve top-level aliases. A chain that does not terminate becomes
/// `Other`.
pub fn unalias<P: TypeProvider + ?Sized>(provider: &P, ty: &HostType) -> HostType {
    let mut current = ty.clone();
    for _ in 0..MAX_EXPANSION_DEPTH {
        let target = match &current {
            HostType::Named { namespace, name } => match provider.lookup(namespace, name) {
                Some(decl) => match &decl.def {
                    TypeDef::Alias(target) => target.clone(),
                    TypeDef::Defined(_) => return current,
                },
                None => return current,
            },
            _ => return current,
        };
        current = target;
    }
    HostType::Other(ty.to_string())
}

/// Resolve aliases everywhere inside a type, leaving defined names intact.
pub fn canonical<P: TypeProvider + ?Sized>(provider: &P, ty: &HostType) -> HostType {
    match unalias(provider, ty) {
        HostType::Pointer(elem) => HostType::pointer(canonical(provider, &elem)),
        HostType::Slice(elem) => HostType::slice(canonical(provider, &elem)),
        HostType::Map { key, value } => {
            HostType::map(canonical(provider, &key), canonical(provider, &value))
        }
        HostType::Struct(fields) => HostType::Struct(
            fields
                .iter()
                .map(|f| StructField {
                    ty: canonical(provider, &f.ty),
                    ..f.clone()
                })
                .collect(),
        ),
        other => other,
    }
}

/// The structural type behind a name. Unknown names are returned as is.
pub fn underlying<P: TypeProvider + ?Sized>(provider: &P, ty: &HostType) -> HostType {
    let mut current = unalias(provider, ty);
    for _ in 0..MAX_EXPANSION_DEPTH {
        let next = match &current {
            HostType::Named { namespace, name } => match provider.lookup(namespace, name) {
                Some(decl) => match &decl.def {
                    TypeDef::Defined(under) | TypeDef::Alias(under) => unalias(provider, under),
                },
                None => return current,
            },
            _ => return current,
        };
        current = next;
    }
    HostType::Other(ty.to_string())
}

/// Named types: declared names and predeclared basic types.
pub fn is_named<P: TypeProvider + ?Sized>(provider: &P, ty: &HostType) -> bool {
    matches!(
        unalias(provider, ty),
        HostType::Named { .. } | HostType::Basic(_)
    )
}

pub fn identical<P: TypeProvider + ?Sized>(provider: &P, a: &HostType, b: &HostType) -> bool {
    a == b || canonical(provider, a) == canonical(provider, b)
}

pub fn assignable<P: TypeProvider + ?Sized>(provider: &P, src: &HostType, dst: &HostType) -> bool {
    if identical(provider, src, dst) {
        return true;
    }
    let dst_under = underlying(provider, dst);
    if dst_under == HostType::Interface {
        return true;
    }
    let src_under = underlying(provider, src);
    if is_named(provider, src) && is_named(provider, dst) {
        return false;
    }
    canonical(provider, &src_under) == canonical(provider, &dst_under)
}

pub fn convertible<P: TypeProvider + ?Sized>(provider: &P, src: &HostType, dst: &HostType) -> bool {
    if assignable(provider, src, dst) {
        return true;
    }
    let src_under = canonical(provider, &underlying(provider, src));
    let dst_under = canonical(provider, &underlying(provider, dst));
    if src_under == dst_under {
        return true;
    }

    // Unnamed pointers whose base types share an underlying type.
    if let (HostType::Pointer(a), HostType::Pointer(b)) =
        (unalias(provider, src), unalias(provider, dst))
    {
        let a_under = canonical(provider, &underlying(provider, &a));
        let b_under = canonical(provider, &underlying(provider, &b));
        return a_under == b_under;
    }

    match (&src_under, &dst_under) {
        // Integer to string is the rune conversion: legal, if rarely wanted.
        (HostType::Basic(a), HostType::Basic(BasicKind::String)) if a.is_integer() => true,
        (HostType::Basic(a), HostType::Basic(b)) => {
            (a.is_numeric() && b.is_numeric()) || (a.is_complex() && b.is_complex())
        }
        (HostType::Basic(BasicKind::String), HostType::Slice(elem))
        | (HostType::Slice(elem), HostType::Basic(BasicKind::String)) => matches!(
            underlying(provider, elem),
            HostType::Basic(BasicKind::Uint8) | HostType::Basic(BasicKind::Int32)
        ),
        _ => false,
    }
}

/// The type, or its pointer, has `String() string` in its method set:
/// declared on the named type or promoted from an embedded member.
///
/// Promotion follows Go's selector rules. The shallowest depth that has a
/// `String` method or field decides, and two candidates at that depth
/// cancel out.
pub fn supports_stringer<P: TypeProvider + ?Sized>(provider: &P, ty: &HostType) -> bool {
    let base = embedded_base(provider, ty);
    if !matches!(base, HostType::Named { .. }) {
        return false;
    }

    let mut seen: FxHashSet<(String, String)> = FxHashSet::default();
    let mut level = vec![base];
    let mut colliding_fields = 0usize;
    for _ in 0..MAX_EXPANSION_DEPTH {
        let mut methods = 0usize;
        let mut mismatched = 0usize;
        let mut next = Vec::new();
        let mut next_fields = 0usize;
        for ty in &level {
            let HostType::Named { namespace, name } = ty else {
                continue;
            };
            if !seen.insert((namespace.clone(), name.clone())) {
                continue;
            }
            let Some(decl) = provider.lookup(namespace, name) else {
                continue;
            };
            if let Some(method) = decl.methods.iter().find(|m| m.name == "String") {
                if is_string_method(method) {
                    methods += 1;
                } else {
                    mismatched += 1;
                }
                continue;
            }
            let HostType::Struct(fields) = underlying(provider, ty) else {
                continue;
            };
            for f in &fields {
                if f.embedded {
                    next.push(embedded_base(provider, &f.ty));
                } else if f.name == "String" {
                    next_fields += 1;
                }
            }
        }
        if methods + mismatched + colliding_fields > 0 {
            return methods == 1 && mismatched == 0 && colliding_fields == 0;
        }
        if next.is_empty() && next_fields == 0 {
            return false;
        }
        level = next;
        colliding_fields = next_fields;
    }
    false
}

/// Strip aliases and at most one pointer.
fn embedded_base<P: TypeProvider + ?Sized>(provider: &P, ty: &HostType) -> HostType {
    match unalias(provider, ty) {
        HostType::Pointer(elem) => unalias(provider, &elem),
        other => other,
    }
}

fn is_string_method(method: &MethodSig) -> bool {
    method.name == "String"
        && method.params.is_empty()
        && method.returns.len() == 1
        && method.returns[0] == HostType::Basic(BasicKind::String)
}
