//! CP-003: Type classification and rendering.
//!
//! `classify` maps any host type onto the seven-kind taxonomy. Named types
//! are seen through to their structural kind while keeping their identity,
//! so a defined struct type is `Struct` with its namespace and name, and a
//! defined string type is `Basic` with its namespace.

use super::compat::{self, MAX_EXPANSION_DEPTH};
use super::provider::{TypeDef, TypeProvider};
use super::types::{HostType, StructField, TypeDescriptor, TypeKind};
use rustc_hash::FxHashSet;

/// Names being expanded on the current path.
type Expanding = FxHashSet<(String, String)>;

/// Classify a host type.
///
/// A name met again inside its own expansion (`type T map[*T]T`)
/// classifies as `Other` instead of being expanded a second time.
pub fn classify<P: TypeProvider + ?Sized>(provider: &P, ty: &HostType) -> TypeDescriptor {
    classify_at(provider, ty, 0, &mut Expanding::default())
}

fn classify_at<P: TypeProvider + ?Sized>(
    provider: &P,
    ty: &HostType,
    depth: usize,
    expanding: &mut Expanding,
) -> TypeDescriptor {
    if depth > MAX_EXPANSION_DEPTH {
        return TypeDescriptor::new(TypeKind::Other, ty.to_string());
    }
    match ty {
        HostType::Basic(kind) => {
            let mut d = TypeDescriptor::new(TypeKind::Basic, kind.name());
            d.basic_kind = Some(*kind);
            d
        }
        HostType::Pointer(elem) => {
            let elem = classify_at(provider, elem, depth, expanding);
            wrap(TypeKind::Pointer, format!("*{}", elem.display_name), elem)
        }
        HostType::Slice(elem) => {
            let elem = classify_at(provider, elem, depth, expanding);
            wrap(TypeKind::Slice, format!("[]{}", elem.display_name), elem)
        }
        HostType::Map { key, value } => {
            let key = classify_at(provider, key, depth, expanding);
            let value = classify_at(provider, value, depth, expanding);
            let mut d = wrap(
                TypeKind::Map,
                format!("map[{}]{}", key.display_name, value.display_name),
                value,
            );
            d.key = Some(Box::new(key));
            d
        }
        HostType::Interface => TypeDescriptor::new(TypeKind::Interface, "interface"),
        HostType::Struct(_) => TypeDescriptor::new(TypeKind::Struct, ty.to_string()),
        HostType::Other(text) => TypeDescriptor::new(TypeKind::Other, text.clone()),
        HostType::Named { namespace, name } => {
            let Some(decl) = provider.lookup(namespace, name) else {
                return TypeDescriptor::new(TypeKind::Other, ty.to_string());
            };
            let key = (namespace.clone(), name.clone());
            if !expanding.insert(key.clone()) {
                return TypeDescriptor::new(TypeKind::Other, ty.to_string());
            }
            let d = match &decl.def {
                TypeDef::Alias(target) => classify_at(provider, target, depth + 1, expanding),
                TypeDef::Defined(_) => classify_named(provider, ty, namespace, name, depth + 1, expanding),
            };
            expanding.remove(&key);
            d
        }
    }
}

fn classify_named<P: TypeProvider + ?Sized>(
    provider: &P,
    ty: &HostType,
    namespace: &str,
    name: &str,
    depth: usize,
    expanding: &mut Expanding,
) -> TypeDescriptor {
    let display = ty.to_string();
    let mut d = match compat::underlying(provider, ty) {
        HostType::Struct(_) => {
            let mut d = TypeDescriptor::new(TypeKind::Struct, display);
            d.struct_name = name.to_string();
            d
        }
        HostType::Basic(kind) => {
            let mut d = TypeDescriptor::new(TypeKind::Basic, display);
            d.basic_kind = Some(kind);
            d
        }
        HostType::Pointer(elem) => wrap(TypeKind::Pointer, display, classify_at(provider, &elem, depth, expanding)),
        HostType::Slice(elem) => wrap(TypeKind::Slice, display, classify_at(provider, &elem, depth, expanding)),
        HostType::Map { key, value } => {
            let mut d = wrap(TypeKind::Map, display, classify_at(provider, &value, depth, expanding));
            d.key = Some(Box::new(classify_at(provider, &key, depth, expanding)));
            d
        }
        HostType::Interface => TypeDescriptor::new(TypeKind::Interface, display),
        HostType::Named { .. } | HostType::Other(_) => TypeDescriptor::new(TypeKind::Other, display),
    };
    d.namespace = namespace.to_string();
    d
}

fn wrap(kind: TypeKind, display: String, elem: TypeDescriptor) -> TypeDescriptor {
    let mut d = TypeDescriptor::new(kind, display);
    d.element = Some(Box::new(elem));
    d
}

/// Render a type as it is spelled from inside `relative_to`: names from
/// that namespace are unqualified, others use the namespace's local name.
pub fn render<P: TypeProvider + ?Sized>(provider: &P, ty: &HostType, relative_to: &str) -> String {
    match ty {
        HostType::Basic(kind) => kind.name().to_string(),
        HostType::Named { namespace, name } => {
            if namespace.is_empty() || namespace == relative_to {
                return name.clone();
            }
            format!("{}.{}", provider.local_name(namespace), name)
        }
        HostType::Pointer(elem) => format!("*{}", render(provider, elem, relative_to)),
        HostType::Slice(elem) => format!("[]{}", render(provider, elem, relative_to)),
        HostType::Map { key, value } => format!(
            "map[{}]{}",
            render(provider, key, relative_to),
            render(provider, value, relative_to)
        ),
        HostType::Interface => "interface{}".to_string(),
        HostType::Struct(fields) => {
            let parts: Vec<String> = fields
                .iter()
                .map(|f| {
                    let ty = render(provider, &f.ty, relative_to);
                    if f.embedded {
                        ty
                    } else {
                        format!("{} {}", f.name, ty)
                    }
                })
                .collect();
            format!("struct{{{}}}", parts.join("; "))
        }
        HostType::Other(text) => text.clone(),
    }
}

/// Fields of a record type, seen through aliases and defined names.
pub fn struct_fields<P: TypeProvider + ?Sized>(provider: &P, ty: &HostType) -> Option<Vec<StructField>> {
    match compat::underlying(provider, ty) {
        HostType::Struct(fields) => Some(fields),
        _ => None,
    }
}

/// A record reached through an embedded member: its fields, its type name
/// and its identity. Looks through one pointer and any aliases.
pub fn embedded_record<P: TypeProvider + ?Sized>(
    provider: &P,
    ty: &HostType,
) -> Option<(Vec<StructField>, String, String)> {
    match compat::unalias(provider, ty) {
        HostType::Pointer(elem) => embedded_record(provider, &elem),
        named @ HostType::Named { .. } => {
            let fields = struct_fields(provider, &named)?;
            let HostType::Named { namespace, name } = named else {
                return None;
            };
            Some((fields, name, namespace))
        }
        _ => None,
    }
}

/// The record a descriptor refers to, looking through any chain of
/// pointer and slice wrappers.
pub fn nested_record_ref(descriptor: &TypeDescriptor) -> Option<(&str, &str)> {
    match descriptor.kind {
        TypeKind::Struct => descriptor.struct_ref(),
        TypeKind::Pointer | TypeKind::Slice => nested_record_ref(descriptor.element.as_deref()?),
        _ => None,
    }
}
