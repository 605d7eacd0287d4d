//! CP-005: Type-introspection provider abstraction.
//!
//! Discovery and the conversion rules never inspect a host type system
//! directly; they go through [`TypeProvider`]. A provider only has to load
//! namespaces and look up declarations. The capability queries have
//! default implementations derived from `lookup`, and providers with a
//! native checker can override them.

use super::compat;
use super::error::ProviderError;
use super::types::HostType;

/// A loaded namespace (package / module unit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceInfo {
    /// Full path, e.g. `example.com/app/model`.
    pub path: String,
    /// Short name used to qualify references from other namespaces.
    pub local_name: String,
    /// Root path of the module this namespace belongs to, if any.
    pub module_path: Option<String>,
}

/// A method declared on a named type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSig {
    pub name: String,
    pub params: Vec<HostType>,
    pub returns: Vec<HostType>,
    pub pointer_receiver: bool,
}

/// What a declared name stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDef {
    /// Transparent alias: the name and the target are the same type.
    Alias(HostType),
    /// A new named type with the given underlying type.
    Defined(HostType),
}

/// A named type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub namespace: String,
    pub name: String,
    pub def: TypeDef,
    pub methods: Vec<MethodSig>,
}

impl TypeDecl {
    pub fn is_alias(&self) -> bool {
        matches!(self.def, TypeDef::Alias(_))
    }
}

/// Source of type metadata for discovery and rule resolution.
pub trait TypeProvider {
    /// Load a namespace. Fails when the namespace does not exist or cannot
    /// be analysed.
    fn load(&self, namespace: &str) -> Result<NamespaceInfo, ProviderError>;

    /// Look up a declaration by name. `None` means not found.
    fn lookup(&self, namespace: &str, name: &str) -> Option<&TypeDecl>;

    /// Qualifier used when rendering a reference into `namespace`.
    fn local_name(&self, namespace: &str) -> String {
        default_local_name(namespace)
    }

    /// The two types denote the same type once aliases are resolved.
    fn identical(&self, a: &HostType, b: &HostType) -> bool {
        compat::identical(self, a, b)
    }

    /// A value of `src` may be stored in a `dst` without conversion.
    fn assignable(&self, src: &HostType, dst: &HostType) -> bool {
        compat::assignable(self, src, dst)
    }

    /// An explicit conversion `dst(src)` is legal.
    fn convertible(&self, src: &HostType, dst: &HostType) -> bool {
        compat::convertible(self, src, dst)
    }

    /// The type, or its pointer, has a zero-argument `String() string`.
    fn supports_stringer(&self, ty: &HostType) -> bool {
        compat::supports_stringer(self, ty)
    }
}

/// Last path segment of a namespace path.
pub fn default_local_name(namespace: &str) -> String {
    namespace
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}
