//! CP-001: Data model: host types, descriptors, records, pairs and plans.
//!
//! Host types are what a type provider hands out; descriptors are the
//! normalized taxonomy the rules reason about. Records are built once by
//! discovery and shared (`Arc`) between forward and reverse plans.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Host types
// ============================================================================

/// Predeclared primitive kinds of the host type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicKind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
}

impl BasicKind {
    /// Parse a predeclared type name. `byte` and `rune` are aliases of
    /// `uint8` and `int32`.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "bool" => Self::Bool,
            "int" => Self::Int,
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" | "rune" => Self::Int32,
            "int64" => Self::Int64,
            "uint" => Self::Uint,
            "uint8" | "byte" => Self::Uint8,
            "uint16" => Self::Uint16,
            "uint32" => Self::Uint32,
            "uint64" => Self::Uint64,
            "uintptr" => Self::Uintptr,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            "complex64" => Self::Complex64,
            "complex128" => Self::Complex128,
            "string" => Self::String,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint => "uint",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Uintptr => "uintptr",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Complex64 => "complex64",
            Self::Complex128 => "complex128",
            Self::String => "string",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int
                | Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::Uint
                | Self::Uint8
                | Self::Uint16
                | Self::Uint32
                | Self::Uint64
                | Self::Uintptr
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    pub fn is_complex(self) -> bool {
        matches!(self, Self::Complex64 | Self::Complex128)
    }

    /// Integer or floating point.
    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }
}

impl fmt::Display for BasicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One member of a struct body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructField {
    pub name: String,
    pub ty: HostType,
    /// Anonymous member whose fields are promoted into the parent.
    pub embedded: bool,
    /// Exported / public.
    pub visible: bool,
}

/// A type as the host type system spells it.
///
/// `Named` is a reference; its meaning (alias or defined type) lives in
/// the provider's declaration table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostType {
    Basic(BasicKind),
    Named { namespace: String, name: String },
    Pointer(Box<HostType>),
    Slice(Box<HostType>),
    Map {
        key: Box<HostType>,
        value: Box<HostType>,
    },
    Interface,
    Struct(Vec<StructField>),
    Other(String),
}

impl HostType {
    pub fn named(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Named {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn pointer(elem: HostType) -> Self {
        Self::Pointer(Box::new(elem))
    }

    pub fn slice(elem: HostType) -> Self {
        Self::Slice(Box::new(elem))
    }

    pub fn map(key: HostType, value: HostType) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic(kind) => write!(f, "{}", kind),
            Self::Named { namespace, name } if namespace.is_empty() => write!(f, "{}", name),
            Self::Named { namespace, name } => write!(f, "{}.{}", namespace, name),
            Self::Pointer(elem) => write!(f, "*{}", elem),
            Self::Slice(elem) => write!(f, "[]{}", elem),
            Self::Map { key, value } => write!(f, "map[{}]{}", key, value),
            Self::Interface => write!(f, "interface{{}}"),
            Self::Struct(fields) => {
                write!(f, "struct{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    if field.embedded {
                        write!(f, "{}", field.ty)?;
                    } else {
                        write!(f, "{} {}", field.name, field.ty)?;
                    }
                }
                write!(f, "}}")
            }
            Self::Other(text) => write!(f, "{}", text),
        }
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// Coarse structural category of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Basic,
    Pointer,
    Struct,
    Slice,
    Map,
    Interface,
    Other,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Pointer => write!(f, "pointer"),
            Self::Struct => write!(f, "struct"),
            Self::Slice => write!(f, "slice"),
            Self::Map => write!(f, "map"),
            Self::Interface => write!(f, "interface"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Normalized, recursive description of a field's type.
///
/// Pointer, slice and map descriptors always carry `element`; maps also
/// carry `key`. A struct descriptor names both `namespace` and
/// `struct_name`, or neither for anonymous struct bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDescriptor {
    pub kind: TypeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<Box<TypeDescriptor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<Box<TypeDescriptor>>,
    /// Namespace of the named type, empty for unnamed and predeclared types.
    pub namespace: String,
    pub struct_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub basic_kind: Option<BasicKind>,
    pub display_name: String,
}

impl TypeDescriptor {
    pub(crate) fn new(kind: TypeKind, display_name: impl Into<String>) -> Self {
        Self {
            kind,
            element: None,
            key: None,
            namespace: String::new(),
            struct_name: String::new(),
            basic_kind: None,
            display_name: display_name.into(),
        }
    }

    pub fn is_basic(&self) -> bool {
        self.basic_kind.is_some()
    }

    pub fn basic_kind_name(&self) -> Option<&'static str> {
        self.basic_kind.map(BasicKind::name)
    }

    pub fn is_string(&self) -> bool {
        self.basic_kind == Some(BasicKind::String)
    }

    /// The (namespace, name) of a named struct, if this is one.
    pub fn struct_ref(&self) -> Option<(&str, &str)> {
        if self.kind != TypeKind::Struct || self.namespace.is_empty() || self.struct_name.is_empty() {
            return None;
        }
        Some((&self.namespace, &self.struct_name))
    }

    /// Element descriptor of a pointer.
    pub fn pointee(&self) -> Option<&TypeDescriptor> {
        match self.kind {
            TypeKind::Pointer => self.element.as_deref(),
            _ => None,
        }
    }

    /// Element descriptor of a slice.
    pub fn slice_element(&self) -> Option<&TypeDescriptor> {
        match self.kind {
            TypeKind::Slice => self.element.as_deref(),
            _ => None,
        }
    }
}

// ============================================================================
// Records and fields
// ============================================================================

/// One field of a flattened record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldInfo {
    pub name: String,
    /// Dotted path through embedded members, e.g. `Base.ID`.
    pub access_path: String,
    /// Type text as it should be spelled in generated code.
    pub type_display: String,
    pub descriptor: TypeDescriptor,
    #[serde(skip)]
    pub host_type: HostType,
    pub visible: bool,
    /// Name of the embedding ancestor, empty when declared directly.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub embedded_from: String,
}

/// Identity of a record: (namespace, name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordKey {
    pub namespace: String,
    pub name: String,
}

impl RecordKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// One discovered record with its flattened fields in discovery order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordInfo {
    pub name: String,
    pub namespace: String,
    pub namespace_local_name: String,
    pub fields: Vec<FieldInfo>,
}

impl RecordInfo {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.namespace.clone(), self.name.clone())
    }

    pub fn same_identity(&self, other: &RecordInfo) -> bool {
        self.namespace == other.namespace && self.name == other.name
    }

    /// `local.Name` as seen from outside the record's namespace.
    pub fn qualified_name(&self) -> String {
        if self.namespace_local_name.is_empty() {
            return self.name.clone();
        }
        format!("{}.{}", self.namespace_local_name, self.name)
    }
}

/// A source/destination field pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPair {
    pub src: FieldInfo,
    pub dst: FieldInfo,
}

/// A source/destination record pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordPair {
    pub src: Arc<RecordInfo>,
    pub dst: Arc<RecordInfo>,
}

impl RecordPair {
    pub fn new(src: Arc<RecordInfo>, dst: Arc<RecordInfo>) -> Self {
        Self { src, dst }
    }

    pub fn reversed(&self) -> Self {
        Self {
            src: Arc::clone(&self.dst),
            dst: Arc::clone(&self.src),
        }
    }
}

// ============================================================================
// Plans
// ============================================================================

/// Conversion technique chosen for one field pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStrategy {
    DirectAssign,
    BasicCast,
    PointerWrap,
    PointerUnwrap,
    NullableToValue,
    ValueToNullable,
    TimeToString,
    StringToTime,
    SliceElementConvert,
    NestedStructConvert,
    NestedStructPointerConvert,
    NestedSliceConvert,
    CustomMethodCall,
    Skip,
}

impl fmt::Display for ConversionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DirectAssign => "direct_assign",
            Self::BasicCast => "basic_cast",
            Self::PointerWrap => "pointer_wrap",
            Self::PointerUnwrap => "pointer_unwrap",
            Self::NullableToValue => "nullable_to_value",
            Self::ValueToNullable => "value_to_nullable",
            Self::TimeToString => "time_to_string",
            Self::StringToTime => "string_to_time",
            Self::SliceElementConvert => "slice_element_convert",
            Self::NestedStructConvert => "nested_struct_convert",
            Self::NestedStructPointerConvert => "nested_struct_pointer_convert",
            Self::NestedSliceConvert => "nested_slice_convert",
            Self::CustomMethodCall => "custom_method_call",
            Self::Skip => "skip",
        };
        f.write_str(name)
    }
}

/// Conversion of one field pair. `Skip` plans carry an empty expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionPlan {
    pub src: FieldInfo,
    pub dst: FieldInfo,
    pub strategy: ConversionStrategy,
    pub expression: String,
}

impl ConversionPlan {
    pub fn new(
        src: &FieldInfo,
        dst: &FieldInfo,
        strategy: ConversionStrategy,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            src: src.clone(),
            dst: dst.clone(),
            strategy,
            expression: expression.into(),
        }
    }

    pub fn skip(src: &FieldInfo, dst: &FieldInfo) -> Self {
        Self::new(src, dst, ConversionStrategy::Skip, String::new())
    }

    pub fn is_skip(&self) -> bool {
        self.strategy == ConversionStrategy::Skip
    }
}

/// One converter function: a record pair and its per-field plans.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructConversionPlan {
    pub src: Arc<RecordInfo>,
    pub dst: Arc<RecordInfo>,
    pub function_name: String,
    pub plans: Vec<ConversionPlan>,
}

/// A field pair no rule could convert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedField {
    pub function_name: String,
    pub src_field: String,
    pub src_type: String,
    pub dst_field: String,
    pub dst_type: String,
}

impl fmt::Display for SkippedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field {:?} ({}) -> {:?} ({}): conversion not supported, skipped",
            self.src_field, self.src_type, self.dst_field, self.dst_type
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
