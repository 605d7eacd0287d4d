//! CP-011: Built-in conversion rules.
//!
//! Priority order, most specific first:
//! 1. same-type      identical types, direct assignment
//! 2. basic-cast     primitive to primitive cast
//! 3. pointer        pointer wrap / unwrap of non-record values
//! 4. nullable       `database/sql` null boxes to and from their payload
//! 5. time-string    `time.Time` to and from RFC 3339 text
//! 6. nested-struct  delegation to the converter of a known record pair
//! 7. slice-convert  element-wise copy or cast of non-record slices
//! 8. stringer       `String()` into a string destination
//! 9. assignable     structural assignability
//! 10. convertible   last resort cast between basic or record kinds
//!
//! Expressions are target-language shaped text over `src.<path>` and
//! `dst.<path>` selectors.

use super::compat;
use super::naming::converter_name;
use super::provider::TypeProvider;
use super::resolver::{Rule, RuleContext};
use super::types::{ConversionPlan, ConversionStrategy, FieldInfo, HostType, TypeDescriptor, TypeKind};

/// Built-in rules in priority order.
pub fn default_rules() -> Vec<Rule> {
    vec![
        rule("same-type", same_type),
        rule("basic-cast", basic_cast),
        rule("pointer", pointer),
        rule("nullable", nullable),
        rule("time-string", time_string),
        Rule {
            name: "nested-struct",
            needs_nested_set: true,
            try_convert: nested_struct,
        },
        rule("slice-convert", slice_convert),
        rule("stringer", stringer),
        rule("assignable", assignable),
        rule("convertible", convertible),
    ]
}

fn rule(
    name: &'static str,
    try_convert: fn(&RuleContext<'_>, &FieldInfo, &FieldInfo) -> Option<ConversionPlan>,
) -> Rule {
    Rule {
        name,
        needs_nested_set: false,
        try_convert,
    }
}

// ============================================================================
// Nullable shapes
// ============================================================================

/// How a nullable box's validity flag is computed from a plain value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Always,
    NonEmptyString,
    NonZeroTime,
}

impl Validity {
    pub fn expression(self, src: &str) -> String {
        match self {
            Self::Always => "true".to_string(),
            Self::NonEmptyString => format!("{} != \"\"", src),
            Self::NonZeroTime => format!("!{}.IsZero()", src),
        }
    }
}

/// A known nullable box: payload field plus a `Valid` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NullableShape {
    /// Fully qualified type identity, `namespace.Name`.
    pub type_id: &'static str,
    /// Payload type: a basic kind name or `namespace.Name` of a record.
    pub value_type: &'static str,
    pub value_field: &'static str,
    pub validity: Validity,
}

pub static NULLABLE_SHAPES: [NullableShape; 8] = [
    NullableShape {
        type_id: "database/sql.NullString",
        value_type: "string",
        value_field: "String",
        validity: Validity::NonEmptyString,
    },
    NullableShape {
        type_id: "database/sql.NullInt64",
        value_type: "int64",
        value_field: "Int64",
        validity: Validity::Always,
    },
    NullableShape {
        type_id: "database/sql.NullInt32",
        value_type: "int32",
        value_field: "Int32",
        validity: Validity::Always,
    },
    NullableShape {
        type_id: "database/sql.NullInt16",
        value_type: "int16",
        value_field: "Int16",
        validity: Validity::Always,
    },
    NullableShape {
        type_id: "database/sql.NullFloat64",
        value_type: "float64",
        value_field: "Float64",
        validity: Validity::Always,
    },
    NullableShape {
        type_id: "database/sql.NullBool",
        value_type: "bool",
        value_field: "Bool",
        validity: Validity::Always,
    },
    NullableShape {
        type_id: "database/sql.NullByte",
        value_type: "byte",
        value_field: "Byte",
        validity: Validity::Always,
    },
    NullableShape {
        type_id: "database/sql.NullTime",
        value_type: "time.Time",
        value_field: "Time",
        validity: Validity::NonZeroTime,
    },
];

/// The nullable shape a descriptor denotes, if any.
pub fn nullable_shape(descriptor: &TypeDescriptor) -> Option<&'static NullableShape> {
    let (ns, name) = descriptor.struct_ref()?;
    NULLABLE_SHAPES
        .iter()
        .find(|shape| shape.type_id.rsplit_once('.') == Some((ns, name)))
}

fn matches_value_type(descriptor: &TypeDescriptor, value_type: &str) -> bool {
    if let Some((ns, name)) = value_type.split_once('.') {
        return descriptor.struct_ref() == Some((ns, name));
    }
    if value_type == "byte" {
        return descriptor.basic_kind_name() == Some("uint8");
    }
    descriptor.basic_kind_name() == Some(value_type)
}

// ============================================================================
// Helpers
// ============================================================================

fn src_sel(f: &FieldInfo) -> String {
    format!("src.{}", f.access_path)
}

fn dst_sel(f: &FieldInfo) -> String {
    format!("dst.{}", f.access_path)
}

fn assign(dst: &str, src: &str) -> String {
    format!("{} = {}", dst, src)
}

fn cast_assign(dst: &str, ty: &str, src: &str) -> String {
    format!("{} = ({})({})", dst, ty, src)
}

fn identical(provider: &dyn TypeProvider, a: &HostType, b: &HostType) -> bool {
    provider.identical(a, b) || a.to_string() == b.to_string()
}

/// Element of a pointer type, seen through aliases and defined names.
fn pointer_elem(provider: &dyn TypeProvider, ty: &HostType) -> Option<HostType> {
    match compat::underlying(provider, ty) {
        HostType::Pointer(elem) => Some(*elem),
        _ => None,
    }
}

fn slice_elem(provider: &dyn TypeProvider, ty: &HostType) -> Option<HostType> {
    match compat::underlying(provider, ty) {
        HostType::Slice(elem) => Some(*elem),
        _ => None,
    }
}

fn is_time(descriptor: &TypeDescriptor) -> bool {
    descriptor.struct_ref() == Some(("time", "Time"))
}

fn element_kind(descriptor: &TypeDescriptor) -> Option<TypeKind> {
    descriptor.element.as_ref().map(|e| e.kind)
}

fn element_is_basic(descriptor: &TypeDescriptor) -> bool {
    descriptor.element.as_ref().is_some_and(|e| e.is_basic())
}

type StructRef<'a> = (&'a str, &'a str);

/// A record reference, directly or through one pointer. The flag is set
/// for the pointer form.
fn record_ref(descriptor: &TypeDescriptor) -> Option<(StructRef<'_>, bool)> {
    match descriptor.kind {
        TypeKind::Struct => descriptor.struct_ref().map(|r| (r, false)),
        TypeKind::Pointer => descriptor.pointee()?.struct_ref().map(|r| (r, true)),
        _ => None,
    }
}

/// A slice of records or of record pointers.
fn slice_record_ref(descriptor: &TypeDescriptor) -> Option<(StructRef<'_>, bool)> {
    record_ref(descriptor.slice_element()?)
}

/// Call `func` on `src` and store into `dst`, taking addresses and
/// dereferencing as the two sides need.
fn delegate(func: &str, src: &str, src_ptr: bool, dst: &str, dst_ptr: bool) -> String {
    match (src_ptr, dst_ptr) {
        (false, false) => format!("if v := {}(&{}); v != nil {{\n{} = *v\n}}", func, src, dst),
        (true, true) => assign(dst, &format!("{}({})", func, src)),
        (true, false) => format!("if v := {}({}); v != nil {{\n{} = *v\n}}", func, src, dst),
        (false, true) => assign(dst, &format!("{}(&{})", func, src)),
    }
}

fn slice_loop(src: &str, dst: &str, dst_type: &str, body: &str) -> String {
    format!(
        "if {src} != nil {{\n{dst} = make({dst_type}, len({src}))\nfor i := range {src} {{\n{body}\n}}\n}}"
    )
}

// ============================================================================
// Rules
// ============================================================================

fn same_type(ctx: &RuleContext<'_>, src: &FieldInfo, dst: &FieldInfo) -> Option<ConversionPlan> {
    if !identical(ctx.provider, &src.host_type, &dst.host_type) {
        return None;
    }
    Some(ConversionPlan::new(
        src,
        dst,
        ConversionStrategy::DirectAssign,
        assign(&dst_sel(dst), &src_sel(src)),
    ))
}

fn basic_cast(ctx: &RuleContext<'_>, src: &FieldInfo, dst: &FieldInfo) -> Option<ConversionPlan> {
    if !src.descriptor.is_basic() || !dst.descriptor.is_basic() {
        return None;
    }
    if identical(ctx.provider, &src.host_type, &dst.host_type)
        || !ctx.provider.convertible(&src.host_type, &dst.host_type)
    {
        return None;
    }
    Some(ConversionPlan::new(
        src,
        dst,
        ConversionStrategy::BasicCast,
        cast_assign(&dst_sel(dst), &dst.type_display, &src_sel(src)),
    ))
}

fn pointer(ctx: &RuleContext<'_>, src: &FieldInfo, dst: &FieldInfo) -> Option<ConversionPlan> {
    let p = ctx.provider;
    let s = src_sel(src);
    let d = dst_sel(dst);
    match (pointer_elem(p, &src.host_type), pointer_elem(p, &dst.host_type)) {
        (Some(src_elem), None) => {
            if identical(p, &src_elem, &dst.host_type) {
                let expr = format!("if {s} != nil {{\n{d} = *{s}\n}}");
                return Some(ConversionPlan::new(src, dst, ConversionStrategy::PointerUnwrap, expr));
            }
            if element_kind(&src.descriptor) == Some(TypeKind::Struct) {
                return None;
            }
            if p.convertible(&src_elem, &dst.host_type)
                && element_is_basic(&src.descriptor)
                && dst.descriptor.is_basic()
            {
                let expr = format!("if {s} != nil {{\n{d} = {}(*{s})\n}}", dst.type_display);
                return Some(ConversionPlan::new(src, dst, ConversionStrategy::PointerUnwrap, expr));
            }
            None
        }
        (None, Some(dst_elem)) => {
            if identical(p, &src.host_type, &dst_elem) {
                let expr = assign(&d, &format!("&{}", s));
                return Some(ConversionPlan::new(src, dst, ConversionStrategy::PointerWrap, expr));
            }
            if element_kind(&dst.descriptor) == Some(TypeKind::Struct) {
                return None;
            }
            if p.convertible(&src.host_type, &dst_elem)
                && src.descriptor.is_basic()
                && element_is_basic(&dst.descriptor)
            {
                let elem_type = dst.type_display.strip_prefix('*').unwrap_or(&dst.type_display);
                let expr = format!("{{\nv := {elem_type}({s})\n{d} = &v\n}}");
                return Some(ConversionPlan::new(src, dst, ConversionStrategy::PointerWrap, expr));
            }
            None
        }
        _ => None,
    }
}

fn nullable(_: &RuleContext<'_>, src: &FieldInfo, dst: &FieldInfo) -> Option<ConversionPlan> {
    if let Some(shape) = nullable_shape(&src.descriptor) {
        if matches_value_type(&dst.descriptor, shape.value_type) {
            let s = src_sel(src);
            let expr = format!("if {s}.Valid {{\n{} = {s}.{}\n}}", dst_sel(dst), shape.value_field);
            return Some(ConversionPlan::new(src, dst, ConversionStrategy::NullableToValue, expr));
        }
    }
    if let Some(shape) = nullable_shape(&dst.descriptor) {
        if matches_value_type(&src.descriptor, shape.value_type) {
            let s = src_sel(src);
            let expr = format!(
                "{} = {}{{{}: {}, Valid: {}}}",
                dst_sel(dst),
                dst.type_display,
                shape.value_field,
                s,
                shape.validity.expression(&s)
            );
            return Some(ConversionPlan::new(src, dst, ConversionStrategy::ValueToNullable, expr));
        }
    }
    None
}

fn time_string(_: &RuleContext<'_>, src: &FieldInfo, dst: &FieldInfo) -> Option<ConversionPlan> {
    if is_time(&src.descriptor) && dst.descriptor.is_string() {
        let expr = assign(&dst_sel(dst), &format!("{}.Format(time.RFC3339)", src_sel(src)));
        return Some(ConversionPlan::new(src, dst, ConversionStrategy::TimeToString, expr));
    }
    if src.descriptor.is_string() && is_time(&dst.descriptor) {
        let expr = format!(
            "if parsed, err := time.Parse(time.RFC3339, {}); err == nil {{\n{} = parsed\n}}",
            src_sel(src),
            dst_sel(dst)
        );
        return Some(ConversionPlan::new(src, dst, ConversionStrategy::StringToTime, expr));
    }
    None
}

fn nested_struct(ctx: &RuleContext<'_>, src: &FieldInfo, dst: &FieldInfo) -> Option<ConversionPlan> {
    let nested = ctx.nested.filter(|n| !n.is_empty())?;
    let s = src_sel(src);
    let d = dst_sel(dst);

    if let (Some((src_ref, src_ptr)), Some((dst_ref, dst_ptr))) =
        (record_ref(&src.descriptor), record_ref(&dst.descriptor))
    {
        if !nested.contains(src_ref, dst_ref) {
            return None;
        }
        let func = converter_name(src_ref.0, src_ref.1, dst_ref.0, dst_ref.1);
        let strategy = if src_ptr || dst_ptr {
            ConversionStrategy::NestedStructPointerConvert
        } else {
            ConversionStrategy::NestedStructConvert
        };
        let expr = delegate(&func, &s, src_ptr, &d, dst_ptr);
        return Some(ConversionPlan::new(src, dst, strategy, expr));
    }

    if let (Some((src_ref, src_ptr)), Some((dst_ref, dst_ptr))) =
        (slice_record_ref(&src.descriptor), slice_record_ref(&dst.descriptor))
    {
        if !nested.contains(src_ref, dst_ref) {
            return None;
        }
        let func = converter_name(src_ref.0, src_ref.1, dst_ref.0, dst_ref.1);
        let body = delegate(
            &func,
            &format!("{}[i]", s),
            src_ptr,
            &format!("{}[i]", d),
            dst_ptr,
        );
        let expr = slice_loop(&s, &d, &dst.type_display, &body);
        return Some(ConversionPlan::new(src, dst, ConversionStrategy::NestedSliceConvert, expr));
    }

    None
}

fn slice_convert(ctx: &RuleContext<'_>, src: &FieldInfo, dst: &FieldInfo) -> Option<ConversionPlan> {
    let p = ctx.provider;
    let src_elem = slice_elem(p, &src.host_type)?;
    let dst_elem = slice_elem(p, &dst.host_type)?;
    let (Some(src_kind), Some(dst_kind)) = (element_kind(&src.descriptor), element_kind(&dst.descriptor)) else {
        return None;
    };
    if src_kind == TypeKind::Struct || dst_kind == TypeKind::Struct {
        return None;
    }
    let same = identical(p, &src_elem, &dst_elem);
    if !same && !p.convertible(&src_elem, &dst_elem) {
        return None;
    }

    let s = src_sel(src);
    let d = dst_sel(dst);
    let (strategy, body) = if same {
        (ConversionStrategy::DirectAssign, format!("{d}[i] = {s}[i]"))
    } else {
        let elem_type = dst.type_display.strip_prefix("[]").unwrap_or(&dst.type_display);
        (
            ConversionStrategy::SliceElementConvert,
            format!("{d}[i] = {elem_type}({s}[i])"),
        )
    };
    let expr = slice_loop(&s, &d, &dst.type_display, &body);
    Some(ConversionPlan::new(src, dst, strategy, expr))
}

fn stringer(ctx: &RuleContext<'_>, src: &FieldInfo, dst: &FieldInfo) -> Option<ConversionPlan> {
    if !dst.descriptor.is_string() || !ctx.provider.supports_stringer(&src.host_type) {
        return None;
    }
    let s = src_sel(src);
    let d = dst_sel(dst);
    let expr = if pointer_elem(ctx.provider, &src.host_type).is_some() {
        format!("if {s} != nil {{\n{d} = {s}.String()\n}}")
    } else {
        assign(&d, &format!("{}.String()", s))
    };
    Some(ConversionPlan::new(src, dst, ConversionStrategy::CustomMethodCall, expr))
}

fn assignable(ctx: &RuleContext<'_>, src: &FieldInfo, dst: &FieldInfo) -> Option<ConversionPlan> {
    if !ctx.provider.assignable(&src.host_type, &dst.host_type) {
        return None;
    }
    Some(ConversionPlan::new(
        src,
        dst,
        ConversionStrategy::DirectAssign,
        assign(&dst_sel(dst), &src_sel(src)),
    ))
}

fn convertible(ctx: &RuleContext<'_>, src: &FieldInfo, dst: &FieldInfo) -> Option<ConversionPlan> {
    let fallback = |d: &TypeDescriptor| matches!(d.kind, TypeKind::Basic | TypeKind::Struct);
    if !fallback(&src.descriptor) || !fallback(&dst.descriptor) {
        return None;
    }
    if !ctx.provider.convertible(&src.host_type, &dst.host_type) {
        return None;
    }
    Some(ConversionPlan::new(
        src,
        dst,
        ConversionStrategy::BasicCast,
        cast_assign(&dst_sel(dst), &dst.type_display, &src_sel(src)),
    ))
}
