//! CP-002: Catalog parsing and validation.
//!
//! Parses catalog YAML and validates structural constraints:
//! - Each declaration sets exactly one of `fields`, `underlying`, `alias`
//! - Non-embedded fields are named, and names are unique per declaration
//! - Every type expression parses and every named reference resolves
//! - Alias and underlying chains terminate

use super::catalog::{Catalog, CatalogConfig, TypeConfig};
use super::compat;
use super::error::{CatalogError, ValidationError};
use super::types::{BasicKind, HostType};
use rustc_hash::FxHashSet;
use std::path::Path;

/// Parse a catalog file from disk.
pub fn parse_catalog_file(path: &Path) -> Result<CatalogConfig, CatalogError> {
    let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&content)
}

/// Parse a catalog from a string.
pub fn parse_catalog(yaml: &str) -> Result<CatalogConfig, CatalogError> {
    Ok(serde_yaml_ng::from_str(yaml)?)
}

/// Parse, validate and build a catalog from disk.
pub fn load_catalog(path: &Path) -> Result<Catalog, CatalogError> {
    let config = parse_catalog_file(path)?;
    let errors = validate_catalog(&config);
    if !errors.is_empty() {
        return Err(CatalogError::Invalid(errors));
    }
    Catalog::build(&config)
}

/// Parse a type expression as written inside `namespace`.
///
/// Unqualified names refer to `namespace`; `path/to/ns.Name` is qualified.
pub fn parse_type_expr(expr: &str, namespace: &str) -> Result<HostType, CatalogError> {
    parse_expr(expr.trim(), namespace).map_err(|reason| CatalogError::TypeExpr {
        expr: expr.to_string(),
        reason,
    })
}

fn parse_expr(expr: &str, namespace: &str) -> Result<HostType, String> {
    if expr.is_empty() {
        return Err("empty type".to_string());
    }
    if let Some(rest) = expr.strip_prefix('*') {
        return Ok(HostType::pointer(parse_expr(rest.trim_start(), namespace)?));
    }
    if let Some(rest) = expr.strip_prefix("[]") {
        return Ok(HostType::slice(parse_expr(rest.trim_start(), namespace)?));
    }
    if let Some(rest) = expr.strip_prefix("map[") {
        let close = matching_bracket(rest).ok_or_else(|| "unclosed map key".to_string())?;
        let key = parse_expr(rest[..close].trim(), namespace)?;
        let value = parse_expr(rest[close + 1..].trim(), namespace)?;
        return Ok(HostType::map(key, value));
    }
    if expr == "any" || expr.replace(' ', "") == "interface{}" {
        return Ok(HostType::Interface);
    }
    if expr.starts_with("chan ")
        || expr.starts_with("<-chan ")
        || expr.starts_with("func(")
        || expr.starts_with("struct{")
        || expr.starts_with('[')
    {
        return Ok(HostType::Other(expr.to_string()));
    }
    if let Some(kind) = BasicKind::from_name(expr) {
        return Ok(HostType::Basic(kind));
    }

    let (ns, name) = match expr.rsplit_once('.') {
        Some((ns, name)) => (ns, name),
        None => (namespace, expr),
    };
    if ns.is_empty() || ns.chars().any(char::is_whitespace) {
        return Err(format!("invalid namespace in {:?}", expr));
    }
    if !is_identifier(name) {
        return Err(format!("invalid type name {:?}", name));
    }
    Ok(HostType::named(ns, name))
}

/// Index of the `]` closing an already-opened `[`.
fn matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' if depth == 0 => return Some(i),
            ']' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Validate a parsed catalog. Returns a list of errors (empty = valid).
pub fn validate_catalog(config: &CatalogConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (ns, namespace) in &config.namespaces {
        if ns.trim().is_empty() || ns.chars().any(char::is_whitespace) {
            errors.push(ValidationError::new(format!("invalid namespace path {:?}", ns)));
        }
        for (name, decl) in &namespace.types {
            if !is_identifier(name) {
                errors.push(ValidationError::new(format!(
                    "{}: invalid type name {:?}",
                    ns, name
                )));
            }
            validate_decl(ns, name, decl, &mut errors);
        }
    }

    // Reference and cycle checks need parseable expressions.
    if !errors.is_empty() {
        return errors;
    }
    let catalog = match Catalog::build(config) {
        Ok(c) => c,
        Err(e) => {
            errors.push(ValidationError::new(e.to_string()));
            return errors;
        }
    };

    for (ns, namespace) in &config.namespaces {
        for (name, decl) in &namespace.types {
            let here = format!("{}.{}", ns, name);
            for expr in decl_expressions(decl) {
                let Ok(ty) = parse_type_expr(expr, ns) else {
                    continue;
                };
                let mut unknown = Vec::new();
                collect_unknown(&catalog, &ty, &mut unknown);
                for missing in unknown {
                    errors.push(ValidationError::new(format!(
                        "{}: unknown type {}",
                        here, missing
                    )));
                }
            }
            let this = HostType::named(ns.as_str(), name.as_str());
            if decl.alias.is_some() && matches!(compat::unalias(&catalog, &this), HostType::Other(_)) {
                errors.push(ValidationError::new(format!("{}: alias cycle", here)));
            }
            if decl.underlying.is_some() && matches!(compat::underlying(&catalog, &this), HostType::Other(_)) {
                errors.push(ValidationError::new(format!(
                    "{}: underlying type does not resolve",
                    here
                )));
            }
        }
    }

    errors
}

fn validate_decl(ns: &str, name: &str, decl: &TypeConfig, errors: &mut Vec<ValidationError>) {
    let here = format!("{}.{}", ns, name);
    let set = [decl.fields.is_some(), decl.underlying.is_some(), decl.alias.is_some()]
        .iter()
        .filter(|&&b| b)
        .count();
    if set != 1 {
        errors.push(ValidationError::new(format!(
            "{}: exactly one of fields, underlying, alias must be set",
            here
        )));
    }
    if decl.alias.is_some() && !decl.methods.is_empty() {
        errors.push(ValidationError::new(format!(
            "{}: aliases cannot declare methods",
            here
        )));
    }

    let mut seen = FxHashSet::default();
    for field in decl.fields.iter().flatten() {
        match field.effective_name() {
            Some(field_name) => {
                if !seen.insert(field_name.clone()) {
                    errors.push(ValidationError::new(format!(
                        "{}: duplicate field {:?}",
                        here, field_name
                    )));
                }
            }
            None => errors.push(ValidationError::new(format!(
                "{}: field of type {:?} has no name",
                here, field.ty
            ))),
        }
    }

    for expr in decl_expressions(decl) {
        if let Err(e) = parse_type_expr(expr, ns) {
            errors.push(ValidationError::new(format!("{}: {}", here, e)));
        }
    }
}

fn decl_expressions(decl: &TypeConfig) -> Vec<&str> {
    let mut exprs: Vec<&str> = Vec::new();
    exprs.extend(decl.fields.iter().flatten().map(|f| f.ty.as_str()));
    exprs.extend(decl.underlying.as_deref());
    exprs.extend(decl.alias.as_deref());
    for method in &decl.methods {
        exprs.extend(method.params.iter().map(String::as_str));
        exprs.extend(method.returns.as_deref());
    }
    exprs
}

fn collect_unknown(catalog: &Catalog, ty: &HostType, out: &mut Vec<String>) {
    use super::provider::TypeProvider;
    match ty {
        HostType::Named { namespace, name } => {
            if catalog.lookup(namespace, name).is_none() {
                out.push(ty.to_string());
            }
        }
        HostType::Pointer(elem) | HostType::Slice(elem) => collect_unknown(catalog, elem, out),
        HostType::Map { key, value } => {
            collect_unknown(catalog, key, out);
            collect_unknown(catalog, value, out);
        }
        HostType::Struct(fields) => {
            for f in fields {
                collect_unknown(catalog, &f.ty, out);
            }
        }
        HostType::Basic(_) | HostType::Interface | HostType::Other(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "example.com/app/model";

    #[test]
    fn test_cp002_parse_type_expr_basic_and_composite() {
        assert_eq!(
            parse_type_expr("int64", NS).unwrap(),
            HostType::Basic(BasicKind::Int64)
        );
        assert_eq!(
            parse_type_expr("*[]byte", NS).unwrap(),
            HostType::pointer(HostType::slice(HostType::Basic(BasicKind::Uint8)))
        );
        assert_eq!(
            parse_type_expr("map[string][]int", NS).unwrap(),
            HostType::map(
                HostType::Basic(BasicKind::String),
                HostType::slice(HostType::Basic(BasicKind::Int))
            )
        );
        assert_eq!(parse_type_expr("any", NS).unwrap(), HostType::Interface);
        assert_eq!(parse_type_expr("interface {}", NS).unwrap(), HostType::Interface);
    }

    #[test]
    fn test_cp002_parse_type_expr_names() {
        assert_eq!(
            parse_type_expr("Address", NS).unwrap(),
            HostType::named(NS, "Address")
        );
        assert_eq!(
            parse_type_expr("time.Time", NS).unwrap(),
            HostType::named("time", "Time")
        );
        assert_eq!(
            parse_type_expr("[]*example.com/app/dto.AddressDTO", NS).unwrap(),
            HostType::slice(HostType::pointer(HostType::named(
                "example.com/app/dto",
                "AddressDTO"
            )))
        );
        assert_eq!(
            parse_type_expr("map[[2]int]string", NS).unwrap(),
            HostType::map(
                HostType::Other("[2]int".into()),
                HostType::Basic(BasicKind::String)
            )
        );
    }

    #[test]
    fn test_cp002_parse_type_expr_errors() {
        assert!(parse_type_expr("", NS).is_err());
        assert!(parse_type_expr("map[string", NS).is_err());
        assert!(parse_type_expr("9Lives", NS).is_err());
        let err = parse_type_expr("*", NS).unwrap_err();
        assert!(err.to_string().contains("invalid type expression"));
    }

    #[test]
    fn test_cp002_parse_valid() {
        let yaml = r#"
module: example.com/app
namespaces:
  example.com/app/model:
    types:
      Base:
        fields:
          - { name: ID, type: int }
      User:
        fields:
          - { type: Base, embedded: true }
          - { name: Name, type: string }
          - { name: CreatedAt, type: time.Time }
"#;
        let config = parse_catalog(yaml).unwrap();
        assert_eq!(config.module.as_deref(), Some("example.com/app"));
        let errors = validate_catalog(&config);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn test_cp002_exactly_one_definition() {
        let yaml = r#"
namespaces:
  m:
    types:
      Both:
        underlying: int
        alias: string
      Neither: {}
"#;
        let config = parse_catalog(yaml).unwrap();
        let errors = validate_catalog(&config);
        assert_eq!(
            errors
                .iter()
                .filter(|e| e.message.contains("exactly one of"))
                .count(),
            2
        );
    }

    #[test]
    fn test_cp002_unnamed_and_duplicate_fields() {
        let yaml = r#"
namespaces:
  m:
    types:
      User:
        fields:
          - { type: int }
          - { name: Name, type: string }
          - { name: Name, type: string }
"#;
        let config = parse_catalog(yaml).unwrap();
        let errors = validate_catalog(&config);
        assert!(errors.iter().any(|e| e.message.contains("has no name")));
        assert!(errors.iter().any(|e| e.message.contains("duplicate field")));
    }

    #[test]
    fn test_cp002_unknown_reference() {
        let yaml = r#"
namespaces:
  m:
    types:
      User:
        fields:
          - { name: Profile, type: "*Ghost" }
          - { name: Tags, type: "map[string]other/ns.Thing" }
"#;
        let config = parse_catalog(yaml).unwrap();
        let errors = validate_catalog(&config);
        assert!(errors.iter().any(|e| e.message.contains("unknown type m.Ghost")));
        assert!(errors.iter().any(|e| e.message.contains("unknown type other/ns.Thing")));
    }

    #[test]
    fn test_cp002_alias_cycle() {
        let yaml = r#"
namespaces:
  m:
    types:
      A: { alias: B }
      B: { alias: A }
"#;
        let config = parse_catalog(yaml).unwrap();
        let errors = validate_catalog(&config);
        assert!(errors.iter().any(|e| e.message.contains("alias cycle")));
    }

    #[test]
    fn test_cp002_bad_expression_reported() {
        let yaml = r#"
namespaces:
  m:
    types:
      User:
        fields:
          - { name: Bad, type: "map[string" }
"#;
        let config = parse_catalog(yaml).unwrap();
        let errors = validate_catalog(&config);
        assert!(errors.iter().any(|e| e.message.contains("unclosed map key")));
    }

    #[test]
    fn test_cp002_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(
            &path,
            r#"
namespaces:
  m:
    types:
      User:
        fields:
          - { name: ID, type: int }
"#,
        )
        .unwrap();
        let catalog = load_catalog(&path).unwrap();
        use crate::core::provider::TypeProvider;
        assert!(catalog.lookup("m", "User").is_some());
    }

    #[test]
    fn test_cp002_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.yaml");
        std::fs::write(&path, "namespaces:\n  m:\n    types:\n      X: {}\n").unwrap();
        let err = load_catalog(&path).unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(ref v) if v.len() == 1));
    }

    #[test]
    fn test_cp002_parse_invalid_yaml() {
        let result = parse_catalog("namespaces: 5");
        assert!(result.is_err());
    }

    #[test]
    fn test_cp002_missing_file() {
        let err = parse_catalog_file(Path::new("/nonexistent/catalog.yaml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
