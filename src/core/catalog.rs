//! CP-005: Catalog: an in-memory type provider built from YAML.
//!
//! The catalog declares namespaces and their named types. `time` and
//! `database/sql` are always present so timestamp and nullable fields
//! resolve without being declared.

use super::error::{CatalogError, ProviderError};
use super::parser::{parse_catalog, parse_type_expr};
use super::provider::{default_local_name, MethodSig, NamespaceInfo, TypeDecl, TypeDef, TypeProvider};
use super::types::{BasicKind, HostType, StructField};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// YAML schema
// ============================================================================

/// Top-level catalog file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Module path applied to every namespace without its own `module`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    #[serde(default)]
    pub namespaces: IndexMap<String, NamespaceConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamespaceConfig {
    /// Qualifier used from other namespaces. Defaults to the last path segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    #[serde(default)]
    pub types: IndexMap<String, TypeConfig>,
}

/// A named type: exactly one of `fields`, `underlying`, `alias`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldConfig>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlying: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<MethodConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub ty: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub embedded: bool,

    /// Overrides the leading-uppercase export convention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

impl FieldConfig {
    /// Declared name, or the base type name for embedded members.
    pub fn effective_name(&self) -> Option<String> {
        if let Some(name) = &self.name {
            return Some(name.clone());
        }
        if !self.embedded {
            return None;
        }
        let base = self.ty.trim().trim_start_matches('*');
        let name = base.rsplit_once('.').map_or(base, |(_, n)| n);
        (!name.is_empty()).then(|| name.to_string())
    }

    fn is_visible(&self, name: &str) -> bool {
        self.visible
            .unwrap_or_else(|| name.chars().next().is_some_and(char::is_uppercase))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pointer_receiver: bool,
}

// ============================================================================
// Provider
// ============================================================================

#[derive(Debug, Clone)]
struct NamespaceEntry {
    info: NamespaceInfo,
    decls: IndexMap<String, TypeDecl>,
}

/// In-memory [`TypeProvider`].
#[derive(Debug, Clone)]
pub struct Catalog {
    namespaces: FxHashMap<String, NamespaceEntry>,
    /// Declaration order of namespace paths, builtins first.
    order: Vec<String>,
}

impl Catalog {
    /// Parse and build without validation.
    pub fn from_yaml(yaml: &str) -> Result<Self, CatalogError> {
        Self::build(&parse_catalog(yaml)?)
    }

    /// Build from parsed config. Fails on the first unparseable type
    /// expression; reference and cycle checks belong to validation.
    pub fn build(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let mut catalog = Self::with_builtins();
        for (path, ns) in &config.namespaces {
            let module_path = ns.module.clone().or_else(|| config.module.clone());
            let local_name = ns.name.clone().unwrap_or_else(|| default_local_name(path));
            let mut decls = IndexMap::new();
            for (name, ty) in &ns.types {
                decls.insert(name.clone(), build_decl(path, name, ty)?);
            }
            catalog.insert(
                NamespaceInfo {
                    path: path.clone(),
                    local_name,
                    module_path,
                },
                decls,
            );
        }
        Ok(catalog)
    }

    /// Only the builtin namespaces.
    pub fn with_builtins() -> Self {
        let mut catalog = Self {
            namespaces: FxHashMap::default(),
            order: Vec::new(),
        };
        for (info, decls) in builtin_namespaces() {
            let decls = decls.into_iter().map(|d| (d.name.clone(), d)).collect();
            catalog.insert(info, decls);
        }
        catalog
    }

    /// Declared namespaces merge into an existing entry of the same path.
    fn insert(&mut self, info: NamespaceInfo, decls: IndexMap<String, TypeDecl>) {
        match self.namespaces.get_mut(&info.path) {
            Some(entry) => {
                entry.info = info;
                entry.decls.extend(decls);
            }
            None => {
                self.order.push(info.path.clone());
                self.namespaces
                    .insert(info.path.clone(), NamespaceEntry { info, decls });
            }
        }
    }

    /// Namespace paths in declaration order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Declarations of one namespace in declaration order.
    pub fn declarations(&self, namespace: &str) -> impl Iterator<Item = &TypeDecl> {
        self.namespaces
            .get(namespace)
            .into_iter()
            .flat_map(|entry| entry.decls.values())
    }

    pub fn type_count(&self) -> usize {
        self.namespaces.values().map(|e| e.decls.len()).sum()
    }
}

impl TypeProvider for Catalog {
    fn load(&self, namespace: &str) -> Result<NamespaceInfo, ProviderError> {
        self.namespaces
            .get(namespace)
            .map(|entry| entry.info.clone())
            .ok_or_else(|| ProviderError::NamespaceNotFound {
                namespace: namespace.to_string(),
            })
    }

    fn lookup(&self, namespace: &str, name: &str) -> Option<&TypeDecl> {
        self.namespaces.get(namespace)?.decls.get(name)
    }

    fn local_name(&self, namespace: &str) -> String {
        match self.namespaces.get(namespace) {
            Some(entry) => entry.info.local_name.clone(),
            None => default_local_name(namespace),
        }
    }
}

fn build_decl(namespace: &str, name: &str, config: &TypeConfig) -> Result<TypeDecl, CatalogError> {
    let def = if let Some(target) = &config.alias {
        TypeDef::Alias(parse_type_expr(target, namespace)?)
    } else if let Some(under) = &config.underlying {
        TypeDef::Defined(parse_type_expr(under, namespace)?)
    } else {
        let mut fields = Vec::new();
        for field in config.fields.iter().flatten() {
            let ty = parse_type_expr(&field.ty, namespace)?;
            let name = field.effective_name().unwrap_or_default();
            fields.push(StructField {
                visible: field.is_visible(&name),
                name,
                ty,
                embedded: field.embedded,
            });
        }
        TypeDef::Defined(HostType::Struct(fields))
    };

    let mut methods = Vec::new();
    for m in &config.methods {
        let params = m
            .params
            .iter()
            .map(|p| parse_type_expr(p, namespace))
            .collect::<Result<Vec<_>, _>>()?;
        let returns = match &m.returns {
            Some(r) => vec![parse_type_expr(r, namespace)?],
            None => Vec::new(),
        };
        methods.push(MethodSig {
            name: m.name.clone(),
            params,
            returns,
            pointer_receiver: m.pointer_receiver,
        });
    }

    Ok(TypeDecl {
        namespace: namespace.to_string(),
        name: name.to_string(),
        def,
        methods,
    })
}

// ============================================================================
// Builtins
// ============================================================================

fn field(name: &str, ty: HostType) -> StructField {
    StructField {
        visible: name.chars().next().is_some_and(char::is_uppercase),
        name: name.to_string(),
        ty,
        embedded: false,
    }
}

fn method(name: &str, params: Vec<HostType>, returns: Vec<HostType>) -> MethodSig {
    MethodSig {
        name: name.to_string(),
        params,
        returns,
        pointer_receiver: false,
    }
}

fn decl(namespace: &str, name: &str, def: TypeDef, methods: Vec<MethodSig>) -> TypeDecl {
    TypeDecl {
        namespace: namespace.to_string(),
        name: name.to_string(),
        def,
        methods,
    }
}

fn basic(kind: BasicKind) -> HostType {
    HostType::Basic(kind)
}

fn builtin_namespaces() -> Vec<(NamespaceInfo, Vec<TypeDecl>)> {
    let string = || basic(BasicKind::String);
    let stringer = || method("String", vec![], vec![string()]);

    let time = vec![
        decl(
            "time",
            "Time",
            TypeDef::Defined(HostType::Struct(vec![
                field("wall", basic(BasicKind::Uint64)),
                field("ext", basic(BasicKind::Int64)),
                field("loc", HostType::pointer(HostType::named("time", "Location"))),
            ])),
            vec![
                stringer(),
                method("IsZero", vec![], vec![basic(BasicKind::Bool)]),
                method("Format", vec![string()], vec![string()]),
                method("Unix", vec![], vec![basic(BasicKind::Int64)]),
            ],
        ),
        decl(
            "time",
            "Location",
            TypeDef::Defined(HostType::Struct(vec![field("name", string())])),
            vec![MethodSig {
                pointer_receiver: true,
                ..stringer()
            }],
        ),
        decl(
            "time",
            "Duration",
            TypeDef::Defined(basic(BasicKind::Int64)),
            vec![stringer()],
        ),
        decl(
            "time",
            "Month",
            TypeDef::Defined(basic(BasicKind::Int)),
            vec![stringer()],
        ),
    ];

    let nullable = |name: &str, payload: &str, ty: HostType| {
        decl(
            "database/sql",
            name,
            TypeDef::Defined(HostType::Struct(vec![
                field(payload, ty),
                field("Valid", basic(BasicKind::Bool)),
            ])),
            vec![],
        )
    };
    let sql = vec![
        nullable("NullString", "String", string()),
        nullable("NullInt64", "Int64", basic(BasicKind::Int64)),
        nullable("NullInt32", "Int32", basic(BasicKind::Int32)),
        nullable("NullInt16", "Int16", basic(BasicKind::Int16)),
        nullable("NullFloat64", "Float64", basic(BasicKind::Float64)),
        nullable("NullBool", "Bool", basic(BasicKind::Bool)),
        nullable("NullByte", "Byte", basic(BasicKind::Uint8)),
        nullable("NullTime", "Time", HostType::named("time", "Time")),
    ];

    vec![
        (
            NamespaceInfo {
                path: "time".into(),
                local_name: "time".into(),
                module_path: None,
            },
            time,
        ),
        (
            NamespaceInfo {
                path: "database/sql".into(),
                local_name: "sql".into(),
                module_path: None,
            },
            sql,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
module: example.com/app
namespaces:
  example.com/app/model:
    types:
      Base:
        fields:
          - { name: ID, type: int }
      User:
        fields:
          - { type: "*Base", embedded: true }
          - { name: Name, type: string }
          - { name: secret, type: string }
          - { name: Hidden, type: string, visible: false }
  example.com/app/api-v2:
    name: apiv2
    module: example.com/api
    types:
      UserID: { alias: int }
"#;

    #[test]
    fn test_cp005_builtins_present() {
        let c = Catalog::with_builtins();
        assert!(c.lookup("time", "Time").is_some());
        assert!(c.lookup("database/sql", "NullTime").is_some());
        assert_eq!(c.local_name("database/sql"), "sql");
        assert_eq!(c.namespaces().collect::<Vec<_>>(), vec!["time", "database/sql"]);
    }

    #[test]
    fn test_cp005_time_fields_are_unexported() {
        let c = Catalog::with_builtins();
        let TypeDef::Defined(HostType::Struct(fields)) = &c.lookup("time", "Time").unwrap().def else {
            panic!("time.Time must be a struct");
        };
        assert!(fields.iter().all(|f| !f.visible));
    }

    #[test]
    fn test_cp005_load_namespace_info() {
        let c = Catalog::from_yaml(YAML).unwrap();
        let info = c.load("example.com/app/model").unwrap();
        assert_eq!(info.local_name, "model");
        assert_eq!(info.module_path.as_deref(), Some("example.com/app"));

        let api = c.load("example.com/app/api-v2").unwrap();
        assert_eq!(api.local_name, "apiv2");
        assert_eq!(api.module_path.as_deref(), Some("example.com/api"));
        assert_eq!(c.local_name("example.com/app/api-v2"), "apiv2");
    }

    #[test]
    fn test_cp005_load_missing_namespace() {
        let c = Catalog::from_yaml(YAML).unwrap();
        let err = c.load("example.com/nowhere").unwrap_err();
        assert_eq!(
            err,
            ProviderError::NamespaceNotFound {
                namespace: "example.com/nowhere".into()
            }
        );
    }

    #[test]
    fn test_cp005_field_defaults() {
        let c = Catalog::from_yaml(YAML).unwrap();
        let decl = c.lookup("example.com/app/model", "User").unwrap();
        let TypeDef::Defined(HostType::Struct(fields)) = &decl.def else {
            panic!("User must be a struct");
        };
        assert_eq!(fields[0].name, "Base");
        assert!(fields[0].embedded);
        assert_eq!(
            fields[0].ty,
            HostType::pointer(HostType::named("example.com/app/model", "Base"))
        );
        assert!(fields[1].visible);
        assert!(!fields[2].visible);
        assert!(!fields[3].visible);
    }

    #[test]
    fn test_cp005_alias_declaration() {
        let c = Catalog::from_yaml(YAML).unwrap();
        let decl = c.lookup("example.com/app/api-v2", "UserID").unwrap();
        assert!(decl.is_alias());
        assert_eq!(decl.def, TypeDef::Alias(HostType::Basic(BasicKind::Int)));
    }

    #[test]
    fn test_cp005_declared_namespace_extends_builtin() {
        let c = Catalog::from_yaml(
            r#"
namespaces:
  time:
    types:
      Weekday: { underlying: int }
"#,
        )
        .unwrap();
        assert!(c.lookup("time", "Weekday").is_some());
        assert!(c.lookup("time", "Time").is_some());
        assert_eq!(c.namespaces().filter(|n| *n == "time").count(), 1);
    }

    #[test]
    fn test_cp005_bad_expression_fails_build() {
        let err = Catalog::from_yaml(
            r#"
namespaces:
  m:
    types:
      X: { underlying: "map[int" }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::TypeExpr { .. }));
    }

    #[test]
    fn test_cp005_type_count() {
        let c = Catalog::from_yaml(YAML).unwrap();
        let builtins = Catalog::with_builtins().type_count();
        assert_eq!(c.type_count(), builtins + 3);
        assert_eq!(c.declarations("example.com/app/model").count(), 2);
    }
}
