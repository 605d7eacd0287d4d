//! CP-007: Recursive record discovery.
//!
//! Resolves a root record, flattens it, and follows every field that
//! refers to another record (through any pointer / slice wrappers) as long
//! as the referenced namespace is inside the boundary: the current
//! namespace, the root module, or a sub-path of the root module.
//!
//! Output is leaf-first. A record is marked visited before its references
//! are followed, so self and mutual references terminate.

use super::descriptor;
use super::error::{DiscoveryError, ProviderError};
use super::flatten::flatten;
use super::provider::{NamespaceInfo, TypeProvider};
use super::types::{HostType, RecordInfo, RecordKey};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Traversal state owned by one top-level [`discover`] call.
struct DiscoveryContext<'p, P: ?Sized> {
    provider: &'p P,
    visited: FxHashSet<RecordKey>,
    namespaces: FxHashMap<String, NamespaceInfo>,
    root_module: Option<String>,
    result: Vec<Arc<RecordInfo>>,
}

/// Discover `name` in `namespace` and every record it reaches, leaf-first.
pub fn discover<P: TypeProvider + ?Sized>(
    provider: &P,
    namespace: &str,
    name: &str,
) -> Result<Vec<Arc<RecordInfo>>, DiscoveryError> {
    let mut ctx = DiscoveryContext {
        provider,
        visited: FxHashSet::default(),
        namespaces: FxHashMap::default(),
        root_module: None,
        result: Vec::new(),
    };
    let root = ctx.load(namespace)?;
    ctx.root_module = root.module_path.filter(|m| !m.is_empty());
    ctx.visit(namespace, name)?;
    debug!(
        namespace,
        name,
        records = ctx.result.len(),
        "discovery complete"
    );
    Ok(ctx.result)
}

/// Resolve and flatten a single record without following references.
pub fn resolve_record<P: TypeProvider + ?Sized>(
    provider: &P,
    namespace: &str,
    name: &str,
) -> Result<RecordInfo, DiscoveryError> {
    let info = provider.load(namespace)?;
    build_record(provider, &info, name)
}

fn build_record<P: TypeProvider + ?Sized>(
    provider: &P,
    info: &NamespaceInfo,
    name: &str,
) -> Result<RecordInfo, DiscoveryError> {
    if provider.lookup(&info.path, name).is_none() {
        return Err(DiscoveryError::NotFound {
            namespace: info.path.clone(),
            name: name.to_string(),
        });
    }
    let ty = HostType::named(info.path.as_str(), name);
    let fields = descriptor::struct_fields(provider, &ty).ok_or_else(|| DiscoveryError::NotAStruct {
        namespace: info.path.clone(),
        name: name.to_string(),
    })?;
    let key = RecordKey::new(info.path.as_str(), name);
    Ok(RecordInfo {
        name: name.to_string(),
        namespace: info.path.clone(),
        namespace_local_name: info.local_name.clone(),
        fields: flatten(provider, &key, &fields),
    })
}

impl<P: TypeProvider + ?Sized> DiscoveryContext<'_, P> {
    fn load(&mut self, namespace: &str) -> Result<NamespaceInfo, ProviderError> {
        if let Some(info) = self.namespaces.get(namespace) {
            return Ok(info.clone());
        }
        let info = self.provider.load(namespace)?;
        self.namespaces.insert(namespace.to_string(), info.clone());
        Ok(info)
    }

    fn visit(&mut self, namespace: &str, name: &str) -> Result<(), DiscoveryError> {
        let info = self.load(namespace)?;
        let record = build_record(self.provider, &info, name)?;
        if !self.visited.insert(record.key()) {
            return Ok(());
        }
        debug!(namespace, name, fields = record.fields.len(), "discovered record");

        for field in &record.fields {
            let Some((nested_ns, nested_name)) = descriptor::nested_record_ref(&field.descriptor) else {
                continue;
            };
            if !self.in_boundary(nested_ns, &record.namespace) {
                continue;
            }
            if self.visited.contains(&RecordKey::new(nested_ns, nested_name)) {
                continue;
            }
            match self.visit(nested_ns, nested_name) {
                Ok(()) => {}
                Err(e) if e.is_skippable() => {
                    warn!("nested record {:?} skipped: {}", nested_name, e);
                }
                Err(e) => return Err(e),
            }
        }

        self.result.push(Arc::new(record));
        Ok(())
    }

    fn in_boundary(&self, nested: &str, current: &str) -> bool {
        if nested.is_empty() {
            return false;
        }
        if nested == current {
            return true;
        }
        match &self.root_module {
            Some(module) => nested == module || nested.starts_with(&format!("{}/", module)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::Catalog;
    use crate::core::provider::TypeDecl;

    const NS: &str = "example.com/app/model";

    fn catalog() -> Catalog {
        Catalog::from_yaml(
            r#"
module: example.com/app
namespaces:
  example.com/app/model:
    types:
      Leaf:
        fields:
          - { name: Value, type: string }
      Child:
        fields:
          - { name: Leaf, type: Leaf }
      Root:
        fields:
          - { name: Child, type: Child }
          - { name: ChildPtr, type: "*Child" }
          - { name: ChildList, type: "[]Child" }
          - { name: Self, type: "*Root" }
      A:
        fields:
          - { name: B, type: "*B" }
      B:
        fields:
          - { name: A, type: "[]*A" }
      Order:
        fields:
          - { name: Lines, type: "[]*example.com/app/model/sub.Line" }
          - { name: Vendor, type: "example.com/vendor.Party" }
          - { name: CreatedAt, type: time.Time }
      Status: { underlying: string }
  example.com/app/model/sub:
    types:
      Line:
        fields:
          - { name: SKU, type: string }
  example.com/vendor:
    module: example.com/vendor
    types:
      Party:
        fields:
          - { name: Name, type: string }
"#,
        )
        .unwrap()
    }

    fn names(records: &[Arc<RecordInfo>]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_cp007_leaf_first_and_cycle_safe() {
        let c = catalog();
        let records = discover(&c, NS, "Root").unwrap();
        assert_eq!(names(&records), vec!["Leaf", "Child", "Root"]);
    }

    #[test]
    fn test_cp007_mutual_reference() {
        let c = catalog();
        let records = discover(&c, NS, "A").unwrap();
        assert_eq!(names(&records), vec!["B", "A"]);
    }

    #[test]
    fn test_cp007_boundary() {
        let c = catalog();
        let records = discover(&c, NS, "Order").unwrap();
        // Sub-path of the root module is followed; other modules and the
        // standard library are not.
        assert_eq!(names(&records), vec!["Line", "Order"]);
        assert_eq!(records[0].namespace, "example.com/app/model/sub");
        assert_eq!(records[0].namespace_local_name, "sub");
    }

    #[test]
    fn test_cp007_no_module_stays_in_namespace() {
        let c = Catalog::from_yaml(
            r#"
namespaces:
  app/model:
    types:
      Order:
        fields:
          - { name: Line, type: "app/model/sub.Line" }
          - { name: Note, type: Note }
      Note:
        fields:
          - { name: Text, type: string }
  app/model/sub:
    types:
      Line:
        fields:
          - { name: SKU, type: string }
"#,
        )
        .unwrap();
        let records = discover(&c, "app/model", "Order").unwrap();
        assert_eq!(names(&records), vec!["Note", "Order"]);
    }

    #[test]
    fn test_cp007_root_not_found() {
        let c = catalog();
        let err = discover(&c, NS, "Missing").unwrap_err();
        assert!(matches!(err, DiscoveryError::NotFound { ref name, .. } if name == "Missing"));
    }

    #[test]
    fn test_cp007_root_not_a_struct() {
        let c = catalog();
        let err = discover(&c, NS, "Status").unwrap_err();
        assert!(matches!(err, DiscoveryError::NotAStruct { .. }));
    }

    #[test]
    fn test_cp007_root_namespace_missing() {
        let c = catalog();
        let err = discover(&c, "example.com/nowhere", "Root").unwrap_err();
        assert!(matches!(err, DiscoveryError::Provider(_)));
    }

    /// Catalog whose `load` fails for one namespace.
    struct Broken {
        inner: Catalog,
        broken: &'static str,
    }

    impl TypeProvider for Broken {
        fn load(&self, namespace: &str) -> Result<NamespaceInfo, ProviderError> {
            if namespace == self.broken {
                return Err(ProviderError::Unavailable {
                    namespace: namespace.to_string(),
                    reason: "compilation errors".into(),
                });
            }
            self.inner.load(namespace)
        }

        fn lookup(&self, namespace: &str, name: &str) -> Option<&TypeDecl> {
            self.inner.lookup(namespace, name)
        }
    }

    #[test]
    fn test_cp007_nested_provider_failure_is_fatal() {
        let p = Broken {
            inner: catalog(),
            broken: "example.com/app/model/sub",
        };
        let err = discover(&p, NS, "Order").unwrap_err();
        assert!(matches!(err, DiscoveryError::Provider(ProviderError::Unavailable { .. })));
    }

    #[test]
    fn test_cp007_resolve_single_record() {
        let c = catalog();
        let record = resolve_record(&c, NS, "Root").unwrap();
        assert_eq!(record.fields.len(), 4);
        assert_eq!(record.qualified_name(), "model.Root");
    }

    #[test]
    fn test_cp007_each_record_once() {
        let c = catalog();
        let records = discover(&c, NS, "Root").unwrap();
        let mut keys: Vec<RecordKey> = records.iter().map(|r| r.key()).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), records.len());
    }
}
