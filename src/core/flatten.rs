//! CP-006: Field flattening.
//!
//! Embedded members are expanded in place, one level deeper each time.
//! Candidates are keyed by lower-cased name: the shallowest wins, and two
//! candidates at the same depth with different access paths cancel out.
//! Output keeps first-seen order, ties broken by name.

use super::descriptor;
use super::provider::TypeProvider;
use super::types::{FieldInfo, RecordKey, StructField};
use rustc_hash::{FxHashMap, FxHashSet};

struct Candidate {
    field: FieldInfo,
    depth: usize,
    order: usize,
    ambiguous: bool,
}

struct Collector<'p, P: ?Sized> {
    provider: &'p P,
    /// Namespace the record is declared in; type text is rendered from here.
    namespace: &'p str,
    candidates: FxHashMap<String, Candidate>,
    next_order: usize,
    /// Records on the current embedding path.
    path: FxHashSet<RecordKey>,
}

/// Flatten the fields of `record` into its visible field list.
pub fn flatten<P: TypeProvider + ?Sized>(
    provider: &P,
    record: &RecordKey,
    fields: &[StructField],
) -> Vec<FieldInfo> {
    let mut collector = Collector {
        provider,
        namespace: &record.namespace,
        candidates: FxHashMap::default(),
        next_order: 0,
        path: FxHashSet::default(),
    };
    collector.path.insert(record.clone());
    collector.collect(fields, &[], "", 0);

    let mut sorted: Vec<Candidate> = collector
        .candidates
        .into_values()
        .filter(|c| !c.ambiguous)
        .collect();
    sorted.sort_by(|a, b| {
        a.order
            .cmp(&b.order)
            .then_with(|| a.field.name.cmp(&b.field.name))
    });
    sorted.into_iter().map(|c| c.field).collect()
}

impl<P: TypeProvider + ?Sized> Collector<'_, P> {
    fn collect(&mut self, fields: &[StructField], prefix: &[&str], embedded_from: &str, depth: usize) {
        for f in fields {
            if f.embedded {
                let Some((inner, type_name, namespace)) = descriptor::embedded_record(self.provider, &f.ty)
                else {
                    continue;
                };
                let key = RecordKey::new(namespace, type_name.clone());
                if !self.path.insert(key.clone()) {
                    continue;
                }
                let mut next: Vec<&str> = prefix.to_vec();
                next.push(&f.name);
                self.collect(&inner, &next, &type_name, depth + 1);
                self.path.remove(&key);
                continue;
            }
            if !f.visible {
                continue;
            }

            let access_path = if prefix.is_empty() {
                f.name.clone()
            } else {
                format!("{}.{}", prefix.join("."), f.name)
            };
            let field = FieldInfo {
                name: f.name.clone(),
                access_path,
                type_display: descriptor::render(self.provider, &f.ty, self.namespace),
                descriptor: descriptor::classify(self.provider, &f.ty),
                host_type: f.ty.clone(),
                visible: true,
                embedded_from: embedded_from.to_string(),
            };
            self.add(field, depth);
        }
    }

    fn add(&mut self, field: FieldInfo, depth: usize) {
        let key = field.name.to_lowercase();
        if let Some(existing) = self.candidates.get_mut(&key) {
            if depth > existing.depth {
                return;
            }
            if depth == existing.depth {
                if existing.field.access_path != field.access_path {
                    existing.ambiguous = true;
                }
                return;
            }
        }
        let order = self.next_order;
        self.next_order += 1;
        self.candidates.insert(
            key,
            Candidate {
                field,
                depth,
                order,
                ambiguous: false,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::Catalog;
    use crate::core::types::{BasicKind, HostType};
    use proptest::prelude::*;

    const NS: &str = "example.com/app/model";

    fn catalog() -> Catalog {
        Catalog::from_yaml(
            r#"
namespaces:
  example.com/app/model:
    types:
      Base:
        fields:
          - { name: ID, type: int }
          - { name: Name, type: string }
      InnerA:
        fields:
          - { name: Code, type: string }
      InnerB:
        fields:
          - { name: Code, type: string }
      User:
        fields:
          - { type: Base, embedded: true }
          - { type: InnerA, embedded: true }
          - { type: InnerB, embedded: true }
          - { name: Name, type: string }
          - { name: Email, type: string }
          - { name: hidden, type: string }
      Deep:
        fields:
          - { type: "*User", embedded: true }
          - { name: Code, type: int }
      Node:
        fields:
          - { type: "*Node", embedded: true }
          - { name: Value, type: string }
      BaseAlias: { alias: Base }
      Aliased:
        fields:
          - { type: BaseAlias, embedded: true }
      Opaque: { underlying: string }
      WithOpaque:
        fields:
          - { type: Opaque, embedded: true }
          - { name: Note, type: string }
"#,
        )
        .unwrap()
    }

    fn fields_of(c: &Catalog, name: &str) -> Vec<FieldInfo> {
        let ty = HostType::named(NS, name);
        let fields = descriptor::struct_fields(c, &ty).unwrap();
        flatten(c, &RecordKey::new(NS, name), &fields)
    }

    fn names(fields: &[FieldInfo]) -> Vec<&str> {
        fields.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_cp006_embedding_scenario() {
        let c = catalog();
        let fields = fields_of(&c, "User");
        assert_eq!(names(&fields), vec!["ID", "Name", "Email"]);
        assert_eq!(fields[0].access_path, "Base.ID");
        assert_eq!(fields[0].embedded_from, "Base");
        // Direct Name shadows Base.Name.
        assert_eq!(fields[1].access_path, "Name");
        assert!(fields[1].embedded_from.is_empty());
    }

    #[test]
    fn test_cp006_shallow_field_resolves_deeper_ambiguity() {
        let c = catalog();
        let fields = fields_of(&c, "Deep");
        let code = fields.iter().find(|f| f.name == "Code").unwrap();
        assert_eq!(code.access_path, "Code");
        assert_eq!(code.descriptor.basic_kind, Some(BasicKind::Int));
        let id = fields.iter().find(|f| f.name == "ID").unwrap();
        assert_eq!(id.access_path, "User.Base.ID");
    }

    #[test]
    fn test_cp006_self_embedding_terminates() {
        let c = catalog();
        let fields = fields_of(&c, "Node");
        assert_eq!(names(&fields), vec!["Value"]);
    }

    #[test]
    fn test_cp006_embedded_alias_expands() {
        let c = catalog();
        let fields = fields_of(&c, "Aliased");
        assert_eq!(names(&fields), vec!["ID", "Name"]);
        assert_eq!(fields[0].access_path, "BaseAlias.ID");
        assert_eq!(fields[0].embedded_from, "Base");
    }

    #[test]
    fn test_cp006_non_record_embed_ignored() {
        let c = catalog();
        let fields = fields_of(&c, "WithOpaque");
        assert_eq!(names(&fields), vec!["Note"]);
    }

    #[test]
    fn test_cp006_type_display_relative_to_record() {
        let c = Catalog::from_yaml(
            r#"
namespaces:
  example.com/app/model:
    types:
      Profile:
        fields:
          - { name: BirthAt, type: time.Time }
      User:
        fields:
          - { name: Profile, type: Profile }
          - { name: Ptr, type: "*Profile" }
          - { name: Tags, type: "[]string" }
          - { name: Scores, type: "map[string]int" }
"#,
        )
        .unwrap();
        let fields = fields_of(&c, "User");
        let displays: Vec<&str> = fields.iter().map(|f| f.type_display.as_str()).collect();
        assert_eq!(displays, vec!["Profile", "*Profile", "[]string", "map[string]int"]);
        let profile = fields_of(&c, "Profile");
        assert_eq!(profile[0].type_display, "time.Time");
    }

    // Property tests over a root embedding two siblings.

    const POOL: [&str; 5] = ["ID", "Name", "Code", "Email", "secret"];

    fn sample_catalog(root: &[&str], a: &[&str], b: &[&str]) -> Catalog {
        let list = |names: &[&str]| {
            names
                .iter()
                .map(|n| format!("          - {{ name: {}, type: string }}\n", n))
                .collect::<String>()
        };
        let yaml = format!(
            "namespaces:\n  {ns}:\n    types:\n      A:\n        fields:\n{a}          - {{ name: _a, type: int }}\n      B:\n        fields:\n{b}          - {{ name: _b, type: int }}\n      Root:\n        fields:\n          - {{ type: A, embedded: true }}\n          - {{ type: B, embedded: true }}\n{root}",
            ns = NS,
            a = list(a),
            b = list(b),
            root = list(root),
        );
        Catalog::from_yaml(&yaml).unwrap()
    }

    fn pool_subset() -> impl Strategy<Value = Vec<&'static str>> {
        proptest::sample::subsequence(POOL.to_vec(), 0..=POOL.len())
    }

    proptest! {
        #[test]
        fn test_cp006_flatten_is_deterministic(root in pool_subset(), a in pool_subset(), b in pool_subset()) {
            let c = sample_catalog(&root, &a, &b);
            let first = fields_of(&c, "Root");
            let second = fields_of(&c, "Root");
            prop_assert_eq!(first, second);
        }

        #[test]
        fn test_cp006_depth_priority(root in pool_subset(), a in pool_subset(), b in pool_subset()) {
            let c = sample_catalog(&root, &a, &b);
            let fields = fields_of(&c, "Root");
            for name in root.iter().filter(|n| n.starts_with(char::is_uppercase)) {
                let f = fields.iter().find(|f| f.name == *name);
                prop_assert!(f.is_some_and(|f| f.access_path == *name));
            }
        }

        #[test]
        fn test_cp006_same_depth_ambiguity(root in pool_subset(), a in pool_subset(), b in pool_subset()) {
            let c = sample_catalog(&root, &a, &b);
            let fields = fields_of(&c, "Root");
            for name in a.iter().filter(|n| b.contains(n) && !root.contains(n)) {
                prop_assert!(fields.iter().all(|f| f.name != *name));
            }
        }

        #[test]
        fn test_cp006_invisible_never_emitted(root in pool_subset(), a in pool_subset(), b in pool_subset()) {
            let c = sample_catalog(&root, &a, &b);
            let fields = fields_of(&c, "Root");
            prop_assert!(fields.iter().all(|f| f.visible && f.name.starts_with(char::is_uppercase)));
        }
    }
}
