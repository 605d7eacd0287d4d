//! CP-010: Conversion rule resolution.
//!
//! A [`Resolver`] owns an ordered rule list. For each field pair the first
//! rule that produces a plan wins; when none does the pair becomes a Skip
//! plan. The nested pair set is rebuilt from the record pairs at the start
//! of every batch and handed only to rules that declare they need it.

use super::provider::TypeProvider;
use super::rules;
use super::types::{ConversionPlan, FieldInfo, FieldPair, RecordPair};
use rustc_hash::FxHashSet;

/// Identity of one converter direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NestedPairKey {
    pub src_namespace: String,
    pub src_name: String,
    pub dst_namespace: String,
    pub dst_name: String,
}

impl NestedPairKey {
    pub fn new(src: (&str, &str), dst: (&str, &str)) -> Self {
        Self {
            src_namespace: src.0.to_string(),
            src_name: src.1.to_string(),
            dst_namespace: dst.0.to_string(),
            dst_name: dst.1.to_string(),
        }
    }

    pub fn from_pair(pair: &RecordPair) -> Self {
        Self::new(
            (&pair.src.namespace, &pair.src.name),
            (&pair.dst.namespace, &pair.dst.name),
        )
    }
}

/// Record pairs that have a generated converter in the current batch.
#[derive(Debug, Clone, Default)]
pub struct NestedPairSet {
    keys: FxHashSet<NestedPairKey>,
}

impl NestedPairSet {
    /// Replace the contents with the given pairs, reusing the allocation.
    pub fn rebuild(&mut self, pairs: &[RecordPair]) {
        self.keys.clear();
        self.keys.extend(pairs.iter().map(NestedPairKey::from_pair));
    }

    pub fn contains(&self, src: (&str, &str), dst: (&str, &str)) -> bool {
        self.keys.contains(&NestedPairKey::new(src, dst))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// What a rule sees besides the two fields.
pub struct RuleContext<'a> {
    pub provider: &'a dyn TypeProvider,
    /// Present only for rules with `needs_nested_set`.
    pub nested: Option<&'a NestedPairSet>,
}

/// One conversion rule: a named precondition-and-builder.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub needs_nested_set: bool,
    pub try_convert: fn(&RuleContext<'_>, &FieldInfo, &FieldInfo) -> Option<ConversionPlan>,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("needs_nested_set", &self.needs_nested_set)
            .finish()
    }
}

/// Ordered rule chain plus the nested pair set of the current batch.
#[derive(Debug, Clone)]
pub struct Resolver {
    rules: Vec<Rule>,
    nested: NestedPairSet,
}

impl Resolver {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            nested: NestedPairSet::default(),
        }
    }

    /// Resolver with the built-in rules in priority order.
    pub fn with_default_rules() -> Self {
        Self::new(rules::default_rules())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Resolve a batch of field pairs. Always one plan per pair, in order.
    pub fn resolve(
        &mut self,
        provider: &dyn TypeProvider,
        pairs: &[FieldPair],
        record_pairs: &[RecordPair],
    ) -> Vec<ConversionPlan> {
        self.nested.rebuild(record_pairs);
        tracing::debug!(fields = pairs.len(), nested = self.nested.len(), "resolving batch");
        pairs
            .iter()
            .map(|pair| self.resolve_one(provider, pair))
            .collect()
    }

    fn resolve_one(&self, provider: &dyn TypeProvider, pair: &FieldPair) -> ConversionPlan {
        for rule in &self.rules {
            let ctx = RuleContext {
                provider,
                nested: rule.needs_nested_set.then_some(&self.nested),
            };
            if let Some(plan) = (rule.try_convert)(&ctx, &pair.src, &pair.dst) {
                tracing::debug!(
                    rule = rule.name,
                    src = %pair.src.access_path,
                    dst = %pair.dst.access_path,
                    "resolved field"
                );
                return plan;
            }
        }
        ConversionPlan::skip(&pair.src, &pair.dst)
    }
}
