//! CP-012: Plan assembly: discover, match, resolve, both directions.
//!
//! Forward plans come first in root-first record order, followed by the
//! reverse plans of every pair whose two records are not the same type.
//! Skipped fields are logged and returned alongside the plans.

use super::descriptor;
use super::discovery::discover;
use super::error::{PlanError, Side};
use super::matcher::{match_fields, match_records};
use super::naming::converter_name;
use super::provider::TypeProvider;
use super::resolver::Resolver;
use super::types::{FieldPair, RecordInfo, RecordPair, SkippedField, StructConversionPlan};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// One planning request: which records to convert and how.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub src_namespace: String,
    pub src_type: String,
    pub dst_namespace: String,
    pub dst_type: String,

    /// Name of the forward root converter, instead of the derived one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func_name: Option<String>,

    /// Source field names never paired (case-insensitive).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_fields: Vec<String>,
}

/// Result of a planning run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanOutput {
    /// Namespace the converters are rendered for (the source root's).
    pub output_namespace: String,
    pub plans: Vec<StructConversionPlan>,
    pub skipped: Vec<SkippedField>,
}

/// Plan with the built-in rules.
pub fn plan(provider: &dyn TypeProvider, request: &PlanRequest) -> Result<PlanOutput, PlanError> {
    plan_with(&mut Resolver::with_default_rules(), provider, request)
}

/// Plan with a caller-supplied resolver.
pub fn plan_with(
    resolver: &mut Resolver,
    provider: &dyn TypeProvider,
    request: &PlanRequest,
) -> Result<PlanOutput, PlanError> {
    let src_records = discover(provider, &request.src_namespace, &request.src_type).map_err(|source| {
        PlanError::Discovery {
            side: Side::Src,
            source,
        }
    })?;
    let dst_records = discover(provider, &request.dst_namespace, &request.dst_type).map_err(|source| {
        PlanError::Discovery {
            side: Side::Dst,
            source,
        }
    })?;

    let forward = ensure_root_pair(
        match_records(&src_records, &dst_records),
        src_records.last(),
        dst_records.last(),
    );
    if forward.is_empty() {
        return Err(PlanError::NoMatch {
            src: request.src_type.clone(),
            dst: request.dst_type.clone(),
        });
    }

    let output_namespace = src_records
        .last()
        .map_or_else(|| request.src_namespace.clone(), |r| r.namespace.clone());
    let mut output = PlanOutput {
        output_namespace,
        plans: Vec::with_capacity(forward.len() * 2),
        skipped: Vec::new(),
    };

    let root_name = request.func_name.as_deref().filter(|n| !n.trim().is_empty());
    append_plans(&mut output, resolver, provider, &forward, request, root_name);

    let reverse: Vec<RecordPair> = forward
        .iter()
        .filter(|p| !p.src.same_identity(&p.dst))
        .map(RecordPair::reversed)
        .collect();
    if !reverse.is_empty() {
        append_plans(&mut output, resolver, provider, &reverse, request, None);
    }

    info!(
        converters = output.plans.len(),
        skipped = output.skipped.len(),
        "planned conversions"
    );
    Ok(output)
}

/// Make sure the two requested roots are paired, first, and that no pair
/// appears twice.
fn ensure_root_pair(
    pairs: Vec<RecordPair>,
    src_root: Option<&Arc<RecordInfo>>,
    dst_root: Option<&Arc<RecordInfo>>,
) -> Vec<RecordPair> {
    let (Some(src_root), Some(dst_root)) = (src_root, dst_root) else {
        return pairs;
    };
    let found = pairs
        .iter()
        .any(|p| p.src.same_identity(src_root) && p.dst.same_identity(dst_root));
    if found {
        return pairs;
    }

    let mut seen = FxHashSet::default();
    std::iter::once(RecordPair::new(Arc::clone(src_root), Arc::clone(dst_root)))
        .chain(pairs)
        .filter(|p| seen.insert((p.src.key(), p.dst.key())))
        .collect()
}

fn append_plans(
    output: &mut PlanOutput,
    resolver: &mut Resolver,
    provider: &dyn TypeProvider,
    pairs: &[RecordPair],
    request: &PlanRequest,
    root_name: Option<&str>,
) {
    for pair in pairs {
        let field_pairs: Vec<FieldPair> = match_fields(&pair.src, &pair.dst, &request.ignore_fields)
            .into_iter()
            .map(|mut fp| {
                fp.src.type_display = descriptor::render(provider, &fp.src.host_type, &output.output_namespace);
                fp.dst.type_display = descriptor::render(provider, &fp.dst.host_type, &output.output_namespace);
                fp
            })
            .collect();
        let plans = resolver.resolve(provider, &field_pairs, pairs);

        let is_root = pair.src.name == request.src_type && pair.dst.name == request.dst_type;
        let function_name = match root_name {
            Some(name) if is_root => name.to_string(),
            _ => converter_name(&pair.src.namespace, &pair.src.name, &pair.dst.namespace, &pair.dst.name),
        };

        for plan in plans.iter().filter(|p| p.is_skip()) {
            let skipped = SkippedField {
                function_name: function_name.clone(),
                src_field: plan.src.name.clone(),
                src_type: plan.src.type_display.clone(),
                dst_field: plan.dst.name.clone(),
                dst_type: plan.dst.type_display.clone(),
            };
            warn!("{}", skipped);
            output.skipped.push(skipped);
        }

        output.plans.push(StructConversionPlan {
            src: Arc::clone(&pair.src),
            dst: Arc::clone(&pair.dst),
            function_name,
            plans,
        });
    }
}
