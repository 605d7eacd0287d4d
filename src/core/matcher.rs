//! CP-008: Field and record matching.
//!
//! Fields pair by case-insensitive name, records by exact name.

use super::types::{FieldInfo, FieldPair, RecordInfo, RecordPair};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// Pair the fields of `src` and `dst`, in source order.
///
/// Ignore entries are trimmed and compared case-insensitively. When the
/// destination has duplicate lower-cased names the last one wins.
pub fn match_fields(src: &RecordInfo, dst: &RecordInfo, ignore: &[String]) -> Vec<FieldPair> {
    let ignore: FxHashSet<String> = ignore
        .iter()
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty())
        .collect();

    let dst_index: FxHashMap<String, &FieldInfo> = dst
        .fields
        .iter()
        .map(|f| (f.name.to_lowercase(), f))
        .collect();

    src.fields
        .iter()
        .filter_map(|sf| {
            let key = sf.name.to_lowercase();
            if ignore.contains(&key) {
                return None;
            }
            dst_index.get(&key).map(|df| FieldPair {
                src: sf.clone(),
                dst: (*df).clone(),
            })
        })
        .collect()
}

/// Pair records by exact name. Inputs are leaf-first; the result is
/// root-first.
pub fn match_records(src: &[Arc<RecordInfo>], dst: &[Arc<RecordInfo>]) -> Vec<RecordPair> {
    let dst_index: FxHashMap<&str, &Arc<RecordInfo>> =
        dst.iter().map(|d| (d.name.as_str(), d)).collect();

    let mut pairs: Vec<RecordPair> = src
        .iter()
        .filter_map(|s| {
            dst_index
                .get(s.name.as_str())
                .map(|d| RecordPair::new(Arc::clone(s), Arc::clone(d)))
        })
        .collect();
    pairs.reverse();
    pairs
}
