//! CP-009: Converter function naming.
//!
//! A pure function of the two record identities. Rules compute it
//! independently when emitting delegating calls, so it must never depend
//! on state.

/// Placeholder token for namespaces without a usable segment.
const FALLBACK_TOKEN: &str = "Pkg";

/// Name of the generated converter from `src_name` to `dst_name`.
pub fn converter_name(src_namespace: &str, src_name: &str, dst_namespace: &str, dst_name: &str) -> String {
    if src_name != dst_name {
        return format!("Convert{}To{}", src_name, dst_name);
    }
    format!(
        "Convert{}{}To{}{}",
        namespace_token(src_namespace),
        src_name,
        namespace_token(dst_namespace),
        dst_name
    )
}

/// Title-cased, concatenated alphanumeric parts of the last path segment.
fn namespace_token(namespace: &str) -> String {
    let base = namespace.trim().trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    let token: String = base
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();
    if token.is_empty() {
        return FALLBACK_TOKEN.to_string();
    }
    token
}
