//! CP-013: Operator-facing rendering of plans and discovery results.
//!
//! Text output is for humans reading a terminal. Skip plans always show
//! up as a TODO line so an unconvertible field is never silently lost.

use super::catalog::Catalog;
use super::descriptor;
use super::planner::PlanOutput;
use super::provider::TypeProvider;
use super::types::{ConversionPlan, HostType, RecordInfo, StructConversionPlan};
use std::sync::Arc;

/// Marker printed in place of an expression for skipped fields.
pub const SKIP_MARKER: &str = "TODO: couldn't auto-generate";

/// Render a plan as plain text.
pub fn plan_text(output: &PlanOutput) -> String {
    let fields: usize = output.plans.iter().map(|p| p.plans.len()).sum();
    let mut lines = vec![format!(
        "Planning: {} converter(s) in {}",
        output.plans.len(),
        output.output_namespace
    )];
    for plan in &output.plans {
        lines.push(String::new());
        converter_lines(&mut lines, plan);
    }

    if !output.skipped.is_empty() {
        lines.push(String::new());
        lines.push("Skipped:".to_string());
        for s in &output.skipped {
            lines.push(format!("  {}: {}", s.function_name, s));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Plan: {} converter(s), {} field(s), {} skipped.",
        output.plans.len(),
        fields,
        output.skipped.len()
    ));
    join_lines(&lines)
}

fn converter_lines(lines: &mut Vec<String>, plan: &StructConversionPlan) {
    lines.push(format!(
        "{} ({} -> {}):",
        plan.function_name,
        plan.src.qualified_name(),
        plan.dst.qualified_name()
    ));
    if plan.plans.is_empty() {
        lines.push("  (no matching fields)".to_string());
    }
    for field in &plan.plans {
        field_lines(lines, field);
    }
}

fn field_lines(lines: &mut Vec<String>, plan: &ConversionPlan) {
    lines.push(format!(
        "  {} -> {} [{}]",
        plan.src.access_path, plan.dst.access_path, plan.strategy
    ));
    if plan.is_skip() {
        lines.push(format!(
            "      // {} {} ({}) -> {} ({})",
            SKIP_MARKER, plan.src.name, plan.src.type_display, plan.dst.name, plan.dst.type_display
        ));
        return;
    }
    lines.extend(plan.expression.lines().map(|line| format!("      {}", line)));
}

/// Lines joined with a trailing newline.
fn join_lines(lines: &[String]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Render a plan as YAML.
pub fn plan_yaml(output: &PlanOutput) -> Result<String, serde_yaml_ng::Error> {
    serde_yaml_ng::to_string(output)
}

/// Render a plan as pretty-printed JSON.
pub fn plan_json(output: &PlanOutput) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(output)
}

/// Render discovered records, one block per record, in discovery order.
pub fn records_text(records: &[Arc<RecordInfo>]) -> String {
    let mut lines = Vec::new();
    for record in records {
        lines.push(format!("{} ({})", record.qualified_name(), record.namespace));
        for f in &record.fields {
            if f.embedded_from.is_empty() {
                lines.push(format!("  {} {}", f.access_path, f.type_display));
            } else {
                lines.push(format!(
                    "  {} {}  (via {})",
                    f.access_path, f.type_display, f.embedded_from
                ));
            }
        }
    }
    lines.push(format!("{} record(s)", records.len()));
    join_lines(&lines)
}

/// Render a catalog summary: each namespace with its declarations.
pub fn catalog_text(catalog: &Catalog) -> String {
    let mut lines = Vec::new();
    for ns in catalog.namespaces() {
        lines.push(format!("{} ({})", ns, catalog.local_name(ns)));
        for decl in catalog.declarations(ns) {
            let ty = HostType::named(decl.namespace.as_str(), decl.name.as_str());
            let kind = if decl.is_alias() {
                "alias"
            } else if descriptor::struct_fields(catalog, &ty).is_some() {
                "record"
            } else {
                "type"
            };
            lines.push(format!("  {} {}", kind, decl.name));
        }
    }
    lines.push(format!("{} type(s)", catalog.type_count()));
    join_lines(&lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::discovery::discover;
    use crate::core::planner::{plan, PlanRequest};

    fn catalog() -> Catalog {
        Catalog::from_yaml(
            r#"
namespaces:
  example.com/model:
    types:
      Base:
        fields:
          - { name: ID, type: int }
      User:
        fields:
          - { type: Base, embedded: true }
          - { name: Name, type: string }
          - { name: Labels, type: "map[string]string" }
  example.com/dto:
    types:
      UserDTO:
        fields:
          - { name: ID, type: int64 }
          - { name: Name, type: string }
          - { name: Labels, type: string }
"#,
        )
        .unwrap()
    }

    fn output(c: &Catalog) -> PlanOutput {
        plan(
            c,
            &PlanRequest {
                src_namespace: "example.com/model".into(),
                src_type: "User".into(),
                dst_namespace: "example.com/dto".into(),
                dst_type: "UserDTO".into(),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_cp013_text_lists_converters_and_expressions() {
        let c = catalog();
        let text = plan_text(&output(&c));
        assert!(text.starts_with("Planning: 2 converter(s) in example.com/model\n"));
        assert!(text.contains("ConvertUserToUserDTO (model.User -> dto.UserDTO):"));
        assert!(text.contains("  Base.ID -> ID [basic_cast]\n      dst.ID = (int64)(src.Base.ID)\n"));
        assert!(text.contains("ConvertUserDTOToUser (dto.UserDTO -> model.User):"));
        assert!(text.ends_with("Plan: 2 converter(s), 6 field(s), 2 skipped.\n"));
    }

    #[test]
    fn test_cp013_skip_renders_todo_marker() {
        let c = catalog();
        let text = plan_text(&output(&c));
        assert!(text.contains(
            "  Labels -> Labels [skip]\n      // TODO: couldn't auto-generate Labels (map[string]string) -> Labels (string)\n"
        ));
        assert!(text.contains("Skipped:\n  ConvertUserToUserDTO: field \"Labels\""));
    }

    #[test]
    fn test_cp013_json_shape() {
        let c = catalog();
        let json = plan_json(&output(&c)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["output_namespace"], "example.com/model");
        assert_eq!(value["plans"][0]["function_name"], "ConvertUserToUserDTO");
        assert_eq!(value["plans"][0]["plans"][0]["strategy"], "basic_cast");
        assert_eq!(value["skipped"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_cp013_yaml_mentions_strategies() {
        let c = catalog();
        let yaml = plan_yaml(&output(&c)).unwrap();
        assert!(yaml.contains("function_name: ConvertUserToUserDTO"));
        assert!(yaml.contains("strategy: skip"));
    }

    #[test]
    fn test_cp013_records_text() {
        let c = catalog();
        let records = discover(&c, "example.com/model", "User").unwrap();
        let text = records_text(&records);
        assert!(text.starts_with("model.User (example.com/model)\n"));
        assert!(text.contains("  Base.ID int  (via Base)\n"));
        assert!(text.contains("  Name string\n"));
        assert!(text.ends_with("1 record(s)\n"));
    }

    #[test]
    fn test_cp013_catalog_text() {
        let c = Catalog::from_yaml(
            r#"
namespaces:
  example.com/model:
    types:
      User:
        fields:
          - { name: ID, type: int }
      Status: { underlying: string }
      UserID: { alias: int }
"#,
        )
        .unwrap();
        let text = catalog_text(&c);
        assert!(text.contains("example.com/model (model)\n  record User\n  type Status\n  alias UserID\n"));
        assert!(text.contains("database/sql (sql)\n"));
        assert!(text.ends_with(&format!("{} type(s)\n", c.type_count())));
    }
}
