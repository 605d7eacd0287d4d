//! CP-017: CLI subcommands: init, validate, discover, plan.

use crate::core::catalog::Catalog;
use crate::core::planner::{self, PlanRequest};
use crate::core::{discovery, parser, report};
use clap::{Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Output format for `discover` and `plan`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Yaml,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter catalog.yaml
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate a type catalog
    Validate {
        /// Path to catalog.yaml
        #[arg(short, long, default_value = "catalog.yaml")]
        catalog: PathBuf,

        /// List every namespace and declaration
        #[arg(long)]
        list: bool,
    },

    /// Show the records reachable from one root record
    Discover {
        /// Path to catalog.yaml
        #[arg(short, long, default_value = "catalog.yaml")]
        catalog: PathBuf,

        /// Namespace path of the root record
        #[arg(long)]
        path: String,

        /// Root record name
        #[arg(long = "type")]
        type_name: String,

        /// Show only the root record, without following references
        #[arg(long)]
        shallow: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Plan converters between two records, in both directions
    Plan {
        /// Path to catalog.yaml
        #[arg(short, long, default_value = "catalog.yaml")]
        catalog: PathBuf,

        /// Source record name
        #[arg(long)]
        src_type: String,

        /// Source namespace path
        #[arg(long)]
        src_path: String,

        /// Destination record name
        #[arg(long)]
        dst_type: String,

        /// Destination namespace path
        #[arg(long)]
        dst_path: String,

        /// Name of the forward root converter
        #[arg(long)]
        func_name: Option<String>,

        /// Comma-separated source fields to leave unconverted
        #[arg(long)]
        ignore_fields: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { catalog, list } => cmd_validate(&catalog, list),
        Commands::Discover {
            catalog,
            path,
            type_name,
            shallow,
            format,
        } => {
            let out = run_discover(&catalog, &path, &type_name, shallow, format)?;
            print!("{}", out);
            Ok(())
        }
        Commands::Plan {
            catalog,
            src_type,
            src_path,
            dst_type,
            dst_path,
            func_name,
            ignore_fields,
            format,
        } => {
            let request = PlanRequest {
                src_namespace: src_path,
                src_type,
                dst_namespace: dst_path,
                dst_type,
                func_name,
                ignore_fields: split_ignore_list(ignore_fields.as_deref()),
            };
            let out = run_plan(&catalog, &request, format)?;
            print!("{}", out);
            Ok(())
        }
    }
}

const TEMPLATE: &str = r#"module: example.com/app

namespaces:
  example.com/app/model:
    types:
      Address:
        fields:
          - { name: Street, type: string }
          - { name: City, type: string }
      User:
        fields:
          - { name: ID, type: int }
          - { name: Name, type: string }
          - { name: Email, type: database/sql.NullString }
          - { name: Home, type: Address }
          - { name: CreatedAt, type: time.Time }

  example.com/app/dto:
    types:
      Address:
        fields:
          - { name: Street, type: string }
          - { name: City, type: string }
      UserDTO:
        fields:
          - { name: ID, type: int64 }
          - { name: Name, type: string }
          - { name: Email, type: string }
          - { name: Home, type: "*Address" }
          - { name: CreatedAt, type: string }
"#;

fn cmd_init(path: &Path) -> Result<(), String> {
    let catalog_path = path.join("catalog.yaml");
    if catalog_path.exists() {
        return Err(format!("{} already exists", catalog_path.display()));
    }
    std::fs::create_dir_all(path).map_err(|e| format!("cannot create {}: {}", path.display(), e))?;
    std::fs::write(&catalog_path, TEMPLATE)
        .map_err(|e| format!("cannot write {}: {}", catalog_path.display(), e))?;

    println!("Initialized convplan catalog at {}", path.display());
    println!("  Created: {}", catalog_path.display());
    println!(
        "  Try: convplan plan -c {} --src-path example.com/app/model --src-type User \
         --dst-path example.com/app/dto --dst-type UserDTO",
        catalog_path.display()
    );
    Ok(())
}

fn cmd_validate(file: &Path, list: bool) -> Result<(), String> {
    let catalog = load_and_validate(file)?;
    if list {
        print!("{}", report::catalog_text(&catalog));
    }
    let declared = catalog.type_count() - Catalog::with_builtins().type_count();
    println!("OK: {} ({} declared types)", file.display(), declared);
    Ok(())
}

/// Parse, validate and build a catalog, printing validation errors.
fn load_and_validate(file: &Path) -> Result<Catalog, String> {
    let config = parser::parse_catalog_file(file).map_err(|e| e.to_string())?;
    let errors = parser::validate_catalog(&config);
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        return Err(format!("{} validation error(s)", errors.len()));
    }
    Catalog::build(&config).map_err(|e| e.to_string())
}

fn run_discover(
    file: &Path,
    namespace: &str,
    name: &str,
    shallow: bool,
    format: OutputFormat,
) -> Result<String, String> {
    let catalog = load_and_validate(file)?;
    let records = if shallow {
        vec![Arc::new(
            discovery::resolve_record(&catalog, namespace, name).map_err(|e| e.to_string())?,
        )]
    } else {
        discovery::discover(&catalog, namespace, name).map_err(|e| e.to_string())?
    };
    match format {
        OutputFormat::Text => Ok(report::records_text(&records)),
        OutputFormat::Yaml => serde_yaml_ng::to_string(&records).map_err(|e| e.to_string()),
        OutputFormat::Json => serde_json::to_string_pretty(&records)
            .map(|s| s + "\n")
            .map_err(|e| e.to_string()),
    }
}

fn run_plan(file: &Path, request: &PlanRequest, format: OutputFormat) -> Result<String, String> {
    let catalog = load_and_validate(file)?;
    let output = planner::plan(&catalog, request).map_err(|e| e.to_string())?;
    match format {
        OutputFormat::Text => Ok(report::plan_text(&output)),
        OutputFormat::Yaml => report::plan_yaml(&output).map_err(|e| e.to_string()),
        OutputFormat::Json => report::plan_json(&output)
            .map(|s| s + "\n")
            .map_err(|e| e.to_string()),
    }
}

/// Split a comma-separated field list, trimming entries and dropping empties.
fn split_ignore_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        cmd_init(dir.path()).unwrap();
        dir
    }

    fn request() -> PlanRequest {
        PlanRequest {
            src_namespace: "example.com/app/model".into(),
            src_type: "User".into(),
            dst_namespace: "example.com/app/dto".into(),
            dst_type: "UserDTO".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_cp017_init() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("project");
        cmd_init(&sub).unwrap();
        assert!(sub.join("catalog.yaml").exists());
    }

    #[test]
    fn test_cp017_init_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("catalog.yaml"), "exists").unwrap();
        let result = cmd_init(dir.path());
        assert!(result.unwrap_err().contains("already exists"));
    }

    #[test]
    fn test_cp017_validate_template() {
        let dir = init_dir();
        cmd_validate(&dir.path().join("catalog.yaml"), false).unwrap();
        cmd_validate(&dir.path().join("catalog.yaml"), true).unwrap();
    }

    #[test]
    fn test_cp017_validate_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = dir.path().join("catalog.yaml");
        std::fs::write(
            &catalog,
            r#"
namespaces:
  example.com/m:
    types:
      A:
        fields:
          - { name: B, type: int }
          - { name: B, type: string }
      C: {}
"#,
        )
        .unwrap();
        let err = cmd_validate(&catalog, false).unwrap_err();
        assert_eq!(err, "2 validation error(s)");
    }

    #[test]
    fn test_cp017_validate_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = cmd_validate(&dir.path().join("nope.yaml"), false).unwrap_err();
        assert!(err.contains("failed to read"));
    }

    #[test]
    fn test_cp017_plan_template_text() {
        let dir = init_dir();
        let out = run_plan(&dir.path().join("catalog.yaml"), &request(), OutputFormat::Text).unwrap();
        assert!(out.contains("ConvertUserToUserDTO (model.User -> dto.UserDTO):"));
        assert!(out.contains("[nullable_to_value]"));
        assert!(out.contains("[time_to_string]"));
        assert!(out.contains("[nested_struct_pointer_convert]"));
        assert!(out.contains("ConvertDtoAddressToModelAddress"));
    }

    #[test]
    fn test_cp017_plan_json_with_custom_name() {
        let dir = init_dir();
        let req = PlanRequest {
            func_name: Some("ToDTO".into()),
            ..request()
        };
        let out = run_plan(&dir.path().join("catalog.yaml"), &req, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["plans"][0]["function_name"], "ToDTO");
    }

    #[test]
    fn test_cp017_plan_unknown_root() {
        let dir = init_dir();
        let req = PlanRequest {
            src_type: "Nope".into(),
            ..request()
        };
        let err = run_plan(&dir.path().join("catalog.yaml"), &req, OutputFormat::Text).unwrap_err();
        assert!(err.starts_with("discover src:"), "{}", err);
    }

    #[test]
    fn test_cp017_discover_yaml() {
        let dir = init_dir();
        let out = run_discover(
            &dir.path().join("catalog.yaml"),
            "example.com/app/model",
            "User",
            false,
            OutputFormat::Yaml,
        )
        .unwrap();
        assert!(out.contains("name: Address"));
        assert!(out.contains("name: User"));
    }

    #[test]
    fn test_cp017_discover_shallow() {
        let dir = init_dir();
        let out = run_discover(
            &dir.path().join("catalog.yaml"),
            "example.com/app/model",
            "User",
            true,
            OutputFormat::Text,
        )
        .unwrap();
        assert!(out.starts_with("model.User (example.com/app/model)\n"));
        assert!(!out.contains("model.Address"));
        assert!(out.ends_with("1 record(s)\n"));
    }

    #[test]
    fn test_cp017_split_ignore_list() {
        assert_eq!(
            split_ignore_list(Some(" ID, ,Email,")),
            vec!["ID".to_string(), "Email".to_string()]
        );
        assert!(split_ignore_list(None).is_empty());
    }
}
