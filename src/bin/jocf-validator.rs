//! JOCF Validator CLI
//!
//! Command-line interface for validating JOCF documents against the schema
//! corpus and for checking the corpus itself.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use jocf_validator::{
    lint, AggregatedValidationResult, FileStatus, JocfValidator, OutputFormat, SchemaIndex,
    Severity, ValidationResult, ValidatorConfig,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jocf-validator")]
#[command(about = "Validate Japan Open Cap Format (JOCF) documents")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Schema corpus root (overrides schema.root_path)
    #[arg(long, global = true)]
    schema_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate JOCF documents; directories are searched recursively
    Validate {
        /// Document files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,

        /// Include per-category error counts
        #[arg(long)]
        summary: bool,
    },

    /// List the file types and object types the corpus defines
    Types {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Lint the schema corpus (syntax, broken refs, missing discriminators)
    Lint {
        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ValidatorConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(e.exit_code() as u8);
        }
    };
    let config = match &cli.schema_root {
        Some(root) => config.with_schema_root(root),
        None => config,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.output.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let json_default = config.output.format == OutputFormat::Json;
    let result = match cli.command {
        Commands::Validate {
            paths,
            json,
            summary,
        } => run_validate(&config, &paths, json || json_default, summary),
        Commands::Types { json } => run_types(&config, json || json_default),
        Commands::Lint { json, strict } => run_lint(&config, json || json_default, strict),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_validate(
    config: &ValidatorConfig,
    paths: &[PathBuf],
    json_output: bool,
    summary: bool,
) -> Result<(), u8> {
    let validator = JocfValidator::new(config).map_err(|e| {
        eprintln!("Error: {e}");
        e.exit_code() as u8
    })?;

    let mut aggregated = AggregatedValidationResult::new();
    for path in paths {
        if path.is_dir() {
            let batch = validator.validate_directory(path).map_err(|e| {
                eprintln!("Error: {e}");
                3u8
            })?;
            aggregated.append(batch);
        } else {
            aggregated.add(validator.validate(path));
        }
    }

    if json_output {
        print_json(&validation_json(&aggregated, summary))?;
    } else {
        print_validation_text(&aggregated, summary);
    }

    if aggregated.is_valid() {
        Ok(())
    } else {
        Err(1)
    }
}

fn validation_json(aggregated: &AggregatedValidationResult, summary: bool) -> serde_json::Value {
    let results: Vec<serde_json::Value> = aggregated
        .results()
        .iter()
        .map(|result| {
            let mut value = json!(result);
            if summary {
                value["summary"] = json!(result.summary());
            }
            value
        })
        .collect();

    json!({
        "valid": aggregated.is_valid(),
        "summary": aggregated.summary(),
        "results": results,
    })
}

fn print_validation_text(aggregated: &AggregatedValidationResult, summary: bool) {
    for result in aggregated.results() {
        println!("{result}");
        if summary && !result.is_valid() {
            print_categories(result);
        }
    }

    let totals = aggregated.summary();
    if totals.total_files > 1 || summary {
        println!();
        println!(
            "{} files checked: {} valid, {} invalid ({} errors, {} objects)",
            totals.total_files,
            totals.valid_files,
            totals.invalid_files,
            totals.total_errors,
            totals.validated_objects
        );
    }
}

fn print_categories(result: &ValidationResult) {
    let categories = result.summary().error_categories;
    println!("  object validation errors: {}", categories.object_validation_errors);
    println!("  type check errors: {}", categories.type_check_errors);
    println!("  schema errors: {}", categories.schema_errors);
    println!("  other errors: {}", categories.other_errors);
}

fn run_types(config: &ValidatorConfig, json_output: bool) -> Result<(), u8> {
    let index = SchemaIndex::load_with_suffix(config.schema_root(), &config.schema.file_suffix)
        .map_err(|e| {
            eprintln!("Error: {e}");
            e.exit_code() as u8
        })?;

    if json_output {
        return print_json(&json!({
            "file_types": index.file_types(),
            "object_types": index.object_types(),
        }));
    }

    println!("File types ({}):", index.file_types().len());
    for file_type in index.file_types() {
        println!("  {file_type}");
    }
    println!("Object types ({}):", index.object_types().len());
    for object_type in index.object_types() {
        println!("  {object_type}");
    }
    Ok(())
}

fn run_lint(config: &ValidatorConfig, json_output: bool, strict: bool) -> Result<(), u8> {
    let root = config.schema_root();
    let result = lint(&root, &config.schema.file_suffix, strict).map_err(|e| {
        eprintln!("Error: {e}");
        e.exit_code() as u8
    })?;

    if json_output {
        print_json(&json!(result))?;
    } else {
        print_lint_text(&root, &result);
    }

    if result.failed == 0 {
        Ok(())
    } else {
        Err(1)
    }
}

fn print_lint_text(root: &Path, result: &jocf_validator::LintResult) {
    println!("Linting {} ...\n", root.display());

    for file_result in &result.results {
        let status_icon = match file_result.status {
            FileStatus::Ok => "\x1b[32m✓\x1b[0m",
            FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
            FileStatus::Error => "\x1b[31m✗\x1b[0m",
        };
        println!("  {} {}", status_icon, file_result.file.display());

        for diag in &file_result.diagnostics {
            let (color, label) = match diag.severity {
                Severity::Error => ("\x1b[31m", "error"),
                Severity::Warning => ("\x1b[33m", "warning"),
            };
            println!(
                "    {color}{label}[{}]\x1b[0m: {} - {}",
                diag.code, diag.path, diag.message
            );
        }
    }

    println!();
    if result.failed == 0 {
        println!(
            "\x1b[32m✓ {} files checked, all passed\x1b[0m",
            result.files_checked
        );
    } else {
        println!(
            "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
            result.files_checked, result.passed, result.failed, result.errors, result.warnings
        );
    }
}

fn print_json(value: &serde_json::Value) -> Result<(), u8> {
    let output = serde_json::to_string_pretty(value).map_err(|e| {
        eprintln!("Error serializing output: {e}");
        2u8
    })?;
    println!("{output}");
    Ok(())
}
