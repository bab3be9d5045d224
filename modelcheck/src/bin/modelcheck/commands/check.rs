use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Color as TableColor, Table};
use modelcheck::{Category, CheckOptions, Direction, Report, SnapshotSchemaReader};

use super::{ModelSource, exclusions};
use crate::context::{CONFIG_FILE, ModelcheckConfig, ProjectContext};
use crate::examples::ExampleGroup;
use crate::output::{GlobalOptions, OutputManager, TableDisplay, add_table_header, create_table};

pub const SCHEMA_ENV: &str = "MODELCHECK_SCHEMA";

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Check Drift",
        commands: &[
            "modelcheck check --mapping model.edmx --live live.json          # Default checks, all schemas",
            "modelcheck check --mapping model.edmx --live live.json --schema dbo",
            "modelcheck check                                                # Paths from modelcheck.toml",
        ],
    },
    ExampleGroup {
        title: "Stricter Checks",
        commands: &[
            "modelcheck check --strict                     # Also report objects only the database has",
            "modelcheck check --exclude '^__' --exclude '^EdmMetadatas$'",
        ],
    },
    ExampleGroup {
        title: "Scripting",
        commands: &[
            "modelcheck --output json check > drift.json   # Exit status 1 when drift is found",
            "modelcheck --output compact check --model-snapshot model.json --live live.json",
        ],
    },
];

#[derive(Args)]
pub struct CheckArgs {
    /// EDMX mapping description of the model
    #[arg(long, value_name = "FILE", conflicts_with = "model_snapshot")]
    pub mapping: Option<PathBuf>,

    /// JSON model snapshot written by `modelcheck --output json model`
    #[arg(long, value_name = "FILE")]
    pub model_snapshot: Option<PathBuf>,

    /// JSON snapshot of the live database schema
    #[arg(long, value_name = "FILE")]
    pub live: Option<PathBuf>,

    /// Only consider this schema namespace (all schemas when omitted)
    #[arg(long, value_name = "NAME")]
    pub schema: Option<String>,

    /// Enable all six checks, including objects only the database has
    #[arg(long)]
    pub strict: bool,

    /// Entity set pattern to leave out of the model (repeatable)
    #[arg(long = "exclude", value_name = "REGEX")]
    pub exclude: Vec<String>,
}

/// Returns `Ok(true)` when model and database agree.
pub fn handle_check(args: CheckArgs, output: &OutputManager) -> Result<bool> {
    let ctx = ProjectContext::find()?;
    if let Some(path) = &ctx.config_path {
        output.verbose(&format!("Using {}", path.display()));
    }

    let exclusions = exclusions(&ctx, &args.exclude)?;
    let source = ModelSource::resolve(&ctx, args.mapping, args.model_snapshot)?;
    let provider = source.provider(exclusions)?;

    let live = args
        .live
        .or_else(|| ctx.config.database.snapshot.as_deref().map(|p| ctx.resolve(p)))
        .with_context(|| {
            format!("No live schema given. Pass --live or set [database] snapshot in {CONFIG_FILE}")
        })?;
    let reader = SnapshotSchemaReader::new(&live);

    let options = resolve_options(
        &ctx.config,
        args.schema,
        args.strict,
        std::env::var(SCHEMA_ENV).ok(),
    );
    output.verbose(&format!("Checks: {options:?}"));

    let report = modelcheck::check(provider.as_ref(), &reader, &options)
        .context("Drift check failed")?;

    output.heading("Schema Drift");
    output.key_value("Model", &source.to_string());
    output.key_value("Database", &live.display().to_string());
    output.key_value("Schema", options.schema_filter().unwrap_or("(all)"));
    output.display(&report)?;

    if report.is_empty() {
        output.success("Model and database agree");
        return Ok(true);
    }

    output.warning(&format!(
        "{} discrepanc{} ({} table, {} column, {} relationship)",
        report.len(),
        if report.len() == 1 { "y" } else { "ies" },
        report.count(Category::Table),
        report.count(Category::Column),
        report.count(Category::Relationship),
    ));
    Ok(false)
}

/// `--strict` replaces the configured `[checks]`. The schema comes from the
/// flag, then the config file, then the environment.
fn resolve_options(
    config: &ModelcheckConfig,
    schema_flag: Option<String>,
    strict: bool,
    schema_env: Option<String>,
) -> CheckOptions {
    let options = if strict {
        CheckOptions::strict()
    } else {
        config.checks.clone()
    };

    let configured = Some(config.checks.schema_name.clone()).filter(|s| !s.is_empty());
    let schema = schema_flag
        .or_else(|| config.database.schema.clone())
        .or(configured)
        .or(schema_env)
        .unwrap_or_default();

    options.with_schema(schema)
}

impl TableDisplay for Report {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = create_table(options);

        if self.is_empty() {
            table.add_row(vec![Cell::new("No discrepancies found")]);
            return table;
        }

        add_table_header(&mut table, options, &["Category", "Found in", "Table", "Message"]);
        for discrepancy in self.iter() {
            let direction = discrepancy.direction();
            let mut direction_cell = Cell::new(direction.to_string());
            if !options.no_color {
                direction_cell = direction_cell.fg(match direction {
                    Direction::InDatabaseButNotInModel => TableColor::Yellow,
                    Direction::InModelButNotInDatabase => TableColor::Red,
                });
            }
            table.add_row(vec![
                Cell::new(discrepancy.category().to_string()),
                direction_cell,
                Cell::new(discrepancy.table()),
                Cell::new(discrepancy.to_string()),
            ]);
        }

        table
    }

    fn to_compact(&self) -> String {
        if self.is_empty() {
            return "no discrepancies".to_string();
        }
        self.messages().join("\n")
    }
}
