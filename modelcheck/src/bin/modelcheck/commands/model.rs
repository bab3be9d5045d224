use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Table};
use modelcheck::ModelSchema;

use super::{ModelSource, exclusions};
use crate::context::ProjectContext;
use crate::examples::ExampleGroup;
use crate::output::{GlobalOptions, OutputManager, TableDisplay, add_table_header, create_table};
use crate::theme::ICONS;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Inspect the Model",
        commands: &[
            "modelcheck model --mapping model.edmx            # Entities, tables and column counts",
            "modelcheck --output compact model                # One line per entity",
        ],
    },
    ExampleGroup {
        title: "Save a Snapshot",
        commands: &[
            "modelcheck --output json model --mapping model.edmx > model.json",
            "modelcheck check --model-snapshot model.json --live live.json",
        ],
    },
];

#[derive(Args)]
pub struct ModelArgs {
    /// EDMX mapping description of the model
    #[arg(long, value_name = "FILE")]
    pub mapping: Option<PathBuf>,

    /// Entity set pattern to leave out of the model (repeatable)
    #[arg(long = "exclude", value_name = "REGEX")]
    pub exclude: Vec<String>,
}

pub fn handle_model(args: ModelArgs, output: &OutputManager) -> Result<()> {
    let ctx = ProjectContext::find()?;
    let exclusions = exclusions(&ctx, &args.exclude)?;
    let source = ModelSource::resolve(&ctx, args.mapping, None)?;
    let model = source
        .provider(exclusions)?
        .model_schema()
        .with_context(|| format!("Failed to extract the model from {source}"))?;

    output.heading("Model");
    output.key_value("Source", &source.to_string());
    output.display(&model)?;

    if model.is_empty() {
        output.warning("The mapping exposes no entities");
    } else {
        output.info(&format!(
            "{} entit{}, {} table(s), {} relationship(s)",
            model.entities.len(),
            if model.entities.len() == 1 { "y" } else { "ies" },
            model.tables.len(),
            model.relationships.len()
        ));
    }
    Ok(())
}

impl TableDisplay for ModelSchema {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = create_table(options);

        if self.entities.is_empty() {
            table.add_row(vec![Cell::new("No entities found")]);
            return table;
        }

        add_table_header(&mut table, options, &["Entity", "Table", "Columns", "Foreign keys"]);
        for entity in &self.entities {
            for mapping in &entity.table_mappings {
                let qualified = mapping.qualified_name();
                let foreign_keys = self
                    .relationships
                    .iter()
                    .filter(|r| r.to_table.is(&mapping.schema_name, &mapping.table_name))
                    .count();
                table.add_row(vec![
                    Cell::new(&entity.name),
                    Cell::new(&qualified),
                    Cell::new(mapping.property_mappings.len()),
                    Cell::new(foreign_keys),
                ]);
            }
        }

        table
    }

    fn to_compact(&self) -> String {
        self.entities
            .iter()
            .map(|entity| {
                let tables: Vec<String> = entity
                    .table_mappings
                    .iter()
                    .map(|m| m.qualified_name())
                    .collect();
                format!("{} {} {}", entity.name, ICONS.arrow, tables.join(", "))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
