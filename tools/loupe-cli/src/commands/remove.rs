//! Remove command implementation.

use serde::Serialize;

use crate::commands::{open_catalog, CatalogArgs};
use crate::error::Result;
use crate::output::{print_info, print_json, InfoRow};
use crate::OutputFormat;

#[derive(Serialize)]
struct Removal<'a> {
    id: &'a str,
    removed: bool,
}

/// Run the remove command. Stops at the first unknown ID.
pub fn run(args: &CatalogArgs, ids: &[String], format: OutputFormat) -> Result<()> {
    let catalog = open_catalog(args)?;

    let mut removals = Vec::with_capacity(ids.len());
    for id in ids {
        let outcome = catalog.remove(id)?;
        removals.push(Removal { id, removed: outcome.removed });
    }

    match format {
        OutputFormat::Table => print_info(
            removals
                .iter()
                .map(|r| InfoRow::new(r.id, if r.removed { "removed" } else { "already removed" }))
                .collect(),
            format,
        ),
        OutputFormat::Json => print_json(&removals),
    }
}
