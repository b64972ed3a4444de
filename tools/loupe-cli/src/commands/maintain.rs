//! Rebuild, maintain and regroup commands.

use loupe::RebuildOutcome;

use crate::commands::{open_catalog, CatalogArgs};
use crate::error::Result;
use crate::output::{print_info, print_json, InfoRow};
use crate::OutputFormat;

/// Rebuild the index unconditionally.
pub fn rebuild(args: &CatalogArgs, format: OutputFormat) -> Result<()> {
    let catalog = open_catalog(args)?;
    print_outcome(catalog.rebuild()?, format)
}

/// Rebuild only when it is due.
pub fn maintain(args: &CatalogArgs, format: OutputFormat) -> Result<()> {
    let catalog = open_catalog(args)?;
    print_outcome(catalog.maintain()?, format)
}

/// Recompute the duplicate groups.
pub fn regroup(args: &CatalogArgs, format: OutputFormat) -> Result<()> {
    let catalog = open_catalog(args)?;
    let duplicates = catalog.regroup()?;
    match format {
        OutputFormat::Table => {
            print_info(vec![InfoRow::new("Duplicate Groups", duplicates)], format)
        }
        OutputFormat::Json => print_json(&serde_json::json!({ "duplicate_groups": duplicates })),
    }
}

fn print_outcome(outcome: RebuildOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_info(
            vec![InfoRow::new("Rebuilt", outcome.triggered), InfoRow::new("Purged", outcome.purged)],
            format,
        ),
        OutputFormat::Json => print_json(&outcome),
    }
}
