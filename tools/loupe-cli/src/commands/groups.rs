//! Duplicate group commands.

use crate::commands::{open_catalog, CatalogArgs};
use crate::error::Result;
use crate::output::{format_groups_table, print_json};
use crate::OutputFormat;

/// List duplicate groups, or every group with `all`.
pub fn list(args: &CatalogArgs, all: bool, format: OutputFormat) -> Result<()> {
    let catalog = open_catalog(args)?;
    let groups = if all { catalog.all_groups()? } else { catalog.duplicate_groups()? };
    match format {
        OutputFormat::Table => println!("{}", format_groups_table(&groups)),
        OutputFormat::Json => print_json(&groups)?,
    }
    Ok(())
}

/// Show the group of one entry.
pub fn show(args: &CatalogArgs, id: &str, format: OutputFormat) -> Result<()> {
    let catalog = open_catalog(args)?;
    let group = catalog.group_of(id)?;
    match format {
        OutputFormat::Table => match &group {
            Some(group) => println!("{}", format_groups_table(std::slice::from_ref(group))),
            None => println!("{id} is not an active entry"),
        },
        OutputFormat::Json => print_json(&group)?,
    }
    Ok(())
}
