//! Output formatting utilities.

use loupe::{DuplicateGroup, NeighborResult};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::error::Result;
use crate::OutputFormat;

/// Print `value` as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// A simple key-value row for displaying info.
#[derive(Tabled)]
pub struct InfoRow {
    #[tabled(rename = "Property")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl InfoRow {
    /// Build a row from anything displayable.
    pub fn new(key: &str, value: impl ToString) -> Self {
        Self { key: key.to_string(), value: value.to_string() }
    }
}

/// Format an info table with key-value pairs.
pub fn format_info_table(rows: Vec<InfoRow>) -> String {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}

/// Print key-value rows as a table or a flat JSON object.
pub fn print_info(rows: Vec<InfoRow>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", format_info_table(rows)),
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> =
                rows.into_iter().map(|r| (r.key, serde_json::Value::String(r.value))).collect();
            print_json(&map)?;
        }
    }
    Ok(())
}

/// A neighbor row.
#[derive(Tabled)]
pub struct NeighborRow {
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Score")]
    pub score: String,
}

/// Format query results as a table.
pub fn format_neighbors_table(results: &[NeighborResult]) -> String {
    if results.is_empty() {
        return "(no neighbors)".to_string();
    }
    let rows = results.iter().map(|r| NeighborRow {
        rank: r.rank,
        id: r.id.to_string(),
        score: format!("{:.4}", r.score),
    });
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    format!("{table}\n({} neighbors)", results.len())
}

/// A duplicate group row.
#[derive(Tabled)]
pub struct GroupRow {
    #[tabled(rename = "Representative")]
    pub representative: String,
    #[tabled(rename = "Size")]
    pub size: usize,
    #[tabled(rename = "Members")]
    pub members: String,
}

impl From<&DuplicateGroup> for GroupRow {
    fn from(group: &DuplicateGroup) -> Self {
        Self {
            representative: group.representative().map(ToString::to_string).unwrap_or_default(),
            size: group.len(),
            members: group.members().iter().map(ToString::to_string).collect::<Vec<_>>().join(", "),
        }
    }
}

/// Format duplicate groups as a table.
pub fn format_groups_table(groups: &[DuplicateGroup]) -> String {
    if groups.is_empty() {
        return "(no groups)".to_string();
    }
    let mut table = Table::new(groups.iter().map(GroupRow::from));
    table.with(Style::rounded());
    format!("{table}\n({} groups)", groups.len())
}
