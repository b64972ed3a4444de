//! Stats command implementation.

use crate::commands::{open_catalog, CatalogArgs};
use crate::error::Result;
use crate::output::{print_info, print_json, InfoRow};
use crate::OutputFormat;

/// Run the stats command - displays catalog shape and configuration.
pub fn run(args: &CatalogArgs, format: OutputFormat) -> Result<()> {
    let catalog = open_catalog(args)?;
    let stats = catalog.stats()?;
    let config = catalog.config();

    match format {
        OutputFormat::Table => {
            let rows = vec![
                InfoRow::new("Dimension", config.dimension),
                InfoRow::new("Metric", config.metric),
                InfoRow::new("Dedup Threshold", config.dedup.threshold),
                InfoRow::new("Active Entries", stats.active),
                InfoRow::new("Deleted Entries", stats.deleted),
                InfoRow::new("Fragmentation", format!("{:.1}%", stats.fragmentation * 100.0)),
                InfoRow::new("Index Nodes", stats.index.nodes),
                InfoRow::new("Index Layers", stats.index.max_layer + 1),
                InfoRow::new("Groups", stats.groups),
                InfoRow::new("Duplicate Groups", stats.duplicate_groups),
                InfoRow::new("Rebuild Pending", stats.rebuild_pending),
            ];
            print_info(rows, format)
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "config": config,
            "stats": stats,
        })),
    }
}
