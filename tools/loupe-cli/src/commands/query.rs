//! Query command implementation.

use loupe::QueryOptions;

use crate::commands::{open_catalog, parse_vector, CatalogArgs};
use crate::error::Result;
use crate::output::{format_neighbors_table, print_json};
use crate::OutputFormat;

/// Query flags.
#[derive(Debug, Clone, Copy)]
pub struct QueryArgs {
    /// Number of neighbors.
    pub k: usize,
    /// Beam width override.
    pub ef: Option<usize>,
    /// Minimum score.
    pub min_score: Option<f32>,
    /// Use the exact scan.
    pub exact: bool,
}

/// Run the query command.
pub fn run(args: &CatalogArgs, vector: &str, query: QueryArgs, format: OutputFormat) -> Result<()> {
    let catalog = open_catalog(args)?;
    let vector = parse_vector(vector)?;

    let results = if query.exact {
        let mut results = catalog.query_exact(&vector, query.k)?;
        if let Some(min_score) = query.min_score {
            results.retain(|r| r.score >= min_score);
        }
        results
    } else {
        let mut options = QueryOptions::new(query.k);
        if let Some(ef) = query.ef {
            options = options.with_ef_search(ef);
        }
        if let Some(min_score) = query.min_score {
            options = options.with_min_score(min_score);
        }
        catalog.query_with(&vector, options)?
    };

    match format {
        OutputFormat::Table => println!("{}", format_neighbors_table(&results)),
        OutputFormat::Json => print_json(&results)?,
    }
    Ok(())
}
