//! Ingest command implementation.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::commands::{open_catalog, CatalogArgs};
use crate::error::{CliError, Result};
use crate::output::{print_info, print_json, InfoRow};
use crate::OutputFormat;

/// One line of the input file.
#[derive(Debug, Deserialize)]
struct IngestRecord {
    id: String,
    vector: Vec<f32>,
}

/// Totals over an ingest run.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// New or changed entries.
    pub accepted: usize,
    /// Lines that repeated an active entry exactly.
    pub unchanged: usize,
    /// Accepted entries that joined a duplicate group.
    pub duplicates: usize,
    /// Lines that could not be parsed or were rejected.
    pub failed: usize,
}

/// Run the ingest command over a file, or stdin for `None` and `-`.
pub fn run(args: &CatalogArgs, file: Option<&Path>, format: OutputFormat) -> Result<()> {
    let catalog = open_catalog(args)?;

    let reader: Box<dyn BufRead> = match file {
        Some(path) if path != Path::new("-") => {
            if !path.exists() {
                return Err(CliError::FileNotFound(path.to_path_buf()));
            }
            Box::new(BufReader::new(File::open(path)?))
        }
        _ => Box::new(BufReader::new(io::stdin())),
    };

    let summary = ingest_lines(reader, |id, vector| catalog.ingest(id, vector))?;

    match format {
        OutputFormat::Table => print_info(
            vec![
                InfoRow::new("Accepted", summary.accepted),
                InfoRow::new("Unchanged", summary.unchanged),
                InfoRow::new("Duplicates", summary.duplicates),
                InfoRow::new("Failed", summary.failed),
            ],
            format,
        ),
        OutputFormat::Json => print_json(&summary),
    }
}

/// Feed every non-blank JSON line to `ingest`, counting outcomes.
///
/// Bad lines are logged and counted; only read errors abort.
fn ingest_lines<R, F>(reader: R, mut ingest: F) -> Result<IngestSummary>
where
    R: BufRead,
    F: FnMut(&str, Vec<f32>) -> loupe::Result<loupe::IngestOutcome>,
{
    let mut summary = IngestSummary::default();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: IngestRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!(line = number + 1, error = %e, "skipping malformed line");
                summary.failed += 1;
                continue;
            }
        };
        match ingest(&record.id, record.vector) {
            Ok(outcome) if outcome.accepted => {
                summary.accepted += 1;
                if outcome.duplicate_of.is_some() {
                    summary.duplicates += 1;
                }
            }
            Ok(_) => summary.unchanged += 1,
            Err(e) => {
                warn!(line = number + 1, id = %record.id, error = %e, "entry rejected");
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use loupe::{Catalog, CatalogConfig, DistanceMetric};

    use super::*;

    #[test]
    fn test_ingest_lines_counts_outcomes() {
        let catalog = Catalog::in_memory(CatalogConfig::new(2, DistanceMetric::Cosine)).unwrap();
        let input = r#"{"id": "a", "vector": [1.0, 0.0]}
{"id": "b", "vector": [1.0, 0.01]}

not json
{"id": "c", "vector": [1.0]}
{"id": "a", "vector": [1.0, 0.0]}
"#;
        let summary = ingest_lines(input.as_bytes(), |id, v| catalog.ingest(id, v)).unwrap();
        assert_eq!(
            summary,
            IngestSummary { accepted: 2, unchanged: 1, duplicates: 1, failed: 2 }
        );
    }
}
