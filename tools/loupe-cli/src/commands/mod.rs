//! Command implementations.

pub mod groups;
pub mod ingest;
pub mod maintain;
pub mod query;
pub mod remove;
pub mod stats;

use std::path::PathBuf;

use loupe::{Catalog, CatalogConfig, DistanceMetric};

use crate::error::{CliError, Result};

/// Where the catalog lives and how to open it.
#[derive(Debug, Clone)]
pub struct CatalogArgs {
    /// Catalog file.
    pub database: Option<PathBuf>,
    /// JSON configuration file.
    pub config: Option<PathBuf>,
    /// Dimension used without a configuration file.
    pub dimension: Option<usize>,
    /// Metric used without a configuration file.
    pub metric: DistanceMetric,
}

impl CatalogArgs {
    /// Resolve the catalog configuration from the file or the flags.
    pub fn catalog_config(&self) -> Result<CatalogConfig> {
        if let Some(path) = &self.config {
            if !path.exists() {
                return Err(CliError::FileNotFound(path.clone()));
            }
            return Ok(CatalogConfig::load(path)?);
        }
        let dimension = self.dimension.ok_or(CliError::NoDimension)?;
        Ok(CatalogConfig::new(dimension, self.metric))
    }
}

/// Open or create the catalog named by `args`.
pub fn open_catalog(args: &CatalogArgs) -> Result<Catalog> {
    let path = args.database.as_deref().ok_or(CliError::NoDatabaseSpecified)?;
    let config = args.catalog_config()?;
    tracing::debug!(path = %path.display(), dimension = config.dimension, "opening catalog");
    Ok(Catalog::open(path, config)?)
}

/// Parse a vector given as a JSON array or comma-separated numbers.
pub fn parse_vector(text: &str) -> Result<Vec<f32>> {
    let text = text.trim();
    if text.starts_with('[') {
        return Ok(serde_json::from_str(text)?);
    }
    text.split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| CliError::Parse(format!("invalid component '{}': {e}", part.trim())))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vector_forms() {
        assert_eq!(parse_vector("[1.0, 0.5]").unwrap(), vec![1.0, 0.5]);
        assert_eq!(parse_vector(" 1, 0.5 ,-2 ").unwrap(), vec![1.0, 0.5, -2.0]);
        assert!(matches!(parse_vector("1,x"), Err(CliError::Parse(_))));
        assert!(matches!(parse_vector("[1,"), Err(CliError::Json(_))));
    }

    #[test]
    fn test_config_needs_dimension_or_file() {
        let args = CatalogArgs {
            database: None,
            config: None,
            dimension: None,
            metric: DistanceMetric::Cosine,
        };
        assert!(matches!(args.catalog_config(), Err(CliError::NoDimension)));
        assert!(matches!(open_catalog(&args), Err(CliError::NoDatabaseSpecified)));

        let args = CatalogArgs { dimension: Some(3), ..args };
        assert_eq!(args.catalog_config().unwrap().dimension, 3);
    }

    #[test]
    fn test_config_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loupe.json");
        std::fs::write(&path, r#"{"dimension": 8, "metric": "euclidean"}"#).unwrap();
        let args = CatalogArgs {
            database: None,
            config: Some(path),
            dimension: Some(3),
            metric: DistanceMetric::Cosine,
        };
        let config = args.catalog_config().unwrap();
        assert_eq!(config.dimension, 8);
        assert_eq!(config.metric, DistanceMetric::Euclidean);
    }
}
