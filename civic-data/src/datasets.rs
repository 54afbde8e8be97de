//! Named dataset definitions and the single-dataset ingestion pipeline.
//!
//! A [`DatasetSpec`] names an endpoint, the columns to request, an optional
//! filter, and the field to count by. [`ingest`] collects it and hands the
//! records to a [`Normalizer`].

use civic_core::{NormalizeError, Normalizer, Table};
use log::info;
use thiserror::Error;

use crate::collect::{CollectError, CollectionRequest, PaginatedCollector};
use crate::fetch::Transport;

const PORTAL: &str = "https://data.cityofnewyork.us/resource";

/// One remote dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSpec {
    /// Short identifier used in logs and errors.
    pub name: String,
    /// Query endpoint.
    pub base_url: String,
    /// Columns requested per record.
    pub select_fields: Vec<String>,
    /// Optional `$where` clause.
    pub filter_clause: Option<String>,
    /// Field counted to size the collection.
    pub count_field: String,
}

impl DatasetSpec {
    /// Describe a dataset.
    pub fn new<I, S>(
        name: impl Into<String>,
        base_url: impl Into<String>,
        select_fields: I,
        count_field: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            select_fields: select_fields.into_iter().map(Into::into).collect(),
            filter_clause: None,
            count_field: count_field.into(),
        }
    }

    /// 311 service requests.
    pub fn complaints_311() -> Self {
        Self::new(
            "complaints_311",
            format!("{PORTAL}/erm2-nwe9.json"),
            [
                "unique_key",
                "created_date",
                "complaint_type",
                "descriptor",
                "incident_zip",
                "borough",
                "latitude",
                "longitude",
            ],
            "unique_key",
        )
    }

    /// 2015 street tree census.
    pub fn street_trees() -> Self {
        Self::new(
            "street_trees",
            format!("{PORTAL}/5rq2-4hqu.json"),
            [
                "tree_id",
                "created_at",
                "tree_dbh",
                "health",
                "spc_common",
                "zipcode",
                "latitude",
                "longitude",
            ],
            "tree_id",
        )
    }

    /// Modified zip code tabulation area boundaries.
    pub fn zip_boundaries() -> Self {
        Self::new(
            "zip_boundaries",
            format!("{PORTAL}/pri4-ifjk.json"),
            ["modzcta", "label", "pop_est", "the_geom"],
            "modzcta",
        )
    }

    /// Every dataset served by the query API.
    pub fn catalog() -> [Self; 3] {
        [
            Self::complaints_311(),
            Self::street_trees(),
            Self::zip_boundaries(),
        ]
    }

    /// Restrict the dataset with a `$where` clause.
    #[must_use]
    pub fn with_filter(mut self, clause: impl Into<String>) -> Self {
        self.filter_clause = Some(clause.into());
        self
    }

    /// The collection request for this dataset.
    ///
    /// # Examples
    /// ```
    /// use civic_data::datasets::DatasetSpec;
    ///
    /// let request = DatasetSpec::street_trees()
    ///     .with_filter("zipcode = '11375'")
    ///     .collection_request();
    /// assert_eq!(request.count_selector, "count(tree_id)");
    /// assert_eq!(request.count_result_key, "count_tree_id");
    /// assert_eq!(request.filter_clause.as_deref(), Some("zipcode = '11375'"));
    /// ```
    pub fn collection_request(&self) -> CollectionRequest {
        let request = CollectionRequest::new(
            self.base_url.clone(),
            self.select_fields.iter().cloned(),
            &self.count_field,
        );
        match &self.filter_clause {
            Some(clause) => request.with_filter(clause.clone()),
            None => request,
        }
    }
}

/// Errors raised by [`ingest`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IngestError {
    /// Collection failed.
    #[error("failed to collect {dataset}: {source}")]
    Collect {
        /// Dataset name.
        dataset: String,
        /// Underlying failure.
        #[source]
        source: CollectError,
    },
    /// Normalization failed.
    #[error("failed to normalize {dataset}: {source}")]
    Normalize {
        /// Dataset name.
        dataset: String,
        /// Underlying failure.
        #[source]
        source: NormalizeError,
    },
}

/// Collect the dataset described by `spec` and normalize the result.
///
/// # Errors
///
/// Returns [`IngestError::Collect`] or [`IngestError::Normalize`] tagged
/// with the dataset name.
pub fn ingest<T, N>(
    collector: &PaginatedCollector<T>,
    spec: &DatasetSpec,
    normalizer: &N,
) -> Result<Table, IngestError>
where
    T: Transport,
    N: Normalizer + ?Sized,
{
    info!("ingesting {} with {}", spec.name, normalizer.name());
    let records = collector
        .collect(&spec.collection_request())
        .map_err(|source| IngestError::Collect {
            dataset: spec.name.clone(),
            source,
        })?;
    let collected = records.len();
    let table = normalizer
        .normalize(records)
        .map_err(|source| IngestError::Normalize {
            dataset: spec.name.clone(),
            source,
        })?;
    info!(
        "{}: {collected} records normalized into {} rows",
        spec.name,
        table.len()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FetchCache;
    use crate::collect::test_support::StubDataset;
    use crate::fetch::ResilientFetcher;
    use crate::normalize::TreeNormalizer;
    use camino::Utf8PathBuf;
    use civic_core::Cell;
    use civic_core::test_support::TextColumnsNormalizer;
    use rstest::{fixture, rstest};
    use serde_json::json;
    use tempfile::TempDir;

    #[fixture]
    fn cache_dir() -> TempDir {
        TempDir::new().expect("create temp dir")
    }

    fn collector<'a>(
        dataset: &'a StubDataset,
        dir: &TempDir,
    ) -> PaginatedCollector<&'a StubDataset> {
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .expect("temp dir should be UTF-8");
        PaginatedCollector::new(ResilientFetcher::new(
            dataset,
            FetchCache::open(root).expect("open cache"),
        ))
        .with_page_size(2)
    }

    #[rstest]
    fn catalog_entries_are_distinct() {
        let catalog = DatasetSpec::catalog();
        assert_eq!(catalog.len(), 3);
        assert_ne!(catalog[0].base_url, catalog[1].base_url);
        assert!(
            catalog
                .iter()
                .all(|spec| spec.select_fields.contains(&spec.count_field))
        );
    }

    #[rstest]
    fn ingests_trees_end_to_end(cache_dir: TempDir) {
        let dataset = StubDataset::new([
            json!({"tree_id": "1", "tree_dbh": "3", "latitude": "40.7", "longitude": "-73.9"}),
            json!({"tree_id": "2", "tree_dbh": "12"}),
            json!({"tree_id": "3", "spc_common": "pin oak"}),
        ]);

        let table = ingest(
            &collector(&dataset, &cache_dir),
            &DatasetSpec::street_trees(),
            &TreeNormalizer,
        )
        .expect("ingest");

        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(1, "diameter"), Some(&Cell::Float(12.0)));
        assert_eq!(dataset.page_offsets(), [0, 2]);
    }

    #[rstest]
    fn ingests_a_custom_dataset_through_a_trait_object(cache_dir: TempDir) {
        let dataset = StubDataset::new([
            json!({"permit_id": "P-1", "borough": "BRONX", "status": "issued"}),
            json!({"permit_id": "P-2", "borough": ""}),
            json!({"permit_id": "P-3", "borough": "QUEENS"}),
        ]);
        let spec = DatasetSpec::new(
            "permits",
            "https://data.example.org/resource/ipu4-2q9a.json",
            ["permit_id", "borough"],
            "permit_id",
        );
        let normalizer: &dyn Normalizer = &TextColumnsNormalizer::new(["permit_id", "borough"]);

        let table = ingest(&collector(&dataset, &cache_dir), &spec, normalizer).expect("ingest");

        assert_eq!(table.columns(), ["permit_id", "borough"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(1, "borough"), Some(&Cell::Null));
        assert_eq!(table.cell(2, "permit_id"), Some(&Cell::Text("P-3".into())));
    }

    #[rstest]
    fn normalization_failures_name_the_dataset(cache_dir: TempDir) {
        let dataset = StubDataset::new([json!({"tree_dbh": "3"})]);

        let err = ingest(
            &collector(&dataset, &cache_dir),
            &DatasetSpec::street_trees(),
            &TreeNormalizer,
        )
        .expect_err("record lacks tree_id");

        assert!(matches!(
            err,
            IngestError::Normalize { ref dataset, .. } if dataset == "street_trees"
        ));
    }

    #[rstest]
    fn collection_failures_name_the_dataset(cache_dir: TempDir) {
        let dataset = StubDataset::numbered(3, "modzcta").failing_at(0, 6);

        let err = ingest(
            &collector(&dataset, &cache_dir),
            &DatasetSpec::zip_boundaries(),
            &crate::normalize::ZipBoundaryNormalizer,
        )
        .expect_err("first page never arrives");

        assert!(matches!(
            err,
            IngestError::Collect { ref dataset, .. } if dataset == "zip_boundaries"
        ));
    }
}
