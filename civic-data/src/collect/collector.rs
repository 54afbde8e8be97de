use civic_core::RawRecord;
use log::{debug, info, warn};
use thiserror::Error;

use crate::cache::{CacheError, FetchCache};
use crate::config::IngestConfig;
use crate::fetch::{
    FetchError, HttpTransport, HttpTransportConfig, Origin, ResilientFetcher, Transport,
    TransportBuildError,
};
use crate::query::{AppToken, QueryError, QuerySpec, SELECT_PARAM, WHERE_PARAM};

use super::page::{CountProblem, parse_count, parse_page};
use super::run::CollectionRun;

/// What to collect from one endpoint.
///
/// # Examples
/// ```
/// use civic_data::collect::CollectionRequest;
///
/// let request = CollectionRequest::new(
///     "https://data.example.org/resource/uvpi-gqnh.json",
///     ["tree_id", "zipcode"],
///     "tree_id",
/// )
/// .with_filter("zipcode = '11201'");
/// assert_eq!(request.count_selector, "count(tree_id)");
/// assert_eq!(request.count_result_key, "count_tree_id");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRequest {
    /// Endpoint queried for both count and pages.
    pub base_url: String,
    /// Columns requested per record, joined into `$select`.
    pub select_fields: Vec<String>,
    /// Optional `$where` clause shared by count and pages.
    pub filter_clause: Option<String>,
    /// Aggregate used by the count query, such as `count(tree_id)`.
    pub count_selector: String,
    /// Key of the count in the count response, such as `count_tree_id`.
    pub count_result_key: String,
    /// Page size for this collection; the collector default otherwise.
    pub page_size: Option<u64>,
}

impl CollectionRequest {
    /// Describe a collection counted by `count(<count_field>)`.
    pub fn new<I, S>(base_url: impl Into<String>, select_fields: I, count_field: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base_url: base_url.into(),
            select_fields: select_fields.into_iter().map(Into::into).collect(),
            filter_clause: None,
            count_selector: format!("count({count_field})"),
            count_result_key: format!("count_{count_field}"),
            page_size: None,
        }
    }

    /// Restrict both count and pages with a `$where` clause.
    #[must_use]
    pub fn with_filter(mut self, clause: impl Into<String>) -> Self {
        self.filter_clause = Some(clause.into());
        self
    }

    /// Override the collector's page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = Some(page_size);
        self
    }

    fn count_query(&self) -> QuerySpec {
        QuerySpec::new(&self.base_url)
            .param(SELECT_PARAM, &self.count_selector)
            .param_opt(WHERE_PARAM, self.filter_clause.as_deref())
    }

    fn page_query(&self) -> QuerySpec {
        QuerySpec::new(&self.base_url)
            .param(SELECT_PARAM, self.select_fields.join(","))
            .param_opt(WHERE_PARAM, self.filter_clause.as_deref())
    }
}

/// Errors raised while collecting a dataset.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CollectError {
    /// Pages of zero records cannot make progress.
    #[error("page size must be positive")]
    InvalidPageSize,
    /// A request URL could not be rendered.
    #[error(transparent)]
    Query(#[from] QueryError),
    /// A request failed after retries.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The count response was unusable.
    #[error("unusable record count from {url}: {problem}")]
    Count {
        /// Count query URL.
        url: String,
        /// What was wrong with the response.
        #[source]
        problem: CountProblem,
    },
    /// A page response was not a JSON array of objects.
    #[error("malformed page from {url}: {source}")]
    Parse {
        /// Page URL.
        url: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while wiring a collector to the network.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The cache directory could not be opened.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// The HTTP transport could not be built.
    #[error(transparent)]
    Transport(#[from] TransportBuildError),
}

/// Count-then-page collector over a [`ResilientFetcher`].
///
/// The count query never carries the application token; page queries carry
/// it when token injection is enabled.
#[derive(Debug)]
pub struct PaginatedCollector<T> {
    fetcher: ResilientFetcher<T>,
    page_size: u64,
    record_ceiling: Option<u64>,
    use_token: bool,
    app_token: Option<AppToken>,
}

impl PaginatedCollector<HttpTransport> {
    /// Build a network-backed collector from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] when the cache directory or HTTP transport
    /// cannot be set up.
    pub fn connect(config: &IngestConfig) -> Result<Self, SetupError> {
        let transport = HttpTransport::with_config(HttpTransportConfig::from_ingest(config))?;
        let cache = FetchCache::open(config.cache_dir.clone())?;
        Ok(Self::from_config(
            ResilientFetcher::from_config(transport, cache, config),
            config,
        ))
    }
}

impl<T: Transport> PaginatedCollector<T> {
    /// Collect through `fetcher` with default page size and no token.
    pub fn new(fetcher: ResilientFetcher<T>) -> Self {
        Self::from_config(fetcher, &IngestConfig::default())
    }

    /// Take paging and token settings from `config`.
    pub fn from_config(fetcher: ResilientFetcher<T>, config: &IngestConfig) -> Self {
        Self {
            fetcher,
            page_size: config.page_size,
            record_ceiling: config.debug_record_ceiling,
            use_token: config.use_token,
            app_token: config.app_token.clone(),
        }
    }

    /// Set the default page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Cap every collection at `ceiling` records.
    #[must_use]
    pub fn with_record_ceiling(mut self, ceiling: u64) -> Self {
        self.record_ceiling = Some(ceiling);
        self
    }

    /// Inject `token` into every page query.
    #[must_use]
    pub fn with_app_token(mut self, token: AppToken) -> Self {
        self.app_token = Some(token);
        self.use_token = true;
        self
    }

    /// Underlying fetcher.
    pub fn fetcher(&self) -> &ResilientFetcher<T> {
        &self.fetcher
    }

    /// Number of records the endpoint reports for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::Fetch`] when the count cannot be fetched and
    /// [`CollectError::Count`] when the response is unusable.
    pub fn count(&self, request: &CollectionRequest) -> Result<u64, CollectError> {
        let url = request.count_query().url(None)?;
        self.fetch_decoded(&url, |body| {
            parse_count(body, &request.count_result_key).map_err(|problem| {
                CollectError::Count {
                    url: url.clone(),
                    problem,
                }
            })
        })
    }

    /// Collect every record of `request`.
    ///
    /// The count determines the target; pages are requested from offset 0,
    /// advancing by the number of records each page returned, until the
    /// target is reached or a page comes back empty. No partial dataset is
    /// returned on error.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::InvalidPageSize`] for a zero page size, and
    /// propagates count, query, fetch and parse failures.
    pub fn collect(&self, request: &CollectionRequest) -> Result<Vec<RawRecord>, CollectError> {
        let page_size = request.page_size.unwrap_or(self.page_size);
        if page_size == 0 {
            return Err(CollectError::InvalidPageSize);
        }

        let available = self.count(request)?;
        let target = self
            .record_ceiling
            .map_or(available, |ceiling| available.min(ceiling));
        info!(
            "collecting {target} of {available} records from {} in pages of {page_size}",
            request.base_url
        );

        let query = request.page_query().with_token(self.use_token);
        let mut run = CollectionRun::new(target);
        let mut offset = 0_u64;
        while !run.is_complete() {
            let url = query.page(page_size, offset).url(self.app_token.as_ref())?;
            let page = self.fetch_decoded(&url, |body| {
                parse_page(body).map_err(|source| CollectError::Parse {
                    url: url.clone(),
                    source,
                })
            })?;
            if page.is_empty() {
                warn!(
                    "{} reported {target} records but paging stopped at {}",
                    request.base_url,
                    run.collected()
                );
                break;
            }
            let returned = u64::try_from(page.len()).unwrap_or(u64::MAX);
            let kept = run.absorb(page);
            debug!("offset {offset}: received {returned}, kept {kept}");
            offset = offset.saturating_add(returned);
        }

        info!(
            "collected {} records from {}",
            run.collected(),
            request.base_url
        );
        Ok(run.into_records())
    }

    /// Fetch `url` and decode it, refetching once when a cached body fails
    /// to decode.
    fn fetch_decoded<R>(
        &self,
        url: &str,
        decode: impl Fn(&[u8]) -> Result<R, CollectError>,
    ) -> Result<R, CollectError> {
        let fetched = self.fetcher.fetch_with_origin(url, false)?;
        match decode(&fetched.body) {
            Err(err) if fetched.origin == Origin::Cache => {
                warn!("cached body for {url} is corrupt, refetching: {err}");
                let body = self.fetcher.fetch(url, true)?;
                decode(&body)
            }
            outcome => outcome,
        }
    }
}
