//! Test utilities for paginated collection.
//!
//! [`StubDataset`] is a [`Transport`] that behaves like an offset-paginated
//! query endpoint backed by an in-memory record list.

use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::{Map, Value};
use url::Url;

use crate::fetch::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::query::{LIMIT_PARAM, OFFSET_PARAM, SELECT_PARAM};

/// In-memory paginated endpoint.
///
/// `$select=count(field)` queries answer `[{"count_field": "<n>"}]` with the
/// count as a string, as real portals do. Other queries answer the slice
/// `[$offset, $offset + $limit)` of the records, projected onto the
/// `$select` columns when present.
///
/// # Example
///
/// ```
/// use civic_data::collect::test_support::StubDataset;
/// use civic_data::fetch::{HttpRequest, Transport};
///
/// let dataset = StubDataset::numbered(7, "tree_id");
/// let request = HttpRequest {
///     url: "https://example.org/trees.json?$select=tree_id&$limit=3&$offset=6",
///     credentials: None,
/// };
/// let body = dataset.get(&request).map(|r| r.body).unwrap_or_default();
/// assert_eq!(body, br#"[{"tree_id":"6"}]"#);
/// ```
#[derive(Debug, Default)]
pub struct StubDataset {
    records: Vec<Map<String, Value>>,
    reported_count: Option<u64>,
    failures: RefCell<HashMap<u64, usize>>,
    requests: RefCell<Vec<String>>,
}

impl StubDataset {
    /// Serve `records`, which must be JSON objects; other values are skipped.
    #[must_use]
    pub fn new(records: impl IntoIterator<Item = Value>) -> Self {
        Self {
            records: records
                .into_iter()
                .filter_map(|value| match value {
                    Value::Object(object) => Some(object),
                    _ => None,
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Serve `len` records whose `field` holds their index as a string.
    #[must_use]
    pub fn numbered(len: usize, field: &str) -> Self {
        Self::new((0..len).map(|index| single_field(field, Value::String(index.to_string()))))
    }

    /// Report `count` from count queries regardless of the records held.
    #[must_use]
    pub fn with_reported_count(mut self, count: u64) -> Self {
        self.reported_count = Some(count);
        self
    }

    /// Fail the next `times` page requests at `offset` with network errors.
    #[must_use]
    pub fn failing_at(self, offset: u64, times: usize) -> Self {
        self.failures.borrow_mut().insert(offset, times);
        self
    }

    /// Every URL requested, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    /// Number of count queries received.
    pub fn count_requests(&self) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|url| parse(url).is_some_and(|query| query.count_field.is_some()))
            .count()
    }

    /// `$offset` of every page request received, in order.
    pub fn page_offsets(&self) -> Vec<u64> {
        self.requests
            .borrow()
            .iter()
            .filter_map(|url| parse(url))
            .filter(|query| query.count_field.is_none())
            .map(|query| query.offset)
            .collect()
    }

    fn count_body(&self, field: &str) -> Value {
        let count = self
            .reported_count
            .unwrap_or_else(|| u64::try_from(self.records.len()).unwrap_or(u64::MAX));
        Value::Array(vec![single_field(
            &format!("count_{field}"),
            Value::String(count.to_string()),
        )])
    }

    fn page_body(&self, query: &ParsedQuery) -> Value {
        let start = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let len = usize::try_from(query.limit).unwrap_or(usize::MAX);
        let rows = self
            .records
            .iter()
            .skip(start)
            .take(len)
            .map(|record| match &query.select {
                Some(columns) => Value::Object(
                    record
                        .iter()
                        .filter(|(name, _)| columns.contains(name))
                        .map(|(name, value)| (name.clone(), value.clone()))
                        .collect(),
                ),
                None => Value::Object(record.clone()),
            })
            .collect();
        Value::Array(rows)
    }

    fn take_failure(&self, offset: u64) -> bool {
        match self.failures.borrow_mut().get_mut(&offset) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

fn single_field(name: &str, value: Value) -> Value {
    let mut object = Map::new();
    object.insert(name.to_owned(), value);
    Value::Object(object)
}

#[derive(Debug)]
struct ParsedQuery {
    count_field: Option<String>,
    select: Option<Vec<String>>,
    limit: u64,
    offset: u64,
}

fn parse(url: &str) -> Option<ParsedQuery> {
    let url = Url::parse(url).ok()?;
    let mut query = ParsedQuery {
        count_field: None,
        select: None,
        limit: u64::MAX,
        offset: 0,
    };
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            SELECT_PARAM => {
                if let Some(field) = value
                    .strip_prefix("count(")
                    .and_then(|rest| rest.strip_suffix(')'))
                {
                    query.count_field = Some(field.to_owned());
                } else {
                    query.select = Some(value.split(',').map(str::to_owned).collect());
                }
            }
            LIMIT_PARAM => query.limit = value.parse().ok()?,
            OFFSET_PARAM => query.offset = value.parse().ok()?,
            _ => {}
        }
    }
    Some(query)
}

impl Transport for StubDataset {
    fn get(&self, request: &HttpRequest<'_>) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request.url.to_owned());
        let Some(query) = parse(request.url) else {
            return Ok(HttpResponse::new(400, "malformed query"));
        };
        if query.count_field.is_none() && self.take_failure(query.offset) {
            return Err(TransportError::Network {
                url: request.url.to_owned(),
                message: "connection reset by peer".to_owned(),
            });
        }
        let body = match &query.count_field {
            Some(field) => self.count_body(field),
            None => self.page_body(&query),
        };
        Ok(HttpResponse::new(200, body.to_string()))
    }
}
