//! Deterministic request URLs for offset-paginated query endpoints.
//!
//! The same base endpoint, parameters and token flag always produce the same
//! URL bytes, which is what makes the response cache effective.
//!
//! Parameter names are emitted verbatim; values are encoded with
//! `application/x-www-form-urlencoded` rules, so callers pass raw clause text
//! such as `created_date >= '2020-01-01'`.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;
use url::form_urlencoded::byte_serialize;

/// Query parameter carrying the application token.
pub const APP_TOKEN_PARAM: &str = "$$app_token";
/// Column projection parameter.
pub const SELECT_PARAM: &str = "$select";
/// Row filter parameter.
pub const WHERE_PARAM: &str = "$where";
/// Page size parameter.
pub const LIMIT_PARAM: &str = "$limit";
/// Page start parameter.
pub const OFFSET_PARAM: &str = "$offset";

/// Application token identifying the client to the data portal.
///
/// The token is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AppToken(String);

impl AppToken {
    /// Wrap a token string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Raw token text.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AppToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AppToken(<redacted>)")
    }
}

/// Errors raised while rendering a [`QuerySpec`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The query asked for a token but none was configured.
    #[error("query for {base_url} requires an application token but none is configured")]
    MissingToken {
        /// Endpoint of the offending query.
        base_url: String,
    },
}

/// Assemble `base_url?key=value&...`.
///
/// When `token` is supplied it is injected as the first parameter. The
/// result never ends with a separator after the first parameter; with no
/// parameters at all it is `base_url?`.
///
/// # Examples
/// ```
/// use civic_data::query::build_query;
///
/// let base = "https://data.example.org/resource/abcd.json";
/// assert_eq!(build_query(base, &[] as &[(&str, &str)], None), format!("{base}?"));
/// assert_eq!(
///     build_query(base, &[("a", "1"), ("b", "2")], None),
///     format!("{base}?a=1&b=2"),
/// );
/// ```
pub fn build_query<K, V>(base_url: &str, params: &[(K, V)], token: Option<&AppToken>) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let token_param = token.map(|token| (APP_TOKEN_PARAM, token.expose()));
    let pairs = token_param.into_iter().chain(
        params
            .iter()
            .map(|(key, value)| (key.as_ref(), value.as_ref())),
    );

    let mut url = String::with_capacity(base_url.len() + 1);
    url.push_str(base_url);
    url.push('?');
    for (index, (key, value)) in pairs.enumerate() {
        if index > 0 {
            url.push('&');
        }
        url.push_str(key);
        url.push('=');
        url.extend(byte_serialize(value.as_bytes()));
    }
    url
}

/// Immutable description of one query against an endpoint.
///
/// # Examples
/// ```
/// use civic_data::query::QuerySpec;
///
/// let spec = QuerySpec::new("https://data.example.org/resource/abcd.json")
///     .param("$select", "tree_id")
///     .param("$where", "zipcode = '11201'");
/// let url = spec.page(2, 4).url(None)?;
/// assert_eq!(
///     url,
///     "https://data.example.org/resource/abcd.json?$select=tree_id&$where=zipcode+%3D+%2711201%27&$limit=2&$offset=4",
/// );
/// # Ok::<(), civic_data::query::QueryError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    base_url: String,
    params: Vec<(String, String)>,
    use_token: bool,
}

impl QuerySpec {
    /// Start a query against `base_url` with no parameters and no token.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            params: Vec::new(),
            use_token: false,
        }
    }

    /// Append a parameter after those already present.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Append a parameter only when `value` is present.
    #[must_use]
    pub fn param_opt(self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    /// Toggle application-token injection.
    #[must_use]
    pub fn with_token(mut self, use_token: bool) -> Self {
        self.use_token = use_token;
        self
    }

    /// Endpoint the query targets.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Parameters in emission order.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Whether the token is injected.
    pub const fn uses_token(&self) -> bool {
        self.use_token
    }

    /// Render the URL, injecting `token` when the query asks for one.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::MissingToken`] when the query uses a token and
    /// `token` is `None`.
    pub fn url(&self, token: Option<&AppToken>) -> Result<String, QueryError> {
        let token = if self.use_token {
            Some(token.ok_or_else(|| QueryError::MissingToken {
                base_url: self.base_url.clone(),
            })?)
        } else {
            None
        };
        Ok(build_query(&self.base_url, &self.params, token))
    }

    /// Address one page of this query.
    pub const fn page(&self, limit: u64, offset: u64) -> PageRequest<'_> {
        PageRequest {
            spec: self,
            limit,
            offset,
        }
    }
}

/// A [`QuerySpec`] narrowed to one `$limit`/`$offset` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest<'a> {
    spec: &'a QuerySpec,
    limit: u64,
    offset: u64,
}

impl PageRequest<'_> {
    /// Maximum number of records requested.
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Index of the first record requested.
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Render the page URL; `$limit` and `$offset` follow the query's own
    /// parameters.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::MissingToken`] under the same conditions as
    /// [`QuerySpec::url`].
    pub fn url(&self, token: Option<&AppToken>) -> Result<String, QueryError> {
        self.spec
            .clone()
            .param(LIMIT_PARAM, self.limit.to_string())
            .param(OFFSET_PARAM, self.offset.to_string())
            .url(token)
    }
}
