use super::data::RawRecordSet;
use super::error::{RagicError, Result};
use super::normalize::{normalize, ColumnPolicy};
use super::query::{self, Condition, QueryDescriptor, QueryOptions};
use super::schema::Schema;
use crate::config::ConnectionConfig;
use polars::prelude::DataFrame;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

/// Result of one page request that reached the backend
#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    /// The backend returned at least one record
    Records(RawRecordSet),
    /// The backend returned no records: end of data for this query
    Empty,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        matches!(self, Page::Empty)
    }
}

fn auth_headers(api_key: &str) -> Result<HeaderMap> {
    let mut value = HeaderValue::from_str(&format!("Basic {}", api_key))
        .map_err(|_| RagicError::Config("API key contains invalid header characters".into()))?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

/// Ragic HTTP client
///
/// Holds the connection settings and the parsed structure file. Queries are
/// compiled into `QueryDescriptor` values and passed to `fetch_page`
/// explicitly, so one client can serve several queries.
pub struct RagicClient {
    http: reqwest::Client,
    base_url: String,
    namespace: String,
    version: u32,
    schema: Schema,
}

impl RagicClient {
    /// Create a client, loading the structure file named in `config`
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        let schema = Schema::load(&config.structure_path)?;
        Self::with_schema(config, schema)
    }

    /// Create a client around an already loaded schema
    pub fn with_schema(config: &ConnectionConfig, schema: Schema) -> Result<Self> {
        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(RagicError::Config(format!(
                "Base URL '{}' must start with http:// or https://",
                config.base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(auth_headers(&config.api_key)?)
            .build()?;

        Ok(RagicClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            namespace: config.namespace.clone(),
            version: config.version,
            schema,
        })
    }

    /// Create a client from `RAGIC_URL`, `RAGIC_NAMESPACE` and `RAGIC_API_KEY`
    pub fn from_env() -> Result<Self> {
        Self::new(&ConnectionConfig::from_env()?)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Compile a query for `tab`/`table` against this client's schema
    pub fn define_query(
        &self,
        tab: &str,
        table: &str,
        conditions: Option<&[Condition]>,
        options: &QueryOptions,
    ) -> Result<QueryDescriptor> {
        query::define_query(&self.schema, self.version, tab, table, conditions, options)
    }

    /// Full URL for one page of `query`
    pub fn page_url(&self, query: &QueryDescriptor, offset: usize, limit: usize) -> Result<String> {
        let resource = self.schema.resource_path(query.tab(), query.table())?;
        Ok(format!(
            "{}/{}/{}?{}",
            self.base_url,
            self.namespace,
            resource,
            query.page_query(offset, limit)
        ))
    }

    /// Fetch one page of raw records
    ///
    /// Network failures and non-2xx statuses are logged and returned as
    /// errors; only a well-formed response without records is `Page::Empty`.
    pub async fn fetch_page(
        &self,
        query: &QueryDescriptor,
        offset: usize,
        limit: usize,
    ) -> Result<Page> {
        let url = self.page_url(query, offset, limit)?;
        tracing::info!(url = %url, "Fetching page");

        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Request failed");
                return Err(RagicError::Transport(e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                url = %url,
                status = status.as_u16(),
                "Backend returned an error status"
            );
            return Err(RagicError::Http {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await.map_err(|e| {
            tracing::error!(url = %url, error = %e, "Failed to read response body");
            RagicError::Transport(e)
        })?;

        let records = RawRecordSet::from_json(&body)?;
        tracing::info!(records = records.len(), offset, limit, "Page received");

        if records.is_empty() {
            Ok(Page::Empty)
        } else {
            Ok(Page::Records(records))
        }
    }

    /// Fetch one page and normalize it into a DataFrame
    ///
    /// `None` means the page had no records.
    pub async fn fetch_dataframe(
        &self,
        query: &QueryDescriptor,
        offset: usize,
        limit: usize,
        policy: ColumnPolicy,
    ) -> Result<Option<DataFrame>> {
        match self.fetch_page(query, offset, limit).await? {
            Page::Empty => Ok(None),
            Page::Records(records) => {
                let table = self.schema.table(query.tab(), query.table())?;
                normalize(&records, table, policy)
            }
        }
    }
}
