//! Stateful query session
//!
//! Keeps one active query per session: `define_query` replaces it, fetches
//! read it and leave it in place so pages can be requested repeatedly with
//! different offsets. A session borrows its client and is meant for a
//! single caller; independent callers should each hold their own session
//! or pass `QueryDescriptor` values to `RagicClient` directly.

use super::client::{Page, RagicClient};
use super::error::{RagicError, Result};
use super::normalize::ColumnPolicy;
use super::query::{Condition, QueryDescriptor, QueryOptions};
use polars::prelude::DataFrame;

pub struct QuerySession<'a> {
    client: &'a RagicClient,
    active: Option<QueryDescriptor>,
    policy: ColumnPolicy,
}

impl<'a> QuerySession<'a> {
    pub fn new(client: &'a RagicClient) -> Self {
        QuerySession {
            client,
            active: None,
            policy: ColumnPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ColumnPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Compile and activate a query, replacing any previous one
    ///
    /// On failure the previously active query stays active.
    pub fn define_query(
        &mut self,
        tab: &str,
        table: &str,
        conditions: Option<&[Condition]>,
        include_subtables: bool,
    ) -> Result<&QueryDescriptor> {
        let options = QueryOptions {
            include_subtables,
            ..Default::default()
        };
        self.define_query_with(tab, table, conditions, &options)
    }

    /// `define_query` with listing/ordering options
    pub fn define_query_with(
        &mut self,
        tab: &str,
        table: &str,
        conditions: Option<&[Condition]>,
        options: &QueryOptions,
    ) -> Result<&QueryDescriptor> {
        let query = self.client.define_query(tab, table, conditions, options)?;
        Ok(self.active.insert(query))
    }

    pub fn active_query(&self) -> Option<&QueryDescriptor> {
        self.active.as_ref()
    }

    pub fn active_tab(&self) -> Option<&str> {
        self.active.as_ref().map(|q| q.tab())
    }

    pub fn active_table(&self) -> Option<&str> {
        self.active.as_ref().map(|q| q.table())
    }

    fn ready(&self) -> Result<&QueryDescriptor> {
        self.active.as_ref().ok_or(RagicError::QueryNotReady)
    }

    /// Fetch one page of the active query
    pub async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Page> {
        let query = self.ready()?;
        self.client.fetch_page(query, offset, limit).await
    }

    /// Fetch and normalize one page of the active query
    pub async fn get_dataframe(&self, offset: usize, limit: usize) -> Result<Option<DataFrame>> {
        let query = self.ready()?;
        self.client
            .fetch_dataframe(query, offset, limit, self.policy)
            .await
    }
}
