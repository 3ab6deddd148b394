//! Pagination over a query
//!
//! Ragic returns at most `limit` records per request. A full extraction
//! requests pages at increasing offsets until a page comes back without
//! records, then stacks the per-page tables. Pages may disagree on their
//! column sets; stacking is diagonal, so a column missing from one page is
//! null for that page's rows.

use super::client::RagicClient;
use super::error::Result;
use super::normalize::ColumnPolicy;
use super::query::QueryDescriptor;
use polars::prelude::*;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PageOptions {
    /// Records requested per page
    pub page_size: usize,

    /// Offset of the first page
    pub start_offset: usize,

    /// Stop after this many pages
    pub max_pages: Option<usize>,

    /// Pause between successive requests
    pub delay: Option<Duration>,

    pub policy: ColumnPolicy,
}

impl Default for PageOptions {
    fn default() -> Self {
        PageOptions {
            page_size: 100,
            start_offset: 0,
            max_pages: None,
            delay: None,
            policy: ColumnPolicy::Observed,
        }
    }
}

/// Stack per-page tables into one
///
/// Returns `None` for an empty list.
pub fn concat_pages(pages: Vec<DataFrame>) -> Result<Option<DataFrame>> {
    match pages.len() {
        0 => Ok(None),
        1 => Ok(pages.into_iter().next()),
        _ => {
            let frames: Vec<LazyFrame> = pages.into_iter().map(|df| df.lazy()).collect();
            let df = concat_lf_diagonal(frames, UnionArgs::default())?.collect()?;
            Ok(Some(df))
        }
    }
}

/// Fetch every page of `query` and return them as one table
///
/// Stops at the first page without records. Transport errors abort the
/// whole extraction; they are never read as end of data.
pub async fn fetch_all(
    client: &RagicClient,
    query: &QueryDescriptor,
    options: &PageOptions,
) -> Result<Option<DataFrame>> {
    let page_size = options.page_size.max(1);
    let mut offset = options.start_offset;
    let mut pages = Vec::new();

    loop {
        if options.max_pages.is_some_and(|max| pages.len() >= max) {
            tracing::info!(pages = pages.len(), "Page limit reached");
            break;
        }

        if !pages.is_empty() {
            if let Some(delay) = options.delay {
                tokio::time::sleep(delay).await;
            }
        }

        match client
            .fetch_dataframe(query, offset, page_size, options.policy)
            .await?
        {
            Some(df) => {
                tracing::debug!(offset, rows = df.height(), "Fetched page");
                pages.push(df);
                offset += page_size;
            }
            None => break,
        }
    }

    let total = concat_pages(pages)?;
    tracing::info!(
        tab = query.tab(),
        table = query.table(),
        rows = total.as_ref().map(|df| df.height()).unwrap_or(0),
        "Extraction finished"
    );
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ragic::client::tests::{serve, test_client};
    use crate::ragic::error::RagicError;
    use crate::ragic::query::QueryOptions;

    #[test]
    fn test_concat_pages_diagonal() {
        let a = df! {
            "index" => ["1"],
            "Amount" => [Some(1.0f32)],
        }
        .unwrap();
        let b = df! {
            "index" => ["2"],
            "Name" => ["B"],
        }
        .unwrap();

        let all = concat_pages(vec![a, b]).unwrap().unwrap();
        assert_eq!(all.height(), 2);
        assert_eq!(all.width(), 3);
        assert_eq!(all.column("Amount").unwrap().null_count(), 1);
        assert_eq!(all.column("Name").unwrap().null_count(), 1);
    }

    #[test]
    fn test_concat_no_pages() {
        assert!(concat_pages(Vec::new()).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_all_until_empty() {
        let (base_url, server) = serve(vec![
            (200, r#"{"1": {"Amount": "1"}, "2": {"Amount": "2"}}"#.to_string()),
            (200, r#"{"3": {"Name": "C"}}"#.to_string()),
            (200, "{}".to_string()),
        ])
        .await;
        let client = test_client(&base_url);
        let query = client
            .define_query("PB", "Donations", None, &QueryOptions::default())
            .unwrap();
        let options = PageOptions {
            page_size: 2,
            delay: Some(Duration::from_millis(1)),
            ..Default::default()
        };

        let df = fetch_all(&client, &query, &options).await.unwrap().unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.column("Amount").unwrap().dtype(), &DataType::Float32);

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 3);
        assert!(requests[0].contains("limit=2&offset=0"));
        assert!(requests[1].contains("limit=2&offset=2"));
        assert!(requests[2].contains("limit=2&offset=4"));
    }

    #[tokio::test]
    async fn test_fetch_all_respects_max_pages() {
        let (base_url, server) = serve(vec![(200, r#"{"1": {"Name": "A"}}"#.to_string())]).await;
        let client = test_client(&base_url);
        let query = client
            .define_query("PB", "Donations", None, &QueryOptions::default())
            .unwrap();
        let options = PageOptions {
            page_size: 1,
            max_pages: Some(1),
            ..Default::default()
        };

        let df = fetch_all(&client, &query, &options).await.unwrap().unwrap();
        assert_eq!(df.height(), 1);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_all_stops_on_error() {
        let (base_url, server) = serve(vec![
            (200, r#"{"1": {"Name": "A"}}"#.to_string()),
            (502, String::new()),
        ])
        .await;
        let client = test_client(&base_url);
        let query = client
            .define_query("PB", "Donations", None, &QueryOptions::default())
            .unwrap();
        let options = PageOptions {
            page_size: 1,
            ..Default::default()
        };

        let result = fetch_all(&client, &query, &options).await;
        assert!(matches!(result, Err(RagicError::Http { status: 502, .. })));
        server.await.unwrap();
    }
}
