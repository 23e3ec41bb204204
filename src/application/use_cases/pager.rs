//! Offset-style pagination on top of a forward-only remote cursor.
//!
//! The provider's list API cannot seek, so reaching page N means pulling and
//! discarding every record on the pages before it. That keeps the HTTP
//! surface a plain `?page=` parameter at the cost of O(page * per_page)
//! remote records per request.

use serde::Serialize;

use crate::application::app_error::AppResult;
use crate::application::ports::billing_remote::RemoteCursor;

#[derive(Debug, Clone, Serialize)]
pub struct PagedResults<T> {
    pub items: Vec<T>,
    /// Total records in the remote list, not just this page.
    pub total: usize,
    pub per_page: usize,
    /// Zero-based page index.
    pub page: usize,
}

pub async fn pager_results<T>(
    cursor: &mut dyn RemoteCursor<T>,
    per_page: usize,
    page: usize,
) -> AppResult<PagedResults<T>> {
    let total = cursor.total();
    let mut skipped = 0usize;
    while skipped < page * per_page {
        if cursor.next().await?.is_none() {
            break;
        }
        skipped += 1;
    }

    let mut items = Vec::with_capacity(per_page);
    while items.len() < per_page {
        match cursor.next().await? {
            Some(item) => items.push(item),
            None => break,
        }
    }

    Ok(PagedResults {
        items,
        total,
        per_page,
        page,
    })
}
