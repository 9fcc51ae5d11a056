//! Sync continuation manager.
//!
//! A sync batch is read page by page: each page carries either a
//! pagination token (more pages follow) or a sync token (the batch is
//! drained; keep the token for the next incremental sync). Pages must be
//! requested one after another.

use crate::client::DeliveryClient;
use crate::error::{DeliveryError, DeliveryResult};
use crate::model::{SyncItem, SyncPage};
use crate::transport::HttpClient;
use chrono::{DateTime, Utc};
use deliverykit_query::{SyncContinuation, SyncRequest, SyncStart};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Everything drained from one sync batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncBatch {
    /// Items of every page, in order.
    pub items: Vec<SyncItem>,
    /// Token for the next incremental sync.
    pub sync_token: Option<String>,
    /// Pages fetched.
    pub pages: u32,
}

/// Issues sync requests and tracks the latest sync token.
pub struct SyncManager<C> {
    client: DeliveryClient<C>,
    last_sync_token: Arc<RwLock<Option<String>>>,
}

impl<C> Clone for SyncManager<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            last_sync_token: Arc::clone(&self.last_sync_token),
        }
    }
}

impl<C: HttpClient + 'static> SyncManager<C> {
    /// Creates a manager over `client`.
    pub fn new(client: DeliveryClient<C>) -> Self {
        Self {
            client,
            last_sync_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the most recent sync token received.
    pub fn last_sync_token(&self) -> Option<String> {
        self.last_sync_token.read().clone()
    }

    fn remember(&self, page: &SyncPage) {
        if let Some(token) = &page.sync_token {
            *self.last_sync_token.write() = Some(token.clone());
        }
    }

    /// Fetches one page.
    ///
    /// Tokens are forwarded as given; an unknown token is reported by the
    /// service and returned as an error.
    pub async fn sync(&self, request: &SyncRequest) -> DeliveryResult<SyncPage> {
        let prepared = self.client.prepare_sync(request);
        let page: SyncPage = self
            .client
            .execute(&prepared)
            .await
            .and_then(SyncPage::try_from)?;
        self.remember(&page);
        debug!(
            items = page.items.len(),
            more = page.pagination_token.is_some(),
            "Sync page received"
        );
        Ok(page)
    }

    /// Spawns a one-page sync and hands the outcome to `callback` exactly once.
    pub fn sync_with<F>(&self, request: &SyncRequest, callback: Option<F>) -> JoinHandle<()>
    where
        F: FnOnce(DeliveryResult<SyncPage>) + Send + 'static,
    {
        let manager = self.clone();
        let request = request.clone();
        tokio::spawn(async move {
            let result = manager.sync(&request).await;
            if let Some(callback) = callback {
                callback(result);
            }
        })
    }

    /// Starts a fresh, full sync.
    pub async fn sync_init(&self) -> DeliveryResult<SyncPage> {
        self.sync(&SyncRequest::init()).await
    }

    /// Resumes from a sync token of an earlier batch.
    pub async fn sync_with_token(&self, token: impl Into<String>) -> DeliveryResult<SyncPage> {
        self.sync(&SyncRequest::with_token(token)).await
    }

    /// Fetches the next page of an in-progress batch.
    pub async fn sync_with_pagination_token(
        &self,
        token: impl Into<String>,
    ) -> DeliveryResult<SyncPage> {
        self.sync(&SyncRequest::with_pagination_token(token)).await
    }

    /// Starts a fresh sync of changes after `date`.
    pub async fn sync_from_date(&self, date: DateTime<Utc>) -> DeliveryResult<SyncPage> {
        self.sync(&SyncRequest::from_date(date)).await
    }

    /// Follows pagination tokens from `request` until the batch drains.
    ///
    /// A pagination token already used in this batch, including the one
    /// `request` starts from, is an error, not a loop.
    pub async fn sync_all(&self, request: &SyncRequest) -> DeliveryResult<SyncBatch> {
        let mut batch = SyncBatch::default();
        let mut seen = HashSet::new();
        if let SyncStart::PaginationToken(token) = request.start() {
            seen.insert(token.clone());
        }
        let mut page = self.sync(request).await?;

        loop {
            batch.pages += 1;
            let cursor = page.cursor();
            batch.items.append(&mut page.items);

            match cursor.continuation() {
                SyncContinuation::NextPage(token) => {
                    if !seen.insert(token.clone()) {
                        return Err(DeliveryError::decode(format!(
                            "pagination token {token} was issued twice"
                        )));
                    }
                    page = self.sync_with_pagination_token(token).await?;
                }
                SyncContinuation::Resume(token) => {
                    batch.sync_token = Some(token);
                    break;
                }
                SyncContinuation::Drained => break,
            }
        }

        info!(
            pages = batch.pages,
            items = batch.items.len(),
            "Sync batch drained"
        );
        Ok(batch)
    }
}
