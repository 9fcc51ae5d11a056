//! Integration tests for the client against the in-memory delivery service.

use deliverykit_client::{
    Asset, AssetCollection, DeliveryResponse, DeliveryResult, Entry, EntryCollection, ErrorKind,
    SyncPage, TransportError,
};
use deliverykit_query::prelude::*;
use deliverykit_testkit::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

fn catalog() -> FakeDeliveryServer {
    let server = FakeDeliveryServer::new();
    for (uid, title) in [("e1", "Women"), ("e2", "Men"), ("e3", "Kids"), ("e4", "Women")] {
        server.add_entry("product", entry_json(uid, title));
    }
    server.add_asset(asset_json("a1", "logo.png"));
    server.add_asset(asset_json("a2", "hero.jpg"));
    server
}

fn sync_log(server: &FakeDeliveryServer, count: usize) {
    for i in 0..count {
        server.add_sync_item(sync_item_json(
            &format!("e{i}"),
            "entry_published",
            &format!("2024-01-{:02}T00:00:00.000Z", i % 28 + 1),
        ));
    }
}

#[tokio::test]
async fn query_pages_through_entries() {
    let client = test_client(catalog());

    let mut first = Query::entries("product");
    first.limit(2).include_count();
    let page: EntryCollection = client.find_as(&first).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page.count, Some(4));

    let mut second = Query::entries("product");
    second.skip(2).limit(2);
    let rest: EntryCollection = client.find_as(&second).await.unwrap();
    let uids: Vec<_> = page
        .entries
        .iter()
        .chain(rest.entries.iter())
        .map(|e| e.uid.as_str())
        .collect();
    assert_eq!(uids, vec!["e1", "e2", "e3", "e4"]);
}

#[tokio::test]
async fn equality_filter_and_content_type_schema() {
    let client = test_client(catalog());

    let mut query = Query::entries("product");
    query.where_eq("title", "Women").unwrap().include_content_type();
    let page: EntryCollection = client.find_as(&query).await.unwrap();
    assert_eq!(page.len(), 2);
    assert!(page.entries.iter().all(|e| e.title.as_deref() == Some("Women")));
    assert_eq!(page.content_type.map(|ct| ct.uid), Some("product".to_string()));
}

#[tokio::test]
async fn fetches_single_records() {
    let client = test_client(catalog());

    let entry: Entry = client.fetch_as(&Fetch::entry("product", "e3")).await.unwrap();
    assert_eq!(entry.title.as_deref(), Some("Kids"));
    assert_eq!(entry.content_type_uid.as_deref(), Some("product"));

    let asset: Asset = client.fetch_as(&Fetch::asset("a2")).await.unwrap();
    assert_eq!(asset.filename.as_deref(), Some("hero.jpg"));
    assert_eq!(asset.file_size, Some(1024));

    let assets: AssetCollection = client.find_as(&Query::assets()).await.unwrap();
    assert_eq!(assets.assets.len(), 2);
}

#[tokio::test]
async fn missing_entry_is_a_service_error() {
    let client = test_client(catalog());
    let err = client
        .fetch(&Fetch::entry("product", "missing"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Service);
    assert_eq!(err.status, Some(404));
    assert_eq!(err.code, 141);
}

#[tokio::test]
async fn retries_through_injected_failures() {
    let server = Arc::new(catalog());
    server.fail_next(InjectedFailure::Status(503));
    server.fail_next(InjectedFailure::Transport(TransportError::connection("reset")));
    let client = shared_test_client(Arc::clone(&server));

    let page: EntryCollection = client.find_as(&Query::entries("product")).await.unwrap();
    assert_eq!(page.len(), 4);
    assert_eq!(server.request_count(), 3);
    assert_eq!(client.stats().retries, 2);
}

#[tokio::test]
async fn non_retryable_status_is_delivered_without_retry() {
    let server = Arc::new(catalog());
    server.fail_next(InjectedFailure::Status(400));
    let client = shared_test_client(Arc::clone(&server));

    let err = client.find(&Query::entries("product")).await.unwrap_err();
    assert_eq!(err.status, Some(400));
    assert_eq!(server.request_count(), 1);
}

#[tokio::test]
async fn concurrent_requests_each_get_a_callback() {
    let client = test_client(catalog());
    let delivered = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let delivered = Arc::clone(&delivered);
            let mut query = Query::entries("product");
            query.skip(i % 4).limit(1);
            client.find_with(
                &query,
                Some(move |result: DeliveryResult<DeliveryResponse>| {
                    assert!(result.is_ok());
                    delivered.fetch_add(1, Ordering::SeqCst);
                }),
            )
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(delivered.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn null_callback_completes_without_raising() {
    let client = test_client(catalog());
    let ok = client.find_with(
        &Query::entries("product"),
        None::<fn(DeliveryResult<DeliveryResponse>)>,
    );
    let failed = client.fetch_with(
        &Fetch::entry("unknown", "e1"),
        None::<fn(DeliveryResult<DeliveryResponse>)>,
    );
    assert!(ok.await.is_ok());
    assert!(failed.await.is_ok());
}

#[tokio::test]
async fn pagination_tokens_never_overlap() {
    let server = FakeDeliveryServer::with_sync_page_size(5);
    sync_log(&server, 12);
    let manager = test_client(server).sync_manager();

    let first: SyncPage = manager.sync_init().await.unwrap();
    let token = first.pagination_token.clone().unwrap();
    let second = manager.sync_with_pagination_token(token).await.unwrap();

    let first_ids: HashSet<_> = first.items.iter().filter_map(|i| i.uid()).collect();
    let second_ids: HashSet<_> = second.items.iter().filter_map(|i| i.uid()).collect();
    assert_eq!(first_ids.len(), 5);
    assert_eq!(second_ids.len(), 5);
    assert!(first_ids.is_disjoint(&second_ids));
}

#[tokio::test]
async fn sync_all_then_resume_with_token() {
    let server = Arc::new(FakeDeliveryServer::with_sync_page_size(4));
    sync_log(&server, 10);
    let manager = shared_test_client(Arc::clone(&server)).sync_manager();

    let batch = manager.sync_all(&SyncRequest::init()).await.unwrap();
    assert_eq!(batch.items.len(), 10);
    assert_eq!(batch.pages, 3);
    let token = batch.sync_token.clone().unwrap();
    assert_eq!(manager.last_sync_token(), Some(token.clone()));

    server.add_sync_item(sync_item_json("late", "entry_updated", "2024-02-01T00:00:00.000Z"));
    let delta = manager.sync_with_token(token).await.unwrap();
    let uids: Vec<_> = delta.items.iter().filter_map(|i| i.uid()).collect();
    assert_eq!(uids, vec!["late"]);
    assert!(delta.sync_token.is_some());
}

#[tokio::test]
async fn sync_from_date_skips_older_items() {
    let server = FakeDeliveryServer::new();
    sync_log(&server, 10);
    let manager = test_client(server).sync_manager();

    let date = "2024-01-05T12:00:00Z".parse().unwrap();
    let page = manager.sync_from_date(date).await.unwrap();
    let uids: Vec<_> = page.items.iter().filter_map(|i| i.uid()).collect();
    assert_eq!(uids, vec!["e5", "e6", "e7", "e8", "e9"]);
}

#[tokio::test]
async fn garbage_token_produces_error_callback() {
    let manager = test_client(FakeDeliveryServer::new()).sync_manager();
    let (tx, rx) = oneshot::channel();

    manager
        .sync_with(
            &SyncRequest::with_token("%%garbage%%"),
            Some(move |result: DeliveryResult<SyncPage>| {
                let _ = tx.send(result);
            }),
        )
        .await
        .unwrap();

    let err = rx.await.unwrap().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Service);
    assert_eq!(err.status, Some(422));
    assert!(!err.details.is_null());
}
