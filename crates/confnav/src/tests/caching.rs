use super::{CountingStore, schema};
use crate::node::{Container, ListElement, Navigate};
use crate::session::{Session, SessionConfig};
use crate::value::Value;
use futures::TryStreamExt;

async fn cached_session(store: &CountingStore) -> Session {
    Session::connect(
        schema(),
        store.clone(),
        SessionConfig {
            readonly: false,
            caching: true,
        },
    )
    .await
    .unwrap()
}

async fn read_leaf(root: &Container, name: &str) -> Option<Value> {
    root.child(name).await.unwrap().into_value().unwrap()
}

#[tokio::test]
async fn test_repeated_reads_reach_the_backend_once() {
    let store = CountingStore::default();
    let session = cached_session(&store).await;
    let root = session.root();

    assert_eq!(read_leaf(&root, "simpleleaf").await, None);
    assert_eq!(read_leaf(&root, "simpleleaf").await, None);
    assert_eq!(store.calls("get"), 1);
}

#[tokio::test]
async fn test_uncached_session_reads_through() {
    let store = CountingStore::default();
    let session = Session::connect(schema(), store.clone(), SessionConfig::default())
        .await
        .unwrap();
    let root = session.root();
    _ = read_leaf(&root, "simpleleaf").await;
    _ = read_leaf(&root, "simpleleaf").await;
    assert_eq!(store.calls("get"), 2);
}

#[tokio::test]
async fn test_any_write_invalidates_unrelated_entries() {
    let store = CountingStore::default();
    let session = cached_session(&store).await;
    let root = session.root();

    _ = read_leaf(&root, "simpleleaf").await;
    assert_eq!(store.calls("get"), 1);

    root.set("default", Some(Value::from("other"))).await.unwrap();
    _ = read_leaf(&root, "simpleleaf").await;
    assert_eq!(store.calls("get"), 2);
}

#[tokio::test]
async fn test_a_failed_write_still_invalidates() {
    let store = CountingStore::default();
    let session = cached_session(&store).await;
    let root = session.root();

    _ = read_leaf(&root, "simpleleaf").await;
    let list = root.child("simplelist").await.unwrap().into_list().unwrap();
    assert!(list.remove(&[Value::from("ghost")]).await.is_err());
    _ = read_leaf(&root, "simpleleaf").await;
    assert_eq!(store.calls("get"), 2);
}

#[tokio::test]
async fn test_list_length_and_iteration_share_the_unsorted_cache() {
    let store = CountingStore::default();
    let session = cached_session(&store).await;
    let list = session
        .root()
        .child("simplelist")
        .await
        .unwrap()
        .into_list()
        .unwrap();
    list.create(&[Value::from("B")]).await.unwrap();
    list.create(&[Value::from("A")]).await.unwrap();

    assert_eq!(list.len().await.unwrap(), 2);
    assert_eq!(list.len().await.unwrap(), 2);
    let unsorted: Vec<ListElement> = list
        .elements(false)
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(unsorted.len(), 2);
    assert_eq!(store.calls("gets_unsorted"), 1);
    assert_eq!(store.calls("gets_len"), 0);

    // the sorted view is cached separately
    let sorted: Vec<ListElement> = list.elements(true).await.unwrap().try_collect().await.unwrap();
    assert_eq!(
        sorted[0].handle().data_path(),
        "/integrationtest:simplelist[simplekey='A']"
    );
    let _: Vec<ListElement> = list.elements(true).await.unwrap().try_collect().await.unwrap();
    assert_eq!(store.calls("gets_sorted"), 1);
}

#[tokio::test]
async fn test_no_stale_list_after_create() {
    let store = CountingStore::default();
    let session = cached_session(&store).await;
    let list = session
        .root()
        .child("simplelist")
        .await
        .unwrap()
        .into_list()
        .unwrap();

    assert!(list.is_empty().await.unwrap());
    list.create(&[Value::from("A")]).await.unwrap();
    let found: Vec<ListElement> = list.elements(false).await.unwrap().try_collect().await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(list.len().await.unwrap(), 1);

    list.remove(&[Value::from("A")]).await.unwrap();
    assert!(list.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_membership_is_cached() {
    let store = CountingStore::default();
    let session = cached_session(&store).await;
    let list = session
        .root()
        .child("simplelist")
        .await
        .unwrap()
        .into_list()
        .unwrap();

    assert!(!list.contains(&[Value::from("A")]).await.unwrap());
    assert!(!list.contains(&[Value::from("A")]).await.unwrap());
    assert_eq!(store.calls("has_item"), 1);

    list.create(&[Value::from("A")]).await.unwrap();
    assert!(list.contains(&[Value::from("A")]).await.unwrap());
    assert_eq!(store.calls("has_item"), 2);
}

#[tokio::test]
async fn test_presence_is_cached() {
    let store = CountingStore::default();
    let session = cached_session(&store).await;
    let container = session
        .root()
        .child("simplecontainer")
        .await
        .unwrap()
        .into_presence_container()
        .unwrap();

    assert!(!container.exists().await.unwrap());
    assert!(!container.exists().await.unwrap());
    assert_eq!(store.calls("container"), 1);
    container.create().await.unwrap();
    assert!(container.exists().await.unwrap());
    assert_eq!(store.calls("container"), 2);
}

#[tokio::test]
async fn test_leaf_list_remove_refreshes_the_backend() {
    let store = CountingStore::default();
    let session = cached_session(&store).await;
    let simple = session
        .root()
        .child("morecomplex")
        .await
        .unwrap()
        .child("leaflists")
        .await
        .unwrap()
        .child("simple")
        .await
        .unwrap()
        .into_leaf_list()
        .unwrap();

    simple.add("A").await.unwrap();
    assert_eq!(store.calls("refresh"), 0);
    simple.remove("A").await.unwrap();
    assert_eq!(store.calls("refresh"), 1);
    assert!(simple.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_loads_invalidates() {
    let store = CountingStore::default();
    let session = cached_session(&store).await;
    let root = session.root();

    _ = read_leaf(&root, "simpleleaf").await;
    let payload = r#"{"module":"integrationtest","entries":[
        {"kind":"leaf","path":"/integrationtest:simpleleaf","value":"loaded"}
    ]}"#;
    session.loads(payload).await.unwrap();
    assert_eq!(read_leaf(&root, "simpleleaf").await, Some(Value::from("loaded")));
    assert_eq!(store.calls("get"), 2);
}
