use crate::helpers::{NODE_ENDPOINT, TestPlatform, VM_ENDPOINT, query, vms};
use hypercore::prelude::{Error, RestApi};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn first_list_fetches_once_and_later_lists_use_cache() {
    // Arrange
    let platform = TestPlatform::new().await;
    platform.mount_table(VM_ENDPOINT, vms(), 1).await;
    let client = platform.cached_client();
    let web = query(json!({"name": "web"}));
    let db = query(json!({"name": "db"}));

    // Act
    let first = client.list_records(VM_ENDPOINT, Some(&web), None).await.unwrap();
    let second = client.list_records(VM_ENDPOINT, Some(&db), None).await.unwrap();
    let all = client.list_records(VM_ENDPOINT, None, None).await.unwrap();

    // Assert
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 1);
    assert_eq!(second[0]["uuid"], "vm-2");
    assert_eq!(all.len(), 3);
    platform.server.verify().await;
}

#[tokio::test]
async fn narrowing_first_query_still_caches_full_table() {
    // Arrange
    let platform = TestPlatform::new().await;
    platform.mount_table(VM_ENDPOINT, vms(), 1).await;
    let client = platform.cached_client();
    let narrow = query(json!({"uuid": "vm-3"}));

    // Act
    let narrowed = client.list_records(VM_ENDPOINT, Some(&narrow), None).await.unwrap();
    let running = client
        .list_records(VM_ENDPOINT, Some(&query(json!({"state": "RUNNING"}))), None)
        .await
        .unwrap();

    // Assert
    assert_eq!(narrowed.len(), 1);
    assert_eq!(running.len(), 2);
    assert_eq!(client.cached_endpoints().await, vec![VM_ENDPOINT.to_owned()]);
}

#[tokio::test]
async fn endpoints_are_cached_independently() {
    // Arrange
    let platform = TestPlatform::new().await;
    platform.mount_table(VM_ENDPOINT, vms(), 1).await;
    platform
        .mount_table(NODE_ENDPOINT, json!([{"uuid": "node-1", "peerID": 1}]), 1)
        .await;
    let client = platform.cached_client();

    // Act
    client.list_records(VM_ENDPOINT, None, None).await.unwrap();
    let nodes = client.list_records(NODE_ENDPOINT, None, None).await.unwrap();
    client.list_records(NODE_ENDPOINT, None, None).await.unwrap();
    client.list_records(VM_ENDPOINT, None, None).await.unwrap();

    // Assert
    assert_eq!(nodes.len(), 1);
    assert_eq!(
        client.cached_endpoints().await,
        vec![NODE_ENDPOINT.to_owned(), VM_ENDPOINT.to_owned()]
    );
    platform.server.verify().await;
}

#[tokio::test]
async fn get_record_is_served_from_cache() {
    // Arrange
    let platform = TestPlatform::new().await;
    platform.mount_table(VM_ENDPOINT, vms(), 1).await;
    let client = platform.cached_client();

    // Act
    let db = client
        .get_record(VM_ENDPOINT, Some(&query(json!({"name": "db"}))), true)
        .await
        .unwrap();
    let missing = client
        .get_record(VM_ENDPOINT, Some(&query(json!({"name": "mail"}))), true)
        .await;

    // Assert
    assert_eq!(db.unwrap()["uuid"], "vm-2");
    assert!(matches!(missing, Err(Error::NotFound(_))));
    platform.server.verify().await;
}

#[tokio::test]
async fn failed_fetch_is_not_cached() {
    // Arrange
    let platform = TestPlatform::new().await;
    Mock::given(method("GET"))
        .and(path(VM_ENDPOINT))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&platform.server)
        .await;
    platform.mount_table(VM_ENDPOINT, vms(), 1).await;
    let client = platform.cached_client();

    // Act
    let failed = client.list_records(VM_ENDPOINT, None, None).await;
    let retried = client.list_records(VM_ENDPOINT, None, None).await.unwrap();

    // Assert
    assert!(failed.is_err());
    assert_eq!(retried.len(), 3);
}

#[tokio::test]
async fn clear_cache_forces_a_new_fetch() {
    // Arrange
    let platform = TestPlatform::new().await;
    platform.mount_table(VM_ENDPOINT, vms(), 2).await;
    let client = platform.cached_client();

    // Act
    client.list_records(VM_ENDPOINT, None, None).await.unwrap();
    client.clear_cache().await;
    let records = client.list_records(VM_ENDPOINT, None, None).await.unwrap();

    // Assert
    assert_eq!(records.len(), 3);
    platform.server.verify().await;
}

#[tokio::test]
async fn fetch_records_bypasses_cache() {
    // Arrange
    let platform = TestPlatform::new().await;
    platform.mount_table(VM_ENDPOINT, vms(), 2).await;
    let client = platform.cached_client();

    // Act
    client.list_records(VM_ENDPOINT, None, None).await.unwrap();
    let fresh = client.fetch_records(VM_ENDPOINT, None).await.unwrap();

    // Assert
    assert_eq!(fresh.len(), 3);
    platform.server.verify().await;
}

#[tokio::test]
async fn check_mode_is_delegated() {
    // Arrange
    let platform = TestPlatform::new().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&platform.server)
        .await;
    let client = platform.cached_client();

    // Act
    let created = client
        .create_record(VM_ENDPOINT, &json!({"name": "web"}), true, None)
        .await
        .unwrap();
    let deleted = client.delete_record(VM_ENDPOINT, true, None).await.unwrap();

    // Assert
    assert!(deleted.is_none());
    assert_eq!(created["taskTag"], "00000");
    assert_eq!(created["createdUUID"], "0000000000");
}
