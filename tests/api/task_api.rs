use crate::helpers::{TestPlatform, VM_ENDPOINT, fast_polling, record};
use hypercore::prelude::{Error, RestApi};
use hypercore::tasks::{self, PollOptions};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, ResponseTemplate};

const TASK_PATH: &str = "/rest/v1/TaskTag/1234";

fn task_answer(state: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "result": [{
            "taskTag": "1234",
            "state": state,
            "formattedMessage": "Unable to start VM %@",
            "messageParameters": ["web"],
        }]
    }))
}

#[tokio::test]
async fn wait_task_returns_once_complete() {
    // Arrange
    let platform = TestPlatform::new().await;
    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(task_answer("RUNNING"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&platform.server)
        .await;
    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(task_answer("COMPLETE"))
        .expect(1)
        .mount(&platform.server)
        .await;
    let client = platform.client();
    let task = record(json!({"taskTag": "1234", "createdUUID": "vm-9"}));

    // Act
    let result = tasks::wait_task(&client, &task, fast_polling()).await;

    // Assert
    assert!(result.is_ok());
    platform.server.verify().await;
}

#[tokio::test]
async fn wait_task_surfaces_task_error() {
    // Arrange
    let platform = TestPlatform::new().await;
    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(task_answer("RUNNING"))
        .up_to_n_times(1)
        .mount(&platform.server)
        .await;
    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(task_answer("ERROR"))
        .mount(&platform.server)
        .await;
    let client = platform.client();
    let task = record(json!({"taskTag": "1234"}));

    // Act
    let result = tasks::wait_task(&client, &task, fast_polling()).await;

    // Assert
    match result.unwrap_err() {
        Error::TaskFailed(details) => {
            assert!(details.contains("\"taskTag\":\"1234\""));
            assert!(details.contains("\"state\":\"ERROR\""));
            assert!(details.contains("Unable to start VM"));
        }
        error => panic!("unexpected error: {}", error),
    }
}

#[tokio::test]
async fn wait_task_times_out() {
    // Arrange
    let platform = TestPlatform::new().await;
    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(task_answer("RUNNING"))
        .mount(&platform.server)
        .await;
    let client = platform.client();
    let task = record(json!({"taskTag": "1234"}));
    let options = PollOptions {
        interval: Duration::from_millis(10),
        timeout: Duration::from_millis(100),
    };

    // Act
    let result = tasks::wait_task(&client, &task, options).await;

    // Assert
    match result.unwrap_err() {
        Error::Timeout(elapsed) => assert!(elapsed >= 0.1),
        error => panic!("unexpected error: {}", error),
    }
}

#[tokio::test]
async fn wait_task_for_missing_task_record() {
    // Arrange
    let platform = TestPlatform::new().await;
    platform.mount_table(TASK_PATH, json!([]), 1).await;
    let client = platform.client();
    let task = record(json!({"taskTag": "1234"}));

    // Act
    let result = tasks::wait_task(&client, &task, fast_polling()).await;

    // Assert
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn check_mode_task_is_not_polled() {
    // Arrange
    let platform = TestPlatform::new().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&platform.server)
        .await;
    let client = platform.client();

    // Act
    let task = client
        .create_record(VM_ENDPOINT, &json!({"name": "web"}), true, None)
        .await
        .unwrap();
    let placeholder = tasks::wait_task(&client, &task, fast_polling()).await;
    let untagged = tasks::wait_task(&client, &record(json!({"taskTag": ""})), fast_polling()).await;

    // Assert
    assert!(placeholder.is_ok());
    assert!(untagged.is_ok());
}

#[tokio::test]
async fn cached_client_polls_the_platform_every_time() {
    // Arrange
    let platform = TestPlatform::new().await;
    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(task_answer("QUEUED"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&platform.server)
        .await;
    Mock::given(method("GET"))
        .and(path(TASK_PATH))
        .respond_with(task_answer("COMPLETE"))
        .expect(1)
        .mount(&platform.server)
        .await;
    let client = platform.cached_client();
    let task = record(json!({"taskTag": 1234}));

    // Act
    let result = tasks::wait_task(&client, &task, fast_polling()).await;

    // Assert
    assert!(result.is_ok());
    platform.server.verify().await;
}
