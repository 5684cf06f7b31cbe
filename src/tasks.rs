use crate::config::TasksConfig;
use crate::rest::RestApi;
use crate::rest::types::{Record, TaskStatus, TaskTag};
use hypercore_common::prelude::{Error, Result};
use std::time::{Duration, Instant};

/// Collection exposing the state of asynchronous platform tasks.
pub const TASK_TAG_ENDPOINT: &str = "/rest/v1/TaskTag";

/// Bounds of the polling loop.
///
/// # Fields
///
/// * `interval`: Pause between two polls.
/// * `timeout`: Total time after which polling gives up.
///
#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(600),
        }
    }
}

impl From<&TasksConfig> for PollOptions {
    fn from(config: &TasksConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.poll_interval_ms),
            timeout: Duration::from_secs(config.timeout_sec),
        }
    }
}

/// Waits for the task started by a create/update/delete call to finish.
///
/// Results without a task tag, and the check-mode placeholder, return at
/// once without contacting the platform.
///
/// # Arguments
///
/// * `client`: Client used to read the task resource. Reads bypass any cache.
/// * `task`: Record returned by the mutating call.
/// * `options`: Polling interval and timeout.
///
/// # Errors
///
/// * `Error::TaskFailed` with the full task record when the task ends in
///   `ERROR`.
/// * `Error::Timeout` when no terminal state is reached in time.
///
pub async fn wait_task<C>(client: &C, task: &Record, options: PollOptions) -> Result<()>
where
    C: RestApi + ?Sized,
{
    let Some(tag) = TaskTag::from_record(task) else {
        tracing::debug!(target: "task", "No task tag to wait for");
        return Ok(());
    };
    if tag.is_placeholder() {
        tracing::debug!(target: "task", %tag, "Check mode task, nothing to wait for");
        return Ok(());
    }

    wait_task_tag(client, &tag, options).await
}

/// Polls the task resource of `tag` until it is complete, with a timeout.
///
#[tracing::instrument(level = "debug", target = "task", skip(client, options))]
pub async fn wait_task_tag<C>(client: &C, tag: &TaskTag, options: PollOptions) -> Result<()>
where
    C: RestApi + ?Sized,
{
    let endpoint = format!("{}/{}", TASK_TAG_ENDPOINT, tag.encoded());
    let start = Instant::now();

    loop {
        let elapsed = start.elapsed();
        if elapsed > options.timeout {
            tracing::error!(target: "task", %tag, ?elapsed, "Task did not finish in time");
            return Err(Error::Timeout(elapsed.as_secs_f32()));
        }

        match task_status(client, &endpoint).await? {
            TaskStatus::Pending(state) => {
                tracing::trace!(target: "task", %tag, %state, "Task still running");
                tokio::time::sleep(options.interval).await;
            }
            TaskStatus::Completed => break,
            TaskStatus::Failed(details) => {
                tracing::error!(target: "task", %tag, %details, "Task failed");
                return Err(Error::TaskFailed(details));
            }
        }
    }

    tracing::info!(target: "task", %tag, "Task completed");
    Ok(())
}

async fn task_status<C>(client: &C, endpoint: &str) -> Result<TaskStatus>
where
    C: RestApi + ?Sized,
{
    let records = client.fetch_records(endpoint, None).await?;
    let task = records
        .first()
        .ok_or_else(|| Error::NotFound(format!("task at {}", endpoint)))?;

    Ok(TaskStatus::from_record(task))
}
