use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::EcsDriver;
use crate::error::{Result, SortieError};
use crate::process::{run_captured, run_interactive, CommandOutput};

/// How many times an SSM session start is attempted before the last
/// failure is surfaced. The exec agent inside a freshly-running task
/// needs a few seconds to come up.
const SESSION_START_ATTEMPTS: u32 = 30;
const SESSION_RETRY_INTERVAL: Duration = Duration::from_secs(1);

pub struct AwsCliDriver {
    bin: String,
}

impl AwsCliDriver {
    pub fn new() -> Self {
        Self {
            bin: "aws".to_string(),
        }
    }

    fn execute_command_argv(&self, cluster: &str, task_id: &str, command: &str) -> Vec<String> {
        vec![
            self.bin.clone(),
            "ecs".to_string(),
            "execute-command".to_string(),
            "--cluster".to_string(),
            cluster.to_string(),
            "--task".to_string(),
            task_id.to_string(),
            "--interactive".to_string(),
            "--command".to_string(),
            command.to_string(),
        ]
    }
}

impl Default for AwsCliDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EcsDriver for AwsCliDriver {
    async fn stop_task(&self, cluster: &str, task_id: &str) -> Result<()> {
        let argv = vec![
            self.bin.clone(),
            "ecs".to_string(),
            "stop-task".to_string(),
            "--cluster".to_string(),
            cluster.to_string(),
            "--task".to_string(),
            task_id.to_string(),
        ];

        // Teardown must run to completion even under an active interrupt.
        let inert = CancellationToken::new();
        let out = run_captured(&argv, true, &inert).await?;
        remote_result(&out, "StopTask", &format!("{cluster}/{task_id}"))
    }

    async fn container_runtime_id(
        &self,
        cluster: &str,
        task_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let argv = vec![
            self.bin.clone(),
            "ecs".to_string(),
            "describe-tasks".to_string(),
            "--cluster".to_string(),
            cluster.to_string(),
            "--tasks".to_string(),
            task_id.to_string(),
            "--output".to_string(),
            "json".to_string(),
        ];

        let out = run_captured(&argv, true, cancel).await?;
        remote_result(&out, "DescribeTasks", &format!("{task_id}/{cluster}"))?;

        parse_container_runtime_id(&out.stdout, cluster, task_id)
    }

    async fn execute_command(
        &self,
        cluster: &str,
        task_id: &str,
        command: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let argv = self.execute_command_argv(cluster, task_id, command);
        let out = run_captured(&argv, true, cancel).await?;
        out.ensure_success("aws ecs execute-command")
    }

    async fn execute_interactive(&self, cluster: &str, task_id: &str, command: &str) -> Result<()> {
        let argv = self.execute_command_argv(cluster, task_id, command);
        let status = run_interactive(&argv).await?;

        if !status.success() {
            return Err(SortieError::Subprocess {
                command: "aws ecs execute-command".to_string(),
                detail: status.to_string(),
            });
        }

        Ok(())
    }

    async fn start_port_forward(
        &self,
        cluster: &str,
        task_id: &str,
        container_id: &str,
        remote_port: u16,
        local_port: u16,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let target = format!("ecs:{cluster}_{task_id}_{container_id}");
        let params =
            format!(r#"{{"portNumber":["{remote_port}"],"localPortNumber":["{local_port}"]}}"#);
        let argv = vec![
            self.bin.clone(),
            "ssm".to_string(),
            "start-session".to_string(),
            "--target".to_string(),
            target,
            "--document-name".to_string(),
            "AWS-StartPortForwardingSession".to_string(),
            "--parameters".to_string(),
            params,
        ];

        let mut last_err = SortieError::Other("session never attempted".to_string());

        for _ in 0..SESSION_START_ATTEMPTS {
            let out = run_captured(&argv, true, cancel).await?;
            match out.ensure_success("aws ssm start-session") {
                Ok(()) => return Ok(()),
                Err(SortieError::Interrupted) => return Err(SortieError::Interrupted),
                Err(e) => {
                    warn!(error = %e, "failed to start session, retrying");
                    last_err = e;
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(SortieError::Interrupted),
                _ = tokio::time::sleep(SESSION_RETRY_INTERVAL) => {}
            }
        }

        Err(last_err)
    }
}

fn remote_result(out: &CommandOutput, operation: &str, detail: &str) -> Result<()> {
    match out.ensure_success(operation) {
        Ok(()) => Ok(()),
        Err(SortieError::Interrupted) => Err(SortieError::Interrupted),
        Err(_) => Err(SortieError::RemoteCall {
            operation: operation.to_string(),
            detail: detail.to_string(),
        }),
    }
}

fn parse_container_runtime_id(json_text: &str, cluster: &str, task_id: &str) -> Result<String> {
    let doc: Value = serde_json::from_str(json_text)?;

    let task = doc
        .get("tasks")
        .and_then(|t| t.get(0))
        .ok_or_else(|| SortieError::RemoteCall {
            operation: "DescribeTasks".to_string(),
            detail: format!("task not found: {task_id}/{cluster}"),
        })?;

    task.get("containers")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("runtimeId"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SortieError::RemoteCall {
            operation: "DescribeTasks".to_string(),
            detail: format!("container not found: {task_id}/{cluster}"),
        })
}
