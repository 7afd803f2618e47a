//! Narrow control-plane capability used by the lifecycle controller.
//!
//! The remote actions all shell out to the `aws` CLI, which owns
//! credentials and the session protocols. Keeping the surface to a trait
//! lets the lifecycle logic run against a fake in tests.

mod driver;

pub use driver::AwsCliDriver;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

#[async_trait]
pub trait EcsDriver: Send + Sync {
    /// Stop a running task. Never interruptible: teardown must complete.
    async fn stop_task(&self, cluster: &str, task_id: &str) -> Result<()>;

    /// Resolve the runtime ID of the task's first container.
    async fn container_runtime_id(
        &self,
        cluster: &str,
        task_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String>;

    /// Run a command in the task's container, output captured.
    async fn execute_command(
        &self,
        cluster: &str,
        task_id: &str,
        command: &str,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Run a command in the task's container, wired to the terminal.
    async fn execute_interactive(&self, cluster: &str, task_id: &str, command: &str) -> Result<()>;

    /// Start an SSM port-forwarding session against the container.
    async fn start_port_forward(
        &self,
        cluster: &str,
        task_id: &str,
        container_id: &str,
        remote_port: u16,
        local_port: u16,
        cancel: &CancellationToken,
    ) -> Result<()>;
}
