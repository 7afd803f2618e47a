//! Task lifecycle controller.
//!
//! Drives one invocation from composed bundle to torn-down task: submit
//! through the runner, extract the assigned task ID from its output,
//! supervise the optional interactive phase, and guarantee the stop call
//! fires at most once across completion, errors, and interrupts.

mod state;

pub use state::TaskState;

use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::aws::EcsDriver;
use crate::definition::Definition;
use crate::error::{Result, SortieError};
use crate::process::StopGuard;
use crate::runner::{Runner, WaitMode};
use state::StateTracker;

/// How long the controller keeps probing for the exec agent after the
/// platform reports the task running. The agent inside the container
/// lags the task state; the gap is tolerated, not treated as failure,
/// until this budget is exhausted.
const EXEC_READY_ATTEMPTS: u32 = 30;
const EXEC_READY_INTERVAL: Duration = Duration::from_secs(1);

pub struct TaskLifecycle {
    runner: Box<dyn Runner>,
    driver: Arc<dyn EcsDriver>,
    dry_run: bool,
}

impl TaskLifecycle {
    pub fn new(runner: Box<dyn Runner>, driver: Arc<dyn EcsDriver>, dry_run: bool) -> Self {
        Self {
            runner,
            driver,
            dry_run,
        }
    }

    /// Submit the bundle and wait for the task to stop. The task is
    /// stopped through the guard even when the runner exits early, as
    /// long as a task ID made it into the output.
    pub async fn run(&self, def: &Definition, cancel: &CancellationToken) -> Result<()> {
        let mut state = StateTracker::new();
        state.advance(TaskState::Composing);

        if self.dry_run {
            def.print();
            return Ok(());
        }

        let out = self.runner.submit(def, WaitMode::UntilStopped, cancel).await?;
        state.advance(TaskState::Submitted);

        let task = self.launched(def, find_task_id(&out.stdout));
        let result = out.ensure_success("ecspresso run").and_then(|()| {
            if task.has_id() {
                Ok(())
            } else {
                Err(SortieError::TaskIdNotFound)
            }
        });

        match &result {
            Ok(()) => state.advance(TaskState::Stopped),
            Err(_) => state.advance(TaskState::Failed),
        }

        task.stop().await;
        state.advance(TaskState::TornDown);

        result
    }

    /// Submit the bundle, wait for the task to run, then attach an
    /// interactive shell. With `skip_stop` the task is left running and
    /// reconnection instructions are printed instead of the stop call.
    pub async fn exec(
        &self,
        def: &Definition,
        command: &str,
        skip_stop: bool,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut state = StateTracker::new();
        state.advance(TaskState::Composing);

        if self.dry_run {
            def.print();
            return Ok(());
        }

        let task = self.submit_until_running(def, &mut state, cancel).await?;

        let result = self.attach_shell(&task, command, cancel).await;
        if result.is_err() {
            state.advance(TaskState::Failed);
        }

        if skip_stop {
            task.detach(command);
        } else {
            task.stop().await;
        }
        state.advance(TaskState::TornDown);

        result
    }

    /// Submit the bundle, wait for the task to run, then forward a local
    /// port through an SSM session until the session ends.
    pub async fn port_forward(
        &self,
        def: &Definition,
        remote_port: u16,
        local_port: u16,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut state = StateTracker::new();
        state.advance(TaskState::Composing);

        if self.dry_run {
            def.print();
            return Ok(());
        }

        let task = self.submit_until_running(def, &mut state, cancel).await?;

        let result = self
            .forward_session(&task, remote_port, local_port, cancel)
            .await;
        if result.is_err() {
            state.advance(TaskState::Failed);
        }

        task.stop().await;
        state.advance(TaskState::TornDown);

        result
    }

    async fn submit_until_running(
        &self,
        def: &Definition,
        state: &mut StateTracker,
        cancel: &CancellationToken,
    ) -> Result<LaunchedTask> {
        let out = self.runner.submit(def, WaitMode::UntilRunning, cancel).await?;
        state.advance(TaskState::Submitted);

        out.ensure_success("ecspresso run")?;
        let task_id = find_task_id(&out.stdout).ok_or(SortieError::TaskIdNotFound)?;
        state.advance(TaskState::Running);
        info!("ECS task is running: {task_id}");

        Ok(self.launched(def, Some(task_id)))
    }

    fn launched(&self, def: &Definition, task_id: Option<String>) -> LaunchedTask {
        LaunchedTask::new(
            Arc::clone(&self.driver),
            def.cluster.clone(),
            task_id.unwrap_or_default(),
        )
    }

    async fn attach_shell(
        &self,
        task: &LaunchedTask,
        command: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.wait_exec_ready(task, cancel).await?;

        self.driver
            .execute_interactive(&task.cluster, &task.task_id, command)
            .await
    }

    /// Probe the exec agent with a no-op command until it answers.
    async fn wait_exec_ready(&self, task: &LaunchedTask, cancel: &CancellationToken) -> Result<()> {
        let mut last_err = None;

        for attempt in 0..EXEC_READY_ATTEMPTS {
            match self
                .driver
                .execute_command(&task.cluster, &task.task_id, "id", cancel)
                .await
            {
                Ok(()) => return Ok(()),
                Err(SortieError::Interrupted) => return Err(SortieError::Interrupted),
                Err(e) => {
                    debug!(attempt, error = %e, "exec agent not ready");
                    last_err = Some(e);
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(SortieError::Interrupted),
                _ = tokio::time::sleep(EXEC_READY_INTERVAL) => {}
            }
        }

        Err(SortieError::Other(format!(
            "exec agent not ready after {EXEC_READY_ATTEMPTS} attempts: {}",
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    async fn forward_session(
        &self,
        task: &LaunchedTask,
        remote_port: u16,
        local_port: u16,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let container_id = self
            .driver
            .container_runtime_id(&task.cluster, &task.task_id, cancel)
            .await?;

        info!("Start port forwarding...");

        self.driver
            .start_port_forward(
                &task.cluster,
                &task.task_id,
                &container_id,
                remote_port,
                local_port,
                cancel,
            )
            .await
    }
}

/// A submitted task plus its single-fire teardown.
pub struct LaunchedTask {
    driver: Arc<dyn EcsDriver>,
    cluster: String,
    task_id: String,
    guard: StopGuard,
}

impl LaunchedTask {
    pub fn new(driver: Arc<dyn EcsDriver>, cluster: String, task_id: String) -> Self {
        Self {
            driver,
            cluster,
            task_id,
            guard: StopGuard::new(),
        }
    }

    pub fn has_id(&self) -> bool {
        !self.task_id.is_empty()
    }

    /// Stop the remote task, at most once across all exit paths. Stop
    /// failures are logged, never escalated: teardown must not mask the
    /// invocation's primary outcome.
    pub async fn stop(&self) {
        if !self.has_id() || !self.guard.arm() {
            return;
        }

        info!("Stopping ECS task... (Please wait for a while): {}", self.task_id);

        if let Err(e) = self.driver.stop_task(&self.cluster, &self.task_id).await {
            warn!(error = %e, task_id = %self.task_id, "failed to stop ECS task");
        }
    }

    /// Leave the task running and print how to get back to it.
    pub fn detach(&self, command: &str) {
        if !self.has_id() || !self.guard.arm() {
            return;
        }

        info!(
            "ECS task is still running.\n\n\
             Re-login command:\n  \
             aws ecs execute-command --cluster {cluster} --task {task} --interactive --command {command}\n\n\
             Task stop command:\n  \
             aws ecs stop-task --cluster {cluster} --task {task}",
            cluster = self.cluster,
            task = self.task_id,
        );
    }
}

/// Pull the assigned task ID out of the runner's combined output.
pub fn find_task_id(log: &str) -> Option<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();

    let re = PATTERN.get_or_init(|| {
        Regex::new(r"Waiting for task ID (\S+)").expect("task ID pattern compiles")
    });

    re.captures(log).map(|c| c[1].to_string())
}
