//! The external task-runner seam.
//!
//! The lifecycle controller only knows how to `submit` a composed bundle
//! and read back the runner's captured output; the ecspresso adapter
//! below is the real implementation, and tests substitute a fake.

mod ecspresso;

pub use ecspresso::Ecspresso;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::definition::Definition;
use crate::error::Result;
use crate::process::CommandOutput;

/// Which task state the runner should block on before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    UntilRunning,
    UntilStopped,
}

impl WaitMode {
    pub fn flag(self) -> &'static str {
        match self {
            WaitMode::UntilRunning => "--wait-until=running",
            WaitMode::UntilStopped => "--wait-until=stopped",
        }
    }
}

#[async_trait]
pub trait Runner: Send + Sync {
    async fn submit(
        &self,
        def: &Definition,
        mode: WaitMode,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput>;
}
