//! Subprocess supervision and interrupt plumbing.

mod command;
mod guard;

pub use command::{run_captured, run_captured_in, run_interactive, CommandOutput};
pub use guard::StopGuard;

use tokio_util::sync::CancellationToken;

/// Spawn the process-wide interrupt listener and hand back its token.
///
/// The listener stays registered for the life of the process so SIGINT
/// never falls through to the default disposition; repeated interrupts
/// re-cancel the same token, which is a no-op after the first.
pub fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let relay = token.clone();

    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            relay.cancel();
        }
    });

    token
}
