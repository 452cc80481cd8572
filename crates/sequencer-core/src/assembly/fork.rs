//! World-state forking and the deferred release grace period (§4.5.3, §9).

use sequencer_collaborators::{CollaboratorError, Fork, WorldState};
use std::time::Duration;
use tokio::task::JoinSet;

/// How long a fork is kept open after block completion (or error) before it is released, giving
/// cancelled in-flight processor work time to unwind.
const RELEASE_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Open the two independent forks `CreatingBlock` needs: one driven by public processing, one by
/// the block builder (§4.5.3). Both are opened at `block_number − 1`.
///
/// If the second `fork` call fails, the first fork is closed before the error is returned —
/// otherwise it would be dropped unclosed, since `Fork` has no `Drop` impl and releases only
/// through its explicit async `close`.
pub async fn open_pair<WS>(
    world_state: &WS,
    block_number: u64,
) -> Result<(WS::Fork, WS::Fork), CollaboratorError>
where
    WS: WorldState,
{
    let parent_block_number = block_number.saturating_sub(1);
    let public_processor_fork = world_state.fork(parent_block_number).await?;
    let orchestrator_fork = match world_state.fork(parent_block_number).await {
        Ok(fork) => fork,
        Err(error) => {
            if let Err(close_error) = public_processor_fork.close().await {
                tracing::warn!(
                    %close_error,
                    "failed to close orphaned fork after its sibling failed to open",
                );
            }
            return Err(error);
        }
    };
    Ok((public_processor_fork, orchestrator_fork))
}

/// Push `fork`'s release onto `cleanup`, to run unconditionally 5 seconds from now.
///
/// Errors from `close` are logged and swallowed (§7): by the time the deferred task runs the
/// node may already be stopping.
pub async fn schedule_release<F>(cleanup: &tokio::sync::Mutex<JoinSet<()>>, fork: F)
where
    F: Fork + Send + 'static,
{
    let mut join_set = cleanup.lock().await;
    join_set.spawn(async move {
        tokio::time::sleep(RELEASE_GRACE_PERIOD).await;
        if let Err(error) = fork.close().await {
            tracing::warn!(%error, "failed to close world-state fork during deferred cleanup");
        }
    });
}
