//! Chain-tip consensus and proposer eligibility (component C4).

use crate::error::SequencerError;
use futures::future::join4;
use sequencer_collaborators::{
    CollaboratorError, L1ToL2MessageSource, L2BlockSource, PeerNetwork, SequencerPublisher,
    WorldState,
};
use sequencer_types::{ArchiveRoot, ChainTip, Slot};

/// Query the four upstream sources concurrently and confirm they agree on the chain tip.
///
/// Per §4.4: all four hashes must match, except at genesis where the canonical L2 block source
/// reports no hash yet, in which case all four numbers must be zero. Returns [`SequencerError::NotReady`]
/// on any mismatch — the caller's iteration ends in `Idle`.
pub async fn get_chain_tip<Peer, WS, L2Src, MsgSrc>(
    peer_network: &Peer,
    world_state: &WS,
    l2_block_source: &L2Src,
    l1_to_l2_messages: &MsgSrc,
    initial_l2_block_num: u64,
) -> Result<ChainTip, SequencerError>
where
    Peer: PeerNetwork,
    WS: WorldState,
    L2Src: L2BlockSource,
    MsgSrc: L1ToL2MessageSource,
{
    let (world_state_status, peer_status, l2_tips, message_tips) = join4(
        world_state.status(),
        peer_network.get_status(),
        l2_block_source.get_l2_tips(),
        l1_to_l2_messages.get_l2_tips(),
    )
    .await;

    let world_state_status = world_state_status?;
    let peer_status = peer_status?;
    let l2_tips = l2_tips?;
    let message_tips = message_tips?;

    let numbers_agree = world_state_status.latest_block_number == peer_status.synced_to_l2_block_number
        && peer_status.synced_to_l2_block_number == l2_tips.number
        && l2_tips.number == message_tips.number;

    if !numbers_agree {
        tracing::debug!(
            world_state = world_state_status.latest_block_number,
            peer_network = peer_status.synced_to_l2_block_number,
            l2_block_source = l2_tips.number,
            message_source = message_tips.number,
            "chain tips disagree on block number"
        );
        return Err(SequencerError::NotReady {
            reason: "chain tip block numbers disagree across upstream sources",
        });
    }

    match l2_tips.hash {
        Some(canonical_hash) => {
            let hashes_agree = world_state_status.latest_block_hash == canonical_hash
                && peer_status.synced_to_l2_block_hash == canonical_hash
                && message_tips.hash == Some(canonical_hash);
            if !hashes_agree {
                tracing::debug!("chain tips disagree on block hash");
                return Err(SequencerError::NotReady {
                    reason: "chain tip hashes disagree across upstream sources",
                });
            }
        }
        None => {
            // Genesis exception: the canonical source has no hash yet, which is only valid when
            // every source still reports block number zero.
            if l2_tips.number != 0 {
                return Err(SequencerError::Inconsistent {
                    reason: "canonical block source has no hash past genesis".to_owned(),
                });
            }
        }
    }

    if l2_tips.number >= initial_l2_block_num {
        let block_number = l2_tips.number;
        let block = l2_block_source
            .get_block(block_number)
            .await?
            .ok_or(CollaboratorError::new(anyhow::anyhow!(
                "canonical block source agreed on tip {block_number} but could not fetch it"
            )))?;
        Ok(ChainTip::new(block.number, block.archive_root))
    } else {
        let genesis_archive_root = world_state.get_committed_archive_root().await?;
        Ok(ChainTip::genesis(genesis_archive_root))
    }
}

/// Ask the publisher whether the local operator is the proposer for the next slot.
///
/// Returns `None` when it is not our turn or the chain has advanced past `tip`. A `block_number`
/// in the publisher's response that disagrees with the caller's own expectation is a hard
/// inconsistency (§4.4) and is raised rather than silently reconciled.
pub async fn slot_for_proposal<Pub>(
    publisher: &Pub,
    tip_archive: ArchiveRoot,
    expected_next_block_number: u64,
) -> Result<Option<(Slot, u64)>, SequencerError>
where
    Pub: SequencerPublisher,
{
    let Some((slot, block_number)) = publisher.can_propose_at_next_eth_block(tip_archive).await?
    else {
        return Ok(None);
    };

    if block_number != expected_next_block_number {
        return Err(SequencerError::Inconsistent {
            reason: format!(
                "publisher expects to propose block {block_number} but sequencer expected {expected_next_block_number}"
            ),
        });
    }

    Ok(Some((slot, block_number)))
}
