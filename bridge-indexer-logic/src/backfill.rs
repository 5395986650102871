use std::sync::Arc;

use anyhow::Context;

use crate::{
    checkpoint::{CHECKPOINT_NAMESPACE, CheckpointStore},
    pipeline::EventPipeline,
    registry::ChainContext,
    retry::with_retries,
    types::EventKind,
};

/// Historical pager for one (chain, bridge address).
///
/// Walks `[cursor, head]` in windows bounded by the chain's `eth_getLogs`
/// limit and commits the durable cursor per log, so a crash resumes exactly
/// where processing stopped. This is the only writer of the checkpoint.
pub struct BackfillWorker {
    chain: Arc<ChainContext>,
    pipeline: Arc<EventPipeline>,
    checkpoints: Arc<dyn CheckpointStore>,
}

impl BackfillWorker {
    pub fn new(
        chain: Arc<ChainContext>,
        pipeline: Arc<EventPipeline>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            chain,
            pipeline,
            checkpoints,
        }
    }

    /// Run one backfill pass. Terminates once the cursor reaches the head
    /// observed at start.
    pub async fn run(&self) -> anyhow::Result<()> {
        let spec = self.chain.spec;

        let checkpoint = self
            .checkpoints
            .load(spec.name, CHECKPOINT_NAMESPACE, &spec.bridge)
            .await
            .context("failed to read checkpoint")?;
        let (initial_block, committed_index) = match checkpoint {
            Some(checkpoint) => (
                checkpoint.max_block_stored.max(spec.first_block),
                checkpoint.tx_index,
            ),
            None => (spec.first_block, None),
        };

        let Some(head) = with_retries("block_number", || self.chain.rpc.block_number()).await
        else {
            anyhow::bail!("cannot resolve the head block of {}", spec.name);
        };

        tracing::info!(
            chain = spec.name,
            initial_block,
            head,
            "starting backfill"
        );

        let mut cursor = initial_block;
        let mut frozen = false;
        let mut total_events = 0usize;

        while cursor < head {
            let to_block = (cursor + spec.max_blocks).min(head);

            let Some(logs) = with_retries("get_logs", || {
                self.chain
                    .rpc
                    .get_logs(spec.bridge, EventKind::all_topics(), cursor, to_block)
            })
            .await
            else {
                anyhow::bail!(
                    "cannot fetch logs {cursor}..={to_block} on {}, resuming from the checkpoint next run",
                    spec.name
                );
            };

            for log in &logs {
                let (Some(block_number), Some(tx_index)) =
                    (log.block_number, log.transaction_index)
                else {
                    tracing::warn!(chain = spec.name, "dropping log without a position");
                    continue;
                };

                // A crash mid-block restarts the cursor inside `initial_block`;
                // logs at or below the committed index are already stored.
                if block_number == initial_block
                    && committed_index.is_some_and(|index| tx_index <= index)
                {
                    tracing::debug!(
                        chain = spec.name,
                        block_number,
                        tx_index,
                        "skipping already-committed log"
                    );
                    continue;
                }

                match with_retries("process_log", || self.pipeline.process(log)).await {
                    Some(_) => {
                        total_events += 1;
                        if !frozen {
                            self.checkpoints
                                .advance(
                                    spec.name,
                                    CHECKPOINT_NAMESPACE,
                                    &spec.bridge,
                                    block_number,
                                    tx_index,
                                )
                                .await
                                .context("failed to advance checkpoint")?;
                        }
                    }
                    None => {
                        // Keep ingesting (upserts are idempotent by kappa) but
                        // pin the cursor before the failed log so the next
                        // backfill pass sees it again.
                        frozen = true;
                    }
                }
            }

            cursor = to_block + 1;
            tracing::info!(
                chain = spec.name,
                cursor,
                head,
                total_events,
                "backfill window done"
            );
        }

        tracing::info!(chain = spec.name, head, total_events, "backfill complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        primitives::{Address, B256, U256, address},
        sol_types::SolEvent,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::{
        abi::SynapseBridge,
        checkpoint::{Checkpoint, InMemoryCheckpointStore},
        registry::PoolCache,
        test_utils::{
            address_topic, block_json, encode_address_word, encode_u256_word, leaked_spec,
            log_json, mock_chain_context, receipt_json, token_metadata, transaction_json,
        },
    };

    const BOB: Address = address!("0000000000000000000000000000000000000b0b");
    const ALICE: Address = address!("000000000000000000000000000000000000a11c");
    const TOKEN: Address = address!("23b891e5c62e0955ae2bd185990103928ab817b3");

    fn deposit_log(block: u64, tx_index: u64, tx_hash: &B256, bridge: &Address) -> serde_json::Value {
        log_json(
            bridge,
            &[
                SynapseBridge::TokenDeposit::SIGNATURE_HASH,
                address_topic(&BOB),
            ],
            &{
                let mut data = String::from("0x");
                for word in [
                    encode_u256_word(U256::from(1)),
                    encode_address_word(&TOKEN),
                    encode_u256_word(U256::from(5u64)),
                ] {
                    data.push_str(word.trim_start_matches("0x"));
                }
                data
            },
            block,
            tx_hash,
            tx_index,
            0,
        )
    }

    /// Queue the block/transaction/receipt responses one processed log costs.
    fn push_enrichment(
        asserter: &alloy::transports::mock::Asserter,
        block: u64,
        tx_hash: &B256,
        bridge: &Address,
    ) {
        asserter.push_success(&block_json(block, 1_600_000_000));
        asserter.push_success(&transaction_json(tx_hash, &ALICE, bridge, "0x", block));
        asserter.push_success(&receipt_json(
            tx_hash,
            bridge,
            block,
            vec![log_json(
                &TOKEN,
                &[address_topic(&ALICE)],
                &encode_u256_word(U256::from(5u64)),
                block,
                tx_hash,
                0,
                0,
            )],
        ));
    }

    #[tokio::test]
    async fn resumes_after_a_mid_block_crash() {
        let spec = leaked_spec("testchain", 1337, 50, 512);
        let (asserter, chain) =
            mock_chain_context(spec, [(TOKEN, token_metadata("nUSD", "nUSD", 18))]);

        let checkpoints = Arc::new(InMemoryCheckpointStore::new());
        checkpoints
            .advance(spec.name, CHECKPOINT_NAMESPACE, &spec.bridge, 100, 3)
            .await
            .unwrap();

        let tx_skip_a = B256::repeat_byte(0x41);
        let tx_skip_b = B256::repeat_byte(0x42);
        let tx_new_a = B256::repeat_byte(0x43);
        let tx_new_b = B256::repeat_byte(0x44);

        asserter.push_success(&json!("0x69")); // head = 105
        asserter.push_success(&json!([
            deposit_log(100, 2, &tx_skip_a, &spec.bridge),
            deposit_log(100, 3, &tx_skip_b, &spec.bridge),
            deposit_log(100, 4, &tx_new_a, &spec.bridge),
            deposit_log(101, 0, &tx_new_b, &spec.bridge),
        ]));
        // Only the two uncommitted logs cost enrichment calls.
        push_enrichment(&asserter, 100, &tx_new_a, &spec.bridge);
        push_enrichment(&asserter, 101, &tx_new_b, &spec.bridge);

        let pipeline = Arc::new(EventPipeline::new(chain.clone(), PoolCache::new(), None));
        let worker = BackfillWorker::new(chain, pipeline, checkpoints.clone());
        worker.run().await.unwrap();

        assert_eq!(
            checkpoints
                .load(spec.name, CHECKPOINT_NAMESPACE, &spec.bridge)
                .await
                .unwrap(),
            Some(Checkpoint {
                max_block_stored: 101,
                tx_index: Some(0),
            })
        );
    }

    #[tokio::test]
    async fn a_given_up_log_pins_the_checkpoint() {
        let spec = leaked_spec("frozenchain", 1338, 50, 512);
        let (asserter, chain) =
            mock_chain_context(spec, [(TOKEN, token_metadata("nUSD", "nUSD", 18))]);

        let checkpoints = Arc::new(InMemoryCheckpointStore::new());

        let tx_bad = B256::repeat_byte(0x51);
        let tx_good = B256::repeat_byte(0x52);
        let unknown_topic =
            alloy::primitives::b256!("deadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef");

        asserter.push_success(&json!("0x42")); // head = 66
        asserter.push_success(&json!([
            log_json(&spec.bridge, &[unknown_topic], "0x", 60, &tx_bad, 0, 0),
            deposit_log(61, 0, &tx_good, &spec.bridge),
        ]));
        // The unknown-topic log fails before any enrichment call; only the
        // good log costs responses.
        push_enrichment(&asserter, 61, &tx_good, &spec.bridge);

        let pipeline = Arc::new(EventPipeline::new(chain.clone(), PoolCache::new(), None));
        let worker = BackfillWorker::new(chain, pipeline, checkpoints.clone());
        worker.run().await.unwrap();

        // The cursor stays behind the failed log, so the next pass re-sees it.
        assert_eq!(
            checkpoints
                .load(spec.name, CHECKPOINT_NAMESPACE, &spec.bridge)
                .await
                .unwrap(),
            None
        );
    }
}
