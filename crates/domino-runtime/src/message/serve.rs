use super::MessageConsumer;
use crate::domino::Domino;

/// What happened to the blocks a consumer delivered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServeSummary {
    pub received: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Envelopes that could not be turned into blocks
    pub rejected: usize,
}

/// Start every block the consumer yields as a root execution
///
/// Each block's cascade settles before the next block is received. Root
/// failures and undecodable messages are logged and counted, never
/// propagated; the loop ends when the consumer is exhausted.
pub async fn serve<C: MessageConsumer>(mut consumer: C, domino: &Domino) -> ServeSummary {
    let mut summary = ServeSummary::default();

    while let Some(next) = consumer.next().await {
        summary.received += 1;
        let block = match next {
            Ok(block) => block,
            Err(e) => {
                tracing::warn!("Failed to receive block: {e}");
                summary.rejected += 1;
                continue;
            }
        };

        let type_name = block.block_type_name();
        match domino.start_boxed(block).await {
            Ok(_) => summary.succeeded += 1,
            Err(e) => {
                tracing::error!("Block {type_name} failed: {e}");
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        "Consumer exhausted after {} blocks ({} failed, {} rejected)",
        summary.received,
        summary.failed,
        summary.rejected
    );
    summary
}
