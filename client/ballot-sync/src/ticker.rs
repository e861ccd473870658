use std::sync::Arc;
use std::time::Duration;

use ballot_interface::services::chain::ChainReader;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Polls the node for new blocks and publishes every new height.
///
/// Heights are only ever published in increasing order: a node that briefly reports an older
/// height, for example after a reorg or when a load balancer switches backends, does not
/// trigger a cycle.
pub struct BlockTicker<R: ChainReader> {
    reader: Arc<R>,
    interval: Duration,
    sender: watch::Sender<u64>,
}

impl<R: ChainReader> BlockTicker<R> {
    /// Creates a ticker and the receiver the synchronizer listens on.
    pub fn new(reader: Arc<R>, interval: Duration) -> (Self, watch::Receiver<u64>) {
        let (sender, receiver) = watch::channel(0);
        (
            Self {
                reader,
                interval,
                sender,
            },
            receiver,
        )
    }

    /// Records `height`. Returns true if it is newer than anything seen so far.
    pub fn observe(&self, height: u64) -> bool {
        self.sender.send_if_modified(|latest| {
            if height > *latest {
                *latest = height;
                true
            } else {
                false
            }
        })
    }

    /// Polls until every receiver is dropped.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.sender.is_closed() {
            interval.tick().await;
            match self.reader.block_number().await {
                Ok(height) => {
                    if self.observe(height) {
                        debug!(height, "New block");
                    }
                }
                Err(e) => warn!(error = %e, "Failed to fetch block number"),
            }
        }
        debug!("No block listeners left, ticker stopped");
    }
}
