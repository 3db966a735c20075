//! Partitioned in-process queue.
//!
//! Keys hash to one of N partitions. Each partition is an unbounded channel
//! drained by one task, so messages sharing a key are handled one at a time
//! in publication order while partitions progress concurrently.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::domain::ports::{QueueMessage, QueueMessageHandler, ReportQueue, ReportQueueError};

/// Partition index for `key` among `partitions`.
///
/// Uses the first eight bytes of the key's SHA-256 digest, so assignment is
/// stable across processes and releases.
///
/// # Examples
/// ```
/// use std::num::NonZeroUsize;
/// use spendbot::outbound::queue::partition_for;
///
/// let partitions = NonZeroUsize::new(8).expect("non-zero");
/// assert_eq!(partition_for("42", partitions), partition_for("42", partitions));
/// ```
pub fn partition_for(key: &str, partitions: NonZeroUsize) -> usize {
    let digest = Sha256::digest(key.as_bytes());
    let mut prefix = [0_u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let hash = u64::from_be_bytes(prefix);
    let count = partitions.get() as u64;
    // The remainder is below `partitions`, which is a usize.
    (hash % count) as usize
}

/// Producer half of the in-process queue.
#[derive(Clone)]
pub struct InMemoryReportQueue {
    partitions: Arc<[mpsc::UnboundedSender<QueueMessage>]>,
}

/// Consumer half of the in-process queue.
pub struct InMemoryQueueConsumers {
    receivers: Vec<mpsc::UnboundedReceiver<QueueMessage>>,
}

impl InMemoryReportQueue {
    /// Create a queue with `partitions` ordered partitions.
    pub fn new(partitions: NonZeroUsize) -> (Self, InMemoryQueueConsumers) {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..partitions.get())
            .map(|_| mpsc::unbounded_channel())
            .unzip();
        (
            Self {
                partitions: senders.into(),
            },
            InMemoryQueueConsumers { receivers },
        )
    }

    fn partition_count(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.partitions.len()).unwrap_or(NonZeroUsize::MIN)
    }
}

#[async_trait]
impl ReportQueue for InMemoryReportQueue {
    async fn publish(&self, message: QueueMessage) -> Result<(), ReportQueueError> {
        let index = partition_for(&message.key, self.partition_count());
        let Some(partition) = self.partitions.get(index) else {
            return Err(ReportQueueError::unavailable("queue has no partitions"));
        };
        partition
            .send(message)
            .map_err(|_| ReportQueueError::unavailable(format!("partition {index} stopped")))?;
        debug!(partition = index, "report request enqueued");
        Ok(())
    }
}

impl InMemoryQueueConsumers {
    /// Drain every partition into `handler` until `shutdown` resolves or all
    /// producers are dropped.
    pub async fn run<F>(self, handler: Arc<dyn QueueMessageHandler>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut tasks = JoinSet::new();
        for (partition, mut receiver) in self.receivers.into_iter().enumerate() {
            let handler = handler.clone();
            tasks.spawn(async move {
                while let Some(message) = receiver.recv().await {
                    handler.handle(message).await;
                }
                debug!(partition, "queue partition closed");
            });
        }

        let drained = async {
            while let Some(joined) = tasks.join_next().await {
                if let Err(join_error) = joined {
                    error!(error = %join_error, "queue partition task failed");
                }
            }
        };
        tokio::select! {
            () = shutdown => info!("in-memory queue consumers stopping"),
            () = drained => info!("in-memory queue drained"),
        }
    }
}
