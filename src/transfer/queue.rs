//! Settlement Job Queue
//!
//! In-process FIFO channel between the acceptance path (many producers) and
//! the settlement worker (single consumer). Bounded queues apply
//! backpressure: `enqueue` waits while the queue is full.

use tokio::sync::mpsc;
use tracing::debug;

use super::error::TransferError;
use super::types::SettlementJob;

#[derive(Clone)]
enum SenderInner {
    Bounded(mpsc::Sender<SettlementJob>),
    Unbounded(mpsc::UnboundedSender<SettlementJob>),
}

enum ReceiverInner {
    Bounded(mpsc::Receiver<SettlementJob>),
    Unbounded(mpsc::UnboundedReceiver<SettlementJob>),
}

/// Producer side (held by the acceptance service)
#[derive(Clone)]
pub struct JobSender {
    inner: SenderInner,
}

impl JobSender {
    /// Push a job; waits for room when the queue is bounded and full
    pub async fn enqueue(&self, job: SettlementJob) -> Result<(), TransferError> {
        let sent = match &self.inner {
            SenderInner::Bounded(tx) => tx.send(job).await.is_ok(),
            SenderInner::Unbounded(tx) => tx.send(job).is_ok(),
        };

        if !sent {
            return Err(TransferError::QueueClosed);
        }
        debug!(transaction_id = %job.transaction_id, "Settlement job enqueued");
        Ok(())
    }

    /// True once the receiver has been dropped
    pub fn is_closed(&self) -> bool {
        match &self.inner {
            SenderInner::Bounded(tx) => tx.is_closed(),
            SenderInner::Unbounded(tx) => tx.is_closed(),
        }
    }
}

/// Consumer side (owned by the settlement worker)
pub struct JobReceiver {
    inner: ReceiverInner,
}

impl JobReceiver {
    /// Wait for the next job; `None` once every sender is gone and the queue is drained
    pub async fn recv(&mut self) -> Option<SettlementJob> {
        match &mut self.inner {
            ReceiverInner::Bounded(rx) => rx.recv().await,
            ReceiverInner::Unbounded(rx) => rx.recv().await,
        }
    }

    /// Non-blocking receive
    pub fn try_recv(&mut self) -> Option<SettlementJob> {
        match &mut self.inner {
            ReceiverInner::Bounded(rx) => rx.try_recv().ok(),
            ReceiverInner::Unbounded(rx) => rx.try_recv().ok(),
        }
    }

    /// Jobs waiting in the queue
    pub fn len(&self) -> usize {
        match &self.inner {
            ReceiverInner::Bounded(rx) => rx.len(),
            ReceiverInner::Unbounded(rx) => rx.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop accepting new jobs; already queued jobs can still be received
    pub fn close(&mut self) {
        match &mut self.inner {
            ReceiverInner::Bounded(rx) => rx.close(),
            ReceiverInner::Unbounded(rx) => rx.close(),
        }
    }
}

/// Create a job queue. `capacity == 0` builds an unbounded queue.
pub fn job_queue(capacity: usize) -> (JobSender, JobReceiver) {
    if capacity == 0 {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            JobSender {
                inner: SenderInner::Unbounded(tx),
            },
            JobReceiver {
                inner: ReceiverInner::Unbounded(rx),
            },
        )
    } else {
        let (tx, rx) = mpsc::channel(capacity);
        (
            JobSender {
                inner: SenderInner::Bounded(tx),
            },
            JobReceiver {
                inner: ReceiverInner::Bounded(rx),
            },
        )
    }
}
