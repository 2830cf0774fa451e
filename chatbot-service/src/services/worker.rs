//! Bounded worker pool draining the QR-issuance queue.
//!
//! Inbound triggers enqueue; a fixed number of workers drain. The queue is
//! bounded, so a flood of triggers degrades at the webhook instead of
//! spawning unbounded tasks.

use crate::config::WorkerConfig;
use crate::services::issuer::QrIssuer;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct IssueJob {
    pub recipient: String,
}

pub struct IssueWorkerPool {
    config: WorkerConfig,
    issuer: QrIssuer,
    job_tx: mpsc::Sender<IssueJob>,
    job_rx: Option<mpsc::Receiver<IssueJob>>,
    shutdown_token: CancellationToken,
}

impl IssueWorkerPool {
    pub fn new(config: WorkerConfig, issuer: QrIssuer) -> Self {
        let (job_tx, job_rx) = mpsc::channel(config.queue_size.max(1));
        Self {
            config,
            issuer,
            job_tx,
            job_rx: Some(job_rx),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn sender(&self) -> mpsc::Sender<IssueJob> {
        self.job_tx.clone()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Spawn the workers. Each worker takes jobs from the shared queue until
    /// the channel closes or the shutdown token fires.
    pub fn start(mut self) {
        let job_rx = self.job_rx.take().expect("start() can only be called once");
        let job_rx = Arc::new(Mutex::new(job_rx));

        tracing::info!(
            worker_count = self.config.worker_count,
            queue_size = self.config.queue_size,
            "Starting QR issuance worker pool"
        );

        for worker_id in 0..self.config.worker_count.max(1) {
            let job_rx = Arc::clone(&job_rx);
            let issuer = self.issuer.clone();
            let shutdown = self.shutdown_token.clone();

            tokio::spawn(async move {
                loop {
                    let job = tokio::select! {
                        _ = shutdown.cancelled() => {
                            tracing::info!(worker_id, "QR worker shutting down");
                            break;
                        }
                        job = async { job_rx.lock().await.recv().await } => job,
                    };

                    match job {
                        Some(job) => {
                            tracing::info!(
                                worker_id,
                                recipient = %job.recipient,
                                "Processing QR issuance job"
                            );
                            issuer.issue_to(&job.recipient).await;
                        }
                        None => {
                            tracing::info!(worker_id, "Job channel closed, QR worker exiting");
                            break;
                        }
                    }
                }
            });
        }
    }
}
