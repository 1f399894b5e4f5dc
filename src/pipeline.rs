//! Bounded handoff between crawl workers and the session.
//!
//! [`SimilarityPipeline::spawn`] moves a [`DuplicateSession`] onto a blocking
//! consumer thread that processes pages in arrival order, so scoring never
//! occupies an async worker. Crawl workers submit through cloneable
//! [`PageSender`]s. [`PageSender::submit`] never waits: when the queue is full
//! the page is built on the submitting thread and only its document is
//! parked, to be admitted without incremental scoring when the pipeline
//! drains. Sources that can afford to wait use [`PageSender::send_blocking`].

use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cancel::{CancelHandle, CancelSignal, cancellation};
use crate::document::{Admission, DocumentBuilder, PageInput};
use crate::error::EngineError;
use crate::metrics::SessionMetrics;
use crate::session::{DuplicateSession, ProcessOutcome};

/// An overflow page, reduced to what admission needs.
struct ParkedPage {
    id: String,
    built: Result<Admission, EngineError>,
}

type Overflow = Arc<Mutex<Vec<ParkedPage>>>;

/// How a submitted page was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Queued for incremental processing.
    Queued,
    /// Queue was full; the page is admitted unscored when the pipeline drains.
    Deferred,
}

/// Submits pages to a running pipeline. Cheap to clone.
#[derive(Clone)]
pub struct PageSender {
    tx: mpsc::Sender<PageInput>,
    overflow: Overflow,
    builder: Arc<DocumentBuilder>,
    metrics: Option<Arc<dyn SessionMetrics>>,
}

impl std::fmt::Debug for PageSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSender")
            .field("capacity", &self.tx.capacity())
            .finish_non_exhaustive()
    }
}

impl PageSender {
    /// Hand a page to the pipeline without waiting for queue space.
    ///
    /// Fails only once the pipeline has stopped (finished or cancelled).
    pub fn submit(&self, page: PageInput) -> Result<Submission, EngineError> {
        match self.tx.try_send(page) {
            Ok(()) => Ok(Submission::Queued),
            Err(TrySendError::Full(page)) => {
                warn!(doc_id = %page.url, "similarity_queue_overflow");
                if let Some(metrics) = &self.metrics {
                    metrics.record_overflow();
                }
                let parked = ParkedPage {
                    built: self.builder.build(&page),
                    id: page.url,
                };
                self.overflow
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(parked);
                Ok(Submission::Deferred)
            }
            Err(TrySendError::Closed(_)) => Err(EngineError::PipelineClosed),
        }
    }

    /// Queue a page, blocking the calling thread until there is room.
    ///
    /// For local sources such as files, where waiting is cheaper than losing
    /// incremental scores. Must not be called from async code.
    pub fn send_blocking(&self, page: PageInput) -> Result<(), EngineError> {
        self.tx
            .blocking_send(page)
            .map_err(|_| EngineError::PipelineClosed)
    }
}

/// What the consumer hands back when it stops.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub session: DuplicateSession,
    /// Pages admitted through the incremental pass.
    pub processed: usize,
    pub excluded: usize,
    /// Pages rejected with an error (logged).
    pub failed: usize,
    /// Overflow pages admitted without incremental scoring.
    pub overflow_admitted: usize,
    /// Pages still queued or parked when cancellation stopped the consumer.
    pub dropped: usize,
    pub cancelled: bool,
}

/// A running session consumer.
pub struct SimilarityPipeline {
    sender: PageSender,
    cancel: CancelHandle,
    task: JoinHandle<PipelineOutcome>,
}

impl SimilarityPipeline {
    /// Start the consumer. Must be called from within a tokio runtime.
    pub fn spawn(session: DuplicateSession, queue_capacity: usize) -> Self {
        let (sender, cancel, consumer) = channel(session, queue_capacity);
        info!(queue_capacity, "similarity_pipeline_started");
        let handle = Handle::current();
        let task = tokio::task::spawn_blocking(move || consumer.run(&handle));
        Self {
            sender,
            cancel,
            task,
        }
    }

    /// Spawn with the queue size from the session's config.
    pub fn spawn_default(session: DuplicateSession) -> Self {
        let capacity = session.config().queue_capacity;
        Self::spawn(session, capacity)
    }

    pub fn sender(&self) -> PageSender {
        self.sender.clone()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Stop after the document in progress. Queued pages are dropped.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Close the pipeline's own sender and wait for the consumer to stop.
    ///
    /// The consumer drains once every [`PageSender`] clone is dropped, or
    /// stops early on cancellation.
    pub async fn finish(self) -> Result<PipelineOutcome, EngineError> {
        drop(self.sender);
        self.task
            .await
            .map_err(|err| EngineError::PipelineTask(err.to_string()))
    }
}

fn channel(session: DuplicateSession, queue_capacity: usize) -> (PageSender, CancelHandle, Consumer) {
    let (tx, rx) = mpsc::channel(queue_capacity.max(1));
    let (cancel, signal) = cancellation();
    let overflow: Overflow = Arc::new(Mutex::new(Vec::new()));
    let sender = PageSender {
        tx,
        overflow: Arc::clone(&overflow),
        builder: session.builder(),
        metrics: session.metrics(),
    };
    let consumer = Consumer {
        session,
        rx,
        cancel: signal,
        overflow,
    };
    (sender, cancel, consumer)
}

enum Next {
    Page(PageInput),
    Closed,
    Cancelled,
}

/// Receiving end of the handoff. Owns the session until it stops.
struct Consumer {
    session: DuplicateSession,
    rx: mpsc::Receiver<PageInput>,
    cancel: CancelSignal,
    overflow: Overflow,
}

impl Consumer {
    fn next(&mut self, handle: &Handle) -> Next {
        let Self { rx, cancel, .. } = self;
        handle.block_on(async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Next::Cancelled,
                page = rx.recv() => page.map_or(Next::Closed, Next::Page),
            }
        })
    }

    /// Process pages until every sender is gone or cancellation fires.
    /// Blocks the calling thread; `handle` only drives the waits.
    fn run(mut self, handle: &Handle) -> PipelineOutcome {
        let mut outcome = Counters::default();
        loop {
            let page = match self.next(handle) {
                Next::Page(page) => page,
                Next::Closed => break,
                Next::Cancelled => {
                    outcome.cancelled = true;
                    break;
                }
            };
            if self.cancel.is_cancelled() {
                outcome.cancelled = true;
                outcome.dropped += 1;
                break;
            }
            outcome.count(self.session.process(&page), true);
        }

        let parked = std::mem::take(&mut *self.overflow.lock().unwrap_or_else(PoisonError::into_inner));
        if outcome.cancelled {
            self.rx.close();
            while self.rx.try_recv().is_ok() {
                outcome.dropped += 1;
            }
            outcome.dropped += parked.len();
            info!(
                processed = outcome.processed,
                dropped = outcome.dropped,
                "similarity_pipeline_cancelled"
            );
        } else {
            for ParkedPage { id, built } in parked {
                outcome.count(self.session.admit_built(&id, built), false);
            }
            info!(
                processed = outcome.processed,
                overflow_admitted = outcome.overflow_admitted,
                excluded = outcome.excluded,
                failed = outcome.failed,
                "similarity_pipeline_drained"
            );
        }

        PipelineOutcome {
            session: self.session,
            processed: outcome.processed,
            excluded: outcome.excluded,
            failed: outcome.failed,
            overflow_admitted: outcome.overflow_admitted,
            dropped: outcome.dropped,
            cancelled: outcome.cancelled,
        }
    }
}

#[derive(Default)]
struct Counters {
    processed: usize,
    excluded: usize,
    failed: usize,
    overflow_admitted: usize,
    dropped: usize,
    cancelled: bool,
}

impl Counters {
    fn count(&mut self, result: Result<ProcessOutcome, EngineError>, scored: bool) {
        match result {
            Ok(ProcessOutcome::Indexed(_)) if scored => self.processed += 1,
            Ok(ProcessOutcome::Indexed(_)) => self.overflow_admitted += 1,
            Ok(ProcessOutcome::Excluded { .. }) => self.excluded += 1,
            Err(_) => self.failed += 1,
        }
    }
}
